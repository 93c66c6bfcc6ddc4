//! Out-of-band session facts kept in the `kvs` table (for example `endTime`).

use sea_query::Value;
use sqlx::Row;

use crate::error::{Result, StoreError};
use crate::queries::kvs;
use crate::store::SessionStore;

impl SessionStore {
    /// Insert or replace a setting. Goes through the batching transaction like
    /// every other write.
    pub fn set_kv(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.execute(&[kvs::upsert(key, value.into())])?;
        Ok(())
    }

    /// Numeric setting; text that does not parse as a number reads as 0.0
    pub fn get_kv_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.fetch_optional(&kvs::select_real_by_key(key))? {
            Some(row) => row.try_get::<Option<f64>, _>(0).map_err(StoreError::Query),
            None => Ok(None),
        }
    }

    pub fn get_kv_string(&self, key: &str) -> Result<Option<String>> {
        match self.fetch_optional(&kvs::select_text_by_key(key))? {
            Some(row) => row.try_get::<Option<String>, _>(0).map_err(StoreError::Query),
            None => Ok(None),
        }
    }
}
