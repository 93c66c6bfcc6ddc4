//! Per-segment download state: what has been fetched, what is permanently
//! missing, and where playlist walking should resume.

use sea_query::SimpleExpr;
use sqlx::Row;

use crate::error::{Result, StoreError};
use crate::queries::{media, Statement};
use crate::schema::Media;
use crate::store::SessionStore;

/// Partial segment facts. Only fields that are `Some` are written, so earlier
/// values survive later calls that don't mention them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentUpdate {
    pub current: Option<bool>,
    pub position: Option<f64>,
    pub notfound: Option<bool>,
    pub noback: Option<bool>,
    pub bandwidth: Option<i64>,
    pub size: Option<i64>,
    pub m3u8ms: Option<i64>,
    pub hdrms: Option<i64>,
    pub chunkms: Option<i64>,
    pub data: Option<Vec<u8>>,
}

impl SegmentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(mut self, current: bool) -> Self {
        self.current = Some(current);
        self
    }

    pub fn position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn notfound(mut self, notfound: bool) -> Self {
        self.notfound = Some(notfound);
        self
    }

    pub fn noback(mut self, noback: bool) -> Self {
        self.noback = Some(noback);
        self
    }

    pub fn bandwidth(mut self, bandwidth: i64) -> Self {
        self.bandwidth = Some(bandwidth);
        self
    }

    pub fn size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn timings(mut self, m3u8ms: i64, hdrms: i64, chunkms: i64) -> Self {
        self.m3u8ms = Some(m3u8ms);
        self.hdrms = Some(hdrms);
        self.chunkms = Some(chunkms);
        self
    }

    /// Segment body; also records its size
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.size = Some(data.len() as i64);
        self.data = Some(data);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn assignments(&self) -> Vec<(Media, SimpleExpr)> {
        let flag = |b: bool| SimpleExpr::from(b as i32);
        let mut out = Vec::new();
        if let Some(v) = self.current {
            out.push((Media::Current, flag(v)));
        }
        if let Some(v) = self.position {
            out.push((Media::Position, v.into()));
        }
        if let Some(v) = self.notfound {
            out.push((Media::Notfound, flag(v)));
        }
        if let Some(v) = self.noback {
            out.push((Media::Noback, flag(v)));
        }
        if let Some(v) = self.bandwidth {
            out.push((Media::Bandwidth, v.into()));
        }
        // A body always carries its size, even if only `data` was set
        let size = self
            .size
            .or_else(|| self.data.as_ref().map(|d| d.len() as i64));
        if let Some(v) = size {
            out.push((Media::Size, v.into()));
        }
        if let Some(v) = self.m3u8ms {
            out.push((Media::M3u8ms, v.into()));
        }
        if let Some(v) = self.hdrms {
            out.push((Media::Hdrms, v.into()));
        }
        if let Some(v) = self.chunkms {
            out.push((Media::Chunkms, v.into()));
        }
        if let Some(v) = &self.data {
            out.push((Media::Data, v.clone().into()));
        }
        out
    }
}

fn flag_query(store: &SessionStore, statement: &Statement) -> Result<bool> {
    let row = store.fetch_optional(statement)?;
    match row {
        Some(row) => {
            let value: Option<i64> = row.try_get(0).map_err(StoreError::Query)?;
            Ok(value.unwrap_or(0) != 0)
        }
        None => Ok(false),
    }
}

impl SessionStore {
    /// Make sure a row exists for `seqno`, then write the supplied fields only.
    pub fn upsert_segment(&self, seqno: i64, update: &SegmentUpdate) -> Result<()> {
        let mut statements = vec![media::insert_or_ignore(seqno)];
        statements.extend(media::update_fields(seqno, update.assignments()));
        self.execute(&statements)?;
        Ok(())
    }

    /// True once the segment was fetched (size known) or is permanently missing
    pub fn is_resolved(&self, seqno: i64) -> Result<bool> {
        flag_query(self, &media::select_resolved(seqno))
    }

    /// True when the backward pass must not visit this segment
    pub fn is_back_skippable(&self, seqno: i64) -> Result<bool> {
        flag_query(self, &media::select_back_skippable(seqno))
    }

    pub fn mark_no_back(&self, seqno: i64) -> Result<()> {
        self.upsert_segment(seqno, &SegmentUpdate::new().noback(true))
    }

    /// Update the playlist position of an already known segment; unknown
    /// seqnos are left alone.
    pub fn set_position(&self, seqno: i64, position: f64) -> Result<()> {
        let assignments = vec![(Media::Position, SimpleExpr::from(position))];
        self.execute(&Vec::from_iter(media::update_fields(seqno, assignments)))?;
        Ok(())
    }

    /// Update the playlist fetch time of an already known segment
    pub fn set_m3u8ms(&self, seqno: i64, m3u8ms: i64) -> Result<()> {
        let assignments = vec![(Media::M3u8ms, SimpleExpr::from(m3u8ms))];
        self.execute(&Vec::from_iter(media::update_fields(seqno, assignments)))?;
        Ok(())
    }

    /// Highest recorded playlist position, 0.0 when nothing was recorded
    pub fn last_position(&self) -> Result<f64> {
        let row = self.fetch_one(&media::select_max_position())?;
        let position: Option<f64> = row.try_get(0).map_err(StoreError::Query)?;
        Ok(position.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_has_no_assignments() {
        let update = SegmentUpdate::new();
        assert!(update.is_empty());
        assert!(update.assignments().is_empty());
        assert!(media::update_fields(7, update.assignments()).is_none());
    }

    #[test]
    fn test_data_sets_size() {
        let update = SegmentUpdate::new().data(vec![0u8; 188]);
        assert_eq!(update.size, Some(188));
        let cols: Vec<String> = update
            .assignments()
            .iter()
            .map(|(col, _)| sea_query::Iden::to_string(col))
            .collect();
        assert_eq!(cols, vec!["size", "data"]);
    }

    #[test]
    fn test_data_without_size_still_writes_size() {
        let update = SegmentUpdate {
            data: Some(vec![0u8; 376]),
            ..Default::default()
        };
        let assignments = update.assignments();
        let cols: Vec<String> = assignments
            .iter()
            .map(|(col, _)| sea_query::Iden::to_string(col))
            .collect();
        assert_eq!(cols, vec!["size", "data"]);
        let (_, values) = media::update_fields(9, assignments).unwrap();
        assert_eq!(values.0[0], sea_query::Value::BigInt(Some(376)));
    }

    #[test]
    fn test_flags_written_as_integers() {
        let (sql, values) =
            media::update_fields(3, SegmentUpdate::new().notfound(true).assignments()).unwrap();
        assert!(sql.contains("\"notfound\" = ?"), "{}", sql);
        assert_eq!(
            values.0,
            vec![sea_query::Value::Int(Some(1)), sea_query::Value::BigInt(Some(3))]
        );
    }
}
