use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::comments::{earliest_from_row, needs_end_time, ResumeCursor};
use crate::constants::END_TIME_KEY;
use crate::db;
use crate::error::{Result, StoreError};
use crate::export::run_readonly;
use crate::queries::{comments, kvs, media, Statement};
use crate::store::SessionStore;

/// Progress summary of a session file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub segments: i64,
    pub fetched_segments: i64,
    pub notfound_segments: i64,
    pub resolved_segments: i64,
    pub last_position: f64,
    pub comments: i64,
    pub resume_from_no: i64,
    pub resume_when: f64,
}

impl SessionStatus {
    /// `counts` is the row from `media::select_counts`
    fn from_parts(
        counts: &SqliteRow,
        last_position: f64,
        comments: i64,
        cursor: ResumeCursor,
    ) -> Result<Self> {
        let get = |idx: usize| -> Result<i64> { counts.try_get(idx).map_err(StoreError::Query) };
        Ok(SessionStatus {
            segments: get(0)?,
            fetched_segments: get(1)?,
            notfound_segments: get(2)?,
            resolved_segments: get(3)?,
            last_position,
            comments,
            resume_from_no: cursor.from_no,
            resume_when: cursor.when,
        })
    }
}

impl SessionStore {
    /// Status as seen by the writer, including uncommitted work
    pub fn status(&self) -> Result<SessionStatus> {
        let counts = self.fetch_one(&media::select_counts())?;
        SessionStatus::from_parts(
            &counts,
            self.last_position()?,
            self.comment_count()?,
            self.resume_cursor()?,
        )
    }
}

async fn fetch_one(pool: &SqlitePool, (sql, values): &Statement) -> Result<SqliteRow> {
    db::bind_values(sql, values)
        .map_err(StoreError::Query)?
        .fetch_one(pool)
        .await
        .map_err(StoreError::Query)
}

async fn fetch_optional(pool: &SqlitePool, (sql, values): &Statement) -> Result<Option<SqliteRow>> {
    db::bind_values(sql, values)
        .map_err(StoreError::Query)?
        .fetch_optional(pool)
        .await
        .map_err(StoreError::Query)
}

async fn collect_status(pool: &SqlitePool) -> Result<SessionStatus> {
    let counts = fetch_one(pool, &media::select_counts()).await?;
    let last_position: Option<f64> = fetch_one(pool, &media::select_max_position())
        .await?
        .try_get(0)
        .map_err(StoreError::Query)?;
    let comment_count: i64 = fetch_one(pool, &comments::select_count())
        .await?
        .try_get(0)
        .map_err(StoreError::Query)?;

    let earliest = earliest_from_row(fetch_optional(pool, &comments::select_earliest()).await?)?;
    let end_time = if needs_end_time(earliest) {
        match fetch_optional(pool, &kvs::select_real_by_key(END_TIME_KEY)).await? {
            Some(row) => row.try_get::<Option<f64>, _>(0).map_err(StoreError::Query)?,
            None => None,
        }
    } else {
        None
    };

    SessionStatus::from_parts(
        &counts,
        last_position.unwrap_or(0.0),
        comment_count,
        ResumeCursor::from_earliest(earliest, end_time),
    )
}

/// Status of a session file read over a read-only connection. Only committed
/// work is counted and the writer lock is left alone, so this is safe to run
/// against a session that is still recording.
pub fn read_status(db_path: impl AsRef<Path>) -> Result<SessionStatus> {
    run_readonly(db_path.as_ref(), |pool| async move {
        collect_status(&pool).await
    })
}
