//! Chat event ingestion and the backfill resume cursor.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::constants::{END_TIME_KEY, MIN_RESUME_NO};
use crate::error::{Result, StoreError};
use crate::queries::comments;
use crate::store::SessionStore;

/// One chat event as delivered by the chat transport.
///
/// `hash` is the transport's fingerprint of the event and is the dedup key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewComment {
    pub vpos: i64,
    pub date: i64,
    pub date_usec: i64,
    pub no: Option<i64>,
    pub anonymity: Option<i64>,
    pub user_id: String,
    pub content: String,
    pub mail: Option<String>,
    pub premium: Option<i64>,
    pub score: Option<i64>,
    pub thread: Option<i64>,
    pub origin: Option<String>,
    pub locale: Option<String>,
    pub hash: String,
}

impl NewComment {
    /// Combined microsecond timestamp used as the chronological cursor.
    /// None when it does not fit in an i64.
    pub fn date2(&self) -> Option<i64> {
        self.date
            .checked_mul(1_000_000)
            .and_then(|micros| micros.checked_add(self.date_usec))
    }
}

/// Where a comment backfill should continue from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumeCursor {
    /// Ordinal of the earliest stored comment, at least 1
    pub from_no: i64,
    /// Seconds since the epoch to fetch backwards from
    pub when: f64,
}

impl ResumeCursor {
    /// `earliest` is `(date2, no)` of the earliest stored comment. `end_time`
    /// is only consulted when there is no usable comment timestamp.
    pub fn from_earliest(earliest: Option<(i64, Option<i64>)>, end_time: Option<f64>) -> Self {
        let (date2, no) = earliest.unwrap_or((0, None));
        let from_no = no.filter(|no| *no >= MIN_RESUME_NO).unwrap_or(MIN_RESUME_NO);
        let when = if date2 == 0 {
            end_time.unwrap_or(0.0)
        } else {
            date2 as f64 / 1_000_000.0
        };
        ResumeCursor { from_no, when }
    }
}

/// Decode the row returned by `select_earliest`
pub(crate) fn earliest_from_row(row: Option<SqliteRow>) -> Result<Option<(i64, Option<i64>)>> {
    let Some(row) = row else {
        return Ok(None);
    };
    let date2: i64 = row.try_get(0).map_err(StoreError::Query)?;
    let no: Option<i64> = row.try_get(1).map_err(StoreError::Query)?;
    Ok(Some((date2, no)))
}

pub(crate) fn needs_end_time(earliest: Option<(i64, Option<i64>)>) -> bool {
    earliest.map_or(true, |(date2, _)| date2 == 0)
}

impl SessionStore {
    /// Store a chat event. Returns false when an event with the same hash was
    /// already stored; redelivery is not an error.
    pub fn ingest(&self, comment: &NewComment) -> Result<bool> {
        let date2 = comment.date2().ok_or(StoreError::TimestampOutOfRange {
            date: comment.date,
            date_usec: comment.date_usec,
        })?;
        let affected = self.execute(&[comments::insert_or_ignore(comment, date2)])?;
        Ok(affected.first().copied().unwrap_or(0) > 0)
    }

    /// Ordinal and timestamp of the earliest stored comment, taken from the
    /// same row. An empty store resumes at ordinal 1 from the recorded
    /// `endTime`, or 0.0 if that was never set.
    pub fn resume_cursor(&self) -> Result<ResumeCursor> {
        let earliest = earliest_from_row(self.fetch_optional(&comments::select_earliest())?)?;
        let end_time = if needs_end_time(earliest) {
            self.get_kv_f64(END_TIME_KEY)?
        } else {
            None
        };
        Ok(ResumeCursor::from_earliest(earliest, end_time))
    }

    pub fn comment_count(&self) -> Result<i64> {
        let row = self.fetch_one(&comments::select_count())?;
        row.try_get(0).map_err(StoreError::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date2_combines_seconds_and_micros() {
        let comment = NewComment {
            date: 1000,
            date_usec: 500000,
            ..Default::default()
        };
        assert_eq!(comment.date2(), Some(1_000_500_000));
    }

    #[test]
    fn test_date2_overflow_is_none() {
        let comment = NewComment {
            date: i64::MAX / 1000,
            ..Default::default()
        };
        assert_eq!(comment.date2(), None);

        let comment = NewComment {
            date: i64::MAX / 1_000_000,
            date_usec: i64::MAX,
            ..Default::default()
        };
        assert_eq!(comment.date2(), None);
    }

    #[test]
    fn test_cursor_from_earliest() {
        assert_eq!(
            ResumeCursor::from_earliest(None, Some(12.5)),
            ResumeCursor { from_no: 1, when: 12.5 }
        );
        assert_eq!(
            ResumeCursor::from_earliest(Some((2_000_000, Some(-1))), Some(12.5)),
            ResumeCursor { from_no: 1, when: 2.0 }
        );
        assert!(needs_end_time(None));
        assert!(needs_end_time(Some((0, Some(4)))));
        assert!(!needs_end_time(Some((1, None))));
    }

    #[test]
    fn test_insert_binds_content_and_ignores_duplicate_hash() {
        let comment = NewComment {
            user_id: "abc".into(),
            content: "it's".into(),
            hash: "h1".into(),
            ..Default::default()
        };
        let (sql, values) = comments::insert_or_ignore(&comment, comment.date2().unwrap());
        assert!(!sql.contains("it's"), "{}", sql);
        assert!(sql.contains("DO NOTHING"), "{}", sql);
        assert_eq!(values.0.len(), 15);
    }
}
