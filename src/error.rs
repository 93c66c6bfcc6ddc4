use std::path::PathBuf;

/// Errors surfaced by the session store and the exporters
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The session file could not be opened or created
    #[error("failed to open session database: {0}")]
    Connect(#[source] sqlx::Error),

    /// DDL failed while preparing the session file; the store cannot be used
    #[error("schema error: {0}")]
    Schema(#[source] sqlx::Error),

    /// A mutation failed; pending work was flushed and the store closed
    #[error("fatal write error: {0}")]
    Fatal(#[source] sqlx::Error),

    /// The store was closed, either explicitly or after a fatal write error
    #[error("session store is closed")]
    Closed,

    /// A read-side query failed
    #[error("query error: {0}")]
    Query(#[source] sqlx::Error),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the session's writer lock
    #[error("another writer holds the lock file {}", .0.display())]
    Locked(PathBuf),

    #[error("failed to start database runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// `date`/`date_usec` do not fit the combined microsecond timestamp.
    /// Nothing was written and the store stays usable.
    #[error("comment timestamp out of range: date={date} date_usec={date_usec}")]
    TimestampOutOfRange { date: i64, date_usec: i64 },
}

impl StoreError {
    /// True when the session loop must stop instead of issuing more writes
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Connect(_)
                | StoreError::Schema(_)
                | StoreError::Fatal(_)
                | StoreError::Closed
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
