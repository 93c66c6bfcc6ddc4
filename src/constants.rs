use std::time::Duration;

/// Default interval between automatic commits of the batching transaction
pub const DEFAULT_COMMIT_INTERVAL: Duration = Duration::from_secs(15);

/// Key under which the stream's recorded end time (seconds, f64) is stored in kvs
pub const END_TIME_KEY: &str = "endTime";

/// Lowest ordinal a comment backfill may resume from
pub const MIN_RESUME_NO: i64 = 1;

/// Extension of exported comment documents
pub const COMMENT_EXTENSION: &str = "xml";

/// Extension of exported media streams
pub const MEDIA_EXTENSION: &str = "ts";
