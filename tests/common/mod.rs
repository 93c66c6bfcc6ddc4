#![allow(dead_code)]

use sqlx::sqlite::SqlitePool;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use save_live_stream::{NewComment, SessionStore, StoreConfig};

/// Open a writer store without the lock file so tests can reopen freely
pub fn open_store(db_path: &Path) -> SessionStore {
    let config = StoreConfig {
        lock_file: false,
        ..StoreConfig::default()
    };
    SessionStore::open(db_path, &config).unwrap()
}

pub fn db_path_in(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

/// Run a verification closure against a separate read-only connection.
/// Only committed data is visible here.
pub fn with_reader<T>(db_path: &Path, f: impl FnOnce(&Runtime, &SqlitePool) -> T) -> T {
    let rt = Runtime::new().unwrap();
    let pool = rt
        .block_on(save_live_stream::db::open_readonly_connection(db_path))
        .unwrap();
    let result = f(&rt, &pool);
    rt.block_on(pool.close());
    result
}

pub fn count(db_path: &Path, sql: &str) -> i64 {
    with_reader(db_path, |rt, pool| {
        rt.block_on(sqlx::query_scalar::<_, i64>(sql).fetch_one(pool))
            .unwrap()
    })
}

pub fn comment(hash: &str, date: i64, date_usec: i64, content: &str) -> NewComment {
    NewComment {
        vpos: 100,
        date,
        date_usec,
        user_id: "abc".to_string(),
        content: content.to_string(),
        thread: Some(1),
        hash: hash.to_string(),
        ..Default::default()
    }
}
