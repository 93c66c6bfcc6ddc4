//! Session store: owns the session file, its single writer connection and the
//! batching transaction every mutation runs in.
//!
//! All operations are synchronous. The store embeds a current-thread runtime
//! and blocks on the async sqlx calls while holding the store lock, so callers
//! on different threads are serialized against each other.

use fs2::FileExt;
use log::{debug, error, info, warn};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Sqlite, Transaction};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

use crate::config::StoreConfig;
use crate::db;
use crate::error::{Result, StoreError};
use crate::queries::Statement;

/// Mutable state guarded by the store lock
struct WriterState {
    /// Open batching transaction; `None` once the store is closed
    tx: Option<Transaction<'static, Sqlite>>,
    last_commit: Instant,
    commits: u64,
}

/// One per recording session; share across driver threads with `Arc`.
pub struct SessionStore {
    db_path: PathBuf,
    pool: SqlitePool,
    runtime: Runtime,
    commit_interval: Duration,
    state: Mutex<WriterState>,
    _lock_file: Option<File>,
}

fn lock_path_for(db_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", db_path.display()))
}

fn acquire_writer_lock(db_path: &Path) -> Result<File> {
    let lock_path = lock_path_for(db_path);
    let lock_file = File::create(&lock_path).map_err(|e| StoreError::io(&lock_path, e))?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| StoreError::Locked(lock_path.clone()))?;
    Ok(lock_file)
}

impl SessionStore {
    /// Open (or create) a session file and make sure its schema exists.
    ///
    /// On success the first batching transaction is already open.
    pub fn open(db_path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let lock_file = if config.lock_file {
            Some(acquire_writer_lock(&db_path)?)
        } else {
            None
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StoreError::Runtime)?;
        let pool = runtime
            .block_on(db::open_database_connection(&db_path, config.wal))
            .map_err(StoreError::Connect)?;

        let store = Self {
            db_path,
            pool,
            runtime,
            commit_interval: config.commit_interval(),
            state: Mutex::new(WriterState {
                tx: None,
                last_commit: Instant::now(),
                commits: 0,
            }),
            _lock_file: lock_file,
        };
        store.ensure_schema()?;
        info!("SQLite database: {}", store.db_path.display());
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number of automatic and explicit commits since the store was opened
    pub fn commit_count(&self) -> u64 {
        self.lock_state().commits
    }

    /// Create tables and indexes if absent, then open the batching transaction
    /// unless one is already open.
    pub fn ensure_schema(&self) -> Result<()> {
        let mut state = self.lock_state();
        if let Some(tx) = state.tx.as_mut() {
            return self
                .runtime
                .block_on(db::init_database_schema(&mut **tx))
                .map_err(StoreError::Schema);
        }

        self.runtime
            .block_on(async {
                let mut conn = self.pool.acquire().await?;
                db::init_database_schema(&mut conn).await
            })
            .map_err(StoreError::Schema)?;
        let tx = self
            .runtime
            .block_on(self.pool.begin())
            .map_err(StoreError::Schema)?;
        state.tx = Some(tx);
        state.last_commit = Instant::now();
        Ok(())
    }

    /// Commit pending work now and open a fresh transaction
    pub fn commit(&self) -> Result<()> {
        let mut state = self.lock_state();
        if state.tx.is_none() {
            return Err(StoreError::Closed);
        }
        self.commit_locked(&mut state)
    }

    /// Flush pending work and release the connection. Later calls fail with `Closed`.
    pub fn close(&self) -> Result<()> {
        let mut state = self.lock_state();
        let Some(tx) = state.tx.take() else {
            return Ok(());
        };
        let result = self.runtime.block_on(tx.commit());
        self.runtime.block_on(self.pool.close());
        match result {
            Ok(()) => {
                state.commits += 1;
                info!("Closed: {}", self.db_path.display());
                Ok(())
            }
            Err(e) => {
                error!("Final commit failed for {}: {}", self.db_path.display(), e);
                Err(StoreError::Fatal(e))
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().tx.is_none()
    }

    fn lock_state(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one mutation (possibly several statements) inside the batching
    /// transaction, then commit if the interval has elapsed.
    ///
    /// Returns rows affected by each statement.
    pub(crate) fn execute(&self, statements: &[Statement]) -> Result<Vec<u64>> {
        let mut state = self.lock_state();
        let mut affected = Vec::with_capacity(statements.len());
        for (sql, values) in statements {
            let tx = state.tx.as_mut().ok_or(StoreError::Closed)?;
            let result = self.runtime.block_on(async {
                db::bind_values(sql, values)?.execute(&mut **tx).await
            });
            match result {
                Ok(result) => affected.push(result.rows_affected()),
                Err(e) => {
                    error!("Write failed on {}: {}", self.db_path.display(), e);
                    self.abort_locked(&mut state);
                    return Err(StoreError::Fatal(e));
                }
            }
        }

        if state.last_commit.elapsed() > self.commit_interval {
            self.commit_locked(&mut state)?;
        }
        Ok(affected)
    }

    /// Fetch at most one row through the open transaction, so reads observe
    /// the session's own uncommitted writes.
    pub(crate) fn fetch_optional(&self, statement: &Statement) -> Result<Option<SqliteRow>> {
        let (sql, values) = statement;
        let mut state = self.lock_state();
        let tx = state.tx.as_mut().ok_or(StoreError::Closed)?;
        self.runtime
            .block_on(async { db::bind_values(sql, values)?.fetch_optional(&mut **tx).await })
            .map_err(StoreError::Query)
    }

    pub(crate) fn fetch_one(&self, statement: &Statement) -> Result<SqliteRow> {
        let (sql, values) = statement;
        let mut state = self.lock_state();
        let tx = state.tx.as_mut().ok_or(StoreError::Closed)?;
        self.runtime
            .block_on(async { db::bind_values(sql, values)?.fetch_one(&mut **tx).await })
            .map_err(StoreError::Query)
    }

    /// Caller must already hold the store lock.
    fn commit_locked(&self, state: &mut WriterState) -> Result<()> {
        let Some(tx) = state.tx.take() else {
            return Err(StoreError::Closed);
        };
        if let Err(e) = self.runtime.block_on(tx.commit()) {
            error!("Commit failed on {}: {}", self.db_path.display(), e);
            self.runtime.block_on(self.pool.close());
            return Err(StoreError::Fatal(e));
        }
        match self.runtime.block_on(self.pool.begin()) {
            Ok(tx) => state.tx = Some(tx),
            Err(e) => {
                error!("Begin failed on {}: {}", self.db_path.display(), e);
                self.runtime.block_on(self.pool.close());
                return Err(StoreError::Fatal(e));
            }
        }
        state.last_commit = Instant::now();
        state.commits += 1;
        info!("Commit: {}", self.db_path.display());
        Ok(())
    }

    /// Best-effort flush after a failed write, then close. The store's state
    /// after a write error is not trusted for further writes.
    fn abort_locked(&self, state: &mut WriterState) {
        if let Some(tx) = state.tx.take() {
            if let Err(e) = self.runtime.block_on(tx.commit()) {
                warn!("Flush after write error failed: {}", e);
            }
        }
        self.runtime.block_on(self.pool.close());
        debug!("Store closed after fatal error: {}", self.db_path.display());
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to flush {} on drop: {}", self.db_path.display(), e);
        }
    }
}
