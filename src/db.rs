use sea_query::{Value, Values};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
};
use sqlx::Sqlite;
use std::path::Path;

use crate::queries::ddl;

/// Open the writer pool for a session file, creating the file if needed.
///
/// The pool holds exactly one connection: the batching transaction owns it for
/// the whole session, so every statement must go through that transaction.
pub async fn open_database_connection(
    db_path: impl AsRef<Path>,
    wal: bool,
) -> Result<SqlitePool, sqlx::Error> {
    let journal_mode = if wal {
        SqliteJournalMode::Wal
    } else {
        SqliteJournalMode::Delete
    };
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(journal_mode);

    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Open a read-only pool (for exporters and status reports)
pub async fn open_readonly_connection(db_path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// Run every CREATE ... IF NOT EXISTS statement on the given executor
pub async fn init_database_schema(conn: &mut sqlx::SqliteConnection) -> Result<(), sqlx::Error> {
    for sql in ddl::all_statements() {
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Attach sea-query bind values to a sqlx query, in placeholder order
pub fn bind_values<'q>(
    sql: &'q str,
    values: &Values,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>, sqlx::Error> {
    let mut query = sqlx::query(sql);
    for value in values.0.iter().cloned() {
        query = match value {
            Value::Bool(v) => query.bind(v),
            Value::TinyInt(v) => query.bind(v.map(i64::from)),
            Value::SmallInt(v) => query.bind(v.map(i64::from)),
            Value::Int(v) => query.bind(v.map(i64::from)),
            Value::BigInt(v) => query.bind(v),
            Value::TinyUnsigned(v) => query.bind(v.map(i64::from)),
            Value::SmallUnsigned(v) => query.bind(v.map(i64::from)),
            Value::Unsigned(v) => query.bind(v.map(i64::from)),
            Value::BigUnsigned(v) => {
                let v = v
                    .map(i64::try_from)
                    .transpose()
                    .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
                query.bind(v)
            }
            Value::Float(v) => query.bind(v.map(f64::from)),
            Value::Double(v) => query.bind(v),
            Value::String(v) => query.bind(v.map(|s| *s)),
            Value::Char(v) => query.bind(v.map(|c| c.to_string())),
            Value::Bytes(v) => query.bind(v.map(|b| *b)),
            #[allow(unreachable_patterns)]
            other => {
                return Err(sqlx::Error::Protocol(format!(
                    "unsupported bind value: {:?}",
                    other
                )))
            }
        };
    }
    Ok(query)
}
