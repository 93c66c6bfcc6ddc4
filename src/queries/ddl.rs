use sea_query::{ColumnDef, Index, IndexCreateStatement, SqliteQueryBuilder, Table};

use crate::schema::{Comment, Kvs, Media};

/// CREATE TABLE IF NOT EXISTS media (
///     seqno     INTEGER PRIMARY KEY NOT NULL UNIQUE,
///     current   INTEGER,
///     position  REAL,
///     notfound  INTEGER,
///     noback    INTEGER,
///     bandwidth INTEGER,
///     size      INTEGER,
///     m3u8ms    INTEGER,
///     hdrms     INTEGER,
///     chunkms   INTEGER,
///     data      BLOB
/// )
pub fn create_media_table() -> String {
    Table::create()
        .table(Media::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Media::Seqno)
                .integer()
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Media::Current).integer())
        .col(ColumnDef::new(Media::Position).double())
        .col(ColumnDef::new(Media::Notfound).integer())
        .col(ColumnDef::new(Media::Noback).integer())
        .col(ColumnDef::new(Media::Bandwidth).integer())
        .col(ColumnDef::new(Media::Size).integer())
        .col(ColumnDef::new(Media::M3u8ms).integer())
        .col(ColumnDef::new(Media::Hdrms).integer())
        .col(ColumnDef::new(Media::Chunkms).integer())
        .col(ColumnDef::new(Media::Data).blob())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS comment (
///     vpos INTEGER NOT NULL, date INTEGER NOT NULL, date_usec INTEGER NOT NULL,
///     date2 INTEGER NOT NULL, no INTEGER, anonymity INTEGER,
///     user_id TEXT NOT NULL, content TEXT NOT NULL, mail TEXT,
///     premium INTEGER, score INTEGER, thread INTEGER, origin TEXT,
///     locale TEXT, hash TEXT UNIQUE NOT NULL
/// )
pub fn create_comment_table() -> String {
    Table::create()
        .table(Comment::Table)
        .if_not_exists()
        .col(ColumnDef::new(Comment::Vpos).integer().not_null())
        .col(ColumnDef::new(Comment::Date).integer().not_null())
        .col(ColumnDef::new(Comment::DateUsec).integer().not_null())
        .col(ColumnDef::new(Comment::Date2).integer().not_null())
        .col(ColumnDef::new(Comment::No).integer())
        .col(ColumnDef::new(Comment::Anonymity).integer())
        .col(ColumnDef::new(Comment::UserId).text().not_null())
        .col(ColumnDef::new(Comment::Content).text().not_null())
        .col(ColumnDef::new(Comment::Mail).text())
        .col(ColumnDef::new(Comment::Premium).integer())
        .col(ColumnDef::new(Comment::Score).integer())
        .col(ColumnDef::new(Comment::Thread).integer())
        .col(ColumnDef::new(Comment::Origin).text())
        .col(ColumnDef::new(Comment::Locale).text())
        .col(ColumnDef::new(Comment::Hash).text().unique_key().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS kvs (k TEXT PRIMARY KEY NOT NULL UNIQUE, v BLOB)
pub fn create_kvs_table() -> String {
    Table::create()
        .table(Kvs::Table)
        .if_not_exists()
        .col(ColumnDef::new(Kvs::K).text().not_null().primary_key())
        .col(ColumnDef::new(Kvs::V).blob())
        .to_string(SqliteQueryBuilder)
}

fn index(name: &str, table: impl sea_query::IntoTableRef) -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name(name)
        .table(table)
        .to_owned()
}

/// Indexes on media: unique seqno, resume position, and the diagnostic columns
pub fn create_media_indexes() -> Vec<String> {
    vec![
        index("media0", Media::Table)
            .col(Media::Seqno)
            .unique()
            .to_string(SqliteQueryBuilder),
        index("media1", Media::Table)
            .col(Media::Position)
            .to_string(SqliteQueryBuilder),
        // diagnostics
        index("media100", Media::Table)
            .col(Media::Size)
            .to_string(SqliteQueryBuilder),
        index("media101", Media::Table)
            .col(Media::Notfound)
            .to_string(SqliteQueryBuilder),
        index("media102", Media::Table)
            .col(Media::M3u8ms)
            .to_string(SqliteQueryBuilder),
        index("media103", Media::Table)
            .col(Media::Hdrms)
            .to_string(SqliteQueryBuilder),
        index("media104", Media::Table)
            .col(Media::Chunkms)
            .to_string(SqliteQueryBuilder),
    ]
}

/// Indexes on comment: unique hash, chronological cursor, ordinal
pub fn create_comment_indexes() -> Vec<String> {
    vec![
        index("comment0", Comment::Table)
            .col(Comment::Hash)
            .unique()
            .to_string(SqliteQueryBuilder),
        index("comment100", Comment::Table)
            .col(Comment::Date2)
            .to_string(SqliteQueryBuilder),
        index("comment101", Comment::Table)
            .col(Comment::No)
            .to_string(SqliteQueryBuilder),
    ]
}

/// CREATE UNIQUE INDEX IF NOT EXISTS kvs0 ON kvs(k)
pub fn create_kvs_index() -> String {
    index("kvs0", Kvs::Table)
        .col(Kvs::K)
        .unique()
        .to_string(SqliteQueryBuilder)
}

/// Every DDL statement in creation order
pub fn all_statements() -> Vec<String> {
    let mut statements = vec![create_media_table()];
    statements.extend(create_media_indexes());
    statements.push(create_comment_table());
    statements.extend(create_comment_indexes());
    statements.push(create_kvs_table());
    statements.push(create_kvs_index());
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_statements_are_idempotent_forms() {
        for sql in all_statements() {
            assert!(sql.contains("IF NOT EXISTS"), "not idempotent: {}", sql);
        }
    }

    #[test]
    fn test_unique_indexes() {
        let media = create_media_indexes();
        assert!(media[0].starts_with("CREATE UNIQUE INDEX"));
        assert!(media[0].contains("\"media0\""));
        let comment = create_comment_indexes();
        assert!(comment[0].starts_with("CREATE UNIQUE INDEX"));
        assert!(comment[0].contains("\"hash\""));
        assert!(create_kvs_index().starts_with("CREATE UNIQUE INDEX"));
    }
}
