use sea_query::{Alias, Expr, Func, OnConflict, Query, SqliteQueryBuilder, Value};

use super::Statement;
use crate::schema::Kvs;

/// SELECT CAST(v AS REAL) FROM kvs WHERE k = ?
pub fn select_real_by_key(key: &str) -> Statement {
    Query::select()
        .expr(Func::cast_as(Expr::col(Kvs::V), Alias::new("REAL")))
        .from(Kvs::Table)
        .and_where(Expr::col(Kvs::K).eq(key))
        .build(SqliteQueryBuilder)
}

/// SELECT CAST(v AS TEXT) FROM kvs WHERE k = ?
pub fn select_text_by_key(key: &str) -> Statement {
    Query::select()
        .expr(Func::cast_as(Expr::col(Kvs::V), Alias::new("TEXT")))
        .from(Kvs::Table)
        .and_where(Expr::col(Kvs::K).eq(key))
        .build(SqliteQueryBuilder)
}

/// INSERT INTO kvs (k, v) VALUES (?, ?) ON CONFLICT (k) DO UPDATE SET v = excluded.v
pub fn upsert(key: &str, value: Value) -> Statement {
    Query::insert()
        .into_table(Kvs::Table)
        .columns([Kvs::K, Kvs::V])
        .values_panic([key.into(), value.into()])
        .on_conflict(OnConflict::column(Kvs::K).update_column(Kvs::V).to_owned())
        .build(SqliteQueryBuilder)
}
