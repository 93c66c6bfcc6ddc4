use sea_query::{Expr, Func, OnConflict, Order, Query, SimpleExpr, SqliteQueryBuilder};

use super::Statement;
use crate::schema::Media;

/// INSERT INTO media (seqno) VALUES (?) ON CONFLICT DO NOTHING
pub fn insert_or_ignore(seqno: i64) -> Statement {
    Query::insert()
        .into_table(Media::Table)
        .columns([Media::Seqno])
        .values_panic([seqno.into()])
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .build(SqliteQueryBuilder)
}

/// UPDATE media SET <col> = <value>, ... WHERE seqno = ?
///
/// Returns None when there is nothing to assign.
pub fn update_fields(seqno: i64, assignments: Vec<(Media, SimpleExpr)>) -> Option<Statement> {
    if assignments.is_empty() {
        return None;
    }
    let mut stmt = Query::update();
    stmt.table(Media::Table);
    for (col, value) in assignments {
        stmt.value(col, value);
    }
    stmt.and_where(Expr::col(Media::Seqno).eq(seqno));
    Some(stmt.build(SqliteQueryBuilder))
}

/// SELECT (size IS NOT NULL OR IFNULL(notfound, 0) <> 0) FROM media WHERE seqno = ?
pub fn select_resolved(seqno: i64) -> Statement {
    Query::select()
        .expr(
            Expr::col(Media::Size)
                .is_not_null()
                .or(Expr::expr(Func::if_null(Expr::col(Media::Notfound), 0)).ne(0)),
        )
        .from(Media::Table)
        .and_where(Expr::col(Media::Seqno).eq(seqno))
        .build(SqliteQueryBuilder)
}

/// SELECT (IFNULL(noback, 0) <> 0 OR IFNULL(notfound, 0) <> 0) FROM media WHERE seqno = ?
pub fn select_back_skippable(seqno: i64) -> Statement {
    Query::select()
        .expr(
            Expr::expr(Func::if_null(Expr::col(Media::Noback), 0))
                .ne(0)
                .or(Expr::expr(Func::if_null(Expr::col(Media::Notfound), 0)).ne(0)),
        )
        .from(Media::Table)
        .and_where(Expr::col(Media::Seqno).eq(seqno))
        .build(SqliteQueryBuilder)
}

/// SELECT MAX(position) FROM media
pub fn select_max_position() -> Statement {
    Query::select()
        .expr(Func::max(Expr::col(Media::Position)))
        .from(Media::Table)
        .build(SqliteQueryBuilder)
}

/// SELECT COUNT(*), COUNT(size), SUM(IFNULL(notfound, 0) <> 0), SUM(size IS NOT NULL OR IFNULL(notfound, 0) <> 0) FROM media
pub fn select_counts() -> Statement {
    let notfound = Expr::expr(Func::if_null(Expr::col(Media::Notfound), 0)).ne(0);
    Query::select()
        .expr(Func::count(Expr::col(sea_query::Asterisk)))
        .expr(Func::count(Expr::col(Media::Size)))
        .expr(Func::if_null(Func::sum(notfound.clone()), 0))
        .expr(Func::if_null(
            Func::sum(Expr::col(Media::Size).is_not_null().or(notfound)),
            0,
        ))
        .from(Media::Table)
        .build(SqliteQueryBuilder)
}

/// SELECT seqno, data FROM media WHERE data IS NOT NULL ORDER BY seqno
pub fn select_data_in_order() -> Statement {
    Query::select()
        .columns([Media::Seqno, Media::Data])
        .from(Media::Table)
        .and_where(Expr::col(Media::Data).is_not_null())
        .order_by(Media::Seqno, Order::Asc)
        .build(SqliteQueryBuilder)
}
