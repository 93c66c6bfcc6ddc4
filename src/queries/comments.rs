use sea_query::{Alias, Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};

use super::Statement;
use crate::comments::NewComment;
use crate::schema::Comment;

/// INSERT INTO comment (...) VALUES (...) ON CONFLICT (hash) DO NOTHING
/// `date2` is passed in already range-checked.
pub fn insert_or_ignore(comment: &NewComment, date2: i64) -> Statement {
    Query::insert()
        .into_table(Comment::Table)
        .columns([
            Comment::Vpos,
            Comment::Date,
            Comment::DateUsec,
            Comment::Date2,
            Comment::No,
            Comment::Anonymity,
            Comment::UserId,
            Comment::Content,
            Comment::Mail,
            Comment::Premium,
            Comment::Score,
            Comment::Thread,
            Comment::Origin,
            Comment::Locale,
            Comment::Hash,
        ])
        .values_panic([
            comment.vpos.into(),
            comment.date.into(),
            comment.date_usec.into(),
            date2.into(),
            comment.no.into(),
            comment.anonymity.into(),
            comment.user_id.clone().into(),
            comment.content.clone().into(),
            comment.mail.clone().into(),
            comment.premium.into(),
            comment.score.into(),
            comment.thread.into(),
            comment.origin.clone().into(),
            comment.locale.clone().into(),
            comment.hash.clone().into(),
        ])
        .on_conflict(OnConflict::column(Comment::Hash).do_nothing().to_owned())
        .build(SqliteQueryBuilder)
}

/// SELECT date2, no FROM comment ORDER BY date2 ASC LIMIT 1
pub fn select_earliest() -> Statement {
    Query::select()
        .columns([Comment::Date2, Comment::No])
        .from(Comment::Table)
        .order_by(Comment::Date2, Order::Asc)
        .limit(1)
        .build(SqliteQueryBuilder)
}

/// SELECT COUNT(*) FROM comment
pub fn select_count() -> Statement {
    Query::select()
        .expr(Func::count(Expr::col(sea_query::Asterisk)))
        .from(Comment::Table)
        .build(SqliteQueryBuilder)
}

/// SELECT vpos, date, date_usec, IFNULL(no, -1), IFNULL(anonymity, 0), user_id, content,
/// IFNULL(mail, ''), IFNULL(premium, 0), IFNULL(score, 0), IFNULL(thread, 0),
/// IFNULL(origin, ''), IFNULL(locale, '') FROM comment ORDER BY date2
pub fn select_for_export() -> Statement {
    Query::select()
        .columns([Comment::Vpos, Comment::Date, Comment::DateUsec])
        .expr_as(Func::if_null(Expr::col(Comment::No), -1), Alias::new("no"))
        .expr_as(
            Func::if_null(Expr::col(Comment::Anonymity), 0),
            Alias::new("anonymity"),
        )
        .columns([Comment::UserId, Comment::Content])
        .expr_as(Func::if_null(Expr::col(Comment::Mail), ""), Alias::new("mail"))
        .expr_as(
            Func::if_null(Expr::col(Comment::Premium), 0),
            Alias::new("premium"),
        )
        .expr_as(Func::if_null(Expr::col(Comment::Score), 0), Alias::new("score"))
        .expr_as(
            Func::if_null(Expr::col(Comment::Thread), 0),
            Alias::new("thread"),
        )
        .expr_as(
            Func::if_null(Expr::col(Comment::Origin), ""),
            Alias::new("origin"),
        )
        .expr_as(
            Func::if_null(Expr::col(Comment::Locale), ""),
            Alias::new("locale"),
        )
        .from(Comment::Table)
        .order_by(Comment::Date2, Order::Asc)
        .build(SqliteQueryBuilder)
}
