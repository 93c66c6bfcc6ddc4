//! SQL for every table, built with sea-query against the SQLite dialect.
//!
//! DDL is rendered to plain text; everything else is returned as SQL with
//! `?` placeholders plus the values to bind.

pub mod comments;
pub mod ddl;
pub mod kvs;
pub mod media;

/// SQL text with its bind values
pub type Statement = (String, sea_query::Values);
