//! Read-only exports of a session file: comments as an XML chat packet and
//! media segments concatenated into a transport stream.
//!
//! Exporters open their own read-only connection and only see committed data.

use log::info;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio_stream::StreamExt;

use crate::constants::{COMMENT_EXTENSION, MEDIA_EXTENSION};
use crate::db;
use crate::error::{Result, StoreError};
use crate::queries::{comments, media};

/// Result of an export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    /// Comments or segments written
    pub items: u64,
}

/// A comment as read back for export, with absent columns already defaulted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatLine {
    pub thread: i64,
    pub vpos: i64,
    pub date: i64,
    pub date_usec: i64,
    pub user_id: String,
    /// -1 when the source assigned no ordinal
    pub no: i64,
    pub anonymity: i64,
    pub mail: String,
    pub origin: String,
    pub premium: i64,
    pub score: i64,
    pub locale: String,
    pub content: String,
}

impl ChatLine {
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Self {
            vpos: row.try_get(0)?,
            date: row.try_get(1)?,
            date_usec: row.try_get(2)?,
            no: row.try_get(3)?,
            anonymity: row.try_get(4)?,
            user_id: row.try_get(5)?,
            content: row.try_get(6)?,
            mail: row.try_get(7)?,
            premium: row.try_get(8)?,
            score: row.try_get(9)?,
            thread: row.try_get(10)?,
            origin: row.try_get(11)?,
            locale: row.try_get(12)?,
        })
    }

    /// Render as a single `<chat>` element. Optional attributes are only
    /// written when they carry a non-default value.
    pub fn to_xml(&self) -> String {
        let mut line = format!(
            r#"<chat thread="{}" vpos="{}" date="{}" date_usec="{}" user_id="{}""#,
            self.thread,
            self.vpos,
            self.date,
            self.date_usec,
            escape_attr(&self.user_id),
        );
        if self.no >= 0 {
            line.push_str(&format!(r#" no="{}""#, self.no));
        }
        if self.anonymity != 0 {
            line.push_str(&format!(r#" anonymity="{}""#, self.anonymity));
        }
        if !self.mail.is_empty() {
            line.push_str(&format!(r#" mail="{}""#, escape_attr(&self.mail)));
        }
        if !self.origin.is_empty() {
            line.push_str(&format!(r#" origin="{}""#, escape_attr(&self.origin)));
        }
        if self.premium != 0 {
            line.push_str(&format!(r#" premium="{}""#, self.premium));
        }
        if self.score != 0 {
            line.push_str(&format!(r#" score="{}""#, self.score));
        }
        if !self.locale.is_empty() {
            line.push_str(&format!(r#" locale="{}""#, escape_attr(&self.locale)));
        }
        line.push('>');
        line.push_str(&escape_text(&self.content));
        line.push_str("</chat>");
        line
    }
}

/// Escape element text. `&` goes first so entities are not escaped twice.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;")
}

/// Escape a double-quoted attribute value
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// Create the first file that does not exist yet among `name.ext`,
/// `name-1.ext`, `name-2.ext`, ...
///
/// Uses create-new semantics, so a file that appears concurrently is skipped
/// rather than overwritten.
pub fn create_next_available(path: &Path) -> std::io::Result<(PathBuf, File)> {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    let mut candidate = path.to_path_buf();
    let mut n: u64 = 0;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                n += 1;
                let name = match &ext {
                    Some(ext) => format!("{}-{}.{}", stem, n, ext),
                    None => format!("{}-{}", stem, n),
                };
                candidate = dir.join(name);
            }
            Err(e) => return Err(e),
        }
    }
}

async fn write_chat_packet(pool: &SqlitePool, target: &Path) -> Result<ExportSummary> {
    let (sql, values) = comments::select_for_export();
    let mut rows = db::bind_values(&sql, &values)
        .map_err(StoreError::Query)?
        .fetch(pool);

    // Surface read errors before anything is created on disk
    let first = rows.next().await.transpose().map_err(StoreError::Query)?;

    let (path, file) = create_next_available(target).map_err(|e| StoreError::io(target, e))?;
    let mut out = BufWriter::new(file);
    let io_err = |e| StoreError::io(&path, e);

    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#).map_err(io_err)?;
    writeln!(out, "<packet>").map_err(io_err)?;

    let mut items = 0u64;
    let mut next = first;
    while let Some(row) = next {
        let chat = ChatLine::from_row(&row).map_err(StoreError::Query)?;
        writeln!(out, "{}", chat.to_xml()).map_err(io_err)?;
        items += 1;
        next = rows.next().await.transpose().map_err(StoreError::Query)?;
    }

    writeln!(out, "</packet>").map_err(io_err)?;
    out.flush().map_err(io_err)?;

    Ok(ExportSummary { path, items })
}

async fn write_segments(pool: &SqlitePool, target: &Path) -> Result<ExportSummary> {
    let (sql, values) = media::select_data_in_order();
    let mut rows = db::bind_values(&sql, &values)
        .map_err(StoreError::Query)?
        .fetch(pool);

    let first = rows.next().await.transpose().map_err(StoreError::Query)?;

    let (path, file) = create_next_available(target).map_err(|e| StoreError::io(target, e))?;
    let mut out = BufWriter::new(file);
    let io_err = |e| StoreError::io(&path, e);

    let mut items = 0u64;
    let mut next = first;
    while let Some(row) = next {
        let data: Vec<u8> = row.try_get(1).map_err(StoreError::Query)?;
        out.write_all(&data).map_err(io_err)?;
        items += 1;
        next = rows.next().await.transpose().map_err(StoreError::Query)?;
    }
    out.flush().map_err(io_err)?;

    Ok(ExportSummary { path, items })
}

/// Run `f` against a fresh read-only pool on a throwaway runtime. Never takes
/// the writer lock, so it works while a recorder is still writing.
pub(crate) fn run_readonly<T, F, Fut>(db_path: &Path, f: F) -> Result<T>
where
    F: FnOnce(SqlitePool) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(StoreError::Runtime)?;
    runtime.block_on(async {
        let pool = db::open_readonly_connection(db_path)
            .await
            .map_err(StoreError::Query)?;
        let result = f(pool.clone()).await;
        pool.close().await;
        result
    })
}

/// Write every comment, oldest first, as `<name>.xml` (or the next free
/// numbered variant) next to `name_hint`.
pub fn write_comments(db_path: impl AsRef<Path>, name_hint: impl AsRef<Path>) -> Result<ExportSummary> {
    let target = name_hint.as_ref().with_extension(COMMENT_EXTENSION);
    let summary = run_readonly(db_path.as_ref(), |pool| async move {
        write_chat_packet(&pool, &target).await
    })?;
    info!(
        "Wrote {} comments to {}",
        summary.items,
        summary.path.display()
    );
    Ok(summary)
}

/// Concatenate every fetched segment body in seqno order into `<name>.ts`
pub fn write_media(db_path: impl AsRef<Path>, name_hint: impl AsRef<Path>) -> Result<ExportSummary> {
    let target = name_hint.as_ref().with_extension(MEDIA_EXTENSION);
    let summary = run_readonly(db_path.as_ref(), |pool| async move {
        write_segments(&pool, &target).await
    })?;
    info!(
        "Wrote {} segments to {}",
        summary.items,
        summary.path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_ampersand_first() {
        assert_eq!(escape_text("a&b<c"), "a&amp;b&lt;c");
        assert_eq!(escape_text("&lt;"), "&amp;lt;");
        assert_eq!(escape_text(r#"say "hi""#), r#"say "hi""#);
        assert_eq!(escape_attr(r#"x"y&<"#), "x&quot;y&amp;&lt;");
    }

    #[test]
    fn test_minimal_chat_omits_defaults() {
        let chat = ChatLine {
            thread: 1,
            vpos: 100,
            date: 1000,
            date_usec: 500000,
            user_id: "abc".into(),
            no: -1,
            content: "a&b<c".into(),
            ..Default::default()
        };
        assert_eq!(
            chat.to_xml(),
            r#"<chat thread="1" vpos="100" date="1000" date_usec="500000" user_id="abc">a&amp;b&lt;c</chat>"#
        );
    }

    #[test]
    fn test_full_chat_attribute_order() {
        let chat = ChatLine {
            thread: 2,
            vpos: 5,
            date: 10,
            date_usec: 20,
            user_id: "u".into(),
            no: 0,
            anonymity: 1,
            mail: "184".into(),
            origin: "C".into(),
            premium: 3,
            score: -500,
            locale: "ja-jp".into(),
            content: "hi".into(),
        };
        assert_eq!(
            chat.to_xml(),
            r#"<chat thread="2" vpos="5" date="10" date_usec="20" user_id="u" no="0" anonymity="1" mail="184" origin="C" premium="3" score="-500" locale="ja-jp">hi</chat>"#
        );
    }

    #[test]
    fn test_create_next_available_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("lv1.xml");

        let (first, _) = create_next_available(&target).unwrap();
        let (second, _) = create_next_available(&target).unwrap();
        let (third, _) = create_next_available(&target).unwrap();

        assert_eq!(first, target);
        assert_eq!(second, dir.path().join("lv1-1.xml"));
        assert_eq!(third, dir.path().join("lv1-2.xml"));
    }
}
