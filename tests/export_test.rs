mod common;

use std::fs;

use common::{comment, db_path_in, open_store};
use save_live_stream::export::{write_comments, write_media};
use save_live_stream::{SegmentUpdate, SessionStore, StoreConfig};

#[test]
fn test_comment_export_escapes_and_orders() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir, "lv400.sqlite");
    let store = open_store(&db_path);

    let mut second = comment("second", 1001, 0, "plain");
    second.mail = Some("x\"y".to_string());
    store.ingest(&second).unwrap();
    store.ingest(&comment("first", 1000, 500000, "a&b<c")).unwrap();
    store.commit().unwrap();

    let summary = write_comments(&db_path, &db_path).unwrap();
    assert_eq!(summary.items, 2);
    assert_eq!(summary.path, dir.path().join("lv400.xml"));

    let xml = fs::read_to_string(&summary.path).unwrap();
    let lines: Vec<&str> = xml.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<packet>",
            r#"<chat thread="1" vpos="100" date="1000" date_usec="500000" user_id="abc">a&amp;b&lt;c</chat>"#,
            r#"<chat thread="1" vpos="100" date="1001" date_usec="0" user_id="abc" mail="x&quot;y">plain</chat>"#,
            "</packet>",
        ]
    );
}

#[test]
fn test_optional_comment_fields_exported() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir, "lv401.sqlite");
    let store = open_store(&db_path);

    let mut c = comment("full", 1000, 1, "hi");
    c.no = Some(12);
    c.anonymity = Some(1);
    c.premium = Some(1);
    c.score = Some(-1000);
    c.origin = Some("C".to_string());
    c.locale = Some("en-us".to_string());
    c.thread = None;
    store.ingest(&c).unwrap();
    store.close().unwrap();

    let summary = write_comments(&db_path, dir.path().join("out")).unwrap();
    let xml = fs::read_to_string(&summary.path).unwrap();
    assert!(
        xml.contains(
            r#"<chat thread="0" vpos="100" date="1000" date_usec="1" user_id="abc" no="12" anonymity="1" origin="C" premium="1" score="-1000" locale="en-us">hi</chat>"#
        ),
        "{}",
        xml
    );
    assert_eq!(summary.path, dir.path().join("out.xml"));
}

#[test]
fn test_second_export_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir, "lv402.sqlite");
    let store = open_store(&db_path);
    store.ingest(&comment("a", 1000, 0, "one")).unwrap();
    store.commit().unwrap();

    let first = write_comments(&db_path, &db_path).unwrap();
    let first_contents = fs::read_to_string(&first.path).unwrap();

    store.ingest(&comment("b", 1001, 0, "two")).unwrap();
    store.commit().unwrap();
    let second = write_comments(&db_path, &db_path).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(second.path, dir.path().join("lv402-1.xml"));
    assert_eq!(fs::read_to_string(&first.path).unwrap(), first_contents);
    assert_eq!(second.items, 2);
}

#[test]
fn test_empty_comment_export() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir, "lv403.sqlite");
    open_store(&db_path).close().unwrap();

    let summary = write_comments(&db_path, &db_path).unwrap();
    assert_eq!(summary.items, 0);
    let xml = fs::read_to_string(&summary.path).unwrap();
    assert_eq!(
        xml,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<packet>\n</packet>\n"
    );
}

#[test]
fn test_media_export_concatenates_in_seqno_order() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir, "lv404.sqlite");
    let store = open_store(&db_path);

    store
        .upsert_segment(3, &SegmentUpdate::new().data(b"ccc".to_vec()))
        .unwrap();
    store
        .upsert_segment(1, &SegmentUpdate::new().data(b"a".to_vec()))
        .unwrap();
    store
        .upsert_segment(2, &SegmentUpdate::new().data(b"bb".to_vec()))
        .unwrap();
    store
        .upsert_segment(4, &SegmentUpdate::new().notfound(true))
        .unwrap();
    store.mark_no_back(0).unwrap();
    store.close().unwrap();

    let summary = write_media(&db_path, &db_path).unwrap();
    assert_eq!(summary.items, 3);
    assert_eq!(summary.path, dir.path().join("lv404.ts"));
    assert_eq!(fs::read(&summary.path).unwrap(), b"abbccc".to_vec());
}

fn export_sees_only_committed(wal: bool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = db_path_in(&dir, "lv405.sqlite");
    let config = StoreConfig {
        wal,
        lock_file: false,
        ..StoreConfig::default()
    };
    let store = SessionStore::open(&db_path, &config).unwrap();

    for i in 0..3 {
        store
            .ingest(&comment(&format!("c{}", i), 1000 + i, 0, "committed"))
            .unwrap();
    }
    store.commit().unwrap();
    store.ingest(&comment("pending", 2000, 0, "pending")).unwrap();

    let summary = write_comments(&db_path, &db_path).unwrap();
    assert_eq!(summary.items, 3, "wal={}", wal);
    let xml = fs::read_to_string(&summary.path).unwrap();
    assert!(!xml.contains("pending"), "wal={}: {}", wal, xml);

    // The writer keeps going after the export
    store.commit().unwrap();
    assert_eq!(store.comment_count().unwrap(), 4);
    store.close().unwrap();

    let summary = write_comments(&db_path, &db_path).unwrap();
    assert_eq!(summary.items, 4, "wal={}", wal);
}

#[test]
fn test_export_skips_pending_writes_wal() {
    export_sees_only_committed(true);
}

#[test]
fn test_export_skips_pending_writes_rollback_journal() {
    export_sees_only_committed(false);
}
