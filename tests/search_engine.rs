use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

use tabscan::ingest::{ingest, IngestionResult, ReaderSettings};
use tabscan::search::{search_chunked, SearchQuery, SearchRequest, SearchSession};
use tabscan::settings::SettingsStore;
use tabscan::view::{view_lines, view_page, LineSelection};
use tabscan::TabscanError;

const FRUIT: &str = "id;fruit;color\n1;apple;red\n2;banana;yellow\n3;apple;green\n";

async fn load(contents: &str) -> (NamedTempFile, IngestionResult) {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write contents");
    file.flush().expect("flush contents");

    let settings = ReaderSettings::new(b';')
        .with_worker_count(2)
        .with_lines_batch_size(2);
    let result = ingest(file.path(), settings).await.expect("ingest file");
    (file, result)
}

fn strings(rows: &[Vec<String>]) -> Vec<Vec<&str>> {
    rows.iter()
        .map(|row| row.iter().map(String::as_str).collect())
        .collect()
}

#[tokio::test]
async fn fruit_search_in_one_column() {
    let (_file, mut result) = load(FRUIT).await;
    let fruit = result.columns.index_of("fruit").expect("fruit column");
    let id = result.columns.index_of("id").expect("id column");
    result.columns.select_output(&[id, fruit]).expect("select");

    let mut session = SearchSession::new();
    let found = session
        .query(&result, &SearchQuery::new("apple").in_columns(vec![fruit]))
        .await
        .expect("search");

    assert_eq!(
        strings(&found.rows),
        vec![vec!["1", "apple"], vec!["3", "apple"]]
    );
    assert_eq!(found.total_records, 2);
}

#[tokio::test]
async fn fruit_search_sorted_by_color() {
    let (_file, mut result) = load(FRUIT).await;
    result.columns.set_order_by(Some(2)).expect("order by");

    let mut session = SearchSession::new();
    let found = session
        .query(&result, &SearchQuery::new("apple"))
        .await
        .expect("search");

    assert_eq!(
        strings(&found.rows),
        vec![vec!["3", "apple", "green"], vec!["1", "apple", "red"]]
    );
}

#[tokio::test]
async fn repeated_query_does_not_rescan() {
    let mut contents = String::from("id;text\n");
    for i in 0..500 {
        contents.push_str(&format!("{i};{}\n", if i % 5 == 0 { "needle" } else { "hay" }));
    }
    let (_file, result) = load(&contents).await;

    let mut session = SearchSession::new();
    let query = SearchQuery::new("needle").page(2).page_size(30);
    let first = session.query(&result, &query).await.expect("search");
    let second = session.query(&result, &query).await.expect("search");

    assert_eq!(first, second);
    assert_eq!(session.scan_count(), 1);
    assert_eq!(first.total_records, 100);
    assert_eq!(first.total_pages, 4);
    assert_eq!(first.rows[0][0], "150");

    session
        .query(&result, &query.clone().reset())
        .await
        .expect("search");
    assert_eq!(session.scan_count(), 2);
}

#[tokio::test]
async fn empty_lines_are_skipped_everywhere() {
    let (_file, result) = load("a;b\n1;x\n\n2;x\n\n").await;
    assert_eq!(result.lines.len(), 4);

    let request = Arc::new(SearchRequest::for_result(&result, ""));
    let rows = search_chunked(Arc::clone(&result.lines), request, 3)
        .await
        .expect("search");
    assert_eq!(strings(&rows), vec![vec!["1", "x"], vec!["2", "x"]]);

    let page = view_page(&result, 1, 10).expect("view");
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.total_records, 4);

    let lines = view_lines(&result, &LineSelection::parse("1-4").expect("parse"));
    assert_eq!(lines.rows.len(), 2);
}

#[tokio::test]
async fn short_and_quoted_lines_degrade_to_empty_fields() {
    let (_file, result) = load("a;b;c\n\"x;y\";z\nonly\n\"open;q\n").await;

    let request = Arc::new(SearchRequest::for_result(&result, ""));
    let rows = search_chunked(Arc::clone(&result.lines), request, 1)
        .await
        .expect("search");

    assert_eq!(
        strings(&rows),
        vec![
            vec!["x;y", "z", ""],
            vec!["only", "", ""],
            vec!["\"open;q", "", ""],
        ]
    );
}

#[tokio::test]
async fn stored_columns_change_search_output() {
    let (_file, mut result) = load(FRUIT).await;
    let data = TempDir::new().expect("data dir");
    let store = SettingsStore::new(data.path());

    result.columns.select_output(&[1]).expect("select");
    store.store_columns(&result).await.expect("store");
    result.reset_columns();

    assert!(store.apply_stored_columns(&mut result).await.expect("apply"));
    let mut session = SearchSession::new();
    let found = session
        .query(&result, &SearchQuery::new("banana"))
        .await
        .expect("search");
    assert_eq!(strings(&found.rows), vec![vec!["banana"]]);
}

#[tokio::test]
async fn malformed_stored_columns_are_rejected_before_search() {
    let (_file, mut result) = load(FRUIT).await;
    let data = TempDir::new().expect("data dir");
    let store = SettingsStore::new(data.path());

    let stored = r#"{
  "FileName": "fruit.csv",
  "FileColumns": [
    { "Index": 0, "Name": "id" },
    { "Index": 0, "Name": "id" },
    { "Index": 1, "Name": "fruit", "OrderBy": true }
  ]
}"#;
    let path = store.column_settings_path(&result.content_hash);
    std::fs::create_dir_all(path.parent().expect("settings dir")).expect("create settings dir");
    std::fs::write(&path, stored).expect("write settings");

    let err = store
        .apply_stored_columns(&mut result)
        .await
        .expect_err("duplicate index must be rejected");
    assert!(matches!(err, TabscanError::SettingsError { .. }));

    let mut session = SearchSession::new();
    let found = session
        .query(&result, &SearchQuery::new("apple"))
        .await
        .expect("search");
    let names: Vec<_> = found.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "fruit", "color"]);
    assert_eq!(
        strings(&found.rows),
        vec![vec!["1", "apple", "red"], vec!["3", "apple", "green"]]
    );
}

#[tokio::test]
async fn order_by_sorts_on_the_emitted_column() {
    let (_file, mut result) = load(FRUIT).await;
    result.columns.select_output(&[1, 2]).expect("select");
    result.columns.set_order_by(Some(2)).expect("order by");

    let mut session = SearchSession::new();
    let found = session
        .query(&result, &SearchQuery::new("a"))
        .await
        .expect("search");

    let names: Vec<_> = found.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["fruit", "color"]);
    assert_eq!(
        strings(&found.rows),
        vec![
            vec!["apple", "green"],
            vec!["apple", "red"],
            vec!["banana", "yellow"],
        ]
    );
}
