#![cfg(feature = "io-csv")]

use std::io::Write;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use tabflow::testing::people_schema;
use tabflow::{CsvTable, InsertOptions, MemoryTable, TabflowError, TabularResource, Transfer, Value};

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_select_parses_values_per_column_type() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "people.csv",
        "id,name,score\n1,ada,9.5\n2,grace,8.0\n",
    );
    let table = CsvTable::new("people", &path, people_schema());

    let mut select = table.open_select().unwrap();
    assert!(select.advance().unwrap());
    assert_eq!(select.value(0).unwrap(), json!(1));
    assert_eq!(select.value_by_name("name").unwrap(), json!("ada"));
    assert_eq!(select.value(2).unwrap(), json!(9.5));
    assert!(select.advance().unwrap());
    assert!(!select.advance().unwrap());
    assert_eq!(select.position(), 2);
}

#[test]
fn test_empty_field_reads_as_null() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "people.csv", "id,name,score\n1,,9.5\n");
    let table = CsvTable::new("people", &path, people_schema());
    let mut select = table.open_select().unwrap();
    assert!(select.advance().unwrap());
    assert_eq!(select.value(1).unwrap(), Value::Null);
}

#[test]
fn test_unparseable_field_is_a_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "people.csv", "id,name,score\nnot-a-number,ada,9.5\n");
    let table = CsvTable::new("people", &path, people_schema());
    let mut select = table.open_select().unwrap();
    let err = select.advance().unwrap_err();
    match err {
        TabflowError::SchemaMismatch { resource, column, value, .. } => {
            assert_eq!(resource, "people");
            assert_eq!(column, "id");
            assert_eq!(value, "not-a-number");
        }
        other => panic!("expected SchemaMismatch, got {other}"),
    }
}

#[test]
fn test_reset_replays_the_file_without_reopening_the_resource() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "people.csv", "id,name,score\n1,ada,9.5\n2,grace,8.0\n");
    let table = CsvTable::new("people", &path, people_schema());
    let mut select = table.open_select().unwrap();

    let mut first = Vec::new();
    while select.advance().unwrap() {
        first.push(select.record().unwrap());
    }
    select.reset().unwrap();
    assert_eq!(select.position(), 0);
    let mut second = Vec::new();
    while select.advance().unwrap() {
        second.push(select.record().unwrap());
    }
    assert_eq!(first, second, "the same records come back in the same order");
}

#[test]
fn test_insert_writes_header_and_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    let table = CsvTable::new("out", &path, people_schema());

    let mut insert = table.open_insert(InsertOptions::default()).unwrap();
    insert
        .insert(vec![json!(1), json!("ada"), json!(9.5)])
        .unwrap();
    insert.insert(vec![json!(2), json!("grace"), json!(8.0)]).unwrap();
    insert.close().unwrap();
    assert_eq!(insert.listener().row_count(), 2);

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("id,name,score\n"), "header row first: {content}");
    assert!(content.contains("1,ada,9.5"), "rows follow: {content}");
    assert_eq!(table.row_count().unwrap(), 2);
}

#[test]
fn test_transfer_memory_to_csv_and_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.csv");

    let source = tabflow::testing::people_table().unwrap();
    let file = CsvTable::new("people_file", &path, people_schema()).into_handle();
    let out = Transfer::new(source, file.clone()).run().unwrap();
    assert_eq!(out.rows, 3);

    let back = Arc::new(MemoryTable::new("people_back", people_schema()));
    let report = Transfer::new(file, back.clone()).run().unwrap();
    assert_eq!(report.rows, 3);
    assert_eq!(back.rows(), tabflow::testing::people_rows());
}
