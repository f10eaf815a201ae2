use std::fs;

use incidra::{Checkpoint, CheckpointError, CheckpointStore, JsonFileCheckpointStore};
use tempfile::tempdir;

#[test]
fn first_run_loads_an_empty_checkpoint() {
    let dir = tempdir().expect("temp dir");
    let store = JsonFileCheckpointStore::new(dir.path().join("checkpoint.json"));
    let checkpoint = store.load().expect("missing file is not an error");
    assert!(checkpoint.is_empty());
}

#[test]
fn save_fully_overwrites_previous_state() {
    let dir = tempdir().expect("temp dir");
    let mut store = JsonFileCheckpointStore::new(dir.path().join("checkpoint.json"));

    let mut first = Checkpoint::new();
    first.advance(0, 5);
    first.advance(1, 7);
    store.save(&first).expect("first save");

    let mut second = Checkpoint::new();
    second.advance(0, 9);
    store.save(&second).expect("second save replaces the state");

    let loaded = store.load().expect("load after overwrite");
    assert_eq!(loaded.last_processed(0), Some(9));
    assert_eq!(loaded.last_processed(1), None);
    assert_eq!(loaded.len(), 1);
}

#[test]
fn string_keys_normalize_to_partition_ids() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, r#"{"3": 12, " 7 ": 40}"#).expect("seed state written by an earlier tool");

    let store = JsonFileCheckpointStore::new(&path);
    let checkpoint = store.load().expect("string keys are accepted");
    assert_eq!(checkpoint.last_processed(3), Some(12));
    assert_eq!(checkpoint.last_processed(7), Some(40));
}

#[test]
fn non_numeric_keys_are_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, r#"{"zero": 1}"#).expect("seed malformed state");

    let store = JsonFileCheckpointStore::new(&path);
    let err = store.load().expect_err("non-numeric partition key");
    assert!(matches!(err, CheckpointError::Malformed { .. }));
}

#[test]
fn malformed_documents_are_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("checkpoint.json");
    fs::write(&path, "[1, 2, 3]").expect("seed non-object state");

    let store = JsonFileCheckpointStore::new(&path);
    assert!(matches!(
        store.load(),
        Err(CheckpointError::Malformed { .. })
    ));
}

#[test]
fn advance_never_regresses_an_entry() {
    let mut checkpoint = Checkpoint::new();
    checkpoint.advance(0, 10);
    checkpoint.advance(0, 8);
    assert_eq!(checkpoint.last_processed(0), Some(10));
    checkpoint.advance(0, 11);
    assert_eq!(checkpoint.last_processed(0), Some(11));
}
