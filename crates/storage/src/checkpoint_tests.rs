// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use xport_core::OperationId;

use super::*;

fn store(dir: &Path) -> CheckpointStore {
    let guard = FilesystemGuard::new(vec![dir.to_path_buf()]);
    CheckpointStore::new(dir.to_path_buf(), guard)
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let op_id = OperationId::new();
    let ckpt = Checkpoint::new(op_id.clone(), "export", 1000).with_progress(0.5);
    store.save(&ckpt).unwrap();
    let loaded = store.load(&op_id).unwrap();
    assert_eq!(loaded.operation_id, op_id);
    assert_eq!(loaded.progress, 0.5);
}

#[test]
fn load_missing_returns_data_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let err = store.load(&OperationId::new()).unwrap_err();
    assert_eq!(err.kind(), xport_core::ErrorKind::DataMissing);
}

#[test]
fn delete_removes_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let op_id = OperationId::new();
    store.save(&Checkpoint::new(op_id.clone(), "export", 1000)).unwrap();
    store.delete(&op_id).unwrap();
    assert!(store.load(&op_id).is_err());
}

#[test]
fn list_returns_saved_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    store.save(&Checkpoint::new(OperationId::new(), "export", 1000)).unwrap();
    store.save(&Checkpoint::new(OperationId::new(), "export", 2000)).unwrap();
    assert_eq!(store.list().unwrap().len(), 2);
}

#[test]
fn expired_checkpoint_is_treated_as_missing_and_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path()).with_max_age(Duration::from_millis(10));
    let op_id = OperationId::new();
    store.save(&Checkpoint::new(op_id.clone(), "export", 1000)).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    let err = store.load(&op_id).unwrap_err();
    assert_eq!(err.kind(), xport_core::ErrorKind::DataMissing);
    assert!(!store.path_for(&op_id).exists());
}

#[test]
fn cleanup_removes_corrupted_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let op_id = OperationId::new();
    std::fs::write(store.path_for(&op_id), b"not json").unwrap();
    let removed = store.cleanup().unwrap();
    assert_eq!(removed, 1);
    assert!(!store.path_for(&op_id).exists());
}

#[test]
fn s3_save_load_save_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    let op_id = OperationId::new();
    let mut ckpt = Checkpoint::new(op_id.clone(), "export", 1000);
    ckpt.state.insert("zebra".to_string(), serde_json::json!(1));
    ckpt.state.insert("apple".to_string(), serde_json::json!(2));
    ckpt.metadata.insert("scope".to_string(), "collection".to_string());
    ckpt.metadata.insert("attempt".to_string(), "2".to_string());

    store.save(&ckpt).unwrap();
    let first_bytes = std::fs::read(store.path_for(&op_id)).unwrap();

    let loaded = store.load(&op_id).unwrap();
    store.save(&loaded).unwrap();
    let second_bytes = std::fs::read(store.path_for(&op_id)).unwrap();

    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn list_skips_corrupted_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path());
    std::fs::write(store.path_for(&OperationId::new()), b"garbage").unwrap();
    store.save(&Checkpoint::new(OperationId::new(), "export", 1000)).unwrap();
    assert_eq!(store.list().unwrap().len(), 1);
}
