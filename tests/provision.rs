//! Tests for the create-or-open segment file helper.

use mmap_txn::{open_segment_file, remove_segment_file, MmapError, Value};
use std::cell::Cell;
use std::fs;
use tempfile::tempdir;

#[test]
fn fresh_file_runs_initializer_once() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("fresh.seg");
    let calls = Cell::new(0);

    let mut seg = open_segment_file(&path, 0o600, 256, |seg| {
        calls.set(calls.get() + 1);
        seg.set(0, &[Value::U32(0xC0FF_EE00)])?;
        Ok(())
    })
    .expect("create");
    assert_eq!(calls.get(), 1);
    assert_eq!(seg.len(), 256);
    seg.close().expect("close");
    assert_eq!(fs::metadata(&path).expect("metadata").len(), 256);

    let mut seg = open_segment_file(&path, 0o600, 256, |_| {
        calls.set(calls.get() + 1);
        Ok(())
    })
    .expect("reopen");
    assert_eq!(calls.get(), 1);
    let mut out = [Value::U32(0)];
    seg.get(0, &mut out).expect("get");
    assert_eq!(out[0], Value::U32(0xC0FF_EE00));
    seg.close().expect("close");

    remove_segment_file(&path).expect("remove");
    assert!(!path.exists());
}

#[test]
fn existing_file_is_resized_to_target() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("resized.seg");
    fs::write(&path, b"pre-existing").expect("seed");

    let mut seg = open_segment_file(&path, 0o600, 8192, |_| {
        panic!("initializer must not run for an existing file")
    })
    .expect("open");
    assert_eq!(seg.len(), 8192);
    let mut buf = [0u8; 12];
    seg.read_at(&mut buf, 0).expect("read");
    assert_eq!(&buf, b"pre-existing");
    seg.close().expect("close");

    assert_eq!(fs::metadata(&path).expect("metadata").len(), 8192);
}

#[test]
fn failed_initializer_removes_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("broken.seg");

    let result = open_segment_file(&path, 0o600, 64, |seg| {
        seg.set(0, &[Value::U8(1)])?;
        Err(MmapError::IllegalOperation("init"))
    });
    assert!(matches!(result, Err(MmapError::IllegalOperation("init"))));
    assert!(!path.exists());
}

#[test]
fn zero_size_is_rejected_without_leaving_a_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.seg");

    let result = open_segment_file(&path, 0o600, 0, |_| Ok(()));
    assert!(matches!(result, Err(MmapError::InvalidLength(0))));
    assert!(!path.exists());
}

#[cfg(unix)]
#[test]
fn permission_bits_apply_on_create() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("perm.seg");
    let mut seg = open_segment_file(&path, 0o600, 64, |_| Ok(())).expect("create");
    seg.close().expect("close");

    let mode = fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
