//! Integration tests for snapshot transactions.

use mmap_txn::{MapFlags, MapMode, Mapping, MmapError};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_txn_tx_test_{}_{}", name, std::process::id()));
    p
}

fn rw_mapping(path: &Path, size: usize) -> (File, Mapping) {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(path)
        .expect("open");
    file.set_len(size as u64).expect("set_len");
    let map = Mapping::new(&file, 0, size, MapMode::ReadWrite, MapFlags::empty()).expect("map");
    (file, map)
}

#[test]
fn rollback_restores_pre_begin_bytes() {
    let path = tmp_path("rollback_restores_pre_begin_bytes");
    let _ = fs::remove_file(&path);
    let (_file, mut map) = rw_mapping(&path, 4096);
    map.write_at(&[0xAA; 64], 1000).expect("seed");
    let before = map.memory().expect("memory")[1000..1064].to_vec();

    let mut tx = map.begin(1000, 64).expect("begin");
    tx.write_at(&[0x55; 64], 1000).expect("write");
    let mut staged = [0u8; 64];
    tx.read_at(&mut staged, 1000).expect("read staged");
    assert_eq!(staged, [0x55; 64]);
    tx.rollback().expect("rollback");
    drop(tx);

    assert_eq!(&map.memory().expect("memory")[1000..1064], before.as_slice());
    map.close().expect("close");
    let _ = fs::remove_file(&path);
}

#[test]
fn commit_is_visible_before_sync() {
    let path = tmp_path("commit_is_visible_before_sync");
    let _ = fs::remove_file(&path);
    let (_file, mut map) = rw_mapping(&path, 4096);

    let pattern: Vec<u8> = (0..128u8).collect();
    let mut tx = map.begin(2048, 128).expect("begin");
    assert_eq!(tx.write_at(&pattern, 2048).expect("write"), 128);
    tx.commit().expect("commit");
    drop(tx);

    let mut buf = vec![0u8; 128];
    map.read_at(&mut buf, 2048).expect("read");
    assert_eq!(buf, pattern);
    map.close().expect("close");
    let _ = fs::remove_file(&path);
}

#[test]
fn flush_commits_and_persists() {
    let path = tmp_path("flush_commits_and_persists");
    let _ = fs::remove_file(&path);
    let (_file, mut map) = rw_mapping(&path, 4096);

    let mut tx = map.begin(10, 5).expect("begin");
    tx.write_at(b"FLUSH", 10).expect("write");
    tx.flush().expect("flush");
    assert!(tx.is_closed());
    drop(tx);

    let bytes = fs::read(&path).expect("read back");
    assert_eq!(&bytes[10..15], b"FLUSH");
    map.close().expect("close");
    let _ = fs::remove_file(&path);
}

#[test]
fn transaction_writes_are_clipped_to_range() {
    let path = tmp_path("transaction_writes_are_clipped_to_range");
    let _ = fs::remove_file(&path);
    let (_file, mut map) = rw_mapping(&path, 64);

    let mut tx = map.begin(8, 4).expect("begin");
    // only 2 bytes fit before the end of the snapshot
    assert_eq!(tx.write_at(b"WXYZ", 10).expect("write"), 2);
    tx.commit().expect("commit");
    drop(tx);

    assert_eq!(&map.memory().expect("memory")[8..14], &[0, 0, b'W', b'X', 0, 0]);
    map.close().expect("close");
    let _ = fs::remove_file(&path);
}

#[test]
fn invalid_ranges_are_rejected() {
    let path = tmp_path("invalid_ranges_are_rejected");
    let _ = fs::remove_file(&path);
    let (_file, mut map) = rw_mapping(&path, 64);

    assert!(matches!(map.begin(64, 1), Err(MmapError::InvalidOffset(64))));
    assert!(matches!(map.begin(0, 0), Err(MmapError::InvalidLength(0))));
    assert!(matches!(map.begin(60, 5), Err(MmapError::InvalidLength(5))));
    assert!(map.memory().expect("memory").iter().all(|&b| b == 0));

    map.close().expect("close");
    let _ = fs::remove_file(&path);
}
