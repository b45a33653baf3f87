//! Platform parity tests for sync visibility and copy-on-write isolation.
//!
//! Contract: after `sync()` on a read-write mapping the file holds the written
//! bytes; a copy-on-write mapping never changes the file, synced or not.

use mmap_txn::{MapFlags, MapMode, Mapping};
use std::fs;
use std::path::PathBuf;

fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "mmap_txn_platform_parity_{}_{}",
        name,
        std::process::id()
    ));
    p
}

#[test]
fn parity_read_write_sync_reaches_file() {
    let path = tmp_path("parity_read_write_sync_reaches_file");
    let _ = fs::remove_file(&path);
    fs::write(&path, vec![0u8; 8192]).expect("seed");

    let file = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .expect("open");
    let mut map = Mapping::new(&file, 0, 8192, MapMode::ReadWrite, MapFlags::empty())
        .expect("map");
    map.write_at(b"SHARED", 5000).expect("write");
    map.sync().expect("sync");

    let bytes = fs::read(&path).expect("read back");
    assert_eq!(&bytes[5000..5006], b"SHARED");

    map.close().expect("close");
    let _ = fs::remove_file(&path);
}

#[test]
fn parity_write_copy_never_reaches_file() {
    let path = tmp_path("parity_write_copy_never_reaches_file");
    let _ = fs::remove_file(&path);
    fs::write(&path, vec![0x11u8; 8192]).expect("seed");

    // a read-only handle is enough for a private mapping
    let file = fs::File::open(&path).expect("open");
    let mut map = Mapping::new(&file, 0, 8192, MapMode::WriteCopy, MapFlags::empty())
        .expect("map");
    map.write_at(b"PRIVATE", 100).expect("write");
    map.sync().expect("sync");

    let mut buf = [0u8; 7];
    map.read_at(&mut buf, 100).expect("read");
    assert_eq!(&buf, b"PRIVATE");

    let bytes = fs::read(&path).expect("read back");
    assert!(bytes[100..107].iter().all(|&b| b == 0x11));

    map.close().expect("close");
    let bytes = fs::read(&path).expect("read after close");
    assert!(bytes.iter().all(|&b| b == 0x11));

    let _ = fs::remove_file(&path);
}

#[test]
fn parity_unaligned_window_matches_file_bytes() {
    let path = tmp_path("parity_unaligned_window_matches_file_bytes");
    let _ = fs::remove_file(&path);
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &content).expect("seed");

    let file = fs::File::open(&path).expect("open");
    for &(offset, len) in &[(0_usize, 10_usize), (4097, 300), (65_537, 1000), (131_071, 2)] {
        let mut map = Mapping::new(&file, offset as i64, len, MapMode::ReadOnly, MapFlags::empty())
            .expect("map");
        assert_eq!(map.len(), len);
        assert_eq!(map.memory().expect("memory"), &content[offset..offset + len]);
        map.close().expect("close");
    }

    let _ = fs::remove_file(&path);
}
