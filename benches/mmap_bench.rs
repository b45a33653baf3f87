use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use mmap_txn::{MapFlags, MapMode, MappedSegment, Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

// Simple helper to build a unique temp path per bench
fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_txn_bench_{}_{}", name, std::process::id()));
    p
}

fn rw_segment(path: &Path, size: usize) -> MappedSegment {
    let file = fs::OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(path)
        .expect("open");
    file.set_len(size as u64).expect("set_len");
    let map = Mapping::new(&file, 0, size, MapMode::ReadWrite, MapFlags::empty()).expect("map");
    MappedSegment::new(map)
}

fn bench_map_unaligned(b: &mut Criterion) {
    let mut group = b.benchmark_group("map_unaligned");
    let path = tmp_path("map_unaligned");
    let _ = fs::remove_file(&path);
    fs::write(&path, vec![0u8; 1024 * 1024]).expect("seed");
    let file = fs::File::open(&path).expect("open");

    for &len in &[64_usize, 4 * 1024, 256 * 1024] {
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |ben, &len| {
            ben.iter(|| {
                let mut map = Mapping::new(&file, 4097, len, MapMode::ReadOnly, MapFlags::empty())
                    .expect("map");
                criterion::black_box(map.address());
                map.close().expect("close");
            })
        });
    }
    group.finish();
    let _ = fs::remove_file(&path);
}

fn bench_segment_codec(b: &mut Criterion) {
    let mut group = b.benchmark_group("segment_codec");
    let path = tmp_path("segment_codec");
    let _ = fs::remove_file(&path);
    let mut seg = rw_segment(&path, 64 * 1024);
    let record = [
        Value::U8(1),
        Value::U16(2),
        Value::U32(3),
        Value::U64(4),
    ];

    group.throughput(Throughput::Bytes(15));
    group.bench_function("set_record", |ben| {
        ben.iter(|| seg.set(128, criterion::black_box(&record)).expect("set"))
    });
    group.bench_function("get_record", |ben| {
        let mut out = [Value::U8(0), Value::U16(0), Value::U32(0), Value::U64(0)];
        ben.iter(|| seg.get(128, &mut out).expect("get"))
    });
    group.bench_function("inc_record", |ben| {
        ben.iter(|| seg.inc(128, &record).expect("inc"))
    });
    group.finish();

    seg.close().expect("close");
    let _ = fs::remove_file(&path);
}

fn bench_transaction_commit(b: &mut Criterion) {
    let mut group = b.benchmark_group("transaction_commit");
    let path = tmp_path("transaction_commit");
    let _ = fs::remove_file(&path);
    let size = 1024 * 1024;
    let mut seg = rw_segment(&path, size);

    for &len in &[64_usize, 4 * 1024, 256 * 1024] {
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::new("commit", len), &len, |ben, &len| {
            let payload = vec![0xAB_u8; len];
            ben.iter_batched(
                || payload.clone(),
                |payload| {
                    let mut tx = seg.begin(0, len).expect("begin");
                    tx.write_at(&payload, 0).expect("write");
                    tx.commit().expect("commit");
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_with_input(BenchmarkId::new("rollback", len), &len, |ben, &len| {
            ben.iter(|| {
                let mut tx = seg.begin(0, len).expect("begin");
                tx.rollback().expect("rollback");
            })
        });
    }
    group.finish();

    seg.close().expect("close");
    let _ = fs::remove_file(&path);
}

criterion_group!(
    benches,
    bench_map_unaligned,
    bench_segment_codec,
    bench_transaction_commit
);
criterion_main!(benches);
