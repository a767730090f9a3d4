//! Core operation benchmarks: insert, query, encode/decode, and streaming
//! merge, at a few representative capacities.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bloomwire::{EncodedFilter, PartitionedFilter, WordView};

const SIZES: &[usize] = &[1_000, 100_000];

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for &size in SIZES {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let filter = PartitionedFilter::<u64>::new(size, 0.01).unwrap();
            let mut next = 0u64;
            b.iter(|| {
                filter.insert(black_box(&next));
                next = next.wrapping_add(1);
            });
        });
    }
    group.finish();
}

fn bench_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("contains");
    for &size in SIZES {
        let filter = PartitionedFilter::<u64>::new(size, 0.01).unwrap();
        for i in 0..size as u64 {
            filter.insert(&i);
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("hit", size), &filter, |b, filter| {
            let mut next = 0u64;
            b.iter(|| {
                let found = filter.contains(black_box(&(next % size as u64)));
                next = next.wrapping_add(1);
                found
            });
        });
        group.bench_with_input(BenchmarkId::new("miss", size), &filter, |b, filter| {
            let mut next = u64::MAX;
            b.iter(|| {
                let found = filter.contains(black_box(&next));
                next = next.wrapping_sub(1);
                found
            });
        });
    }
    group.finish();
}

fn bench_encoded_contains(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoded_contains");
    for &size in SIZES {
        let filter = PartitionedFilter::<u64>::new(size, 0.01).unwrap();
        for i in 0..size as u64 {
            filter.insert(&i);
        }
        let blob = filter.encode();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &blob, |b, blob| {
            let mut next = 0u64;
            b.iter(|| {
                let found = blob.contains(black_box(&(next % size as u64)));
                next = next.wrapping_add(1);
                found
            });
        });
    }
    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    for &size in SIZES {
        let filter = PartitionedFilter::<u64>::new(size, 0.01).unwrap();
        for i in 0..size as u64 {
            filter.insert(&i);
        }
        let blob = filter.encode();

        group.throughput(Throughput::Bytes(blob.as_bytes().len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &filter, |b, filter| {
            b.iter(|| filter.encode())
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &blob, |b, blob| {
            b.iter(|| blob.decode())
        });
    }
    group.finish();
}

fn bench_merge_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_encode");
    for &size in SIZES {
        let left = PartitionedFilter::<u64>::new(size, 0.01).unwrap();
        let right = PartitionedFilter::<u64>::new(size, 0.01).unwrap();
        for i in 0..size as u64 {
            left.insert(&i);
            right.insert(&(i * 7));
        }
        let right = right.encode();

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &(left, right),
            |b, (left, right)| {
                b.iter(|| {
                    let sources: Vec<&dyn WordView> = vec![left, right];
                    EncodedFilter::<u64>::merge(black_box(&sources)).unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_contains,
    bench_encoded_contains,
    bench_codec,
    bench_merge_encode
);
criterion_main!(benches);
