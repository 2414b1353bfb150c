use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use semsearch_core::embedding::l2_normalize;
use semsearch_core::{EmbeddingRecord, IndexConfig, RecordId, VectorIndex};

const DIM: usize = 384;

fn records(n: usize) -> Vec<EmbeddingRecord> {
    (0..n)
        .map(|i| {
            let mut vector: Vec<f32> = (0..DIM)
                .map(|d| (((i * 31 + d * 17) % 97) as f32) - 48.0)
                .collect();
            l2_normalize(&mut vector);
            EmbeddingRecord {
                id: RecordId::Number(i as i64),
                title: format!("row {}", i),
                url: RecordId::Number(i as i64),
                vector,
            }
        })
        .collect()
}

fn bench_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_index");

    for size in [100usize, 1_000, 5_000] {
        let data = records(size);
        let query = data[size / 2].vector.clone();

        group.bench_with_input(BenchmarkId::new("build", size), &data, |b, data| {
            b.iter(|| VectorIndex::build(black_box(data.clone()), &IndexConfig::default()))
        });

        let index = VectorIndex::build(data, &IndexConfig::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("search_k5", size), &query, |b, query| {
            b.iter(|| index.search(black_box(query), 5))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_index);
criterion_main!(benches);
