use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use core_types::DocumentRecord;
use semantic_index::FlatIndex;

const DIM: usize = 384;

fn build_index(count: usize) -> FlatIndex {
    let mut idx = FlatIndex::new(DIM).unwrap();
    let records = (0..count)
        .map(|i| DocumentRecord::new(format!("chunk {i}"), format!("file{}", i % 50), "text"))
        .collect();
    let vectors = (0..count)
        .map(|i| {
            (0..DIM)
                .map(|d| ((i * 31 + d * 17) % 97) as f32 / 97.0)
                .collect()
        })
        .collect();
    idx.add_embedded(records, vectors).unwrap();
    idx
}

fn bench_search(c: &mut Criterion) {
    let query: Vec<f32> = (0..DIM).map(|d| (d % 7) as f32 / 7.0).collect();
    let mut group = c.benchmark_group("flat_search");
    for &count in &[1_000usize, 10_000] {
        let idx = build_index(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &idx, |b, idx| {
            b.iter(|| idx.search_vector(black_box(&query), 10).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
