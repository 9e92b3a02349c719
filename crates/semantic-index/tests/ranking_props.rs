use core_types::DocumentRecord;
use proptest::prelude::*;
use semantic_index::{FlatIndex, squared_l2};

const DIM: usize = 4;

fn build(vectors: &[Vec<f32>]) -> FlatIndex {
    let mut idx = FlatIndex::new(DIM).unwrap();
    let records = (0..vectors.len())
        .map(|i| DocumentRecord::new(i.to_string(), format!("f{}", i % 3), "text"))
        .collect();
    idx.add_embedded(records, vectors.to_vec()).unwrap();
    idx
}

fn vector() -> impl Strategy<Value = Vec<f32>> {
    // Small integer grid so equal distances actually occur.
    prop::collection::vec((-3i8..=3).prop_map(f32::from), DIM)
}

proptest! {
    #[test]
    fn add_grows_both_halves_by_batch_size(
        first in prop::collection::vec(vector(), 0..20),
        second in prop::collection::vec(vector(), 1..20),
    ) {
        let mut idx = build(&first);
        let before = idx.stats().total_documents;
        let records = second
            .iter()
            .map(|_| DocumentRecord::new("x", "g", "code"))
            .collect();
        idx.add_embedded(records, second.clone()).unwrap();

        prop_assert_eq!(idx.stats().total_documents, before + second.len());
        prop_assert_eq!(idx.vectors().len(), idx.documents().len());
    }

    #[test]
    fn result_count_is_min_of_k_and_n(
        vectors in prop::collection::vec(vector(), 1..40),
        query in vector(),
        k in 1usize..60,
    ) {
        let idx = build(&vectors);
        let hits = idx.search_vector(&query, k).unwrap();
        prop_assert_eq!(hits.len(), k.min(vectors.len()));
        for pair in hits.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn ranking_follows_distance_then_position(
        vectors in prop::collection::vec(vector(), 1..40),
        query in vector(),
    ) {
        let idx = build(&vectors);
        let hits = idx.search_vector(&query, vectors.len()).unwrap();

        let positions: Vec<usize> = hits
            .iter()
            .map(|h| h.record.content.parse().unwrap())
            .collect();
        for pair in positions.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let da = squared_l2(&query, &vectors[a]);
            let db = squared_l2(&query, &vectors[b]);
            prop_assert!(da < db || (da == db && a < b), "{a} ({da}) ranked before {b} ({db})");
        }
    }
}
