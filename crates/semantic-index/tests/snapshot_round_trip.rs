use std::fs;

use core_types::DocumentRecord;
use semantic_index::{
    FlatIndex, HashingEmbedder, SemanticIndex, docs_path, load_index, save_index,
};
use serde_json::json;
use tempfile::tempdir;

fn populated() -> FlatIndex {
    let mut idx = FlatIndex::new(4).unwrap();
    idx.add_embedded(
        vec![
            DocumentRecord::new("first", "a.md", "markdown")
                .with_field("chunk", 0)
                .with_field("nested", json!({ "page": 3, "tags": ["x"] })),
            DocumentRecord::new("второй", "b.rs", "code").with_field("chunk", 1),
            DocumentRecord::new("third", "a.md", "markdown"),
        ],
        vec![
            vec![0.1, 0.2, 0.3, 0.4],
            vec![-1.0e-7, f32::MAX, 0.0, -0.0],
            vec![1.0 / 3.0, 2.0 / 7.0, 5.5, -8.25],
        ],
    )
    .unwrap();
    idx
}

#[test]
fn load_reproduces_saved_index_exactly() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.bin");
    let original = populated();

    save_index(&original, &path).unwrap();
    let restored = load_index(&path).unwrap().expect("snapshot exists");

    assert_eq!(restored.len(), original.len());
    assert_eq!(restored.dimension(), 4);
    for pos in 0..original.len() {
        let a: Vec<u32> = original.vector(pos).unwrap().iter().map(|f| f.to_bits()).collect();
        let b: Vec<u32> = restored.vector(pos).unwrap().iter().map(|f| f.to_bits()).collect();
        assert_eq!(a, b, "vector {pos} differs");
        assert_eq!(original.document(pos), restored.document(pos));
    }
    assert_eq!(restored.stats(), original.stats());
    assert_eq!(
        restored.document(0).unwrap().field("nested"),
        Some(&json!({ "page": 3, "tags": ["x"] }))
    );
}

#[test]
fn empty_index_round_trips_with_dimension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    save_index(&FlatIndex::new(7).unwrap(), &path).unwrap();

    let restored = load_index(&path).unwrap().unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.dimension(), 7);
}

#[test]
fn failed_save_keeps_previous_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.bin");
    save_index(&populated(), &path).unwrap();

    // Block the temp file for the records artifact so the next save fails early.
    let blocker = dir.path().join("index.bin.docs.tmp");
    fs::create_dir(&blocker).unwrap();

    let mut bigger = populated();
    bigger
        .add_embedded(
            vec![DocumentRecord::new("fourth", "c.txt", "text")],
            vec![vec![0.0; 4]],
        )
        .unwrap();
    assert!(save_index(&bigger, &path).is_err());

    let restored = load_index(&path).unwrap().unwrap();
    assert_eq!(restored.len(), 3);
    assert!(docs_path(&path).exists());
}

#[test]
fn failed_vector_write_keeps_previous_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.bin");
    let mut idx = FlatIndex::new(4).unwrap();
    idx.add_embedded(
        vec![DocumentRecord::new("only", "a.md", "markdown")],
        vec![vec![1.0, 2.0, 3.0, 4.0]],
    )
    .unwrap();
    save_index(&idx, &path).unwrap();

    // The records temp file is fine; the vector temp file cannot be created.
    fs::create_dir(dir.path().join("index.bin.tmp")).unwrap();
    idx.add_embedded(
        vec![DocumentRecord::new("second", "b.md", "markdown")],
        vec![vec![0.0; 4]],
    )
    .unwrap();
    assert!(save_index(&idx, &path).is_err());

    let restored = load_index(&path).unwrap().expect("old snapshot still there");
    assert_eq!(restored.len(), 1);
    assert_eq!(restored.document(0).unwrap().content, "only");
    assert!(!dir.path().join("index.bin.docs.tmp").exists());
}

#[test]
fn semantic_index_reopens_and_searches() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.bin");
    let embedder = HashingEmbedder::new(128).unwrap();

    let mut idx = SemanticIndex::new(embedder).unwrap();
    idx.add(vec![
        DocumentRecord::new("rust ownership and borrowing rules", "rust.md", "markdown"),
        DocumentRecord::new("sourdough bread starter feeding", "bread.md", "markdown"),
    ])
    .unwrap();
    idx.save(&path).unwrap();

    let reopened = SemanticIndex::open(&path, embedder).unwrap();
    assert_eq!(reopened.len(), 2);
    let hits = reopened.search("borrowing rules in rust", 2).unwrap();
    assert_eq!(hits[0].record.file, "rust.md");
    assert!(hits[0].score > hits[1].score);
}
