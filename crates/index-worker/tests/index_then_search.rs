use std::fs;

use content_extractor::ChunkConfig;
use index_worker::{Indexer, IndexerConfig};
use semantic_index::{HashingEmbedder, SemanticIndex};
use tempfile::tempdir;

#[test]
fn indexed_tree_is_searchable_after_reopen() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("docs");
    fs::create_dir_all(root.join("guides")).unwrap();
    fs::write(
        root.join("guides/borrowing.md"),
        "Rust ownership: each value has one owner and borrowing rules keep references valid.",
    )
    .unwrap();
    fs::write(
        root.join("bread.txt"),
        "Feed the sourdough starter with flour and water before baking bread.",
    )
    .unwrap();

    let config = IndexerConfig {
        index_path: dir.path().join("state/index.bin"),
        progress_path: dir.path().join("state/progress.json"),
        save_every: 10,
        continue_indexing: true,
        extensions: vec!["md".into(), "txt".into()],
        chunking: ChunkConfig::new(200, 20).unwrap(),
        batch_size: 8,
        max_file_bytes: 1 << 16,
    };
    let embedder = HashingEmbedder::new(256).unwrap();
    let report = Indexer::open(config.clone(), embedder)
        .unwrap()
        .run(&root, |_| {})
        .unwrap();
    assert_eq!(report.files_processed, 2);
    assert_eq!(report.fragments, 2);

    let index = SemanticIndex::open(&config.index_path, embedder).unwrap();
    let stats = index.stats();
    assert_eq!(stats.files, ["bread.txt", "guides/borrowing.md"]);
    assert_eq!(stats.types.get("markdown"), Some(&1));
    assert_eq!(stats.types.get("text"), Some(&1));

    let hits = index.search("sourdough starter flour", 1).unwrap();
    assert_eq!(hits[0].record.file, "bread.txt");
    assert_eq!(
        hits[0].record.field("chunk").and_then(|v| v.as_u64()),
        Some(0)
    );
}
