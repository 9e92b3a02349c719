//! Resumable indexing of a document tree.
//!
//! One [`Indexer::run`] walks the tree, skips files the progress ledger
//! already lists, embeds the rest file by file, and checkpoints the snapshot
//! and the ledger as it goes. A run interrupted by the stop flag or a crash
//! resumes from the last checkpoint.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use content_extractor::{ChunkConfig, ExtractorStack, discover_files, file_id};
use core_types::config::AppConfig;
use semantic_index::{Embedder, ProgressLedger, SemanticIndex, load_index, remove_index};
use tracing::{debug, info, info_span, warn};

/// Everything a run needs besides the embedder.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub index_path: PathBuf,
    pub progress_path: PathBuf,
    /// Checkpoint after this many processed files.
    pub save_every: usize,
    /// Resume from the ledger instead of starting over.
    pub continue_indexing: bool,
    pub extensions: Vec<String>,
    pub chunking: ChunkConfig,
    pub batch_size: usize,
    pub max_file_bytes: u64,
}

impl IndexerConfig {
    pub fn from_app(cfg: &AppConfig) -> Result<Self> {
        let chunking = ChunkConfig::new(cfg.indexing.chunk_size, cfg.indexing.chunk_overlap)?;
        Ok(Self {
            index_path: cfg.index_path(),
            progress_path: cfg.progress_path(),
            save_every: cfg.indexing.save_every.max(1),
            continue_indexing: true,
            extensions: cfg.indexing.extensions.clone(),
            chunking,
            batch_size: cfg.embedding.batch_size.max(1),
            max_file_bytes: cfg.indexing.max_file_bytes,
        })
    }
}

/// Progress notifications delivered while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// Discovery finished; `total` files matched, `pending` still need work.
    Started { total: usize, pending: usize },
    FileDone { file: String, fragments: usize },
    FileFailed { file: String, error: String },
    /// A checkpoint was written.
    Saved { documents: usize, files: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub files_total: usize,
    /// Already listed in the ledger when the run started.
    pub files_skipped: usize,
    pub files_processed: usize,
    /// Processed files that produced no text.
    pub files_empty: usize,
    pub fragments: usize,
    /// `(file id, error)` for every file that failed.
    pub failed: Vec<(String, String)>,
    pub stopped: bool,
}

pub struct Indexer<E> {
    config: IndexerConfig,
    index: SemanticIndex<E>,
    ledger: ProgressLedger,
    extractors: ExtractorStack,
    stop: Arc<AtomicBool>,
}

impl<E: Embedder> Indexer<E> {
    /// Prepare a run. With `continue_indexing` unset the snapshot and the
    /// ledger on disk are deleted first. A ledger without a snapshot to back
    /// it is discarded, so those files get indexed again.
    pub fn open(config: IndexerConfig, embedder: E) -> Result<Self> {
        let (index, ledger) = if config.continue_indexing {
            let mut ledger = ProgressLedger::open(&config.progress_path).with_context(|| {
                format!("failed to load progress {}", config.progress_path.display())
            })?;
            let snapshot = if ledger.is_empty() {
                None
            } else {
                load_index(&config.index_path).with_context(|| {
                    format!("failed to load index {}", config.index_path.display())
                })?
            };
            let index = match snapshot {
                Some(flat) => SemanticIndex::with_index(flat, embedder)?,
                None => {
                    if !ledger.is_empty() {
                        warn!(
                            files = ledger.len(),
                            path = %config.index_path.display(),
                            "progress lists files but the index snapshot is missing; reindexing everything"
                        );
                        ledger.reset()?;
                    }
                    SemanticIndex::new(embedder)?
                }
            };
            info!(
                files = ledger.len(),
                documents = index.len(),
                "resuming indexing"
            );
            (index, ledger)
        } else {
            remove_index(&config.index_path)?;
            let mut ledger = ProgressLedger::empty(&config.progress_path);
            ledger.reset()?;
            info!("starting indexing from scratch");
            (SemanticIndex::new(embedder)?, ledger)
        };

        let extractors = ExtractorStack::with_defaults(&config.extensions, config.max_file_bytes);
        Ok(Self {
            config,
            index,
            ledger,
            extractors,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked between files; setting it ends the run after a final save.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub const fn index(&self) -> &SemanticIndex<E> {
        &self.index
    }

    pub const fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn into_index(self) -> SemanticIndex<E> {
        self.index
    }

    /// Index every matching file under `root` not yet in the ledger.
    ///
    /// Per-file failures land in the report; only checkpoint failures abort.
    pub fn run(&mut self, root: &Path, mut on_event: impl FnMut(&IndexEvent)) -> Result<IndexReport> {
        let _span = info_span!("index_run", root = %root.display()).entered();
        let started = Instant::now();

        let files = discover_files(root, self.config.extensions.as_slice())
            .with_context(|| format!("failed to scan {}", root.display()))?;
        let pending: Vec<(PathBuf, String)> = files
            .iter()
            .map(|p| (p.clone(), file_id(root, p)))
            .filter(|(_, id)| !self.ledger.contains(id))
            .collect();

        let mut report = IndexReport {
            files_total: files.len(),
            files_skipped: files.len() - pending.len(),
            ..IndexReport::default()
        };
        info!(
            total = report.files_total,
            skipped = report.files_skipped,
            "discovered files"
        );
        on_event(&IndexEvent::Started {
            total: report.files_total,
            pending: pending.len(),
        });

        let mut since_save = 0usize;
        for (path, id) in &pending {
            if self.stop.load(Ordering::Relaxed) {
                info!("stop requested; finishing run");
                report.stopped = true;
                break;
            }

            match self.index_file(path, id) {
                Ok(fragments) => {
                    report.files_processed += 1;
                    report.fragments += fragments;
                    if fragments == 0 {
                        report.files_empty += 1;
                    }
                    self.ledger.record(id.as_str());
                    on_event(&IndexEvent::FileDone {
                        file: id.clone(),
                        fragments,
                    });
                    since_save += 1;
                }
                Err(err) => {
                    let error = format!("{err:#}");
                    warn!(file = %id, error = %error, "failed to index file");
                    on_event(&IndexEvent::FileFailed {
                        file: id.clone(),
                        error: error.clone(),
                    });
                    report.failed.push((id.clone(), error));
                }
            }

            if since_save >= self.config.save_every {
                self.checkpoint(&mut on_event)?;
                since_save = 0;
            }
        }

        self.checkpoint(&mut on_event)?;
        info!(
            processed = report.files_processed,
            failed = report.failed.len(),
            fragments = report.fragments,
            stopped = report.stopped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexing run finished"
        );
        Ok(report)
    }

    fn index_file(&mut self, path: &Path, id: &str) -> Result<usize> {
        let records = self
            .extractors
            .extract_chunks(path, id, &self.config.chunking)?;
        if records.is_empty() {
            debug!(file = id, "no text");
            return Ok(0);
        }
        Ok(self.index.add_batched(records, self.config.batch_size)?)
    }

    /// Snapshot first, then the ledger, so the ledger never lists a file the
    /// snapshot lacks.
    fn checkpoint(&self, on_event: &mut impl FnMut(&IndexEvent)) -> Result<()> {
        self.index
            .save(&self.config.index_path)
            .context("failed to save index")?;
        self.ledger.flush().context("failed to save progress")?;
        on_event(&IndexEvent::Saved {
            documents: self.index.len(),
            files: self.ledger.len(),
        });
        Ok(())
    }
}
