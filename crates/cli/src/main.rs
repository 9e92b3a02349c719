use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use console::style;
use core_types::config::{AppConfig, load_or_create_config};
use docindex_cli::{build_embedder, init_tracing_with_config};
use index_worker::{IndexEvent, IndexReport, Indexer, IndexerConfig};
use indicatif::{ProgressBar, ProgressStyle};
use semantic_index::{
    CachedEmbedder, HashingEmbedder, IndexStats, ProgressLedger, SemanticIndex, load_index,
    progress, remove_index,
};

/// Index a document tree and search it by meaning.
#[derive(Parser, Debug)]
#[command(name = "docindex", version, about = "Local semantic document index")]
struct Cli {
    /// Config file (created with defaults when missing).
    #[arg(long, global = true, env = "DOCINDEX_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed new or changed documents into the index.
    Index {
        /// Directory to index; defaults to `app.documents_dir`.
        #[arg(long)]
        root: Option<PathBuf>,
        /// Drop the existing index and progress first.
        #[arg(long)]
        restart: bool,
        /// Checkpoint after this many files.
        #[arg(long)]
        save_every: Option<usize>,
    },
    /// Return the closest chunks for a query.
    Search {
        query: String,
        /// Number of results.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Summarise the stored index.
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Delete the index snapshot.
    Clear {
        /// Leave the progress ledger file in place. The next `index` run
        /// finds no snapshot behind it, discards it and indexes every file.
        #[arg(long)]
        keep_progress: bool,
    },
    /// List files recorded as indexed.
    Ledger,
    /// Delete cached embeddings.
    CacheClear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_or_create_config(cli.config.as_deref())?;
    let _guard = init_tracing_with_config(&cfg.logging)?;
    tracing::debug!(version = docindex_cli::VERSION, "docindex starting");

    match cli.command {
        Commands::Index {
            root,
            restart,
            save_every,
        } => run_index(&cfg, root, restart, save_every),
        Commands::Search { query, top_k, json } => run_search(&cfg, &query, top_k, json),
        Commands::Stats { json } => run_stats(&cfg, json),
        Commands::Clear { keep_progress } => run_clear(&cfg, keep_progress),
        Commands::Ledger => run_ledger(&cfg),
        Commands::CacheClear => run_cache_clear(&cfg),
    }
}

fn run_index(
    cfg: &AppConfig,
    root: Option<PathBuf>,
    restart: bool,
    save_every: Option<usize>,
) -> Result<()> {
    let root = root.unwrap_or_else(|| PathBuf::from(&cfg.app.documents_dir));
    if !root.is_dir() {
        bail!("documents directory {} does not exist", root.display());
    }

    let mut config = IndexerConfig::from_app(cfg)?;
    config.continue_indexing = !restart;
    if let Some(n) = save_every {
        if n == 0 {
            bail!("--save-every must be greater than zero");
        }
        config.save_every = n;
    }

    let mut indexer = Indexer::open(config, build_embedder(cfg)?)?;
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );

    let report = indexer.run(&root, |event| match event {
        IndexEvent::Started { pending, .. } => {
            bar.set_length(*pending as u64);
            bar.enable_steady_tick(Duration::from_millis(120));
        }
        IndexEvent::FileDone { file, .. } => {
            bar.set_message(file.clone());
            bar.inc(1);
        }
        IndexEvent::FileFailed { file, error } => {
            bar.println(format!("{} {file}: {error}", style("failed").red()));
            bar.inc(1);
        }
        IndexEvent::Saved { .. } => {}
    })?;
    bar.finish_and_clear();

    print_report(&report, indexer.index().len());
    Ok(())
}

fn print_report(report: &IndexReport, documents: usize) {
    let headline = if report.stopped {
        style("Indexing stopped").yellow()
    } else {
        style("Indexing complete").green()
    };
    println!("{}", headline.bold());
    println!(
        "  files: {} found, {} already indexed, {} processed ({} without text)",
        report.files_total, report.files_skipped, report.files_processed, report.files_empty
    );
    println!("  fragments added: {}", report.fragments);
    println!("  index size: {documents} fragments");
    if !report.failed.is_empty() {
        println!("  {}", style(format!("{} files failed:", report.failed.len())).red());
        for (file, error) in &report.failed {
            println!("    {file}: {error}");
        }
    }
}

fn run_search(cfg: &AppConfig, query: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let top_k = top_k.unwrap_or(cfg.search.top_k);
    let index = SemanticIndex::open(&cfg.index_path(), build_embedder(cfg)?)
        .context("failed to open index")?;
    let hits = index.search(query, top_k)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("{}", style("No results.").yellow());
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{} {} {} {}",
            style(format!("{:>2}.", rank + 1)).bold(),
            style(format!("{:.4}", hit.score)).green(),
            style(&hit.record.file).cyan(),
            style(format!("[{}]", hit.record.kind)).dim()
        );
        println!("    {}", preview(&hit.record.content, 200));
    }
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

fn run_stats(cfg: &AppConfig, json: bool) -> Result<()> {
    let path = cfg.index_path();
    let stats = match load_index(&path).context("failed to load index")? {
        Some(index) => index.stats(),
        None => IndexStats {
            dimension: cfg.embedding.dimension,
            ..IndexStats::default()
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("{}", style("Index statistics").bold());
    println!("  path: {}", path.display());
    println!("  fragments: {}", stats.total_documents);
    println!("  files: {}", stats.total_files);
    println!("  dimension: {}", stats.dimension);
    for (kind, count) in &stats.types {
        println!("  type {kind}: {count}");
    }
    Ok(())
}

fn run_clear(cfg: &AppConfig, keep_progress: bool) -> Result<()> {
    remove_index(&cfg.index_path())?;
    if !keep_progress {
        progress::clear(&cfg.progress_path())?;
    }
    if keep_progress {
        println!("{} index", style("Cleared").green());
        println!(
            "  {}",
            style("progress kept; the next index run will discard it and reindex all files").dim()
        );
    } else {
        println!("{} index and progress", style("Cleared").green());
    }
    Ok(())
}

fn run_ledger(cfg: &AppConfig) -> Result<()> {
    let ledger = ProgressLedger::open(cfg.progress_path())?;
    if ledger.is_empty() {
        println!("{}", style("No files indexed yet.").yellow());
        return Ok(());
    }
    for file in ledger.entries() {
        println!("{file}");
    }
    println!("{}", style(format!("{} files", ledger.len())).dim());
    Ok(())
}

fn run_cache_clear(cfg: &AppConfig) -> Result<()> {
    let cache = CachedEmbedder::new(
        HashingEmbedder::new(cfg.embedding.dimension)?,
        cfg.embedding_cache_dir(),
    )?;
    let removed = cache.clear_cache()?;
    println!("{} {removed} cached embeddings", style("Removed").green());
    Ok(())
}
