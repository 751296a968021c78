use anyhow::{Context, Result};
use clap::Parser;
use rustytranslate::{app, config, corpus::DatasetResolver, logging, metrics::PipelineMetrics};
use std::{path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(
    name = "rustytranslate-ingest",
    about = "Build the translation-pair index from a bilingual TSV corpus"
)]
struct Cli {
    /// Dataset identifier (`owner/dataset`) to resolve from the cache or download.
    #[arg(long)]
    dataset: Option<String>,
    /// Directory already holding the corpus; skips cache lookup and download.
    #[arg(long)]
    corpus_dir: Option<PathBuf>,
    /// Corpus file name searched for inside the dataset directory.
    #[arg(long)]
    corpus_file: Option<String>,
    /// Maximum pairs to index (0 for no cap).
    #[arg(long)]
    max_pairs: Option<usize>,
    /// Replace an existing index.
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config().context("failed to load configuration")?;
    logging::init_tracing("info");

    if let Some(dataset) = cli.dataset {
        config.corpus.dataset = dataset;
    }
    if let Some(dir) = cli.corpus_dir {
        config.corpus.dir_override = Some(dir);
    }
    if let Some(file) = cli.corpus_file {
        config.corpus.file_name = file;
    }
    if let Some(max_pairs) = cli.max_pairs {
        config.corpus.max_pairs = max_pairs;
    }

    let metrics = Arc::new(PipelineMetrics::new());
    let service = app::build_ingestion(&config, metrics, cli.force)
        .context("failed to set up ingestion")?;

    let corpus_path = DatasetResolver::new(&config.corpus)?
        .resolve()
        .await
        .context("failed to resolve the corpus dataset")?;

    let outcome = service
        .ingest_file(&corpus_path)
        .await
        .with_context(|| format!("failed to ingest {}", corpus_path.display()))?;

    println!(
        "Indexed {} chunks from {} pairs ({} parsed, {} malformed lines skipped, {} pairs over the cap, {} duplicate chunks).",
        outcome.chunks_indexed,
        outcome.pairs_indexed,
        outcome.pairs_parsed,
        outcome.lines_skipped,
        outcome.pairs_truncated,
        outcome.skipped_duplicates,
    );
    Ok(())
}
