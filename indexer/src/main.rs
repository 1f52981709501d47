use anyhow::{Context, Result};
use blendsearch_core::persist::{load_meta, IndexPaths};
use blendsearch_core::{
    load_corpus, BuildOptions, Collaborators, EngineConfig, PageRankParams, SearchEngine, TokenizerKind,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build the lexical and embedding bundles for a crawl snapshot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every bundle from a JSON/JSONL snapshot (file or directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Tokenizer used at build and query time: word | stemming
        #[arg(long, default_value = "word")]
        tokenizer: TokenizerKind,
        /// Width of the built-in hashing embedder
        #[arg(long, default_value_t = 256)]
        dim: usize,
        /// Dataset key inside the embedding container
        #[arg(long, default_value = "dataset_1")]
        dataset: String,
        /// PageRank iterations for the authority ranker
        #[arg(long, default_value_t = 4)]
        pagerank_iterations: usize,
        /// Optional engine config (JSON); only the batch size matters at build time
        #[arg(long)]
        config: Option<String>,
    },
    /// Print the metadata of an existing index
    Inspect {
        /// Index directory
        #[arg(long)]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, tokenizer, dim, dataset, pagerank_iterations, config } => {
            let options = BuildOptions {
                tokenizer,
                embedding_dim: dim,
                dataset,
                pagerank: PageRankParams { iterations: pagerank_iterations, ..Default::default() },
            };
            let config = match config {
                Some(path) => EngineConfig::from_json_file(&path).with_context(|| format!("reading config {path}"))?,
                None => EngineConfig::default(),
            };
            build_index(&input, &output, options, config)
        }
        Commands::Inspect { index } => {
            let meta = load_meta(&IndexPaths::new(&index)).with_context(|| format!("reading index {index}"))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
    }
}

fn build_index(input: &str, output: &str, options: BuildOptions, config: EngineConfig) -> Result<()> {
    let corpus = load_corpus(input).with_context(|| format!("loading corpus from {input}"))?;
    tracing::info!(num_docs = corpus.len(), "ingested documents");

    let paths = IndexPaths::new(output);
    let engine = SearchEngine::build(corpus, &paths, options, config, Collaborators::default())
        .with_context(|| format!("building index in {output}"))?;

    tracing::info!(
        output,
        num_terms = engine.lexical().num_terms(),
        rows = engine.embeddings().len(),
        "index build complete"
    );
    Ok(())
}
