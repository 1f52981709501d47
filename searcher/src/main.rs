use anyhow::{Context, Result};
use blendsearch_core::persist::IndexPaths;
use blendsearch_core::{Collaborators, EngineConfig, Metric, SearchEngine};
use clap::Parser;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Query a built index; reads one query per line from stdin when none is given")]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Engine config (JSON) overriding the default caps
    #[arg(long)]
    config: Option<String>,
    /// Distance metric for the semantic path: cosine | euclidean | sqeuclidean
    #[arg(long)]
    metric: Option<Metric>,
    /// Emit one JSON object per query instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Include the pipeline stage and score of every result
    #[arg(long, default_value_t = false)]
    scored: bool,
    /// Query text
    query: Option<String>,
}

#[derive(Serialize)]
struct Response<'a, T: Serialize> {
    query: &'a str,
    took_s: f64,
    total_hits: usize,
    results: Vec<T>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(io::stderr).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path).with_context(|| format!("reading config {path}"))?,
        None => EngineConfig::default(),
    };
    if let Some(metric) = args.metric {
        config.metric = metric;
    }

    let engine = SearchEngine::load(&IndexPaths::new(&args.index), config, Collaborators::default())
        .with_context(|| format!("loading index from {}", args.index))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &args.query {
        Some(q) => run_query(&engine, q, &args, &mut out)?,
        None => {
            for line in io::stdin().lock().lines() {
                let line = line?;
                if line.trim().is_empty() { continue; }
                run_query(&engine, &line, &args, &mut out)?;
            }
        }
    }
    Ok(())
}

fn run_query(engine: &SearchEngine, query: &str, args: &Args, out: &mut impl Write) -> Result<()> {
    let start = Instant::now();
    if args.scored {
        let results = engine.search_scored(query);
        let took_s = start.elapsed().as_secs_f64();
        if args.json {
            let resp = Response { query, took_s, total_hits: results.len(), results };
            writeln!(out, "{}", serde_json::to_string(&resp)?)?;
        } else {
            for r in &results {
                let title = engine.corpus().title(&r.url).unwrap_or("");
                writeln!(out, "{:<9} {:>10.6}  {}  {}", format!("{:?}", r.segment).to_lowercase(), r.score, title, r.url)?;
            }
        }
    } else {
        let results = engine.search(query);
        let took_s = start.elapsed().as_secs_f64();
        if args.json {
            let resp = Response { query, took_s, total_hits: results.len(), results };
            writeln!(out, "{}", serde_json::to_string(&resp)?)?;
        } else {
            for hit in &results {
                writeln!(out, "{}\t{}", hit.title, hit.url)?;
            }
        }
    }
    tracing::info!(took_s = start.elapsed().as_secs_f64(), "query served");
    Ok(())
}
