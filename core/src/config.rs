//! Query-time and build-time settings.

use crate::authority::PageRankParams;
use crate::embedding::Metric;
use crate::error::{IndexError, Result};
use crate::tokenizer::TokenizerKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Caps and switches for the blending pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lexical candidates kept before merging.
    pub lexical_top_k: usize,
    /// Semantic ranking positions walked while deduplicating.
    pub semantic_scan: usize,
    /// Unique candidates admitted from the merged list.
    pub max_candidates: usize,
    /// Nearest neighbours gathered per candidate.
    pub neighbors_per_candidate: usize,
    pub metric: Metric,
    /// Re-encode each candidate's normalised primary text instead of reusing
    /// its stored row.
    pub reencode_neighbors: bool,
    pub embedding_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lexical_top_k: 10,
            semantic_scan: 100,
            max_candidates: 20,
            neighbors_per_candidate: 5,
            metric: Metric::Cosine,
            reencode_neighbors: true,
            embedding_batch_size: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| IndexError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let caps = [
            ("lexical_top_k", self.lexical_top_k),
            ("semantic_scan", self.semantic_scan),
            ("max_candidates", self.max_candidates),
            ("neighbors_per_candidate", self.neighbors_per_candidate),
            ("embedding_batch_size", self.embedding_batch_size),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(IndexError::Config(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }
}

/// Choices fixed at build time and recorded alongside the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    pub tokenizer: TokenizerKind,
    /// Width of the built-in hashing embedder.
    pub embedding_dim: usize,
    /// Dataset key inside the embedding container.
    pub dataset: String,
    pub pagerank: PageRankParams,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::Word,
            embedding_dim: 256,
            dataset: "dataset_1".to_string(),
            pagerank: PageRankParams::default(),
        }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> Result<()> {
        if self.embedding_dim == 0 {
            return Err(IndexError::Config("embedding_dim must be greater than 0".into()));
        }
        if self.dataset.trim().is_empty() {
            return Err(IndexError::Config("dataset key must not be empty".into()));
        }
        if !(0.0..1.0).contains(&self.pagerank.damping) {
            return Err(IndexError::Config("pagerank damping must be in [0, 1)".into()));
        }
        Ok(())
    }
}
