//! Hybrid retrieval over a crawled corpus.
//!
//! A query is scored twice, lexically against a tf·idf index and semantically
//! against per-document embeddings. The two rankings are merged, widened
//! with semantic neighbours of the candidates and topped up with a
//! link-authority rerank. Everything is built once per corpus snapshot,
//! persisted, and reloaded read-only into a [`SearchEngine`].

pub mod authority;
pub mod blend;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod normalize;
pub mod persist;
pub mod tokenizer;

use serde::Serialize;

pub use authority::{AuthorityRanker, LinkGraphRanker, PageRankParams, Priors};
pub use config::{BuildOptions, EngineConfig};
pub use corpus::{load_corpus, Corpus, Document};
pub use embedding::{Embedder, EmbeddingStore, HashingEmbedder, Metric};
pub use engine::{Collaborators, SearchEngine};
pub use error::{IndexError, Result};
pub use index::LexicalIndex;
pub use persist::IndexPaths;
pub use tokenizer::{StemmingTokenizer, Tokenizer, TokenizerKind, WordTokenizer};

/// A document URL with a score from one scoring space.
///
/// Lexical scores are higher-is-better, semantic distances lower-is-better.
/// Nothing rescales one into the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub url: String,
    pub score: f64,
}

impl ScoredDoc {
    pub fn new(url: impl Into<String>, score: f64) -> Self {
        Self { url: url.into(), score }
    }
}

/// Which stage of the pipeline contributed a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Lexical,
    Semantic,
    Similar,
    Authority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDoc {
    pub url: String,
    pub score: f64,
    pub segment: Segment,
}

impl RankedDoc {
    pub fn new(doc: ScoredDoc, segment: Segment) -> Self {
        Self { url: doc.url, score: doc.score, segment }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}
