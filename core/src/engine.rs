//! The immutable search context.
//!
//! A [`SearchEngine`] owns the corpus, both indexes and the external
//! collaborators. It is built once (fresh build or reload) and then shared by
//! reference; `search` takes `&self` and keeps all per-query state local.

use crate::authority::{AuthorityRanker, LinkGraphRanker};
use crate::blend::{assemble, merge_candidates, similarity_pool};
use crate::config::{BuildOptions, EngineConfig};
use crate::corpus::Corpus;
use crate::embedding::{Embedder, EmbeddingStore, HashingEmbedder};
use crate::error::{IndexError, Result};
use crate::index::LexicalIndex;
use crate::normalize::normalize;
use crate::persist::{load_bundle, save_bundle, IndexBundle, IndexPaths, MetaFile};
use crate::tokenizer::Tokenizer;
use crate::{RankedDoc, ScoredDoc, SearchHit};

/// Optional replacements for the built-in tokenizer, embedder and ranker.
/// Unset fields fall back to what the build options describe.
#[derive(Default)]
pub struct Collaborators {
    pub tokenizer: Option<Box<dyn Tokenizer>>,
    pub embedder: Option<Box<dyn Embedder>>,
    pub ranker: Option<Box<dyn AuthorityRanker>>,
}

impl Collaborators {
    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Some(Box::new(tokenizer));
        self
    }

    pub fn with_embedder(mut self, embedder: impl Embedder + 'static) -> Self {
        self.embedder = Some(Box::new(embedder));
        self
    }

    pub fn with_ranker(mut self, ranker: impl AuthorityRanker + 'static) -> Self {
        self.ranker = Some(Box::new(ranker));
        self
    }
}

struct Resolved {
    tokenizer: Box<dyn Tokenizer>,
    embedder: Box<dyn Embedder>,
    ranker: Box<dyn AuthorityRanker>,
}

fn resolve(collab: Collaborators, options: &BuildOptions, corpus: &Corpus) -> Result<Resolved> {
    let tokenizer = collab.tokenizer.unwrap_or_else(|| options.tokenizer.build());
    let embedder: Box<dyn Embedder> = match collab.embedder {
        Some(e) => e,
        None => Box::new(HashingEmbedder::new(options.embedding_dim)?),
    };
    let ranker: Box<dyn AuthorityRanker> = match collab.ranker {
        Some(r) => r,
        None => Box::new(LinkGraphRanker::from_corpus(corpus, options.pagerank)),
    };
    Ok(Resolved { tokenizer, embedder, ranker })
}

pub struct SearchEngine {
    meta: MetaFile,
    corpus: Corpus,
    lexical: LexicalIndex,
    embeddings: EmbeddingStore,
    tokenizer: Box<dyn Tokenizer>,
    embedder: Box<dyn Embedder>,
    ranker: Box<dyn AuthorityRanker>,
    config: EngineConfig,
}

impl SearchEngine {
    /// Fresh build: index the corpus, embed it, and persist every bundle
    /// under `paths`.
    pub fn build(
        corpus: Corpus,
        paths: &IndexPaths,
        mut options: BuildOptions,
        config: EngineConfig,
        collab: Collaborators,
    ) -> Result<Self> {
        options.validate()?;
        config.validate()?;
        if corpus.is_empty() {
            return Err(IndexError::Corpus("cannot build an index over an empty corpus".into()));
        }
        let resolved = resolve(collab, &options, &corpus)?;
        options.embedding_dim = resolved.embedder.dim();

        let lexical = LexicalIndex::build(&corpus, resolved.tokenizer.as_ref());
        let embeddings = EmbeddingStore::build(&corpus, resolved.embedder.as_ref(), config.embedding_batch_size)?;
        let bundle = IndexBundle { meta: MetaFile::new(corpus.len(), options), corpus, lexical, embeddings };
        save_bundle(paths, &bundle)?;
        tracing::info!(root = %paths.root.display(), num_docs = bundle.corpus.len(), "index build complete");
        Self::from_bundle(bundle, resolved, config)
    }

    /// Reload mode: read every bundle back without recomputing anything.
    pub fn load(paths: &IndexPaths, config: EngineConfig, collab: Collaborators) -> Result<Self> {
        config.validate()?;
        let bundle = load_bundle(paths)?;
        let resolved = resolve(collab, &bundle.meta.build, &bundle.corpus)?;
        Self::from_bundle(bundle, resolved, config)
    }

    fn from_bundle(bundle: IndexBundle, resolved: Resolved, config: EngineConfig) -> Result<Self> {
        if resolved.embedder.dim() != bundle.embeddings.dim() {
            return Err(IndexError::Dimension {
                expected: bundle.embeddings.dim(),
                actual: resolved.embedder.dim(),
            });
        }
        Ok(Self {
            meta: bundle.meta,
            corpus: bundle.corpus,
            lexical: bundle.lexical,
            embeddings: bundle.embeddings,
            tokenizer: resolved.tokenizer,
            embedder: resolved.embedder,
            ranker: resolved.ranker,
            config,
        })
    }

    pub fn meta(&self) -> &MetaFile { &self.meta }

    pub fn corpus(&self) -> &Corpus { &self.corpus }

    pub fn lexical(&self) -> &LexicalIndex { &self.lexical }

    pub fn embeddings(&self) -> &EmbeddingStore { &self.embeddings }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Lexical ranking of a raw query, best first, uncapped.
    pub fn lexical_scores(&self, query: &str) -> Vec<ScoredDoc> {
        let tokens = self.tokenizer.tokenize(&normalize(query));
        self.lexical.score(&tokens)
    }

    /// Semantic ranking of a raw query, closest first. Empty when the
    /// embedder fails.
    pub fn semantic_scores(&self, query: &str) -> Vec<ScoredDoc> {
        let ranked = self
            .embedder
            .encode(&normalize(query))
            .and_then(|v| self.embeddings.rank(&v, self.config.metric));
        match ranked {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, continuing lexical-only");
                Vec::new()
            }
        }
    }

    fn neighbors(&self, url: &str) -> Vec<ScoredDoc> {
        let Some(pos) = self.corpus.position(url) else { return Vec::new() };
        let Some(stored) = self.embeddings.row(pos) else { return Vec::new() };
        let reencoded = if self.config.reencode_neighbors {
            let text = normalize(&self.corpus.docs()[pos].primary_text);
            match self.embedder.encode(&text) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(url, error = %e, "re-encoding failed, using stored embedding");
                    None
                }
            }
        } else {
            None
        };
        let vector = reencoded.as_deref().unwrap_or(stored);
        self.embeddings
            .nearest(vector, self.config.neighbors_per_candidate, self.config.metric)
            .unwrap_or_else(|e| {
                tracing::warn!(url, error = %e, "neighbour lookup failed");
                Vec::new()
            })
    }

    /// The full blended sequence with the stage that produced each entry.
    pub fn search_scored(&self, query: &str) -> Vec<RankedDoc> {
        tracing::debug!(query, "search");
        let lexical = self.lexical_scores(query);
        let semantic = self.semantic_scores(query);
        let candidates = merge_candidates(&lexical, &semantic, &self.config);
        let pool = similarity_pool(&candidates, |url| self.neighbors(url));
        tracing::debug!(
            lexical = lexical.len(),
            semantic = semantic.len(),
            candidates = candidates.len(),
            pool = pool.len(),
            "pipeline stages"
        );
        assemble(candidates, pool, self.ranker.as_ref())
    }

    /// Ordered `(title, url)` results. URLs may repeat across stages.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        self.search_scored(query)
            .into_iter()
            .filter_map(|r| match self.corpus.title(&r.url) {
                Some(title) => Some(SearchHit { title: title.to_string(), url: r.url }),
                None => {
                    tracing::warn!(url = %r.url, "result url not in corpus, dropped");
                    None
                }
            })
            .collect()
    }
}
