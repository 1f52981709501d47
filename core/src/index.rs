//! TF-IDF inverted index with cosine-style query scoring.

use crate::corpus::Corpus;
use crate::error::{IndexError, Result};
use crate::normalize::normalize;
use crate::tokenizer::Tokenizer;
use crate::ScoredDoc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Term -> (url -> weight). Holds raw counts during a build and tf·idf
/// weights once [`LexicalIndex::build`] returns.
pub type Postings = BTreeMap<String, HashMap<String, f64>>;

/// Postings, IDF table and length norms. Always built, persisted and loaded
/// as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexicalIndex {
    pub postings: Postings,
    pub idf: HashMap<String, f64>,
    /// Sum of squared tf·idf weights per document.
    pub norms: HashMap<String, f64>,
    pub num_docs: usize,
}

impl LexicalIndex {
    pub fn new() -> Self { Self::default() }

    /// Fresh build over the whole corpus.
    pub fn build(corpus: &Corpus, tokenizer: &dyn Tokenizer) -> Self {
        let mut index = Self::new();
        for doc in corpus.docs() {
            let text = normalize(&doc.combined_text());
            index.add_document(&doc.url, &tokenizer.tokenize(&text));
        }
        index.finalize(corpus.len());
        tracing::info!(num_docs = index.num_docs, num_terms = index.postings.len(), "lexical index built");
        index
    }

    fn add_document(&mut self, url: &str, tokens: &[String]) {
        for token in tokens {
            *self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(url.to_string())
                .or_insert(0.0) += 1.0;
        }
    }

    /// Turns raw counts into tf·idf weights, filling `idf` and `norms` in
    /// the same pass.
    fn finalize(&mut self, num_docs: usize) {
        self.num_docs = num_docs;
        self.idf.clear();
        self.norms.clear();
        let n = num_docs as f64;
        for (term, docs) in self.postings.iter_mut() {
            let idf = (n / docs.len() as f64).ln();
            self.idf.insert(term.clone(), idf);
            for (url, weight) in docs.iter_mut() {
                let tfidf = *weight * idf;
                *weight = tfidf;
                *self.norms.entry(url.clone()).or_insert(0.0) += tfidf * tfidf;
            }
        }
    }

    pub fn contains(&self, term: &str) -> bool { self.postings.contains_key(term) }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    /// Score documents against query tokens, best first.
    ///
    /// Tokens missing from the index are ignored. Documents sharing no
    /// indexed token with the query are absent. Returns an empty list when
    /// the accumulated query length is zero.
    pub fn score(&self, query_tokens: &[String]) -> Vec<ScoredDoc> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for token in query_tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }

        let mut query_length = 0.0f64;
        let mut scores: HashMap<&str, f64> = HashMap::new();
        for (token, count) in counts {
            let Some(docs) = self.postings.get(token) else { continue };
            let idf = self.idf.get(token).copied().unwrap_or(0.0);
            let q_weight = count as f64 * idf;
            query_length += q_weight * q_weight;
            for (url, d_weight) in docs {
                *scores.entry(url.as_str()).or_insert(0.0) += q_weight * d_weight;
            }
        }

        if query_length == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredDoc> = scores
            .into_iter()
            .filter_map(|(url, score)| {
                let norm = self.norms.get(url).copied().unwrap_or(0.0);
                let denom = (query_length * norm).sqrt();
                (denom > 0.0).then(|| ScoredDoc::new(url, score / denom))
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        scored
    }

    /// Checks that postings, IDF and norms belong together and refer only to
    /// corpus documents.
    pub fn validate(&self, corpus: &Corpus) -> Result<()> {
        if self.num_docs != corpus.len() {
            return Err(IndexError::Mismatch(format!(
                "lexical index built for {} documents, corpus has {}",
                self.num_docs,
                corpus.len()
            )));
        }
        if self.idf.len() != self.postings.len() {
            return Err(IndexError::Mismatch(format!(
                "{} idf entries for {} indexed terms",
                self.idf.len(),
                self.postings.len()
            )));
        }
        let mut posted: HashSet<&str> = HashSet::new();
        for (term, docs) in &self.postings {
            if !self.idf.contains_key(term) {
                return Err(IndexError::Mismatch(format!("term {term:?} has no idf entry")));
            }
            posted.extend(docs.keys().map(String::as_str));
        }
        for url in &posted {
            if !self.norms.contains_key(*url) {
                return Err(IndexError::Mismatch(format!("document {url} has no length norm")));
            }
        }
        for url in self.norms.keys() {
            if corpus.get(url).is_none() {
                return Err(IndexError::Mismatch(format!("length norm for unknown document {url}")));
            }
        }
        Ok(())
    }
}
