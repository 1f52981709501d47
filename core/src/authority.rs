//! Link-authority reranking.
//!
//! The blender turns a pool of semantic neighbours into bounded positive
//! priors and hands them to an [`AuthorityRanker`]. [`LinkGraphRanker`] is
//! the built-in ranker: topic-sensitive PageRank over the crawl outlinks.

use crate::corpus::Corpus;
use crate::ScoredDoc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Priors = HashMap<String, f64>;

/// Maps per-document priors to an adjusted ranking, best first.
pub trait AuthorityRanker: Send + Sync {
    fn rank(&self, priors: &Priors) -> Vec<ScoredDoc>;
}

/// Priors for the similarity pool: `(score + max) / sum`.
///
/// Returns `None` when there is nothing to rerank: fewer than two distinct
/// URLs, or a sum that is zero or not finite. When a URL appears more than once
/// its largest score wins.
pub fn authority_priors(pool: &[ScoredDoc]) -> Option<Priors> {
    if pool.len() < 2 {
        return None;
    }
    let mut sorted: Vec<&ScoredDoc> = pool.iter().collect();
    sorted.sort_by(|a, b| a.score.total_cmp(&b.score));
    let sum: f64 = sorted.iter().map(|d| d.score).sum();
    let base = sorted.last().map(|d| d.score)?;
    if sum == 0.0 || !sum.is_finite() || !base.is_finite() {
        return None;
    }
    let mut priors = Priors::with_capacity(sorted.len());
    for doc in sorted {
        priors.insert(doc.url.clone(), (doc.score + base) / sum);
    }
    if priors.len() < 2 {
        return None;
    }
    Some(priors)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankParams {
    pub iterations: usize,
    pub damping: f64,
}

impl Default for PageRankParams {
    fn default() -> Self {
        Self { iterations: 4, damping: 0.85 }
    }
}

/// Topic-sensitive PageRank with the priors as teleport distribution.
#[derive(Debug, Clone)]
pub struct LinkGraphRanker {
    urls: Vec<String>,
    positions: HashMap<String, usize>,
    /// Deduplicated outgoing edges per node, restricted to corpus documents.
    out_edges: Vec<Vec<usize>>,
    params: PageRankParams,
}

impl LinkGraphRanker {
    pub fn from_corpus(corpus: &Corpus, params: PageRankParams) -> Self {
        let urls: Vec<String> = corpus.urls().map(str::to_string).collect();
        let positions: HashMap<String, usize> =
            urls.iter().enumerate().map(|(i, u)| (u.clone(), i)).collect();
        let out_edges = corpus
            .docs()
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                let mut edges: Vec<usize> = doc
                    .outlinks
                    .iter()
                    .filter_map(|l| positions.get(l).copied())
                    .filter(|&j| j != i)
                    .collect();
                edges.sort_unstable();
                edges.dedup();
                edges
            })
            .collect();
        Self { urls, positions, out_edges, params }
    }

    pub fn num_edges(&self) -> usize {
        self.out_edges.iter().map(Vec::len).sum()
    }

    fn teleport(&self, priors: &Priors) -> Option<Vec<f64>> {
        let mut v = vec![0.0; self.urls.len()];
        let mut total = 0.0;
        for (url, w) in priors {
            if let Some(&i) = self.positions.get(url) {
                if w.is_finite() && *w > 0.0 {
                    v[i] += w;
                    total += w;
                }
            }
        }
        if total <= 0.0 {
            return None;
        }
        v.iter_mut().for_each(|x| *x /= total);
        Some(v)
    }
}

impl AuthorityRanker for LinkGraphRanker {
    fn rank(&self, priors: &Priors) -> Vec<ScoredDoc> {
        let Some(teleport) = self.teleport(priors) else {
            return Vec::new();
        };
        let d = self.params.damping;
        let mut ranks = teleport.clone();
        for _ in 0..self.params.iterations {
            let mut next: Vec<f64> = teleport.iter().map(|t| (1.0 - d) * t).collect();
            let mut dangling = 0.0;
            for (i, edges) in self.out_edges.iter().enumerate() {
                if edges.is_empty() {
                    dangling += ranks[i];
                    continue;
                }
                let share = d * ranks[i] / edges.len() as f64;
                for &j in edges {
                    next[j] += share;
                }
            }
            for (x, t) in next.iter_mut().zip(&teleport) {
                *x += d * dangling * t;
            }
            ranks = next;
        }

        let mut out: Vec<ScoredDoc> = priors
            .keys()
            .filter_map(|url| self.positions.get(url).map(|&i| ScoredDoc::new(url, ranks[i])))
            .collect();
        out.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;

    #[test]
    fn priors_for_two_document_pool() {
        let pool = vec![ScoredDoc::new("x", 0.8), ScoredDoc::new("y", 0.2)];
        let priors = authority_priors(&pool).unwrap();
        assert!((priors["y"] - 1.0).abs() < 1e-12);
        assert!((priors["x"] - 1.6).abs() < 1e-12);
    }

    #[test]
    fn degenerate_pools_short_circuit() {
        assert!(authority_priors(&[]).is_none());
        assert!(authority_priors(&[ScoredDoc::new("x", 0.4)]).is_none());
        assert!(authority_priors(&[ScoredDoc::new("x", 0.0), ScoredDoc::new("y", 0.0)]).is_none());
        assert!(authority_priors(&[ScoredDoc::new("x", f64::NAN), ScoredDoc::new("y", 0.1)]).is_none());
    }

    #[test]
    fn duplicate_url_keeps_largest_score() {
        let pool = vec![ScoredDoc::new("x", 0.5), ScoredDoc::new("x", 0.1), ScoredDoc::new("y", 0.4)];
        let priors = authority_priors(&pool).unwrap();
        assert_eq!(priors.len(), 2);
        assert!((priors["x"] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_url_pool_short_circuits() {
        assert!(authority_priors(&[ScoredDoc::new("x", 0.1), ScoredDoc::new("x", 0.3)]).is_none());
    }

    fn graph() -> Corpus {
        Corpus::new(vec![
            Document::new("a", "A", "", "").with_outlinks(["c", "c", "a", "elsewhere"]),
            Document::new("b", "B", "", "").with_outlinks(["c"]),
            Document::new("c", "C", "", ""),
        ])
    }

    #[test]
    fn graph_keeps_only_corpus_edges() {
        let ranker = LinkGraphRanker::from_corpus(&graph(), PageRankParams::default());
        assert_eq!(ranker.num_edges(), 2);
    }

    #[test]
    fn linked_document_gains_authority() {
        let ranker = LinkGraphRanker::from_corpus(&graph(), PageRankParams::default());
        let priors: Priors = [("a".to_string(), 1.0), ("b".to_string(), 1.0), ("c".to_string(), 1.0)].into();
        let ranked = ranker.rank(&priors);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].url, "c");
        let total: f64 = ranked.iter().map(|r| r.score).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ranks_only_prior_documents() {
        let ranker = LinkGraphRanker::from_corpus(&graph(), PageRankParams::default());
        let priors: Priors = [("a".to_string(), 1.0), ("b".to_string(), 3.0), ("zzz".to_string(), 2.0)].into();
        let ranked = ranker.rank(&priors);
        let urls: Vec<&str> = ranked.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a"]);
    }

    #[test]
    fn empty_priors_yield_nothing() {
        let ranker = LinkGraphRanker::from_corpus(&graph(), PageRankParams::default());
        assert!(ranker.rank(&Priors::new()).is_empty());
    }
}
