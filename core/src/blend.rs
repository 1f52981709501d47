//! Candidate merging, semantic widening and authority assembly.
//!
//! The two score spaces are never put on a common scale: a lexical cosine
//! score and a semantic distance can sit next to each other in the output.
//! Deduplication happens only while admitting candidates; the final list
//! may name a URL more than once.

use crate::authority::{authority_priors, AuthorityRanker};
use crate::config::EngineConfig;
use crate::{RankedDoc, ScoredDoc, Segment};
use std::collections::HashSet;

/// Merge the lexical top-k with the full semantic ranking and admit unique
/// URLs.
///
/// Walks position `i` of the merged list and position `i` of the semantic
/// ranking together, for at most `semantic_scan` positions, stopping once
/// `max_candidates` URLs are admitted. At each position the merged entry is
/// tried first.
pub fn merge_candidates(lexical: &[ScoredDoc], semantic: &[ScoredDoc], config: &EngineConfig) -> Vec<RankedDoc> {
    let top_k = lexical.len().min(config.lexical_top_k);
    let merged: Vec<RankedDoc> = lexical[..top_k]
        .iter()
        .cloned()
        .map(|d| RankedDoc::new(d, Segment::Lexical))
        .chain(semantic.iter().cloned().map(|d| RankedDoc::new(d, Segment::Semantic)))
        .collect();

    let mut admitted: HashSet<String> = HashSet::new();
    let mut out: Vec<RankedDoc> = Vec::new();
    for (i, entry) in merged.into_iter().take(config.semantic_scan).enumerate() {
        let paired = semantic.get(i).map(|d| RankedDoc::new(d.clone(), Segment::Semantic));
        for candidate in std::iter::once(entry).chain(paired) {
            if out.len() >= config.max_candidates {
                return out;
            }
            if admitted.insert(candidate.url.clone()) {
                out.push(candidate);
            }
        }
    }
    out
}

/// Gather neighbours of every candidate into one pool, skipping exact
/// `(url, score)` repeats.
pub fn similarity_pool<F>(candidates: &[RankedDoc], mut neighbors: F) -> Vec<ScoredDoc>
where
    F: FnMut(&str) -> Vec<ScoredDoc>,
{
    let mut pool: Vec<ScoredDoc> = Vec::new();
    for candidate in candidates {
        for n in neighbors(&candidate.url) {
            if !pool.iter().any(|p| p.url == n.url && p.score == n.score) {
                pool.push(n);
            }
        }
    }
    pool
}

/// Candidates, then the similarity pool, then the authority ranking of that
/// pool when one is available.
pub fn assemble(candidates: Vec<RankedDoc>, pool: Vec<ScoredDoc>, ranker: &dyn AuthorityRanker) -> Vec<RankedDoc> {
    let authority = match authority_priors(&pool) {
        Some(priors) => ranker.rank(&priors),
        None => {
            tracing::debug!(pool = pool.len(), "authority rerank skipped");
            Vec::new()
        }
    };
    let mut out = candidates;
    out.extend(pool.into_iter().map(|d| RankedDoc::new(d, Segment::Similar)));
    out.extend(authority.into_iter().map(|d| RankedDoc::new(d, Segment::Authority)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::Priors;
    use std::sync::Mutex;

    fn docs(items: &[(&str, f64)]) -> Vec<ScoredDoc> {
        items.iter().map(|(u, s)| ScoredDoc::new(*u, *s)).collect()
    }

    fn urls(ranked: &[RankedDoc]) -> Vec<&str> {
        ranked.iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn shared_url_admitted_once_at_earliest_position() {
        let lexical = docs(&[("x", 0.9), ("y", 0.5)]);
        let semantic = docs(&[("z", 0.1), ("x", 0.2), ("w", 0.3)]);
        let out = merge_candidates(&lexical, &semantic, &EngineConfig::default());
        assert_eq!(urls(&out), vec!["x", "z", "y", "w"]);
        assert_eq!(out[0].segment, Segment::Lexical);
        assert_eq!(out[0].score, 0.9);
        assert_eq!(out[1].segment, Segment::Semantic);
    }

    #[test]
    fn lexical_list_capped_before_merge() {
        let lexical: Vec<ScoredDoc> = (0..15).map(|i| ScoredDoc::new(format!("l{i}"), 1.0)).collect();
        let semantic = docs(&[("s0", 0.1)]);
        let config = EngineConfig { max_candidates: 100, ..Default::default() };
        let out = merge_candidates(&lexical, &semantic, &config);
        assert_eq!(out.iter().filter(|r| r.segment == Segment::Lexical).count(), 10);
        assert!(!urls(&out).contains(&"l10"));
        assert_eq!(out[1].url, "s0");
    }

    #[test]
    fn admission_capped_at_max_candidates() {
        let semantic: Vec<ScoredDoc> = (0..50).map(|i| ScoredDoc::new(format!("s{i}"), i as f64)).collect();
        let lexical: Vec<ScoredDoc> = (0..10).map(|i| ScoredDoc::new(format!("l{i}"), 1.0)).collect();
        let out = merge_candidates(&lexical, &semantic, &EngineConfig::default());
        assert_eq!(out.len(), 20);
        let unique: HashSet<&str> = urls(&out).into_iter().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn empty_lexical_uses_semantic_only() {
        let semantic = docs(&[("a", 0.1), ("b", 0.2), ("c", 0.3)]);
        let out = merge_candidates(&[], &semantic, &EngineConfig::default());
        assert_eq!(urls(&out), vec!["a", "b", "c"]);
        assert!(out.iter().all(|r| r.segment == Segment::Semantic));
    }

    #[test]
    fn scan_limit_bounds_walk() {
        let semantic: Vec<ScoredDoc> = (0..10).map(|i| ScoredDoc::new(format!("s{i}"), i as f64)).collect();
        let config = EngineConfig { semantic_scan: 2, ..Default::default() };
        let out = merge_candidates(&[], &semantic, &config);
        assert_eq!(urls(&out), vec!["s0", "s1"]);
    }

    #[test]
    fn pool_skips_exact_repeats_only() {
        let candidates = vec![
            RankedDoc::new(ScoredDoc::new("a", 0.0), Segment::Semantic),
            RankedDoc::new(ScoredDoc::new("b", 0.0), Segment::Semantic),
        ];
        let pool = similarity_pool(&candidates, |url| match url {
            "a" => docs(&[("a", 0.0), ("b", 0.3)]),
            _ => docs(&[("b", 0.0), ("a", 0.3), ("a", 0.0)]),
        });
        assert_eq!(pool, docs(&[("a", 0.0), ("b", 0.3), ("b", 0.0), ("a", 0.3)]));
    }

    struct Recording(Mutex<Option<Priors>>);

    impl AuthorityRanker for Recording {
        fn rank(&self, priors: &Priors) -> Vec<ScoredDoc> {
            *self.0.lock().unwrap() = Some(priors.clone());
            vec![ScoredDoc::new("auth", 7.0)]
        }
    }

    #[test]
    fn assemble_appends_authority_after_pool() {
        let ranker = Recording(Mutex::new(None));
        let candidates = vec![RankedDoc::new(ScoredDoc::new("c", 0.5), Segment::Lexical)];
        let out = assemble(candidates, docs(&[("p", 0.2), ("q", 0.8)]), &ranker);
        assert_eq!(urls(&out), vec!["c", "p", "q", "auth"]);
        assert_eq!(out[3].segment, Segment::Authority);
        let priors = ranker.0.lock().unwrap().clone().unwrap();
        assert!((priors["p"] - 1.0).abs() < 1e-12);
        assert!((priors["q"] - 1.6).abs() < 1e-12);
    }

    #[test]
    fn single_entry_pool_skips_ranker() {
        let ranker = Recording(Mutex::new(None));
        let out = assemble(Vec::new(), docs(&[("p", 0.2)]), &ranker);
        assert_eq!(urls(&out), vec!["p"]);
        assert!(ranker.0.lock().unwrap().is_none());
    }
}
