//! Dense document vectors and distance queries.
//!
//! Rows of the matrix follow the corpus order. The URL sequence and the matrix
//! are only ever built and persisted together.

use crate::corpus::Corpus;
use crate::error::{IndexError, Result};
use crate::normalize::normalize;
use crate::ScoredDoc;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Text to fixed-width vector. Implementations must be deterministic for a
/// given model version.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

/// Feature-hashing bag of words, L2-normalised.
///
/// Stands in for a pretrained model so that an index can be built and
/// queried without one. Any other [`Embedder`] can be supplied instead.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(IndexError::Config("embedding dimension must be greater than 0".into()));
        }
        Ok(Self { dim })
    }
}

impl Embedder for HashingEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dim];
        for token in normalize(text).split(' ').filter(|t| !t.is_empty()) {
            let h = crc32fast::hash(token.as_bytes());
            let bucket = (h as usize) % self.dim;
            let sign = if h & 0x8000_0000 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(v)
    }
}

/// Distance between two vectors, lower is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    SqEuclidean,
}

impl Metric {
    pub fn distance(self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Metric::Cosine => {
                let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
                for (x, y) in a.iter().zip(b) {
                    let (x, y) = (*x as f64, *y as f64);
                    dot += x * y;
                    na += x * x;
                    nb += y * y;
                }
                if na == 0.0 || nb == 0.0 {
                    // undefined for a zero vector; treat as orthogonal
                    return 1.0;
                }
                1.0 - dot / (na.sqrt() * nb.sqrt())
            }
            Metric::Euclidean => Metric::SqEuclidean.distance(a, b).sqrt(),
            Metric::SqEuclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = *x as f64 - *y as f64;
                    d * d
                })
                .sum(),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" => Ok(Metric::Euclidean),
            "sqeuclidean" => Ok(Metric::SqEuclidean),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

/// URL sequence plus a row-major `[rows, dim]` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingStore {
    urls: Vec<String>,
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingStore {
    pub fn from_parts(urls: Vec<String>, dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            return Err(IndexError::Mismatch("embedding matrix has zero columns".into()));
        }
        if data.len() != urls.len() * dim {
            return Err(IndexError::Mismatch(format!(
                "embedding matrix holds {} values, expected {} rows x {} columns",
                data.len(),
                urls.len(),
                dim
            )));
        }
        Ok(Self { urls, dim, data })
    }

    /// Encode every document's primary text in corpus order.
    pub fn build(corpus: &Corpus, embedder: &dyn Embedder, batch_size: usize) -> Result<Self> {
        let dim = embedder.dim();
        let batch_size = batch_size.max(1);
        let mut data = Vec::with_capacity(corpus.len() * dim);
        for chunk in corpus.docs().chunks(batch_size) {
            let texts: Vec<String> = chunk.iter().map(|d| d.primary_text.clone()).collect();
            let vectors = embedder.encode_batch(&texts)?;
            if vectors.len() != texts.len() {
                return Err(IndexError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            for v in vectors {
                if v.len() != dim {
                    return Err(IndexError::Dimension { expected: dim, actual: v.len() });
                }
                data.extend_from_slice(&v);
            }
        }
        let urls = corpus.urls().map(str::to_string).collect();
        let store = Self::from_parts(urls, dim, data)?;
        tracing::info!(rows = store.len(), dim, "embedding matrix built");
        Ok(store)
    }

    pub fn len(&self) -> usize { self.urls.len() }

    pub fn is_empty(&self) -> bool { self.urls.is_empty() }

    pub fn dim(&self) -> usize { self.dim }

    pub fn urls(&self) -> &[String] { &self.urls }

    pub fn data(&self) -> &[f32] { &self.data }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.len()).then(|| &self.data[i * self.dim..(i + 1) * self.dim])
    }

    /// Distance from `query` to every row, ascending. Ties keep corpus order.
    pub fn rank(&self, query: &[f32], metric: Metric) -> Result<Vec<ScoredDoc>> {
        if query.len() != self.dim {
            return Err(IndexError::Dimension { expected: self.dim, actual: query.len() });
        }
        #[cfg(feature = "parallel")]
        let distances: Vec<f64> = self.data.par_chunks(self.dim).map(|row| metric.distance(query, row)).collect();
        #[cfg(not(feature = "parallel"))]
        let distances: Vec<f64> = self.data.chunks(self.dim).map(|row| metric.distance(query, row)).collect();

        let mut ranked: Vec<ScoredDoc> = self
            .urls
            .iter()
            .zip(distances)
            .map(|(url, d)| ScoredDoc::new(url, d))
            .collect();
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
        Ok(ranked)
    }

    /// The `k` nearest documents to `query`.
    pub fn nearest(&self, query: &[f32], k: usize, metric: Metric) -> Result<Vec<ScoredDoc>> {
        let mut ranked = self.rank(query, metric)?;
        ranked.truncate(k);
        Ok(ranked)
    }

    /// Rows must line up with the corpus order one-to-one.
    pub fn validate(&self, corpus: &Corpus) -> Result<()> {
        if self.len() != corpus.len() {
            return Err(IndexError::Mismatch(format!(
                "{} embedding rows for {} documents",
                self.len(),
                corpus.len()
            )));
        }
        for (i, (stored, doc)) in self.urls.iter().zip(corpus.docs()).enumerate() {
            if stored != &doc.url {
                return Err(IndexError::Mismatch(format!(
                    "embedding row {i} belongs to {stored}, corpus has {}",
                    doc.url
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;

    #[test]
    fn cosine_distance_basics() {
        let m = Metric::Cosine;
        assert!(m.distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-12);
        assert!((m.distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((m.distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
        assert_eq!(m.distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn euclidean_distances() {
        assert_eq!(Metric::Euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(Metric::SqEuclidean.distance(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn hashing_embedder_is_deterministic_and_unit_length() {
        let e = HashingEmbedder::new(32).unwrap();
        let a = e.encode("Great pets, cats!").unwrap();
        let b = e.encode("great pets cats").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(e.encode("").unwrap().iter().all(|x| *x == 0.0));
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn rank_sorts_ascending_in_corpus_order() {
        let store = EmbeddingStore::from_parts(
            vec!["a".into(), "b".into(), "c".into()],
            2,
            vec![0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
        )
        .unwrap();
        let ranked = store.rank(&[1.0, 0.0], Metric::Cosine).unwrap();
        let urls: Vec<&str> = ranked.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "c", "a"]);
        assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
        let top = store.nearest(&[1.0, 0.0], 1, Metric::Cosine).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].url, "b");
    }

    #[test]
    fn rank_rejects_wrong_dimension() {
        let store = EmbeddingStore::from_parts(vec!["a".into()], 2, vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            store.rank(&[1.0, 0.0, 0.0], Metric::Cosine),
            Err(IndexError::Dimension { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn from_parts_checks_shape() {
        assert!(EmbeddingStore::from_parts(vec!["a".into(), "b".into()], 2, vec![1.0, 0.0]).is_err());
        assert!(EmbeddingStore::from_parts(vec![], 0, vec![]).is_err());
    }

    #[test]
    fn build_embeds_primary_text_only() {
        let corpus = Corpus::new(vec![
            Document::new("a", "A", "cats", "completely different body"),
            Document::new("b", "B", "cats", ""),
        ]);
        let e = HashingEmbedder::new(16).unwrap();
        let store = EmbeddingStore::build(&corpus, &e, 1).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.row(0), store.row(1));
        assert!(store.row(2).is_none());
        assert!(store.validate(&corpus).is_ok());
    }

    #[test]
    fn validate_detects_reordering() {
        let corpus = Corpus::new(vec![Document::new("a", "A", "x", ""), Document::new("b", "B", "y", "")]);
        let store = EmbeddingStore::from_parts(vec!["b".into(), "a".into()], 1, vec![1.0, 2.0]).unwrap();
        assert!(matches!(store.validate(&corpus), Err(IndexError::Mismatch(_))));
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn dim(&self) -> usize { 4 }
        fn encode(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![1.0, 2.0]) }
    }

    #[test]
    fn build_rejects_inconsistent_provider() {
        let corpus = Corpus::new(vec![Document::new("a", "A", "x", "")]);
        assert!(matches!(
            EmbeddingStore::build(&corpus, &ShortEmbedder, 8),
            Err(IndexError::Dimension { expected: 4, actual: 2 })
        ));
    }
}
