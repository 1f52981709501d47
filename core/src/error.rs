//! Error types for index construction, persistence and loading.
//!
//! Only structural faults live here. Query-shape edge cases (no lexical
//! overlap, empty similarity pools) are handled in place and never surface
//! as errors.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted bundle file is absent.
    #[error("missing bundle: {}", .0.display())]
    Missing(PathBuf),

    /// A bundle exists but cannot be decoded or fails its checksum.
    #[error("corrupt bundle {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Bundles decode but disagree with each other.
    #[error("bundle mismatch: {0}")]
    Mismatch(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// The embedding provider failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The corpus snapshot is unusable.
    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing() {
        let err = IndexError::Missing(PathBuf::from("idx/lexical.bin"));
        assert_eq!(err.to_string(), "missing bundle: idx/lexical.bin");
    }

    #[test]
    fn display_dimension() {
        let err = IndexError::Dimension { expected: 8, actual: 4 };
        assert_eq!(err.to_string(), "dimension mismatch: expected 8, got 4");
    }

    #[test]
    fn io_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: IndexError = io.into();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IndexError>();
    }
}
