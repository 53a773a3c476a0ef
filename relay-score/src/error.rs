use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("observation vector arity mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("observation vector contains a non-finite value")]
    NonFinite,
    #[error("failed to persist model snapshot: {0}")]
    Persist(#[source] std::io::Error),
    #[error("failed to load model snapshot: {0}")]
    Load(#[source] std::io::Error),
    #[error("model snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
