use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit log at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write audit record: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to rotate audit log: {0}")]
    Rotate(#[source] std::io::Error),
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to read audit log: {0}")]
    Read(#[source] std::io::Error),
}
