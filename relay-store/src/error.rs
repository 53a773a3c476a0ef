use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ttl_seconds must be positive, got {0}")]
    NonPositiveTtl(i64),
}
