use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid ciphertext base64: {0}")]
    InvalidCiphertextBase64(#[source] base64::DecodeError),
    #[error("invalid message base64: {0}")]
    InvalidMessageBase64(#[source] base64::DecodeError),
    #[error("ttl_seconds must be positive, got {0}")]
    NonPositiveTtl(i64),
    #[error("store error: {0}")]
    Store(#[from] relay_store::StoreError),
    #[error("key manager error: {0}")]
    Keys(#[from] relay_keys::KeyError),
    #[error("scorer error: {0}")]
    Score(#[from] relay_score::ScoreError),
    #[error("policy error: {0}")]
    Policy(#[from] relay_policy::PolicyError),
}
