use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("audit log error: {0}")]
    Audit(#[from] relay_audit::AuditError),
    #[error("key manager error: {0}")]
    Keys(#[from] relay_keys::KeyError),
    #[error("scorer error: {0}")]
    Score(#[from] relay_score::ScoreError),
    #[error("policy error: {0}")]
    Policy(#[from] relay_policy::PolicyError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] relay_pipeline::PipelineError),
    #[error("admin surface is not configured")]
    AdminUnconfigured,
    #[error("admin credential rejected")]
    AdminCredentialRejected,
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}
