use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("risk score out of range: {0}")]
    RiskOutOfRange(i64),
    #[error("audit record could not be written: {0}")]
    Audit(#[from] relay_audit::AuditError),
}
