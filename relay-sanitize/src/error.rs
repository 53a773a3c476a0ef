use thiserror::Error;

#[derive(Debug, Error)]
pub enum SanitizeError {
    #[error("field {0} has a structurally invalid value")]
    InvalidField(String),
}
