use relay_core::{env_bool, env_u64};
use std::path::PathBuf;

/// Configuration for one [`crate::AuditLog`] sink.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub path: PathBuf,
    /// Rotate once the active file exceeds this many bytes.
    pub max_size_bytes: u64,
    /// Number of rotated `.1..N` files retained.
    pub rotation_count: u32,
    /// Whether records are chained with an HMAC tamper-detection suffix.
    pub tamper_detection: bool,
}

impl AuditConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size_bytes: 10 * 1024 * 1024,
            rotation_count: 5,
            tamper_detection: true,
        }
    }

    /// Builds a config from environment-like keys, with `prefix` allowing
    /// two independently configured sinks (policy vs. forensic) to share
    /// the same key names under different prefixes.
    pub fn from_env(prefix: &str, default_path: impl Into<PathBuf>) -> Self {
        let path = std::env::var(format!("{prefix}_AUDIT_LOG_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_path.into());
        Self {
            path,
            max_size_bytes: env_u64(&format!("{prefix}_AUDIT_LOG_MAX_SIZE"), 10 * 1024 * 1024),
            rotation_count: env_u64(&format!("{prefix}_AUDIT_LOG_ROTATION_COUNT"), 5) as u32,
            tamper_detection: env_bool(&format!("{prefix}_AUDIT_TAMPER_DETECTION"), true),
        }
    }
}
