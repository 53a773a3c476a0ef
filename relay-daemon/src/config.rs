use relay_audit::AuditConfig;
use relay_core::env_string_set;
use relay_keys::KeyManagerConfig;
use relay_policy::PolicyConfig;
use relay_sanitize::SanitizerConfig;
use relay_score::ScorerConfig;
use relay_store::StoreConfig;
use std::path::PathBuf;

/// Whether the daemon scores with the single-model `AnomalyScorer` or the
/// multi-view `ConsensusEnsemble`, per `relay-score`'s interchangeable
/// `Scorer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScorerMode {
    Single,
    Consensus,
}

impl ScorerMode {
    fn from_env() -> Self {
        match std::env::var("RELAY_DAEMON_SCORER_MODE") {
            Ok(raw) if raw.eq_ignore_ascii_case("consensus") => ScorerMode::Consensus,
            _ => ScorerMode::Single,
        }
    }
}

/// Aggregates every component's own `from_env()` config plus the handful
/// of daemon-level knobs (scorer mode, admin credentials) that don't
/// belong to any single component.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub store: StoreConfig,
    pub keys: KeyManagerConfig,
    pub sanitizer: SanitizerConfig,
    pub scorer: ScorerConfig,
    pub scorer_mode: ScorerMode,
    pub policy: PolicyConfig,
    pub policy_audit: AuditConfig,
    pub forensic_audit: AuditConfig,
    /// Shared admin credentials, compared with a constant-time check.
    /// Empty means the admin surface is unconfigured and fails closed.
    pub admin_credentials: Vec<String>,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let data_dir: PathBuf = std::env::var("RELAY_DAEMON_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        Self {
            store: StoreConfig::from_env(),
            keys: KeyManagerConfig::from_env(),
            sanitizer: SanitizerConfig::from_env(),
            scorer: ScorerConfig::from_env(),
            scorer_mode: ScorerMode::from_env(),
            policy: PolicyConfig::from_env(),
            policy_audit: AuditConfig::from_env("RELAY_POLICY", data_dir.join("policy-audit.log")),
            forensic_audit: AuditConfig::from_env(
                "RELAY_FORENSIC",
                data_dir.join("forensic-audit.log"),
            ),
            admin_credentials: env_string_set("RELAY_DAEMON_ADMIN_CREDENTIALS"),
        }
    }
}
