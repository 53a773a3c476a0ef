use relay_core::{env_bool, env_u64};

#[derive(Debug, Clone)]
pub struct KeyManagerConfig {
    pub rotate_interval_secs: u64,
    /// Whether the post-quantum KEM keypair is generated alongside the
    /// classical one. A PQC initialization failure at rotation time
    /// disables it for the affected bundle rather than failing startup.
    pub pqc_enabled: bool,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            rotate_interval_secs: 3600,
            pqc_enabled: true,
        }
    }
}

impl KeyManagerConfig {
    pub fn from_env() -> Self {
        Self {
            rotate_interval_secs: env_u64("RELAY_KEYS_ROTATE_INTERVAL_SECS", 3600),
            pqc_enabled: env_bool("RELAY_KEYS_PQC_ENABLED", true),
        }
    }
}
