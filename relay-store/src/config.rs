use relay_core::env_u64;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Wake interval for the background sweeper.
    pub cleanup_interval_secs: u64,
    /// Number of overwrite passes performed on secure deletion.
    pub secure_delete_passes: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: 5,
            secure_delete_passes: 3,
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self {
            cleanup_interval_secs: env_u64("RELAY_STORE_CLEANUP_INTERVAL_SECS", 5),
            secure_delete_passes: env_u64("RELAY_STORE_SECURE_DELETE_PASSES", 3) as u32,
        }
    }
}
