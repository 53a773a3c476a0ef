use relay_core::{env_bool, env_f64, env_u64};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    /// Observation vector arity. Fixed at 4 per the feature layout
    /// (padded_size, interval, dest_count, device_change_flag).
    pub arity: usize,
    pub buffer_capacity: usize,
    pub use_reservoir: bool,
    pub min_train_samples: usize,
    pub contamination: f64,
    pub tree_count: usize,
    pub retrain_interval_secs: u64,
    pub model_path: Option<PathBuf>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            arity: 4,
            buffer_capacity: 10_000,
            use_reservoir: false,
            min_train_samples: 100,
            contamination: 0.1,
            tree_count: 100,
            retrain_interval_secs: 30,
            model_path: None,
        }
    }
}

impl ScorerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.buffer_capacity = env_u64("RELAY_SCORE_BUFFER_CAPACITY", 10_000) as usize;
        config.use_reservoir = env_bool("RELAY_SCORE_USE_RESERVOIR", false);
        config.min_train_samples = env_u64("RELAY_SCORE_MIN_TRAIN_SAMPLES", 100) as usize;
        config.contamination = env_f64("RELAY_SCORE_CONTAMINATION", 0.1);
        config.tree_count = env_u64("RELAY_SCORE_TREE_COUNT", 100) as usize;
        config.retrain_interval_secs = env_u64("RELAY_SCORE_RETRAIN_INTERVAL_SECS", 30);
        config.model_path = std::env::var("RELAY_SCORE_MODEL_PATH").ok().map(PathBuf::from);
        config
    }
}
