use relay_core::{env_bool, env_f64, env_u64};

/// Environment-configurable thresholds and controls, defaults tuned
/// conservatively.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Risk at or above this value is allowed outright.
    pub allow_threshold: i64,
    /// Risk at or above this (and below `allow_threshold`) requires
    /// reauthentication; below it the request is blocked.
    pub reauth_threshold: i64,
    /// Compute the decision but never enforce it.
    pub shadow_mode: bool,
    /// Fraction of tokens (`0.0..=1.0`) actually subject to enforcement;
    /// the rest are allowed regardless of the raw decision.
    pub canary_fraction: f64,
    /// Exceptions permitted per actor/token within `exception_window_secs`.
    pub exception_quota: usize,
    pub exception_window_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_threshold: 70,
            reauth_threshold: 40,
            shadow_mode: false,
            canary_fraction: 1.0,
            exception_quota: 5,
            exception_window_secs: 24 * 3600,
        }
    }
}

impl PolicyConfig {
    pub fn from_env() -> Self {
        Self {
            allow_threshold: env_u64("POLICY_ALLOW_THRESHOLD", 70) as i64,
            reauth_threshold: env_u64("POLICY_REAUTH_THRESHOLD", 40) as i64,
            shadow_mode: env_bool("POLICY_SHADOW_MODE", false),
            canary_fraction: env_f64("POLICY_CANARY_FRACTION", 1.0),
            exception_quota: env_u64("POLICY_EXCEPTION_QUOTA", 5) as usize,
            exception_window_secs: env_u64("POLICY_EXCEPTION_WINDOW_SEC", 24 * 3600),
        }
    }
}
