use relay_core::{env_bool, env_f64, env_u64};

#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    pub sanitization_enabled: bool,
    pub obfuscation_enabled: bool,
    pub pseudonymization_enabled: bool,
    /// Aggregate risk at or above this threshold escalates `Unknown`
    /// fields from obfuscate to remove.
    pub sensitive_field_threshold: f64,
    pub leak_detection_enabled: bool,
    pub detection_threshold: f64,
    /// Size of the sliding window of recent submissions' field counts
    /// used to flag behavioral leaks.
    pub pattern_window: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            sanitization_enabled: true,
            obfuscation_enabled: true,
            pseudonymization_enabled: true,
            sensitive_field_threshold: 0.7,
            leak_detection_enabled: true,
            detection_threshold: 0.5,
            pattern_window: 10,
        }
    }
}

impl SanitizerConfig {
    pub fn from_env() -> Self {
        Self {
            sanitization_enabled: env_bool("RELAY_SANITIZE_ENABLED", true),
            obfuscation_enabled: env_bool("RELAY_SANITIZE_OBFUSCATION_ENABLED", true),
            pseudonymization_enabled: env_bool("RELAY_SANITIZE_PSEUDONYMIZATION_ENABLED", true),
            sensitive_field_threshold: env_f64("RELAY_SANITIZE_SENSITIVE_THRESHOLD", 0.7),
            leak_detection_enabled: env_bool("RELAY_SANITIZE_LEAK_DETECTION_ENABLED", true),
            detection_threshold: env_f64("RELAY_SANITIZE_DETECTION_THRESHOLD", 0.5),
            pattern_window: env_u64("RELAY_SANITIZE_PATTERN_WINDOW", 10) as usize,
        }
    }
}
