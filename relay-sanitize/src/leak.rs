use crate::config::SanitizerConfig;
use crate::value::Metadata;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeakType {
    Identity,
    Location,
    Device,
    Network,
    Behavioral,
    Temporal,
}

impl LeakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeakType::Identity => "identity_leak",
            LeakType::Location => "location_leak",
            LeakType::Device => "device_leak",
            LeakType::Network => "network_leak",
            LeakType::Behavioral => "behavioral_leak",
            LeakType::Temporal => "temporal_leak",
        }
    }
}

const IDENTITY_FIELDS: &[&str] = &[
    "user_id",
    "username",
    "email",
    "ssn",
    "social_security",
    "passport",
    "biometric_data",
    "face_id",
    "fingerprint",
    "voice_print",
    "credit_card",
    "bank_account",
];
const LOCATION_FIELDS: &[&str] = &["location", "gps", "coordinates", "address"];
const DEVICE_FIELDS: &[&str] = &["device_id", "device_fingerprint", "user_agent", "browser_info"];
const NETWORK_FIELDS: &[&str] = &["ip_address", "mac_address", "network_info", "connection_type", "bandwidth", "latency"];
const TEMPORAL_FIELDS: &[&str] = &["timestamp", "last_seen", "created_at", "updated_at", "date", "time"];

const BEHAVIORAL_FIELD_COUNT_THRESHOLD: usize = 15;
const BEHAVIORAL_VARIANCE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct LeakReport {
    pub leak_detected: bool,
    pub risk_score: f64,
    pub confidence: f64,
    pub leak_types: Vec<LeakType>,
    pub recommendations: Vec<String>,
    pub status: &'static str,
}

/// Detects metadata-leak patterns by the same name-substring dictionaries
/// the sanitizer classifies fields with, plus a behavioral signal over a
/// sliding window of recent submissions' field counts.
pub struct LeakDetector {
    pattern_window: Mutex<VecDeque<usize>>,
    window_size: usize,
}

impl LeakDetector {
    pub fn new(config: &SanitizerConfig) -> Self {
        Self {
            pattern_window: Mutex::new(VecDeque::with_capacity(config.pattern_window)),
            window_size: config.pattern_window.max(1),
        }
    }

    pub fn detect_metadata_leaks(&self, metadata: &Metadata) -> LeakReport {
        let field_names: Vec<String> = metadata.keys().map(|k| k.to_ascii_lowercase()).collect();
        let mut leak_types = Vec::new();

        if any_matches(&field_names, IDENTITY_FIELDS) {
            leak_types.push(LeakType::Identity);
        }
        if any_matches(&field_names, LOCATION_FIELDS) {
            leak_types.push(LeakType::Location);
        }
        if any_matches(&field_names, DEVICE_FIELDS) {
            leak_types.push(LeakType::Device);
        }
        if any_matches(&field_names, NETWORK_FIELDS) {
            leak_types.push(LeakType::Network);
        }
        if count_matches(&field_names, TEMPORAL_FIELDS) >= 2 {
            leak_types.push(LeakType::Temporal);
        }
        if self.record_and_check_behavioral(metadata.len()) {
            leak_types.push(LeakType::Behavioral);
        }

        let leak_detected = !leak_types.is_empty();
        let risk_score = (0.15 * leak_types.len() as f64).min(1.0);
        let confidence = if leak_detected {
            (0.7 + 0.05 * leak_types.len() as f64).min(1.0)
        } else {
            0.9
        };
        let recommendations = leak_types.iter().map(|t| recommendation_for(*t)).collect();
        let status = if leak_detected { "leak_detected" } else { "clean" };

        LeakReport {
            leak_detected,
            risk_score,
            confidence,
            leak_types,
            recommendations,
            status,
        }
    }

    fn record_and_check_behavioral(&self, field_count: usize) -> bool {
        if field_count > BEHAVIORAL_FIELD_COUNT_THRESHOLD {
            return true;
        }
        // A panic while holding this lock would indicate a bug in this
        // module, not a recoverable runtime condition.
        #[allow(clippy::unwrap_used)]
        let mut window = self.pattern_window.lock().unwrap();
        window.push_back(field_count);
        while window.len() > self.window_size {
            window.pop_front();
        }
        if window.len() < 2 {
            return false;
        }
        sample_variance(window.iter().copied()) > BEHAVIORAL_VARIANCE_THRESHOLD
    }
}

fn any_matches(field_names: &[String], dictionary: &[&str]) -> bool {
    field_names
        .iter()
        .any(|name| dictionary.iter().any(|d| name.contains(d)))
}

fn count_matches(field_names: &[String], dictionary: &[&str]) -> usize {
    field_names
        .iter()
        .filter(|name| dictionary.iter().any(|d| name.contains(d)))
        .count()
}

fn sample_variance(values: impl Iterator<Item = usize> + Clone) -> f64 {
    let n = values.clone().count();
    if n < 2 {
        return 0.0;
    }
    let mean = values.clone().map(|v| v as f64).sum::<f64>() / n as f64;
    let sum_sq_diff: f64 = values.map(|v| (v as f64 - mean).powi(2)).sum();
    sum_sq_diff / (n - 1) as f64
}

fn recommendation_for(t: LeakType) -> String {
    match t {
        LeakType::Identity => "remove or obfuscate identity-revealing fields".to_string(),
        LeakType::Location => "remove or coarsen location fields".to_string(),
        LeakType::Device => "remove or obfuscate device-identifying fields".to_string(),
        LeakType::Network => "remove or obfuscate network identifiers".to_string(),
        LeakType::Behavioral => "review submission field-count variance for anomalous batches".to_string(),
        LeakType::Temporal => "quantize or drop redundant time fields".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::MetadataValue;

    fn md(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn detects_identity_leak() {
        let detector = LeakDetector::new(&SanitizerConfig::default());
        let metadata = md(&[("user_id", MetadataValue::String("u1".to_string()))]);
        let report = detector.detect_metadata_leaks(&metadata);
        assert!(report.leak_detected);
        assert!(report.leak_types.contains(&LeakType::Identity));
    }

    #[test]
    fn clean_metadata_reports_no_leak() {
        let detector = LeakDetector::new(&SanitizerConfig::default());
        let metadata = md(&[("padded_size", MetadataValue::Int(2048))]);
        let report = detector.detect_metadata_leaks(&metadata);
        assert!(!report.leak_detected);
        assert_eq!(report.status, "clean");
    }

    #[test]
    fn field_count_over_threshold_is_behavioral_leak() {
        let detector = LeakDetector::new(&SanitizerConfig::default());
        let mut pairs = Vec::new();
        for i in 0..16 {
            pairs.push((format!("field_{i}"), MetadataValue::Int(i as i64)));
        }
        let metadata: Metadata = pairs.into_iter().collect();
        let report = detector.detect_metadata_leaks(&metadata);
        assert!(report.leak_types.contains(&LeakType::Behavioral));
    }
}
