//! Small environment-parsing helpers shared by every component's
//! `from_env()` constructor. Parsing never panics: a malformed value is
//! logged and the supplied default is used instead.

use std::env::VarError;

/// Reads `key` as a `u64`, falling back to `default` if absent or
/// unparseable.
pub fn env_u64(key: &str, default: u64) -> u64 {
    read_env(key, default, |raw| raw.parse::<u64>().ok())
}

/// Reads `key` as an `f64`, falling back to `default` if absent or
/// unparseable.
pub fn env_f64(key: &str, default: f64) -> f64 {
    read_env(key, default, |raw| raw.parse::<f64>().ok())
}

/// Reads `key` as a boolean. Accepts `1/0`, `true/false`, `yes/no`
/// (case-insensitive), falling back to `default` otherwise.
pub fn env_bool(key: &str, default: bool) -> bool {
    read_env(key, default, |raw| match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

/// Reads `key` as a comma-separated set of non-empty strings, used for
/// the admin and ML credential sets. Returns an empty set if absent.
pub fn env_string_set(key: &str) -> Vec<String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn read_env<T: Copy>(key: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> T {
    match std::env::var(key) {
        Ok(raw) => parse(&raw).unwrap_or_else(|| {
            tracing::warn!(key, raw, "malformed environment value, using default");
            default
        }),
        Err(VarError::NotPresent) => default,
        Err(VarError::NotUnicode(_)) => {
            tracing::warn!(key, "non-unicode environment value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_uses_default() {
        assert_eq!(env_u64("RELAY_CORE_TEST_MISSING_U64", 7), 7);
        assert!(env_bool("RELAY_CORE_TEST_MISSING_BOOL", true));
    }

    #[test]
    fn parses_present_key() {
        // SAFETY: test-only, single-threaded within this test body.
        unsafe {
            std::env::set_var("RELAY_CORE_TEST_U64", "42");
        }
        assert_eq!(env_u64("RELAY_CORE_TEST_U64", 0), 42);
        unsafe {
            std::env::remove_var("RELAY_CORE_TEST_U64");
        }
    }

    #[test]
    fn string_set_splits_and_trims() {
        unsafe {
            std::env::set_var("RELAY_CORE_TEST_SET", "a, b ,, c");
        }
        assert_eq!(
            env_string_set("RELAY_CORE_TEST_SET"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        unsafe {
            std::env::remove_var("RELAY_CORE_TEST_SET");
        }
    }
}
