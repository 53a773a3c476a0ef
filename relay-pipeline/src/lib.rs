//! Orchestrates decode/validate, leak detection, sanitization, scoring,
//! risk adjustment, policy decision, and storage for both the plaintext
//! and hybrid-crypto submission paths, behind one `RelayServices`
//! container.

mod error;
mod outcome;
mod services;

pub use error::PipelineError;
pub use outcome::{Action, HybridSubmitOutcome, SubmitOutcome, SubmitStatus};
pub use services::{build_vector, RelayServices};

pub use relay_sanitize::{Metadata, MetadataValue};

#[cfg(test)]
mod tests {
    use super::*;
    use relay_audit::{AuditConfig, AuditLog};
    use relay_keys::{KeyManager, KeyManagerConfig};
    use relay_policy::{PolicyConfig, PolicyEngine};
    use relay_score::{AnomalyScorer, ScorerConfig};
    use relay_sanitize::SanitizerConfig;
    use relay_store::{EphemeralStore, StoreConfig};
    use std::sync::Arc;

    fn services(dir: &std::path::Path) -> RelayServices {
        let store = EphemeralStore::new(StoreConfig::default());
        let keys = KeyManager::new(KeyManagerConfig {
            rotate_interval_secs: 3600,
            pqc_enabled: false,
        });
        let scorer: Arc<dyn relay_score::Scorer> = AnomalyScorer::new(ScorerConfig::default());
        let policy = PolicyEngine::new(PolicyConfig::default());
        let audit = AuditLog::open(AuditConfig::new(dir.join("audit.log"))).expect("audit open");
        RelayServices::new(store, keys, SanitizerConfig::default(), scorer, policy, audit)
    }

    fn metadata_with(padded_size: i64, interval: f64, dest_count: i64) -> Metadata {
        [
            ("padded_size".to_string(), MetadataValue::Int(padded_size)),
            ("interval".to_string(), MetadataValue::Float(interval)),
            ("dest_count".to_string(), MetadataValue::Int(dest_count)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn clean_plaintext_submission_is_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());
        let ciphertext_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b"sealed-bytes",
        );
        let outcome = services
            .submit_plaintext("token-1", &ciphertext_b64, 30, metadata_with(800, 30.0, 1), None)
            .expect("submit");
        assert_eq!(outcome.status, SubmitStatus::Stored);
        assert!(services.store().get("token-1").is_some());
    }

    #[test]
    fn high_risk_plaintext_submission_is_blocked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());
        services.policy().set_thresholds(Some(101), Some(100));
        let ciphertext_b64 = base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            b"sealed-bytes",
        );
        let outcome = services
            .submit_plaintext("token-2", &ciphertext_b64, 30, metadata_with(800, 30.0, 1), None)
            .expect("submit");
        assert_eq!(outcome.status, SubmitStatus::Blocked);
        assert!(services.store().get("token-2").is_none());
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());
        let result = services.submit_plaintext("token-3", "not-base64!!", 30, Metadata::new(), None);
        assert!(result.is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());
        let ciphertext_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"x");
        let result = services.submit_plaintext("token-4", &ciphertext_b64, 0, Metadata::new(), None);
        assert!(result.is_err());
    }

    #[test]
    fn hybrid_submission_round_trips_through_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());

        let client_secret = x25519_dalek::StaticSecret::random_from_rng(rand_core::OsRng);
        let client_public = x25519_dalek::PublicKey::from(&client_secret);

        let message_b64 =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"hello world");
        let result = services
            .submit_hybrid(
                "token-5",
                &message_b64,
                30,
                client_public.as_bytes(),
                None,
                metadata_with(800, 30.0, 1),
                None,
            )
            .expect("submit hybrid");
        assert_eq!(result.outcome.status, SubmitStatus::Stored);
        assert!(result.encrypted_message_b64.is_some());
        assert!(services.store().get("token-5").is_some());
    }

    #[test]
    fn metadata_leaks_escalate_risk_and_are_noted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = services(dir.path());
        let mut metadata = metadata_with(800, 30.0, 1);
        metadata.insert("user_id".to_string(), MetadataValue::String("u1".to_string()));
        let ciphertext_b64 =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b"sealed");
        let outcome = services
            .submit_plaintext("token-6", &ciphertext_b64, 30, metadata, None)
            .expect("submit");
        // user_id is high-sensitivity and removed by sanitization; the
        // leak detector still sees it in the original metadata.
        assert!(matches!(
            outcome.status,
            SubmitStatus::Stored | SubmitStatus::Blocked | SubmitStatus::RequireReauth
        ));
    }
}
