//! Process wiring for the relay: builds the shared service container,
//! starts the background store sweeper / key rotator / scorer retrainer,
//! and exposes one method per wire route so a thin HTTP layer (out of
//! scope here) is a mechanical wrapper around this facade.

mod admin;
mod config;
mod error;
mod routes;

pub use config::{DaemonConfig, ScorerMode};
pub use error::DaemonError;
pub use routes::{AuditReadResponse, FetchResponse, HybridInitResponse, KeysResponse, MlScoreResponse};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use relay_audit::AuditLog;
use relay_keys::KeyManager;
use relay_pipeline::{HybridSubmitOutcome, RelayServices, SubmitOutcome};
use relay_policy::PolicyStatus;
use relay_sanitize::Metadata;
use relay_score::{AnomalyScorer, ConsensusEnsemble, Scorer, ScorerHealth};
use relay_store::{EphemeralStore, ForensicStatus, Retrieved};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct RelayDaemon {
    services: RelayServices,
    forensic_audit: AuditLog,
    admin_credentials: Vec<String>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayDaemon {
    pub fn bootstrap(config: DaemonConfig) -> Result<Self, DaemonError> {
        let store = EphemeralStore::new(config.store);
        let keys = KeyManager::new(config.keys);
        let policy = relay_policy::PolicyEngine::new(config.policy);
        let policy_audit = AuditLog::open(config.policy_audit)?;
        let forensic_audit = AuditLog::open(config.forensic_audit)?;

        let shutdown = CancellationToken::new();
        let mut tasks = vec![store.spawn_sweeper(shutdown.clone()), keys.spawn_rotator(shutdown.clone())];

        let (scorer, retrain_task): (Arc<dyn Scorer>, JoinHandle<()>) = match config.scorer_mode {
            ScorerMode::Single => {
                let scorer = AnomalyScorer::new(config.scorer);
                let task = scorer.spawn_retrainer(shutdown.clone());
                (scorer as Arc<dyn Scorer>, task)
            }
            ScorerMode::Consensus => {
                let ensemble = ConsensusEnsemble::new(config.scorer);
                let task = ensemble.spawn_retrainer(shutdown.clone());
                (ensemble as Arc<dyn Scorer>, task)
            }
        };
        tasks.push(retrain_task);

        let services = RelayServices::new(store, keys, config.sanitizer, scorer, policy, policy_audit);

        Ok(Self {
            services,
            forensic_audit,
            admin_credentials: config.admin_credentials,
            shutdown,
            tasks,
        })
    }

    /// Cancels every background task and waits for each to drain.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
    }

    fn require_admin(&self, credential: &str) -> Result<(), DaemonError> {
        if self.admin_credentials.is_empty() {
            return Err(DaemonError::AdminUnconfigured);
        }
        if admin::admin_credential_ok(&self.admin_credentials, credential) {
            Ok(())
        } else {
            Err(DaemonError::AdminCredentialRejected)
        }
    }

    // -- public, non-admin routes --------------------------------------

    pub fn send(
        &self,
        token: &str,
        ciphertext_b64: &str,
        ttl_seconds: i64,
        metadata: Metadata,
        client_ip: Option<&str>,
    ) -> Result<SubmitOutcome, DaemonError> {
        Ok(self.services.submit_plaintext(token, ciphertext_b64, ttl_seconds, metadata, client_ip)?)
    }

    pub fn fetch(&self, token: &str) -> Option<FetchResponse> {
        let Retrieved { ciphertext, .. } = self.services.store().get(token)?;
        let ttl_remaining = self.services.store().ttl_remaining(token).unwrap_or(0);
        Some(FetchResponse {
            ciphertext_b64: BASE64.encode(&ciphertext),
            ttl_remaining,
        })
    }

    pub fn read(&self, token: &str) -> bool {
        self.services.store().mark_read_and_delete(token)
    }

    pub fn hybrid_init(
        &self,
        client_classical_pub_b64: &str,
        client_kem_pub_b64: Option<&str>,
    ) -> Result<HybridInitResponse, DaemonError> {
        let client_classical_pub = BASE64.decode(client_classical_pub_b64)?;
        let client_kem_pub = client_kem_pub_b64.map(|v| BASE64.decode(v)).transpose()?;

        let (_combined, kem_ct) = self
            .services
            .keys()
            .derive_shared_secret_server_side(&client_classical_pub, client_kem_pub.as_deref())?;

        let snapshot = self.services.keys().export_public_keys();
        Ok(HybridInitResponse {
            key_id: snapshot.key_id,
            classical_pub_b64: BASE64.encode(snapshot.classical_pub),
            kem_ct_b64: kem_ct.map(|ct| BASE64.encode(ct)),
            kem_enabled: snapshot.kem_enabled,
            kem_name: snapshot.kem_name,
        })
    }

    pub fn crypto_send(
        &self,
        token: &str,
        message_b64: &str,
        ttl_seconds: i64,
        client_classical_pub_b64: &str,
        client_kem_pub_b64: Option<&str>,
        metadata: Metadata,
        client_ip: Option<&str>,
    ) -> Result<HybridSubmitOutcome, DaemonError> {
        let client_classical_pub = BASE64.decode(client_classical_pub_b64)?;
        let client_kem_pub = client_kem_pub_b64.map(|v| BASE64.decode(v)).transpose()?;
        Ok(self.services.submit_hybrid(
            token,
            message_b64,
            ttl_seconds,
            &client_classical_pub,
            client_kem_pub.as_deref(),
            metadata,
            client_ip,
        )?)
    }

    pub fn export_keys(&self) -> KeysResponse {
        let snapshot = self.services.keys().export_public_keys();
        KeysResponse {
            key_id: snapshot.key_id,
            classical_pub_b64: BASE64.encode(snapshot.classical_pub),
            kem_pub_b64: snapshot.kem_pub.map(|pk| BASE64.encode(pk)),
            kem_enabled: snapshot.kem_enabled,
            kem_name: snapshot.kem_name,
        }
    }

    pub fn ml_observe(&self, metadata: &Metadata, fallback_padded_size: i64) -> Result<(), DaemonError> {
        let vector = relay_pipeline::build_vector(metadata, fallback_padded_size);
        Ok(self.services.scorer().add_observation(&vector)?)
    }

    // -- admin routes (credential required) ------------------------------

    pub fn admin_ml_score(
        &self,
        credential: &str,
        metadata: &Metadata,
        fallback_padded_size: i64,
    ) -> Result<MlScoreResponse, DaemonError> {
        self.require_admin(credential)?;
        let vector = relay_pipeline::build_vector(metadata, fallback_padded_size);
        let risk = self.services.scorer().score(&vector)?;
        let health = self.services.scorer().health();
        Ok(MlScoreResponse {
            risk,
            simulated: !health.trained,
            ts: relay_core::now_epoch_secs(),
        })
    }

    pub fn admin_ml_health(&self, credential: &str) -> Result<ScorerHealth, DaemonError> {
        self.require_admin(credential)?;
        Ok(self.services.scorer().health())
    }

    pub fn admin_ml_retrain(&self, credential: &str) -> Result<bool, DaemonError> {
        self.require_admin(credential)?;
        Ok(self.services.scorer().force_retrain())
    }

    pub fn admin_policy_status(&self, credential: &str) -> Result<PolicyStatus, DaemonError> {
        self.require_admin(credential)?;
        Ok(self.services.policy().status())
    }

    pub fn admin_set_thresholds(
        &self,
        credential: &str,
        allow: Option<i64>,
        reauth: Option<i64>,
    ) -> Result<(), DaemonError> {
        self.require_admin(credential)?;
        self.services.policy().set_thresholds(allow, reauth);
        Ok(())
    }

    pub fn admin_audit_read(&self, credential: &str, limit: usize) -> Result<AuditReadResponse, DaemonError> {
        self.require_admin(credential)?;
        Ok(AuditReadResponse {
            records: self.services.audit().tail(limit)?,
        })
    }

    pub fn admin_forensic_status(&self, credential: &str) -> Result<ForensicStatus, DaemonError> {
        self.require_admin(credential)?;
        Ok(self.services.store().forensic_status())
    }

    pub fn admin_forensic_cleanup(&self, credential: &str) -> Result<usize, DaemonError> {
        self.require_admin(credential)?;
        Ok(self.services.store().force_secure_cleanup())
    }

    pub fn admin_forensic_audit_integrity(
        &self,
        credential: &str,
    ) -> Result<relay_audit::IntegrityReport, DaemonError> {
        self.require_admin(credential)?;
        Ok(self.forensic_audit.verify_integrity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_sanitize::MetadataValue;

    fn daemon(dir: &std::path::Path) -> RelayDaemon {
        let mut config = DaemonConfig {
            store: relay_store::StoreConfig::default(),
            keys: relay_keys::KeyManagerConfig {
                rotate_interval_secs: 3600,
                pqc_enabled: false,
            },
            sanitizer: relay_sanitize::SanitizerConfig::default(),
            scorer: relay_score::ScorerConfig::default(),
            scorer_mode: ScorerMode::Single,
            policy: relay_policy::PolicyConfig::default(),
            policy_audit: relay_audit::AuditConfig::new(dir.join("policy.log")),
            forensic_audit: relay_audit::AuditConfig::new(dir.join("forensic.log")),
            admin_credentials: vec!["test-admin".to_string()],
        };
        config.policy.canary_fraction = 1.0;
        RelayDaemon::bootstrap(config).expect("bootstrap")
    }

    fn metadata() -> Metadata {
        [
            ("padded_size".to_string(), MetadataValue::Int(800)),
            ("interval".to_string(), MetadataValue::Float(30.0)),
            ("dest_count".to_string(), MetadataValue::Int(1)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn send_then_fetch_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let daemon = daemon(dir.path());
        let ciphertext_b64 = BASE64.encode(b"sealed-bytes");

        let outcome = daemon
            .send("token-1", &ciphertext_b64, 60, metadata(), None)
            .expect("send");
        assert_eq!(outcome.status, relay_pipeline::SubmitStatus::Stored);

        let fetched = daemon.fetch("token-1").expect("fetch");
        assert_eq!(fetched.ciphertext_b64, ciphertext_b64);

        assert!(daemon.read("token-1"));
        assert!(daemon.fetch("token-1").is_none());
    }

    #[test]
    fn admin_routes_reject_wrong_credential() {
        let dir = tempfile::tempdir().expect("tempdir");
        let daemon = daemon(dir.path());
        let result = daemon.admin_ml_health("not-the-admin");
        assert!(matches!(result, Err(DaemonError::AdminCredentialRejected)));
    }

    #[test]
    fn admin_routes_accept_configured_credential() {
        let dir = tempfile::tempdir().expect("tempdir");
        let daemon = daemon(dir.path());
        let health = daemon.admin_ml_health("test-admin").expect("health");
        assert!(!health.trained);
    }

    #[test]
    fn export_keys_reports_classical_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let daemon = daemon(dir.path());
        let keys = daemon.export_keys();
        assert!(!keys.key_id.is_empty());
        assert!(!keys.kem_enabled);
    }
}
