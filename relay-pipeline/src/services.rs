use crate::error::PipelineError;
use crate::outcome::{Action, HybridSubmitOutcome, SubmitOutcome, SubmitStatus};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use relay_audit::AuditLog;
use relay_keys::KeyManager;
use relay_policy::{DecisionContext, PolicyEngine};
use relay_sanitize::{LeakDetector, Metadata, MetadataValue, SanitizerConfig};
use relay_score::Scorer;
use relay_store::EphemeralStore;
use std::sync::Arc;

/// Wires the decision-and-lifecycle components together: the ephemeral
/// store, the hybrid key manager, the metadata sanitizer/leak detector,
/// the anomaly scorer, and the policy engine, all sharing one audit sink.
/// Both submission entry points funnel into one private routine so every
/// path gets exactly the same decision treatment and exactly one audit
/// record.
pub struct RelayServices {
    store: Arc<EphemeralStore>,
    keys: Arc<KeyManager>,
    sanitizer_config: SanitizerConfig,
    leak_detector: LeakDetector,
    scorer: Arc<dyn Scorer>,
    policy: PolicyEngine,
    audit: AuditLog,
}

impl RelayServices {
    pub fn new(
        store: Arc<EphemeralStore>,
        keys: Arc<KeyManager>,
        sanitizer_config: SanitizerConfig,
        scorer: Arc<dyn Scorer>,
        policy: PolicyEngine,
        audit: AuditLog,
    ) -> Self {
        let leak_detector = LeakDetector::new(&sanitizer_config);
        Self {
            store,
            keys,
            sanitizer_config,
            leak_detector,
            scorer,
            policy,
            audit,
        }
    }

    pub fn store(&self) -> &Arc<EphemeralStore> {
        &self.store
    }

    pub fn keys(&self) -> &Arc<KeyManager> {
        &self.keys
    }

    pub fn scorer(&self) -> &Arc<dyn Scorer> {
        &self.scorer
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Plaintext submission path: `ciphertext_b64` is opaque to this
    /// service (already encrypted client-side) and is stored verbatim
    /// once the decision allows it.
    pub fn submit_plaintext(
        &self,
        token: &str,
        ciphertext_b64: &str,
        ttl_seconds: i64,
        metadata: Metadata,
        client_ip: Option<&str>,
    ) -> Result<SubmitOutcome, PipelineError> {
        let ciphertext = BASE64
            .decode(ciphertext_b64)
            .map_err(PipelineError::InvalidCiphertextBase64)?;
        if ttl_seconds <= 0 {
            return Err(PipelineError::NonPositiveTtl(ttl_seconds));
        }
        let fallback_padded_size = ciphertext.len() as i64;
        self.decide_and_store(token, ciphertext, fallback_padded_size, ttl_seconds, metadata, client_ip)
    }

    /// Hybrid submission path: derives the shared secret from the
    /// client's classical (and optional PQC) public keys, encrypts the
    /// plaintext under the resulting symmetric key, then runs the same
    /// decision routine as the plaintext path on the sealed bytes.
    pub fn submit_hybrid(
        &self,
        token: &str,
        message_b64: &str,
        ttl_seconds: i64,
        client_classical_pub: &[u8],
        client_kem_pub: Option<&[u8]>,
        metadata: Metadata,
        client_ip: Option<&str>,
    ) -> Result<HybridSubmitOutcome, PipelineError> {
        let plaintext = BASE64.decode(message_b64).map_err(PipelineError::InvalidMessageBase64)?;
        if ttl_seconds <= 0 {
            return Err(PipelineError::NonPositiveTtl(ttl_seconds));
        }

        let (combined, _kem_ct) = self
            .keys
            .derive_shared_secret_server_side(client_classical_pub, client_kem_pub)?;
        let symmetric_key_vec = self.keys.derive_symmetric_key(&combined, None, 32)?;
        let mut symmetric_key = [0u8; 32];
        symmetric_key.copy_from_slice(&symmetric_key_vec);

        let key_id = self.keys.export_public_keys().key_id;
        let padded_size = metadata
            .get("padded_size")
            .and_then(MetadataValue::as_i64)
            .unwrap_or(plaintext.len() as i64);
        let dest_count = metadata.get("dest_count").and_then(MetadataValue::as_i64).unwrap_or(1);
        let aad = format!("{token}|{key_id}|{padded_size}|{dest_count}");

        let sealed = relay_keys::seal(&symmetric_key, aad.as_bytes(), &plaintext)?;
        let encrypted_message_b64 = BASE64.encode(&sealed);

        let fallback_padded_size = plaintext.len() as i64;
        let outcome = self.decide_and_store(token, sealed, fallback_padded_size, ttl_seconds, metadata, client_ip)?;

        let encrypted_message_b64 = match outcome.status {
            SubmitStatus::Stored => Some(encrypted_message_b64),
            _ => None,
        };

        Ok(HybridSubmitOutcome {
            outcome,
            key_id,
            encrypted_message_b64,
        })
    }

    /// Decode/validate has already happened by the time this runs: leak
    /// detection, sanitization, feature-vector scoring, risk adjustment,
    /// the policy decision, and (on allow) the store write, with exactly
    /// one audit record emitted by the policy engine along the way.
    fn decide_and_store(
        &self,
        token: &str,
        to_store: Vec<u8>,
        fallback_padded_size: i64,
        ttl_seconds: i64,
        metadata: Metadata,
        client_ip: Option<&str>,
    ) -> Result<SubmitOutcome, PipelineError> {
        let leak_report = if self.sanitizer_config.leak_detection_enabled {
            self.leak_detector.detect_metadata_leaks(&metadata)
        } else {
            relay_sanitize::LeakReport {
                leak_detected: false,
                risk_score: 0.0,
                confidence: 1.0,
                leak_types: Vec::new(),
                recommendations: Vec::new(),
                status: "clean",
            }
        };

        let (sanitized, sanitize_report) = relay_sanitize::sanitize(&metadata, &self.sanitizer_config);

        let vector = build_vector(&sanitized, fallback_padded_size);
        let base_risk = self.scorer.score(&vector)?;
        let risk = if leak_report.leak_detected {
            (base_risk + (leak_report.risk_score * 30.0) as i64).min(100)
        } else {
            base_risk
        };

        let ctx = DecisionContext {
            exception_flag: matches!(sanitized.get("exception_flag"), Some(MetadataValue::Bool(true))),
            padded_size: sanitized
                .get("padded_size")
                .and_then(MetadataValue::as_i64)
                .or(Some(fallback_padded_size)),
            dest_count: sanitized.get("dest_count").and_then(MetadataValue::as_i64).or(Some(1)),
        };

        let decision = self
            .policy
            .decide(risk, token, &ctx, client_ip, None, &self.audit)?;

        if !decision.enforced {
            self.store.put(token, to_store, ttl_seconds)?;
            return Ok(SubmitOutcome {
                status: SubmitStatus::Stored,
                risk,
                policy: decision.policy.into(),
                message: format!("Shadow-mode: {}", decision.reason),
            });
        }

        let outcome = match decision.action {
            relay_policy::Action::Block => SubmitOutcome {
                status: SubmitStatus::Blocked,
                risk,
                policy: Action::Block,
                message: "Blocked due to high risk".to_string(),
            },
            relay_policy::Action::RequireReauth => SubmitOutcome {
                status: SubmitStatus::RequireReauth,
                risk,
                policy: Action::RequireReauth,
                message: "Reauthentication required".to_string(),
            },
            relay_policy::Action::PendingApproval => SubmitOutcome {
                status: SubmitStatus::PendingApproval,
                risk,
                policy: Action::PendingApproval,
                message: "Pending admin approval".to_string(),
            },
            relay_policy::Action::Allow => {
                self.store.put(token, to_store, ttl_seconds)?;
                let mut message = format!("Stored; will expire in {ttl_seconds}s");
                if leak_report.leak_detected {
                    let types = leak_report
                        .leak_types
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    message.push_str(&format!(" (metadata leaks detected and sanitized: {types})"));
                } else if sanitize_report.sanitization_applied {
                    message.push_str(" (metadata sanitized for security)");
                }
                SubmitOutcome {
                    status: SubmitStatus::Stored,
                    risk,
                    policy: Action::Allow,
                    message,
                }
            }
        };
        Ok(outcome)
    }
}

/// Builds the anomaly-scorer feature vector from sanitized metadata,
/// falling back to `fallback_padded_size` when the caller never supplied
/// `padded_size`. Exposed so callers that score or record observations
/// outside the submission paths (e.g. an `ml/observe` admin route) build
/// the exact same vector shape the pipeline itself scores against.
pub fn build_vector(metadata: &Metadata, fallback_padded_size: i64) -> [f64; 4] {
    let padded_size = metadata
        .get("padded_size")
        .and_then(MetadataValue::as_f64)
        .unwrap_or(fallback_padded_size as f64);
    let interval = metadata.get("interval").and_then(MetadataValue::as_f64).unwrap_or(0.0);
    let dest_count = metadata.get("dest_count").and_then(MetadataValue::as_f64).unwrap_or(1.0);
    let device_change_flag = if matches!(metadata.get("new_device"), Some(MetadataValue::Bool(true))) {
        1.0
    } else {
        0.0
    };
    [padded_size, interval, dest_count, device_change_flag]
}
