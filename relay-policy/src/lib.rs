//! Risk-to-action decision engine: threshold mapping, exception quotas,
//! shadow mode, and canary-fraction enforcement gating, emitting exactly
//! one audit record per decision.

mod canary;
mod config;
mod error;
mod ledger;

pub use config::PolicyConfig;
pub use error::PolicyError;
pub use ledger::ExceptionLedger;

use relay_audit::{AuditLog, AuditRecord};
use relay_core::{now_epoch_secs, opaque_hash};
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Allow,
    RequireReauth,
    Block,
    PendingApproval,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::RequireReauth => "require_reauth",
            Action::Block => "block",
            Action::PendingApproval => "pending_approval",
        }
    }
}

/// Non-identifying context attached to a decision. Only the fields named
/// here ever reach the audit log's `metadata_summary`.
#[derive(Debug, Clone, Default)]
pub struct DecisionContext {
    pub exception_flag: bool,
    pub padded_size: Option<i64>,
    pub dest_count: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub action: Action,
    pub policy: Action,
    pub enforced: bool,
    pub reason: &'static str,
    pub token_hash: String,
}

pub struct PolicyEngine {
    allow_threshold: AtomicI64,
    reauth_threshold: AtomicI64,
    shadow_mode: bool,
    canary_fraction: f64,
    exception_quota: usize,
    exception_window_secs: u64,
    exceptions: ExceptionLedger,
}

impl PolicyEngine {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            allow_threshold: AtomicI64::new(config.allow_threshold),
            reauth_threshold: AtomicI64::new(config.reauth_threshold),
            shadow_mode: config.shadow_mode,
            canary_fraction: config.canary_fraction,
            exception_quota: config.exception_quota,
            exception_window_secs: config.exception_window_secs,
            exceptions: ExceptionLedger::new(),
        }
    }

    /// Maps `risk_score` (0..100, higher = safer) to an action, applies
    /// exception-quota and shadow/canary enforcement gating, and writes
    /// exactly one audit record via `audit`.
    pub fn decide(
        &self,
        risk_score: i64,
        token: &str,
        ctx: &DecisionContext,
        client_ip: Option<&str>,
        actor: Option<&str>,
        audit: &AuditLog,
    ) -> Result<Decision, PolicyError> {
        if !(0..=100).contains(&risk_score) {
            return Err(PolicyError::RiskOutOfRange(risk_score));
        }

        let token_hash = opaque_hash(token);
        let client_ip_hash = client_ip.map(opaque_hash);

        let allow_threshold = self.allow_threshold.load(Ordering::Relaxed);
        let reauth_threshold = self.reauth_threshold.load(Ordering::Relaxed);

        let (mut raw_action, mut reason) = if risk_score >= allow_threshold {
            (Action::Allow, "risk >= allow_threshold")
        } else if risk_score >= reauth_threshold {
            (Action::RequireReauth, "risk in reauth range")
        } else {
            (Action::Block, "risk < reauth_threshold (suspicious)")
        };

        if ctx.exception_flag {
            let quota_key = actor.unwrap_or(token);
            let now = now_epoch_secs();
            if self
                .exceptions
                .within_quota(quota_key, self.exception_quota, self.exception_window_secs, now)
            {
                if raw_action == Action::Block {
                    raw_action = Action::PendingApproval;
                    reason = "exception requested by user; queued for admin review";
                } else {
                    reason = "exception used; allowed but logged";
                }
            } else {
                raw_action = Action::Block;
                reason = "exception quota exceeded; blocked";
            }
        }

        let enforced = if self.shadow_mode {
            false
        } else {
            canary::canary_enforced(token, self.canary_fraction)
        };

        let policy = raw_action;
        let action = if enforced { raw_action } else { Action::Allow };

        let record = AuditRecord::new(now_epoch_secs())
            .with_token_hash(token_hash.clone())
            .with_action(action.as_str())
            .with_policy(policy.as_str())
            .with_risk(risk_score)
            .with_reason(reason)
            .with_metadata_summary(json!({
                "padded_size": ctx.padded_size,
                "dest_count": ctx.dest_count,
                "exception_flag": ctx.exception_flag,
            }));
        let record = match client_ip_hash {
            Some(h) => record.with_client_hash(h),
            None => record,
        };
        let record = match actor {
            Some(a) => record.with_actor_hash(opaque_hash(a)),
            None => record,
        };
        if let Err(err) = audit.append(&record) {
            tracing::error!(error = %err, token_hash = %token_hash, "audit write failed; decision not blocked");
        }

        Ok(Decision {
            action,
            policy,
            enforced,
            reason,
            token_hash,
        })
    }

    pub fn set_thresholds(&self, allow: Option<i64>, reauth: Option<i64>) {
        if let Some(allow) = allow {
            self.allow_threshold.store(allow, Ordering::Relaxed);
        }
        if let Some(reauth) = reauth {
            self.reauth_threshold.store(reauth, Ordering::Relaxed);
        }
        tracing::info!(
            allow = self.allow_threshold.load(Ordering::Relaxed),
            reauth = self.reauth_threshold.load(Ordering::Relaxed),
            "policy thresholds updated"
        );
    }

    pub fn status(&self) -> PolicyStatus {
        PolicyStatus {
            allow_threshold: self.allow_threshold.load(Ordering::Relaxed),
            reauth_threshold: self.reauth_threshold.load(Ordering::Relaxed),
            shadow_mode: self.shadow_mode,
            canary_fraction: self.canary_fraction,
            exception_quota: self.exception_quota,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicyStatus {
    pub allow_threshold: i64,
    pub reauth_threshold: i64,
    pub shadow_mode: bool,
    pub canary_fraction: f64,
    pub exception_quota: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn audit_log() -> (tempfile::TempDir, AuditLog) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("policy.log");
        let log = AuditLog::open(relay_audit::AuditConfig::new(&path)).expect("open");
        (dir, log)
    }

    #[test]
    fn high_risk_allows() {
        let (_dir, log) = audit_log();
        let engine = PolicyEngine::new(PolicyConfig::default());
        let decision = engine
            .decide(90, "token-1", &DecisionContext::default(), None, None, &log)
            .expect("decide");
        assert_eq!(decision.action, Action::Allow);
        assert!(decision.enforced);
    }

    #[test]
    fn mid_risk_requires_reauth() {
        let (_dir, log) = audit_log();
        let engine = PolicyEngine::new(PolicyConfig::default());
        let decision = engine
            .decide(50, "token-1", &DecisionContext::default(), None, None, &log)
            .expect("decide");
        assert_eq!(decision.action, Action::RequireReauth);
    }

    #[test]
    fn low_risk_blocks() {
        let (_dir, log) = audit_log();
        let engine = PolicyEngine::new(PolicyConfig::default());
        let decision = engine
            .decide(10, "token-1", &DecisionContext::default(), None, None, &log)
            .expect("decide");
        assert_eq!(decision.action, Action::Block);
    }

    #[test]
    fn exception_on_block_becomes_pending_approval() {
        let (_dir, log) = audit_log();
        let engine = PolicyEngine::new(PolicyConfig::default());
        let ctx = DecisionContext {
            exception_flag: true,
            ..Default::default()
        };
        let decision = engine
            .decide(10, "token-1", &ctx, None, Some("actor-1"), &log)
            .expect("decide");
        assert_eq!(decision.action, Action::PendingApproval);
    }

    #[test]
    fn exhausted_exception_quota_blocks() {
        let (_dir, log) = audit_log();
        let mut config = PolicyConfig::default();
        config.exception_quota = 1;
        let engine = PolicyEngine::new(config);
        let ctx = DecisionContext {
            exception_flag: true,
            ..Default::default()
        };
        engine
            .decide(10, "token-1", &ctx, None, Some("actor-1"), &log)
            .expect("decide");
        let second = engine
            .decide(10, "token-1", &ctx, None, Some("actor-1"), &log)
            .expect("decide");
        assert_eq!(second.action, Action::Block);
        assert_eq!(second.reason, "exception quota exceeded; blocked");
    }

    #[test]
    fn shadow_mode_never_enforces() {
        let (_dir, log) = audit_log();
        let mut config = PolicyConfig::default();
        config.shadow_mode = true;
        let engine = PolicyEngine::new(config);
        let decision = engine
            .decide(5, "token-1", &DecisionContext::default(), None, None, &log)
            .expect("decide");
        assert_eq!(decision.action, Action::Allow);
        assert!(!decision.enforced);
        assert_eq!(decision.policy, Action::Block);
    }

    #[test]
    fn zero_canary_fraction_never_enforces() {
        let (_dir, log) = audit_log();
        let mut config = PolicyConfig::default();
        config.canary_fraction = 0.0;
        let engine = PolicyEngine::new(config);
        let decision = engine
            .decide(5, "token-1", &DecisionContext::default(), None, None, &log)
            .expect("decide");
        assert!(!decision.enforced);
        assert_eq!(decision.action, Action::Allow);
    }

    #[test]
    fn set_thresholds_changes_subsequent_decisions() {
        let (_dir, log) = audit_log();
        let engine = PolicyEngine::new(PolicyConfig::default());
        engine.set_thresholds(Some(10), Some(5));
        let decision = engine
            .decide(20, "token-1", &DecisionContext::default(), None, None, &log)
            .expect("decide");
        assert_eq!(decision.action, Action::Allow);
        assert_eq!(engine.status().allow_threshold, 10);
    }

    #[test]
    fn rejects_out_of_range_risk() {
        let (_dir, log) = audit_log();
        let engine = PolicyEngine::new(PolicyConfig::default());
        assert!(engine
            .decide(150, "token-1", &DecisionContext::default(), None, None, &log)
            .is_err());
    }
}
