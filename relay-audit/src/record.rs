use serde_json::{Map, Value};

/// An audit record. Only the fields named here are ever persisted: any
/// other information a caller might be tempted to attach is simply not
/// representable, which is the Rust equivalent of the field whitelist the
/// original source applies to a dynamically-typed event dict.
#[derive(Debug, Clone, Default)]
pub struct AuditRecord {
    pub ts: u64,
    pub opaque_token_hash: Option<String>,
    pub action: Option<String>,
    pub policy: Option<String>,
    pub risk: Option<i64>,
    pub reason: Option<String>,
    pub opaque_client_hash: Option<String>,
    pub metadata_summary: Option<Value>,
    pub admin_action: Option<String>,
    pub note: Option<String>,
    pub actor_hash: Option<String>,
}

impl AuditRecord {
    pub fn new(ts: u64) -> Self {
        Self {
            ts,
            ..Default::default()
        }
    }

    pub fn with_token_hash(mut self, v: impl Into<String>) -> Self {
        self.opaque_token_hash = Some(v.into());
        self
    }

    pub fn with_action(mut self, v: impl Into<String>) -> Self {
        self.action = Some(v.into());
        self
    }

    pub fn with_policy(mut self, v: impl Into<String>) -> Self {
        self.policy = Some(v.into());
        self
    }

    pub fn with_risk(mut self, v: i64) -> Self {
        self.risk = Some(v);
        self
    }

    pub fn with_reason(mut self, v: impl Into<String>) -> Self {
        self.reason = Some(v.into());
        self
    }

    pub fn with_client_hash(mut self, v: impl Into<String>) -> Self {
        self.opaque_client_hash = Some(v.into());
        self
    }

    pub fn with_metadata_summary(mut self, v: Value) -> Self {
        self.metadata_summary = Some(v);
        self
    }

    pub fn with_admin_action(mut self, v: impl Into<String>) -> Self {
        self.admin_action = Some(v.into());
        self
    }

    pub fn with_note(mut self, v: impl Into<String>) -> Self {
        self.note = Some(v.into());
        self
    }

    pub fn with_actor_hash(mut self, v: impl Into<String>) -> Self {
        self.actor_hash = Some(v.into());
        self
    }

    /// Canonical JSON form. `serde_json::Map` is backed by a `BTreeMap`
    /// (the default, non-`preserve_order` build), so keys serialize in
    /// sorted order with no extra work here.
    pub fn to_canonical_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("ts".to_string(), Value::from(self.ts));
        insert_opt(&mut map, "opaque_token_hash", &self.opaque_token_hash);
        insert_opt(&mut map, "action", &self.action);
        insert_opt(&mut map, "policy", &self.policy);
        if let Some(risk) = self.risk {
            map.insert("risk".to_string(), Value::from(risk));
        }
        insert_opt(&mut map, "reason", &self.reason);
        insert_opt(&mut map, "opaque_client_hash", &self.opaque_client_hash);
        if let Some(summary) = &self.metadata_summary {
            map.insert("metadata_summary".to_string(), summary.clone());
        }
        insert_opt(&mut map, "admin_action", &self.admin_action);
        insert_opt(&mut map, "note", &self.note);
        insert_opt(&mut map, "actor_hash", &self.actor_hash);
        Value::Object(map)
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        map.insert(key.to_string(), Value::from(v.clone()));
    }
}
