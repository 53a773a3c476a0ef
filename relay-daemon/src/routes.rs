//! Response shapes for the method-per-route facade. Field names mirror
//! the wire bodies a thin HTTP layer would serialize directly; no HTTP
//! type appears anywhere in this crate.

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub ciphertext_b64: String,
    pub ttl_remaining: u64,
}

#[derive(Debug, Clone)]
pub struct HybridInitResponse {
    pub key_id: String,
    pub classical_pub_b64: String,
    pub kem_ct_b64: Option<String>,
    pub kem_enabled: bool,
    pub kem_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KeysResponse {
    pub key_id: String,
    pub classical_pub_b64: String,
    pub kem_pub_b64: Option<String>,
    pub kem_enabled: bool,
    pub kem_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MlScoreResponse {
    pub risk: i64,
    pub simulated: bool,
    pub ts: u64,
}

#[derive(Debug, Clone)]
pub struct AuditReadResponse {
    pub records: Vec<Value>,
}
