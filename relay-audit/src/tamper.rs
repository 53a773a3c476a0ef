use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

const TAMPER_KEY_INFO: &[u8] = b"relay-audit-tamper-key-v1";

/// Per-process tamper key, derived once from process id, wall-clock start
/// time, this sink's instance id, and a random seed via HKDF-SHA-256.
/// Two [`crate::AuditLog`] instances constructed in the same process never
/// share a key, even if constructed within the same wall-clock second.
pub fn derive_tamper_key(process_id: u32, start_time_secs: u64, instance_id: &str) -> [u8; 32] {
    let mut seed = [0u8; 16];
    rand::rng().fill_bytes(&mut seed);

    let mut ikm = Vec::with_capacity(4 + 8 + instance_id.len() + seed.len());
    ikm.extend_from_slice(&process_id.to_be_bytes());
    ikm.extend_from_slice(&start_time_secs.to_be_bytes());
    ikm.extend_from_slice(instance_id.as_bytes());
    ikm.extend_from_slice(&seed);

    let hk = Hkdf::<Sha256>::new(None, &ikm);
    let mut okm = [0u8; 32];
    // Fixed output length and fixed info string can only fail if the
    // requested length exceeds HKDF's maximum, which 32 bytes never does.
    #[allow(clippy::unwrap_used)]
    hk.expand(TAMPER_KEY_INFO, &mut okm).unwrap();
    okm
}

/// First 16 hex characters of HMAC-SHA-256(key, line).
pub fn checksum_hex16(key: &[u8; 32], line: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    // A fixed-size key always satisfies HMAC's key-length requirements.
    #[allow(clippy::unwrap_used)]
    let mut mac = HmacSha256::new_from_slice(key).unwrap();
    mac.update(line.as_bytes());
    let tag = mac.finalize().into_bytes();
    let mut hex = String::with_capacity(16);
    for b in tag.iter().take(8) {
        hex.push_str(&format!("{b:02x}"));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_differ_across_instances() {
        let a = derive_tamper_key(123, 1_700_000_000, "inst-a");
        let b = derive_tamper_key(123, 1_700_000_000, "inst-b");
        assert_ne!(a, b);
    }

    #[test]
    fn checksum_is_deterministic_for_fixed_key() {
        let key = [7u8; 32];
        let a = checksum_hex16(&key, "line-1");
        let b = checksum_hex16(&key, "line-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }
}
