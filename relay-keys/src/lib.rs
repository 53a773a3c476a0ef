//! Hybrid classical + post-quantum key manager.
//!
//! Holds one X25519 keypair and, when enabled, one ML-KEM-768 keypair.
//! Readers take a short critical section to clone an `Arc<KeyBundle>`
//! snapshot and then operate on it lock-free, so no caller ever observes
//! a half-rotated bundle and rotation never blocks a concurrent reader.

mod aead;
mod bundle;
mod config;
mod error;
mod pqc;

pub use aead::{open, seal};
pub use bundle::KeyBundle;
pub use config::KeyManagerConfig;
pub use error::KeyError;

use hkdf::Hkdf;
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use x25519_dalek::PublicKey;

const DEFAULT_DERIVE_INFO: &[u8] = b"relay-keys-symmetric-key-v1";

#[derive(Debug, Clone)]
pub struct PublicKeysSnapshot {
    pub key_id: String,
    pub classical_pub: [u8; 32],
    pub kem_pub: Option<Vec<u8>>,
    pub kem_enabled: bool,
    pub kem_name: Option<String>,
}

pub struct KeyManager {
    config: KeyManagerConfig,
    bundle: Mutex<Arc<KeyBundle>>,
}

impl KeyManager {
    pub fn new(config: KeyManagerConfig) -> Arc<Self> {
        let bundle = KeyBundle::generate(config.pqc_enabled);
        Arc::new(Self {
            config,
            bundle: Mutex::new(Arc::new(bundle)),
        })
    }

    fn current(&self) -> Arc<KeyBundle> {
        // A panic while holding this lock would indicate a bug in this
        // module, not a recoverable runtime condition.
        #[allow(clippy::unwrap_used)]
        Arc::clone(&self.bundle.lock().unwrap())
    }

    pub fn export_public_keys(&self) -> PublicKeysSnapshot {
        let bundle = self.current();
        PublicKeysSnapshot {
            key_id: bundle.key_id.clone(),
            classical_pub: bundle.classical_public.to_bytes(),
            kem_pub: bundle.kem.as_ref().map(|k| k.public_bytes.clone()),
            kem_enabled: bundle.kem.is_some(),
            kem_name: bundle.kem.as_ref().map(|_| "ML-KEM-768".to_string()),
        }
    }

    /// Computes the classical ECDH shared secret against the server's
    /// current private key, and — if PQC is enabled for the current
    /// bundle and the client supplied a KEM public key — encapsulates a
    /// PQC shared secret toward it. Returns `(combined, kem_ciphertext)`
    /// where `combined = classical_shared || kem_shared` (or just
    /// `classical_shared` when no PQC component is present).
    pub fn derive_shared_secret_server_side(
        &self,
        client_classical_pub: &[u8],
        client_kem_pub: Option<&[u8]>,
    ) -> Result<(Vec<u8>, Option<Vec<u8>>), KeyError> {
        if client_classical_pub.len() != 32 {
            return Err(KeyError::InvalidClassicalPublicKey(
                client_classical_pub.len(),
            ));
        }
        let mut raw = [0u8; 32];
        raw.copy_from_slice(client_classical_pub);
        let client_pub = PublicKey::from(raw);

        let bundle = self.current();
        let classical_shared = bundle.classical_secret.diffie_hellman(&client_pub);

        let mut combined = classical_shared.as_bytes().to_vec();
        let kem_ct = match (&bundle.kem, client_kem_pub) {
            (Some(_), Some(client_kem_pub)) => {
                let (ciphertext, shared) = pqc::encapsulate(client_kem_pub)?;
                combined.extend_from_slice(&shared);
                Some(ciphertext)
            }
            _ => None,
        };

        Ok((combined, kem_ct))
    }

    /// HKDF-SHA-256 extract-and-expand over `combined`, with an absent
    /// (zero) salt and a fixed domain-separation info string unless the
    /// caller overrides it.
    pub fn derive_symmetric_key(
        &self,
        combined: &[u8],
        info: Option<&[u8]>,
        length: usize,
    ) -> Result<Vec<u8>, KeyError> {
        let hk = Hkdf::<Sha256>::new(None, combined);
        let mut okm = vec![0u8; length];
        hk.expand(info.unwrap_or(DEFAULT_DERIVE_INFO), &mut okm)
            .map_err(|_| KeyError::DerivationLengthInvalid(length))?;
        Ok(okm)
    }

    /// Fresh random 32-byte key for the non-hybrid session path. The
    /// manager does not retain it; `token` and `ttl` are accepted only to
    /// match the call shape used by the non-hybrid submission path and
    /// play no role in key material.
    pub fn generate_session(&self, _token: &str, _ttl: u64) -> [u8; 32] {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Atomically replaces the classical keypair and, if enabled,
    /// regenerates the PQC keypair. The new bundle is built before the
    /// lock is taken so rotation never blocks a concurrent reader for
    /// longer than a pointer swap.
    pub fn rotate(&self) {
        let fresh = KeyBundle::generate(self.config.pqc_enabled);
        let key_id = fresh.key_id.clone();
        // A panic while holding this lock would indicate a bug in this
        // module, not a recoverable runtime condition.
        #[allow(clippy::unwrap_used)]
        {
            *self.bundle.lock().unwrap() = Arc::new(fresh);
        }
        tracing::info!(key_id, "key bundle rotated");
    }

    pub fn spawn_rotator(
        self: &Arc<Self>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = std::time::Duration::from_secs(manager.config.rotate_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        manager.rotate();
                    }
                    _ = shutdown.cancelled() => {
                        tracing::info!("key rotation task shut down cleanly");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hybrid_exchange_matches_between_both_sides() {
        let server = KeyManager::new(KeyManagerConfig {
            rotate_interval_secs: 3600,
            pqc_enabled: true,
        });
        let snapshot = server.export_public_keys();

        let client_secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
        let client_public = PublicKey::from(&client_secret);
        let client_kem = pqc::PqcKeyPair::generate();

        let (combined, kem_ct) = server
            .derive_shared_secret_server_side(client_public.as_bytes(), Some(&client_kem.public_bytes))
            .expect("derive");
        assert!(kem_ct.is_some());

        let classical_shared_client = client_secret
            .diffie_hellman(&PublicKey::from(snapshot.classical_pub))
            .as_bytes()
            .to_vec();
        let kem_shared_client = client_kem
            .decapsulate(kem_ct.as_ref().expect("kem ct"))
            .expect("decapsulate");

        let mut expected = classical_shared_client;
        expected.extend_from_slice(&kem_shared_client);
        assert_eq!(combined, expected);
    }

    #[test]
    fn classical_only_when_pqc_disabled() {
        let server = KeyManager::new(KeyManagerConfig {
            rotate_interval_secs: 3600,
            pqc_enabled: false,
        });
        let client_secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
        let client_public = PublicKey::from(&client_secret);
        let (combined, kem_ct) = server
            .derive_shared_secret_server_side(client_public.as_bytes(), None)
            .expect("derive");
        assert!(kem_ct.is_none());
        assert_eq!(combined.len(), 32);
    }

    #[test]
    fn derive_symmetric_key_is_deterministic() {
        let server = KeyManager::new(KeyManagerConfig::default());
        let combined = vec![1u8; 32];
        let a = server.derive_symmetric_key(&combined, None, 32).expect("derive");
        let b = server.derive_symmetric_key(&combined, None, 32).expect("derive");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn rotation_changes_key_id_and_public_key() {
        let server = KeyManager::new(KeyManagerConfig::default());
        let before = server.export_public_keys();
        std::thread::sleep(std::time::Duration::from_secs(1));
        server.rotate();
        let after = server.export_public_keys();
        assert_ne!(before.key_id, after.key_id);
        assert_ne!(before.classical_pub, after.classical_pub);
    }
}
