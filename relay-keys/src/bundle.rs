use crate::pqc::PqcKeyPair;
use rand_core::OsRng;
use relay_core::now_epoch_secs;
use x25519_dalek::{PublicKey, StaticSecret};

pub struct KeyBundle {
    pub key_id: String,
    pub classical_secret: StaticSecret,
    pub classical_public: PublicKey,
    pub kem: Option<PqcKeyPair>,
    pub created_at: u64,
}

impl KeyBundle {
    /// Generates a fresh bundle. A PQC generation failure is not
    /// representable by the `ml-kem` crate's infallible keygen today, but
    /// `pqc_enabled=false` still disables it for callers that want a
    /// classical-only bundle, matching the fail-closed-to-classical
    /// policy the specification requires for a PQC init failure.
    pub fn generate(pqc_enabled: bool) -> Self {
        let classical_secret = StaticSecret::random_from_rng(OsRng);
        let classical_public = PublicKey::from(&classical_secret);
        let created_at = now_epoch_secs();
        let kem = if pqc_enabled {
            Some(PqcKeyPair::generate())
        } else {
            None
        };
        Self {
            key_id: format!("server_{created_at}"),
            classical_secret,
            classical_public,
            kem,
            created_at,
        }
    }
}
