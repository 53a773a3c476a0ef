//! Thin wrapper around the `ml-kem` crate's ML-KEM-768 implementation, so
//! the rest of this crate only deals in raw byte vectors.

use crate::error::KeyError;
use ml_kem::kem::{Decapsulate, Encapsulate};
use ml_kem::{Encoded, EncodedSizeUser, KemCore, MlKem768};
use rand_core::OsRng;

type DecapKey = <MlKem768 as KemCore>::DecapsulationKey;
type EncapKey = <MlKem768 as KemCore>::EncapsulationKey;

pub struct PqcKeyPair {
    decap: DecapKey,
    pub public_bytes: Vec<u8>,
}

impl PqcKeyPair {
    pub fn generate() -> Self {
        let (decap, encap) = MlKem768::generate(&mut OsRng);
        let public_bytes = encap.as_bytes().to_vec();
        Self {
            decap,
            public_bytes,
        }
    }

    /// Decapsulates `ciphertext` (produced by a peer's [`encapsulate`])
    /// using this bundle's private key, returning the 32-byte shared
    /// secret.
    pub fn decapsulate(&self, ciphertext: &[u8]) -> Result<Vec<u8>, KeyError> {
        let ct = Encoded::<<MlKem768 as KemCore>::CiphertextSize>::try_from(ciphertext)
            .map_err(|_| KeyError::InvalidKemPublicKey)?;
        let shared = self
            .decap
            .decapsulate(&ct)
            .map_err(|_| KeyError::KemEncapsulation)?;
        Ok(shared.to_vec())
    }
}

/// Encapsulates a fresh shared secret toward `client_public_bytes`,
/// returning `(ciphertext, shared_secret)`.
pub fn encapsulate(client_public_bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>), KeyError> {
    let encap_key_bytes = Encoded::<EncapKey>::try_from(client_public_bytes)
        .map_err(|_| KeyError::InvalidKemPublicKey)?;
    let encap_key = EncapKey::from_bytes(&encap_key_bytes);
    let (ciphertext, shared) = encap_key
        .encapsulate(&mut OsRng)
        .map_err(|_| KeyError::KemEncapsulation)?;
    Ok((ciphertext.to_vec(), shared.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_and_encapsulate_decapsulate_agree() {
        let server = PqcKeyPair::generate();
        let (ciphertext, shared_sender) =
            encapsulate(&server.public_bytes).expect("encapsulate");
        let shared_receiver = server.decapsulate(&ciphertext).expect("decapsulate");
        assert_eq!(shared_sender, shared_receiver);
    }
}
