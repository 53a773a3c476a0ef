//! AES-256-GCM sealing helper used by the hybrid submission path. Nonces
//! are always freshly random and 12 bytes; the caller supplies associated
//! data binding the ciphertext to its submission context.

use crate::error::KeyError;
use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand_core::{OsRng, RngCore};

pub const NONCE_LEN: usize = 12;

/// Seals `plaintext` under `key` (32 bytes), returning `nonce || ciphertext`.
pub fn seal(key: &[u8; 32], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, KeyError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KeyError::Seal)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| KeyError::Seal)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Opens a buffer produced by [`seal`]: `nonce || ciphertext`.
pub fn open(key: &[u8; 32], aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, KeyError> {
    if sealed.len() < NONCE_LEN {
        return Err(KeyError::Open);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KeyError::Open)?;
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| KeyError::Open)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_roundtrips() {
        let key = [7u8; 32];
        let aad = b"token|key_id|1024|1";
        let sealed = seal(&key, aad, b"hello world").expect("seal");
        let opened = open(&key, aad, &sealed).expect("open");
        assert_eq!(opened, b"hello world");
    }

    #[test]
    fn wrong_aad_fails_to_open() {
        let key = [7u8; 32];
        let sealed = seal(&key, b"aad-a", b"hello").expect("seal");
        assert!(open(&key, b"aad-b", &sealed).is_err());
    }

    #[test]
    fn nonces_are_not_reused() {
        let key = [1u8; 32];
        let a = seal(&key, b"aad", b"same plaintext").expect("seal");
        let b = seal(&key, b"aad", b"same plaintext").expect("seal");
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }
}
