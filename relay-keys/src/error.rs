use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("client classical public key must be 32 bytes, got {0}")]
    InvalidClassicalPublicKey(usize),
    #[error("client KEM public key could not be decoded")]
    InvalidKemPublicKey,
    #[error("KEM encapsulation failed")]
    KemEncapsulation,
    #[error("AEAD seal failed")]
    Seal,
    #[error("AEAD open failed")]
    Open,
    #[error("requested key length {0} exceeds HKDF maximum output")]
    DerivationLengthInvalid(usize),
}
