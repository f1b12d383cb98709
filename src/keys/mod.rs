//! Keys Module - Ed25519 key pairs with PEM serialization
//!
//! Public keys travel as PKIX `SubjectPublicKeyInfo` documents framed as
//! `PUBLIC KEY` PEM blocks, private keys as PKCS#8 `PrivateKeyInfo` documents
//! framed as `PRIVATE KEY` blocks. All PEM text passes through a pooled buffer.

mod keypair;
mod pem;

pub use keypair::{verify_with_public_key, KeyPair};
pub use pem::{parse_public_key_pem, KeyAlgorithm, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL};

use crate::buffer::BufferError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid PEM encoding: {0}")]
    InvalidPemEncoding(String),

    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Buffer write failed: {0}")]
    BufferWrite(#[from] BufferError),

    #[error("Key encoding failed: {0}")]
    KeyEncoding(String),

    #[error("Buffer pool is missing")]
    MissingBufferPool,
}
