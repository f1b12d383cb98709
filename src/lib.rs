//! Easy Ed25519 - Key pairs with PEM serialization
//!
//! This crate wraps Ed25519 key generation, signing and verification, and
//! reads and writes keys as PEM text (PKIX `PUBLIC KEY` and PKCS#8
//! `PRIVATE KEY` blocks). PEM text is built in byte buffers borrowed from a
//! shared pool that the caller injects.
//!
//! ```
//! use easy_ed25519::{BytesPool, KeyPair};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(BytesPool::default());
//! let keypair = KeyPair::generate(Some(pool.clone())).unwrap();
//!
//! let signature = keypair.sign(b"hello");
//! assert!(keypair.verify(b"hello", &signature).unwrap());
//!
//! let (public_pem, private_pem) = keypair.to_pem_strings().unwrap();
//! let restored = KeyPair::from_pem(&public_pem, &private_pem, pool).unwrap();
//! assert_eq!(restored.public_key_bytes(), keypair.public_key_bytes());
//! ```

pub mod buffer;
pub mod keys;

pub use buffer::{
    Buffer, BufferError, BufferPool, BytesPool, ConfigError, PoolConfig, PoolStats, PooledBuffer,
    SharedPool,
};
pub use keys::{parse_public_key_pem, verify_with_public_key, KeyAlgorithm, KeyError, KeyPair};

use thiserror::Error;

/// Main error type for easy_ed25519 operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Build a shared pool from a JSON config file
pub fn pool_from_config_file(path: impl AsRef<std::path::Path>) -> Result<SharedPool> {
    let config = PoolConfig::load(path)?;
    Ok(std::sync::Arc::new(BytesPool::new(config)))
}
