//! Ed25519 key pair bound to a shared buffer pool

use super::pem::{
    decode_private_key_der, decode_public_key_der, encode_private_key_pem, encode_public_key_pem,
    read_pem_block, PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL,
};
use super::KeyError;
use crate::buffer::{PooledBuffer, SharedPool};
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

/// Ed25519 key pair
///
/// The public key is kept as raw bytes, exactly as it was generated or
/// parsed; it is not re-derived from the private key.
pub struct KeyPair {
    public_key: Vec<u8>,
    signing_key: SigningKey,
    buffer_pool: Option<SharedPool>,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS random source
    pub fn generate(buffer_pool: Option<SharedPool>) -> Result<Self, KeyError> {
        let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
        OsRng
            .try_fill_bytes(&mut *seed)
            .map_err(|e| KeyError::KeyGeneration(e.to_string()))?;

        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = signing_key.verifying_key().to_bytes().to_vec();

        tracing::debug!(pooled = buffer_pool.is_some(), "Generated Ed25519 key pair");

        Ok(Self {
            public_key,
            signing_key,
            buffer_pool,
        })
    }

    /// Parse a key pair from a `PUBLIC KEY` and a `PRIVATE KEY` PEM block
    ///
    /// Each text is copied into a pooled buffer for decoding; both buffers
    /// are back in the pool when this returns, on success or failure.
    pub fn from_pem(
        public_pem: &str,
        private_pem: &str,
        buffer_pool: SharedPool,
    ) -> Result<Self, KeyError> {
        let public_der = read_pem_block(&*buffer_pool, public_pem, PUBLIC_KEY_LABEL)?;
        let public_key = decode_public_key_der(&public_der)?.into_ed25519()?;

        let private_der = read_pem_block(&*buffer_pool, private_pem, PRIVATE_KEY_LABEL)?;
        let signing_key = decode_private_key_der(&private_der)?.into_ed25519()?;

        if public_key.len() != PUBLIC_KEY_LENGTH {
            return Err(KeyError::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: public_key.len(),
            });
        }

        tracing::debug!("Parsed Ed25519 key pair from PEM");

        Ok(Self {
            public_key,
            signing_key,
            buffer_pool: Some(buffer_pool),
        })
    }

    /// Build a key pair from raw bytes
    ///
    /// `private_key` is either the 64-byte seed-plus-public form, whose public
    /// half must match the seed, or a bare 32-byte seed.
    pub fn from_bytes(
        public_key: &[u8],
        private_key: &[u8],
        buffer_pool: Option<SharedPool>,
    ) -> Result<Self, KeyError> {
        if public_key.len() != PUBLIC_KEY_LENGTH {
            return Err(KeyError::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: public_key.len(),
            });
        }

        let signing_key = match private_key.len() {
            KEYPAIR_LENGTH => {
                let mut bytes = Zeroizing::new([0u8; KEYPAIR_LENGTH]);
                bytes.copy_from_slice(private_key);
                SigningKey::from_keypair_bytes(&bytes)
                    .map_err(|e| KeyError::InvalidKeyEncoding(e.to_string()))?
            }
            SECRET_KEY_LENGTH => {
                let mut seed = Zeroizing::new([0u8; SECRET_KEY_LENGTH]);
                seed.copy_from_slice(private_key);
                SigningKey::from_bytes(&seed)
            }
            actual => {
                return Err(KeyError::InvalidKeyLength {
                    expected: KEYPAIR_LENGTH,
                    actual,
                })
            }
        };

        Ok(Self {
            public_key: public_key.to_vec(),
            signing_key,
            buffer_pool,
        })
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Verify a signature against this pair's public key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_with_public_key(&self.public_key, message, signature)
    }

    /// Serialize both keys as PEM text: (`PUBLIC KEY`, `PRIVATE KEY`)
    ///
    /// One pooled buffer is used for both blocks and released on every
    /// exit path.
    pub fn to_pem_strings(&self) -> Result<(String, String), KeyError> {
        let pool = self
            .buffer_pool
            .as_ref()
            .ok_or(KeyError::MissingBufferPool)?;

        let public_pem = encode_public_key_pem(&self.public_key)?;

        let mut buffer = PooledBuffer::acquire(&**pool);
        buffer.write_str(&public_pem)?;
        let public_pem = buffer.as_str()?.to_owned();
        buffer.reset();

        let private_pem = encode_private_key_pem(&self.signing_key)?;
        buffer.write_str(&private_pem)?;
        let private_pem = buffer.as_str()?.to_owned();

        buffer.release();

        tracing::debug!(
            public_len = public_pem.len(),
            private_len = private_pem.len(),
            "Serialized key pair to PEM"
        );

        Ok((public_pem, private_pem))
    }

    /// Get the public key bytes
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    /// Get the private key as seed followed by the derived public key
    pub fn private_key_bytes(&self) -> [u8; KEYPAIR_LENGTH] {
        self.signing_key.to_keypair_bytes()
    }

    /// Whether the stored public key is the one derived from the private key
    ///
    /// Parsing does not require this; public and private PEM blocks are
    /// taken as given.
    pub fn is_consistent(&self) -> bool {
        self.signing_key.verifying_key().as_bytes().as_slice() == self.public_key.as_slice()
    }

    pub fn buffer_pool(&self) -> Option<&SharedPool> {
        self.buffer_pool.as_ref()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("buffer_pool", &self.buffer_pool.is_some())
            .finish_non_exhaustive()
    }
}

/// Verify an Ed25519 signature with raw public key bytes
///
/// Fails only when the key is not 32 bytes long. A malformed signature or a
/// key that is not a valid curve point simply does not verify.
pub fn verify_with_public_key(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let key_bytes: &[u8; PUBLIC_KEY_LENGTH] =
        public_key.try_into().map_err(|_| KeyError::InvalidKeyLength {
            expected: PUBLIC_KEY_LENGTH,
            actual: public_key.len(),
        })?;

    let Ok(verifying_key) = VerifyingKey::from_bytes(key_bytes) else {
        return Ok(false);
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };

    Ok(verifying_key.verify(message, &signature).is_ok())
}
