//! PEM framing and PKIX / PKCS#8 coding for Ed25519 keys
//!
//! Decoding narrows every document through [`KeyAlgorithm`]; anything other
//! than Ed25519 is rejected as an encoding error.

use super::KeyError;
use crate::buffer::{BufferPool, PooledBuffer};
use ed25519_dalek::pkcs8::{KeypairBytes, PublicKeyBytes, ALGORITHM_OID};
use ed25519_dalek::{SigningKey, PUBLIC_KEY_LENGTH};
use pkcs8::der::pem::{decode_vec, encode_string, LineEnding};
use pkcs8::der::Decode;
use pkcs8::spki::{EncodePublicKey, SubjectPublicKeyInfoRef};
use pkcs8::{EncodePrivateKey, ObjectIdentifier, PrivateKeyInfo};
use std::fmt;
use zeroize::Zeroizing;

/// PEM label of PKIX public keys
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// PEM label of PKCS#8 private keys
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

const BEGIN_BOUNDARY: &[u8] = b"-----BEGIN ";
const END_BOUNDARY: &[u8] = b"-----END ";
const BOUNDARY_DELIMITER: &[u8] = b"-----";
const BASE64_LINE_WIDTH: usize = 64;

/// Algorithm named by a decoded key document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    Unsupported(ObjectIdentifier),
}

impl KeyAlgorithm {
    pub fn from_oid(oid: ObjectIdentifier) -> Self {
        if oid == ALGORITHM_OID {
            Self::Ed25519
        } else {
            Self::Unsupported(oid)
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "Ed25519 ({})", ALGORITHM_OID),
            Self::Unsupported(oid) => write!(f, "{}", oid),
        }
    }
}

fn unsupported_algorithm(oid: ObjectIdentifier) -> KeyError {
    KeyError::InvalidKeyEncoding(format!("unsupported key algorithm {}", oid))
}

/// Public key recovered from a PKIX document
pub(crate) enum PublicKeyMaterial {
    Ed25519(Vec<u8>),
    Unsupported(ObjectIdentifier),
}

impl PublicKeyMaterial {
    pub(crate) fn into_ed25519(self) -> Result<Vec<u8>, KeyError> {
        match self {
            Self::Ed25519(key) => Ok(key),
            Self::Unsupported(oid) => Err(unsupported_algorithm(oid)),
        }
    }
}

/// Private key recovered from a PKCS#8 document
pub(crate) enum PrivateKeyMaterial {
    Ed25519(SigningKey),
    Unsupported(ObjectIdentifier),
}

impl PrivateKeyMaterial {
    pub(crate) fn into_ed25519(self) -> Result<SigningKey, KeyError> {
        match self {
            Self::Ed25519(key) => Ok(key),
            Self::Unsupported(oid) => Err(unsupported_algorithm(oid)),
        }
    }
}

/// Copy `text` into a pooled buffer and extract the DER payload of its first
/// PEM block. The buffer is back in the pool before this returns.
pub(crate) fn read_pem_block(
    pool: &dyn BufferPool,
    text: &str,
    label: &str,
) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let mut buffer = PooledBuffer::acquire(pool);
    buffer.write_str(text)?;
    decode_pem_block(buffer.bytes(), label)
}

fn decode_pem_block(bytes: &[u8], expected_label: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
    let block = locate_pem_block(bytes)
        .ok_or_else(|| KeyError::InvalidPemEncoding("no PEM block found".into()))?;

    let block = rewrap_pem_block(block)?;

    let (label, der) = decode_vec(block.as_bytes())
        .map_err(|e| KeyError::InvalidPemEncoding(e.to_string()))?;
    let der = Zeroizing::new(der);

    if label != expected_label {
        return Err(KeyError::InvalidPemEncoding(format!(
            "expected {} block, found {}",
            expected_label, label
        )));
    }

    Ok(der)
}

/// Slice out the first `-----BEGIN ...-----` through `-----END ...-----`
/// block, skipping any surrounding text.
fn locate_pem_block(bytes: &[u8]) -> Option<&[u8]> {
    let start = find(bytes, BEGIN_BOUNDARY)?;
    let block = &bytes[start..];

    let end = find(block, END_BOUNDARY)? + END_BOUNDARY.len();
    let close = find(&block[end..], BOUNDARY_DELIMITER)? + BOUNDARY_DELIMITER.len();

    Some(&block[..end + close])
}

/// Rebuild a located block with its base64 body wrapped at 64 columns, the
/// only width `decode_vec` accepts. Whitespace anywhere in the body is dropped.
fn rewrap_pem_block(block: &[u8]) -> Result<Zeroizing<String>, KeyError> {
    let text =
        std::str::from_utf8(block).map_err(|e| KeyError::InvalidPemEncoding(e.to_string()))?;

    let (begin_line, rest) = text
        .split_once('\n')
        .ok_or_else(|| KeyError::InvalidPemEncoding("PEM block has no body".into()))?;
    let end_start = find(rest.as_bytes(), END_BOUNDARY)
        .ok_or_else(|| KeyError::InvalidPemEncoding("PEM block has no END line".into()))?;
    let (body, end_line) = rest.split_at(end_start);

    let body: Zeroizing<Vec<u8>> = Zeroizing::new(
        body.bytes()
            .filter(|byte| !byte.is_ascii_whitespace())
            .collect(),
    );
    if !body.is_ascii() {
        return Err(KeyError::InvalidPemEncoding(
            "non-ASCII characters in PEM body".into(),
        ));
    }

    let mut rewrapped = Zeroizing::new(String::with_capacity(
        begin_line.len() + end_line.len() + body.len() + body.len() / BASE64_LINE_WIDTH + 3,
    ));
    rewrapped.push_str(begin_line.trim_end());
    rewrapped.push('\n');
    for line in body.chunks(BASE64_LINE_WIDTH) {
        rewrapped.extend(line.iter().map(|&byte| char::from(byte)));
        rewrapped.push('\n');
    }
    rewrapped.push_str(end_line.trim_end());
    rewrapped.push('\n');

    Ok(rewrapped)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub(crate) fn decode_public_key_der(der: &[u8]) -> Result<PublicKeyMaterial, KeyError> {
    let spki = SubjectPublicKeyInfoRef::from_der(der)
        .map_err(|e| KeyError::InvalidKeyEncoding(e.to_string()))?;

    match KeyAlgorithm::from_oid(spki.algorithm.oid) {
        KeyAlgorithm::Ed25519 => {
            let key = spki.subject_public_key.as_bytes().ok_or_else(|| {
                KeyError::InvalidKeyEncoding("public key bit string is not octet aligned".into())
            })?;
            Ok(PublicKeyMaterial::Ed25519(key.to_vec()))
        }
        KeyAlgorithm::Unsupported(oid) => Ok(PublicKeyMaterial::Unsupported(oid)),
    }
}

pub(crate) fn decode_private_key_der(der: &[u8]) -> Result<PrivateKeyMaterial, KeyError> {
    let info =
        PrivateKeyInfo::from_der(der).map_err(|e| KeyError::InvalidKeyEncoding(e.to_string()))?;

    match KeyAlgorithm::from_oid(info.algorithm.oid) {
        KeyAlgorithm::Ed25519 => {
            let keypair = KeypairBytes::try_from(info)
                .map_err(|e| KeyError::InvalidKeyEncoding(e.to_string()))?;
            let signing_key = SigningKey::from_bytes(&keypair.secret_key);

            // PKCS#8 v2 documents carry the public key as well
            if let Some(public_key) = &keypair.public_key {
                if public_key.0 != signing_key.verifying_key().to_bytes() {
                    return Err(KeyError::InvalidKeyEncoding(
                        "embedded public key does not match private key".into(),
                    ));
                }
            }

            Ok(PrivateKeyMaterial::Ed25519(signing_key))
        }
        KeyAlgorithm::Unsupported(oid) => Ok(PrivateKeyMaterial::Unsupported(oid)),
    }
}

/// PKIX-encode a raw public key and frame it as a `PUBLIC KEY` block
pub(crate) fn encode_public_key_pem(public_key: &[u8]) -> Result<String, KeyError> {
    let bytes: [u8; PUBLIC_KEY_LENGTH] = public_key.try_into().map_err(|_| {
        KeyError::KeyEncoding(format!(
            "public key must be {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            public_key.len()
        ))
    })?;

    let der = PublicKeyBytes(bytes)
        .to_public_key_der()
        .map_err(|e| KeyError::KeyEncoding(e.to_string()))?;

    encode_string(PUBLIC_KEY_LABEL, LineEnding::LF, der.as_bytes())
        .map_err(|e| KeyError::KeyEncoding(e.to_string()))
}

/// PKCS#8-encode a private key and frame it as a `PRIVATE KEY` block
///
/// Written as a v1 document (seed only), the form OpenSSL and most other
/// tooling emit for Ed25519.
pub(crate) fn encode_private_key_pem(
    signing_key: &SigningKey,
) -> Result<Zeroizing<String>, KeyError> {
    let keypair = KeypairBytes {
        secret_key: signing_key.to_bytes(),
        public_key: None,
    };

    let der = keypair
        .to_pkcs8_der()
        .map_err(|e| KeyError::KeyEncoding(e.to_string()))?;

    encode_string(PRIVATE_KEY_LABEL, LineEnding::LF, der.as_bytes())
        .map(Zeroizing::new)
        .map_err(|e| KeyError::KeyEncoding(e.to_string()))
}

/// Parse a peer's `PUBLIC KEY` PEM block into raw Ed25519 key bytes
///
/// The pooled buffer is released as soon as the PEM payload is extracted.
pub fn parse_public_key_pem(
    public_pem: &str,
    pool: &dyn BufferPool,
) -> Result<Vec<u8>, KeyError> {
    let der = read_pem_block(pool, public_pem, PUBLIC_KEY_LABEL)?;
    let public_key = decode_public_key_der(&der)?.into_ed25519()?;

    if public_key.len() != PUBLIC_KEY_LENGTH {
        return Err(KeyError::InvalidKeyLength {
            expected: PUBLIC_KEY_LENGTH,
            actual: public_key.len(),
        });
    }

    tracing::debug!(algorithm = %KeyAlgorithm::Ed25519, "Parsed public key PEM");
    Ok(public_key)
}
