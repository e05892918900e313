use std::fmt;
use std::str::FromStr;

use ed25519_dalek::Signer;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// An account's Ed25519 secret key.
///
/// Key files hold the 32-byte secret as hex; see [`SigningKey::to_hex`].
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

/// The public half of an account key, as registered with the board.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

/// Ed25519 signature over an action digest. Serialized as 128 hex digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl SigningKey {
    pub fn generate() -> Self {
        let inner = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        Self { inner }
    }

    pub fn from_hex(text: &str) -> Result<Self, SignatureError> {
        let secret = hex_array::<32>(text).ok_or(SignatureError::InvalidKey)?;
        Ok(Self {
            inner: ed25519_dalek::SigningKey::from_bytes(&secret),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.inner.to_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    pub fn sign(&self, digest: &[u8]) -> Signature {
        Signature {
            inner: self.inner.sign(digest),
        }
    }
}

impl VerifyingKey {
    /// Strict Ed25519 check of `signature` over `digest`.
    pub fn verify(&self, digest: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        self.inner
            .verify_strict(digest, &signature.inner)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    pub fn from_hex(text: &str) -> Result<Self, SignatureError> {
        let bytes = hex_array::<32>(text).ok_or(SignatureError::InvalidKey)?;
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(|inner| Self { inner })
            .map_err(|_| SignatureError::InvalidKey)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.inner.as_bytes())
    }
}

impl Signature {
    pub fn from_hex(text: &str) -> Result<Self, SignatureError> {
        let bytes = hex_array::<64>(text).ok_or(SignatureError::InvalidSignature)?;
        Ok(Self {
            inner: ed25519_dalek::Signature::from_bytes(&bytes),
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.inner.to_bytes())
    }
}

/// Decode exactly `N` bytes of hex, ignoring surrounding whitespace.
fn hex_array<const N: usize>(text: &str) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    hex::decode_to_slice(text.trim(), &mut out).ok()?;
    Some(out)
}

impl FromStr for VerifyingKey {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyingKey({})", self.to_hex())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &self.to_hex()[..16])
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_hex(&text).map_err(de::Error::custom)
    }
}

/// Errors from key parsing and signature checks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not verify")]
    InvalidSignature,
    #[error("malformed key")]
    InvalidKey,
}
