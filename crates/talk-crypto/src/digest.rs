use std::io::Write;

use serde::Serialize;

/// A 32-byte BLAKE3 digest.
pub type Digest = [u8; 32];

/// What a digest commits to.
///
/// Each domain keys BLAKE3 in its key-derivation mode with its own context
/// string, so equal input bytes hashed under two domains never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
    /// The payload accounts sign: an action plus its nonce.
    Action,
    /// A journal receipt with its own hash field zeroed.
    Receipt,
}

impl Domain {
    /// BLAKE3 key-derivation context for this domain.
    pub const fn context(self) -> &'static str {
        match self {
            Self::Action => "talk-action-v1",
            Self::Receipt => "talk-receipt-v1",
        }
    }

    pub fn digest(self, bytes: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new_derive_key(self.context());
        hasher.update(bytes);
        hasher.finalize().into()
    }

    /// Digest the JSON encoding of `value`, streamed straight into the
    /// hasher.
    pub fn digest_json<T>(self, value: &T) -> Result<Digest, DigestError>
    where
        T: Serialize + ?Sized,
    {
        let mut hasher = blake3::Hasher::new_derive_key(self.context());
        serde_json::to_writer(&mut hasher, value)
            .map_err(|e| DigestError::Encode(e.to_string()))?;
        hasher.flush().map_err(|e| DigestError::Encode(e.to_string()))?;
        Ok(hasher.finalize().into())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("cannot encode value for hashing: {0}")]
    Encode(String),
}
