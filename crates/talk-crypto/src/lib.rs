//! Cryptographic primitives for the talk message board.
//!
//! Provides domain-separated BLAKE3 hashing (action digests, journal
//! receipts) and Ed25519 signing/verification for account authorization.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod digest;
pub mod signer;

pub use digest::{Digest, DigestError, Domain};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
