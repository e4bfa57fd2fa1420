//! # Digital Signatures Module
//!
//! Ed25519 signatures over domain-separated digests.
//!
//! ## Signature Inputs
//!
//! No message mode ever signs raw payload bytes. Each signature covers a
//! context string followed by a SHA-512 digest that binds the header hash:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SIGNATURE INPUTS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Attached (per block)                                                   │
//! │  ────────────────────                                                   │
//! │  "saltpack attached signature\0"                                        │
//! │    ‖ SHA512(header_hash ‖ be64(seq) ‖ final ‖ chunk)                    │
//! │                                                                         │
//! │  Detached (whole message)                                               │
//! │  ────────────────────────                                               │
//! │  "saltpack detached signature\0"                                        │
//! │    ‖ SHA512(header_hash ‖ plaintext)                                    │
//! │                                                                         │
//! │  Signcryption (per block)                                               │
//! │  ────────────────────────                                               │
//! │  "saltpack encrypted signature\0"                                       │
//! │    ‖ SHA512(header_hash ‖ nonce ‖ final ‖ SHA512(chunk))                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A signature made for one mode therefore never verifies in another, even
//! over identical bytes.

use ed25519_dalek::{Signature as Ed25519Signature, Signer, Verifier, VerifyingKey};

use crate::crypto::SigningKeyPair;
use crate::error::{Error, Result};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 digital signature
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    /// The all-zero placeholder carried by anonymous signcryption blocks
    pub const ZERO: Signature = Signature([0u8; SIGNATURE_SIZE]);

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice read off the wire (must be exactly 64 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; SIGNATURE_SIZE] = slice.try_into().map_err(|_| {
            Error::format(format!(
                "Signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }

    /// Encode as hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sign `context ‖ digest`
///
/// ## Parameters
///
/// - `keypair`: The sender's signing keypair
/// - `context`: One of the NUL-terminated strings in [`crate::crypto::domain`]
/// - `digest`: The SHA-512 digest binding header hash and payload
pub fn sign(keypair: &SigningKeyPair, context: &[u8], digest: &[u8; 64]) -> Signature {
    let mut input = Vec::with_capacity(context.len() + digest.len());
    input.extend_from_slice(context);
    input.extend_from_slice(digest);
    Signature(keypair.signing_key().sign(&input).to_bytes())
}

/// Verify a signature over `context ‖ digest`
///
/// ## Errors
///
/// `AuthenticationFailure` when the key is not a valid Ed25519 point or the
/// signature does not match.
pub fn verify(
    public_key: &[u8; 32],
    context: &[u8],
    digest: &[u8; 64],
    signature: &Signature,
) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|_| Error::auth("Sender public key is not a valid Ed25519 key"))?;

    let mut input = Vec::with_capacity(context.len() + digest.len());
    input.extend_from_slice(context);
    input.extend_from_slice(digest);

    verifying_key
        .verify(&input, &Ed25519Signature::from_bytes(&signature.0))
        .map_err(|_| Error::auth("Signature verification failed"))
}

// ============================================================================
// TESTS
// ============================================================================
