//! # Encryption Module
//!
//! Thin wrappers over the two NaCl constructions every message mode is
//! built from, plus the payload key and nonce types that feed them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PRIMITIVES                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  crypto_secretbox (XSalsa20-Poly1305)                                   │
//! │  ────────────────────────────────────                                   │
//! │  key 32 B, nonce 24 B, output = 16 B tag ‖ ciphertext                   │
//! │  • payload blocks (encryption + signcryption)                           │
//! │  • sender public key inside the header                                  │
//! │  • signcryption payload-key wrap                                        │
//! │                                                                         │
//! │  crypto_box (X25519 + XSalsa20-Poly1305)                                │
//! │  ───────────────────────────────────────                                │
//! │  our secret × their public, nonce 24 B, same output layout              │
//! │  • encryption payload-key wrap (ephemeral → recipient)                  │
//! │  • encryption MAC key derivation                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nonces here are always derived, never random: a per-message random
//! payload key makes a counter-based nonce unique.

use crypto_box::SalsaBox;
use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::keys::{fill_random, EncryptionKeyPair};
use crate::crypto::CRYPTO_SECRETBOX_KEYBYTES;
use crate::error::{Error, Result};

/// Size of an XSalsa20 nonce in bytes
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// A 24-byte XSalsa20 nonce
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// `prefix ‖ be64(counter)`
    pub fn with_counter(prefix: &[u8; 16], counter: u64) -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        bytes[..16].copy_from_slice(prefix);
        bytes[16..].copy_from_slice(&counter.to_be_bytes());
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// The per-message symmetric key all payload blocks are sealed with
///
/// Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey([u8; CRYPTO_SECRETBOX_KEYBYTES]);

impl PayloadKey {
    /// Generate a fresh random payload key
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; CRYPTO_SECRETBOX_KEYBYTES];
        fill_random(&mut key)?;
        Ok(Self(key))
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; CRYPTO_SECRETBOX_KEYBYTES]) -> Self {
        Self(bytes)
    }

    /// Rebuild from an unwrapped key box
    ///
    /// A wrong length means the box was well-authenticated but carries
    /// something other than a key, which is a format violation.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key: [u8; CRYPTO_SECRETBOX_KEYBYTES] = bytes
            .try_into()
            .map_err(|_| Error::format("Unwrapped payload key has the wrong size"))?;
        Ok(Self(key))
    }

    /// Get the raw key bytes
    pub fn as_bytes(&self) -> &[u8; CRYPTO_SECRETBOX_KEYBYTES] {
        &self.0
    }
}

// ============================================================================
// SECRETBOX
// ============================================================================

fn secretbox_cipher(key: &[u8; CRYPTO_SECRETBOX_KEYBYTES]) -> XSalsa20Poly1305 {
    XSalsa20Poly1305::new(crypto_secretbox::Key::from_slice(key))
}

/// Seal `plaintext` with crypto_secretbox
pub fn secretbox_seal(
    key: &[u8; CRYPTO_SECRETBOX_KEYBYTES],
    nonce: &Nonce,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    secretbox_cipher(key)
        .encrypt(crypto_secretbox::Nonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| Error::Internal(format!("secretbox seal failed: {}", e)))
}

/// Open a crypto_secretbox
///
/// ## Errors
///
/// `AuthenticationFailure` if the tag does not verify under `key`/`nonce`.
pub fn secretbox_open(
    key: &[u8; CRYPTO_SECRETBOX_KEYBYTES],
    nonce: &Nonce,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::format("Secretbox shorter than its tag"));
    }
    secretbox_cipher(key)
        .decrypt(crypto_secretbox::Nonce::from_slice(&nonce.0), ciphertext)
        .map_err(|_| Error::auth("secretbox authentication tag mismatch"))
}

// ============================================================================
// BOX
// ============================================================================

fn salsa_box(their_public: &[u8; 32], ours: &EncryptionKeyPair) -> SalsaBox {
    let public = crypto_box::PublicKey::from(*their_public);
    SalsaBox::new(&public, &ours.box_secret())
}

/// Seal `plaintext` with crypto_box from `ours` to `their_public`
pub fn box_seal(
    their_public: &[u8; 32],
    ours: &EncryptionKeyPair,
    nonce: &Nonce,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    salsa_box(their_public, ours)
        .encrypt(crypto_box::Nonce::from_slice(&nonce.0), plaintext)
        .map_err(|e| Error::Internal(format!("box seal failed: {}", e)))
}

/// Open a crypto_box sent by `their_public` to `ours`
pub fn box_open(
    their_public: &[u8; 32],
    ours: &EncryptionKeyPair,
    nonce: &Nonce,
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(Error::format("Box shorter than its tag"));
    }
    salsa_box(their_public, ours)
        .decrypt(crypto_box::Nonce::from_slice(&nonce.0), ciphertext)
        .map_err(|_| Error::auth("box authentication tag mismatch"))
}

// ============================================================================
// TESTS
// ============================================================================
