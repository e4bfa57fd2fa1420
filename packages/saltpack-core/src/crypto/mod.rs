//! # Cryptography Module
//!
//! All primitives the message modes are assembled from. Nothing in here
//! knows about headers, packets or armor; see [`crate::message`] for that.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐     │
//! │  │  keys            │   │  encryption      │   │  signing         │     │
//! │  │  ────            │   │  ──────────      │   │  ───────         │     │
//! │  │  X25519 pairs    │   │  crypto_box      │   │  Ed25519 over    │     │
//! │  │  Ed25519 pairs   │   │  crypto_secretbox│   │  context ‖ digest│     │
//! │  │  OS randomness   │   │  payload key     │   │                  │     │
//! │  └──────────────────┘   └──────────────────┘   └──────────────────┘     │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  kdf                                                             │   │
//! │  │  ───                                                             │   │
//! │  │  Argon2id password hashing, HMAC-SHA512/256 sub-keys, domain     │   │
//! │  │  separation constants                                            │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose |
//! |-----------|---------|
//! | X25519 + XSalsa20-Poly1305 | Payload key wrap, MAC key agreement |
//! | XSalsa20-Poly1305 | Payload blocks, sender key box |
//! | Ed25519 | Attached, detached and signcryption signatures |
//! | SHA-512 | Header hash, block digests |
//! | HMAC-SHA512 (truncated) | Per-recipient authenticators, signcryption sub-keys |
//! | Argon2id | Password-based key derivation |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: secret keys and payload keys are wiped when dropped
//! 2. **Constant-Time Operations**: dalek curves and `hmac` tag comparison
//! 3. **Secure Random**: `rand::rngs::OsRng` for keys, payload keys and nonces
//! 4. **No Nonce Reuse**: every nonce is derived from a fresh per-message key
//!    or header hash plus a counter

mod encryption;
mod kdf;
mod keys;
mod signing;

pub use encryption::{
    box_open, box_seal, secretbox_open, secretbox_seal, Nonce, PayloadKey, NONCE_SIZE, TAG_SIZE,
};
pub use kdf::{
    derive_key_from_password, domain, CRYPTO_PWHASH_BYTES_MIN, CRYPTO_PWHASH_MEMLIMIT_INTERACTIVE,
    CRYPTO_PWHASH_MEMLIMIT_MIN, CRYPTO_PWHASH_MEMLIMIT_MODERATE, CRYPTO_PWHASH_MEMLIMIT_SENSITIVE,
    CRYPTO_PWHASH_OPSLIMIT_INTERACTIVE, CRYPTO_PWHASH_OPSLIMIT_MIN,
    CRYPTO_PWHASH_OPSLIMIT_MODERATE, CRYPTO_PWHASH_OPSLIMIT_SENSITIVE,
};
pub(crate) use kdf::{hmac_sha512_256, verify_hmac_sha512_256};
pub use keys::{
    derive_public_key, generate_keypair, generate_random_bytes, generate_sign_keypair,
    EncryptionKeyPair, Keypair, SigningKeyPair,
};
pub(crate) use keys::fill_random;
pub use signing::{sign, verify, Signature, SIGNATURE_SIZE};

use sha2::{Digest, Sha512};

/// X25519 public key size in bytes
pub const CRYPTO_BOX_PUBLICKEYBYTES: usize = 32;

/// X25519 secret key size in bytes
pub const CRYPTO_BOX_SECRETKEYBYTES: usize = 32;

/// Ed25519 public key size in bytes
pub const CRYPTO_SIGN_PUBLICKEYBYTES: usize = 32;

/// Ed25519 secret key size in bytes (seed ‖ public key)
pub const CRYPTO_SIGN_SECRETKEYBYTES: usize = 64;

/// Secretbox key size in bytes
pub const CRYPTO_SECRETBOX_KEYBYTES: usize = 32;

/// Argon2id salt size in bytes
pub const CRYPTO_PWHASH_SALTBYTES: usize = 16;

/// SHA-512 over the concatenation of `parts`
pub(crate) fn sha512(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_concatenates_parts() {
        assert_eq!(sha512(&[b"ab", b"cd"]), sha512(&[b"abcd"]));
        assert_ne!(sha512(&[b"ab"]), sha512(&[b"abcd"]));
    }
}
