//! # Key Derivation Functions
//!
//! Two unrelated kinds of derivation live here:
//!
//! - **Password hashing** (Argon2id) for callers turning a passphrase into
//!   key material, with libsodium-compatible limit presets.
//! - **Protocol sub-keys**: HMAC-SHA512 truncated to 32 bytes, keyed or
//!   labelled with the [`domain`] strings below, used for signcryption
//!   recipient identifiers/wrapping keys and encryption authenticators.
//!
//! ## Password Derivation
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    PASSWORD → KEY                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Argon2id v1.3 (                                                        │
//! │    password,                                                            │
//! │    salt        = 16 bytes,                                              │
//! │    t_cost      = ops_limit,                                             │
//! │    m_cost      = mem_limit / 1024  (KiB),                               │
//! │    parallelism = 1,                                                     │
//! │    output      = key_size bytes (>= 16)                                 │
//! │  )                                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::crypto::CRYPTO_PWHASH_SALTBYTES;
use crate::error::{Error, Result};

type HmacSha512 = Hmac<Sha512>;

/// Domain separation strings
///
/// These are protocol constants: changing any of them breaks compatibility
/// with every message produced before the change.
pub mod domain {
    /// Format name at the head of every header
    pub const FORMAT_NAME: &str = "saltpack";

    /// Nonce for the secretbox carrying the sender's public key
    pub const SENDER_KEY_SBOX_NONCE: &[u8; 24] = b"saltpack_sender_key_sbox";

    /// Nonce prefix for per-recipient payload key boxes
    pub const RECIPIENT_BOX_NONCE_PREFIX: &[u8; 16] = b"saltpack_recipsb";

    /// Nonce prefix for encryption-mode payload secretboxes
    pub const PAYLOAD_NONCE_PREFIX: &[u8; 16] = b"saltpack_ploadsb";

    /// Prefix of every attached signature input
    pub const ATTACHED_SIGNATURE: &[u8] = b"saltpack attached signature\0";

    /// Prefix of the detached signature input
    pub const DETACHED_SIGNATURE: &[u8] = b"saltpack detached signature\0";

    /// Prefix of every signcryption signature input
    pub const ENCRYPTED_SIGNATURE: &[u8] = b"saltpack encrypted signature\0";

    /// HMAC key for signcryption box-recipient identifiers
    pub const SIGNCRYPTION_BOX_KEY_IDENTIFIER: &[u8] = b"saltpack signcryption box key identifier";

    /// HMAC key for signcryption payload-key wrapping keys
    pub const SIGNCRYPTION_DERIVED_SYMMETRIC_KEY: &[u8] =
        b"saltpack signcryption derived symmetric key";
}

/// Minimum operations limit accepted by Argon2id
pub const CRYPTO_PWHASH_OPSLIMIT_MIN: u64 = 1;
/// Minimum memory limit in bytes accepted by Argon2id
pub const CRYPTO_PWHASH_MEMLIMIT_MIN: usize = 8192;
/// Interactive preset: operations limit
pub const CRYPTO_PWHASH_OPSLIMIT_INTERACTIVE: u64 = 2;
/// Interactive preset: memory limit (64 MiB)
pub const CRYPTO_PWHASH_MEMLIMIT_INTERACTIVE: usize = 64 * 1024 * 1024;
/// Moderate preset: operations limit
pub const CRYPTO_PWHASH_OPSLIMIT_MODERATE: u64 = 3;
/// Moderate preset: memory limit (256 MiB)
pub const CRYPTO_PWHASH_MEMLIMIT_MODERATE: usize = 256 * 1024 * 1024;
/// Sensitive preset: operations limit
pub const CRYPTO_PWHASH_OPSLIMIT_SENSITIVE: u64 = 4;
/// Sensitive preset: memory limit (1 GiB)
pub const CRYPTO_PWHASH_MEMLIMIT_SENSITIVE: usize = 1024 * 1024 * 1024;
/// Smallest key a password derivation may produce
pub const CRYPTO_PWHASH_BYTES_MIN: usize = 16;

/// Derive `key_size` bytes from a password with Argon2id
///
/// ## Parameters
///
/// - `key_size`: Output length, at least [`CRYPTO_PWHASH_BYTES_MIN`]
/// - `password`: Password bytes (UTF-8 for text passwords)
/// - `salt`: Exactly [`CRYPTO_PWHASH_SALTBYTES`] bytes
/// - `ops_limit`: Number of passes (Argon2 `t_cost`)
/// - `mem_limit`: Memory in bytes (rounded down to KiB)
///
/// ## Errors
///
/// - `InvalidArgument` for a bad salt length or too short an output
/// - `ResourceExhausted` when the limits are under the algorithm minimums
pub fn derive_key_from_password(
    key_size: usize,
    password: &[u8],
    salt: &[u8],
    ops_limit: u64,
    mem_limit: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if salt.len() != CRYPTO_PWHASH_SALTBYTES {
        return Err(Error::invalid("Salt must be 16 bytes."));
    }
    if key_size < CRYPTO_PWHASH_BYTES_MIN {
        return Err(Error::invalid(format!(
            "Key size must be at least {} bytes",
            CRYPTO_PWHASH_BYTES_MIN
        )));
    }
    if ops_limit < CRYPTO_PWHASH_OPSLIMIT_MIN || mem_limit < CRYPTO_PWHASH_MEMLIMIT_MIN {
        return Err(Error::ResourceExhausted(format!(
            "Password hashing limits too low (ops {}, mem {})",
            ops_limit, mem_limit
        )));
    }

    let t_cost = u32::try_from(ops_limit)
        .map_err(|_| Error::invalid("Operations limit out of range"))?;
    let m_cost = u32::try_from(mem_limit / 1024)
        .map_err(|_| Error::invalid("Memory limit out of range"))?;

    let params = Params::new(m_cost, t_cost, 1, Some(key_size)).map_err(map_argon2_error)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new(vec![0u8; key_size]);
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(map_argon2_error)?;

    Ok(key)
}

fn map_argon2_error(err: argon2::Error) -> Error {
    match err {
        argon2::Error::OutputTooShort | argon2::Error::OutputTooLong => {
            Error::invalid(format!("Invalid key size: {}", err))
        }
        other => Error::ResourceExhausted(format!("Password hashing failed: {}", other)),
    }
}

// ============================================================================
// HMAC SUB-KEYS
// ============================================================================

fn keyed_hmac(key: &[u8], parts: &[&[u8]]) -> HmacSha512 {
    let Ok(mut mac) = HmacSha512::new_from_slice(key) else {
        unreachable!("HMAC accepts keys of any length");
    };
    for part in parts {
        mac.update(part);
    }
    mac
}

/// HMAC-SHA512 over the concatenation of `parts`, truncated to 32 bytes
pub(crate) fn hmac_sha512_256(key: &[u8], parts: &[&[u8]]) -> Zeroizing<[u8; 32]> {
    let tag = keyed_hmac(key, parts).finalize().into_bytes();
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&tag[..32]);
    out
}

/// Constant-time check of a truncated HMAC-SHA512 tag
pub(crate) fn verify_hmac_sha512_256(key: &[u8], parts: &[&[u8]], tag: &[u8]) -> bool {
    tag.len() == 32 && keyed_hmac(key, parts).verify_truncated_left(tag).is_ok()
}

// ============================================================================
// TESTS
// ============================================================================
