//! # Saltpack Core
//!
//! Streaming, multi-recipient encryption, signing and signcryption over
//! bounded blocks, with an optional ASCII armor for text-only channels.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SALTPACK CORE MODULES                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────┐  ┌─────────────────────────────┐   │
//! │  │         MessageWriter           │  │        MessageReader        │   │
//! │  │  config ─► header ─► blocks     │  │  header ─► keys ─► blocks   │   │
//! │  └───────────────┬─────────────────┘  └──────────────┬──────────────┘   │
//! │                  │                                   │                  │
//! │  ┌───────────────┴───────────────────────────────────┴──────────────┐   │
//! │  │                         message                                  │   │
//! │  │  header  │  encryption  │  signing  │  signcryption  │  packet   │   │
//! │  └───────────────┬───────────────────────────────────┬──────────────┘   │
//! │                  │                                   │                  │
//! │  ┌───────────────┴──────────┐        ┌───────────────┴──────────────┐   │
//! │  │         crypto           │        │      armor + encoding        │   │
//! │  │ - X25519 / Ed25519 keys  │        │ - BEGIN/END envelope         │   │
//! │  │ - box / secretbox        │        │ - word/phrase wrapping       │   │
//! │  │ - HMAC, Argon2id         │        │ - base-X codec               │   │
//! │  └──────────────────────────┘        └──────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Key management and cryptographic primitives
//! - [`encoding`] - Base-X codec and hex helpers
//! - [`armor`] - ASCII armor envelope, one-shot and streaming
//! - [`config`] - Output and input parameters
//! - [`message`] - Headers, block engines, writer and reader
//!
//! ## Example
//!
//! ```rust,ignore
//! use saltpack_core::*;
//!
//! let alice = generate_keypair()?;
//! let bob = generate_keypair()?;
//!
//! let mut armored = Vec::new();
//! let config = EncryptConfig::new(Some(alice.secret_key()), vec![bob.public_key().to_vec()]);
//! let mut writer = MessageWriter::new(&mut armored, OutputParameters::armored(), config.into())?;
//! writer.add_block(b"Sample message.", true)?;
//! drop(writer);
//!
//! let mut reader = MessageReader::new(
//!     &armored[..],
//!     InputParameters::armored(),
//!     ReaderKeys::decrypt(bob.secret_key()),
//! )?;
//! let plaintext: Vec<u8> = reader.blocks().collect::<Result<Vec<_>>>()?.concat();
//! assert_eq!(reader.sender(), alice.public_key());
//! ```
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY PROPERTIES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Confidentiality: one random payload key per message, wrapped for       │
//! │  each recipient under an ephemeral X25519 key.                          │
//! │                                                                         │
//! │  Integrity: every block is bound to the header hash and its sequence    │
//! │  number; the last block carries a final flag, so truncation,            │
//! │  reordering and splicing are all detected.                              │
//! │                                                                         │
//! │  Authenticity: per-recipient MACs (encryption), Ed25519 signatures      │
//! │  (signing, signcryption).                                               │
//! │                                                                         │
//! │  Hygiene: keys and per-message state are wiped when dropped.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod armor;
pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod message;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{InputParameters, OutputParameters, WordWrap};
pub use crypto::{
    derive_key_from_password, derive_public_key, generate_keypair, generate_random_bytes,
    generate_sign_keypair, Keypair, CRYPTO_BOX_PUBLICKEYBYTES, CRYPTO_BOX_SECRETKEYBYTES,
    CRYPTO_PWHASH_SALTBYTES, CRYPTO_SECRETBOX_KEYBYTES, CRYPTO_SIGN_PUBLICKEYBYTES,
    CRYPTO_SIGN_SECRETKEYBYTES,
};
pub use encoding::{bin_to_hex, hex_to_bin, ALPHABET_BASE62, ALPHABET_BASE64, ALPHABET_BASE85};
pub use error::{Error, ErrorKind, Result};
pub use message::{
    Blocks, EncryptConfig, MessageReader, MessageWriter, Mode, ReaderKeys, RecipientEntry,
    SignConfig, SigncryptConfig, WriterConfig, MAX_BLOCK_SIZE,
};

// ============================================================================
// INITIALIZATION
// ============================================================================

use once_cell::sync::OnceCell;

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// One-time process-wide setup
///
/// Idempotent and thread-safe. Writers and readers call it themselves, so
/// calling it up front only moves the log line earlier.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        tracing::info!("Initializing saltpack-core v{}", env!("CARGO_PKG_VERSION"));
    });
}

/// Whether [`init`] has run
pub fn is_initialized() -> bool {
    INITIALIZED.get().is_some()
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of saltpack-core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        format_version: message::FORMAT_VERSION,
        #[cfg(target_os = "macos")]
        target: "macos",
        #[cfg(target_os = "linux")]
        target: "linux",
        #[cfg(target_os = "windows")]
        target: "windows",
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Message format (major, minor) this build writes
    pub format_version: (u64, u64),
    /// Target operating system
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
        assert_eq!(info.format_version, (2, 0));
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert!(is_initialized());
    }
}
