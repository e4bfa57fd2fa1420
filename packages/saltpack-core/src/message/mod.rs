//! # Message Layer
//!
//! Headers, packets and the per-mode block engines, orchestrated by
//! [`MessageWriter`] and [`MessageReader`].
//!
//! ## Binary Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          MESSAGE STREAM                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │ HEADER    CBOR bytes( CBOR ["saltpack", [2, 0], mode, ...] )     │   │
//! │  │           header_hash = SHA-512(inner bytes)                     │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │ PACKET 0  mode-specific CBOR array, bound to header_hash + seq   │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │     ...                                                                 │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │ PACKET n  final flag set                                         │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Block Lifecycle
//!
//! ```text
//!   Writer:  new() ──► header written ──► add_block()* ──► add_block(final)
//!                                                              │
//!                                          further add_block ──┴──► FormatError
//!
//!   Reader:  new() ──► header opened ──► get_block()* ──► final block read
//!                                                              │
//!                                          further get_block ──┴──► FormatError
//! ```
//!
//! Every nonce and authenticator folds in the header hash and the block
//! sequence number, so packets cannot be reordered, dropped, duplicated or
//! spliced between messages without the reader failing.

mod encryption;
mod header;
mod packet;
mod reader;
mod signcryption;
mod signing;
mod writer;

pub use header::MessageHeader;
pub use reader::{Blocks, MessageReader, ReaderKeys};
pub use writer::{EncryptConfig, MessageWriter, SignConfig, SigncryptConfig, WriterConfig};

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Largest plaintext block a single packet carries (1 MiB)
pub const MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Format version written into every header
pub const FORMAT_VERSION: (u64, u64) = (2, 0);

/// What a message does with its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Encrypted to public-key recipients, authenticated per recipient
    Encryption,
    /// Signed block by block, payload in the clear
    AttachedSigning,
    /// One signature over the whole payload, which travels separately
    DetachedSigning,
    /// Encrypted to public-key and/or symmetric recipients, signed inside
    Signcryption,
}

impl Mode {
    /// Wire code
    pub fn code(&self) -> u64 {
        match self {
            Mode::Encryption => 0,
            Mode::AttachedSigning => 1,
            Mode::DetachedSigning => 2,
            Mode::Signcryption => 3,
        }
    }

    /// Parse a wire code
    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0 => Ok(Mode::Encryption),
            1 => Ok(Mode::AttachedSigning),
            2 => Ok(Mode::DetachedSigning),
            3 => Ok(Mode::Signcryption),
            other => Err(Error::format(format!("Unknown message mode {}", other))),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Encryption => "encryption",
            Mode::AttachedSigning => "attached signing",
            Mode::DetachedSigning => "detached signing",
            Mode::Signcryption => "signcryption",
        };
        f.write_str(name)
    }
}

/// A signcryption recipient
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub enum RecipientEntry {
    /// An X25519 public key (32 bytes)
    PublicKey(Vec<u8>),
    /// A shared secret known to the recipient under `identifier`
    Symmetric {
        /// Opaque, caller-chosen; may be empty
        identifier: Vec<u8>,
        /// 32-byte secretbox key
        key: Vec<u8>,
    },
}

impl std::fmt::Debug for RecipientEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecipientEntry::PublicKey(pk) => f.debug_tuple("PublicKey").field(&hex::encode(pk)).finish(),
            RecipientEntry::Symmetric { identifier, .. } => f
                .debug_struct("Symmetric")
                .field("identifier", &hex::encode(identifier))
                .finish_non_exhaustive(),
        }
    }
}

/// Interpret `bytes` as a 32-byte key
pub(crate) fn key32(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|_| Error::invalid("Wrong key size."))
}
