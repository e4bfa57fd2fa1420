//! Message writer.
//!
//! ```text
//!   WriterConfig ──► sealer::start ──► header ─┐
//!                                              ├──► [ArmoredWriter] ──► W
//!   add_block(chunk, final) ──► packet ────────┘
//! ```
//!
//! One writer produces exactly one message. The header is written by
//! [`MessageWriter::new`]; the armor footer and a flush follow the final
//! block.

use std::io::{self, Write};

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::encryption::EncryptionSealer;
use super::packet::write_packet;
use super::signcryption::SigncryptionSealer;
use super::signing::SigningSealer;
use super::{Mode, RecipientEntry, MAX_BLOCK_SIZE};
use crate::armor::{ArmorConfig, ArmorMarker, ArmoredWriter};
use crate::config::OutputParameters;
use crate::crypto::{EncryptionKeyPair, SigningKeyPair};
use crate::error::{Error, Result};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Encryption-mode settings
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptConfig {
    /// 32-byte X25519 secret key; `None` sends anonymously
    pub sender_secret_key: Option<Vec<u8>>,
    /// 32-byte X25519 public keys, at least one
    pub recipients: Vec<Vec<u8>>,
    /// Whether recipient public keys are listed in the header
    #[zeroize(skip)]
    pub visible_recipients: bool,
}

impl EncryptConfig {
    /// Encrypt from `sender_secret_key` to `recipients`, listing them
    pub fn new(sender_secret_key: Option<&[u8]>, recipients: Vec<Vec<u8>>) -> Self {
        Self {
            sender_secret_key: sender_secret_key.map(<[u8]>::to_vec),
            recipients,
            visible_recipients: true,
        }
    }

    /// Leave recipient public keys out of the header
    pub fn hide_recipients(mut self) -> Self {
        self.visible_recipients = false;
        self
    }
}

/// Signing-mode settings
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SignConfig {
    /// 64-byte Ed25519 secret key
    pub sender_secret_key: Vec<u8>,
    /// Write one signature over the whole message instead of per block
    #[zeroize(skip)]
    pub detached: bool,
}

impl SignConfig {
    /// One signature per block, interleaved with the content
    pub fn attached(sender_secret_key: &[u8]) -> Self {
        Self {
            sender_secret_key: sender_secret_key.to_vec(),
            detached: false,
        }
    }

    /// A single signature, written without the content
    pub fn detached(sender_secret_key: &[u8]) -> Self {
        Self {
            sender_secret_key: sender_secret_key.to_vec(),
            detached: true,
        }
    }
}

/// Signcryption-mode settings
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigncryptConfig {
    /// 64-byte Ed25519 secret key; `None` sends anonymously
    pub sender_secret_key: Option<Vec<u8>>,
    /// Public-key and symmetric recipients, in any mix
    pub recipients: Vec<RecipientEntry>,
}

impl SigncryptConfig {
    /// Signcrypt from `sender_secret_key` to `recipients`
    pub fn new(sender_secret_key: Option<&[u8]>, recipients: Vec<RecipientEntry>) -> Self {
        Self {
            sender_secret_key: sender_secret_key.map(<[u8]>::to_vec),
            recipients,
        }
    }
}

/// What kind of message a [`MessageWriter`] produces
#[derive(Clone)]
pub enum WriterConfig {
    /// Encryption to public-key recipients
    Encrypt(EncryptConfig),
    /// Attached or detached signing
    Sign(SignConfig),
    /// Signcryption to public-key and symmetric recipients
    Signcrypt(SigncryptConfig),
}

impl WriterConfig {
    /// The header mode this configuration writes
    pub fn mode(&self) -> Mode {
        match self {
            WriterConfig::Encrypt(_) => Mode::Encryption,
            WriterConfig::Sign(c) if c.detached => Mode::DetachedSigning,
            WriterConfig::Sign(_) => Mode::AttachedSigning,
            WriterConfig::Signcrypt(_) => Mode::Signcryption,
        }
    }
}

impl From<EncryptConfig> for WriterConfig {
    fn from(config: EncryptConfig) -> Self {
        WriterConfig::Encrypt(config)
    }
}

impl From<SignConfig> for WriterConfig {
    fn from(config: SignConfig) -> Self {
        WriterConfig::Sign(config)
    }
}

impl From<SigncryptConfig> for WriterConfig {
    fn from(config: SigncryptConfig) -> Self {
        WriterConfig::Signcrypt(config)
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

enum Output<W: Write> {
    Binary(W),
    Armored(ArmoredWriter<W>),
}

impl<W: Write> Output<W> {
    /// Close the armor envelope, if any, and flush
    fn finish(&mut self) -> Result<()> {
        match self {
            Output::Binary(w) => w.flush()?,
            Output::Armored(w) => w.finish()?,
        }
        Ok(())
    }
}

impl<W: Write> Write for Output<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Binary(w) => w.write(buf),
            Output::Armored(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Binary(w) => w.flush(),
            Output::Armored(w) => w.flush(),
        }
    }
}

// ============================================================================
// WRITER
// ============================================================================

enum Sealer {
    Encrypt(EncryptionSealer),
    Attached(SigningSealer),
    Detached(SigningSealer),
    Signcrypt(SigncryptionSealer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Finished,
    Failed,
}

/// Writes one encrypted, signed or signcrypted message to `W`
///
/// ## Example
///
/// ```rust,ignore
/// let bob = generate_keypair()?;
/// let config = EncryptConfig::new(None, vec![bob.public_key().to_vec()]);
///
/// let mut out = Vec::new();
/// let mut writer = MessageWriter::new(&mut out, OutputParameters::armored(), config.into())?;
/// writer.add_block(b"Sample", false)?;
/// writer.add_block(b" message.", true)?;
/// ```
pub struct MessageWriter<W: Write> {
    output: Output<W>,
    sealer: Sealer,
    mode: Mode,
    state: State,
    blocks: u64,
}

impl<W: Write> MessageWriter<W> {
    /// Validate the configuration and write the message header
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument` for bad output parameters, wrong-size keys or an
    ///   empty recipient list
    /// - `Io` if the header cannot be written
    pub fn new(output: W, params: OutputParameters, config: WriterConfig) -> Result<Self> {
        crate::init();
        params.validate()?;
        let mode = config.mode();

        let mut output = if params.armored {
            let armor = ArmorConfig::from(&params);
            Output::Armored(ArmoredWriter::new(output, ArmorMarker::for_mode(mode), &armor)?)
        } else {
            Output::Binary(output)
        };

        let sealer = match &config {
            WriterConfig::Encrypt(c) => {
                let sender = c
                    .sender_secret_key
                    .as_deref()
                    .map(EncryptionKeyPair::from_bytes)
                    .transpose()?;
                Sealer::Encrypt(EncryptionSealer::start(
                    &mut output,
                    sender.as_ref(),
                    &c.recipients,
                    c.visible_recipients,
                )?)
            }
            WriterConfig::Sign(c) => {
                let keypair = SigningKeyPair::from_bytes(&c.sender_secret_key)?;
                let sealer = SigningSealer::start(&mut output, keypair, c.detached)?;
                if c.detached {
                    Sealer::Detached(sealer)
                } else {
                    Sealer::Attached(sealer)
                }
            }
            WriterConfig::Signcrypt(c) => {
                let sender = c
                    .sender_secret_key
                    .as_deref()
                    .map(SigningKeyPair::from_bytes)
                    .transpose()?;
                Sealer::Signcrypt(SigncryptionSealer::start(&mut output, sender, &c.recipients)?)
            }
        };

        tracing::debug!(%mode, armored = params.armored, "Message writer started");

        Ok(Self {
            output,
            sealer,
            mode,
            state: State::Streaming,
            blocks: 0,
        })
    }

    /// Append one block of at most [`MAX_BLOCK_SIZE`] bytes
    ///
    /// The block with `is_final` set closes the message; the armor footer is
    /// written and the output flushed before this returns.
    ///
    /// ## Errors
    ///
    /// - `FormatError` once the final block has been added
    /// - `InvalidArgument` if `data` exceeds [`MAX_BLOCK_SIZE`]
    /// - `Io` on output failure, after which the writer is unusable
    pub fn add_block(&mut self, data: &[u8], is_final: bool) -> Result<()> {
        match self.state {
            State::Streaming => {}
            State::Finished => return Err(Error::format("Final block already added.")),
            State::Failed => return Err(Error::format("Writer stopped after an earlier error")),
        }
        if data.len() > MAX_BLOCK_SIZE {
            return Err(Error::invalid(format!(
                "Block of {} bytes exceeds the {} byte limit",
                data.len(),
                MAX_BLOCK_SIZE
            )));
        }

        match self.write_block(data, is_final) {
            Ok(()) => {
                self.blocks += 1;
                if is_final {
                    self.state = State::Finished;
                    tracing::debug!(mode = %self.mode, blocks = self.blocks, "Message complete");
                }
                Ok(())
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn write_block(&mut self, data: &[u8], is_final: bool) -> Result<()> {
        let packet = match &mut self.sealer {
            Sealer::Encrypt(s) => Some(s.seal_block(data, is_final)?),
            Sealer::Attached(s) => Some(s.seal_block(data, is_final)?),
            Sealer::Signcrypt(s) => Some(s.seal_block(data, is_final)?),
            Sealer::Detached(s) => {
                s.absorb(data)?;
                if is_final {
                    Some(s.finish_detached()?)
                } else {
                    None
                }
            }
        };
        if let Some(packet) = packet {
            write_packet(&mut self.output, &packet)?;
        }
        if is_final {
            self.output.finish()?;
        }
        Ok(())
    }

    /// The mode written in the header
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the final block has been written
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }
}

impl<W: Write> Drop for MessageWriter<W> {
    fn drop(&mut self) {
        if self.state == State::Streaming {
            tracing::warn!(
                mode = %self.mode,
                blocks = self.blocks,
                "Message writer released before its final block"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_keypair, generate_sign_keypair};

    fn encrypt_config() -> WriterConfig {
        let bob = generate_keypair().unwrap();
        EncryptConfig::new(None, vec![bob.public_key().to_vec()]).into()
    }

    #[test]
    fn test_config_modes() {
        let signer = generate_sign_keypair().unwrap();
        assert_eq!(encrypt_config().mode(), Mode::Encryption);
        assert_eq!(
            WriterConfig::from(SignConfig::attached(signer.secret_key())).mode(),
            Mode::AttachedSigning
        );
        assert_eq!(
            WriterConfig::from(SignConfig::detached(signer.secret_key())).mode(),
            Mode::DetachedSigning
        );
        assert_eq!(
            WriterConfig::from(SigncryptConfig::new(None, vec![])).mode(),
            Mode::Signcryption
        );
    }

    #[test]
    fn test_final_block_closes_writer() {
        let mut out = Vec::new();
        let mut writer =
            MessageWriter::new(&mut out, OutputParameters::binary(), encrypt_config()).unwrap();
        writer.add_block(b"abc", true).unwrap();
        assert!(writer.is_finished());

        let err = writer.add_block(b"def", false).unwrap_err();
        assert_eq!(err.to_string(), "Format error: Final block already added.");
    }

    #[test]
    fn test_oversized_block_rejected() {
        let mut out = Vec::new();
        let mut writer =
            MessageWriter::new(&mut out, OutputParameters::binary(), encrypt_config()).unwrap();
        let big = vec![0u8; MAX_BLOCK_SIZE + 1];
        assert_eq!(
            writer.add_block(&big, false).unwrap_err().kind(),
            crate::ErrorKind::InvalidArgument
        );
        writer.add_block(&big[..MAX_BLOCK_SIZE], true).unwrap();
    }

    #[test]
    fn test_armored_output_framed() {
        let mut out = Vec::new();
        let params = OutputParameters::armored().with_app("MYAPP");
        let mut writer = MessageWriter::new(&mut out, params, encrypt_config()).unwrap();
        writer.add_block(b"hello", true).unwrap();
        drop(writer);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("BEGIN MYAPP SALTPACK ENCRYPTED MESSAGE. "));
        assert!(text.ends_with(". END MYAPP SALTPACK ENCRYPTED MESSAGE."));
    }

    #[test]
    fn test_bad_keys_rejected() {
        let err = MessageWriter::new(
            Vec::new(),
            OutputParameters::binary(),
            EncryptConfig::new(None, vec![vec![0u8; 31]]).into(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);

        let err = MessageWriter::new(
            Vec::new(),
            OutputParameters::binary(),
            EncryptConfig::new(None, vec![]).into(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);

        let err = MessageWriter::new(
            Vec::new(),
            OutputParameters::binary(),
            SignConfig::attached(&[0u8; 32]).into(),
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }
}
