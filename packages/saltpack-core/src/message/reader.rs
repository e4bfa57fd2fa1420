//! Message reader.
//!
//! ```text
//!   R ──► [ArmoredReader] ──► BufReader ──► header ──► opener
//!                                  │
//!                                  └──► get_block() ──► packet ──► chunk
//! ```
//!
//! The reader verifies each block before handing it out, so a caller
//! consuming blocks as they arrive never sees unauthenticated plaintext.
//! Reaching the end of input before the final block is an error.

use std::io::{self, BufReader, Read};

use zeroize::Zeroize;

use super::encryption::EncryptionOpener;
use super::header::MessageHeader;
use super::packet::read_packet;
use super::signcryption::{SigncryptionKeys, SigncryptionOpener, MAX_SIGNCRYPTION_PACKET};
use super::signing::{SigningVerifier, MAX_ATTACHED_PACKET, MAX_DETACHED_PACKET};
use super::{key32, Mode};
use crate::armor::{ArmorMarker, ArmoredReader};
use crate::config::InputParameters;
use crate::crypto::EncryptionKeyPair;
use crate::error::{Error, Result};

/// Keys a [`MessageReader`] opens its message with
pub enum ReaderKeys {
    /// 32-byte X25519 secret key of an encryption recipient
    ///
    /// Also accepted for signcryption, as a box recipient.
    Decrypt {
        /// The recipient's secret key
        secret_key: Vec<u8>,
    },
    /// Attached signing; the sender's key travels in the header
    Verify,
    /// Signcryption: a box secret key, a symmetric `(identifier, key)`, or both
    Signcrypt {
        /// 32-byte X25519 secret key of a box recipient
        secret_key: Option<Vec<u8>>,
        /// Identifier and 32-byte key of a symmetric recipient
        symmetric: Option<(Vec<u8>, Vec<u8>)>,
    },
}

impl ReaderKeys {
    /// Encryption or signcryption recipient holding an X25519 secret key
    pub fn decrypt(secret_key: &[u8]) -> Self {
        ReaderKeys::Decrypt {
            secret_key: secret_key.to_vec(),
        }
    }

    /// Signcryption recipient holding a shared symmetric key
    pub fn symmetric(identifier: &[u8], key: &[u8]) -> Self {
        ReaderKeys::Signcrypt {
            secret_key: None,
            symmetric: Some((identifier.to_vec(), key.to_vec())),
        }
    }
}

impl Drop for ReaderKeys {
    fn drop(&mut self) {
        match self {
            ReaderKeys::Decrypt { secret_key } => secret_key.zeroize(),
            ReaderKeys::Verify => {}
            ReaderKeys::Signcrypt {
                secret_key,
                symmetric,
            } => {
                secret_key.zeroize();
                if let Some((_, key)) = symmetric {
                    key.zeroize();
                }
            }
        }
    }
}

enum Input<R: Read> {
    Binary(R),
    Armored(ArmoredReader<R>),
}

impl<R: Read> Read for Input<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Binary(r) => r.read(buf),
            Input::Armored(r) => r.read(buf),
        }
    }
}

enum Opener {
    Decrypt(EncryptionOpener),
    Attached(SigningVerifier),
    Detached(SigningVerifier),
    Signcrypt(SigncryptionOpener),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Done,
    Failed,
}

/// Reads one message from `R`, yielding verified blocks
pub struct MessageReader<R: Read> {
    input: BufReader<Input<R>>,
    opener: Opener,
    mode: Mode,
    state: State,
    blocks: u64,
}

impl<R: Read> MessageReader<R> {
    /// Parse the header and unlock the message with `keys`
    ///
    /// ## Errors
    ///
    /// - `FormatError` for a malformed header, an armor mismatch, or a
    ///   message whose mode the keys do not fit
    /// - `AuthenticationFailure` when no recipient entry opens with `keys`
    /// - `InvalidArgument` for wrong-size keys
    pub fn new(input: R, params: InputParameters, keys: ReaderKeys) -> Result<Self> {
        let (input, mut header) = open_input(input, &params)?;
        let mode = header.mode();

        let opener = match (mode, &keys) {
            (Mode::Encryption, ReaderKeys::Decrypt { secret_key }) => {
                let keypair = EncryptionKeyPair::from_bytes(secret_key)?;
                Opener::Decrypt(EncryptionOpener::open(&mut header, &keypair)?)
            }
            (Mode::AttachedSigning, ReaderKeys::Verify) => {
                Opener::Attached(SigningVerifier::open(&mut header)?)
            }
            (Mode::DetachedSigning, ReaderKeys::Verify) => {
                return Err(Error::invalid(
                    "A detached signature needs the signed message to verify against",
                ));
            }
            (Mode::Signcryption, ReaderKeys::Decrypt { secret_key }) => {
                let keypair = EncryptionKeyPair::from_bytes(secret_key)?;
                let keys = SigncryptionKeys {
                    box_secret: Some(&keypair),
                    symmetric: None,
                };
                Opener::Signcrypt(SigncryptionOpener::open(&mut header, keys)?)
            }
            (
                Mode::Signcryption,
                ReaderKeys::Signcrypt {
                    secret_key,
                    symmetric,
                },
            ) => {
                let keypair = secret_key
                    .as_deref()
                    .map(EncryptionKeyPair::from_bytes)
                    .transpose()?;
                let symmetric_key = symmetric
                    .as_ref()
                    .map(|(_, key)| key32(key))
                    .transpose()?
                    .map(zeroize::Zeroizing::new);
                let keys = SigncryptionKeys {
                    box_secret: keypair.as_ref(),
                    symmetric: symmetric
                        .as_ref()
                        .zip(symmetric_key.as_deref())
                        .map(|((id, _), key)| (id.as_slice(), key)),
                };
                Opener::Signcrypt(SigncryptionOpener::open(&mut header, keys)?)
            }
            (mode, _) => {
                return Err(Error::format(format!(
                    "Cannot open a {} message with the supplied keys",
                    mode
                )));
            }
        };

        Ok(Self {
            input,
            opener,
            mode,
            state: State::Streaming,
            blocks: 0,
        })
    }

    /// Verify a detached signature read from `input` against `message`
    ///
    /// Verification completes here; the returned reader has no blocks and
    /// only answers metadata queries.
    ///
    /// ## Errors
    ///
    /// `AuthenticationFailure` if the signature does not cover `message`.
    pub fn with_detached_message<M: Read>(
        input: R,
        params: InputParameters,
        message: M,
    ) -> Result<Self> {
        let (mut input, mut header) = open_input(input, &params)?;
        let mode = header.mode();
        if mode != Mode::DetachedSigning {
            return Err(Error::format(format!(
                "Expected a detached signature, found a {} message",
                mode
            )));
        }

        let verifier = SigningVerifier::open(&mut header)?;
        let packet = read_packet(&mut input, MAX_DETACHED_PACKET)?
            .ok_or_else(|| Error::format("Message truncated: no final block found."))?;
        verifier.verify_detached(packet, message)?;
        finish_input(&mut input)?;

        Ok(Self {
            input,
            opener: Opener::Detached(verifier),
            mode,
            state: State::Done,
            blocks: 0,
        })
    }

    /// Whether the final block is still to come
    pub fn has_more_blocks(&self) -> bool {
        self.state == State::Streaming
    }

    /// Read, verify and return the next block
    ///
    /// ## Errors
    ///
    /// - `FormatError("No more blocks available.")` after the final block
    /// - `FormatError("Message truncated: no final block found.")` when the
    ///   input ends early
    /// - `AuthenticationFailure` for a tampered, reordered or foreign block
    ///
    /// Any error ends the message; later calls fail.
    pub fn get_block(&mut self) -> Result<Vec<u8>> {
        match self.state {
            State::Streaming => {}
            State::Done => return Err(Error::format("No more blocks available.")),
            State::Failed => return Err(Error::format("Reader stopped after an earlier error")),
        }

        match self.read_block() {
            Ok(chunk) => Ok(chunk),
            Err(e) => {
                self.state = State::Failed;
                tracing::debug!(mode = %self.mode, block = self.blocks, error = %e, "Block rejected");
                Err(e)
            }
        }
    }

    fn read_block(&mut self) -> Result<Vec<u8>> {
        let max_len = match &self.opener {
            Opener::Decrypt(o) => o.max_packet_len(),
            Opener::Attached(_) => MAX_ATTACHED_PACKET,
            Opener::Signcrypt(_) => MAX_SIGNCRYPTION_PACKET,
            Opener::Detached(_) => MAX_DETACHED_PACKET,
        };
        let packet = read_packet(&mut self.input, max_len)?
            .ok_or_else(|| Error::format("Message truncated: no final block found."))?;

        let (chunk, is_final) = match &mut self.opener {
            Opener::Decrypt(o) => o.open_block(packet)?,
            Opener::Attached(v) => v.open_block(packet)?,
            Opener::Signcrypt(o) => o.open_block(packet)?,
            Opener::Detached(_) => return Err(Error::Internal("detached reader has no blocks".into())),
        };
        self.blocks += 1;

        if is_final {
            finish_input(&mut self.input)?;
            self.state = State::Done;
            tracing::debug!(mode = %self.mode, blocks = self.blocks, "Message verified");
        }
        Ok(chunk)
    }

    /// Iterate over the remaining blocks
    pub fn blocks(&mut self) -> Blocks<'_, R> {
        Blocks { reader: self }
    }

    /// The mode announced by the header
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The sender's public key
    ///
    /// For anonymous encryption this is the ephemeral key; for anonymous
    /// signcryption it is 32 zero bytes.
    pub fn sender(&self) -> &[u8] {
        match &self.opener {
            Opener::Decrypt(o) => o.sender().as_slice(),
            Opener::Attached(v) | Opener::Detached(v) => v.sender().as_slice(),
            Opener::Signcrypt(o) => o.sender().as_slice(),
        }
    }

    /// Recipient public keys (empty where hidden) or signcryption
    /// identifiers, in header order
    pub fn recipients(&self) -> &[Vec<u8>] {
        match &self.opener {
            Opener::Decrypt(o) => o.recipients(),
            Opener::Attached(_) | Opener::Detached(_) => &[],
            Opener::Signcrypt(o) => o.recipients(),
        }
    }

    /// Whether the sender deliberately withheld their identity
    pub fn is_intentionally_anonymous(&self) -> bool {
        match &self.opener {
            Opener::Decrypt(o) => o.is_anonymous(),
            Opener::Attached(_) | Opener::Detached(_) => false,
            Opener::Signcrypt(o) => o.is_anonymous(),
        }
    }
}

/// Iterator over a reader's remaining blocks
///
/// Yields each verified block, stopping after the final one or after the
/// first error.
pub struct Blocks<'a, R: Read> {
    reader: &'a mut MessageReader<R>,
}

impl<R: Read> Iterator for Blocks<'_, R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.reader.has_more_blocks() {
            return None;
        }
        Some(self.reader.get_block())
    }
}

impl<R: Read> std::iter::FusedIterator for Blocks<'_, R> {}

/// Set up the input framing and parse the header
fn open_input<R: Read>(
    input: R,
    params: &InputParameters,
) -> Result<(BufReader<Input<R>>, MessageHeader)> {
    crate::init();
    params.validate()?;

    let input = if params.armored {
        Input::Armored(ArmoredReader::new(input, params.app.as_deref())?)
    } else {
        Input::Binary(input)
    };
    let mut input = BufReader::new(input);
    let header = MessageHeader::read_from(&mut input)?;

    if let Input::Armored(armor) = input.get_ref() {
        let expected = ArmorMarker::for_mode(header.mode());
        if armor.marker() != expected {
            return Err(Error::format(format!(
                "Armor says {} but the header is a {} message",
                armor.marker(),
                header.mode()
            )));
        }
    }

    Ok((input, header))
}

/// After the final packet, armored input must hold nothing but the footer
///
/// Binary input is left alone: whatever follows the final packet belongs
/// to the caller's stream.
fn finish_input<R: Read>(input: &mut BufReader<Input<R>>) -> Result<()> {
    if matches!(input.get_ref(), Input::Binary(_)) {
        return Ok(());
    }
    if !input.buffer().is_empty() {
        return Err(Error::format("Trailing data after the final block"));
    }
    if let Input::Armored(armor) = input.get_mut() {
        armor.finish()?;
    }
    Ok(())
}
