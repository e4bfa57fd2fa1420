//! Signcryption: encryption to mixed public-key and symmetric recipients,
//! with the sender's Ed25519 signature sealed inside every block.
//!
//! ```text
//! header fields : [ ephemeral_pk, sender_secretbox, [[identifier, key_box], ...] ]
//!
//! box recipient i        dh         = X25519(ephemeral, recipient)
//!                        identifier = HMAC("...box key identifier", dh ‖ nonce_i)
//!                        wrap_key   = HMAC("...derived symmetric key", dh ‖ nonce_i)
//! symmetric recipient i  identifier = caller's id
//!                        wrap_key   = HMAC("...derived symmetric key", ephemeral_pk ‖ key)
//! key_box                = secretbox(payload_key, nonce_i, wrap_key)
//!
//! packet : [ secretbox(signature ‖ chunk, nonce, payload_key), final ]
//!     nonce     = hash[0..16] ‖ be64(seq << 1 | final)
//!     signature = Ed25519("saltpack encrypted signature\0"
//!                         ‖ SHA-512(hash ‖ nonce ‖ final ‖ SHA-512(chunk)))
//! ```
//!
//! An anonymous sender seals 32 zero bytes as its key and 64 zero bytes as
//! every signature. The final flag is folded into the nonce, so flipping it
//! breaks decryption.

use std::io::Write;

use ciborium::value::Value;
use zeroize::Zeroizing;

use super::header::{header_nonce, open_sender_key, recipient_nonce, seal_sender_key, MessageHeader};
use super::packet::{
    bytes_value, check_payload_len, expect_array, expect_bool, expect_bytes, expect_key,
    expect_list, PACKET_FRAMING,
};
use super::{key32, Mode, RecipientEntry, MAX_BLOCK_SIZE};
use crate::crypto::{
    self, domain, hmac_sha512_256, secretbox_open, secretbox_seal, sign, verify,
    verify_hmac_sha512_256, EncryptionKeyPair, Nonce, PayloadKey, Signature, SigningKeyPair,
    SIGNATURE_SIZE, TAG_SIZE,
};
use crate::error::{Error, Result};

const HEADER_FIELDS: usize = 3;

/// Longest signcryption packet on the wire
pub(crate) const MAX_SIGNCRYPTION_PACKET: usize =
    MAX_BLOCK_SIZE + SIGNATURE_SIZE + TAG_SIZE + PACKET_FRAMING;

/// Sender key placeholder for anonymous messages
const ANONYMOUS_SENDER: [u8; 32] = [0u8; 32];

/// Sealing side of a signcrypted message
pub(crate) struct SigncryptionSealer {
    payload_key: PayloadKey,
    header_hash: [u8; 64],
    sender: Option<SigningKeyPair>,
    seq: u64,
}

impl SigncryptionSealer {
    pub(crate) fn start<W: Write>(
        out: &mut W,
        sender: Option<SigningKeyPair>,
        recipients: &[RecipientEntry],
    ) -> Result<Self> {
        if recipients.is_empty() {
            return Err(Error::invalid("At least one recipient is required"));
        }

        let ephemeral = EncryptionKeyPair::generate()?;
        let ephemeral_public = ephemeral.public_bytes();
        let payload_key = PayloadKey::generate()?;

        let mut entries = Vec::with_capacity(recipients.len());
        for (i, recipient) in recipients.iter().enumerate() {
            let nonce = recipient_nonce(i as u64);
            let (identifier, wrap_key) = match recipient {
                RecipientEntry::PublicKey(pk) => {
                    let dh = ephemeral.diffie_hellman(&key32(pk)?);
                    box_recipient_keys(&dh, &nonce)
                }
                RecipientEntry::Symmetric { identifier, key } => {
                    let key = key32(key).map(Zeroizing::new)?;
                    (identifier.clone(), symmetric_wrap_key(&ephemeral_public, &key))
                }
            };
            let key_box = secretbox_seal(&wrap_key, &nonce, payload_key.as_bytes())?;
            entries.push(Value::Array(vec![bytes_value(identifier), bytes_value(key_box)]));
        }

        let sender_public = sender
            .as_ref()
            .map(|kp| kp.public_bytes())
            .unwrap_or(ANONYMOUS_SENDER);
        let fields = vec![
            bytes_value(ephemeral_public.to_vec()),
            bytes_value(seal_sender_key(&payload_key, &sender_public)?),
            Value::Array(entries),
        ];
        let header = MessageHeader::seal(out, Mode::Signcryption, fields)?;

        tracing::debug!(
            recipients = recipients.len(),
            anonymous = sender.is_none(),
            "Signcryption header written"
        );

        Ok(Self {
            payload_key,
            header_hash: *header.hash(),
            sender,
            seq: 0,
        })
    }

    pub(crate) fn seal_block(&mut self, chunk: &[u8], is_final: bool) -> Result<Value> {
        let nonce = block_nonce(&self.header_hash, self.seq, is_final);
        let signature = match &self.sender {
            Some(keypair) => {
                let digest = signature_digest(&self.header_hash, &nonce, is_final, chunk);
                sign(keypair, domain::ENCRYPTED_SIGNATURE, &digest)
            }
            None => Signature::ZERO,
        };

        let mut plaintext = Zeroizing::new(Vec::with_capacity(SIGNATURE_SIZE + chunk.len()));
        plaintext.extend_from_slice(signature.as_bytes());
        plaintext.extend_from_slice(chunk);
        let sealed = secretbox_seal(self.payload_key.as_bytes(), &nonce, &plaintext)?;

        tracing::trace!(seq = self.seq, len = chunk.len(), is_final, "Signcrypted block");
        self.seq += 1;

        Ok(Value::Array(vec![bytes_value(sealed), Value::Bool(is_final)]))
    }
}

/// Keys a signcryption reader may try against the recipient table
pub(crate) struct SigncryptionKeys<'a> {
    pub box_secret: Option<&'a EncryptionKeyPair>,
    pub symmetric: Option<(&'a [u8], &'a [u8; 32])>,
}

/// Opening side of a signcrypted message
pub(crate) struct SigncryptionOpener {
    payload_key: PayloadKey,
    header_hash: [u8; 64],
    sender: [u8; 32],
    recipients: Vec<Vec<u8>>,
    seq: u64,
}

impl SigncryptionOpener {
    pub(crate) fn open(header: &mut MessageHeader, keys: SigncryptionKeys<'_>) -> Result<Self> {
        if keys.box_secret.is_none() && keys.symmetric.is_none() {
            return Err(Error::invalid("A secret key or a symmetric key is required"));
        }

        let header_hash = *header.hash();
        let mut fields = header.take_fields(HEADER_FIELDS)?.into_iter();
        let (Some(ephemeral), Some(sender_box), Some(table)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::format("Signcryption header is incomplete"));
        };
        let ephemeral = expect_key(ephemeral, "Ephemeral key")?;
        let sender_box = expect_bytes(sender_box, "Sender box")?;

        let mut entries = Vec::new();
        for entry in expect_list(table, "Recipient table")? {
            let mut pair = expect_array(entry, 2, "Recipient entry")?.into_iter();
            let (Some(identifier), Some(key_box)) = (pair.next(), pair.next()) else {
                return Err(Error::format("Recipient entry is incomplete"));
            };
            entries.push((
                expect_bytes(identifier, "Recipient identifier")?,
                expect_bytes(key_box, "Payload key box")?,
            ));
        }

        let dh = keys.box_secret.map(|kp| kp.diffie_hellman(&ephemeral));
        let symmetric_wrap = keys
            .symmetric
            .map(|(id, key)| (id, symmetric_wrap_key(&ephemeral, key)));

        let mut payload_key = None;
        for (i, (identifier, key_box)) in entries.iter().enumerate() {
            let nonce = recipient_nonce(i as u64);

            if let Some(dh) = &dh {
                let expected_id = box_identifier_parts(dh, &nonce);
                if verify_hmac_sha512_256(
                    domain::SIGNCRYPTION_BOX_KEY_IDENTIFIER,
                    &[&expected_id[..]],
                    identifier,
                ) {
                    let (_, wrap_key) = box_recipient_keys(dh, &nonce);
                    if let Ok(key) = secretbox_open(&wrap_key, &nonce, key_box) {
                        payload_key = Some(Zeroizing::new(key));
                        break;
                    }
                }
            }

            if let Some((id, wrap_key)) = &symmetric_wrap {
                if identifier.as_slice() == *id {
                    if let Ok(key) = secretbox_open(wrap_key, &nonce, key_box) {
                        payload_key = Some(Zeroizing::new(key));
                        break;
                    }
                }
            }
        }
        let Some(payload_key) = payload_key else {
            return Err(Error::auth("Failed to decrypt the payload key."));
        };
        let payload_key = PayloadKey::from_slice(&payload_key)?;

        let sender = open_sender_key(&payload_key, &sender_box)?;

        tracing::debug!(
            recipients = entries.len(),
            anonymous = sender == ANONYMOUS_SENDER,
            "Payload key recovered"
        );

        Ok(Self {
            payload_key,
            header_hash,
            sender,
            recipients: entries.into_iter().map(|(identifier, _)| identifier).collect(),
            seq: 0,
        })
    }

    /// The sender's signing key, or 32 zero bytes if anonymous
    pub(crate) fn sender(&self) -> &[u8; 32] {
        &self.sender
    }

    pub(crate) fn is_anonymous(&self) -> bool {
        self.sender == ANONYMOUS_SENDER
    }

    /// Recipient identifiers in header order
    pub(crate) fn recipients(&self) -> &[Vec<u8>] {
        &self.recipients
    }

    pub(crate) fn open_block(&mut self, packet: Value) -> Result<(Vec<u8>, bool)> {
        let mut items = expect_array(packet, 2, "Signcryption packet")?.into_iter();
        let (Some(sealed), Some(is_final)) = (items.next(), items.next()) else {
            return Err(Error::format("Signcryption packet is incomplete"));
        };
        let sealed = expect_bytes(sealed, "Signcrypted payload")?;
        let is_final = expect_bool(is_final, "Final flag")?;
        check_payload_len(sealed.len(), MAX_BLOCK_SIZE + SIGNATURE_SIZE + TAG_SIZE)?;

        let nonce = block_nonce(&self.header_hash, self.seq, is_final);
        let mut plaintext = secretbox_open(self.payload_key.as_bytes(), &nonce, &sealed)
            .map_err(|_| Error::auth(format!("Block {} failed authentication", self.seq)))?;
        if plaintext.len() < SIGNATURE_SIZE {
            return Err(Error::format("Signcrypted block shorter than its signature"));
        }
        let chunk = plaintext.split_off(SIGNATURE_SIZE);

        if !self.is_anonymous() {
            let signature = Signature::from_slice(&plaintext)?;
            let digest = signature_digest(&self.header_hash, &nonce, is_final, &chunk);
            verify(&self.sender, domain::ENCRYPTED_SIGNATURE, &digest, &signature)
                .map_err(|_| Error::auth(format!("Block {} has an invalid signature", self.seq)))?;
        }

        tracing::trace!(seq = self.seq, len = chunk.len(), is_final, "Opened signcrypted block");
        self.seq += 1;
        Ok((chunk, is_final))
    }
}

/// `hash[0..16] ‖ be64(seq << 1 | final)`
fn block_nonce(hash: &[u8; 64], seq: u64, is_final: bool) -> Nonce {
    header_nonce(hash, (seq << 1) | u64::from(is_final))
}

/// SHA-512(hash ‖ nonce ‖ final ‖ SHA-512(chunk))
fn signature_digest(hash: &[u8; 64], nonce: &Nonce, is_final: bool, chunk: &[u8]) -> [u8; 64] {
    let chunk_hash = crypto::sha512(&[chunk]);
    crypto::sha512(&[hash, nonce.as_bytes(), &[u8::from(is_final)], &chunk_hash])
}

/// `dh ‖ nonce`, the HMAC input for box-recipient derivations
fn box_identifier_parts(dh: &[u8; 32], nonce: &Nonce) -> Zeroizing<Vec<u8>> {
    let mut parts = Zeroizing::new(Vec::with_capacity(32 + 24));
    parts.extend_from_slice(dh);
    parts.extend_from_slice(nonce.as_bytes());
    parts
}

/// (identifier, wrapping key) for a box recipient
fn box_recipient_keys(dh: &[u8; 32], nonce: &Nonce) -> (Vec<u8>, Zeroizing<[u8; 32]>) {
    let parts = box_identifier_parts(dh, nonce);
    let identifier = hmac_sha512_256(domain::SIGNCRYPTION_BOX_KEY_IDENTIFIER, &[&parts[..]]);
    let wrap_key = hmac_sha512_256(domain::SIGNCRYPTION_DERIVED_SYMMETRIC_KEY, &[&parts[..]]);
    (identifier.to_vec(), wrap_key)
}

fn symmetric_wrap_key(ephemeral_public: &[u8; 32], key: &[u8; 32]) -> Zeroizing<[u8; 32]> {
    hmac_sha512_256(
        domain::SIGNCRYPTION_DERIVED_SYMMETRIC_KEY,
        &[ephemeral_public, key],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn keys<'a>(
        box_secret: Option<&'a EncryptionKeyPair>,
        symmetric: Option<(&'a [u8], &'a [u8; 32])>,
    ) -> SigncryptionKeys<'a> {
        SigncryptionKeys {
            box_secret,
            symmetric,
        }
    }

    #[test]
    fn test_mixed_recipients_each_open() {
        let sender = SigningKeyPair::generate().unwrap();
        let sender_public = sender.public_bytes();
        let bob = EncryptionKeyPair::generate().unwrap();
        let shared = [42u8; 32];

        let recipients = vec![
            RecipientEntry::Symmetric {
                identifier: b"team-key".to_vec(),
                key: shared.to_vec(),
            },
            RecipientEntry::PublicKey(bob.public_bytes().to_vec()),
        ];
        let mut wire = Vec::new();
        let mut sealer = SigncryptionSealer::start(&mut wire, Some(sender), &recipients).unwrap();
        let packet = sealer.seal_block(b"secret", true).unwrap();

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let mut by_box = SigncryptionOpener::open(&mut header, keys(Some(&bob), None)).unwrap();
        assert_eq!(by_box.sender(), &sender_public);
        assert!(!by_box.is_anonymous());
        assert_eq!(by_box.recipients()[0], b"team-key");
        assert_eq!(by_box.recipients()[1].len(), 32);
        assert_eq!(by_box.open_block(packet.clone()).unwrap(), (b"secret".to_vec(), true));

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let mut by_key =
            SigncryptionOpener::open(&mut header, keys(None, Some((&b"team-key"[..], &shared)))).unwrap();
        assert_eq!(by_key.open_block(packet).unwrap().0, b"secret");
    }

    #[test]
    fn test_anonymous_sender() {
        let bob = EncryptionKeyPair::generate().unwrap();
        let mut wire = Vec::new();
        let mut sealer = SigncryptionSealer::start(
            &mut wire,
            None,
            &[RecipientEntry::PublicKey(bob.public_bytes().to_vec())],
        )
        .unwrap();
        let packet = sealer.seal_block(b"who sent this?", true).unwrap();

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let mut opener = SigncryptionOpener::open(&mut header, keys(Some(&bob), None)).unwrap();
        assert!(opener.is_anonymous());
        assert_eq!(opener.sender(), &[0u8; 32]);
        assert_eq!(opener.open_block(packet).unwrap().0, b"who sent this?");
    }

    #[test]
    fn test_wrong_symmetric_key_fails() {
        let mut wire = Vec::new();
        SigncryptionSealer::start(
            &mut wire,
            None,
            &[RecipientEntry::Symmetric {
                identifier: vec![],
                key: vec![1u8; 32],
            }],
        )
        .unwrap();

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let err = SigncryptionOpener::open(&mut header, keys(None, Some((&b""[..], &[2u8; 32]))))
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_flipped_final_flag_fails() {
        let bob = EncryptionKeyPair::generate().unwrap();
        let mut wire = Vec::new();
        let mut sealer = SigncryptionSealer::start(
            &mut wire,
            None,
            &[RecipientEntry::PublicKey(bob.public_bytes().to_vec())],
        )
        .unwrap();
        let packet = sealer.seal_block(b"more follows", false).unwrap();
        let Value::Array(mut items) = packet else { unreachable!() };
        items[1] = Value::Bool(true);

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let mut opener = SigncryptionOpener::open(&mut header, keys(Some(&bob), None)).unwrap();
        let err = opener.open_block(Value::Array(items)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_bad_recipient_key_sizes() {
        let err = SigncryptionSealer::start(
            &mut Vec::new(),
            None,
            &[RecipientEntry::Symmetric {
                identifier: vec![1],
                key: vec![0u8; 16],
            }],
        )
        .err()
        .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);

        let err = SigncryptionSealer::start(&mut Vec::new(), None, &[RecipientEntry::PublicKey(vec![])])
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_no_keys_rejected() {
        let bob = EncryptionKeyPair::generate().unwrap();
        let mut wire = Vec::new();
        SigncryptionSealer::start(
            &mut wire,
            None,
            &[RecipientEntry::PublicKey(bob.public_bytes().to_vec())],
        )
        .unwrap();
        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let err = SigncryptionOpener::open(&mut header, keys(None, None)).err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }
}
