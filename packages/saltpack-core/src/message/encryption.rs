//! Encryption mode: payload key wrapped per recipient with crypto_box,
//! blocks sealed with crypto_secretbox and authenticated per recipient with
//! HMAC-SHA512/256.
//!
//! ```text
//! header fields : [ ephemeral_pk, sender_secretbox, [[recipient_pk | nil, key_box], ...] ]
//! packet        : [ final, [authenticator_0, ...], payload_secretbox ]
//!
//! mac_key_i = SHA-512( last32(box(0³², nonce_a, recip_i, sender))
//!                    ‖ last32(box(0³², nonce_b, recip_i, ephemeral)) )[0..32]
//! auth_i    = HMAC(mac_key_i, SHA-512(hash ‖ nonce ‖ final ‖ secretbox))[0..32]
//! ```

use std::io::Write;

use ciborium::value::Value;
use zeroize::Zeroizing;

use super::header::{header_nonce, open_sender_key, recipient_nonce, seal_sender_key, MessageHeader};
use super::packet::{
    bytes_value, check_payload_len, expect_array, expect_bool, expect_bytes, expect_key,
    expect_list, PACKET_FRAMING,
};
use super::{key32, Mode, MAX_BLOCK_SIZE};
use crate::crypto::{
    self, box_open, box_seal, domain, hmac_sha512_256, secretbox_open, secretbox_seal,
    verify_hmac_sha512_256, EncryptionKeyPair, Nonce, PayloadKey, TAG_SIZE,
};
use crate::error::{Error, Result};

const HEADER_FIELDS: usize = 3;

/// Sealing side of an encryption-mode message
pub(crate) struct EncryptionSealer {
    payload_key: PayloadKey,
    header_hash: [u8; 64],
    mac_keys: Vec<Zeroizing<[u8; 32]>>,
    seq: u64,
}

impl EncryptionSealer {
    /// Write the header for `recipients` and prepare the block state
    ///
    /// Without a `sender` the ephemeral key stands in for it, which makes
    /// the message anonymous.
    pub(crate) fn start<W: Write>(
        out: &mut W,
        sender: Option<&EncryptionKeyPair>,
        recipients: &[Vec<u8>],
        visible_recipients: bool,
    ) -> Result<Self> {
        if recipients.is_empty() {
            return Err(Error::invalid("At least one recipient is required"));
        }
        let recipients = recipients
            .iter()
            .map(|pk| key32(pk))
            .collect::<Result<Vec<_>>>()?;

        let ephemeral = EncryptionKeyPair::generate()?;
        let sender = sender.unwrap_or(&ephemeral);
        let payload_key = PayloadKey::generate()?;

        let mut entries = Vec::with_capacity(recipients.len());
        for (i, recipient) in recipients.iter().enumerate() {
            let key_box = box_seal(
                recipient,
                &ephemeral,
                &recipient_nonce(i as u64),
                payload_key.as_bytes(),
            )?;
            let shown = if visible_recipients {
                bytes_value(recipient.to_vec())
            } else {
                Value::Null
            };
            entries.push(Value::Array(vec![shown, bytes_value(key_box)]));
        }

        let fields = vec![
            bytes_value(ephemeral.public_bytes().to_vec()),
            bytes_value(seal_sender_key(&payload_key, &sender.public_bytes())?),
            Value::Array(entries),
        ];
        let header = MessageHeader::seal(out, Mode::Encryption, fields)?;
        let header_hash = *header.hash();

        let mac_keys = recipients
            .iter()
            .enumerate()
            .map(|(i, recipient)| {
                mac_key(&header_hash, i as u64, recipient, sender, recipient, &ephemeral)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            recipients = recipients.len(),
            visible = visible_recipients,
            "Encryption header written"
        );

        Ok(Self {
            payload_key,
            header_hash,
            mac_keys,
            seq: 0,
        })
    }

    /// Seal one block into a packet
    pub(crate) fn seal_block(&mut self, chunk: &[u8], is_final: bool) -> Result<Value> {
        let nonce = Nonce::with_counter(domain::PAYLOAD_NONCE_PREFIX, self.seq);
        let sealed = secretbox_seal(self.payload_key.as_bytes(), &nonce, chunk)?;

        let digest = authenticator_digest(&self.header_hash, &nonce, is_final, &sealed);
        let authenticators = self
            .mac_keys
            .iter()
            .map(|key| bytes_value(hmac_sha512_256(&key[..], &[&digest]).to_vec()))
            .collect();

        tracing::trace!(seq = self.seq, len = chunk.len(), is_final, "Encrypted block");
        self.seq += 1;

        Ok(Value::Array(vec![
            Value::Bool(is_final),
            Value::Array(authenticators),
            bytes_value(sealed),
        ]))
    }
}

/// Opening side of an encryption-mode message
pub(crate) struct EncryptionOpener {
    payload_key: PayloadKey,
    header_hash: [u8; 64],
    mac_key: Zeroizing<[u8; 32]>,
    recipient_index: usize,
    sender: [u8; 32],
    anonymous: bool,
    recipients: Vec<Vec<u8>>,
    seq: u64,
}

impl EncryptionOpener {
    /// Find our entry in the recipient table and recover the payload key
    ///
    /// ## Errors
    ///
    /// `AuthenticationFailure` when no entry opens with `keys`.
    pub(crate) fn open(header: &mut MessageHeader, keys: &EncryptionKeyPair) -> Result<Self> {
        let header_hash = *header.hash();
        let mut fields = header.take_fields(HEADER_FIELDS)?.into_iter();
        let (Some(ephemeral), Some(sender_box), Some(table)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::format("Encryption header is incomplete"));
        };

        let ephemeral = expect_key(ephemeral, "Ephemeral key")?;
        let sender_box = expect_bytes(sender_box, "Sender box")?;

        let mut recipients = Vec::new();
        let mut key_boxes = Vec::new();
        for entry in expect_list(table, "Recipient table")? {
            let mut pair = expect_array(entry, 2, "Recipient entry")?.into_iter();
            let (Some(shown), Some(key_box)) = (pair.next(), pair.next()) else {
                return Err(Error::format("Recipient entry is incomplete"));
            };
            let shown = match shown {
                Value::Null => None,
                other => Some(expect_key(other, "Recipient key")?),
            };
            recipients.push(shown.map(|pk| pk.to_vec()).unwrap_or_default());
            key_boxes.push((shown, expect_bytes(key_box, "Payload key box")?));
        }

        let own_public = keys.public_bytes();
        let opened = key_boxes
            .iter()
            .enumerate()
            .filter(|(_, (shown, _))| shown.map_or(true, |pk| pk == own_public))
            .find_map(|(i, (_, key_box))| {
                box_open(&ephemeral, keys, &recipient_nonce(i as u64), key_box)
                    .ok()
                    .map(|key| (i, key))
            });
        let Some((recipient_index, key)) = opened else {
            return Err(Error::auth("Failed to decrypt the payload key."));
        };
        let payload_key = PayloadKey::from_slice(&Zeroizing::new(key))?;

        let sender = open_sender_key(&payload_key, &sender_box)?;
        let own_mac_key = mac_key(
            &header_hash,
            recipient_index as u64,
            &sender,
            keys,
            &ephemeral,
            keys,
        )?;

        tracing::debug!(
            recipients = recipients.len(),
            index = recipient_index,
            "Payload key recovered"
        );

        Ok(Self {
            payload_key,
            header_hash,
            mac_key: own_mac_key,
            recipient_index,
            anonymous: sender == ephemeral,
            sender,
            recipients,
            seq: 0,
        })
    }

    pub(crate) fn sender(&self) -> &[u8; 32] {
        &self.sender
    }

    pub(crate) fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// Recipient keys in header order, empty where hidden
    pub(crate) fn recipients(&self) -> &[Vec<u8>] {
        &self.recipients
    }

    /// Longest packet this message can carry: one 32-byte authenticator per
    /// recipient next to a full secretbox
    pub(crate) fn max_packet_len(&self) -> usize {
        MAX_BLOCK_SIZE + TAG_SIZE + self.recipients.len() * (32 + 2) + PACKET_FRAMING
    }

    /// Authenticate and decrypt one packet
    pub(crate) fn open_block(&mut self, packet: Value) -> Result<(Vec<u8>, bool)> {
        let mut items = expect_array(packet, 3, "Encryption packet")?.into_iter();
        let (Some(is_final), Some(authenticators), Some(sealed)) =
            (items.next(), items.next(), items.next())
        else {
            return Err(Error::format("Encryption packet is incomplete"));
        };
        let is_final = expect_bool(is_final, "Final flag")?;
        let authenticator = expect_list(authenticators, "Authenticator list")?
            .into_iter()
            .nth(self.recipient_index)
            .ok_or_else(|| Error::format("Packet lacks our authenticator"))?;
        let authenticator = expect_bytes(authenticator, "Authenticator")?;
        let sealed = expect_bytes(sealed, "Payload secretbox")?;
        check_payload_len(sealed.len(), MAX_BLOCK_SIZE + TAG_SIZE)?;

        let nonce = Nonce::with_counter(domain::PAYLOAD_NONCE_PREFIX, self.seq);
        let digest = authenticator_digest(&self.header_hash, &nonce, is_final, &sealed);
        if !verify_hmac_sha512_256(&self.mac_key[..], &[&digest], &authenticator) {
            return Err(Error::auth(format!("Block {} failed authentication", self.seq)));
        }

        let chunk = secretbox_open(self.payload_key.as_bytes(), &nonce, &sealed)?;

        tracing::trace!(seq = self.seq, len = chunk.len(), is_final, "Decrypted block");
        self.seq += 1;
        Ok((chunk, is_final))
    }
}

/// SHA-512(hash ‖ nonce ‖ final ‖ secretbox)
fn authenticator_digest(hash: &[u8; 64], nonce: &Nonce, is_final: bool, sealed: &[u8]) -> [u8; 64] {
    crypto::sha512(&[hash, nonce.as_bytes(), &[u8::from(is_final)], sealed])
}

/// Per-recipient MAC key
///
/// The writer calls this with (recipient public, sender secret, recipient
/// public, ephemeral secret); the reader with (sender public, recipient
/// secret, ephemeral public, recipient secret). Both sides agree because
/// each box only depends on the shared X25519 point.
fn mac_key(
    hash: &[u8; 64],
    index: u64,
    long_term_public: &[u8; 32],
    long_term_secret: &EncryptionKeyPair,
    ephemeral_public: &[u8; 32],
    ephemeral_secret: &EncryptionKeyPair,
) -> Result<Zeroizing<[u8; 32]>> {
    let base = header_nonce(hash, index);
    let mut nonce_a = *base.as_bytes();
    nonce_a[15] &= 0xFE;
    let mut nonce_b = *base.as_bytes();
    nonce_b[15] |= 0x01;

    let zeros = [0u8; 32];
    let box_a = Zeroizing::new(box_seal(
        long_term_public,
        long_term_secret,
        &Nonce::from_bytes(nonce_a),
        &zeros,
    )?);
    let box_b = Zeroizing::new(box_seal(
        ephemeral_public,
        ephemeral_secret,
        &Nonce::from_bytes(nonce_b),
        &zeros,
    )?);

    let digest = Zeroizing::new(crypto::sha512(&[&box_a[box_a.len() - 32..], &box_b[box_b.len() - 32..]]));
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&digest[..32]);
    Ok(key)
}
