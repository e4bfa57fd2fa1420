//! Message header framing and the helpers shared by every mode's key
//! schedule.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           HEADER                                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  inner = CBOR [ "saltpack", [2, 0], mode, field, field, ... ]           │
//! │  wire  = CBOR bytes(inner)                                              │
//! │  hash  = SHA-512(inner)                                                 │
//! │                                                                         │
//! │  The hash is taken over the exact bytes on the wire, so the reader      │
//! │  never re-serializes and any mutation changes every derived nonce.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::io::{BufRead, Write};

use ciborium::value::Value;

use super::packet::{
    bytes_value, expect_array, expect_bytes, expect_list, expect_uint, read_packet, uint_value,
    MAX_HEADER_PACKET,
    write_packet,
};
use super::{Mode, FORMAT_VERSION};
use crate::crypto::{self, domain, secretbox_open, secretbox_seal, Nonce, PayloadKey};
use crate::error::{Error, Result};

/// A sealed or parsed header
pub struct MessageHeader {
    mode: Mode,
    fields: Vec<Value>,
    hash: [u8; 64],
}

impl MessageHeader {
    /// Serialize `fields` under the format tag and hash the result
    pub(crate) fn seal<W: Write>(out: &mut W, mode: Mode, fields: Vec<Value>) -> Result<Self> {
        let mut items = Vec::with_capacity(fields.len() + 3);
        items.push(Value::Text(domain::FORMAT_NAME.to_string()));
        items.push(Value::Array(vec![
            uint_value(FORMAT_VERSION.0),
            uint_value(FORMAT_VERSION.1),
        ]));
        items.push(uint_value(mode.code()));
        items.extend(fields.iter().cloned());

        let mut inner = Vec::new();
        ciborium::ser::into_writer(&Value::Array(items), &mut inner)?;
        let hash = crypto::sha512(&[&inner]);

        write_packet(out, &bytes_value(inner))?;

        tracing::debug!(%mode, "Header sealed");
        Ok(Self { mode, fields, hash })
    }

    /// Read and validate the header at the start of `input`
    pub(crate) fn read_from<R: BufRead>(input: &mut R) -> Result<Self> {
        let outer = read_packet(input, MAX_HEADER_PACKET)?
            .ok_or_else(|| Error::format("Missing message header"))?;
        let inner = expect_bytes(outer, "Header")?;
        let hash = crypto::sha512(&[&inner]);

        let value: Value = ciborium::de::from_reader(&inner[..])?;
        let mut items = expect_list(value, "Header")?.into_iter();

        let mut next = |what: &str| {
            items
                .next()
                .ok_or_else(|| Error::format(format!("Header is missing the {}", what)))
        };

        match next("format name")? {
            Value::Text(name) if name == domain::FORMAT_NAME => {}
            _ => return Err(Error::format("Not a saltpack message")),
        }

        let version = expect_array(next("version")?, 2, "Header version")?;
        let mut version = version.into_iter();
        let major = version.next().map(|v| expect_uint(v, "Major version")).transpose()?;
        if major != Some(FORMAT_VERSION.0) {
            return Err(Error::format(format!(
                "Unsupported format version {:?}",
                major
            )));
        }

        let mode = Mode::from_code(expect_uint(next("mode")?, "Mode")?)?;
        let fields: Vec<Value> = items.collect();

        tracing::debug!(%mode, fields = fields.len(), "Header parsed");
        Ok(Self { mode, fields, hash })
    }

    /// The message mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// SHA-512 of the serialized header
    pub fn hash(&self) -> &[u8; 64] {
        &self.hash
    }

    /// Mode-specific fields following the mode number, checked for count
    pub(crate) fn take_fields(&mut self, expected: usize) -> Result<Vec<Value>> {
        if self.fields.len() != expected {
            return Err(Error::format(format!(
                "{} header has {} fields, expected {}",
                self.mode,
                self.fields.len(),
                expected
            )));
        }
        Ok(std::mem::take(&mut self.fields))
    }
}

// ============================================================================
// SHARED KEY SCHEDULE HELPERS
// ============================================================================

/// Nonce for the payload key box of recipient `index`
pub(crate) fn recipient_nonce(index: u64) -> Nonce {
    Nonce::with_counter(domain::RECIPIENT_BOX_NONCE_PREFIX, index)
}

/// `header_hash[0..16] ‖ be64(counter)`
pub(crate) fn header_nonce(hash: &[u8; 64], counter: u64) -> Nonce {
    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&hash[..16]);
    Nonce::with_counter(&prefix, counter)
}

/// Secretbox the sender's public key under the payload key
pub(crate) fn seal_sender_key(payload_key: &PayloadKey, sender: &[u8; 32]) -> Result<Vec<u8>> {
    secretbox_seal(
        payload_key.as_bytes(),
        &Nonce::from_bytes(*domain::SENDER_KEY_SBOX_NONCE),
        sender,
    )
}

/// Open the sender secretbox
pub(crate) fn open_sender_key(payload_key: &PayloadKey, sealed: &[u8]) -> Result<[u8; 32]> {
    let sender = secretbox_open(
        payload_key.as_bytes(),
        &Nonce::from_bytes(*domain::SENDER_KEY_SBOX_NONCE),
        sealed,
    )?;
    sender
        .as_slice()
        .try_into()
        .map_err(|_| Error::format("Sender key box does not hold a 32-byte key"))
}
