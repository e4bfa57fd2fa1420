//! Attached and detached signing.
//!
//! ```text
//! header fields : [ sender_sign_pk, random_nonce32 ]
//!
//! attached packet : [ final, signature, chunk ]
//!     signature = Ed25519("saltpack attached signature\0"
//!                         ‖ SHA-512(hash ‖ be64(seq) ‖ final ‖ chunk))
//!
//! detached packet : signature
//!     signature = Ed25519("saltpack detached signature\0"
//!                         ‖ SHA-512(hash ‖ plaintext))
//! ```
//!
//! The random header nonce makes every header hash unique, so two messages
//! with identical content still carry unrelated signatures.

use std::io::{Read, Write};

use ciborium::value::Value;
use sha2::{Digest, Sha512};

use super::header::MessageHeader;
use super::packet::{
    bytes_value, check_payload_len, expect_array, expect_bool, expect_bytes, expect_key,
    PACKET_FRAMING,
};
use super::{Mode, MAX_BLOCK_SIZE};
use crate::crypto::{
    self, domain, fill_random, sign, verify, Signature, SigningKeyPair, SIGNATURE_SIZE,
};
use crate::error::{Error, Result};

const HEADER_FIELDS: usize = 2;

/// Longest attached packet on the wire
pub(crate) const MAX_ATTACHED_PACKET: usize = MAX_BLOCK_SIZE + SIGNATURE_SIZE + PACKET_FRAMING;

/// The single detached signature packet
pub(crate) const MAX_DETACHED_PACKET: usize = SIGNATURE_SIZE + PACKET_FRAMING;

/// Sealing side of a signed message
pub(crate) struct SigningSealer {
    keypair: SigningKeyPair,
    header_hash: [u8; 64],
    seq: u64,
    /// Running digest, detached mode only
    detached: Option<Sha512>,
}

impl SigningSealer {
    pub(crate) fn start<W: Write>(
        out: &mut W,
        keypair: SigningKeyPair,
        detached: bool,
    ) -> Result<Self> {
        let mut nonce = [0u8; 32];
        fill_random(&mut nonce)?;

        let mode = if detached {
            Mode::DetachedSigning
        } else {
            Mode::AttachedSigning
        };
        let fields = vec![
            bytes_value(keypair.public_bytes().to_vec()),
            bytes_value(nonce.to_vec()),
        ];
        let header = MessageHeader::seal(out, mode, fields)?;
        let header_hash = *header.hash();

        let detached = detached.then(|| {
            let mut digest = Sha512::new();
            digest.update(header_hash);
            digest
        });

        Ok(Self {
            keypair,
            header_hash,
            seq: 0,
            detached,
        })
    }

    /// Sign one block into an attached packet
    pub(crate) fn seal_block(&mut self, chunk: &[u8], is_final: bool) -> Result<Value> {
        let digest = attached_digest(&self.header_hash, self.seq, is_final, chunk);
        let signature = sign(&self.keypair, domain::ATTACHED_SIGNATURE, &digest);

        tracing::trace!(seq = self.seq, len = chunk.len(), is_final, "Signed block");
        self.seq += 1;

        Ok(Value::Array(vec![
            Value::Bool(is_final),
            bytes_value(signature.as_bytes().to_vec()),
            bytes_value(chunk.to_vec()),
        ]))
    }

    /// Fold one block into the detached digest
    pub(crate) fn absorb(&mut self, chunk: &[u8]) -> Result<()> {
        let digest = self
            .detached
            .as_mut()
            .ok_or_else(|| Error::Internal("absorb on an attached signer".into()))?;
        digest.update(chunk);
        self.seq += 1;
        Ok(())
    }

    /// The single detached signature packet
    pub(crate) fn finish_detached(&mut self) -> Result<Value> {
        let digest = self
            .detached
            .take()
            .ok_or_else(|| Error::Internal("detached signature already produced".into()))?;
        let digest = finalize(digest);
        let signature = sign(&self.keypair, domain::DETACHED_SIGNATURE, &digest);

        tracing::trace!(blocks = self.seq, "Detached signature produced");
        Ok(bytes_value(signature.as_bytes().to_vec()))
    }
}

/// Verifying side of a signed message
pub(crate) struct SigningVerifier {
    sender: [u8; 32],
    header_hash: [u8; 64],
    seq: u64,
}

impl SigningVerifier {
    pub(crate) fn open(header: &mut MessageHeader) -> Result<Self> {
        let header_hash = *header.hash();
        let mut fields = header.take_fields(HEADER_FIELDS)?.into_iter();
        let (Some(sender), Some(nonce)) = (fields.next(), fields.next()) else {
            return Err(Error::format("Signing header is incomplete"));
        };
        let sender = expect_key(sender, "Sender key")?;
        expect_key(nonce, "Header nonce")?;

        Ok(Self {
            sender,
            header_hash,
            seq: 0,
        })
    }

    pub(crate) fn sender(&self) -> &[u8; 32] {
        &self.sender
    }

    /// Verify one attached packet, returning its chunk
    pub(crate) fn open_block(&mut self, packet: Value) -> Result<(Vec<u8>, bool)> {
        let mut items = expect_array(packet, 3, "Signature packet")?.into_iter();
        let (Some(is_final), Some(signature), Some(chunk)) =
            (items.next(), items.next(), items.next())
        else {
            return Err(Error::format("Signature packet is incomplete"));
        };
        let is_final = expect_bool(is_final, "Final flag")?;
        let signature = Signature::from_slice(&expect_bytes(signature, "Signature")?)?;
        let chunk = expect_bytes(chunk, "Payload")?;
        check_payload_len(chunk.len(), MAX_BLOCK_SIZE)?;

        let digest = attached_digest(&self.header_hash, self.seq, is_final, &chunk);
        verify(&self.sender, domain::ATTACHED_SIGNATURE, &digest, &signature)
            .map_err(|_| Error::auth(format!("Block {} has an invalid signature", self.seq)))?;

        tracing::trace!(seq = self.seq, len = chunk.len(), is_final, "Verified block");
        self.seq += 1;
        Ok((chunk, is_final))
    }

    /// Verify the detached signature packet against `message`
    pub(crate) fn verify_detached<M: Read>(&self, packet: Value, mut message: M) -> Result<()> {
        let signature = Signature::from_slice(&expect_bytes(packet, "Detached signature")?)?;

        let mut digest = Sha512::new();
        digest.update(self.header_hash);
        let total = std::io::copy(&mut message, &mut digest)?;

        verify(&self.sender, domain::DETACHED_SIGNATURE, &finalize(digest), &signature)?;
        tracing::debug!(len = total, "Detached signature verified");
        Ok(())
    }
}

/// SHA-512(hash ‖ be64(seq) ‖ final ‖ chunk)
fn attached_digest(hash: &[u8; 64], seq: u64, is_final: bool, chunk: &[u8]) -> [u8; 64] {
    crypto::sha512(&[hash, &seq.to_be_bytes(), &[u8::from(is_final)], chunk])
}

fn finalize(digest: Sha512) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&digest.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_attached_roundtrip() {
        let keypair = SigningKeyPair::generate().unwrap();
        let public = keypair.public_bytes();
        let mut wire = Vec::new();
        let mut sealer = SigningSealer::start(&mut wire, keypair, false).unwrap();
        let p0 = sealer.seal_block(b"one", false).unwrap();
        let p1 = sealer.seal_block(b"two", true).unwrap();

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        assert_eq!(header.mode(), Mode::AttachedSigning);
        let mut verifier = SigningVerifier::open(&mut header).unwrap();
        assert_eq!(verifier.sender(), &public);
        assert_eq!(verifier.open_block(p0).unwrap(), (b"one".to_vec(), false));
        assert_eq!(verifier.open_block(p1).unwrap(), (b"two".to_vec(), true));
    }

    #[test]
    fn test_attached_replayed_block_fails() {
        let keypair = SigningKeyPair::generate().unwrap();
        let mut wire = Vec::new();
        let mut sealer = SigningSealer::start(&mut wire, keypair, false).unwrap();
        let p0 = sealer.seal_block(b"one", false).unwrap();

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        let mut verifier = SigningVerifier::open(&mut header).unwrap();
        verifier.open_block(p0.clone()).unwrap();
        let err = verifier.open_block(p0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_detached_digest_is_split_independent() {
        let keypair = SigningKeyPair::generate().unwrap();
        let mut wire = Vec::new();
        let mut sealer = SigningSealer::start(&mut wire, keypair, true).unwrap();
        sealer.absorb(b"Sample").unwrap();
        sealer.absorb(b" message.").unwrap();
        let packet = sealer.finish_detached().unwrap();

        let mut header = MessageHeader::read_from(&mut BufReader::new(&wire[..])).unwrap();
        assert_eq!(header.mode(), Mode::DetachedSigning);
        let verifier = SigningVerifier::open(&mut header).unwrap();

        verifier.verify_detached(packet.clone(), &b"Sample message."[..]).unwrap();
        let err = verifier
            .verify_detached(packet, &b"Sample message.!"[..])
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::AuthenticationFailure);
    }

    #[test]
    fn test_detached_signature_only_once() {
        let keypair = SigningKeyPair::generate().unwrap();
        let mut sealer = SigningSealer::start(&mut Vec::new(), keypair, true).unwrap();
        sealer.finish_detached().unwrap();
        assert!(sealer.finish_detached().is_err());
    }
}
