//! CBOR packet framing.
//!
//! Each header and block is one self-delimiting CBOR item, read with
//! `ciborium` straight off the stream. The helpers below turn loosely-typed
//! [`Value`]s into the shapes the block engines expect, mapping anything
//! else to a `FormatError`.

use std::io::{BufRead, Read, Write};

use ciborium::value::Value;

use crate::error::{Error, Result};

/// Room for the CBOR array, string and flag headers around a payload
pub(crate) const PACKET_FRAMING: usize = 64;

/// Largest header accepted; comfortably above 100 000 recipients
pub(crate) const MAX_HEADER_PACKET: usize = 16 * 1024 * 1024;

/// Write one CBOR item
pub(crate) fn write_packet<W: Write>(out: &mut W, value: &Value) -> Result<()> {
    ciborium::ser::into_writer(value, out)?;
    Ok(())
}

/// Read one CBOR item of at most `max_len` bytes, or `None` if the stream
/// ends cleanly before it
///
/// Never pulls more than `max_len` bytes off `input`, whatever lengths the
/// item claims. A longer item, or a stream ending partway through one, is a
/// `FormatError`.
pub(crate) fn read_packet<R: BufRead>(input: &mut R, max_len: usize) -> Result<Option<Value>> {
    if input.fill_buf()?.is_empty() {
        return Ok(None);
    }

    let mut limited = Read::take(&mut *input, max_len as u64);
    match ciborium::de::from_reader(&mut limited) {
        Ok(value) => Ok(Some(value)),
        Err(_) if limited.limit() == 0 => Err(Error::format(format!(
            "Packet exceeds {} bytes",
            max_len
        ))),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn bytes_value(bytes: impl Into<Vec<u8>>) -> Value {
    Value::Bytes(bytes.into())
}

pub(crate) fn uint_value(n: u64) -> Value {
    Value::Integer(n.into())
}

/// An array of exactly `len` items
pub(crate) fn expect_array(value: Value, len: usize, what: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) if items.len() == len => Ok(items),
        Value::Array(items) => Err(Error::format(format!(
            "{} has {} fields, expected {}",
            what,
            items.len(),
            len
        ))),
        _ => Err(Error::format(format!("{} is not an array", what))),
    }
}

/// An array of any length
pub(crate) fn expect_list(value: Value, what: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(Error::format(format!("{} is not an array", what))),
    }
}

pub(crate) fn expect_bytes(value: Value, what: &str) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(bytes) => Ok(bytes),
        _ => Err(Error::format(format!("{} is not a byte string", what))),
    }
}

/// A byte string of exactly 32 bytes
pub(crate) fn expect_key(value: Value, what: &str) -> Result<[u8; 32]> {
    let bytes = expect_bytes(value, what)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::format(format!("{} must be 32 bytes, got {}", what, bytes.len())))
}

pub(crate) fn expect_bool(value: Value, what: &str) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        _ => Err(Error::format(format!("{} is not a boolean", what))),
    }
}

pub(crate) fn expect_uint(value: Value, what: &str) -> Result<u64> {
    match value {
        Value::Integer(n) => {
            u64::try_from(n).map_err(|_| Error::format(format!("{} is out of range", what)))
        }
        _ => Err(Error::format(format!("{} is not an integer", what))),
    }
}

/// Reject packet payloads longer than `max`
pub(crate) fn check_payload_len(len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(Error::format(format!(
            "Packet payload too large: {} bytes, limit {}",
            len, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn test_sequential_packets_on_one_stream() {
        let mut buf = Vec::new();
        write_packet(&mut buf, &Value::Array(vec![Value::Bool(false), bytes_value(vec![1, 2])])).unwrap();
        write_packet(&mut buf, &Value::Array(vec![Value::Bool(true), bytes_value(vec![3])])).unwrap();

        let mut input = BufReader::new(&buf[..]);
        let first = expect_array(read_packet(&mut input, 64).unwrap().unwrap(), 2, "packet").unwrap();
        let second = expect_array(read_packet(&mut input, 64).unwrap().unwrap(), 2, "packet").unwrap();
        assert!(read_packet(&mut input, 64).unwrap().is_none());

        assert!(!expect_bool(first[0].clone(), "final").unwrap());
        assert_eq!(expect_bytes(second[1].clone(), "payload").unwrap(), vec![3]);
    }

    #[test]
    fn test_partial_packet_is_format_error() {
        let mut buf = Vec::new();
        write_packet(&mut buf, &bytes_value(vec![9u8; 100])).unwrap();
        buf.truncate(50);

        let err = read_packet(&mut BufReader::new(&buf[..]), 1024).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::FormatError);
    }

    #[test]
    fn test_oversized_packet_rejected_before_payload() {
        let mut buf = Vec::new();
        write_packet(&mut buf, &bytes_value(vec![9u8; 5000])).unwrap();

        let mut input = BufReader::new(&buf[..]);
        let err = read_packet(&mut input, 1000).unwrap_err();
        assert_eq!(err.to_string(), "Format error: Packet exceeds 1000 bytes");

        // Only the allowance was consumed
        let mut rest = Vec::new();
        input.read_to_end(&mut rest).unwrap();
        assert_eq!(rest.len(), buf.len() - 1000);

        // A claimed length far beyond the data is cut off the same way
        let claim = [0x5b, 0, 0, 0, 0x10, 0, 0, 0, 0];
        let mut forged = claim.to_vec();
        forged.extend_from_slice(&[0u8; 2000]);
        let err = read_packet(&mut BufReader::new(&forged[..]), 1000).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::FormatError);
    }

    #[test]
    fn test_shape_errors() {
        assert!(expect_array(Value::Bool(true), 2, "packet").is_err());
        assert!(expect_array(Value::Array(vec![]), 2, "packet").is_err());
        assert!(expect_key(bytes_value(vec![0u8; 31]), "key").is_err());
        assert_eq!(expect_uint(uint_value(7), "n").unwrap(), 7);
        assert!(expect_uint(Value::Integer((-1i64).into()), "n").is_err());
    }

    #[test]
    fn test_payload_limit() {
        assert!(check_payload_len(10, 10).is_ok());
        assert_eq!(
            check_payload_len(11, 10).unwrap_err().kind(),
            crate::ErrorKind::FormatError
        );
    }
}
