//! # Encoding Module
//!
//! Text encodings for binary data: the generic [`basex`] codec behind the
//! armor, the alphabets it is normally used with, and hex helpers.

pub mod basex;

pub use basex::{block_size, decode, encode, encode_prefix, Alphabet};

use crate::error::Result;

/// Base62 alphabet (digits, upper case, lower case); the armor alphabet
pub const ALPHABET_BASE62: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Standard base64 alphabet
pub const ALPHABET_BASE64: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Base85 alphabet (ASCII `!` through `u`)
pub const ALPHABET_BASE85: &str =
    "!\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstu";

/// Lower-case hex encoding of `bin`
pub fn bin_to_hex(bin: &[u8]) -> String {
    hex::encode(bin)
}

/// Decode a hex string (either case)
pub fn hex_to_bin(hex: &str) -> Result<Vec<u8>> {
    Ok(hex::decode(hex)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let hex = bin_to_hex(&[0x00, 0xab, 0xff]);
        assert_eq!(hex, "00abff");
        assert_eq!(hex_to_bin("00ABff").unwrap(), vec![0x00, 0xab, 0xff]);
    }

    #[test]
    fn test_hex_invalid() {
        let err = hex_to_bin("0g").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(hex_to_bin("abc").is_err());
    }

    #[test]
    fn test_alphabet_sizes() {
        assert_eq!(ALPHABET_BASE62.len(), 62);
        assert_eq!(ALPHABET_BASE64.len(), 64);
        assert_eq!(ALPHABET_BASE85.len(), 85);
    }
}
