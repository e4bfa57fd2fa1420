//! # BaseX Codec
//!
//! Radix encoding over an arbitrary alphabet of 2 to 256 distinct symbols.
//!
//! ## Block Structure
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          BLOCK LAYOUT                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  input   │◄── n bytes ──►│◄── n bytes ──►│◄─ k < n ─►│                  │
//! │             big-endian      big-endian     partial                      │
//! │             integer         integer        group                        │
//! │                │               │              │                         │
//! │                ▼               ▼              ▼                         │
//! │  output  │◄─ chars(n) ──►│◄─ chars(n) ──►│◄ chars(k) ►│                 │
//! │                                                                         │
//! │  chars(k) = ⌈ 8k / log2(b) ⌉                                            │
//! │                                                                         │
//! │  n is the group size in 1..=64 with the best ratio of information       │
//! │  carried to symbols spent (smallest n on ties):                         │
//! │     base62 → 32 bytes / 43 chars                                        │
//! │     base64 →  3 bytes /  4 chars                                        │
//! │     base85 →  4 bytes /  5 chars                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because `chars(k)` is strictly increasing in `k`, the length of the
//! trailing symbol run identifies the byte length of the partial group
//! exactly, so trailing zero bytes round-trip without padding markers.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Largest group size considered when picking the block size
const MAX_GROUP_BYTES: usize = 64;

/// Float slack for the ceil/floor around `log2(b)`
const EPSILON: f64 = 1e-9;

/// A validated alphabet with its block geometry
#[derive(Debug, Clone)]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, u32>,
    bits_per_symbol: f64,
    group_bytes: usize,
    group_chars: usize,
}

impl Alphabet {
    /// Validate `alphabet` and compute its block geometry
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` when the alphabet has fewer than 2 or more than 256
    /// symbols, or repeats a symbol.
    pub fn new(alphabet: &str) -> Result<Self> {
        let symbols: Vec<char> = alphabet.chars().collect();
        if symbols.len() < 2 || symbols.len() > 256 {
            return Err(Error::invalid(format!(
                "Alphabet must have between 2 and 256 symbols, got {}",
                symbols.len()
            )));
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (i, &c) in symbols.iter().enumerate() {
            if index.insert(c, i as u32).is_some() {
                return Err(Error::invalid(format!("Duplicate alphabet symbol {:?}", c)));
            }
        }

        let bits_per_symbol = (symbols.len() as f64).log2();
        let mut alphabet = Self {
            symbols,
            index,
            bits_per_symbol,
            group_bytes: 1,
            group_chars: 0,
        };

        let mut best = 0.0;
        for n in 1..=MAX_GROUP_BYTES {
            let chars = alphabet.chars_for(n);
            let efficiency = (8 * n) as f64 / bits_per_symbol / chars as f64;
            if efficiency > best + EPSILON {
                best = efficiency;
                alphabet.group_bytes = n;
                alphabet.group_chars = chars;
            }
        }

        Ok(alphabet)
    }

    /// Number of symbols
    pub fn base(&self) -> usize {
        self.symbols.len()
    }

    /// Bytes per full group
    pub fn group_bytes(&self) -> usize {
        self.group_bytes
    }

    /// Symbols per full group
    pub fn group_chars(&self) -> usize {
        self.group_chars
    }

    /// Symbols needed for a `k`-byte group
    fn chars_for(&self, k: usize) -> usize {
        ((8 * k) as f64 / self.bits_per_symbol - EPSILON).ceil() as usize
    }

    /// Byte length of a group encoded in `c` symbols
    fn bytes_for(&self, c: usize) -> Result<usize> {
        let k = (c as f64 * self.bits_per_symbol / 8.0 + EPSILON).floor() as usize;
        if k == 0 || self.chars_for(k) != c {
            return Err(illegal_block());
        }
        Ok(k)
    }

    /// Exact number of symbols [`Alphabet::encode`] produces for `len` bytes
    pub fn encoded_len(&self, len: usize) -> usize {
        let full = len / self.group_bytes;
        let rest = len % self.group_bytes;
        full * self.group_chars + if rest > 0 { self.chars_for(rest) } else { 0 }
    }

    /// Encode `data`
    pub fn encode(&self, data: &[u8]) -> String {
        let mut out = String::with_capacity(self.encoded_len(data.len()));
        for group in data.chunks(self.group_bytes) {
            self.encode_group(group, &mut out);
        }
        out
    }

    /// Decode `text`
    ///
    /// ## Errors
    ///
    /// `FormatError("Illegal block.")` when a symbol is not in the alphabet,
    /// a group's value overflows its byte width, or the trailing group has a
    /// length no byte count encodes to.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        let symbols: Vec<char> = text.chars().collect();
        let mut out = Vec::with_capacity(symbols.len() * self.group_bytes / self.group_chars + 1);
        for group in symbols.chunks(self.group_chars) {
            self.decode_group(group, &mut out)?;
        }
        Ok(out)
    }

    /// Append the symbols for one group (at most `group_bytes` long)
    pub(crate) fn encode_group(&self, group: &[u8], out: &mut String) {
        let chars = self.chars_for(group.len());
        let base = self.base() as u32;

        // Repeated long division of the big-endian number by the base
        let mut number = group.to_vec();
        let mut digits = vec![0u32; chars];
        for digit in digits.iter_mut().rev() {
            let mut remainder = 0u32;
            for byte in number.iter_mut() {
                let acc = (remainder << 8) | u32::from(*byte);
                *byte = (acc / base) as u8;
                remainder = acc % base;
            }
            *digit = remainder;
        }

        out.extend(digits.into_iter().map(|d| self.symbols[d as usize]));
    }

    /// Append the bytes for one group of symbols
    pub(crate) fn decode_group(&self, group: &[char], out: &mut Vec<u8>) -> Result<()> {
        let k = self.bytes_for(group.len())?;
        let base = self.base() as u32;

        let mut number = vec![0u8; k];
        for c in group {
            let mut carry = *self.index.get(c).ok_or_else(illegal_block)?;
            for byte in number.iter_mut().rev() {
                let acc = u32::from(*byte) * base + carry;
                *byte = (acc & 0xff) as u8;
                carry = acc >> 8;
            }
            if carry != 0 {
                return Err(illegal_block());
            }
        }

        out.extend_from_slice(&number);
        Ok(())
    }

    /// [`Alphabet::decode_group`], treating an empty group as no bytes
    pub(crate) fn decode_group_if_any(&self, group: &[char], out: &mut Vec<u8>) -> Result<()> {
        if group.is_empty() {
            return Ok(());
        }
        self.decode_group(group, out)
    }
}

fn illegal_block() -> Error {
    Error::format("Illegal block.")
}

// ============================================================================
// FREE FUNCTIONS
// ============================================================================

/// Number of symbols `encode` produces for `input_len` bytes
pub fn block_size(alphabet: &str, input_len: usize) -> Result<usize> {
    Ok(Alphabet::new(alphabet)?.encoded_len(input_len))
}

/// Encode all of `data` with `alphabet`
pub fn encode(data: &[u8], alphabet: &str) -> Result<String> {
    Ok(Alphabet::new(alphabet)?.encode(data))
}

/// Encode the first `size` bytes of `data` with `alphabet`
pub fn encode_prefix(data: &[u8], size: usize, alphabet: &str) -> Result<String> {
    let prefix = data.get(..size).ok_or_else(|| {
        Error::invalid(format!(
            "Size {} exceeds the {} bytes available",
            size,
            data.len()
        ))
    })?;
    encode(prefix, alphabet)
}

/// Decode `text` with `alphabet`
pub fn decode(text: &str, alphabet: &str) -> Result<Vec<u8>> {
    Alphabet::new(alphabet)?.decode(text)
}

// ============================================================================
// TESTS
// ============================================================================
