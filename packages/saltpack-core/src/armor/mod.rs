//! # ASCII Armor
//!
//! A textual envelope around a binary message so it survives copy/paste,
//! email and chat.
//!
//! ## Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ARMORED MESSAGE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  BEGIN [APP ]SALTPACK <MARKER>. ◄── header, terminated by '.'           │
//! │                                                                         │
//! │  kiOUtMhcc4NXXRb XMxIeCbf5rCmoht ...     ◄── base62 body, 43 letters    │
//! │  ...                                         per 32-byte group,         │
//! │                                              words of N letters,        │
//! │                                              lines of M words           │
//! │                                                                         │
//! │  . END [APP ]SALTPACK <MARKER>.     ◄── footer mirrors the header       │
//! │                                                                         │
//! │  MARKER ∈ { ENCRYPTED MESSAGE, SIGNED MESSAGE, DETACHED SIGNATURE }     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Decoding ignores all whitespace and `>` quoting inside the body, so a
//! message re-wrapped or quoted by a mail client still decodes.
//!
//! Both directions stream: [`ArmoredWriter`] and [`ArmoredReader`] hold at
//! most one 32-byte group at a time. [`encode`] and [`decode`] are one-shot
//! conveniences on top of them.

mod reader;
mod writer;

pub use reader::ArmoredReader;
pub use writer::ArmoredWriter;

use std::io::{Read, Write};

use once_cell::sync::Lazy;

use crate::config::{validate_app, OutputParameters, WordWrap};
use crate::encoding::{Alphabet, ALPHABET_BASE62};
use crate::error::{Error, Result};
use crate::message::Mode;

/// Word that precedes the marker in every header and footer
const FORMAT_WORD: &str = "SALTPACK";

/// Base62 geometry shared by every armor instance
pub(crate) static ARMOR_ALPHABET: Lazy<Alphabet> = Lazy::new(|| {
    let Ok(alphabet) = Alphabet::new(ALPHABET_BASE62) else {
        unreachable!("base62 alphabet is valid");
    };
    alphabet
});

/// The kind of message an armor envelope announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmorMarker {
    /// Encryption and signcryption
    EncryptedMessage,
    /// Attached signing
    SignedMessage,
    /// Detached signing
    DetachedSignature,
}

impl ArmorMarker {
    /// The marker text
    pub fn as_str(&self) -> &'static str {
        match self {
            ArmorMarker::EncryptedMessage => "ENCRYPTED MESSAGE",
            ArmorMarker::SignedMessage => "SIGNED MESSAGE",
            ArmorMarker::DetachedSignature => "DETACHED SIGNATURE",
        }
    }

    /// The marker an armored message of `mode` carries
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Encryption | Mode::Signcryption => ArmorMarker::EncryptedMessage,
            Mode::AttachedSigning => ArmorMarker::SignedMessage,
            Mode::DetachedSigning => ArmorMarker::DetachedSignature,
        }
    }

    fn parse(words: &[&str]) -> Option<Self> {
        match words {
            ["ENCRYPTED", "MESSAGE"] => Some(ArmorMarker::EncryptedMessage),
            ["SIGNED", "MESSAGE"] => Some(ArmorMarker::SignedMessage),
            ["DETACHED", "SIGNATURE"] => Some(ArmorMarker::DetachedSignature),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArmorMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope settings for the writing side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArmorConfig {
    /// Application name between `BEGIN`/`END` and `SALTPACK`
    pub app: Option<String>,
    /// Word and line grouping of the body
    pub word_wrap: WordWrap,
}

impl From<&OutputParameters> for ArmorConfig {
    fn from(params: &OutputParameters) -> Self {
        Self {
            app: params.app.clone(),
            word_wrap: params.effective_word_wrap(),
        }
    }
}

impl ArmorConfig {
    /// Reject a grouping of zero or an app name the header cannot carry
    pub fn validate(&self) -> Result<()> {
        self.word_wrap.validate()?;
        match &self.app {
            Some(app) => validate_app(app),
            None => Ok(()),
        }
    }
}

/// Header/footer line without the trailing '.'
fn frame_line(keyword: &str, app: Option<&str>, marker: ArmorMarker) -> String {
    match app {
        Some(app) => format!("{} {} {} {}", keyword, app, FORMAT_WORD, marker),
        None => format!("{} {} {}", keyword, FORMAT_WORD, marker),
    }
}

/// Parse a header or footer line (whitespace-normalized, no '.')
///
/// Returns the application name, if any, and the marker.
fn parse_frame_line(keyword: &str, line: &str) -> Result<(Option<String>, ArmorMarker)> {
    let words: Vec<&str> = line.split_whitespace().collect();

    let malformed = || Error::format(format!("Malformed armor {} line", keyword.to_lowercase()));

    if words.first() != Some(&keyword) {
        return Err(malformed());
    }
    let format_at = words
        .iter()
        .position(|w| *w == FORMAT_WORD)
        .ok_or_else(malformed)?;
    let app = match format_at {
        1 => None,
        2 => Some(words[1].to_string()),
        _ => return Err(malformed()),
    };
    let marker = ArmorMarker::parse(&words[format_at + 1..]).ok_or_else(malformed)?;

    Ok((app, marker))
}

/// Armor `payload` in one shot
pub fn encode(payload: &[u8], marker: ArmorMarker, config: &ArmorConfig) -> Result<String> {
    let mut writer = ArmoredWriter::new(Vec::new(), marker, config)?;
    writer.write_all(payload)?;
    writer.finish()?;

    String::from_utf8(writer.into_inner())
        .map_err(|_| Error::Internal("armor produced non-ASCII output".into()))
}

/// Dearmor `text` in one shot, checking the application name
///
/// Returns the marker found in the header along with the payload.
pub fn decode(text: &str, app: Option<&str>) -> Result<(ArmorMarker, Vec<u8>)> {
    let mut reader = ArmoredReader::new(text.as_bytes(), app)?;
    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    reader.finish()?;

    Ok((reader.marker(), payload))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(app: Option<&str>, letters: usize, words: usize) -> ArmorConfig {
        ArmorConfig {
            app: app.map(str::to_string),
            word_wrap: WordWrap::new(letters, words).unwrap(),
        }
    }

    #[test]
    fn test_roundtrip_with_app() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let text = encode(&payload, ArmorMarker::EncryptedMessage, &config(Some("KEYBASE"), 15, 200))
            .unwrap();

        assert!(text.starts_with("BEGIN KEYBASE SALTPACK ENCRYPTED MESSAGE. "));
        assert!(text.ends_with(". END KEYBASE SALTPACK ENCRYPTED MESSAGE."));

        let (marker, decoded) = decode(&text, Some("KEYBASE")).unwrap();
        assert_eq!(marker, ArmorMarker::EncryptedMessage);
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_word_and_phrase_grouping() {
        let payload = [7u8; 64];
        let text = encode(&payload, ArmorMarker::SignedMessage, &config(None, 10, 3)).unwrap();

        let body = text
            .strip_prefix("BEGIN SALTPACK SIGNED MESSAGE. ")
            .and_then(|t| t.strip_suffix(". END SALTPACK SIGNED MESSAGE."))
            .unwrap();

        // 64 bytes → 86 letters → 9 words, 3 per line
        let lines: Vec<&str> = body.split('\n').collect();
        assert_eq!(lines.len(), 3);
        for line in &lines {
            assert!(line.split(' ').count() <= 3);
            assert!(line.split(' ').all(|w| w.len() <= 10 && !w.is_empty()));
        }
        assert_eq!(body.chars().filter(|c| !c.is_whitespace()).count(), 86);
    }

    #[test]
    fn test_app_must_match_exactly() {
        let text = encode(b"data", ArmorMarker::EncryptedMessage, &config(Some("APP"), 15, 200))
            .unwrap();
        assert!(decode(&text, Some("OTHER")).is_err());
        assert!(decode(&text, None).is_err());

        let bare = encode(b"data", ArmorMarker::EncryptedMessage, &ArmorConfig::default()).unwrap();
        let err = decode(&bare, Some("APP")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::FormatError);
    }

    #[test]
    fn test_footer_must_mirror_header() {
        let text = encode(b"data", ArmorMarker::SignedMessage, &ArmorConfig::default()).unwrap();
        let tampered = text.replace("END SALTPACK SIGNED", "END SALTPACK DETACHED");
        assert!(tampered.ends_with("DETACHED MESSAGE."));
        assert!(decode(&tampered, None).is_err());
    }

    #[test]
    fn test_rewrapped_and_quoted_body_decodes() {
        let payload = b"A message that survives a mail client".to_vec();
        let text = encode(&payload, ArmorMarker::EncryptedMessage, &ArmorConfig::default()).unwrap();

        let quoted: String = text
            .split(' ')
            .map(|word| format!("> {}\n", word))
            .collect();
        let (_, decoded) = decode(&quoted, None).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_illegal_symbol_in_body() {
        let text = "BEGIN SALTPACK SIGNED MESSAGE. abc$def. END SALTPACK SIGNED MESSAGE.";
        let err = decode(text, None).unwrap_err();
        assert!(err.to_string().contains("Illegal block."));
    }

    #[test]
    fn test_missing_header() {
        assert!(decode("no armor here", None).is_err());
        assert!(decode("", None).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_letters = ArmorConfig {
            app: None,
            word_wrap: WordWrap {
                letters_per_word: 0,
                words_per_phrase: 1,
            },
        };
        let zero_words = ArmorConfig {
            app: None,
            word_wrap: WordWrap {
                letters_per_word: 15,
                words_per_phrase: 0,
            },
        };
        let spaced_app = ArmorConfig {
            app: Some("MY APP".into()),
            word_wrap: WordWrap::default(),
        };

        for config in [zero_letters, zero_words, spaced_app] {
            let err = encode(&[1u8; 40], ArmorMarker::SignedMessage, &config).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
            assert!(ArmoredWriter::new(Vec::new(), ArmorMarker::SignedMessage, &config).is_err());
        }
    }

    #[test]
    fn test_marker_for_mode() {
        assert_eq!(ArmorMarker::for_mode(Mode::Signcryption), ArmorMarker::EncryptedMessage);
        assert_eq!(ArmorMarker::for_mode(Mode::DetachedSigning), ArmorMarker::DetachedSignature);
    }
}
