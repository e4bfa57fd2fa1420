//! # Stream Parameters
//!
//! Plain-data configuration for the output and input side of a message.
//! Both types are `serde`-serializable so a binding layer can pass them
//! through as JSON or similar.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PARAMETERS                                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  OutputParameters                   InputParameters                     │
//! │  ────────────────                   ───────────────                     │
//! │  armored    : bool                  armored : bool                      │
//! │  app        : Option<String>  ◄───► app     : Option<String>            │
//! │  word_wrap  : Option<WordWrap>        (must match exactly)              │
//! │                                                                         │
//! │  WordWrap { letters_per_word, words_per_phrase }                        │
//! │  Either both are set or neither; defaults are 15 / 200.                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of base62 letters per armor word
pub const DEFAULT_LETTERS_PER_WORD: usize = 15;

/// Default number of armor words per line
pub const DEFAULT_WORDS_PER_PHRASE: usize = 200;

/// Armor word and line grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordWrap {
    /// Letters between spaces
    pub letters_per_word: usize,
    /// Words between line breaks
    pub words_per_phrase: usize,
}

impl WordWrap {
    /// Create a grouping, rejecting zero values
    pub fn new(letters_per_word: usize, words_per_phrase: usize) -> Result<Self> {
        let wrap = Self {
            letters_per_word,
            words_per_phrase,
        };
        wrap.validate()?;
        Ok(wrap)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.letters_per_word == 0 || self.words_per_phrase == 0 {
            return Err(Error::invalid(
                "Letters per word and words per phrase must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for WordWrap {
    fn default() -> Self {
        Self {
            letters_per_word: DEFAULT_LETTERS_PER_WORD,
            words_per_phrase: DEFAULT_WORDS_PER_PHRASE,
        }
    }
}

/// How a [`crate::MessageWriter`] frames its output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputParameters {
    /// Emit ASCII armor instead of raw binary
    pub armored: bool,
    /// Application name placed in the armor header and footer
    pub app: Option<String>,
    /// Word/line grouping; `None` uses [`WordWrap::default`]
    pub word_wrap: Option<WordWrap>,
}

impl OutputParameters {
    /// Binary output
    pub fn binary() -> Self {
        Self::default()
    }

    /// Armored output with default grouping and no application name
    pub fn armored() -> Self {
        Self {
            armored: true,
            ..Self::default()
        }
    }

    /// Set the application name
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Set the word/line grouping
    pub fn with_word_wrap(mut self, letters_per_word: usize, words_per_phrase: usize) -> Self {
        self.word_wrap = Some(WordWrap {
            letters_per_word,
            words_per_phrase,
        });
        self
    }

    /// The grouping in effect
    pub fn effective_word_wrap(&self) -> WordWrap {
        self.word_wrap.unwrap_or_default()
    }

    /// Check the parameters before any output is produced
    pub fn validate(&self) -> Result<()> {
        if let Some(app) = &self.app {
            validate_app(app)?;
        }
        if let Some(wrap) = &self.word_wrap {
            wrap.validate()?;
        }
        Ok(())
    }
}

/// How a [`crate::MessageReader`] expects its input to be framed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParameters {
    /// Expect ASCII armor instead of raw binary
    pub armored: bool,
    /// Application name the armor must carry
    pub app: Option<String>,
}

impl InputParameters {
    /// Binary input
    pub fn binary() -> Self {
        Self::default()
    }

    /// Armored input without an application name
    pub fn armored() -> Self {
        Self {
            armored: true,
            app: None,
        }
    }

    /// Set the expected application name
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Check the parameters before any input is consumed
    pub fn validate(&self) -> Result<()> {
        match &self.app {
            Some(app) => validate_app(app),
            None => Ok(()),
        }
    }
}

/// The app name sits between fixed words of the armor header, so it must be
/// a single alphanumeric word
pub(crate) fn validate_app(app: &str) -> Result<()> {
    if app.is_empty() || !app.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::invalid(format!(
            "Application name must be ASCII alphanumeric, got {:?}",
            app
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let params = OutputParameters::armored()
            .with_app("KEYBASE")
            .with_word_wrap(10, 3);

        assert!(params.armored);
        assert_eq!(params.app.as_deref(), Some("KEYBASE"));
        assert_eq!(params.effective_word_wrap(), WordWrap::new(10, 3).unwrap());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_default_word_wrap() {
        let wrap = OutputParameters::armored().effective_word_wrap();
        assert_eq!(wrap.letters_per_word, 15);
        assert_eq!(wrap.words_per_phrase, 200);
    }

    #[test]
    fn test_invalid_app_names() {
        for app in ["", "MY APP", "app.", "ÄPP"] {
            let err = OutputParameters::armored().with_app(app).validate().unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
            assert!(InputParameters::armored().with_app(app).validate().is_err());
        }
    }

    #[test]
    fn test_zero_word_wrap_rejected() {
        assert!(OutputParameters::armored().with_word_wrap(0, 5).validate().is_err());
        assert!(WordWrap::new(5, 0).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let params = OutputParameters::armored().with_app("APP");
        let json = serde_json::to_string(&params).unwrap();
        let restored: OutputParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(params, restored);
    }
}
