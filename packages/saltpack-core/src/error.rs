//! # Error Handling
//!
//! Every fallible operation in the crate returns [`Result<T>`], carrying a
//! single [`Error`] type. Callers branch on the failure category through
//! [`Error::kind`] instead of matching on message text.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                      │
//! │  │                                                                      │
//! │  ├── InvalidArgument (100)     - Missing parameter, wrong key length,   │
//! │  │                               bad recipient entry, oversized block   │
//! │  │                                                                      │
//! │  ├── FormatError (200)         - Illegal armor block, marker mismatch,  │
//! │  │                               malformed header, read past final,     │
//! │  │                               truncated stream                       │
//! │  │                                                                      │
//! │  ├── AuthenticationFailure (300)                                        │
//! │  │                             - MAC / signature / tag mismatch, no     │
//! │  │                               recipient entry opens with our keys    │
//! │  │                                                                      │
//! │  ├── ResourceExhausted (400)   - Password KDF limits too low, entropy   │
//! │  │                               source unavailable                     │
//! │  │                                                                      │
//! │  ├── Io (500)                  - Underlying byte stream failed          │
//! │  │                                                                      │
//! │  └── Internal (900)            - A primitive failed in a way that       │
//! │                                  should not be reachable                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are recovered internally. A failure aborts the message being
//! processed; the writer or reader that produced it can still be dropped
//! safely and its key material is wiped on drop.

use thiserror::Error;

/// Result type alias for saltpack-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for saltpack-core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Argument Errors (100-199)
    // ========================================================================

    /// A required parameter is absent or has the wrong shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Format Errors (200-299)
    // ========================================================================

    /// Input bytes or text do not follow the message/armor format
    #[error("Format error: {0}")]
    FormatError(String),

    // ========================================================================
    // Authentication Errors (300-399)
    // ========================================================================

    /// A MAC, signature or AEAD tag did not verify
    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    // ========================================================================
    // Resource Errors (400-499)
    // ========================================================================

    /// Limits too low for the algorithm, or no entropy available
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    // ========================================================================
    // Stream Errors (500-599)
    // ========================================================================

    /// The underlying byte stream failed
    #[error("Stream error: {0}")]
    Io(std::io::Error),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure category, for callers that need to branch on the kind of error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::InvalidArgument`]
    InvalidArgument,
    /// See [`Error::FormatError`]
    FormatError,
    /// See [`Error::AuthenticationFailure`]
    AuthenticationFailure,
    /// See [`Error::ResourceExhausted`]
    ResourceExhausted,
    /// See [`Error::Io`]
    Io,
    /// See [`Error::Internal`]
    Internal,
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`]
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Shorthand for [`Error::FormatError`]
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::FormatError(msg.into())
    }

    /// Shorthand for [`Error::AuthenticationFailure`]
    pub(crate) fn auth(msg: impl Into<String>) -> Self {
        Error::AuthenticationFailure(msg.into())
    }

    /// Get the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::FormatError(_) => ErrorKind::FormatError,
            Error::AuthenticationFailure(_) => ErrorKind::AuthenticationFailure,
            Error::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            Error::Io(_) => ErrorKind::Io,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get the numeric error code
    ///
    /// Codes are grouped by category, so a binding layer can forward them
    /// as plain integers:
    /// - 100-199: Argument errors
    /// - 200-299: Format errors
    /// - 300-399: Authentication errors
    /// - 400-499: Resource errors
    /// - 500-599: Stream errors
    /// - 900-999: Internal errors
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) => 100,
            Error::FormatError(_) => 200,
            Error::AuthenticationFailure(_) => 300,
            Error::ResourceExhausted(_) => 400,
            Error::Io(_) => 500,
            Error::Internal(_) => 900,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Only resource exhaustion can be resolved by the caller retrying the
    /// same operation with different inputs (e.g. higher KDF limits).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ResourceExhausted(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<std::io::Error> for Error {
    /// Errors raised inside a `Read`/`Write` adapter (the armor layer) travel
    /// through `std::io` wrapped as `InvalidData`; unwrap them back to the
    /// original kind.
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::InvalidData
            && err.get_ref().is_some_and(|inner| inner.is::<Error>())
        {
            if let Some(inner) = err.into_inner() {
                if let Ok(inner) = inner.downcast::<Error>() {
                    return *inner;
                }
            }
            return Error::Internal("lost wrapped stream error".into());
        }
        Error::Io(err)
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}

impl From<ciborium::de::Error<std::io::Error>> for Error {
    fn from(err: ciborium::de::Error<std::io::Error>) -> Self {
        match err {
            ciborium::de::Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::format("unexpected end of stream")
            }
            ciborium::de::Error::Io(e) => Error::from(e),
            ciborium::de::Error::Syntax(offset) => {
                Error::format(format!("malformed packet at offset {}", offset))
            }
            ciborium::de::Error::Semantic(_, msg) => Error::format(msg),
            ciborium::de::Error::RecursionLimitExceeded => {
                Error::format("packet nesting too deep")
            }
        }
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for Error {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        match err {
            ciborium::ser::Error::Io(e) => Error::from(e),
            ciborium::ser::Error::Value(msg) => Error::Internal(msg),
        }
    }
}

impl From<hex::FromHexError> for Error {
    fn from(err: hex::FromHexError) -> Self {
        Error::InvalidArgument(format!("Invalid hex: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::invalid("x").code(), 100);
        assert_eq!(Error::format("x").code(), 200);
        assert_eq!(Error::auth("x").code(), 300);
        assert_eq!(Error::ResourceExhausted("x".into()).code(), 400);
        assert_eq!(
            Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed")).code(),
            500
        );
        assert_eq!(Error::Internal("x".into()).code(), 900);
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::invalid("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(Error::auth("x").kind(), ErrorKind::AuthenticationFailure);
        assert_ne!(Error::format("x").kind(), Error::auth("x").kind());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::ResourceExhausted("limits".into()).is_recoverable());
        assert!(!Error::auth("bad tag").is_recoverable());
        assert!(!Error::format("truncated").is_recoverable());
    }

    #[test]
    fn test_eof_maps_to_format_error() {
        let err: Error = ciborium::de::Error::Io(std::io::Error::from(
            std::io::ErrorKind::UnexpectedEof,
        ))
        .into();
        assert_eq!(err.kind(), ErrorKind::FormatError);

        let err: Error = ciborium::de::Error::Io(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        ))
        .into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_wrapped_error_survives_io_roundtrip() {
        let io: std::io::Error = Error::format("Illegal block.").into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);

        let back: Error = io.into();
        assert_eq!(back.kind(), ErrorKind::FormatError);
        assert!(back.to_string().contains("Illegal block."));

        let plain: Error = std::io::Error::new(std::io::ErrorKind::InvalidData, "other").into();
        assert_eq!(plain.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_hex_error_conversion() {
        let err: Error = hex::decode("zz").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("Invalid hex"));
    }
}
