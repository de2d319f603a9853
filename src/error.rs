use thiserror::Error;

/// Crate-wide error type.
///
/// The kind carries the decision a caller has to make: validation and
/// authentication failures are recoverable and user-facing, a cryptographic
/// failure is the wrong-codeword signal, and configuration/I-O failures are
/// infrastructure problems. Callers branch on the variant, never on the
/// message text.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before any network or crypto work was done.
    #[error("{0}")]
    Validation(String),

    /// Unknown user or wrong credential.
    #[error("{0}")]
    Auth(String),

    /// AEAD tag mismatch or malformed blob. Never retried; when opening a
    /// vault this is the only signal of a wrong codeword.
    #[error("decryption failed: wrong key or corrupted data")]
    Crypto,

    /// Broken deployment: missing word list, bad KDF parameters.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed request or an answer missing required fields.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered with an error status.
    #[error("server: {0}")]
    Remote(String),

    /// Invariant breach that should not be reachable (table overflow,
    /// corrupt stored record).
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
