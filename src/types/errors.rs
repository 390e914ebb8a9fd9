//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error produced by user code (lazy sequence sources, custom encoders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error enum for the encoder.
#[derive(Error, Debug)]
pub enum Error {
    /// No dispatch rule could convert the value.
    #[error("Object of type {type_name} is not JSON serializable")]
    Unencodable { type_name: &'static str },

    /// A byte string (value or mapping key) was not valid UTF-8.
    #[error("byte string is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// NaN and infinities have no JSON representation.
    #[error("non-finite float {0} cannot be represented in JSON")]
    NonFiniteFloat(f64),

    /// Input nested deeper than `EncoderConfig::max_depth`.
    #[error("maximum encoding depth of {0} exceeded")]
    DepthExceeded(usize),

    /// Draining a lazy sequence failed.
    #[error("iteration failed: {0}")]
    Iteration(#[source] BoxError),

    /// An encode function was handed a value of another type.
    #[error("encoder for {expected} received a value of type {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Failure raised by a user-supplied encoder.
    #[error("custom encoder failed: {0}")]
    Custom(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Convenience constructors
impl Error {
    pub fn unencodable(type_name: &'static str) -> Self {
        Self::Unencodable { type_name }
    }

    pub fn iteration(err: impl Into<BoxError>) -> Self {
        Self::Iteration(err.into())
    }

    pub fn type_mismatch(expected: &'static str, actual: &'static str) -> Self {
        Self::TypeMismatch { expected, actual }
    }

    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// True for the terminal "no rule matched" failure.
    pub fn is_unencodable(&self) -> bool {
        matches!(self, Error::Unencodable { .. })
    }
}
