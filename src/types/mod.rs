//! Core types for the encoder.
//!
//! This module provides foundational types used throughout the crate:
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Encoder configuration (depth guard, reserved prefix, secrets)
//! - **Special values**: Secret and name/e-mail wrappers with registry rules

mod config;
mod errors;
mod special;

pub use config::{
    EncoderConfig, SecretPolicy, DEFAULT_MAX_DEPTH, DEFAULT_RESERVED_PREFIX, REDACTED,
};
pub use errors::{BoxError, Error, Result};
pub use special::{NameEmail, SecretBytes, SecretString};
