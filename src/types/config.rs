//! Configuration structures.
//!
//! Configuration is plain data: build it in code, or load it from a JSON
//! document with [`EncoderConfig::from_json`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Result;

/// Reserved field-name prefix used by ORM-style objects for bookkeeping state.
pub const DEFAULT_RESERVED_PREFIX: &str = "_sa";

/// Default recursion limit.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Placeholder written for secrets under [`SecretPolicy::Redact`].
pub const REDACTED: &str = "**********";

/// Global encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EncoderConfig {
    /// Maximum nesting depth before giving up. `None` disables the guard.
    #[serde(default = "default_max_depth")]
    pub max_depth: Option<usize>,

    /// Field-name prefix dropped from structured values in safe mode.
    #[serde(default = "default_reserved_prefix")]
    pub reserved_prefix: String,

    /// How secret values are written.
    #[serde(default)]
    pub secrets: SecretPolicy,
}

fn default_max_depth() -> Option<usize> {
    Some(DEFAULT_MAX_DEPTH)
}

fn default_reserved_prefix() -> String {
    DEFAULT_RESERVED_PREFIX.to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            reserved_prefix: default_reserved_prefix(),
            secrets: SecretPolicy::default(),
        }
    }
}

impl EncoderConfig {
    /// Parse a configuration document. Missing keys take their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// JSON schema of the configuration document.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(EncoderConfig);
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
    }
}

/// Secret handling for `SecretString` / `SecretBytes`.
///
/// `Reveal` writes the real value. It is the default and is security-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SecretPolicy {
    #[default]
    Reveal,
    Redact,
}
