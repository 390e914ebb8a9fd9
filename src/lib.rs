//! # jsonable - recursive JSON-safe value encoder
//!
//! Converts arbitrary Rust values into `serde_json::Value` trees:
//! - Structured values (models) with include/exclude, alias naming and
//!   unset/default/null filtering
//! - Registry of single-step conversions for dates, durations, decimals,
//!   UUIDs, network addresses, URLs, secrets and more
//! - Caller-supplied and type-declared encoder overrides
//! - Key-value fallback and a well-defined terminal error
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────────────────────┐
//!   value, ctx  →  │          JsonableEncoder             │  → Value
//!                  │  ┌────────────┐   ┌──────────────┐   │
//!                  │  │ Structured │   │   Encoder    │   │
//!                  │  │  Resolver  │   │   Registry   │   │
//!                  │  └────────────┘   └──────────────┘   │
//!                  │        EncodeContext / EncoderMap    │
//!                  └──────────────────────────────────────┘
//! ```
//!
//! ```
//! use jsonable::jsonable_encoder;
//! use std::collections::BTreeMap;
//!
//! let mut scores = BTreeMap::new();
//! scores.insert(1u32, vec![Some(2.5), None]);
//! assert_eq!(
//!     jsonable_encoder(&scores).unwrap(),
//!     serde_json::json!({"1": [2.5, null]})
//! );
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod encodable;
pub mod encoder;
pub mod filter;
pub mod registry;
pub mod resolver;
pub mod types;

// Internal utilities
pub mod observability;

pub use encodable::{AsAny, Encodable, LazySeq, Model, ModelField, Shape, ValueRef};
pub use encoder::{jsonable_encoder, jsonable_encoder_with, JsonableEncoder};
pub use filter::{EncodeContext, FieldFilter};
pub use registry::{
    decimal_encoder, typed, BaseRule, EncodeFn, EncoderMap, EncoderRegistry, RegistryBuilder,
    RuleHit,
};
pub use resolver::{Resolved, StructuredValueResolver};
pub use types::{
    EncoderConfig, Error, NameEmail, Result, SecretBytes, SecretPolicy, SecretString,
};
