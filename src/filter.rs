//! Field filters and per-call encode context.
//!
//! Filters apply to the top-level structured value only (or to each structured
//! item of a top-level sequence). Model fields are encoded with
//! [`EncodeContext::nested`], which clears include/exclude and the `exclude_*`
//! flags but keeps `by_alias`, overrides and `safe_mode`.
//!
//! Mapping keys and values use [`EncodeContext::for_mapping`] instead: only
//! include, exclude and `exclude_defaults` are cleared, so a mapping of models
//! still honours `exclude_unset` and `exclude_none`.

use serde_json::Value;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use crate::registry::EncoderMap;
use crate::types::Result;

/// Which fields of a structured value are emitted, and under which key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    /// Keep only these output keys.
    pub include: Option<HashSet<String>>,
    /// Drop these output keys (applied after `include`).
    pub exclude: Option<HashSet<String>>,
    /// Emit field aliases instead of raw names.
    pub by_alias: bool,
    /// Drop fields that were never explicitly assigned.
    pub exclude_unset: bool,
    /// Drop fields equal to their declared default.
    pub exclude_defaults: bool,
    /// Drop fields whose value is null.
    pub exclude_none: bool,
}

impl FieldFilter {
    pub const DEFAULT: FieldFilter = FieldFilter {
        include: None,
        exclude: None,
        by_alias: true,
        exclude_unset: false,
        exclude_defaults: false,
        exclude_none: false,
    };

    /// Filter used below the top level: only `by_alias` survives.
    pub fn nested(&self) -> FieldFilter {
        FieldFilter {
            by_alias: self.by_alias,
            ..FieldFilter::DEFAULT
        }
    }

    /// Filter for mapping keys and values: drops the field selection and
    /// `exclude_defaults`, keeps the rest.
    pub fn for_mapping(&self) -> FieldFilter {
        FieldFilter {
            by_alias: self.by_alias,
            exclude_unset: self.exclude_unset,
            exclude_none: self.exclude_none,
            ..FieldFilter::DEFAULT
        }
    }

    /// True when no field would be dropped by this filter.
    pub fn is_passthrough(&self) -> bool {
        self.include.is_none()
            && self.exclude.is_none()
            && !self.exclude_unset
            && !self.exclude_defaults
            && !self.exclude_none
    }
}

impl Default for FieldFilter {
    fn default() -> Self {
        FieldFilter::DEFAULT
    }
}

/// Options for a single encode call.
#[derive(Debug, Clone)]
pub struct EncodeContext {
    pub filter: FieldFilter,
    pub custom_encoders: Arc<EncoderMap>,
    /// Skip fields carrying the reserved internal prefix.
    pub safe_mode: bool,
}

impl Default for EncodeContext {
    fn default() -> Self {
        Self {
            filter: FieldFilter::DEFAULT,
            custom_encoders: Arc::new(EncoderMap::new()),
            safe_mode: true,
        }
    }
}

impl EncodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.include = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.exclude = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn by_alias(mut self, by_alias: bool) -> Self {
        self.filter.by_alias = by_alias;
        self
    }

    pub fn exclude_unset(mut self, exclude_unset: bool) -> Self {
        self.filter.exclude_unset = exclude_unset;
        self
    }

    pub fn exclude_defaults(mut self, exclude_defaults: bool) -> Self {
        self.filter.exclude_defaults = exclude_defaults;
        self
    }

    pub fn exclude_none(mut self, exclude_none: bool) -> Self {
        self.filter.exclude_none = exclude_none;
        self
    }

    /// Replace the caller overrides.
    pub fn custom_encoder(mut self, encoders: EncoderMap) -> Self {
        self.custom_encoders = Arc::new(encoders);
        self
    }

    /// Add a single caller override for `T`.
    pub fn encode_type<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.custom_encoders).insert::<T, F>(f);
        self
    }

    pub fn safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Context for values below the top level.
    pub fn nested(&self) -> EncodeContext {
        EncodeContext {
            filter: self.filter.nested(),
            custom_encoders: Arc::clone(&self.custom_encoders),
            safe_mode: self.safe_mode,
        }
    }

    /// Context for the keys and values of a mapping.
    pub fn for_mapping(&self) -> EncodeContext {
        EncodeContext {
            filter: self.filter.for_mapping(),
            custom_encoders: Arc::clone(&self.custom_encoders),
            safe_mode: self.safe_mode,
        }
    }

    /// Default filter and no overrides, used past a record boundary.
    ///
    /// `safe_mode` still carries over: reserved fields stay hidden in models
    /// nested under a record unless the caller turned that off.
    pub fn fresh(&self) -> EncodeContext {
        EncodeContext {
            safe_mode: self.safe_mode,
            ..EncodeContext::default()
        }
    }

    /// Same filter, with `encoders` as the override table.
    pub fn with_encoders(&self, encoders: Arc<EncoderMap>) -> EncodeContext {
        EncodeContext {
            filter: self.filter.clone(),
            custom_encoders: encoders,
            safe_mode: self.safe_mode,
        }
    }
}
