//! Structured value resolution.
//!
//! Turns a [`Model`] into its ordered output fields under a [`FieldFilter`],
//! and works out which overrides apply to the field values.

use std::sync::Arc;

use crate::encodable::{is_null, Model, ModelField, ValueRef};
use crate::filter::{EncodeContext, FieldFilter};
use crate::registry::EncoderMap;
use crate::types::DEFAULT_RESERVED_PREFIX;

/// Fields of a model after filtering, ready to encode.
#[derive(Debug)]
pub struct Resolved<'a> {
    /// Output key and value, in declaration order.
    pub fields: Vec<(String, ValueRef<'a>)>,
    /// Type-declared encoders overlaid with the caller's.
    pub encoders: Arc<EncoderMap>,
}

/// Applies field filters and the reserved-prefix rule to models.
#[derive(Debug, Clone)]
pub struct StructuredValueResolver {
    reserved_prefix: String,
}

impl Default for StructuredValueResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVED_PREFIX)
    }
}

impl StructuredValueResolver {
    pub fn new(reserved_prefix: impl Into<String>) -> Self {
        Self {
            reserved_prefix: reserved_prefix.into(),
        }
    }

    pub fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }

    pub fn resolve<'a>(&self, model: &'a dyn Model, ctx: &EncodeContext) -> Resolved<'a> {
        let filter = &ctx.filter;
        let fields = model
            .fields()
            .into_iter()
            .filter(|field| self.keep(field, filter, ctx.safe_mode))
            .map(|field| {
                let key = field.key(filter.by_alias).to_string();
                (key, field.into_value())
            })
            .collect();

        let declared = model.json_encoders();
        let encoders = if declared.is_empty() {
            Arc::clone(&ctx.custom_encoders)
        } else {
            Arc::new(declared.merged_with(&ctx.custom_encoders))
        };

        Resolved { fields, encoders }
    }

    fn keep(&self, field: &ModelField<'_>, filter: &FieldFilter, safe_mode: bool) -> bool {
        let key = field.key(filter.by_alias);

        if let Some(include) = &filter.include {
            if !include.contains(key) {
                return false;
            }
        }
        if let Some(exclude) = &filter.exclude {
            if exclude.contains(key) {
                return false;
            }
        }
        if filter.exclude_unset && !field.is_set() {
            return false;
        }
        if filter.exclude_defaults && field.is_default() {
            return false;
        }
        if filter.exclude_none && is_null(field.value()) {
            return false;
        }
        if safe_mode && self.is_reserved(field.name(), key) {
            tracing::trace!(field = field.name(), "dropping reserved field");
            return false;
        }
        true
    }

    fn is_reserved(&self, name: &str, key: &str) -> bool {
        !self.reserved_prefix.is_empty()
            && (name.starts_with(&self.reserved_prefix) || key.starts_with(&self.reserved_prefix))
    }
}
