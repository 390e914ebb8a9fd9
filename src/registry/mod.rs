//! Type encoder registry.
//!
//! Two lookup tables, both single-step: a transform's output is final and is
//! never fed back into the dispatcher.
//!
//! - **Exact rules**: `TypeId` → transform, hit only by the precise type.
//! - **Base rules**: an ordered list of base-type tuples. A rule matches a value
//!   whose own type is in the tuple, or that [`upcast`](crate::Encodable::upcast)s
//!   to one of them. First match wins, so the order is part of the contract.
//!
//! The default registry is built once per process and shared read-only.

use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::encodable::Encodable;
use crate::types::{EncoderConfig, Error, Result, SecretPolicy};

mod defaults;

pub use defaults::decimal_encoder;

/// A single-step conversion to JSON.
pub type EncodeFn = Arc<dyn Fn(&dyn Encodable) -> Result<Value> + Send + Sync>;

/// Wrap a typed transform into an [`EncodeFn`] that downcasts its input.
pub fn typed<T, F>(f: F) -> EncodeFn
where
    T: Any,
    F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(move |value: &dyn Encodable| match value.as_any().downcast_ref::<T>() {
        Some(v) => f(v),
        None => Err(Error::type_mismatch(
            std::any::type_name::<T>(),
            value.type_name(),
        )),
    })
}

// =============================================================================
// Override maps
// =============================================================================

/// Type-keyed encoder overrides, supplied by callers or declared by models.
#[derive(Clone, Default)]
pub struct EncoderMap {
    entries: HashMap<TypeId, (&'static str, EncodeFn)>,
}

impl EncoderMap {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register an override for `T`, replacing any previous one.
    pub fn insert<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        self.entries
            .insert(TypeId::of::<T>(), (std::any::type_name::<T>(), typed(f)));
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert::<T, F>(f);
        self
    }

    /// Override registered for the value's exact type.
    pub fn lookup(&self, value: &dyn Encodable) -> Option<&EncodeFn> {
        self.entries.get(&value.value_type_id()).map(|(_, f)| f)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// `self` overlaid with `overrides`; entries of `overrides` win.
    pub fn merged_with(&self, overrides: &EncoderMap) -> EncoderMap {
        let mut entries = self.entries.clone();
        entries.extend(
            overrides
                .entries
                .iter()
                .map(|(id, entry)| (*id, entry.clone())),
        );
        EncoderMap { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EncoderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("EncoderMap").field("types", &names).finish()
    }
}

// =============================================================================
// Base rules
// =============================================================================

struct Member {
    type_id: TypeId,
    type_name: &'static str,
    encode: EncodeFn,
}

enum Matcher {
    /// Base-type tuple: one transform per member type.
    AnyOf(Vec<Member>),
    /// Structural predicate.
    Capability {
        test: fn(&dyn Encodable) -> bool,
        encode: EncodeFn,
    },
}

/// One entry of the ordered base-type rule list.
pub struct BaseRule {
    label: &'static str,
    matcher: Matcher,
}

impl BaseRule {
    /// Empty base-type tuple; add members with [`member`](Self::member).
    pub fn any_of(label: &'static str) -> Self {
        Self {
            label,
            matcher: Matcher::AnyOf(Vec::new()),
        }
    }

    /// Rule matched by a predicate instead of a type tuple.
    pub fn capability(
        label: &'static str,
        test: fn(&dyn Encodable) -> bool,
        encode: EncodeFn,
    ) -> Self {
        Self {
            label,
            matcher: Matcher::Capability { test, encode },
        }
    }

    /// Add `T` to the tuple with its transform. No effect on capability rules.
    pub fn member<T, F>(self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        self.member_fn(TypeId::of::<T>(), std::any::type_name::<T>(), typed(f))
    }

    fn member_fn(mut self, type_id: TypeId, type_name: &'static str, encode: EncodeFn) -> Self {
        if let Matcher::AnyOf(members) = &mut self.matcher {
            members.push(Member {
                type_id,
                type_name,
                encode,
            });
        }
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Type names in the tuple, in order. Empty for capability rules.
    pub fn type_names(&self) -> Vec<&'static str> {
        match &self.matcher {
            Matcher::AnyOf(members) => members.iter().map(|m| m.type_name).collect(),
            Matcher::Capability { .. } => Vec::new(),
        }
    }

    fn matches<'r, 'v>(&'r self, value: &'v dyn Encodable) -> Option<RuleHit<'r, 'v>> {
        match &self.matcher {
            Matcher::AnyOf(members) => {
                let own = value.value_type_id();
                if let Some(m) = members.iter().find(|m| m.type_id == own) {
                    return Some(RuleHit::new(self.label, &m.encode, value));
                }
                members.iter().find_map(|m| {
                    value
                        .upcast(m.type_id)
                        .map(|ancestor| RuleHit::new(self.label, &m.encode, ancestor))
                })
            }
            Matcher::Capability { test, encode } => {
                test(value).then(|| RuleHit::new(self.label, encode, value))
            }
        }
    }
}

impl fmt::Debug for BaseRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRule")
            .field("label", &self.label)
            .field("types", &self.type_names())
            .finish()
    }
}

/// A matched rule, ready to apply.
pub struct RuleHit<'r, 'v> {
    label: &'static str,
    encode: &'r EncodeFn,
    target: &'v dyn Encodable,
}

impl<'r, 'v> RuleHit<'r, 'v> {
    fn new(label: &'static str, encode: &'r EncodeFn, target: &'v dyn Encodable) -> Self {
        Self {
            label,
            encode,
            target,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run the transform on the matched value (or its ancestor view).
    pub fn apply(&self) -> Result<Value> {
        (self.encode)(self.target)
    }
}

impl fmt::Debug for RuleHit<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleHit")
            .field("label", &self.label)
            .field("target", &self.target.type_name())
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Exact-type table plus ordered base-type rules. Immutable once built.
pub struct EncoderRegistry {
    exact: HashMap<TypeId, (&'static str, EncodeFn)>,
    base: Vec<BaseRule>,
}

static GLOBAL: OnceLock<Arc<EncoderRegistry>> = OnceLock::new();

impl EncoderRegistry {
    /// Default rule set with the given secret policy.
    pub fn new(secrets: SecretPolicy) -> Self {
        defaults::default_rules(secrets).build()
    }

    /// Default rule set honouring the configured secret policy.
    pub fn with_config(config: &EncoderConfig) -> Self {
        Self::new(config.secrets)
    }

    /// Process-wide default registry (secrets revealed), built on first use.
    pub fn global() -> Arc<EncoderRegistry> {
        GLOBAL
            .get_or_init(|| {
                tracing::debug!("building default encoder registry");
                Arc::new(EncoderRegistry::new(SecretPolicy::Reveal))
            })
            .clone()
    }

    /// Empty builder for custom rule tables.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Exact-type rule for the value's concrete type.
    pub fn lookup_exact(&self, value: &dyn Encodable) -> Option<&EncodeFn> {
        self.exact.get(&value.value_type_id()).map(|(_, f)| f)
    }

    /// First base rule matching the value.
    pub fn lookup_base<'r, 'v>(&'r self, value: &'v dyn Encodable) -> Option<RuleHit<'r, 'v>> {
        self.base.iter().find_map(|rule| rule.matches(value))
    }

    /// Exact rule first, then the base-rule scan.
    pub fn lookup<'r, 'v>(&'r self, value: &'v dyn Encodable) -> Option<RuleHit<'r, 'v>> {
        match self.exact.get(&value.value_type_id()) {
            Some((name, encode)) => Some(RuleHit::new(*name, encode, value)),
            None => self.lookup_base(value),
        }
    }

    pub fn contains_exact<T: Any>(&self) -> bool {
        self.exact.contains_key(&TypeId::of::<T>())
    }

    /// Base rule labels in scan order.
    pub fn base_labels(&self) -> Vec<&'static str> {
        self.base.iter().map(BaseRule::label).collect()
    }

    pub fn base_rules(&self) -> &[BaseRule] {
        &self.base
    }

    pub fn exact_len(&self) -> usize {
        self.exact.len()
    }
}

impl Default for EncoderRegistry {
    fn default() -> Self {
        Self::new(SecretPolicy::default())
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("exact", &self.exact.len())
            .field("base", &self.base_labels())
            .finish()
    }
}

/// Builder for [`EncoderRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    exact: HashMap<TypeId, (&'static str, EncodeFn)>,
    base: Vec<BaseRule>,
}

impl RegistryBuilder {
    /// Exact-type rule for `T`.
    pub fn exact<T, F>(mut self, f: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value> + Send + Sync + 'static,
    {
        self.exact
            .insert(TypeId::of::<T>(), (std::any::type_name::<T>(), typed(f)));
        self
    }

    /// Append a base rule to the end of the scan order.
    pub fn base(mut self, rule: BaseRule) -> Self {
        self.base.push(rule);
        self
    }

    /// Register every member of `rule` as an exact rule, then append the rule
    /// itself to the base scan.
    pub fn family(mut self, rule: BaseRule) -> Self {
        if let Matcher::AnyOf(members) = &rule.matcher {
            for m in members {
                self.exact
                    .insert(m.type_id, (m.type_name, m.encode.clone()));
            }
        }
        self.base.push(rule);
        self
    }

    pub fn build(self) -> EncoderRegistry {
        EncoderRegistry {
            exact: self.exact,
            base: self.base,
        }
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("exact", &self.exact.len())
            .field("base", &self.base.len())
            .finish()
    }
}
