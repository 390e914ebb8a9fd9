//! Input model for the encoder.
//!
//! Any value handed to the encoder implements [`Encodable`]. The trait does not
//! convert anything itself; it exposes a borrowed structural view ([`Shape`])
//! that the dispatcher matches on, plus two capabilities used by the later
//! dispatch rules:
//! - [`Encodable::upcast`]: explicit "is-instance-of" for base-type rules
//! - [`Encodable::key_value_view`]: the duck-typed mapping fallback
//!
//! ```text
//!   Record ─┐
//!   Model  ─┤
//!   Enum   ─┤               ┌── registry (exact)
//!   Path   ─┼─ structural   ├── overrides (exact)
//!   Prim.  ─┤   rules 1-7   ├── registry (base tuples)
//!   Mapping─┤               ├── key_value_view
//!   Seq.   ─┘   Opaque ─────┴── Unencodable
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::registry::EncoderMap;
use crate::types::Result;

mod impls;
mod lazy;
mod macros;

pub use lazy::LazySeq;

// =============================================================================
// Type identity
// =============================================================================

/// Runtime type identity, implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;

    /// Concrete type name, used in diagnostics.
    fn type_name(&self) -> &'static str;

    /// `TypeId` of the concrete type behind a trait object.
    fn value_type_id(&self) -> TypeId;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn value_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }
}

// =============================================================================
// Encodable
// =============================================================================

/// A value the encoder can inspect.
pub trait Encodable: AsAny {
    /// Structural view used for dispatch.
    fn shape(&self) -> Shape<'_>;

    /// View of this value as one of its declared ancestor types.
    ///
    /// Base-type rules call this with each type in their tuple; return the
    /// ancestor value when `self` "is an instance of" `base`.
    fn upcast(&self, _base: TypeId) -> Option<&dyn Encodable> {
        None
    }

    /// Key-value pairs for values that can be viewed as a mapping but do not
    /// present themselves as one.
    fn key_value_view(&self) -> Option<Vec<(ValueRef<'_>, ValueRef<'_>)>> {
        None
    }
}

/// Lazily produced sequence items.
pub type Items<'a> = Box<dyn Iterator<Item = Result<ValueRef<'a>>> + 'a>;

/// Borrowed structural view of a value.
pub enum Shape<'a> {
    /// Plain field-only aggregate.
    Record(Vec<(&'a str, ValueRef<'a>)>),
    /// Structured value with field metadata.
    Model(&'a dyn Model),
    /// Enumerated constant; carries the underlying value.
    Enum(ValueRef<'a>),
    /// Filesystem path.
    Path(&'a Path),
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(Cow<'a, str>),
    /// Key-value pairs in iteration order.
    Mapping(Vec<(ValueRef<'a>, ValueRef<'a>)>),
    /// Ordered or unordered collection, drained eagerly.
    Sequence(Items<'a>),
    /// Encoded exactly as the wrapped value (`Option`, `Box`, `Arc`).
    Transparent(ValueRef<'a>),
    /// No structure; handled by registry, overrides or fallback.
    Opaque,
}

impl Shape<'_> {
    /// Variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Record(_) => "record",
            Shape::Model(_) => "model",
            Shape::Enum(_) => "enum",
            Shape::Path(_) => "path",
            Shape::Null => "null",
            Shape::Bool(_) => "bool",
            Shape::Int(_) => "int",
            Shape::UInt(_) => "uint",
            Shape::Float(_) => "float",
            Shape::Str(_) => "str",
            Shape::Mapping(_) => "mapping",
            Shape::Sequence(_) => "sequence",
            Shape::Transparent(_) => "transparent",
            Shape::Opaque => "opaque",
        }
    }

    /// JSON value for primitive shapes, `None` for everything else.
    pub fn primitive(&self) -> Option<Result<Value>> {
        match self {
            Shape::Null => Some(Ok(Value::Null)),
            Shape::Bool(b) => Some(Ok(Value::Bool(*b))),
            Shape::Int(i) => Some(Ok(Value::from(*i))),
            Shape::UInt(u) => Some(Ok(Value::from(*u))),
            Shape::Float(f) => Some(float(*f)),
            Shape::Str(s) => Some(Ok(Value::String(s.clone().into_owned()))),
            _ => None,
        }
    }
}

impl fmt::Debug for Shape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Record(fields) => f
                .debug_list()
                .entries(fields.iter().map(|(name, _)| name))
                .finish(),
            Shape::Path(p) => write!(f, "Path({})", p.display()),
            Shape::Bool(b) => write!(f, "Bool({b})"),
            Shape::Int(i) => write!(f, "Int({i})"),
            Shape::UInt(u) => write!(f, "UInt({u})"),
            Shape::Float(x) => write!(f, "Float({x})"),
            Shape::Str(s) => write!(f, "Str({s:?})"),
            other => f.write_str(other.kind()),
        }
    }
}

/// Float as a JSON number. NaN and infinities are rejected.
pub fn float(f: f64) -> Result<Value> {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or(crate::types::Error::NonFiniteFloat(f))
}

/// True when the value is null once transparent wrappers are peeled off.
pub fn is_null(value: &dyn Encodable) -> bool {
    match value.shape() {
        Shape::Null => true,
        Shape::Transparent(inner) => is_null(inner.get()),
        _ => false,
    }
}

// =============================================================================
// ValueRef
// =============================================================================

/// Borrowed or owned handle to an encodable value.
pub enum ValueRef<'a> {
    Borrowed(&'a dyn Encodable),
    Owned(Box<dyn Encodable>),
}

impl<'a> ValueRef<'a> {
    pub fn owned<T: Encodable>(value: T) -> Self {
        ValueRef::Owned(Box::new(value))
    }

    pub fn get(&self) -> &dyn Encodable {
        match self {
            ValueRef::Borrowed(v) => *v,
            ValueRef::Owned(v) => v.as_ref(),
        }
    }
}

impl<'a, T: Encodable> From<&'a T> for ValueRef<'a> {
    fn from(value: &'a T) -> Self {
        ValueRef::Borrowed(value)
    }
}

impl fmt::Debug for ValueRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ValueRef::Borrowed(_) => "Borrowed",
            ValueRef::Owned(_) => "Owned",
        };
        write!(f, "{}<{}>", kind, self.get().type_name())
    }
}

// =============================================================================
// Models
// =============================================================================

/// Structured value: named fields with aliases, defaults and set-tracking.
pub trait Model: Encodable {
    /// Fields in declaration order.
    fn fields(&self) -> Vec<ModelField<'_>>;

    /// Encoders declared by the type itself. Caller overrides win on collision.
    fn json_encoders(&self) -> EncoderMap {
        EncoderMap::new()
    }
}

/// One field of a [`Model`], with the metadata the filters need.
#[derive(Debug)]
pub struct ModelField<'a> {
    name: &'a str,
    alias: Option<&'a str>,
    value: ValueRef<'a>,
    explicitly_set: bool,
    is_default: bool,
}

impl<'a> ModelField<'a> {
    pub fn new<T: Encodable>(name: &'a str, value: &'a T) -> Self {
        Self::from_ref(name, ValueRef::Borrowed(value))
    }

    /// Field with a declared default. `default` has the field's own type, so
    /// an untyped literal takes that type rather than its fallback.
    pub fn with_default<T>(name: &'a str, value: &'a T, default: T) -> Self
    where
        T: Encodable + PartialEq,
    {
        Self {
            is_default: *value == default,
            ..Self::new(name, value)
        }
    }

    /// Field whose value is computed on demand.
    pub fn computed<T: Encodable>(name: &'a str, value: T) -> Self {
        Self::from_ref(name, ValueRef::owned(value))
    }

    pub fn from_ref(name: &'a str, value: ValueRef<'a>) -> Self {
        Self {
            name,
            alias: None,
            value,
            explicitly_set: true,
            is_default: false,
        }
    }

    pub fn alias(mut self, alias: &'a str) -> Self {
        self.alias = Some(alias);
        self
    }

    /// Mark whether the field was assigned explicitly (fields are set by default).
    pub fn set(mut self, explicitly_set: bool) -> Self {
        self.explicitly_set = explicitly_set;
        self
    }


    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn alias_name(&self) -> Option<&'a str> {
        self.alias
    }

    /// Output key: alias when requested and declared, else the raw name.
    pub fn key(&self, by_alias: bool) -> &'a str {
        match (by_alias, self.alias) {
            (true, Some(alias)) => alias,
            _ => self.name,
        }
    }

    pub fn value(&self) -> &dyn Encodable {
        self.value.get()
    }

    pub fn is_set(&self) -> bool {
        self.explicitly_set
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn into_value(self) -> ValueRef<'a> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_shapes() {
        assert_eq!(Shape::Null.primitive().unwrap().unwrap(), Value::Null);
        assert_eq!(Shape::Int(-3).primitive().unwrap().unwrap(), Value::from(-3));
        assert_eq!(
            Shape::Str(Cow::Borrowed("x")).primitive().unwrap().unwrap(),
            Value::from("x")
        );
        assert!(Shape::Opaque.primitive().is_none());
        assert!(Shape::Float(f64::NAN).primitive().unwrap().is_err());
    }

    #[test]
    fn test_is_null_peels_wrappers() {
        let inner: Option<Option<i32>> = Some(None);
        assert!(is_null(&inner));
        assert!(is_null(&()));
        assert!(!is_null(&Some(1)));
    }

    #[test]
    fn test_model_field_key() {
        let count = 3u32;
        let field = ModelField::new("item_count", &count).alias("itemCount");
        assert_eq!(field.key(true), "itemCount");
        assert_eq!(field.key(false), "item_count");

        let plain = ModelField::new("count", &count);
        assert_eq!(plain.key(true), "count");
    }

    #[test]
    fn test_model_field_default_comparison() {
        let seven = 7i64;
        assert!(!ModelField::with_default("n", &seven, 0).is_default());
        assert!(!ModelField::new("n", &seven).is_default());

        // Literals take the field's type.
        let zero = 0u32;
        assert!(ModelField::with_default("count", &zero, 0).is_default());
        let ratio = 0.5f32;
        assert!(ModelField::with_default("ratio", &ratio, 0.5).is_default());
        let plan = String::from("free");
        assert!(ModelField::with_default("plan", &plan, "free".to_string()).is_default());
    }

    #[test]
    fn test_type_name_through_trait_object() {
        let value: &dyn Encodable = &String::from("x");
        assert_eq!(value.type_name(), "alloc::string::String");
        assert_eq!(value.value_type_id(), TypeId::of::<String>());
    }
}
