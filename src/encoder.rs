//! Recursive encoder.
//!
//! Dispatch order, first applicable rule wins:
//!
//! | # | input | result |
//! |---|-------|--------|
//! | 1 | record | field mapping, encoded with a fresh context |
//! | 2 | model | resolver output, field values with the nested context |
//! | 3 | enum | underlying value, same context |
//! | 4 | path | lossy string form |
//! | 5 | primitive | identity |
//! | 6 | mapping | object; keys stringified, keys and values with the mapping context |
//! | 7 | sequence | array, items with the same context |
//! | 8 | exact registry rule | transform output |
//! | 9 | override (exact type) | transform output |
//! | 10 | base-type rule | transform output |
//! | 11 | key-value view | as a mapping |
//! | 12 | anything else | [`Error::Unencodable`] |
//!
//! Rules 8 to 12 apply only to [`Shape::Opaque`] values. Transparent wrappers
//! are peeled before dispatch. Transform outputs are final and never
//! re-dispatched.

use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::encodable::{float, Encodable, Shape, ValueRef};
use crate::filter::EncodeContext;
use crate::registry::EncoderRegistry;
use crate::resolver::StructuredValueResolver;
use crate::types::{EncoderConfig, Error, Result, SecretPolicy};

/// Converts [`Encodable`] values into `serde_json::Value` trees.
#[derive(Debug, Clone)]
pub struct JsonableEncoder {
    registry: Arc<EncoderRegistry>,
    resolver: StructuredValueResolver,
    config: EncoderConfig,
}

impl Default for JsonableEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonableEncoder {
    /// Encoder over the shared default registry.
    pub fn new() -> Self {
        Self::with_registry(EncoderRegistry::global(), EncoderConfig::default())
    }

    /// Encoder honouring `config`. Reuses the shared registry unless the
    /// secret policy differs from the default.
    pub fn with_config(config: EncoderConfig) -> Self {
        let registry = if config.secrets == SecretPolicy::default() {
            EncoderRegistry::global()
        } else {
            Arc::new(EncoderRegistry::with_config(&config))
        };
        Self::with_registry(registry, config)
    }

    pub fn with_registry(registry: Arc<EncoderRegistry>, config: EncoderConfig) -> Self {
        Self {
            registry,
            resolver: StructuredValueResolver::new(config.reserved_prefix.clone()),
            config,
        }
    }

    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode `value` into a JSON-safe tree. Any failure aborts the whole call.
    pub fn encode(&self, value: &dyn Encodable, ctx: &EncodeContext) -> Result<Value> {
        self.encode_at(value, ctx, 0)
    }

    /// Encode, then write compact JSON text.
    pub fn to_string(&self, value: &dyn Encodable, ctx: &EncodeContext) -> Result<String> {
        let tree = self.encode(value, ctx)?;
        Ok(serde_json::to_string(&tree)?)
    }

    pub fn to_vec(&self, value: &dyn Encodable, ctx: &EncodeContext) -> Result<Vec<u8>> {
        let tree = self.encode(value, ctx)?;
        Ok(serde_json::to_vec(&tree)?)
    }

    fn encode_at(&self, value: &dyn Encodable, ctx: &EncodeContext, depth: usize) -> Result<Value> {
        if let Some(max) = self.config.max_depth {
            if depth > max {
                return Err(Error::DepthExceeded(max));
            }
        }
        let next = depth + 1;

        match value.shape() {
            Shape::Transparent(inner) => self.encode_at(inner.get(), ctx, next),
            Shape::Record(fields) => {
                let fresh = ctx.fresh();
                let mut out = Map::with_capacity(fields.len());
                for (name, field) in fields {
                    out.insert(name.to_string(), self.encode_at(field.get(), &fresh, next)?);
                }
                Ok(Value::Object(out))
            }
            Shape::Model(model) => {
                let resolved = self.resolver.resolve(model, ctx);
                let field_ctx = ctx.nested().with_encoders(resolved.encoders);

                let mut out = Map::with_capacity(resolved.fields.len());
                for (key, field) in resolved.fields {
                    let encoded = self.encode_at(field.get(), &field_ctx, next)?;
                    out.insert(key, encoded);
                }
                Ok(Value::Object(out))
            }
            Shape::Enum(inner) => self.encode_at(inner.get(), ctx, next),
            Shape::Path(path) => Ok(Value::String(path.to_string_lossy().into_owned())),
            Shape::Null => Ok(Value::Null),
            Shape::Bool(b) => Ok(Value::Bool(b)),
            Shape::Int(i) => Ok(Value::from(i)),
            Shape::UInt(u) => Ok(Value::from(u)),
            Shape::Float(f) => float(f),
            Shape::Str(s) => Ok(Value::String(s.into_owned())),
            Shape::Mapping(entries) => self.encode_mapping(entries, ctx, next),
            Shape::Sequence(items) => {
                let mut out = Vec::new();
                for item in items {
                    let item = item?;
                    out.push(self.encode_at(item.get(), ctx, next)?);
                }
                Ok(Value::Array(out))
            }
            Shape::Opaque => self.encode_opaque(value, ctx, depth),
        }
    }

    fn encode_opaque(&self, value: &dyn Encodable, ctx: &EncodeContext, depth: usize) -> Result<Value> {
        let type_name = value.type_name();

        if let Some(encode) = self.registry.lookup_exact(value) {
            tracing::trace!(type_name, "exact registry rule");
            return encode(value);
        }
        if let Some(encode) = ctx.custom_encoders.lookup(value) {
            tracing::trace!(type_name, "custom encoder");
            return encode(value);
        }
        if let Some(hit) = self.registry.lookup_base(value) {
            tracing::trace!(type_name, rule = hit.label(), "base-type rule");
            return hit.apply();
        }
        if let Some(entries) = value.key_value_view() {
            tracing::debug!(type_name, "encoding through key-value view");
            return self.encode_mapping(entries, ctx, depth + 1);
        }

        tracing::debug!(type_name, "no encoder found");
        Err(Error::unencodable(type_name))
    }

    fn encode_mapping(
        &self,
        entries: Vec<(ValueRef<'_>, ValueRef<'_>)>,
        ctx: &EncodeContext,
        depth: usize,
    ) -> Result<Value> {
        let inner = ctx.for_mapping();
        let mut out = Map::with_capacity(entries.len());
        for (key, value) in entries {
            let key = self.encode_key(key.get(), &inner, depth)?;
            let value = self.encode_at(value.get(), &inner, depth)?;
            out.insert(key, value);
        }
        Ok(Value::Object(out))
    }

    /// Object key for a mapping key. Byte strings are decoded; anything else
    /// is encoded and, unless it encodes to a string, written as JSON text.
    fn encode_key(&self, key: &dyn Encodable, ctx: &EncodeContext, depth: usize) -> Result<String> {
        if let Some(bytes) = key.as_any().downcast_ref::<Bytes>() {
            return Ok(std::str::from_utf8(bytes)?.to_string());
        }
        match self.encode_at(key, ctx, depth)? {
            Value::String(s) => Ok(s),
            other => Ok(serde_json::to_string(&other)?),
        }
    }
}

/// Encode `value` with the default encoder and context.
pub fn jsonable_encoder(value: &dyn Encodable) -> Result<Value> {
    JsonableEncoder::new().encode(value, &EncodeContext::default())
}

/// Encode `value` with the default encoder and the given context.
pub fn jsonable_encoder_with(value: &dyn Encodable, ctx: &EncodeContext) -> Result<Value> {
    JsonableEncoder::new().encode(value, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodable::{Model, ModelField};
    use crate::registry::EncoderMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::any::TypeId;
    use std::collections::BTreeMap;
    use tracing_test::traced_test;

    #[derive(Debug)]
    struct Token(u32);
    crate::encodable_opaque!(Token);

    #[derive(Debug)]
    struct Header {
        name: String,
        value: String,
    }

    impl Encodable for Header {
        fn shape(&self) -> Shape<'_> {
            Shape::Opaque
        }

        fn key_value_view(&self) -> Option<Vec<(ValueRef<'_>, ValueRef<'_>)>> {
            Some(vec![(ValueRef::from(&self.name), ValueRef::from(&self.value))])
        }
    }

    /// Newtype that declares `uuid::Uuid` as its ancestor.
    #[derive(Debug)]
    struct OrderId(uuid::Uuid);

    impl Encodable for OrderId {
        fn shape(&self) -> Shape<'_> {
            Shape::Opaque
        }

        fn upcast(&self, base: TypeId) -> Option<&dyn Encodable> {
            (base == TypeId::of::<uuid::Uuid>()).then_some(&self.0 as &dyn Encodable)
        }
    }

    #[derive(Debug)]
    struct Item {
        sku: String,
        qty: u32,
        note: Option<String>,
    }

    impl Encodable for Item {
        fn shape(&self) -> Shape<'_> {
            Shape::Model(self)
        }
    }

    impl Model for Item {
        fn fields(&self) -> Vec<ModelField<'_>> {
            vec![
                ModelField::new("sku", &self.sku),
                ModelField::with_default("qty", &self.qty, 1),
                ModelField::new("note", &self.note).set(self.note.is_some()),
            ]
        }
    }

    fn item(sku: &str, qty: u32) -> Item {
        Item {
            sku: sku.to_string(),
            qty,
            note: None,
        }
    }

    #[test]
    fn test_primitives_identity() {
        assert_eq!(jsonable_encoder(&42u8).unwrap(), json!(42));
        assert_eq!(jsonable_encoder(&-1i64).unwrap(), json!(-1));
        assert_eq!(jsonable_encoder(&1.25f64).unwrap(), json!(1.25));
        assert_eq!(jsonable_encoder(&"hi").unwrap(), json!("hi"));
        assert_eq!(jsonable_encoder(&()).unwrap(), Value::Null);
        assert_eq!(jsonable_encoder(&None::<u8>).unwrap(), Value::Null);
        assert_eq!(jsonable_encoder(&Some(true)).unwrap(), json!(true));
    }

    #[test]
    fn test_non_finite_float_is_error() {
        let err = jsonable_encoder(&f64::INFINITY).unwrap_err();
        assert!(matches!(err, Error::NonFiniteFloat(_)));
    }

    #[test]
    fn test_sequence_applies_filter_to_each_item() {
        let items = vec![item("a", 1), item("b", 2)];
        let ctx = EncodeContext::new().exclude_defaults(true).exclude_none(true);
        let encoded = jsonable_encoder_with(&items, &ctx).unwrap();
        assert_eq!(encoded, json!([{"sku": "a"}, {"sku": "b", "qty": 2}]));
    }

    #[test]
    fn test_mapping_values_use_mapping_filter() {
        let mut map = BTreeMap::new();
        map.insert("first", item("a", 1));

        let ctx = EncodeContext::new().exclude_defaults(true);
        let encoded = jsonable_encoder_with(&map, &ctx).unwrap();
        assert_eq!(encoded, json!({"first": {"sku": "a", "qty": 1, "note": null}}));

        let ctx = EncodeContext::new().exclude_none(true);
        let encoded = jsonable_encoder_with(&map, &ctx).unwrap();
        assert_eq!(encoded, json!({"first": {"sku": "a", "qty": 1}}));

        let ctx = EncodeContext::new().exclude_unset(true);
        let encoded = jsonable_encoder_with(&map, &ctx).unwrap();
        assert_eq!(encoded, json!({"first": {"sku": "a", "qty": 1}}));

        let ctx = EncodeContext::new().include(["first"]);
        let encoded = jsonable_encoder_with(&map, &ctx).unwrap();
        assert_eq!(encoded, json!({"first": {"sku": "a", "qty": 1, "note": null}}));
    }

    #[test]
    fn test_mapping_filter_reaches_nested_mappings() {
        let mut inner = BTreeMap::new();
        inner.insert("x", item("a", 1));
        let mut outer = BTreeMap::new();
        outer.insert("group", inner);

        let ctx = EncodeContext::new().exclude_none(true);
        let encoded = jsonable_encoder_with(&outer, &ctx).unwrap();
        assert_eq!(encoded, json!({"group": {"x": {"sku": "a", "qty": 1}}}));
    }

    #[test]
    fn test_integer_and_tuple_keys() {
        let mut ints = BTreeMap::new();
        ints.insert(2u32, "two");
        ints.insert(1u32, "one");
        assert_eq!(jsonable_encoder(&ints).unwrap(), json!({"1": "one", "2": "two"}));

        let mut pairs = BTreeMap::new();
        pairs.insert((1u8, "x"), true);
        assert_eq!(jsonable_encoder(&pairs).unwrap(), json!({"[1,\"x\"]": true}));
    }

    #[test]
    fn test_byte_keys_decoded() {
        let mut map = BTreeMap::new();
        map.insert(Bytes::from_static(b"k"), 1u8);
        assert_eq!(jsonable_encoder(&map).unwrap(), json!({"k": 1}));

        let mut bad = BTreeMap::new();
        bad.insert(Bytes::from_static(b"\xff"), 1u8);
        assert!(matches!(
            jsonable_encoder(&bad).unwrap_err(),
            Error::InvalidUtf8(_)
        ));
    }

    #[test]
    fn test_registry_rule_wins_over_override() {
        let ctx = EncodeContext::new().encode_type::<uuid::Uuid, _>(|_| Ok(json!("override")));
        let encoded = jsonable_encoder_with(&uuid::Uuid::nil(), &ctx).unwrap();
        assert_eq!(encoded, json!("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_override_for_unregistered_type() {
        let ctx = EncodeContext::new()
            .custom_encoder(EncoderMap::new().with::<Token, _>(|t| Ok(json!(format!("tok-{}", t.0)))));
        assert_eq!(jsonable_encoder_with(&Token(9), &ctx).unwrap(), json!("tok-9"));
        assert_eq!(
            jsonable_encoder_with(&vec![Token(1)], &ctx).unwrap(),
            json!(["tok-1"])
        );
    }

    #[test]
    fn test_override_output_is_not_redispatched() {
        let ctx = EncodeContext::new().encode_type::<Token, _>(|_| Ok(json!({"raw": [1, 2]})));
        assert_eq!(
            jsonable_encoder_with(&Token(0), &ctx).unwrap(),
            json!({"raw": [1, 2]})
        );
    }

    #[test]
    fn test_upcast_hits_base_rule() {
        let id = OrderId(uuid::Uuid::nil());
        assert_eq!(
            jsonable_encoder(&id).unwrap(),
            json!("00000000-0000-0000-0000-000000000000")
        );
    }

    #[traced_test]
    #[test]
    fn test_key_value_view_fallback() {
        let header = Header {
            name: "content-type".into(),
            value: "text/plain".into(),
        };
        assert_eq!(
            jsonable_encoder(&header).unwrap(),
            json!({"content-type": "text/plain"})
        );
        assert!(logs_contain("encoding through key-value view"));
    }

    #[traced_test]
    #[test]
    fn test_unencodable_names_type() {
        let err = jsonable_encoder(&Token(1)).unwrap_err();
        assert!(err.is_unencodable());
        assert!(err.to_string().contains("Token"));
        assert!(err.to_string().ends_with("is not JSON serializable"));
        assert!(logs_contain("no encoder found"));
    }

    #[test]
    fn test_depth_guard() {
        let config = EncoderConfig {
            max_depth: Some(3),
            ..EncoderConfig::default()
        };
        let encoder = JsonableEncoder::with_config(config);
        let shallow = vec![vec![1u8]];
        assert_eq!(
            encoder.encode(&shallow, &EncodeContext::new()).unwrap(),
            json!([[1]])
        );

        let deep = vec![vec![vec![vec![1u8]]]];
        let err = encoder.encode(&deep, &EncodeContext::new()).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded(3)));
    }

    #[test]
    fn test_redacting_encoder() {
        let config = EncoderConfig {
            secrets: SecretPolicy::Redact,
            ..EncoderConfig::default()
        };
        let encoder = JsonableEncoder::with_config(config);
        let secret = crate::types::SecretString::new("pw");
        assert_eq!(
            encoder.encode(&secret, &EncodeContext::new()).unwrap(),
            json!("**********")
        );
        assert_eq!(jsonable_encoder(&secret).unwrap(), json!("pw"));
    }

    #[test]
    fn test_to_string_and_to_vec() {
        let encoder = JsonableEncoder::new();
        let value = vec![item("a", 3)];
        let text = encoder.to_string(&value, &EncodeContext::new()).unwrap();
        assert_eq!(text, r#"[{"sku":"a","qty":3,"note":null}]"#);
        let bytes = encoder.to_vec(&value, &EncodeContext::new()).unwrap();
        assert_eq!(bytes, text.into_bytes());
    }
}
