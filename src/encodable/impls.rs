//! `Encodable` implementations for std and third-party types.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use super::{Encodable, Shape, ValueRef};
use crate::types::{NameEmail, SecretBytes, SecretString};

// =============================================================================
// Primitives
// =============================================================================

macro_rules! signed {
    ($($t:ty),*) => {$(
        impl Encodable for $t {
            fn shape(&self) -> Shape<'_> {
                Shape::Int(i64::from(*self))
            }
        }
    )*};
}

macro_rules! unsigned {
    ($($t:ty),*) => {$(
        impl Encodable for $t {
            fn shape(&self) -> Shape<'_> {
                Shape::UInt(u64::from(*self))
            }
        }
    )*};
}

signed!(i8, i16, i32, i64);
unsigned!(u8, u16, u32, u64);

impl Encodable for isize {
    fn shape(&self) -> Shape<'_> {
        match i64::try_from(*self) {
            Ok(i) => Shape::Int(i),
            Err(_) => Shape::Opaque,
        }
    }
}

impl Encodable for usize {
    fn shape(&self) -> Shape<'_> {
        match u64::try_from(*self) {
            Ok(u) => Shape::UInt(u),
            Err(_) => Shape::Opaque,
        }
    }
}

// Wide integers are numbers only when they fit a JSON integer.
impl Encodable for i128 {
    fn shape(&self) -> Shape<'_> {
        if let Ok(i) = i64::try_from(*self) {
            Shape::Int(i)
        } else if let Ok(u) = u64::try_from(*self) {
            Shape::UInt(u)
        } else {
            Shape::Opaque
        }
    }
}

impl Encodable for u128 {
    fn shape(&self) -> Shape<'_> {
        match u64::try_from(*self) {
            Ok(u) => Shape::UInt(u),
            Err(_) => Shape::Opaque,
        }
    }
}

impl Encodable for f32 {
    fn shape(&self) -> Shape<'_> {
        Shape::Float(f64::from(*self))
    }
}

impl Encodable for f64 {
    fn shape(&self) -> Shape<'_> {
        Shape::Float(*self)
    }
}

impl Encodable for bool {
    fn shape(&self) -> Shape<'_> {
        Shape::Bool(*self)
    }
}

impl Encodable for () {
    fn shape(&self) -> Shape<'_> {
        Shape::Null
    }
}

impl Encodable for String {
    fn shape(&self) -> Shape<'_> {
        Shape::Str(Cow::Borrowed(self.as_str()))
    }
}

impl Encodable for &'static str {
    fn shape(&self) -> Shape<'_> {
        Shape::Str(Cow::Borrowed(*self))
    }
}

impl Encodable for char {
    fn shape(&self) -> Shape<'_> {
        Shape::Str(Cow::Owned(self.to_string()))
    }
}

impl Encodable for PathBuf {
    fn shape(&self) -> Shape<'_> {
        Shape::Path(self.as_path())
    }
}

// =============================================================================
// Wrappers
// =============================================================================

impl<T: Encodable> Encodable for Option<T> {
    fn shape(&self) -> Shape<'_> {
        match self {
            Some(value) => Shape::Transparent(ValueRef::Borrowed(value)),
            None => Shape::Null,
        }
    }
}

impl<T: Encodable> Encodable for Box<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Transparent(ValueRef::Borrowed(&**self))
    }
}

impl Encodable for Box<dyn Encodable> {
    fn shape(&self) -> Shape<'_> {
        Shape::Transparent(ValueRef::Borrowed(&**self))
    }
}

impl<T: Encodable> Encodable for Arc<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Transparent(ValueRef::Borrowed(&**self))
    }
}

impl<T: Encodable> Encodable for Rc<T> {
    fn shape(&self) -> Shape<'_> {
        Shape::Transparent(ValueRef::Borrowed(&**self))
    }
}

// =============================================================================
// Collections
// =============================================================================

fn borrowed_items<'a, T, I>(iter: I) -> Shape<'a>
where
    T: Encodable,
    I: Iterator<Item = &'a T> + 'a,
{
    Shape::Sequence(Box::new(iter.map(|item| Ok(ValueRef::Borrowed(item)))))
}

impl<T: Encodable> Encodable for Vec<T> {
    fn shape(&self) -> Shape<'_> {
        borrowed_items(self.iter())
    }
}

impl<T: Encodable, const N: usize> Encodable for [T; N] {
    fn shape(&self) -> Shape<'_> {
        borrowed_items(self.iter())
    }
}

impl<T: Encodable> Encodable for VecDeque<T> {
    fn shape(&self) -> Shape<'_> {
        borrowed_items(self.iter())
    }
}

impl<T: Encodable, S: 'static> Encodable for HashSet<T, S> {
    fn shape(&self) -> Shape<'_> {
        borrowed_items(self.iter())
    }
}

impl<T: Encodable> Encodable for BTreeSet<T> {
    fn shape(&self) -> Shape<'_> {
        borrowed_items(self.iter())
    }
}

impl<K: Encodable, V: Encodable, S: 'static> Encodable for HashMap<K, V, S> {
    fn shape(&self) -> Shape<'_> {
        Shape::Mapping(
            self.iter()
                .map(|(k, v)| (ValueRef::Borrowed(k), ValueRef::Borrowed(v)))
                .collect(),
        )
    }
}

impl<K: Encodable, V: Encodable> Encodable for BTreeMap<K, V> {
    fn shape(&self) -> Shape<'_> {
        Shape::Mapping(
            self.iter()
                .map(|(k, v)| (ValueRef::Borrowed(k), ValueRef::Borrowed(v)))
                .collect(),
        )
    }
}

macro_rules! tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Encodable),+> Encodable for ($($name,)+) {
            fn shape(&self) -> Shape<'_> {
                let items: Vec<ValueRef<'_>> = vec![$(ValueRef::Borrowed(&self.$idx)),+];
                Shape::Sequence(Box::new(items.into_iter().map(Ok)))
            }
        }
    };
}

tuple!(A.0);
tuple!(A.0, B.1);
tuple!(A.0, B.1, C.2);
tuple!(A.0, B.1, C.2, D.3);
tuple!(A.0, B.1, C.2, D.3, E.4);
tuple!(A.0, B.1, C.2, D.3, E.4, F.5);

// =============================================================================
// Already-JSON data
// =============================================================================

impl Encodable for serde_json::Value {
    fn shape(&self) -> Shape<'_> {
        use serde_json::Value;

        match self {
            Value::Null => Shape::Null,
            Value::Bool(b) => Shape::Bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Shape::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Shape::Int(i)
                } else {
                    Shape::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Shape::Str(Cow::Borrowed(s)),
            Value::Array(items) => borrowed_items(items.iter()),
            Value::Object(map) => Shape::Mapping(
                map.iter()
                    .map(|(k, v)| (ValueRef::Borrowed(k), ValueRef::Borrowed(v)))
                    .collect(),
            ),
        }
    }
}

// =============================================================================
// Registry-backed scalars
// =============================================================================

macro_rules! opaque {
    ($($t:ty),* $(,)?) => {$(
        impl Encodable for $t {
            fn shape(&self) -> Shape<'_> {
                Shape::Opaque
            }
        }
    )*};
}

opaque!(
    bytes::Bytes,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
    chrono::Duration,
    std::time::Duration,
    rust_decimal::Decimal,
    regex::Regex,
    uuid::Uuid,
    IpAddr,
    Ipv4Addr,
    Ipv6Addr,
    SocketAddr,
    ipnet::IpNet,
    ipnet::Ipv4Net,
    ipnet::Ipv6Net,
    url::Url,
    SecretString,
    SecretBytes,
    NameEmail,
);
