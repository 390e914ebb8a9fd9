//! Declarative helpers for implementing [`Encodable`](crate::Encodable).

/// Implement `Encodable` for a C-like enum, mapping each variant to its
/// underlying value.
///
/// ```
/// use jsonable::{encodable_enum, jsonable_encoder};
///
/// #[derive(Debug, Clone, Copy)]
/// enum Priority {
///     Low,
///     High,
/// }
///
/// encodable_enum!(Priority {
///     Low => 1,
///     High => 10,
/// });
///
/// assert_eq!(jsonable_encoder(&Priority::High).unwrap(), 10);
/// ```
#[macro_export]
macro_rules! encodable_enum {
    ($ty:ident { $($variant:ident => $value:expr),+ $(,)? }) => {
        impl $crate::Encodable for $ty {
            fn shape(&self) -> $crate::Shape<'_> {
                match self {
                    $(Self::$variant => $crate::Shape::Enum($crate::ValueRef::owned($value)),)+
                }
            }
        }
    };
}

/// Implement `Encodable` for a plain record (field-only struct).
///
/// Records flatten to a mapping of the listed fields, in order.
#[macro_export]
macro_rules! encodable_record {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Encodable for $ty {
            fn shape(&self) -> $crate::Shape<'_> {
                $crate::Shape::Record(vec![
                    $((stringify!($field), $crate::ValueRef::from(&self.$field)),)+
                ])
            }
        }
    };
}

/// Implement `Encodable` for types encoded only through the registry or
/// caller-supplied encoders.
#[macro_export]
macro_rules! encodable_opaque {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Encodable for $ty {
            fn shape(&self) -> $crate::Shape<'_> {
                $crate::Shape::Opaque
            }
        }
    )+};
}
