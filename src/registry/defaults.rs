//! Default rule set.
//!
//! Every concrete type below is registered as an exact rule; the same types are
//! then grouped by transform into base-type tuples, in this order, so newtypes
//! declaring one of them as an ancestor get the same treatment.

use bytes::Bytes;
use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Timelike, Utc,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use super::{BaseRule, RegistryBuilder};
use crate::encodable::{float, Encodable, Shape};
use crate::types::{
    Error, NameEmail, Result, SecretBytes, SecretPolicy, SecretString, REDACTED,
};

pub(super) fn default_rules(secrets: SecretPolicy) -> RegistryBuilder {
    RegistryBuilder::default()
        .family(BaseRule::any_of("utf8-decode").member::<Bytes, _>(utf8_decode))
        .family(
            BaseRule::any_of("string-form")
                .member::<NameEmail, _>(string_form)
                .member::<IpAddr, _>(string_form)
                .member::<Ipv4Addr, _>(string_form)
                .member::<Ipv6Addr, _>(string_form)
                .member::<SocketAddr, _>(string_form)
                .member::<ipnet::IpNet, _>(string_form)
                .member::<ipnet::Ipv4Net, _>(string_form)
                .member::<ipnet::Ipv6Net, _>(string_form)
                .member::<uuid::Uuid, _>(string_form)
                .member::<url::Url, _>(string_form)
                .member::<PathBuf, _>(path_form),
        )
        .family(
            BaseRule::any_of("iso-8601")
                .member::<NaiveDate, _>(|d| Ok(Value::String(d.format("%Y-%m-%d").to_string())))
                .member::<NaiveTime, _>(|t| {
                    let fmt = format!("%H:%M:%S{}", fraction(t));
                    Ok(Value::String(t.format(&fmt).to_string()))
                })
                .member::<NaiveDateTime, _>(|dt| {
                    let fmt = format!("%Y-%m-%dT%H:%M:%S{}", fraction(dt));
                    Ok(Value::String(dt.format(&fmt).to_string()))
                })
                .member::<DateTime<Utc>, _>(iso_datetime)
                .member::<DateTime<FixedOffset>, _>(iso_datetime)
                .member::<DateTime<Local>, _>(iso_datetime),
        )
        .family(
            BaseRule::any_of("total-seconds")
                .member::<std::time::Duration, _>(|d| float(d.as_secs_f64()))
                .member::<chrono::Duration, _>(chrono_seconds),
        )
        .family(BaseRule::any_of("decimal").member::<Decimal, _>(decimal_encoder))
        // The encoder unwraps enums structurally before reaching the registry;
        // this rule serves direct `EncoderRegistry::lookup` callers.
        .base(BaseRule::capability(
            "enum-value",
            is_enum,
            Arc::new(enum_value),
        ))
        .family(
            BaseRule::any_of("pattern")
                .member::<regex::Regex, _>(|r| Ok(Value::String(r.as_str().to_string()))),
        )
        .family(
            BaseRule::any_of("secret")
                .member::<SecretString, _>(move |s| {
                    reveal_or_redact(secrets, s.expose_secret().is_empty(), || {
                        Ok(s.expose_secret().to_string())
                    })
                })
                .member::<SecretBytes, _>(move |s| {
                    reveal_or_redact(secrets, s.expose_secret().is_empty(), || {
                        Ok(std::str::from_utf8(s.expose_secret())?.to_string())
                    })
                }),
        )
}

/// Encode a decimal as an integer when it is integral, otherwise as a float.
///
/// The decimal is normalized first, so `1.0` and `1` both encode as `1`;
/// `1.5` encodes as `1.5`. Integral values keep round-tripping exactly.
pub fn decimal_encoder(dec: &Decimal) -> Result<Value> {
    let canonical = dec.normalize();
    if canonical.scale() == 0 {
        let mantissa = canonical.mantissa();
        if let Ok(i) = i64::try_from(mantissa) {
            return Ok(Value::from(i));
        }
        if let Ok(u) = u64::try_from(mantissa) {
            return Ok(Value::from(u));
        }
    }
    let f = dec
        .to_f64()
        .ok_or_else(|| Error::custom(format!("decimal {dec} has no float representation")))?;
    float(f)
}

fn utf8_decode(b: &Bytes) -> Result<Value> {
    Ok(Value::String(std::str::from_utf8(b)?.to_string()))
}

fn string_form<T: Display>(v: &T) -> Result<Value> {
    Ok(Value::String(v.to_string()))
}

fn path_form(p: &PathBuf) -> Result<Value> {
    Ok(Value::String(p.to_string_lossy().into_owned()))
}

/// Whole microseconds past the second, ignoring the leap-second carry.
fn micros<T: Timelike>(t: &T) -> u32 {
    t.nanosecond() % 1_000_000_000 / 1_000
}

/// Six-digit fraction when there is one, nothing otherwise.
fn fraction<T: Timelike>(t: &T) -> &'static str {
    if micros(t) == 0 {
        ""
    } else {
        "%.6f"
    }
}

fn iso_datetime<Tz>(dt: &DateTime<Tz>) -> Result<Value>
where
    Tz: chrono::TimeZone,
    Tz::Offset: Display,
{
    let secs = if micros(dt) == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    Ok(Value::String(dt.to_rfc3339_opts(secs, false)))
}

fn chrono_seconds(d: &chrono::Duration) -> Result<Value> {
    match d.num_microseconds() {
        Some(us) => float(us as f64 / 1e6),
        None => float(d.num_milliseconds() as f64 / 1e3),
    }
}

fn is_enum(value: &dyn Encodable) -> bool {
    matches!(value.shape(), Shape::Enum(_))
}

/// Underlying value of an enum, when it is a JSON primitive.
fn enum_value(value: &dyn Encodable) -> Result<Value> {
    match value.shape() {
        Shape::Enum(inner) => {
            let inner = inner.get();
            let encoded = inner.shape().primitive();
            encoded.unwrap_or_else(|| Err(Error::unencodable(inner.type_name())))
        }
        _ => Err(Error::type_mismatch("enum", value.type_name())),
    }
}

fn reveal_or_redact(
    policy: SecretPolicy,
    empty: bool,
    reveal: impl FnOnce() -> Result<String>,
) -> Result<Value> {
    let text = match policy {
        SecretPolicy::Reveal => reveal()?,
        SecretPolicy::Redact if empty => String::new(),
        SecretPolicy::Redact => REDACTED.to_string(),
    };
    Ok(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EncoderRegistry;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn apply(registry: &EncoderRegistry, value: &dyn Encodable) -> Value {
        registry.lookup(value).unwrap().apply().unwrap()
    }

    #[test]
    fn test_decimal_integral_is_integer() {
        let v = decimal_encoder(&Decimal::from_str("1").unwrap()).unwrap();
        assert!(v.is_i64() || v.is_u64());
        assert_eq!(v, Value::from(1));

        let v = decimal_encoder(&Decimal::from_str("1.0").unwrap()).unwrap();
        assert_eq!(v, Value::from(1));

        let v = decimal_encoder(&Decimal::from_str("-42.000").unwrap()).unwrap();
        assert_eq!(v, Value::from(-42));
    }

    #[test]
    fn test_decimal_fractional_is_float() {
        let v = decimal_encoder(&Decimal::from_str("1.5").unwrap()).unwrap();
        assert!(v.is_f64());
        assert_eq!(v, Value::from(1.5));

        let v = decimal_encoder(&Decimal::from_str("-0.25").unwrap()).unwrap();
        assert_eq!(v, Value::from(-0.25));
    }

    #[test]
    fn test_decimal_large_integral() {
        let v = decimal_encoder(&Decimal::from(u64::MAX)).unwrap();
        assert_eq!(v, Value::from(u64::MAX));
    }

    #[test]
    fn test_bytes_decode() {
        let registry = EncoderRegistry::default();
        assert_eq!(
            apply(&registry, &Bytes::from_static(b"caf\xc3\xa9")),
            Value::from("café")
        );
        let bad = Bytes::from_static(b"\xff\xfe");
        let err = registry.lookup(&bad).unwrap().apply().unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8(_)));
    }

    #[test]
    fn test_iso_formats() {
        let registry = EncoderRegistry::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(apply(&registry, &date), Value::from("2024-01-01"));

        let time = NaiveTime::from_hms_opt(9, 30, 5).unwrap();
        assert_eq!(apply(&registry, &time), Value::from("09:30:05"));

        let dt = date.and_hms_milli_opt(12, 0, 0, 250).unwrap();
        assert_eq!(apply(&registry, &dt), Value::from("2024-01-01T12:00:00.250000"));

        let time = NaiveTime::from_hms_micro_opt(9, 30, 5, 7).unwrap();
        assert_eq!(apply(&registry, &time), Value::from("09:30:05.000007"));

        let whole = date.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(apply(&registry, &whole), Value::from("2024-01-01T12:00:00"));

        // Sub-microsecond precision is truncated like the fraction itself.
        let nanos = date.and_hms_nano_opt(12, 0, 0, 999).unwrap();
        assert_eq!(apply(&registry, &nanos), Value::from("2024-01-01T12:00:00"));

        let utc = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(apply(&registry, &utc), Value::from("2024-01-01T00:00:00+00:00"));

        let precise = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::milliseconds(5);
        assert_eq!(
            apply(&registry, &precise),
            Value::from("2024-01-01T00:00:00.005000+00:00")
        );

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        assert_eq!(apply(&registry, &local), Value::from("2024-06-01T08:00:00+02:00"));
    }

    #[test]
    fn test_durations_as_total_seconds() {
        let registry = EncoderRegistry::default();
        assert_eq!(
            apply(&registry, &std::time::Duration::from_millis(1500)),
            Value::from(1.5)
        );
        assert_eq!(
            apply(&registry, &chrono::Duration::seconds(90)),
            Value::from(90.0)
        );
    }

    #[test]
    fn test_string_forms() {
        let registry = EncoderRegistry::default();
        let id = uuid::Uuid::nil();
        assert_eq!(
            apply(&registry, &id),
            Value::from("00000000-0000-0000-0000-000000000000")
        );
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(apply(&registry, &ip), Value::from("10.0.0.1"));
        let net: ipnet::IpNet = "10.0.0.0/8".parse().unwrap();
        assert_eq!(apply(&registry, &net), Value::from("10.0.0.0/8"));
        let iface: ipnet::Ipv4Net = "192.168.1.7/24".parse().unwrap();
        assert_eq!(apply(&registry, &iface), Value::from("192.168.1.7/24"));
        let url = url::Url::parse("https://example.com/a?b=c").unwrap();
        assert_eq!(apply(&registry, &url), Value::from("https://example.com/a?b=c"));
        let who = NameEmail::new("Ada", "ada@example.com");
        assert_eq!(apply(&registry, &who), Value::from("Ada <ada@example.com>"));
        let path = PathBuf::from("/var/log");
        assert_eq!(apply(&registry, &path), Value::from("/var/log"));
    }

    #[test]
    fn test_pattern_source() {
        let registry = EncoderRegistry::default();
        let re = regex::Regex::new(r"^\d+$").unwrap();
        assert_eq!(apply(&registry, &re), Value::from(r"^\d+$"));
    }

    #[test]
    fn test_secrets_revealed_by_default() {
        let registry = EncoderRegistry::default();
        assert_eq!(
            apply(&registry, &SecretString::new("hunter2")),
            Value::from("hunter2")
        );
        assert_eq!(
            apply(&registry, &SecretBytes::new(b"token".to_vec())),
            Value::from("token")
        );
    }

    #[test]
    fn test_secrets_redacted_by_policy() {
        let registry = EncoderRegistry::new(SecretPolicy::Redact);
        assert_eq!(
            apply(&registry, &SecretString::new("hunter2")),
            Value::from("**********")
        );
        assert_eq!(apply(&registry, &SecretString::new("")), Value::from(""));
    }

    #[test]
    fn test_enum_capability_rule() {
        #[derive(Debug, Clone, Copy)]
        enum Level {
            Info,
            Warn,
        }
        crate::encodable_enum!(Level {
            Info => "info",
            Warn => 30,
        });

        let registry = EncoderRegistry::default();
        let info = Level::Info;
        let hit = registry.lookup(&info).unwrap();
        assert_eq!(hit.label(), "enum-value");
        assert_eq!(hit.apply().unwrap(), Value::from("info"));
        assert_eq!(apply(&registry, &Level::Warn), Value::from(30));
    }

    #[test]
    fn test_base_rule_order() {
        let registry = EncoderRegistry::default();
        assert_eq!(
            registry.base_labels(),
            vec![
                "utf8-decode",
                "string-form",
                "iso-8601",
                "total-seconds",
                "decimal",
                "enum-value",
                "pattern",
                "secret",
            ]
        );
    }

    #[test]
    fn test_unknown_type_misses() {
        #[derive(Debug)]
        struct Widget;
        crate::encodable_opaque!(Widget);

        let registry = EncoderRegistry::default();
        assert!(registry.lookup(&Widget).is_none());
    }
}
