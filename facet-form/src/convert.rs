//! Conversion of raw form strings into typed scalar values.

use alloc::borrow::ToOwned;
use alloc::string::{String, ToString};
use core::fmt::Display;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use facet_core::ScalarType;
use facet_value::Value;

use crate::ConversionError;
use crate::schema::{DateKind, ScalarDescriptor, ScalarKind};

const NAIVE_DATE: &str = "%Y-%m-%d";
const NAIVE_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Convert one raw form value to the dynamic representation of `target`.
///
/// An empty `raw` on an `optional` property converts to `null`, which
/// materializes as `None`. Every other input must parse as the target type.
pub fn convert(
    raw: &str,
    target: &ScalarDescriptor,
    optional: bool,
) -> Result<Value, ConversionError> {
    if optional && raw.is_empty() {
        return Ok(Value::NULL);
    }

    let fail = |reason: &dyn Display| ConversionError {
        expected: target.shape.type_identifier,
        value: raw.to_owned(),
        reason: reason.to_string(),
    };

    match target.kind {
        ScalarKind::Primitive(scalar_type) => primitive(raw, scalar_type).map_err(|e| fail(&e)),
        ScalarKind::Uuid => {
            if raw.is_empty() {
                return Ok(Value::from(uuid::Uuid::nil().to_string()));
            }
            let id = uuid::Uuid::parse_str(raw.trim()).map_err(|e| fail(&e))?;
            Ok(Value::from(id.to_string()))
        }
        ScalarKind::Date(kind) => date(raw.trim(), kind).map_err(|e| fail(&e)),
        ScalarKind::UnitEnum(variants) => variants
            .iter()
            .find(|variant| variant.name == raw)
            .map(|variant| Value::from(variant.name))
            .ok_or_else(|| fail(&"no such variant")),
        ScalarKind::Parsed => Ok(Value::from(raw)),
    }
}

/// The value a property of type `target` takes when nothing was bound and the
/// type has no `Default` of its own. `None` when no such value exists.
pub(crate) fn zero(target: &ScalarDescriptor) -> Option<Value> {
    let raw = match target.kind {
        ScalarKind::Uuid => "",
        ScalarKind::Date(DateKind::NaiveDate) => "1970-01-01",
        ScalarKind::Date(DateKind::NaiveDateTime) => "1970-01-01T00:00:00",
        ScalarKind::Date(DateKind::DateTimeUtc) => "1970-01-01T00:00:00Z",
        ScalarKind::Primitive(scalar_type) => match scalar_type {
            ScalarType::Str | ScalarType::String | ScalarType::CowStr => "",
            ScalarType::Bool => "false",
            ScalarType::F32
            | ScalarType::F64
            | ScalarType::U8
            | ScalarType::U16
            | ScalarType::U32
            | ScalarType::U64
            | ScalarType::U128
            | ScalarType::USize
            | ScalarType::I8
            | ScalarType::I16
            | ScalarType::I32
            | ScalarType::I64
            | ScalarType::I128
            | ScalarType::ISize => "0",
            _ => return None,
        },
        ScalarKind::UnitEnum(_) | ScalarKind::Parsed => return None,
    };
    convert(raw, target, false).ok()
}

/// Parse a checkbox-style boolean.
pub fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("on") || raw == "1" {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") || raw.eq_ignore_ascii_case("off") || raw == "0" {
        Some(false)
    } else {
        None
    }
}

fn primitive(raw: &str, scalar_type: ScalarType) -> Result<Value, String> {
    let value = match scalar_type {
        ScalarType::Unit => Value::NULL,
        ScalarType::Str | ScalarType::String | ScalarType::CowStr => Value::from(raw),
        ScalarType::Bool => {
            Value::from(parse_bool(raw).ok_or_else(|| "expected true or false".to_owned())?)
        }
        ScalarType::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::from(c.to_string()),
                _ => return Err("expected exactly one character".to_owned()),
            }
        }
        ScalarType::F32 => Value::from(f64::from(number::<f32>(raw)?)),
        ScalarType::F64 => Value::from(number::<f64>(raw)?),
        ScalarType::U8 => Value::from(u64::from(number::<u8>(raw)?)),
        ScalarType::U16 => Value::from(u64::from(number::<u16>(raw)?)),
        ScalarType::U32 => Value::from(u64::from(number::<u32>(raw)?)),
        ScalarType::U64 => Value::from(number::<u64>(raw)?),
        ScalarType::USize => Value::from(number::<usize>(raw)? as u64),
        ScalarType::I8 => Value::from(i64::from(number::<i8>(raw)?)),
        ScalarType::I16 => Value::from(i64::from(number::<i16>(raw)?)),
        ScalarType::I32 => Value::from(i64::from(number::<i32>(raw)?)),
        ScalarType::I64 => Value::from(number::<i64>(raw)?),
        ScalarType::ISize => Value::from(number::<isize>(raw)? as i64),
        ScalarType::U128 => {
            let n = number::<u128>(raw)?;
            match u64::try_from(n) {
                Ok(small) => Value::from(small),
                Err(_) => Value::from(n.to_string()),
            }
        }
        ScalarType::I128 => {
            let n = number::<i128>(raw)?;
            match i64::try_from(n) {
                Ok(small) => Value::from(small),
                Err(_) => Value::from(n.to_string()),
            }
        }
        // net addresses and the like carry their own parsers
        _ => Value::from(raw),
    };
    Ok(value)
}

fn number<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("value is empty".to_owned());
    }
    trimmed.parse::<T>().map_err(|e| e.to_string())
}

fn date(raw: &str, kind: DateKind) -> Result<Value, chrono::ParseError> {
    let canonical = match kind {
        DateKind::NaiveDate => NaiveDate::parse_from_str(raw, NAIVE_DATE)?
            .format(NAIVE_DATE)
            .to_string(),
        DateKind::NaiveDateTime => parse_naive_date_time(raw)?
            .format(NAIVE_DATE_TIME)
            .to_string(),
        DateKind::DateTimeUtc => DateTime::parse_from_rfc3339(raw)?
            .with_timezone(&Utc)
            .to_rfc3339(),
    };
    Ok(Value::from(canonical))
}

// `<input type="datetime-local">` omits seconds; facet's own parser wants them.
fn parse_naive_date_time(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, NAIVE_DATE_TIME)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::scalar;
    use facet::Facet;
    use facet_core::Shape;

    #[derive(Facet, Debug)]
    #[repr(u8)]
    #[allow(dead_code)]
    enum Shift {
        Day,
        Night,
    }

    fn target(shape: &'static Shape) -> ScalarDescriptor {
        scalar(shape).unwrap()
    }

    fn ok(raw: &str, shape: &'static Shape) -> Value {
        convert(raw, &target(shape), false).unwrap()
    }

    #[test]
    fn numbers_parse_within_range() {
        assert_eq!(ok("42", u32::SHAPE), Value::from(42u64));
        assert_eq!(ok(" -7 ", i16::SHAPE), Value::from(-7i64));
        assert_eq!(ok("2.5", f64::SHAPE), Value::from(2.5f64));
        assert!(convert("256", &target(u8::SHAPE), false).is_err());
        assert!(convert("-1", &target(u64::SHAPE), false).is_err());
        assert!(convert("", &target(i32::SHAPE), false).is_err());
    }

    #[test]
    fn conversion_errors_name_the_type_and_value() {
        let err = convert("forty", &target(u32::SHAPE), false).unwrap_err();
        assert_eq!(err.expected, "u32");
        assert_eq!(err.value, "forty");
        insta::assert_snapshot!(err, @"cannot convert `forty` to u32: invalid digit found in string");
    }

    #[test]
    fn checkbox_booleans() {
        for raw in ["true", "TRUE", "on", "1"] {
            assert_eq!(ok(raw, bool::SHAPE), Value::TRUE, "{raw}");
        }
        for raw in ["false", "False", "off", "0"] {
            assert_eq!(ok(raw, bool::SHAPE), Value::FALSE, "{raw}");
        }
        assert!(convert("yes", &target(bool::SHAPE), false).is_err());
    }

    #[test]
    fn strings_pass_through_untouched() {
        assert_eq!(ok("", String::SHAPE), Value::from(""));
        assert_eq!(ok("  padded ", String::SHAPE), Value::from("  padded "));
        assert_eq!(ok("x", char::SHAPE), Value::from("x"));
        assert!(convert("xy", &target(char::SHAPE), false).is_err());
    }

    #[test]
    fn empty_optional_is_null() {
        assert_eq!(convert("", &target(u32::SHAPE), true).unwrap(), Value::NULL);
        assert_eq!(
            convert("", &target(uuid::Uuid::SHAPE), true).unwrap(),
            Value::NULL
        );
        assert_eq!(
            convert("5", &target(u32::SHAPE), true).unwrap(),
            Value::from(5u64)
        );
    }

    #[test]
    fn empty_uuid_is_nil() {
        assert_eq!(
            ok("", uuid::Uuid::SHAPE),
            Value::from("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(
            ok("A2A0B1C6-1D4B-4E9C-8E8F-0C5C3D5B9F10", uuid::Uuid::SHAPE),
            Value::from("a2a0b1c6-1d4b-4e9c-8e8f-0c5c3d5b9f10")
        );
        assert!(convert("not-a-guid", &target(uuid::Uuid::SHAPE), false).is_err());
    }

    #[test]
    fn dates_are_normalized() {
        assert_eq!(ok("2024-02-29", NaiveDate::SHAPE), Value::from("2024-02-29"));
        assert!(convert("2023-02-29", &target(NaiveDate::SHAPE), false).is_err());
        assert_eq!(
            ok("2024-03-01T09:30", NaiveDateTime::SHAPE),
            Value::from("2024-03-01T09:30:00")
        );
        assert_eq!(
            ok("2024-03-01 09:30:15", NaiveDateTime::SHAPE),
            Value::from("2024-03-01T09:30:15")
        );
        assert_eq!(
            ok("2024-03-01T09:30:00+02:00", <DateTime<Utc>>::SHAPE),
            Value::from("2024-03-01T07:30:00+00:00")
        );
    }

    #[test]
    fn unit_enums_match_variant_names() {
        assert_eq!(ok("Night", Shift::SHAPE), Value::from("Night"));
        let err = convert("night", &target(Shift::SHAPE), false).unwrap_err();
        insta::assert_snapshot!(err, @"cannot convert `night` to Shift: no such variant");
    }

    #[test]
    fn zero_values() {
        assert_eq!(
            zero(&target(uuid::Uuid::SHAPE)),
            Some(Value::from("00000000-0000-0000-0000-000000000000"))
        );
        assert_eq!(zero(&target(u16::SHAPE)), Some(Value::from(0u64)));
        assert_eq!(zero(&target(bool::SHAPE)), Some(Value::FALSE));
        assert_eq!(
            zero(&target(NaiveDate::SHAPE)),
            Some(Value::from("1970-01-01"))
        );
        assert_eq!(zero(&target(Shift::SHAPE)), None);
    }
}
