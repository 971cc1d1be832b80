//! Reading typed values back into `facet_value::Value` trees, in the layout
//! `facet_value::from_value` expects.

use alloc::string::{String, ToString};

use facet_core::Facet;
use facet_value::Value;

use crate::EncodeError;

/// Encode `value` as a dynamic [`Value`].
///
/// Structs become objects keyed by their serialized field names, so a
/// `rename_all = "PascalCase"` model encodes `id` under `"Id"`.
pub fn to_value<'facet, T: Facet<'facet>>(value: &T) -> Result<Value, EncodeError> {
    facet_value::to_value(value).map_err(|err| EncodeError {
        type_identifier: T::SHAPE.type_identifier,
        reason: err.to_string(),
    })
}

/// Render an identity value as the canonical string used to key stores.
///
/// Strings render as themselves and numbers in decimal, so the identity `12`
/// and the token `"12"` name the same record.
pub fn identity_key(identity: &Value) -> String {
    if let Some(s) = identity.as_string() {
        return s.as_str().to_string();
    }
    if let Some(n) = identity.as_number() {
        if let Some(i) = n.to_i64() {
            return i.to_string();
        }
        if let Some(u) = n.to_u64() {
            return u.to_string();
        }
        return n.to_f64_lossy().to_string();
    }
    if let Some(b) = identity.as_bool() {
        return b.to_string();
    }
    alloc::format!("{identity:?}")
}
