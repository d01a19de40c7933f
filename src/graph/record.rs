//! The [`GraphRecord`] trait and property casting helpers.
//!
//! Where a dynamic language would reflect over tagged struct fields, a
//! gremway record type implements this trait (by hand or via codegen): it
//! declares its graph tags, exposes each field's value for traversal
//! building, and accepts decoded property values coming back from the
//! server.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::graph::tags::FieldKind;
use crate::types::{GremlinError, Result};

/// A record type that maps to graph vertices.
///
/// `TAGS` lists the graph annotation of every participating field in
/// declaration order; an empty string marks a field the mapping skips. The
/// tag whose wire name is `id` carries the vertex id and is conventionally
/// first.
pub trait GraphRecord: Default {
    /// Graph tags, one per field, in declaration order.
    const TAGS: &'static [&'static str];

    /// The record's vertex id.
    fn id(&self) -> Uuid;

    /// Assign the vertex id decoded from a response element.
    fn set_id(&mut self, id: Uuid);

    /// Current field values as JSON, parallel to [`Self::TAGS`].
    ///
    /// The id field is its UUID rendered as a string; struct-kind fields are
    /// their serialized JSON shape.
    fn field_values(&self) -> Vec<Value>;

    /// Assign a decoded property to the field with the given wire name.
    ///
    /// For list kinds `value` is either a single element or an array of
    /// elements; the [`property_list`] helper accepts both.
    fn set_field(&mut self, name: &str, kind: FieldKind, value: &Value) -> Result<()>;
}

fn cast_err(name: &str) -> GremlinError {
    GremlinError::CannotCastProperty(name.into())
}

/// Decode a string property value.
pub fn property_string(name: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| cast_err(name))
}

/// Decode a signed integer property value, range-checked against the target
/// field's width.
pub fn property_int<T: TryFrom<i64>>(name: &str, value: &Value) -> Result<T> {
    let n = value.as_i64().ok_or_else(|| cast_err(name))?;
    T::try_from(n).map_err(|_| cast_err(name))
}

/// Decode an unsigned integer property value, range-checked.
pub fn property_uint<T: TryFrom<u64>>(name: &str, value: &Value) -> Result<T> {
    let n = value.as_u64().ok_or_else(|| cast_err(name))?;
    T::try_from(n).map_err(|_| cast_err(name))
}

/// Decode a floating-point property value. Integer wire values widen.
pub fn property_f64(name: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| cast_err(name))
}

/// Decode a single-precision property value, range-checked against f32.
pub fn property_f32(name: &str, value: &Value) -> Result<f32> {
    let n = value.as_f64().ok_or_else(|| cast_err(name))?;
    if n.is_finite() && n.abs() > f32::MAX as f64 {
        return Err(cast_err(name));
    }
    Ok(n as f32)
}

/// Decode a boolean property value.
pub fn property_bool(name: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| cast_err(name))
}

/// Decode a struct-kind property: the wire value is a JSON string holding the
/// serialized shape.
pub fn property_struct<T: DeserializeOwned>(name: &str, value: &Value) -> Result<T> {
    let raw = value.as_str().ok_or_else(|| cast_err(name))?;
    serde_json::from_str(raw).map_err(|_| cast_err(name))
}

/// Decode a list property. A multi-valued wire property arrives as an array;
/// a single stored element arrives bare and becomes a one-element list.
pub fn property_list<T>(
    name: &str,
    value: &Value,
    decode: impl Fn(&str, &Value) -> Result<T>,
) -> Result<Vec<T>> {
    match value {
        Value::Array(elems) => elems.iter().map(|v| decode(name, v)).collect(),
        single => Ok(vec![decode(name, single)?]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_property_string() {
        assert_eq!(property_string("a", &json!("aa")).unwrap(), "aa");
        assert!(property_string("a", &json!(10)).is_err());
    }

    #[test]
    fn test_property_int_range_checks() {
        assert_eq!(property_int::<i64>("b", &json!(10)).unwrap(), 10);
        assert_eq!(property_int::<i8>("c", &json!(20)).unwrap(), 20i8);
        assert!(property_int::<i8>("c", &json!(300)).is_err());
        assert!(property_int::<i64>("b", &json!("10")).is_err());
    }

    #[test]
    fn test_property_uint_rejects_negative() {
        assert_eq!(property_uint::<u16>("k", &json!(100)).unwrap(), 100u16);
        assert!(property_uint::<u16>("k", &json!(-1)).is_err());
        assert!(property_uint::<u8>("j", &json!(900)).is_err());
    }

    #[test]
    fn test_property_float() {
        assert_eq!(property_f64("h", &json!(0.07)).unwrap(), 0.07);
        // integer wire values widen into float fields
        assert_eq!(property_f64("h", &json!(40)).unwrap(), 40.0);
        assert!(property_f32("g", &json!(1e300)).is_err());
    }

    #[test]
    fn test_property_bool() {
        assert!(property_bool("n", &json!(true)).unwrap());
        assert!(property_bool("n", &json!("true")).is_err());
    }

    #[test]
    fn test_property_struct_decodes_json_string() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Inner {
            #[serde(rename = "A")]
            a: String,
        }
        let wire = json!("{\"A\":\"aa\"}");
        let inner: Inner = property_struct("z", &wire).unwrap();
        assert_eq!(inner, Inner { a: "aa".into() });

        // a bare object is not the wire shape for struct kinds
        assert!(property_struct::<Inner>("z", &json!({"A": "aa"})).is_err());
    }

    #[test]
    fn test_property_list_single_and_many() {
        let many = json!(["aa", "bb"]);
        assert_eq!(
            property_list("aa", &many, property_string).unwrap(),
            vec!["aa".to_string(), "bb".to_string()]
        );

        let single = json!("aa");
        assert_eq!(
            property_list("aa", &single, property_string).unwrap(),
            vec!["aa".to_string()]
        );
    }
}
