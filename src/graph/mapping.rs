//! Decoding Gremlin results into [`GraphRecord`] values.
//!
//! Vertex results carry the GraphSON-lite property shape: each property name
//! maps to an array of `{id, value}` objects, because a vertex may hold
//! several values under one key. Results without that shape are decoded
//! straight into the caller's record type.

use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::graph::record::GraphRecord;
use crate::graph::tags::{parse_tag, FieldKind};
use crate::types::{GremlinError, Result};

/// Decode a `result.data` array into records appended to `out`.
///
/// Unknown wire properties are ignored; untagged fields stay at their
/// defaults. An empty `data` array leaves `out` untouched.
pub fn decode_records<T>(data: &[Value], out: &mut Vec<T>) -> Result<()>
where
    T: GraphRecord + DeserializeOwned,
{
    let Some(first) = data.first() else {
        return Ok(());
    };

    // No GraphSON property map: the payload is already record-shaped.
    if !first.get("properties").map_or(false, Value::is_object) {
        let decoded: Vec<T> = serde_json::from_value(Value::Array(data.to_vec()))?;
        out.extend(decoded);
        return Ok(());
    }

    for element in data {
        out.push(decode_vertex(element)?);
    }
    Ok(())
}

fn decode_vertex<T>(element: &Value) -> Result<T>
where
    T: GraphRecord,
{
    let mut record = T::default();

    let id = element
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(GremlinError::NoIdField)?;
    record.set_id(id);

    let Some(props) = element.get("properties").and_then(Value::as_object) else {
        return Ok(record);
    };

    for tag in T::TAGS {
        if tag.is_empty() {
            continue;
        }
        let (name, opts) = parse_tag(tag);
        if name == "id" {
            continue;
        }
        let Some(kind) = FieldKind::from_options(opts) else {
            continue;
        };
        let Some(prop) = props.get(name) else {
            continue;
        };

        let entries = prop
            .as_array()
            .ok_or_else(|| GremlinError::CannotCastProperty(name.into()))?;
        match entries.len() {
            0 => {}
            1 => record.set_field(name, kind, property_value(name, &entries[0])?)?,
            _ => {
                let values: Vec<Value> = entries
                    .iter()
                    .map(|e| property_value(name, e).cloned())
                    .collect::<Result<_>>()?;
                record.set_field(name, kind, &Value::Array(values))?;
            }
        }
    }

    Ok(record)
}

/// Extract the `value` of one `{id, value}` property object.
fn property_value<'a>(name: &str, entry: &'a Value) -> Result<&'a Value> {
    entry
        .as_object()
        .and_then(|o| o.get("value"))
        .ok_or_else(|| GremlinError::CannotCastProperty(name.into()))
}
