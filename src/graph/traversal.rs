//! Gremlin traversal text builders.
//!
//! Composes `addV` / update / drop / edge traversals from [`GraphRecord`]
//! values, with kind-dependent literal formatting. Strings are single-quoted
//! with `'`, `"` and `\` backslash-escaped; numbers and booleans are emitted
//! bare; struct kinds are stored as JSON strings.

use serde_json::Value;
use uuid::Uuid;

use crate::graph::record::GraphRecord;
use crate::graph::tags::{parse_tag, FieldKind};
use crate::request::Bindings;
use crate::types::{GremlinError, Result};

/// Backslash-escape the characters that would break a single-quoted Gremlin
/// string literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\'' | '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn string_literal(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

fn cast_err(name: &str) -> GremlinError {
    GremlinError::CannotCastProperty(name.into())
}

/// Format a scalar property value as a bare Gremlin literal (number or bool).
fn bare_literal(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(cast_err(name)),
    }
}

/// Append the `.property(…)` call(s) for one field of an `addV`-style
/// traversal.
fn push_property(q: &mut String, name: &str, kind: FieldKind, value: &Value) -> Result<()> {
    match kind {
        FieldKind::String | FieldKind::PartitionKey => {
            let s = value.as_str().ok_or_else(|| cast_err(name))?;
            q.push_str(&format!(".property('{}', {})", name, string_literal(s)));
        }
        FieldKind::Number | FieldKind::Bool => {
            q.push_str(&format!(".property('{}', {})", name, bare_literal(name, value)?));
        }
        FieldKind::Struct | FieldKind::StructList => {
            // The server stores struct kinds as a JSON string.
            let json = serde_json::to_string(value)?;
            q.push_str(&format!(".property('{}', '{}')", name, json));
        }
        FieldKind::StringList => {
            let elems = value.as_array().ok_or_else(|| cast_err(name))?;
            for elem in elems {
                let s = elem.as_str().ok_or_else(|| cast_err(name))?;
                q.push_str(&format!(".property('{}', {})", name, string_literal(s)));
            }
        }
        FieldKind::NumberList | FieldKind::BoolList => {
            let elems = value.as_array().ok_or_else(|| cast_err(name))?;
            for elem in elems {
                q.push_str(&format!(".property('{}', {})", name, bare_literal(name, elem)?));
            }
        }
    }
    Ok(())
}

/// Parsed view of one tagged field and its current value.
fn tagged_fields<'a, T: GraphRecord>(
    values: &'a [Value],
) -> impl Iterator<Item = (&'static str, FieldKind, &'a Value)> + 'a {
    T::TAGS
        .iter()
        .zip(values.iter())
        .filter(|(tag, _)| !tag.is_empty())
        .map(|(tag, value)| {
            let (name, opts) = parse_tag(tag);
            (name, FieldKind::from_options(opts), value)
        })
        .filter_map(|(name, kind, value)| {
            // a tag with a name but no kind is reported by the builders
            Some((name, kind?, value))
        })
}

fn require_kind(tag: &str) -> Result<(&str, FieldKind)> {
    let (name, opts) = parse_tag(tag);
    let kind = FieldKind::from_options(opts)
        .ok_or_else(|| GremlinError::NoTagOption(name.to_string()))?;
    Ok((name, kind))
}

/// Build the `g.addV(…)` traversal for a record.
///
/// Every tagged field contributes `.property(…)` calls in declaration order;
/// the id is emitted as a quoted string like any other string property.
pub fn add_vertex<T: GraphRecord>(label: &str, record: &T) -> Result<String> {
    let values = record.field_values();
    if !T::TAGS
        .iter()
        .any(|tag| !tag.is_empty() && parse_tag(tag).0 == "id")
    {
        return Err(GremlinError::NoIdField);
    }

    let mut q = format!("g.addV({})", string_literal(label));
    let mut tagged = 0usize;
    for (tag, value) in T::TAGS.iter().zip(values.iter()) {
        if tag.is_empty() {
            continue;
        }
        let (name, kind) = require_kind(tag)?;
        push_property(&mut q, name, kind, value)?;
        tagged += 1;
    }
    if tagged == 0 {
        return Err(GremlinError::NoGraphTags);
    }
    Ok(q)
}

/// Build the `g.V('<id>')…` update traversal for a record.
///
/// Partition-key fields become `.has(…)` predicates anchoring the lookup.
/// Scalar fields update in place; list fields are replaced rather than
/// appended, by dropping the existing property before re-adding each element
/// with list cardinality. The id itself is never re-emitted.
pub fn update_vertex<T: GraphRecord>(record: &T) -> Result<String> {
    let values = record.field_values();
    let mut q = format!("g.V('{}')", record.id());

    for (name, kind, value) in tagged_fields::<T>(&values) {
        if kind == FieldKind::PartitionKey && name != "id" {
            let s = value.as_str().ok_or_else(|| cast_err(name))?;
            q.push_str(&format!(".has('{}', {})", name, string_literal(s)));
        }
    }

    let mut tagged = 0usize;
    for (tag, value) in T::TAGS.iter().zip(values.iter()) {
        if tag.is_empty() {
            continue;
        }
        let (name, kind) = require_kind(tag)?;
        if name == "id" {
            continue;
        }
        match kind {
            FieldKind::PartitionKey => {
                // already anchored above
                tagged += 1;
            }
            FieldKind::StringList | FieldKind::NumberList | FieldKind::BoolList => {
                let elems = value.as_array().ok_or_else(|| cast_err(name))?;
                q.push_str(&format!(".sideEffect(properties('{}').drop())", name));
                for elem in elems {
                    let lit = match kind {
                        FieldKind::StringList => {
                            string_literal(elem.as_str().ok_or_else(|| cast_err(name))?)
                        }
                        _ => bare_literal(name, elem)?,
                    };
                    q.push_str(&format!(".property(list, '{}', {})", name, lit));
                }
                tagged += 1;
            }
            _ => {
                push_property(&mut q, name, kind, value)?;
                tagged += 1;
            }
        }
    }
    if tagged == 0 {
        return Err(GremlinError::NoGraphTags);
    }
    Ok(q)
}

/// Build the `g.V('<id>').drop()` traversal for a record.
pub fn drop_vertex<T: GraphRecord>(record: &T) -> String {
    format!("g.V('{}').drop()", record.id())
}

/// Build the add-edge traversal between two vertex ids.
pub fn add_edge(label: &str, from: Uuid, to: Uuid) -> String {
    format!(
        "g.V('{}').addE({}).to(g.V('{}'))",
        from,
        string_literal(label),
        to
    )
}

/// Build the add-edge traversal with a trailing property map.
pub fn add_edge_with_props(
    label: &str,
    from: Uuid,
    to: Uuid,
    props: &Bindings,
) -> Result<String> {
    Ok(format!("{}{}", add_edge(label, from, to), build_props(props)?))
}

/// Build the drop-edge traversal between two vertex ids.
pub fn drop_edge(label: &str, from: Uuid, to: Uuid) -> String {
    format!(
        "g.V('{}').outE({}).and(inV().is('{}')).drop()",
        from,
        string_literal(label),
        to
    )
}

/// Render an edge property map as chained `.property(…)` calls.
///
/// Primitive values emit one call each; a slice of primitives emits one call
/// per element. Anything else is [`GremlinError::UnsupportedPropertyMap`].
pub fn build_props(props: &Bindings) -> Result<String> {
    let mut out = String::new();
    for (key, value) in props {
        match value {
            Value::String(s) => {
                out.push_str(&format!(".property('{}', {})", key, string_literal(s)));
            }
            Value::Number(_) | Value::Bool(_) => {
                out.push_str(&format!(".property('{}', {})", key, bare_literal(key, value)?));
            }
            Value::Array(elems) => {
                for elem in elems {
                    match elem {
                        Value::String(s) => out.push_str(&format!(
                            ".property('{}', {})",
                            key,
                            string_literal(s)
                        )),
                        Value::Number(_) | Value::Bool(_) => out.push_str(&format!(
                            ".property('{}', {})",
                            key,
                            bare_literal(key, elem)?
                        )),
                        _ => return Err(GremlinError::UnsupportedPropertyMap(key.clone())),
                    }
                }
            }
            _ => return Err(GremlinError::UnsupportedPropertyMap(key.clone())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::record::{
        property_bool, property_int, property_list, property_string, property_struct,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        id: Uuid,
        a: String,
        b: i64,
        n: bool,
    }

    impl GraphRecord for Sample {
        const TAGS: &'static [&'static str] = &["id,string", "a,string", "b,number", "n,bool"];

        fn id(&self) -> Uuid {
            self.id
        }

        fn set_id(&mut self, id: Uuid) {
            self.id = id;
        }

        fn field_values(&self) -> Vec<Value> {
            vec![
                json!(self.id.to_string()),
                json!(self.a),
                json!(self.b),
                json!(self.n),
            ]
        }

        fn set_field(&mut self, name: &str, _kind: FieldKind, value: &Value) -> Result<()> {
            match name {
                "a" => self.a = property_string(name, value)?,
                "b" => self.b = property_int(name, value)?,
                "n" => self.n = property_bool(name, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Inner {
        #[serde(rename = "A")]
        a: String,
        #[serde(rename = "B")]
        b: i64,
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Shelf {
        id: Uuid,
        region: String,
        labels: Vec<String>,
        counts: Vec<i64>,
        flags: Vec<bool>,
        info: Inner,
    }

    impl GraphRecord for Shelf {
        const TAGS: &'static [&'static str] = &[
            "id,string",
            "region,partitionKey",
            "labels,[]string",
            "counts,[]number",
            "flags,[]bool",
            "info,struct",
        ];

        fn id(&self) -> Uuid {
            self.id
        }

        fn set_id(&mut self, id: Uuid) {
            self.id = id;
        }

        fn field_values(&self) -> Vec<Value> {
            vec![
                json!(self.id.to_string()),
                json!(self.region),
                json!(self.labels),
                json!(self.counts),
                json!(self.flags),
                serde_json::to_value(&self.info).unwrap(),
            ]
        }

        fn set_field(&mut self, name: &str, _kind: FieldKind, value: &Value) -> Result<()> {
            match name {
                "region" => self.region = property_string(name, value)?,
                "labels" => self.labels = property_list(name, value, property_string)?,
                "counts" => self.counts = property_list(name, value, property_int)?,
                "flags" => self.flags = property_list(name, value, property_bool)?,
                "info" => self.info = property_struct(name, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn sample() -> Sample {
        Sample {
            id: Uuid::parse_str("64795211-c4a1-4eac-9e0a-b674ced77461").unwrap(),
            a: "aa".into(),
            b: 10,
            n: true,
        }
    }

    #[test]
    fn test_add_vertex_property_order() {
        let q = add_vertex("test", &sample()).unwrap();
        assert_eq!(
            q,
            "g.addV('test')\
             .property('id', '64795211-c4a1-4eac-9e0a-b674ced77461')\
             .property('a', 'aa')\
             .property('b', 10)\
             .property('n', true)"
        );
    }

    #[test]
    fn test_add_vertex_struct_and_lists() {
        let rec = Shelf {
            id: Uuid::parse_str("64795211-c4a1-4eac-9e0a-b674ced77461").unwrap(),
            region: "west".into(),
            labels: vec!["x".into(), "y".into()],
            counts: vec![1, 2],
            flags: vec![true],
            info: Inner { a: "aa".into(), b: 10 },
        };
        let q = add_vertex("shelf", &rec).unwrap();
        assert_eq!(
            q,
            "g.addV('shelf')\
             .property('id', '64795211-c4a1-4eac-9e0a-b674ced77461')\
             .property('region', 'west')\
             .property('labels', 'x').property('labels', 'y')\
             .property('counts', 1).property('counts', 2)\
             .property('flags', true)\
             .property('info', '{\"A\":\"aa\",\"B\":10}')"
        );
    }

    #[test]
    fn test_update_vertex_skips_id_and_replaces_lists() {
        let rec = Shelf {
            id: Uuid::parse_str("64795211-c4a1-4eac-9e0a-b674ced77461").unwrap(),
            region: "west".into(),
            labels: vec!["x".into(), "y".into()],
            counts: vec![1],
            flags: vec![true, false],
            info: Inner { a: "aa".into(), b: 10 },
        };
        let q = update_vertex(&rec).unwrap();
        assert_eq!(
            q,
            "g.V('64795211-c4a1-4eac-9e0a-b674ced77461')\
             .has('region', 'west')\
             .sideEffect(properties('labels').drop())\
             .property(list, 'labels', 'x').property(list, 'labels', 'y')\
             .sideEffect(properties('counts').drop())\
             .property(list, 'counts', 1)\
             .sideEffect(properties('flags').drop())\
             .property(list, 'flags', true).property(list, 'flags', false)\
             .property('info', '{\"A\":\"aa\",\"B\":10}')"
        );
    }

    #[test]
    fn test_drop_vertex() {
        let q = drop_vertex(&sample());
        assert_eq!(q, "g.V('64795211-c4a1-4eac-9e0a-b674ced77461').drop()");
    }

    #[test]
    fn test_add_edge() {
        let from = Uuid::parse_str("64795211-c4a1-4eac-9e0a-b674ced77461").unwrap();
        let to = Uuid::parse_str("dafeafc6-63a7-42b2-8ac2-4b85c3e2e37a").unwrap();
        assert_eq!(
            add_edge("relates", from, to),
            "g.V('64795211-c4a1-4eac-9e0a-b674ced77461')\
             .addE('relates')\
             .to(g.V('dafeafc6-63a7-42b2-8ac2-4b85c3e2e37a'))"
        );
    }

    #[test]
    fn test_add_edge_with_props_accepts_either_order() {
        let from = Uuid::parse_str("64795211-c4a1-4eac-9e0a-b674ced77461").unwrap();
        let to = Uuid::parse_str("dafeafc6-63a7-42b2-8ac2-4b85c3e2e37a").unwrap();
        let props: Bindings = serde_json::from_str(r#"{"foo":"bar","biz":3}"#).unwrap();
        let q = add_edge_with_props("relates", from, to, &props).unwrap();

        let base = "g.V('64795211-c4a1-4eac-9e0a-b674ced77461').addE('relates').to(g.V('dafeafc6-63a7-42b2-8ac2-4b85c3e2e37a'))";
        let order_a = format!("{base}.property('foo', 'bar').property('biz', 3)");
        let order_b = format!("{base}.property('biz', 3).property('foo', 'bar')");
        assert!(q == order_a || q == order_b, "unexpected query: {q}");
    }

    #[test]
    fn test_drop_edge() {
        let from = Uuid::parse_str("64795211-c4a1-4eac-9e0a-b674ced77461").unwrap();
        let to = Uuid::parse_str("dafeafc6-63a7-42b2-8ac2-4b85c3e2e37a").unwrap();
        assert_eq!(
            drop_edge("relates", from, to),
            "g.V('64795211-c4a1-4eac-9e0a-b674ced77461')\
             .outE('relates')\
             .and(inV().is('dafeafc6-63a7-42b2-8ac2-4b85c3e2e37a'))\
             .drop()"
        );
    }

    #[test]
    fn test_build_props_slice_values() {
        let props: Bindings = serde_json::from_str(r#"{"baz":["foo","bar"]}"#).unwrap();
        assert_eq!(
            build_props(&props).unwrap(),
            ".property('baz', 'foo').property('baz', 'bar')"
        );
    }

    #[test]
    fn test_build_props_rejects_nested_map() {
        let props: Bindings = serde_json::from_str(r#"{"bad":{"nested":1}}"#).unwrap();
        assert_eq!(
            build_props(&props),
            Err(GremlinError::UnsupportedPropertyMap("bad".into()))
        );
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("plain"), "plain");
        assert_eq!(escape_string("it's"), "it\\'s");
        assert_eq!(escape_string(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_string(r"back\slash"), r"back\\slash");
    }

    #[test]
    fn test_no_graph_tags() {
        #[derive(Debug, Default)]
        struct Bare {
            id: Uuid,
        }
        impl GraphRecord for Bare {
            const TAGS: &'static [&'static str] = &["id,string"];
            fn id(&self) -> Uuid {
                self.id
            }
            fn set_id(&mut self, id: Uuid) {
                self.id = id;
            }
            fn field_values(&self) -> Vec<Value> {
                vec![json!(self.id.to_string())]
            }
            fn set_field(&mut self, _: &str, _: FieldKind, _: &Value) -> Result<()> {
                Ok(())
            }
        }
        // the id alone still makes addV a valid traversal
        assert!(add_vertex("bare", &Bare::default()).is_ok());
        // but an update with nothing to change has no graph tags to apply
        assert_eq!(
            update_vertex(&Bare::default()),
            Err(GremlinError::NoGraphTags)
        );
    }

    #[test]
    fn test_add_vertex_requires_id_tag() {
        #[derive(Debug, Default)]
        struct NoId {
            a: String,
        }
        impl GraphRecord for NoId {
            const TAGS: &'static [&'static str] = &["a,string"];
            fn id(&self) -> Uuid {
                Uuid::nil()
            }
            fn set_id(&mut self, _: Uuid) {}
            fn field_values(&self) -> Vec<Value> {
                vec![json!(self.a)]
            }
            fn set_field(&mut self, _: &str, _: FieldKind, _: &Value) -> Result<()> {
                Ok(())
            }
        }
        assert_eq!(
            add_vertex("tagless", &NoId::default()),
            Err(GremlinError::NoIdField)
        );
    }

    #[test]
    fn test_tag_without_kind_option() {
        #[derive(Debug, Default)]
        struct Untyped {
            id: Uuid,
            a: String,
        }
        impl GraphRecord for Untyped {
            const TAGS: &'static [&'static str] = &["id,string", "a"];
            fn id(&self) -> Uuid {
                self.id
            }
            fn set_id(&mut self, id: Uuid) {
                self.id = id;
            }
            fn field_values(&self) -> Vec<Value> {
                vec![json!(self.id.to_string()), json!(self.a)]
            }
            fn set_field(&mut self, _: &str, _: FieldKind, _: &Value) -> Result<()> {
                Ok(())
            }
        }
        assert_eq!(
            add_vertex("untyped", &Untyped::default()),
            Err(GremlinError::NoTagOption("a".into()))
        );
    }
}
