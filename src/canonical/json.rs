//! Avro JSON rendering of the canonical form
//!
//! Named records are written in full the first time they appear and by
//! full name afterwards, as Avro requires. User properties become plain
//! attributes; a property that would shadow a structural attribute is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use super::{
    null, wrap_nullable, Canonical, CanonicalArray, CanonicalField, CanonicalRecord, DATETIME_PROP,
    DEFAULT_PROP, NAMESPACE,
};
use crate::error::{Result, SchemaError};
use crate::names;
use crate::schema::registry::registry;
use crate::schema::SchemaKind;

const RECORD_KEYS: &[&str] = &["type", "name", "namespace", "fields", "doc", "aliases"];
const ARRAY_KEYS: &[&str] = &["type", "items"];
const FIELD_KEYS: &[&str] = &["name", "type", "doc", "aliases", "default", "order", DEFAULT_PROP];

/// Render a compiled schema as an Avro schema document
pub fn to_json(schema: &Canonical) -> Value {
    Emitter::default().emit(schema)
}

/// Parse an Avro schema document into the canonical form
pub fn from_json(value: &Value) -> Result<Arc<Canonical>> {
    Parser::default().parse(value)
}

#[derive(Default)]
struct Emitter {
    defined: HashSet<String>,
}

impl Emitter {
    fn emit(&mut self, schema: &Canonical) -> Value {
        match schema {
            Canonical::Null => Value::from("null"),
            Canonical::Boolean => Value::from("boolean"),
            Canonical::Int => Value::from("int"),
            Canonical::Long => Value::from("long"),
            Canonical::Float => Value::from("float"),
            Canonical::Double => Value::from("double"),
            Canonical::Bytes => Value::from("bytes"),
            Canonical::String => Value::from("string"),
            Canonical::TimestampMillis => {
                let mut object = Map::new();
                object.insert("type".into(), Value::from("long"));
                object.insert("logicalType".into(), Value::from("timestamp-millis"));
                object.insert(DATETIME_PROP.into(), Value::from("true"));
                Value::Object(object)
            }
            Canonical::Array(array) => self.emit_array(array),
            Canonical::Record(record) => self.emit_record(record),
            Canonical::Union(branches) => {
                Value::Array(branches.iter().map(|branch| self.emit(branch)).collect())
            }
        }
    }

    fn emit_array(&mut self, array: &CanonicalArray) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::from("array"));
        object.insert("items".into(), self.emit(&array.items));
        insert_props(&mut object, &array.props, ARRAY_KEYS);
        Value::Object(object)
    }

    fn emit_record(&mut self, record: &CanonicalRecord) -> Value {
        let full_name = record.full_name();
        if !self.defined.insert(full_name.clone()) {
            return Value::String(full_name);
        }

        let mut object = Map::new();
        object.insert("type".into(), Value::from("record"));
        object.insert("name".into(), Value::from(record.name.as_str()));
        if !record.namespace.is_empty() {
            object.insert("namespace".into(), Value::from(record.namespace.as_str()));
        }
        let fields = record.fields.iter().map(|field| self.emit_field(field)).collect();
        object.insert("fields".into(), Value::Array(fields));
        insert_props(&mut object, &record.props, RECORD_KEYS);
        Value::Object(object)
    }

    fn emit_field(&mut self, field: &CanonicalField) -> Value {
        let mut object = Map::new();
        object.insert("name".into(), Value::from(field.name.as_str()));
        object.insert("type".into(), self.emit(&field.schema));
        if let Some(doc) = &field.doc {
            object.insert("doc".into(), Value::from(doc.as_str()));
        }
        if !field.aliases.is_empty() {
            object.insert("aliases".into(), Value::from(field.aliases.clone()));
        }
        if let Some(default) = &field.default {
            object.insert(DEFAULT_PROP.into(), default.clone());
        }
        insert_props(&mut object, &field.props, FIELD_KEYS);
        Value::Object(object)
    }
}

fn insert_props(object: &mut Map<String, Value>, props: &BTreeMap<String, String>, reserved: &[&str]) {
    for (key, value) in props {
        if reserved.contains(&key.as_str()) {
            warn!(key = %key, "property shadows a schema attribute and is not compiled");
            continue;
        }
        object.insert(key.clone(), Value::from(value.as_str()));
    }
}

fn collect_props(object: &Map<String, Value>, reserved: &[&str]) -> BTreeMap<String, String> {
    object
        .iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| {
            let value = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
            (key.clone(), value)
        })
        .collect()
}

#[derive(Default)]
struct Parser {
    named: HashMap<String, Arc<Canonical>>,
}

impl Parser {
    fn parse(&mut self, value: &Value) -> Result<Arc<Canonical>> {
        match value {
            Value::String(name) => self.parse_name(name),
            Value::Array(branches) => self.parse_union(branches),
            Value::Object(object) => match object.get("type") {
                Some(Value::String(kind)) => match kind.as_str() {
                    "record" => self.parse_record(object),
                    "array" => self.parse_array(object),
                    "long" if is_timestamp_millis(object) => Ok(scalar(SchemaKind::DateTime)),
                    other => self.parse_name(other),
                },
                Some(nested @ (Value::Object(_) | Value::Array(_))) => self.parse(nested),
                _ => Err(invalid("schema object without a type")),
            },
            other => Err(invalid(&format!("unexpected schema value {}", other))),
        }
    }

    fn parse_name(&self, name: &str) -> Result<Arc<Canonical>> {
        let kind = match name {
            "null" => return Ok(null()),
            "boolean" => SchemaKind::Boolean,
            "int" => SchemaKind::Int,
            "long" => SchemaKind::Long,
            "float" => SchemaKind::Float,
            "double" => SchemaKind::Double,
            "bytes" => SchemaKind::Bytes,
            "string" => SchemaKind::String,
            reference => {
                return self
                    .named
                    .get(reference)
                    .or_else(|| self.named.get(&format!("{}.{}", NAMESPACE, reference)))
                    .cloned()
                    .ok_or_else(|| invalid(&format!("unknown type {}", reference)));
            }
        };
        Ok(scalar(kind))
    }

    fn parse_union(&mut self, branches: &[Value]) -> Result<Arc<Canonical>> {
        let branches = branches
            .iter()
            .map(|branch| self.parse(branch))
            .collect::<Result<Vec<_>>>()?;
        match branches.as_slice() {
            [first, second] if matches!(**first, Canonical::Null) && !second.is_union() => {
                Ok(wrap_nullable(second))
            }
            _ => Ok(Arc::new(Canonical::Union(branches))),
        }
    }

    fn parse_array(&mut self, object: &Map<String, Value>) -> Result<Arc<Canonical>> {
        let items = object
            .get("items")
            .ok_or_else(|| invalid("array without items"))?;
        let items = self.parse(items)?;
        Ok(Arc::new(Canonical::Array(Arc::new(CanonicalArray {
            items,
            props: collect_props(object, ARRAY_KEYS),
        }))))
    }

    fn parse_record(&mut self, object: &Map<String, Value>) -> Result<Arc<Canonical>> {
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("record without a name"))?;
        let namespace = object
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = object
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid(&format!("record {} without fields", name)))?
            .iter()
            .map(|field| self.parse_field(field))
            .collect::<Result<Vec<_>>>()?;

        let record = CanonicalRecord {
            name: name.to_string(),
            namespace: namespace.to_string(),
            fields,
            props: collect_props(object, RECORD_KEYS),
        };
        let full_name = record.full_name();
        let parsed = Arc::new(Canonical::Record(Arc::new(record)));
        self.named.insert(name.to_string(), Arc::clone(&parsed));
        self.named.insert(full_name, Arc::clone(&parsed));
        Ok(parsed)
    }

    fn parse_field(&mut self, value: &Value) -> Result<CanonicalField> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid("field is not an object"))?;
        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("field without a name"))?;
        let schema = object
            .get("type")
            .ok_or_else(|| invalid(&format!("field {} without a type", name)))?;
        let schema = self.parse(schema)?;
        let aliases = object
            .get("aliases")
            .and_then(Value::as_array)
            .map(|aliases| aliases.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        Ok(CanonicalField {
            name: names::sanitize(name),
            schema,
            doc: object.get("doc").and_then(Value::as_str).map(str::to_string),
            default: object
                .get(DEFAULT_PROP)
                .or_else(|| object.get("default"))
                .cloned(),
            aliases,
            props: collect_props(object, FIELD_KEYS),
        })
    }
}

fn is_timestamp_millis(object: &Map<String, Value>) -> bool {
    object.get("logicalType").and_then(Value::as_str) == Some("timestamp-millis")
}

fn scalar(kind: SchemaKind) -> Arc<Canonical> {
    registry().canonical(kind).unwrap_or_else(null)
}

fn invalid(message: &str) -> SchemaError {
    SchemaError::InvalidFormat(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntryBuilder, SchemaBuilder, ENTRIES_ORDER_PROP};
    use serde_json::json;

    #[test]
    fn test_datetime_rendering() {
        let value = to_json(&Canonical::TimestampMillis);
        assert_eq!(
            value,
            json!({"type": "long", "logicalType": "timestamp-millis", DATETIME_PROP: "true"})
        );
        let parsed = from_json(&value).unwrap();
        assert_eq!(*parsed, Canonical::TimestampMillis);
    }

    #[test]
    fn test_record_rendering() {
        let schema = SchemaBuilder::record()
            .with_entry(
                EntryBuilder::new()
                    .with_name("name")
                    .with_type(SchemaKind::String)
                    .with_nullable(true)
                    .with_prop("k1", "v1")
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with_prop("schemaK1", "schemaV1")
            .build()
            .unwrap();
        let value = schema.to_canonical_json();

        assert_eq!(value["type"], "record");
        assert_eq!(value["namespace"], NAMESPACE);
        assert_eq!(value["schemaK1"], "schemaV1");
        assert_eq!(value[ENTRIES_ORDER_PROP], "name");
        assert_eq!(value["fields"][0]["name"], "name");
        assert_eq!(value["fields"][0]["type"], json!(["null", "string"]));
        assert_eq!(value["fields"][0]["k1"], "v1");
    }

    #[test]
    fn test_repeated_record_is_referenced() {
        let inner = SchemaBuilder::record()
            .with_entry(
                EntryBuilder::new()
                    .with_name("f1")
                    .with_type(SchemaKind::String)
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .build()
            .unwrap();
        let entry = |name: &str| {
            EntryBuilder::new()
                .with_name(name)
                .with_type(SchemaKind::Record)
                .with_element_schema(inner.clone())
                .build()
                .unwrap()
        };
        let outer = SchemaBuilder::record()
            .with_entry(entry("a"))
            .unwrap()
            .with_entry(entry("b"))
            .unwrap()
            .build()
            .unwrap();

        let value = outer.to_canonical_json();
        let full_name = format!("{}.{}", NAMESPACE, inner.record_name().unwrap());
        assert!(value["fields"][0]["type"].is_object());
        assert_eq!(value["fields"][1]["type"], Value::String(full_name));

        let parsed = from_json(&value).unwrap();
        assert_eq!(parsed, *outer.compiled());
    }

    #[test]
    fn test_reserved_props_are_dropped() {
        let schema = SchemaBuilder::record()
            .with_entry(
                EntryBuilder::new()
                    .with_name("a")
                    .with_type(SchemaKind::Int)
                    .with_prop("type", "oops")
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .build()
            .unwrap();
        let value = schema.to_canonical_json();
        assert_eq!(value["fields"][0]["type"], "int");
    }

    #[test]
    fn test_parse_rejects_unknown_reference() {
        assert!(from_json(&json!("NotDefined")).is_err());
        assert!(from_json(&json!(42)).is_err());
    }
}
