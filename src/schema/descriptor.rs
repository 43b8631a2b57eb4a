//! Serializable schema descriptors
//!
//! A descriptor is a plain data description of a schema graph, as read from a
//! JSON or TOML file. [`SchemaDescriptor::build`] converts it depth-first:
//! element and entry schemas are built before the schema that owns them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Entry, EntryBuilder, Schema, SchemaBuilder, SchemaKind, ENTRIES_ORDER_PROP};
use crate::error::{Result, SchemaError};

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Description of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(rename = "type")]
    pub kind: SchemaKind,
    /// Explicit record name; content-derived when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<EntryDescriptor>,
    /// Element schema of an ARRAY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<SchemaDescriptor>>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub element_nullable: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, String>,
}

/// Description of a record entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDescriptor {
    /// Field label; sanitized on build
    pub name: String,
    /// Display label kept alongside an already valid name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: SchemaKind,
    /// Record schema of a RECORD entry, element schema of an ARRAY entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<SchemaDescriptor>>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub element_nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub metadata: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, String>,
}

impl SchemaDescriptor {
    /// Scalar descriptor
    pub fn scalar(kind: SchemaKind) -> Self {
        Self {
            kind,
            name: None,
            entries: Vec::new(),
            element: None,
            element_nullable: true,
            props: BTreeMap::new(),
        }
    }

    /// Describe a built schema
    pub fn from_schema(schema: &Schema) -> Self {
        let mut descriptor = Self::scalar(schema.kind());
        descriptor.props = schema.props().clone();
        match schema.kind() {
            SchemaKind::Record => {
                descriptor.entries = schema.entries().iter().map(EntryDescriptor::from_entry).collect();
                if descriptor.entries.is_empty() {
                    descriptor.props.remove(ENTRIES_ORDER_PROP);
                }
            }
            SchemaKind::Array => {
                descriptor.element = schema
                    .element_schema()
                    .map(|element| Box::new(Self::from_schema(element)));
                descriptor.element_nullable = schema.is_element_nullable();
            }
            _ => {}
        }
        descriptor
    }

    /// Parse a JSON descriptor document
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Build the described schema, nested schemas first.
    ///
    /// An order property in `props` is honored as the logical order; names it
    /// does not list follow in insertion order.
    pub fn build(&self) -> Result<Arc<Schema>> {
        match self.kind {
            SchemaKind::Record => self.build_record(),
            SchemaKind::Array => {
                let element = self.element.as_ref().ok_or(SchemaError::MissingElementSchema)?;
                SchemaBuilder::array()
                    .with_element_schema(element.build()?)?
                    .with_element_nullable(self.element_nullable)?
                    .with_props(self.props.clone())
                    .build()
            }
            kind => {
                if self.element.is_some() || !self.entries.is_empty() {
                    return Err(SchemaError::InvalidBuilderState {
                        operation: "describe",
                        expected: SchemaKind::Record,
                        actual: kind.to_string(),
                    });
                }
                SchemaBuilder::of(kind).build()
            }
        }
    }

    fn build_record(&self) -> Result<Arc<Schema>> {
        let mut props = self.props.clone();
        let order = props.remove(ENTRIES_ORDER_PROP);

        let mut builder = SchemaBuilder::record().with_props(props);
        if let Some(name) = &self.name {
            builder = builder.with_record_name(name.clone());
        }
        for entry in &self.entries {
            builder = builder.with_entry(entry.build()?)?;
        }

        match order {
            Some(order) => {
                let positions: HashMap<&str, usize> = order
                    .split(',')
                    .enumerate()
                    .map(|(position, name)| (name, position))
                    .collect();
                builder.build_with_order(|a, b| {
                    let key = |entry: &Entry| positions.get(entry.name()).copied().unwrap_or(usize::MAX);
                    key(a).cmp(&key(b))
                })
            }
            None => builder.build(),
        }
    }
}

impl EntryDescriptor {
    pub fn new(name: impl Into<String>, kind: SchemaKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            kind,
            element: None,
            element_nullable: true,
            nullable: false,
            metadata: false,
            comment: None,
            default: None,
            props: BTreeMap::new(),
        }
    }

    /// Describe a built entry
    pub fn from_entry(entry: &Entry) -> Self {
        let mut descriptor = Self::new(entry.name(), entry.kind());
        descriptor.label = entry.raw_name().map(str::to_string);
        descriptor.nullable = entry.is_nullable();
        descriptor.metadata = entry.is_metadata();
        descriptor.comment = entry.comment().map(str::to_string);
        descriptor.default = entry.default_value().cloned();
        descriptor.props = entry.props().clone();
        match entry.kind() {
            SchemaKind::Record => {
                descriptor.element = Some(Box::new(SchemaDescriptor::from_schema(entry.schema())));
            }
            SchemaKind::Array => {
                descriptor.element = entry
                    .element_schema()
                    .map(|element| Box::new(SchemaDescriptor::from_schema(element)));
                descriptor.element_nullable = entry.schema().is_element_nullable();
            }
            _ => {}
        }
        descriptor
    }

    pub fn build(&self) -> Result<Entry> {
        let mut builder = EntryBuilder::new()
            .with_name(self.name.clone())
            .with_type(self.kind)
            .with_element_nullable(self.element_nullable)
            .with_nullable(self.nullable)
            .with_metadata(self.metadata)
            .with_props(self.props.clone());
        if let Some(label) = &self.label {
            builder = builder.with_raw_name(label.clone());
        }
        if let Some(element) = &self.element {
            builder = builder.with_element_schema(element.build()?);
        }
        if let Some(comment) = &self.comment {
            builder = builder.with_comment(comment.clone());
        }
        if let Some(default) = &self.default {
            builder = builder.with_default_value(default.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person() -> serde_json::Value {
        json!({
            "type": "RECORD",
            "entries": [
                { "name": "first name", "type": "STRING", "nullable": true },
                { "name": "age", "type": "INT", "default": 0 },
                {
                    "name": "addresses",
                    "type": "ARRAY",
                    "element": {
                        "type": "RECORD",
                        "entries": [
                            { "name": "city", "type": "STRING" },
                            { "name": "source", "type": "STRING", "metadata": true }
                        ]
                    }
                }
            ],
            "props": { "owner": "crm" }
        })
    }

    #[test]
    fn test_build_nested_descriptor() {
        let schema = SchemaDescriptor::from_json(&person()).unwrap().build().unwrap();
        assert_eq!(schema.kind(), SchemaKind::Record);
        assert_eq!(schema.prop("owner"), Some("crm"));
        assert_eq!(schema.prop(ENTRIES_ORDER_PROP), Some("first_name,age,addresses"));

        let first = schema.entry("first name").unwrap();
        assert_eq!(first.name(), "first_name");
        assert_eq!(first.raw_name(), Some("first name"));
        assert!(first.is_nullable());

        let addresses = schema.entry("addresses").unwrap();
        assert!(addresses.schema().is_element_nullable());
        let address = addresses.element_schema().unwrap();
        assert!(address.entry("source").unwrap().is_metadata());
    }

    #[test]
    fn test_describe_round_trip() {
        let schema = SchemaDescriptor::from_json(&person()).unwrap().build().unwrap();
        let rebuilt = schema.describe().build().unwrap();
        assert_eq!(*rebuilt, *schema);
        assert_eq!(rebuilt.compiled(), schema.compiled());
    }

    #[test]
    fn test_order_prop_is_honored() {
        let descriptor = SchemaDescriptor::from_json(&json!({
            "type": "RECORD",
            "entries": [
                { "name": "a", "type": "STRING" },
                { "name": "b", "type": "STRING" }
            ],
            "props": { ENTRIES_ORDER_PROP: "b,a" }
        }))
        .unwrap();
        let schema = descriptor.build().unwrap();
        assert_eq!(schema.prop(ENTRIES_ORDER_PROP), Some("b,a"));
        let structural: Vec<&str> = schema.entries().iter().map(Entry::name).collect();
        assert_eq!(structural, vec!["a", "b"]);
    }

    #[test]
    fn test_array_without_element_fails() {
        let descriptor = SchemaDescriptor {
            kind: SchemaKind::Array,
            ..SchemaDescriptor::scalar(SchemaKind::Array)
        };
        assert!(matches!(descriptor.build(), Err(SchemaError::MissingElementSchema)));
    }

    #[test]
    fn test_scalar_with_entries_fails() {
        let mut descriptor = SchemaDescriptor::scalar(SchemaKind::Int);
        descriptor.entries.push(EntryDescriptor::new("x", SchemaKind::Int));
        assert!(matches!(
            descriptor.build(),
            Err(SchemaError::InvalidBuilderState { .. })
        ));
    }

    #[test]
    fn test_empty_record_describes_without_order() {
        let descriptor = Schema::empty_record().describe();
        assert!(descriptor.props.is_empty());
        assert!(descriptor.build().unwrap().is_empty_record());
    }

    #[test]
    fn test_serialized_form_skips_defaults() {
        let value = serde_json::to_value(EntryDescriptor::new("id", SchemaKind::Long)).unwrap();
        assert_eq!(value, json!({ "name": "id", "type": "LONG" }));
    }
}
