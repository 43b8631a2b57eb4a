//! Record builder
//!
//! A builder is either bound to a RECORD schema, where every write is checked
//! against the declared entry, or unbound, where entries are declared from the
//! writes themselves and the schema is assembled at [`RecordBuilder::build`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use super::{validate, Record, Value};
use crate::error::{Result, SchemaError};
use crate::names;
use crate::schema::{Entry, EntryBuilder, OrderedEntries, Schema, SchemaBuilder, SchemaKind};

/// Entry addressed by name (or raw label) or by a resolved [`Entry`]
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'a> {
    Name(&'a str),
    Entry(&'a Entry),
}

impl<'a> From<&'a str> for EntryRef<'a> {
    fn from(name: &'a str) -> Self {
        EntryRef::Name(name)
    }
}

impl<'a> From<&'a String> for EntryRef<'a> {
    fn from(name: &'a String) -> Self {
        EntryRef::Name(name)
    }
}

impl<'a> From<&'a Entry> for EntryRef<'a> {
    fn from(entry: &'a Entry) -> Self {
        EntryRef::Entry(entry)
    }
}

#[derive(Debug, Clone)]
enum Binding {
    Bound(Arc<Schema>),
    Unbound(OrderedEntries),
}

/// Builder for [`Record`]
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    binding: Binding,
    values: HashMap<String, Value>,
}

impl RecordBuilder {
    /// Builder bound to a RECORD schema
    pub fn new(schema: Arc<Schema>) -> Result<Self> {
        if schema.kind() != SchemaKind::Record {
            return Err(SchemaError::InvalidBuilderState {
                operation: "record",
                expected: SchemaKind::Record,
                actual: schema.kind().to_string(),
            });
        }
        Ok(Self {
            binding: Binding::Bound(schema),
            values: HashMap::new(),
        })
    }

    /// Builder that declares a nullable entry for every name it is given.
    ///
    /// Writing an exact name again with another type moves the older entry and
    /// its value to the next free suffix; the newer declaration takes the name.
    /// Labels that only meet after sanitizing keep the older entry in place and
    /// suffix the newer one.
    pub fn unbound() -> Self {
        Self {
            binding: Binding::Unbound(OrderedEntries::new()),
            values: HashMap::new(),
        }
    }

    /// Write a value, checked against the entry's type and nullability
    pub fn with<'a>(mut self, key: impl Into<EntryRef<'a>>, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let entry = match &mut self.binding {
            Binding::Bound(schema) => bound_entry(schema, key.into())?,
            Binding::Unbound(entries) => declare(entries, &mut self.values, key.into(), &value)?,
        };
        validate(&value, entry.schema(), entry.is_nullable(), entry.name())?;
        self.values.insert(entry.name().to_string(), value);
        Ok(self)
    }

    pub fn with_string<'a>(self, key: impl Into<EntryRef<'a>>, value: impl Into<String>) -> Result<Self> {
        self.with(key, Value::String(value.into()))
    }

    pub fn with_int<'a>(self, key: impl Into<EntryRef<'a>>, value: i32) -> Result<Self> {
        self.with(key, Value::Int(value))
    }

    pub fn with_long<'a>(self, key: impl Into<EntryRef<'a>>, value: i64) -> Result<Self> {
        self.with(key, Value::Long(value))
    }

    pub fn with_float<'a>(self, key: impl Into<EntryRef<'a>>, value: f32) -> Result<Self> {
        self.with(key, Value::Float(value))
    }

    pub fn with_double<'a>(self, key: impl Into<EntryRef<'a>>, value: f64) -> Result<Self> {
        self.with(key, Value::Double(value))
    }

    pub fn with_boolean<'a>(self, key: impl Into<EntryRef<'a>>, value: bool) -> Result<Self> {
        self.with(key, Value::Boolean(value))
    }

    pub fn with_bytes<'a>(self, key: impl Into<EntryRef<'a>>, value: impl Into<Vec<u8>>) -> Result<Self> {
        self.with(key, Value::Bytes(value.into()))
    }

    /// Write a DATETIME; precision beyond milliseconds is dropped
    pub fn with_datetime<'a>(self, key: impl Into<EntryRef<'a>>, value: DateTime<Utc>) -> Result<Self> {
        self.with_timestamp(key, value.timestamp_millis())
    }

    /// Write a DATETIME from epoch milliseconds
    pub fn with_timestamp<'a>(self, key: impl Into<EntryRef<'a>>, millis: i64) -> Result<Self> {
        let value = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| SchemaError::InvalidFormat(format!("timestamp {} out of range", millis)))?;
        self.with(key, Value::DateTime(value))
    }

    pub fn with_record<'a>(self, key: impl Into<EntryRef<'a>>, value: Record) -> Result<Self> {
        self.with(key, Value::Record(value))
    }

    /// Write an ARRAY; each element is checked against the element schema
    pub fn with_array<'a, I>(self, key: impl Into<EntryRef<'a>>, values: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.with(key, Value::Array(values))
    }

    pub fn with_null<'a>(self, key: impl Into<EntryRef<'a>>) -> Result<Self> {
        self.with(key, Value::Null)
    }

    /// Freeze the written values into a record.
    ///
    /// Unwritten nullable entries are null; unwritten non-nullable entries take
    /// their default value, or fail with [`SchemaError::MissingValue`].
    pub fn build(self) -> Result<Record> {
        let schema = match self.binding {
            Binding::Bound(schema) => schema,
            Binding::Unbound(entries) => SchemaBuilder::from_entries(entries).build()?,
        };
        let mut values = self.values;
        let materialized = schema
            .entries()
            .iter()
            .map(|entry| match values.remove(entry.name()) {
                Some(value) => Ok(value),
                None if entry.is_nullable() => Ok(Value::Null),
                None => default_value(entry),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Record::from_parts(schema, materialized))
    }
}

fn bound_entry(schema: &Schema, key: EntryRef<'_>) -> Result<Entry> {
    let name = match key {
        EntryRef::Name(name) => name,
        EntryRef::Entry(entry) => entry.name(),
    };
    schema
        .entry(name)
        .cloned()
        .ok_or_else(|| SchemaError::NotInSchema(name.to_string()))
}

fn default_value(entry: &Entry) -> Result<Value> {
    let default = entry
        .default_value()
        .ok_or_else(|| SchemaError::MissingValue(entry.name().to_string()))?;
    let value = Value::from_json(default, entry.schema())?;
    validate(&value, entry.schema(), false, entry.name())?;
    Ok(value)
}

/// Declare the entry a write refers to, returning the stored declaration
fn declare(
    entries: &mut OrderedEntries,
    values: &mut HashMap<String, Value>,
    key: EntryRef<'_>,
    value: &Value,
) -> Result<Entry> {
    let label = match key {
        EntryRef::Entry(entry) => return Ok(entries.add(entry.clone()).clone()),
        EntryRef::Name(label) => label,
    };
    let entry = EntryBuilder::new()
        .with_name(label)
        .with_schema(infer_schema(value)?)
        .with_nullable(true)
        .build()?;

    if let Some(existing) = entries.get(entry.name()) {
        let displace = !existing.same_declaration(&entry)
            && existing.raw_name().is_none()
            && entry.raw_name().is_none();
        if displace {
            let moved_to = names::resolve(entry.name(), |name| entries.contains(name));
            let moved = existing.renamed(moved_to.clone());
            debug!(entry = entry.name(), to = %moved_to, "entry redeclared with another type");
            entries.replace(entry.name(), moved)?;
            if let Some(previous) = values.remove(entry.name()) {
                values.insert(moved_to, previous);
            }
        }
    }
    Ok(entries.add(entry).clone())
}

/// Schema implied by a written value
fn infer_schema(value: &Value) -> Result<Arc<Schema>> {
    match value {
        Value::Null => Err(SchemaError::MissingType),
        Value::Record(record) => Ok(Arc::clone(record.schema())),
        Value::Array(items) => {
            let element = items
                .iter()
                .find(|item| !item.is_null())
                .ok_or(SchemaError::MissingElementSchema)
                .and_then(infer_schema)?;
            SchemaBuilder::array().with_element_schema(element)?.build()
        }
        scalar => scalar
            .kind()
            .and_then(Schema::scalar)
            .ok_or(SchemaError::MissingType),
    }
}
