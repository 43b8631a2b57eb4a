//! Record values
//!
//! A [`Record`] is an immutable value tree bound to one RECORD schema. Values
//! are held in the schema's structural entry order and validated against the
//! entry types when written through a [`RecordBuilder`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{Result, SchemaError};
use crate::schema::{Entry, Schema, SchemaKind};

pub mod builder;
mod json;

pub use builder::{EntryRef, RecordBuilder};

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
    Record(Record),
    Array(Vec<Value>),
}

impl Value {
    /// Kind carried by this value, `None` for null
    pub fn kind(&self) -> Option<SchemaKind> {
        match self {
            Value::Null => None,
            Value::String(_) => Some(SchemaKind::String),
            Value::Int(_) => Some(SchemaKind::Int),
            Value::Long(_) => Some(SchemaKind::Long),
            Value::Float(_) => Some(SchemaKind::Float),
            Value::Double(_) => Some(SchemaKind::Double),
            Value::Boolean(_) => Some(SchemaKind::Boolean),
            Value::Bytes(_) => Some(SchemaKind::Bytes),
            Value::DateTime(_) => Some(SchemaKind::DateTime),
            Value::Record(_) => Some(SchemaKind::Record),
            Value::Array(_) => Some(SchemaKind::Array),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a JSON value into a value of `schema`'s type
    pub fn from_json(value: &serde_json::Value, schema: &Arc<Schema>) -> Result<Value> {
        json::value_from_json(value, schema, "value")
    }

    /// JSON view for diagnostics
    pub fn to_json(&self) -> serde_json::Value {
        json::value_to_json(self)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Check `value` against a type, recursing into arrays.
///
/// `name` locates the value in error messages; array elements are reported as
/// `name[index]`.
pub(crate) fn validate(value: &Value, schema: &Schema, nullable: bool, name: &str) -> Result<()> {
    let Some(kind) = value.kind() else {
        return if nullable {
            Ok(())
        } else {
            Err(SchemaError::NullNotAllowed(name.to_string()))
        };
    };
    if kind != schema.kind() {
        return Err(SchemaError::TypeMismatch {
            name: name.to_string(),
            expected: schema.kind(),
            actual: kind,
        });
    }
    match value {
        Value::Record(record) if **record.schema() != *schema => Err(SchemaError::SchemaMismatch(format!(
            "{} expects record {}, got {}",
            name,
            schema.record_name().unwrap_or_default(),
            record.schema().record_name().unwrap_or_default()
        ))),
        Value::Array(items) => {
            let element = schema.element_schema().ok_or(SchemaError::MissingElementSchema)?;
            for (index, item) in items.iter().enumerate() {
                validate(item, element, schema.is_element_nullable(), &format!("{}[{}]", name, index))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Immutable record bound to a RECORD schema
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    pub(crate) fn from_parts(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        Self { schema, values }
    }

    /// Start a builder bound to `schema`
    pub fn builder(schema: Arc<Schema>) -> Result<RecordBuilder> {
        RecordBuilder::new(schema)
    }

    /// Build a record of `schema` from a JSON object keyed by entry names or labels
    pub fn from_json(schema: &Arc<Schema>, value: &serde_json::Value) -> Result<Record> {
        json::record_from_json(schema, value)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Values in structural entry order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Entries paired with their values, in structural order
    pub fn iter(&self) -> impl Iterator<Item = (&Entry, &Value)> {
        self.schema.entries().iter().zip(self.values.iter())
    }

    /// Value of an entry, looked up by name or raw label
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.schema
            .entry_index(name)
            .and_then(|index| self.values.get(index))
            .ok_or_else(|| SchemaError::NotInSchema(name.to_string()))
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        kind: SchemaKind,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>> {
        let value = self.get(name)?;
        if value.is_null() {
            return Ok(None);
        }
        let declared = self
            .schema
            .entry(name)
            .map(Entry::kind)
            .ok_or_else(|| SchemaError::NotInSchema(name.to_string()))?;
        match extract(value) {
            Some(extracted) => Ok(Some(extracted)),
            None => Err(SchemaError::TypeMismatch {
                name: name.to_string(),
                expected: declared,
                actual: kind,
            }),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<Option<&str>> {
        self.typed(name, SchemaKind::String, |value| match value {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i32>> {
        self.typed(name, SchemaKind::Int, |value| match value {
            Value::Int(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_long(&self, name: &str) -> Result<Option<i64>> {
        self.typed(name, SchemaKind::Long, |value| match value {
            Value::Long(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_float(&self, name: &str) -> Result<Option<f32>> {
        self.typed(name, SchemaKind::Float, |value| match value {
            Value::Float(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_double(&self, name: &str) -> Result<Option<f64>> {
        self.typed(name, SchemaKind::Double, |value| match value {
            Value::Double(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_boolean(&self, name: &str) -> Result<Option<bool>> {
        self.typed(name, SchemaKind::Boolean, |value| match value {
            Value::Boolean(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_bytes(&self, name: &str) -> Result<Option<&[u8]>> {
        self.typed(name, SchemaKind::Bytes, |value| match value {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        })
    }

    pub fn get_datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        self.typed(name, SchemaKind::DateTime, |value| match value {
            Value::DateTime(v) => Some(*v),
            _ => None,
        })
    }

    pub fn get_record(&self, name: &str) -> Result<Option<&Record>> {
        self.typed(name, SchemaKind::Record, |value| match value {
            Value::Record(v) => Some(v),
            _ => None,
        })
    }

    pub fn get_array(&self, name: &str) -> Result<Option<&[Value]>> {
        self.typed(name, SchemaKind::Array, |value| match value {
            Value::Array(v) => Some(v.as_slice()),
            _ => None,
        })
    }

    /// JSON object keyed by entry name, for diagnostics
    pub fn to_json(&self) -> serde_json::Value {
        json::record_to_json(self)
    }
}
