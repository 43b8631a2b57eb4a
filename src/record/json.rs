//! JSON conversions for record values

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as Json};

use super::{Record, RecordBuilder, Value};
use crate::error::{Result, SchemaError};
use crate::schema::{Schema, SchemaKind};

fn mismatch(name: &str, schema: &Schema, json: &Json) -> SchemaError {
    SchemaError::InvalidFormat(format!(
        "{}: cannot read {} as {}",
        name,
        json,
        schema.kind()
    ))
}

pub(super) fn value_from_json(json: &Json, schema: &Arc<Schema>, name: &str) -> Result<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    let value = match schema.kind() {
        SchemaKind::String => json.as_str().map(|s| Value::String(s.to_string())),
        SchemaKind::Int => json
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::Int),
        SchemaKind::Long => json.as_i64().map(Value::Long),
        SchemaKind::Float => json.as_f64().map(|n| Value::Float(n as f32)),
        SchemaKind::Double => json.as_f64().map(Value::Double),
        SchemaKind::Boolean => json.as_bool().map(Value::Boolean),
        SchemaKind::Bytes => match json {
            Json::String(s) => Some(Value::Bytes(s.as_bytes().to_vec())),
            Json::Array(items) => items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .map(Value::Bytes),
            _ => None,
        },
        SchemaKind::DateTime => match json {
            Json::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc))),
            _ => json
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(Value::DateTime),
        },
        SchemaKind::Record => return record_from_json(schema, json).map(Value::Record),
        SchemaKind::Array => {
            let element = schema.element_schema().ok_or(SchemaError::MissingElementSchema)?;
            let items = json.as_array().ok_or_else(|| mismatch(name, schema, json))?;
            let values = items
                .iter()
                .enumerate()
                .map(|(index, item)| value_from_json(item, element, &format!("{}[{}]", name, index)))
                .collect::<Result<Vec<_>>>()?;
            Some(Value::Array(values))
        }
    };
    value.ok_or_else(|| mismatch(name, schema, json))
}

pub(super) fn record_from_json(schema: &Arc<Schema>, json: &Json) -> Result<Record> {
    let object = json
        .as_object()
        .ok_or_else(|| mismatch(schema.record_name().unwrap_or("record"), schema, json))?;
    let mut builder = RecordBuilder::new(Arc::clone(schema))?;
    for (key, item) in object {
        let entry = schema
            .entry(key)
            .ok_or_else(|| SchemaError::NotInSchema(key.clone()))?;
        let value = value_from_json(item, entry.schema(), entry.name())?;
        builder = builder.with(entry, value)?;
    }
    builder.build()
}

pub(super) fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::String(s) => Json::String(s.clone()),
        Value::Int(n) => Json::from(*n),
        Value::Long(n) => Json::from(*n),
        Value::Float(n) => Number::from_f64(f64::from(*n)).map_or(Json::Null, Json::Number),
        Value::Double(n) => Number::from_f64(*n).map_or(Json::Null, Json::Number),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::DateTime(dt) => Json::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::Record(record) => record_to_json(record),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
    }
}

pub(super) fn record_to_json(record: &Record) -> Json {
    let object: Map<String, Json> = record
        .iter()
        .map(|(entry, value)| (entry.name().to_string(), value_to_json(value)))
        .collect();
    Json::Object(object)
}
