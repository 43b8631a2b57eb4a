//! Avro codec boundary
//!
//! Records are written to an Avro object container. The writer schema is
//! parsed from the schema's canonical JSON, and the same document is stored in
//! the container metadata under [`SCHEMA_METADATA_KEY`] so that every entry
//! and schema property survives decoding, whatever the Avro library keeps of
//! custom attributes.

use std::sync::Arc;

use apache_avro::types::Value as AvroValue;
use apache_avro::{Reader, Writer};
use chrono::{TimeZone, Utc};
use tracing::debug;

use crate::canonical;
use crate::config::CodecConfig;
use crate::error::{Result, SchemaError};
use crate::record::{Record, RecordBuilder, Value};
use crate::schema::{Schema, SchemaKind};

/// Container metadata key holding the canonical schema document
pub const SCHEMA_METADATA_KEY: &str = "familiar.schema";

/// Encodes and decodes records with a fixed codec configuration
#[derive(Debug, Clone, Default)]
pub struct RecordCodec {
    config: CodecConfig,
}

impl RecordCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode one record of `schema`
    pub fn encode(&self, schema: &Arc<Schema>, record: &Record) -> Result<Vec<u8>> {
        self.encode_all(schema, std::slice::from_ref(record))
    }

    /// Encode one record with the schema it was built against
    pub fn encode_record(&self, record: &Record) -> Result<Vec<u8>> {
        self.encode(record.schema(), record)
    }

    /// Encode records sharing `schema` into one container
    pub fn encode_all(&self, schema: &Arc<Schema>, records: &[Record]) -> Result<Vec<u8>> {
        if schema.kind() != SchemaKind::Record {
            return Err(SchemaError::InvalidBuilderState {
                operation: "encode",
                expected: SchemaKind::Record,
                actual: schema.kind().to_string(),
            });
        }

        let document = schema.to_canonical_json();
        let avro_schema = apache_avro::Schema::parse(&document)?;
        let mut writer = Writer::with_codec(&avro_schema, Vec::new(), self.config.compression.into());
        writer.add_user_metadata(SCHEMA_METADATA_KEY.to_string(), serde_json::to_vec(&document)?)?;

        for record in records {
            if **record.schema() != **schema {
                return Err(SchemaError::SchemaMismatch(format!(
                    "record of {} written with schema {}",
                    record.schema().record_name().unwrap_or_default(),
                    schema.record_name().unwrap_or_default()
                )));
            }
            writer.append(record_to_avro(record)?)?;
        }

        let bytes = writer.into_inner()?;
        debug!(
            schema = schema.record_name().unwrap_or_default(),
            records = records.len(),
            bytes = bytes.len(),
            "encoded records"
        );
        Ok(bytes)
    }

    /// Decode a container holding exactly one record
    pub fn decode(&self, bytes: &[u8]) -> Result<Record> {
        let (_, mut records) = self.decode_all(bytes)?;
        match records.len() {
            1 => records.pop().ok_or_else(|| SchemaError::InvalidFormat("empty container".to_string())),
            n => Err(SchemaError::InvalidFormat(format!("expected one record, found {}", n))),
        }
    }

    /// Decode every record in a container, along with their schema
    pub fn decode_all(&self, bytes: &[u8]) -> Result<(Arc<Schema>, Vec<Record>)> {
        let reader = Reader::new(bytes)?;
        let document = match reader.user_metadata().get(SCHEMA_METADATA_KEY) {
            Some(raw) => serde_json::from_slice(raw)?,
            None => {
                debug!("no {} metadata, using the writer schema", SCHEMA_METADATA_KEY);
                serde_json::to_value(reader.writer_schema())?
            }
        };
        let schema = Schema::from_canonical(&canonical::json::from_json(&document)?, self.config.strict_order)?;
        if schema.kind() != SchemaKind::Record {
            return Err(SchemaError::InvalidFormat(format!(
                "container schema is {}, expected RECORD",
                schema.kind()
            )));
        }

        let records = reader
            .map(|value| record_from_avro(value?, &schema))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            schema = schema.record_name().unwrap_or_default(),
            records = records.len(),
            bytes = bytes.len(),
            "decoded records"
        );
        Ok((schema, records))
    }
}

/// Encode one record with the default codec configuration
pub fn encode(schema: &Arc<Schema>, record: &Record) -> Result<Vec<u8>> {
    RecordCodec::default().encode(schema, record)
}

/// Decode one record with the default codec configuration
pub fn decode(bytes: &[u8]) -> Result<Record> {
    RecordCodec::default().decode(bytes)
}

fn record_to_avro(record: &Record) -> Result<AvroValue> {
    let fields = record
        .iter()
        .map(|(entry, value)| {
            let avro = to_avro(value, entry.schema(), entry.is_nullable(), entry.name())?;
            Ok((entry.name().to_string(), avro))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(AvroValue::Record(fields))
}

/// Avro value of `value`; nullable positions are written as `[null, T]` branches
fn to_avro(value: &Value, schema: &Schema, nullable: bool, name: &str) -> Result<AvroValue> {
    let base = match value {
        Value::Null if nullable => return Ok(AvroValue::Union(0, Box::new(AvroValue::Null))),
        Value::Null => return Err(SchemaError::NullNotAllowed(name.to_string())),
        Value::String(s) => AvroValue::String(s.clone()),
        Value::Int(n) => AvroValue::Int(*n),
        Value::Long(n) => AvroValue::Long(*n),
        Value::Float(n) => AvroValue::Float(*n),
        Value::Double(n) => AvroValue::Double(*n),
        Value::Boolean(b) => AvroValue::Boolean(*b),
        Value::Bytes(bytes) => AvroValue::Bytes(bytes.clone()),
        Value::DateTime(dt) => AvroValue::TimestampMillis(dt.timestamp_millis()),
        Value::Record(record) => record_to_avro(record)?,
        Value::Array(items) => {
            let element = schema.element_schema().ok_or(SchemaError::MissingElementSchema)?;
            let items = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    to_avro(item, element, schema.is_element_nullable(), &format!("{}[{}]", name, index))
                })
                .collect::<Result<Vec<_>>>()?;
            AvroValue::Array(items)
        }
    };
    Ok(if nullable {
        AvroValue::Union(1, Box::new(base))
    } else {
        base
    })
}

fn record_from_avro(value: AvroValue, schema: &Arc<Schema>) -> Result<Record> {
    let AvroValue::Record(fields) = value else {
        return Err(SchemaError::InvalidFormat(format!(
            "expected an Avro record for {}",
            schema.record_name().unwrap_or_default()
        )));
    };
    let mut builder = RecordBuilder::new(Arc::clone(schema))?;
    for (name, field) in fields {
        let entry = schema
            .entry(&name)
            .ok_or_else(|| SchemaError::NotInSchema(name.clone()))?;
        let value = from_avro(field, entry.schema(), entry.name())?;
        builder = builder.with(entry, value)?;
    }
    builder.build()
}

fn from_avro(value: AvroValue, schema: &Arc<Schema>, name: &str) -> Result<Value> {
    let value = match value {
        AvroValue::Union(_, inner) => *inner,
        other => other,
    };
    let converted = match (schema.kind(), value) {
        (_, AvroValue::Null) => Value::Null,
        (SchemaKind::String, AvroValue::String(s)) => Value::String(s),
        (SchemaKind::Int, AvroValue::Int(n)) => Value::Int(n),
        (SchemaKind::Long, AvroValue::Long(n)) => Value::Long(n),
        (SchemaKind::Float, AvroValue::Float(n)) => Value::Float(n),
        (SchemaKind::Double, AvroValue::Double(n)) => Value::Double(n),
        (SchemaKind::Boolean, AvroValue::Boolean(b)) => Value::Boolean(b),
        (SchemaKind::Bytes, AvroValue::Bytes(bytes)) => Value::Bytes(bytes),
        (SchemaKind::DateTime, AvroValue::TimestampMillis(ms) | AvroValue::Long(ms)) => Value::DateTime(
            Utc.timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| SchemaError::InvalidFormat(format!("{}: timestamp {} out of range", name, ms)))?,
        ),
        (SchemaKind::Record, record @ AvroValue::Record(_)) => Value::Record(record_from_avro(record, schema)?),
        (SchemaKind::Array, AvroValue::Array(items)) => {
            let element = schema.element_schema().ok_or(SchemaError::MissingElementSchema)?;
            Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| from_avro(item, element, &format!("{}[{}]", name, index)))
                    .collect::<Result<Vec<_>>>()?,
            )
        }
        (kind, other) => {
            return Err(SchemaError::InvalidFormat(format!(
                "{}: Avro value {:?} does not match {}",
                name, other, kind
            )))
        }
    };
    Ok(converted)
}
