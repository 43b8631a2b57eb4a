//! Canonical schema compiler
//!
//! Compiles built schemas into the union-based form the Avro codec consumes,
//! and back. Nullability is expressed as a `[null, T]` union, the metadata
//! flag as a field alias, the raw label, default value and datetime marker
//! as attributes. The logical entry order travels as the
//! [`ENTRIES_ORDER_PROP`] record attribute.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, SchemaError};
use crate::fingerprint::Fingerprint;
use crate::schema::registry::registry;
use crate::schema::{Entry, EntryBuilder, Schema, SchemaBuilder, SchemaKind, ENTRIES_ORDER_PROP};

pub mod json;

/// Namespace of every compiled record
pub const NAMESPACE: &str = "familiar.records";
/// Name of the shared zero-field record
pub const EMPTY_RECORD_NAME: &str = "EmptyRecord";
/// Prefix of content-derived record names
pub const RECORD_NAME_PREFIX: &str = "Record";
/// Field attribute carrying the entry's raw label
pub const LABEL_PROP: &str = "familiar.label";
/// Field attribute carrying the entry's default value
pub const DEFAULT_PROP: &str = "familiar.default";
/// Type attribute marking a timestamp as a DATETIME entry
pub const DATETIME_PROP: &str = "familiar.datetime";
/// Field alias marking a metadata entry
pub const METADATA_ALIAS: &str = "familiar_metadata";

/// Compiled schema node
#[derive(Debug, Clone, PartialEq)]
pub enum Canonical {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// `long` with the `timestamp-millis` logical type
    TimestampMillis,
    Array(Arc<CanonicalArray>),
    Record(Arc<CanonicalRecord>),
    Union(Vec<Arc<Canonical>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalArray {
    pub items: Arc<Canonical>,
    pub props: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub name: String,
    pub namespace: String,
    pub fields: Vec<CanonicalField>,
    pub props: BTreeMap<String, String>,
}

impl CanonicalRecord {
    /// `namespace.name`, or the bare name without a namespace
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn field(&self, name: &str) -> Option<&CanonicalField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalField {
    pub name: String,
    pub schema: Arc<Canonical>,
    pub doc: Option<String>,
    pub default: Option<serde_json::Value>,
    pub aliases: Vec<String>,
    pub props: BTreeMap<String, String>,
}

impl Canonical {
    /// Plain compiled form of a scalar kind
    pub(crate) fn scalar_form(kind: SchemaKind) -> Option<Canonical> {
        match kind {
            SchemaKind::String => Some(Canonical::String),
            SchemaKind::Int => Some(Canonical::Int),
            SchemaKind::Long => Some(Canonical::Long),
            SchemaKind::Float => Some(Canonical::Float),
            SchemaKind::Double => Some(Canonical::Double),
            SchemaKind::Boolean => Some(Canonical::Boolean),
            SchemaKind::Bytes => Some(Canonical::Bytes),
            SchemaKind::DateTime => Some(Canonical::TimestampMillis),
            SchemaKind::Record | SchemaKind::Array => None,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Canonical::Union(_))
    }

    /// Whether null is an accepted value
    pub fn is_nullable(&self) -> bool {
        match self {
            Canonical::Null => true,
            Canonical::Union(branches) => branches.iter().any(|b| matches!(**b, Canonical::Null)),
            _ => false,
        }
    }

    /// Short type label for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Canonical::Null => "null",
            Canonical::Boolean => "boolean",
            Canonical::Int => "int",
            Canonical::Long => "long",
            Canonical::Float => "float",
            Canonical::Double => "double",
            Canonical::Bytes => "bytes",
            Canonical::String => "string",
            Canonical::TimestampMillis => "timestamp-millis",
            Canonical::Array(_) => "array",
            Canonical::Record(_) => "record",
            Canonical::Union(_) => "union",
        }
    }
}

/// The shared `null` node
pub fn null() -> Arc<Canonical> {
    registry().null()
}

/// The shared zero-field record node
pub fn empty_record() -> Arc<Canonical> {
    Arc::clone(registry().empty_record().compiled())
}

/// Wrap a compiled type as `[null, T]`.
///
/// Scalars resolve to their prebuilt nullable singleton. A type that is
/// already a union is returned unchanged, so wrapping twice is the same as
/// wrapping once.
pub fn wrap_nullable(base: &Arc<Canonical>) -> Arc<Canonical> {
    if base.is_union() {
        return Arc::clone(base);
    }
    if let Some(nullable) = registry().nullable_for(base) {
        return nullable;
    }
    Arc::new(Canonical::Union(vec![null(), Arc::clone(base)]))
}

/// Split `[null, T]` into `(T, true)`; any other type is `(type, false)`
pub fn split_nullable(schema: &Arc<Canonical>) -> Result<(&Arc<Canonical>, bool)> {
    let Canonical::Union(branches) = &**schema else {
        return Ok((schema, false));
    };
    let mut non_null = branches.iter().filter(|b| !matches!(***b, Canonical::Null));
    match (non_null.next(), non_null.next()) {
        (Some(branch), None) if branches.len() == 2 => Ok((branch, true)),
        _ => Err(SchemaError::InvalidFormat(format!(
            "only [null, T] unions are supported, got {} branches",
            branches.len()
        ))),
    }
}

/// Compile one entry into a record field
pub(crate) fn compile_field(entry: &Entry) -> CanonicalField {
    let base = entry.schema().compiled();
    let schema = if entry.is_nullable() {
        wrap_nullable(base)
    } else {
        Arc::clone(base)
    };
    trace!(entry = entry.name(), kind = %entry.kind(), nullable = entry.is_nullable(), "compiling entry");

    let mut props = entry.props().clone();
    if let Some(raw_name) = entry.raw_name() {
        props.insert(LABEL_PROP.to_string(), raw_name.to_string());
    }
    let aliases = if entry.is_metadata() {
        vec![METADATA_ALIAS.to_string()]
    } else {
        Vec::new()
    };

    CanonicalField {
        name: entry.name().to_string(),
        schema,
        doc: entry.comment().map(str::to_string),
        default: entry.default_value().cloned(),
        aliases,
        props,
    }
}

/// Compile ordered entries into a record, naming it from its content unless
/// a name is supplied.
///
/// Fails with [`SchemaError::InvalidFormat`] when one record name ends up
/// standing for two different definitions.
pub(crate) fn compile_record<'a>(
    name: Option<&str>,
    entries: impl IntoIterator<Item = &'a Entry>,
    props: &BTreeMap<String, String>,
) -> Result<CanonicalRecord> {
    let mut record = CanonicalRecord {
        name: String::new(),
        namespace: NAMESPACE.to_string(),
        fields: entries.into_iter().map(compile_field).collect(),
        props: props.clone(),
    };
    record.name = match name {
        Some(name) => name.to_string(),
        None => {
            let content = json::to_json(&Canonical::Record(Arc::new(record.clone())));
            Fingerprint::from_json(&content).record_name(RECORD_NAME_PREFIX)
        }
    };
    check_record_names(&record, &mut HashMap::new())?;
    Ok(record)
}

/// Every full record name must map to a single definition
fn check_record_names<'a>(
    record: &'a CanonicalRecord,
    seen: &mut HashMap<String, &'a CanonicalRecord>,
) -> Result<()> {
    let full_name = record.full_name();
    if let Some(previous) = seen.get(&full_name) {
        if **previous != *record {
            return Err(SchemaError::InvalidFormat(format!(
                "record '{}' is defined twice with different fields",
                full_name
            )));
        }
        return Ok(());
    }
    seen.insert(full_name, record);
    record
        .fields
        .iter()
        .try_for_each(|field| check_nested_names(&field.schema, seen))
}

fn check_nested_names<'a>(
    schema: &'a Canonical,
    seen: &mut HashMap<String, &'a CanonicalRecord>,
) -> Result<()> {
    match schema {
        Canonical::Record(record) => check_record_names(record, seen),
        Canonical::Array(array) => check_nested_names(&array.items, seen),
        Canonical::Union(branches) => branches
            .iter()
            .try_for_each(|branch| check_nested_names(branch, seen)),
        _ => Ok(()),
    }
}

/// Compile an array of `element`; the shared empty record compiles to the
/// compiler's own empty structure
pub(crate) fn compile_array(
    element: &Arc<Schema>,
    element_nullable: bool,
    props: &BTreeMap<String, String>,
) -> Arc<Canonical> {
    let items = if element.is_empty_record() {
        empty_record()
    } else {
        Arc::clone(element.compiled())
    };
    let items = if element_nullable {
        wrap_nullable(&items)
    } else {
        items
    };
    Arc::new(Canonical::Array(Arc::new(CanonicalArray {
        items,
        props: props.clone(),
    })))
}

/// Rebuild a schema from its compiled form.
///
/// Records are rebuilt through [`SchemaBuilder`] under their compiled name, so
/// recompiling yields the same canonical form. The stored entry order is kept;
/// with `strict_order`, an order attribute that does not list exactly the
/// record's fields is rejected.
pub(crate) fn decompile(compiled: &Arc<Canonical>, strict_order: bool) -> Result<Arc<Schema>> {
    match &**compiled {
        Canonical::Null | Canonical::Union(_) => Err(SchemaError::InvalidFormat(format!(
            "{} cannot stand alone as a schema",
            compiled.type_name()
        ))),
        Canonical::Boolean => scalar(SchemaKind::Boolean),
        Canonical::Int => scalar(SchemaKind::Int),
        Canonical::Long => scalar(SchemaKind::Long),
        Canonical::Float => scalar(SchemaKind::Float),
        Canonical::Double => scalar(SchemaKind::Double),
        Canonical::Bytes => scalar(SchemaKind::Bytes),
        Canonical::String => scalar(SchemaKind::String),
        Canonical::TimestampMillis => scalar(SchemaKind::DateTime),
        Canonical::Array(array) => {
            let (items, nullable) = split_nullable(&array.items)?;
            let element = decompile(items, strict_order)?;
            SchemaBuilder::array()
                .with_element_schema(element)?
                .with_element_nullable(nullable)?
                .with_props(array.props.clone())
                .build()
        }
        Canonical::Record(record) => decompile_record(record, strict_order),
    }
}

fn scalar(kind: SchemaKind) -> Result<Arc<Schema>> {
    Schema::scalar(kind).ok_or(SchemaError::MissingType)
}

fn decompile_record(record: &CanonicalRecord, strict_order: bool) -> Result<Arc<Schema>> {
    if record.name == EMPTY_RECORD_NAME && record.fields.is_empty() {
        return Ok(Schema::empty_record());
    }

    let mut props = record.props.clone();
    let order = props.remove(ENTRIES_ORDER_PROP);
    let mut builder = SchemaBuilder::record()
        .with_record_name(record.name.clone())
        .with_props(props);
    for field in &record.fields {
        builder = builder.with_entry(decompile_field(field, strict_order)?)?;
    }

    let Some(order) = order else {
        return builder.build();
    };
    let positions = order_positions(&order, record, strict_order)?;
    builder.build_with_order(|a, b| {
        let key = |entry: &Entry| positions.get(entry.name()).copied().unwrap_or(usize::MAX);
        key(a).cmp(&key(b))
    })
}

fn order_positions(
    order: &str,
    record: &CanonicalRecord,
    strict_order: bool,
) -> Result<HashMap<String, usize>> {
    let names: Vec<&str> = order.split(',').filter(|name| !name.is_empty()).collect();
    if strict_order {
        let complete = names.len() == record.fields.len()
            && names.iter().all(|name| record.field(name).is_some());
        if !complete {
            return Err(SchemaError::InvalidFormat(format!(
                "entry order '{}' does not match the fields of {}",
                order, record.name
            )));
        }
    }
    Ok(names
        .into_iter()
        .enumerate()
        .map(|(position, name)| (name.to_string(), position))
        .collect())
}

fn decompile_field(field: &CanonicalField, strict_order: bool) -> Result<Entry> {
    let (base, nullable) = split_nullable(&field.schema)?;
    let schema = decompile(base, strict_order)?;

    let mut props = field.props.clone();
    let raw_name = props.remove(LABEL_PROP);
    let mut builder = EntryBuilder::new()
        .with_name(field.name.clone())
        .with_schema(schema)
        .with_nullable(nullable)
        .with_metadata(field.aliases.iter().any(|alias| alias == METADATA_ALIAS))
        .with_props(props);
    if let Some(raw_name) = raw_name {
        builder = builder.with_raw_name(raw_name);
    }
    if let Some(doc) = &field.doc {
        builder = builder.with_comment(doc.clone());
    }
    if let Some(default) = &field.default {
        builder = builder.with_default_value(default.clone());
    }
    builder.build()
}
