//! Schema types and structures
//!
//! A [`Schema`] is immutable once built and shared through `Arc`. Scalar
//! schemas are process-wide singletons; record and array schemas carry their
//! compiled canonical form alongside the logical description.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::canonical::{self, Canonical};
use crate::error::{Result, SchemaError};
use crate::names;

pub mod builder;
pub mod descriptor;
pub mod entries;
pub(crate) mod registry;

pub use builder::SchemaBuilder;
pub use descriptor::{EntryDescriptor, SchemaDescriptor};
pub use entries::OrderedEntries;

/// Reserved schema property holding the comma-joined logical entry order
pub const ENTRIES_ORDER_PROP: &str = "familiar.entries.order";

/// Kind of a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaKind {
    Record,
    Array,
    String,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Bytes,
    DateTime,
}

impl SchemaKind {
    /// Every scalar kind, in registry order
    pub const SCALARS: [SchemaKind; 8] = [
        SchemaKind::String,
        SchemaKind::Int,
        SchemaKind::Long,
        SchemaKind::Float,
        SchemaKind::Double,
        SchemaKind::Boolean,
        SchemaKind::Bytes,
        SchemaKind::DateTime,
    ];

    /// Whether this kind is a leaf (neither RECORD nor ARRAY)
    pub fn is_scalar(&self) -> bool {
        !matches!(self, SchemaKind::Record | SchemaKind::Array)
    }

    /// Upper-case name, e.g. `"DATETIME"`
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Record => "RECORD",
            SchemaKind::Array => "ARRAY",
            SchemaKind::String => "STRING",
            SchemaKind::Int => "INT",
            SchemaKind::Long => "LONG",
            SchemaKind::Float => "FLOAT",
            SchemaKind::Double => "DOUBLE",
            SchemaKind::Boolean => "BOOLEAN",
            SchemaKind::Bytes => "BYTES",
            SchemaKind::DateTime => "DATETIME",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a schema; only the variant matching the kind carries structure
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SchemaBody {
    Scalar(SchemaKind),
    Record {
        name: String,
        entries: OrderedEntries,
    },
    Array {
        element: Arc<Schema>,
        element_nullable: bool,
    },
}

/// An immutable, built schema
#[derive(Debug)]
pub struct Schema {
    body: SchemaBody,
    props: BTreeMap<String, String>,
    compiled: Arc<Canonical>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || (self.body == other.body && self.props == other.props)
    }
}

impl Schema {
    pub(crate) fn from_parts(
        body: SchemaBody,
        props: BTreeMap<String, String>,
        compiled: Arc<Canonical>,
    ) -> Self {
        Self {
            body,
            props,
            compiled,
        }
    }

    /// The shared singleton for a scalar kind, `None` for RECORD and ARRAY
    pub fn scalar(kind: SchemaKind) -> Option<Arc<Schema>> {
        registry::registry().schema(kind)
    }

    /// The shared zero-entry record schema
    pub fn empty_record() -> Arc<Schema> {
        registry::registry().empty_record()
    }

    /// Rebuild a schema from its compiled canonical form
    pub fn from_canonical(compiled: &Arc<Canonical>, strict_order: bool) -> Result<Arc<Schema>> {
        canonical::decompile(compiled, strict_order)
    }

    /// Kind of this schema
    pub fn kind(&self) -> SchemaKind {
        match &self.body {
            SchemaBody::Scalar(kind) => *kind,
            SchemaBody::Record { .. } => SchemaKind::Record,
            SchemaBody::Array { .. } => SchemaKind::Array,
        }
    }

    /// Whether this is the shared empty record
    pub fn is_empty_record(&self) -> bool {
        std::ptr::eq(self, Arc::as_ptr(&Self::empty_record()))
    }

    /// Record name (content-derived unless supplied), RECORD only
    pub fn record_name(&self) -> Option<&str> {
        match &self.body {
            SchemaBody::Record { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Entries in structural (insertion) order; empty unless RECORD
    pub fn entries(&self) -> &[Entry] {
        match &self.body {
            SchemaBody::Record { entries, .. } => entries.as_slice(),
            _ => &[],
        }
    }

    /// Entries in the logical order recorded by [`ENTRIES_ORDER_PROP`].
    ///
    /// Names the property does not list keep their structural order after the
    /// listed ones.
    pub fn entries_ordered(&self) -> Vec<&Entry> {
        let entries = self.entries();
        let Some(order) = self.prop(ENTRIES_ORDER_PROP) else {
            return entries.iter().collect();
        };
        let positions: HashMap<&str, usize> = order
            .split(',')
            .enumerate()
            .map(|(position, name)| (name, position))
            .collect();
        let mut ordered: Vec<&Entry> = entries.iter().collect();
        ordered.sort_by_key(|entry| positions.get(entry.name()).copied().unwrap_or(usize::MAX));
        ordered
    }

    /// Look up an entry by name, then by raw label, then by the sanitized
    /// form of `name`
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entry_index(name).map(|index| &self.entries()[index])
    }

    /// Structural position of an entry, resolved like [`Schema::entry`]
    pub fn entry_index(&self, name: &str) -> Option<usize> {
        let SchemaBody::Record { entries, .. } = &self.body else {
            return None;
        };
        entries
            .position(name)
            .or_else(|| entries.iter().position(|entry| entry.raw_name() == Some(name)))
            .or_else(|| entries.position(&names::sanitize(name)))
    }

    /// Element schema, ARRAY only
    pub fn element_schema(&self) -> Option<&Arc<Schema>> {
        match &self.body {
            SchemaBody::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Whether array elements may be null, ARRAY only
    pub fn is_element_nullable(&self) -> bool {
        matches!(&self.body, SchemaBody::Array { element_nullable: true, .. })
    }

    /// Schema-level properties
    pub fn props(&self) -> &BTreeMap<String, String> {
        &self.props
    }

    /// A single schema-level property
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// The compiled union-based form handed to the codec
    pub fn compiled(&self) -> &Arc<Canonical> {
        &self.compiled
    }

    /// The compiled form rendered as an Avro schema document
    pub fn to_canonical_json(&self) -> serde_json::Value {
        canonical::json::to_json(&self.compiled)
    }

    /// Start a builder pre-filled with this schema's shape and properties
    pub fn to_builder(&self) -> SchemaBuilder {
        SchemaBuilder::from_schema(self)
    }

    /// Describe this schema as a serializable descriptor
    pub fn describe(&self) -> SchemaDescriptor {
        SchemaDescriptor::from_schema(self)
    }

    pub(crate) fn body(&self) -> &SchemaBody {
        &self.body
    }
}

/// An immutable record field descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    name: String,
    raw_name: Option<String>,
    schema: Arc<Schema>,
    nullable: bool,
    metadata: bool,
    comment: Option<String>,
    default_value: Option<serde_json::Value>,
    props: BTreeMap<String, String>,
}

impl Entry {
    /// Start building an entry
    pub fn builder() -> EntryBuilder {
        EntryBuilder::new()
    }

    /// Sanitized, unique-within-record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Original label, when it differs from the name
    pub fn raw_name(&self) -> Option<&str> {
        self.raw_name.as_deref()
    }

    /// Label for presentation: the raw name if any, else the name
    pub fn original_name(&self) -> &str {
        self.raw_name.as_deref().unwrap_or(&self.name)
    }

    /// Type of this entry
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Kind of the entry's type
    pub fn kind(&self) -> SchemaKind {
        self.schema.kind()
    }

    /// The nested schema: the record itself for RECORD, the element for ARRAY
    pub fn element_schema(&self) -> Option<&Arc<Schema>> {
        match self.kind() {
            SchemaKind::Record => Some(&self.schema),
            SchemaKind::Array => self.schema.element_schema(),
            _ => None,
        }
    }

    /// Whether the entry accepts null
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Out-of-band (technical) entry rather than payload
    pub fn is_metadata(&self) -> bool {
        self.metadata
    }

    /// Free-text comment, compiled to the field doc
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Value used when a record leaves this entry unset
    pub fn default_value(&self) -> Option<&serde_json::Value> {
        self.default_value.as_ref()
    }

    /// Entry-level properties
    pub fn props(&self) -> &BTreeMap<String, String> {
        &self.props
    }

    /// A single entry-level property
    pub fn prop(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Builder pre-filled with this entry
    pub fn to_builder(&self) -> EntryBuilder {
        EntryBuilder {
            name: Some(self.name.clone()),
            raw_name: self.raw_name.clone(),
            kind: Some(self.kind()),
            element: None,
            schema: Some(Arc::clone(&self.schema)),
            element_nullable: true,
            nullable: self.nullable,
            metadata: self.metadata,
            comment: self.comment.clone(),
            default_value: self.default_value.clone(),
            props: self.props.clone(),
        }
    }

    /// Same declaration under another name
    pub(crate) fn renamed(&self, name: String) -> Entry {
        Entry {
            name,
            ..self.clone()
        }
    }

    /// Equal in everything but the name
    pub(crate) fn same_declaration(&self, other: &Entry) -> bool {
        self.raw_name == other.raw_name
            && self.nullable == other.nullable
            && self.metadata == other.metadata
            && self.comment == other.comment
            && self.default_value == other.default_value
            && self.props == other.props
            && self.schema == other.schema
    }
}

/// Builder for [`Entry`]
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    name: Option<String>,
    raw_name: Option<String>,
    kind: Option<SchemaKind>,
    element: Option<Arc<Schema>>,
    schema: Option<Arc<Schema>>,
    element_nullable: bool,
    nullable: bool,
    metadata: bool,
    comment: Option<String>,
    default_value: Option<serde_json::Value>,
    props: BTreeMap<String, String>,
}

impl Default for EntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryBuilder {
    /// Empty builder: no name, no type, not nullable
    pub fn new() -> Self {
        Self {
            name: None,
            raw_name: None,
            kind: None,
            element: None,
            schema: None,
            element_nullable: true,
            nullable: false,
            metadata: false,
            comment: None,
            default_value: None,
            props: BTreeMap::new(),
        }
    }

    /// Set the name from a raw label.
    ///
    /// The label is sanitized; when sanitizing changes it, the label is kept as
    /// the raw name.
    pub fn with_name(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        let name = names::sanitize(&label);
        self.raw_name = (name != label).then_some(label);
        self.name = Some(name);
        self
    }

    /// Keep `raw_name` as the original label without touching the name
    pub fn with_raw_name(mut self, raw_name: impl Into<String>) -> Self {
        self.raw_name = Some(raw_name.into());
        self
    }

    /// Set the kind; RECORD and ARRAY also need an element schema
    pub fn with_type(mut self, kind: SchemaKind) -> Self {
        if self.kind != Some(kind) {
            self.schema = None;
        }
        self.kind = Some(kind);
        self
    }

    /// Nested schema: the record schema for RECORD, the element for ARRAY
    pub fn with_element_schema(mut self, schema: Arc<Schema>) -> Self {
        self.element = Some(schema);
        self.schema = None;
        self
    }

    /// Whether elements of an ARRAY entry may be null (default true)
    pub fn with_element_nullable(mut self, nullable: bool) -> Self {
        self.element_nullable = nullable;
        self.schema = None;
        self
    }

    /// Set the full entry type directly
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.kind = Some(schema.kind());
        self.element = None;
        self.schema = Some(schema);
        self
    }

    /// Whether the entry accepts null (default false)
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark the entry as out-of-band metadata
    pub fn with_metadata(mut self, metadata: bool) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach a comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Value filled in when a record leaves the entry unset
    pub fn with_default_value(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Add one property
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Add several properties
    pub fn with_props<K, V>(mut self, props: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.props
            .extend(props.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build the entry.
    ///
    /// Fails with [`SchemaError::MissingEntryName`] or [`SchemaError::MissingType`]
    /// when either is unset, and with [`SchemaError::MissingElementSchema`] for a
    /// RECORD or ARRAY entry without a nested schema.
    pub fn build(self) -> Result<Entry> {
        let name = self.name.ok_or(SchemaError::MissingEntryName)?;
        let kind = self.kind.ok_or(SchemaError::MissingType)?;
        let schema = match (self.schema, kind) {
            (Some(schema), _) => schema,
            (None, SchemaKind::Record) => {
                let element = self.element.ok_or(SchemaError::MissingElementSchema)?;
                if element.kind() != SchemaKind::Record {
                    return Err(SchemaError::TypeMismatch {
                        name,
                        expected: SchemaKind::Record,
                        actual: element.kind(),
                    });
                }
                element
            }
            (None, SchemaKind::Array) => {
                let element = self.element.ok_or(SchemaError::MissingElementSchema)?;
                SchemaBuilder::array()
                    .with_element_schema(element)?
                    .with_element_nullable(self.element_nullable)?
                    .build()?
            }
            (None, scalar) => {
                if self.element.is_some() {
                    return Err(SchemaError::InvalidBuilderState {
                        operation: "element schema",
                        expected: SchemaKind::Array,
                        actual: scalar.to_string(),
                    });
                }
                Schema::scalar(scalar).ok_or(SchemaError::MissingType)?
            }
        };

        Ok(Entry {
            name,
            raw_name: self.raw_name,
            schema,
            nullable: self.nullable,
            metadata: self.metadata,
            comment: self.comment,
            default_value: self.default_value,
            props: self.props,
        })
    }
}
