//! Schema builder
//!
//! The builder state follows the declared kind: entry operations exist only in
//! the RECORD state and element operations only in the ARRAY state. Calling
//! one in any other state fails with [`SchemaError::InvalidBuilderState`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::registry::registry;
use super::{Entry, OrderedEntries, Schema, SchemaBody, SchemaKind, ENTRIES_ORDER_PROP};
use crate::canonical::{self, Canonical};
use crate::error::{Result, SchemaError};

#[derive(Debug, Clone, Default)]
enum BuilderState {
    #[default]
    Untyped,
    Scalar(SchemaKind),
    Record(OrderedEntries),
    Array {
        element: Option<Arc<Schema>>,
        nullable: bool,
    },
}

impl BuilderState {
    fn describe(&self) -> String {
        match self {
            BuilderState::Untyped => "untyped".to_string(),
            BuilderState::Scalar(kind) => kind.to_string(),
            BuilderState::Record(_) => SchemaKind::Record.to_string(),
            BuilderState::Array { .. } => SchemaKind::Array.to_string(),
        }
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    state: BuilderState,
    props: BTreeMap<String, String>,
    record_name: Option<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder already typed with `kind`
    pub fn of(kind: SchemaKind) -> Self {
        Self::new().with_type(kind)
    }

    pub fn record() -> Self {
        Self::of(SchemaKind::Record)
    }

    pub fn array() -> Self {
        Self::of(SchemaKind::Array)
    }

    /// Builder pre-filled from an existing schema
    pub fn from_schema(schema: &Schema) -> Self {
        let state = match schema.body() {
            SchemaBody::Scalar(kind) => BuilderState::Scalar(*kind),
            SchemaBody::Record { entries, .. } => BuilderState::Record(entries.clone()),
            SchemaBody::Array {
                element,
                element_nullable,
            } => BuilderState::Array {
                element: Some(Arc::clone(element)),
                nullable: *element_nullable,
            },
        };
        let mut props = schema.props().clone();
        props.remove(ENTRIES_ORDER_PROP);
        Self {
            state,
            props,
            record_name: None,
        }
    }

    pub(crate) fn from_entries(entries: OrderedEntries) -> Self {
        Self {
            state: BuilderState::Record(entries),
            ..Self::default()
        }
    }

    /// Declare the kind; changing it discards kind-specific state
    pub fn with_type(mut self, kind: SchemaKind) -> Self {
        let unchanged = match &self.state {
            BuilderState::Untyped => false,
            BuilderState::Scalar(current) => *current == kind,
            BuilderState::Record(_) => kind == SchemaKind::Record,
            BuilderState::Array { .. } => kind == SchemaKind::Array,
        };
        if !unchanged {
            self.state = match kind {
                SchemaKind::Record => BuilderState::Record(OrderedEntries::new()),
                SchemaKind::Array => BuilderState::Array {
                    element: None,
                    nullable: true,
                },
                scalar => BuilderState::Scalar(scalar),
            };
        }
        self
    }

    fn entries_mut(&mut self, operation: &'static str) -> Result<&mut OrderedEntries> {
        match &mut self.state {
            BuilderState::Record(entries) => Ok(entries),
            other => Err(SchemaError::InvalidBuilderState {
                operation,
                expected: SchemaKind::Record,
                actual: other.describe(),
            }),
        }
    }

    /// Entries declared so far, in insertion order
    pub fn entries(&self) -> &[Entry] {
        match &self.state {
            BuilderState::Record(entries) => entries.as_slice(),
            _ => &[],
        }
    }

    /// Append an entry, resolving name collisions
    pub fn with_entry(mut self, entry: Entry) -> Result<Self> {
        self.entries_mut("entry")?.add(entry);
        Ok(self)
    }

    /// Insert an entry directly before `before`
    pub fn with_entry_before(mut self, before: &str, entry: Entry) -> Result<Self> {
        let entries = self.entries_mut("entry")?;
        if !entries.contains(before) {
            return Err(SchemaError::NotInSchema(before.to_string()));
        }
        let name = entries.add(entry).name().to_string();
        entries.move_before(before, &name)?;
        Ok(self)
    }

    /// Insert an entry directly after `after`
    pub fn with_entry_after(mut self, after: &str, entry: Entry) -> Result<Self> {
        let entries = self.entries_mut("entry")?;
        if !entries.contains(after) {
            return Err(SchemaError::NotInSchema(after.to_string()));
        }
        let name = entries.add(entry).name().to_string();
        entries.move_after(after, &name)?;
        Ok(self)
    }

    /// Remove an entry by name; unknown names are ignored
    pub fn remove(mut self, name: &str) -> Result<Self> {
        self.entries_mut("remove")?.remove(name);
        Ok(self)
    }

    /// Remove `entry` if the stored entry under its name is identical
    pub fn remove_entry(mut self, entry: &Entry) -> Result<Self> {
        let entries = self.entries_mut("remove")?;
        if entries.get(entry.name()) == Some(entry) {
            entries.remove(entry.name());
        }
        Ok(self)
    }

    pub fn move_before(mut self, before: &str, name: &str) -> Result<Self> {
        self.entries_mut("move")?.move_before(before, name)?;
        Ok(self)
    }

    pub fn move_after(mut self, after: &str, name: &str) -> Result<Self> {
        self.entries_mut("move")?.move_after(after, name)?;
        Ok(self)
    }

    pub fn swap(mut self, name: &str, with: &str) -> Result<Self> {
        self.entries_mut("swap")?.swap(name, with)?;
        Ok(self)
    }

    /// Set the element schema of an ARRAY
    pub fn with_element_schema(mut self, schema: Arc<Schema>) -> Result<Self> {
        match &mut self.state {
            BuilderState::Array { element, .. } => {
                *element = Some(schema);
                Ok(self)
            }
            other => Err(SchemaError::InvalidBuilderState {
                operation: "element schema",
                expected: SchemaKind::Array,
                actual: other.describe(),
            }),
        }
    }

    /// Whether ARRAY elements may be null (default true)
    pub fn with_element_nullable(mut self, element_nullable: bool) -> Result<Self> {
        match &mut self.state {
            BuilderState::Array { nullable, .. } => {
                *nullable = element_nullable;
                Ok(self)
            }
            other => Err(SchemaError::InvalidBuilderState {
                operation: "element nullability",
                expected: SchemaKind::Array,
                actual: other.describe(),
            }),
        }
    }

    /// Name the compiled record instead of deriving the name from its content
    pub fn with_record_name(mut self, name: impl Into<String>) -> Self {
        self.record_name = Some(name.into());
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_props<K, V>(mut self, props: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.props
            .extend(props.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build with the logical order equal to insertion order
    pub fn build(self) -> Result<Arc<Schema>> {
        self.finish(None::<fn(&Entry, &Entry) -> Ordering>)
    }

    /// Build with the logical order given by `order`.
    ///
    /// Only the recorded order property follows `order`; the structural entry
    /// sequence stays in insertion order.
    pub fn build_with_order<F>(self, order: F) -> Result<Arc<Schema>>
    where
        F: FnMut(&Entry, &Entry) -> Ordering,
    {
        self.finish(Some(order))
    }

    fn finish<F>(self, order: Option<F>) -> Result<Arc<Schema>>
    where
        F: FnMut(&Entry, &Entry) -> Ordering,
    {
        match self.state {
            BuilderState::Untyped => Err(SchemaError::MissingType),
            BuilderState::Scalar(kind) => registry().schema(kind).ok_or(SchemaError::MissingType),
            BuilderState::Record(entries) => {
                if entries.is_empty() && self.props.is_empty() && self.record_name.is_none() {
                    return Ok(registry().empty_record());
                }

                let entries_order = match order {
                    Some(mut order) => {
                        let mut sorted: Vec<&Entry> = entries.iter().collect();
                        sorted.sort_by(|a, b| order(*a, *b));
                        sorted.iter().map(|entry| entry.name()).collect::<Vec<_>>().join(",")
                    }
                    None => entries.names().collect::<Vec<_>>().join(","),
                };
                let mut props = self.props;
                props.insert(ENTRIES_ORDER_PROP.to_string(), entries_order);

                let record = canonical::compile_record(self.record_name.as_deref(), &entries, &props)?;
                debug!(record = %record.name, entries = entries.len(), "built record schema");
                let name = record.name.clone();
                Ok(Arc::new(Schema::from_parts(
                    SchemaBody::Record { name, entries },
                    props,
                    Arc::new(Canonical::Record(Arc::new(record))),
                )))
            }
            BuilderState::Array { element, nullable } => {
                let element = element.ok_or(SchemaError::MissingElementSchema)?;
                let compiled = canonical::compile_array(&element, nullable, &self.props);
                Ok(Arc::new(Schema::from_parts(
                    SchemaBody::Array {
                        element,
                        element_nullable: nullable,
                    },
                    self.props,
                    compiled,
                )))
            }
        }
    }
}
