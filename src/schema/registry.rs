//! Process-wide scalar schema singletons
//!
//! Built once on first use and never mutated afterwards. Every scalar kind has
//! one schema and two compiled forms (plain and null-union), shared by
//! reference so scalar comparisons reduce to pointer checks.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use super::{OrderedEntries, Schema, SchemaBody, SchemaKind, ENTRIES_ORDER_PROP};
use crate::canonical::{Canonical, CanonicalRecord, EMPTY_RECORD_NAME, NAMESPACE};

struct ScalarSlot {
    kind: SchemaKind,
    schema: Arc<Schema>,
    plain: Arc<Canonical>,
    nullable: Arc<Canonical>,
}

pub(crate) struct ScalarRegistry {
    slots: Vec<ScalarSlot>,
    null: Arc<Canonical>,
    empty_record: Arc<Schema>,
}

static REGISTRY: OnceLock<ScalarRegistry> = OnceLock::new();

pub(crate) fn registry() -> &'static ScalarRegistry {
    REGISTRY.get_or_init(ScalarRegistry::new)
}

impl ScalarRegistry {
    fn new() -> Self {
        let null = Arc::new(Canonical::Null);
        let slots = SchemaKind::SCALARS
            .iter()
            .filter_map(|&kind| {
                let plain = Arc::new(Canonical::scalar_form(kind)?);
                let nullable = Arc::new(Canonical::Union(vec![Arc::clone(&null), Arc::clone(&plain)]));
                let schema = Arc::new(Schema::from_parts(
                    SchemaBody::Scalar(kind),
                    BTreeMap::new(),
                    Arc::clone(&plain),
                ));
                Some(ScalarSlot {
                    kind,
                    schema,
                    plain,
                    nullable,
                })
            })
            .collect();

        let props = BTreeMap::from([(ENTRIES_ORDER_PROP.to_string(), String::new())]);
        let empty = CanonicalRecord {
            name: EMPTY_RECORD_NAME.to_string(),
            namespace: NAMESPACE.to_string(),
            fields: Vec::new(),
            props: props.clone(),
        };
        let empty_record = Arc::new(Schema::from_parts(
            SchemaBody::Record {
                name: EMPTY_RECORD_NAME.to_string(),
                entries: OrderedEntries::new(),
            },
            props,
            Arc::new(Canonical::Record(Arc::new(empty))),
        ));

        Self {
            slots,
            null,
            empty_record,
        }
    }

    fn slot(&self, kind: SchemaKind) -> Option<&ScalarSlot> {
        self.slots.iter().find(|slot| slot.kind == kind)
    }

    pub(crate) fn schema(&self, kind: SchemaKind) -> Option<Arc<Schema>> {
        self.slot(kind).map(|slot| Arc::clone(&slot.schema))
    }

    pub(crate) fn canonical(&self, kind: SchemaKind) -> Option<Arc<Canonical>> {
        self.slot(kind).map(|slot| Arc::clone(&slot.plain))
    }

    pub(crate) fn nullable(&self, kind: SchemaKind) -> Option<Arc<Canonical>> {
        self.slot(kind).map(|slot| Arc::clone(&slot.nullable))
    }

    /// The prebuilt null-union for a plain scalar form, if `plain` is one
    pub(crate) fn nullable_for(&self, plain: &Arc<Canonical>) -> Option<Arc<Canonical>> {
        self.slots
            .iter()
            .find(|slot| Arc::ptr_eq(&slot.plain, plain) || *slot.plain == **plain)
            .map(|slot| Arc::clone(&slot.nullable))
    }

    pub(crate) fn null(&self) -> Arc<Canonical> {
        Arc::clone(&self.null)
    }

    pub(crate) fn empty_record(&self) -> Arc<Schema> {
        Arc::clone(&self.empty_record)
    }
}
