//! Familiar Records
//!
//! Typed, ordered schemas and records for semi-structured values, with an
//! Avro object-container codec.
//!
//! ## Features
//!
//! - **Immutable Schemas**: built once through a state-checked builder and shared by `Arc`
//! - **Collision-Safe Naming**: arbitrary labels are sanitized and suffixed deterministically
//! - **Logical Order**: the declared entry order travels with the schema through encoding
//! - **Nullable Unions**: optional values compile to `[null, T]` unions, wrapped exactly once
//! - **Round Trips**: schema properties, labels and metadata flags survive encode/decode
//!
//! ## Example
//!
//! ```
//! use familiar_records::{codec, EntryBuilder, RecordBuilder, SchemaBuilder, SchemaKind};
//!
//! let schema = SchemaBuilder::record()
//!     .with_entry(EntryBuilder::new().with_name("name").with_type(SchemaKind::String).build()?)?
//!     .with_entry(
//!         EntryBuilder::new()
//!             .with_name("age")
//!             .with_type(SchemaKind::Int)
//!             .with_nullable(true)
//!             .build()?,
//!     )?
//!     .build()?;
//!
//! let record = RecordBuilder::new(schema.clone())?
//!     .with_string("name", "Ada")?
//!     .with_int("age", 36)?
//!     .build()?;
//!
//! let decoded = codec::decode(&codec::encode(&schema, &record)?)?;
//! assert_eq!(decoded.get_string("name")?, Some("Ada"));
//! # Ok::<(), familiar_records::SchemaError>(())
//! ```

pub mod canonical;
pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod names;
pub mod record;
pub mod schema;

pub use codec::{RecordCodec, SCHEMA_METADATA_KEY};
pub use config::{CodecConfig, Compression, OutputFormat, RecordsConfig};
pub use error::{Result, SchemaError};
pub use fingerprint::Fingerprint;
pub use record::{EntryRef, Record, RecordBuilder, Value};
pub use schema::{
    Entry, EntryBuilder, EntryDescriptor, OrderedEntries, Schema, SchemaBuilder, SchemaDescriptor,
    SchemaKind, ENTRIES_ORDER_PROP,
};
