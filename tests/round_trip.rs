//! Round-Trip Tests for the Avro Codec
//!
//! Encodes records through the public API and checks that decoding restores
//! schemas, values, nulls and ordering at every nesting depth.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use familiar_records::{
    codec, CodecConfig, Compression, EntryBuilder, Record, RecordBuilder, RecordCodec, Schema,
    SchemaBuilder, SchemaDescriptor, SchemaKind, Value, ENTRIES_ORDER_PROP,
};

// =============================================================================
// Fixtures
// =============================================================================

fn leaf_schema() -> Arc<Schema> {
    SchemaBuilder::record()
        .with_entry(EntryBuilder::new().with_name("id").with_type(SchemaKind::Int).build().unwrap())
        .unwrap()
        .with_entry(
            EntryBuilder::new()
                .with_name("label")
                .with_type(SchemaKind::String)
                .with_nullable(true)
                .build()
                .unwrap(),
        )
        .unwrap()
        .with_entry(
            EntryBuilder::new()
                .with_name("at")
                .with_type(SchemaKind::DateTime)
                .with_nullable(true)
                .build()
                .unwrap(),
        )
        .unwrap()
        .build()
        .unwrap()
}

fn leaf(schema: &Arc<Schema>, id: i32) -> Record {
    let builder = RecordBuilder::new(Arc::clone(schema))
        .unwrap()
        .with_int("id", id)
        .unwrap();
    let builder = if id % 2 == 0 {
        builder
            .with_string("label", format!("leaf-{}", id))
            .unwrap()
            .with_timestamp("at", 1_600_000_000_000 + i64::from(id))
            .unwrap()
    } else {
        builder
    };
    builder.build().unwrap()
}

/// ARRAY nested `depth` times around `leaf`
fn nested_type(depth: usize, leaf: &Arc<Schema>) -> Arc<Schema> {
    (0..depth).fold(Arc::clone(leaf), |element, _| {
        SchemaBuilder::array()
            .with_element_schema(element)
            .unwrap()
            .build()
            .unwrap()
    })
}

/// Value of `nested_type(depth)` with a null next to every non-null element
fn nested_value(depth: usize, leaf_schema: &Arc<Schema>, next_id: &mut i32) -> Value {
    if depth == 0 {
        *next_id += 1;
        return Value::Record(leaf(leaf_schema, *next_id));
    }
    Value::Array(vec![
        nested_value(depth - 1, leaf_schema, next_id),
        Value::Null,
        nested_value(depth - 1, leaf_schema, next_id),
    ])
}

fn tree_schema(depth: usize, leaf: &Arc<Schema>) -> Arc<Schema> {
    SchemaBuilder::record()
        .with_entry(EntryBuilder::new().with_name("depth").with_type(SchemaKind::Int).build().unwrap())
        .unwrap()
        .with_entry(
            EntryBuilder::new()
                .with_name("tree")
                .with_schema(nested_type(depth, leaf))
                .with_nullable(true)
                .build()
                .unwrap(),
        )
        .unwrap()
        .build()
        .unwrap()
}

// =============================================================================
// Nesting
// =============================================================================

#[test]
fn test_nested_arrays_of_records_round_trip() {
    let leaf = leaf_schema();
    for depth in 1..=5 {
        let schema = tree_schema(depth, &leaf);
        let mut next_id = 0;
        let record = RecordBuilder::new(Arc::clone(&schema))
            .unwrap()
            .with_int("depth", depth as i32)
            .unwrap()
            .with("tree", nested_value(depth, &leaf, &mut next_id))
            .unwrap()
            .build()
            .unwrap();

        let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
        assert_eq!(decoded, record, "depth {}", depth);
        assert_eq!(decoded.get_int("depth").unwrap(), Some(depth as i32));
    }
}

#[test]
fn test_null_tree_round_trip() {
    let leaf = leaf_schema();
    let schema = tree_schema(3, &leaf);
    let record = RecordBuilder::new(Arc::clone(&schema))
        .unwrap()
        .with_int("depth", 3)
        .unwrap()
        .build()
        .unwrap();
    let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
    assert_eq!(decoded.get("tree").unwrap(), &Value::Null);
}

#[test]
fn test_nulls_keep_their_positions() {
    let leaf = leaf_schema();
    let schema = tree_schema(2, &leaf);
    let mut next_id = 0;
    let record = RecordBuilder::new(Arc::clone(&schema))
        .unwrap()
        .with_int("depth", 2)
        .unwrap()
        .with("tree", nested_value(2, &leaf, &mut next_id))
        .unwrap()
        .build()
        .unwrap();

    let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
    let outer = decoded.get_array("tree").unwrap().unwrap();
    assert_eq!(outer.len(), 3);
    assert!(outer[1].is_null());
    let Value::Array(inner) = &outer[2] else {
        panic!("expected inner array, got {:?}", outer[2]);
    };
    assert!(inner[1].is_null());
    let Value::Record(last) = &inner[2] else {
        panic!("expected record, got {:?}", inner[2]);
    };
    assert_eq!(last.get_int("id").unwrap(), Some(4));
    assert_eq!(last.get_string("label").unwrap(), Some("leaf-4"));
    assert_eq!(
        last.get_datetime("at").unwrap(),
        Some(Utc.timestamp_millis_opt(1_600_000_000_004).unwrap())
    );
}

#[test]
fn test_empty_record_elements() {
    let schema = SchemaBuilder::record()
        .with_entry(
            EntryBuilder::new()
                .with_name("markers")
                .with_type(SchemaKind::Array)
                .with_element_schema(Schema::empty_record())
                .build()
                .unwrap(),
        )
        .unwrap()
        .build()
        .unwrap();
    let marker = RecordBuilder::new(Schema::empty_record()).unwrap().build().unwrap();
    let record = RecordBuilder::new(Arc::clone(&schema))
        .unwrap()
        .with_array("markers", vec![Some(marker.clone()), None, Some(marker)])
        .unwrap()
        .build()
        .unwrap();

    let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
    assert_eq!(decoded, record);
}

// =============================================================================
// Scalars, labels and properties
// =============================================================================

fn everything_schema() -> Arc<Schema> {
    let scalar = |label: &str, kind: SchemaKind| {
        EntryBuilder::new()
            .with_name(label)
            .with_type(kind)
            .with_nullable(true)
            .build()
            .unwrap()
    };
    SchemaBuilder::record()
        .with_entry(scalar("full name", SchemaKind::String))
        .unwrap()
        .with_entry(scalar("int", SchemaKind::Int))
        .unwrap()
        .with_entry(scalar("long", SchemaKind::Long))
        .unwrap()
        .with_entry(scalar("float", SchemaKind::Float))
        .unwrap()
        .with_entry(scalar("double", SchemaKind::Double))
        .unwrap()
        .with_entry(scalar("flag", SchemaKind::Boolean))
        .unwrap()
        .with_entry(scalar("blob", SchemaKind::Bytes))
        .unwrap()
        .with_entry(scalar("when", SchemaKind::DateTime))
        .unwrap()
        .with_entry(
            EntryBuilder::new()
                .with_name("$oid")
                .with_type(SchemaKind::String)
                .with_metadata(true)
                .with_comment("source identifier")
                .with_prop("origin", "mongo")
                .build()
                .unwrap(),
        )
        .unwrap()
        .with_props([("owner", "ingest"), ("version", "3")])
        .build_with_order(|a, b| a.name().cmp(b.name()))
        .unwrap()
}

#[test]
fn test_scalar_values_round_trip() {
    let schema = everything_schema();
    let when = Utc.timestamp_millis_opt(1_712_345_678_901).unwrap();
    let record = RecordBuilder::new(Arc::clone(&schema))
        .unwrap()
        .with_string("full name", "Ada Lovelace")
        .unwrap()
        .with_int("int", -42)
        .unwrap()
        .with_long("long", i64::MAX)
        .unwrap()
        .with_float("float", 1.5)
        .unwrap()
        .with_double("double", -0.25)
        .unwrap()
        .with_boolean("flag", true)
        .unwrap()
        .with_bytes("blob", vec![0_u8, 1, 254, 255])
        .unwrap()
        .with_datetime("when", when)
        .unwrap()
        .with_string("$oid", "5f1d")
        .unwrap()
        .build()
        .unwrap();

    let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(decoded.get_string("full_name").unwrap(), Some("Ada Lovelace"));
    assert_eq!(decoded.get_long("long").unwrap(), Some(i64::MAX));
    assert_eq!(decoded.get_float("float").unwrap(), Some(1.5));
    assert_eq!(decoded.get_bytes("blob").unwrap(), Some(&[0_u8, 1, 254, 255][..]));
    assert_eq!(decoded.get_datetime("when").unwrap(), Some(when));
    assert_eq!(decoded.get_string("oid").unwrap(), Some("5f1d"));
}

#[test]
fn test_schema_details_survive_decoding() {
    let schema = everything_schema();
    let record = RecordBuilder::new(Arc::clone(&schema))
        .unwrap()
        .with_string("$oid", "x")
        .unwrap()
        .build()
        .unwrap();
    let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
    let decoded_schema = decoded.schema();

    assert_eq!(**decoded_schema, *schema);
    assert_eq!(decoded_schema.record_name(), schema.record_name());
    assert_eq!(decoded_schema.prop("owner"), Some("ingest"));
    assert_eq!(decoded_schema.prop("version"), Some("3"));
    assert_eq!(
        decoded_schema.prop(ENTRIES_ORDER_PROP),
        Some("blob,double,flag,float,full_name,int,long,oid,when")
    );

    let structural: Vec<&str> = decoded_schema.entries().iter().map(|e| e.name()).collect();
    assert_eq!(
        structural,
        vec!["full_name", "int", "long", "float", "double", "flag", "blob", "when", "oid"]
    );

    let oid = decoded_schema.entry("oid").unwrap();
    assert_eq!(oid.raw_name(), Some("$oid"));
    assert!(oid.is_metadata());
    assert!(!oid.is_nullable());
    assert_eq!(oid.comment(), Some("source identifier"));
    assert_eq!(oid.prop("origin"), Some("mongo"));
    assert_eq!(decoded_schema.entry("full name").unwrap().raw_name(), Some("full name"));
}

// =============================================================================
// Batches, configuration and files
// =============================================================================

#[test]
fn test_batch_through_file() {
    let leaf = leaf_schema();
    let records: Vec<Record> = (1..=20).map(|id| crate::leaf(&leaf, id)).collect();
    let codec = RecordCodec::new(CodecConfig {
        compression: Compression::Null,
        strict_order: true,
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("leaves.avro");
    std::fs::write(&path, codec.encode_all(&leaf, &records).unwrap()).unwrap();

    let (schema, decoded) = codec.decode_all(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(*schema, *leaf);
    assert_eq!(decoded, records);
}

#[test]
fn test_compressed_and_plain_decode_alike() {
    let leaf = leaf_schema();
    let records: Vec<Record> = (1..=5).map(|id| crate::leaf(&leaf, id)).collect();
    let plain = RecordCodec::new(CodecConfig {
        compression: Compression::Null,
        strict_order: false,
    });
    let deflate = RecordCodec::default();

    let a = plain.decode_all(&plain.encode_all(&leaf, &records).unwrap()).unwrap().1;
    let b = deflate.decode_all(&deflate.encode_all(&leaf, &records).unwrap()).unwrap().1;
    assert_eq!(a, b);
}

#[test]
fn test_descriptor_schema_round_trip() {
    let descriptor: SchemaDescriptor = serde_json::from_value(serde_json::json!({
        "type": "RECORD",
        "name": "Customer",
        "entries": [
            { "name": "id", "type": "LONG" },
            { "name": "tags", "type": "ARRAY", "element": { "type": "STRING" }, "element_nullable": false },
            { "name": "tier", "type": "STRING", "default": "basic" }
        ]
    }))
    .unwrap();
    let schema = descriptor.build().unwrap();
    assert_eq!(schema.record_name(), Some("Customer"));

    let record = Record::from_json(&schema, &serde_json::json!({ "id": 9, "tags": ["a", "b"] })).unwrap();
    assert_eq!(record.get_string("tier").unwrap(), Some("basic"));

    let decoded = codec::decode(&codec::encode(&schema, &record).unwrap()).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(decoded.schema().record_name(), Some("Customer"));
    assert_eq!(
        decoded.schema().entry("tier").unwrap().default_value(),
        Some(&serde_json::json!("basic"))
    );
}
