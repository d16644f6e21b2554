//! Tests for VectorBatch
//!
//! These tests verify:
//! - Per-vector byte size by encoding
//! - Bounded, resumable copies into a writer
//! - Validation against the target schema

use atlasvec::meta::{MetricType, TableFileSchema};
use atlasvec::segment::{SegmentWriter, DEFAULT_VECTOR_GROUP};
use atlasvec::source::{VectorBatch, VectorSource};
use atlasvec::AtlasError;

// =============================================================================
// Helper Functions
// =============================================================================

fn schema(dimension: i32, metric_type: MetricType) -> TableFileSchema {
    let mut schema = TableFileSchema::request("t");
    schema.dimension = dimension;
    schema.metric_type = metric_type;
    schema
}

fn writer() -> SegmentWriter {
    SegmentWriter::new("unused")
}

// =============================================================================
// Size Tests
// =============================================================================

#[test]
fn test_single_vector_size_by_encoding() {
    let float = VectorBatch::float(vec![1], vec![0.0; 8]);
    let binary = VectorBatch::binary(vec![1], vec![0; 8]);

    assert_eq!(float.single_vector_size(8), 32);
    assert_eq!(binary.single_vector_size(8), 8);
}

// =============================================================================
// Add Tests
// =============================================================================

#[test]
fn test_add_respects_max_count() {
    let mut batch = VectorBatch::float(vec![1, 2, 3, 4, 5], (0..10).map(|v| v as f32).collect());
    let mut writer = writer();

    let added = batch.add(&mut writer, &schema(2, MetricType::L2), 3).unwrap();

    assert_eq!(added, 3);
    assert_eq!(batch.remaining(), 2);
    assert!(!batch.all_added());
    let group = writer.segment().group(DEFAULT_VECTOR_GROUP).unwrap();
    assert_eq!(group.uids(), &[1, 2, 3]);
    assert_eq!(group.data().len(), 24);
}

#[test]
fn test_add_resumes_where_it_stopped() {
    let mut batch = VectorBatch::float(vec![1, 2, 3], (0..6).map(|v| v as f32).collect());
    let mut writer = writer();
    let schema = schema(2, MetricType::L2);

    batch.add(&mut writer, &schema, 2).unwrap();
    let added = batch.add(&mut writer, &schema, 10).unwrap();

    assert_eq!(added, 1);
    assert!(batch.all_added());
    assert_eq!(batch.added_count(), 3);
    let group = writer.segment().group(DEFAULT_VECTOR_GROUP).unwrap();
    assert_eq!(group.vector(2).unwrap(), &[4.0f32.to_le_bytes(), 5.0f32.to_le_bytes()].concat()[..]);
}

#[test]
fn test_add_exhausted_source_adds_nothing() {
    let mut batch = VectorBatch::binary(vec![1], vec![7, 7]);
    let mut writer = writer();
    let schema = schema(2, MetricType::Hamming);
    batch.add(&mut writer, &schema, 5).unwrap();

    let added = batch.add(&mut writer, &schema, 5).unwrap();

    assert_eq!(added, 0);
    assert_eq!(writer.segment().row_count(), 1);
}

#[test]
fn test_add_into_named_group() {
    let mut batch = VectorBatch::binary(vec![1, 2], vec![0; 4]).with_group("images");
    let mut writer = writer();

    batch.add(&mut writer, &schema(2, MetricType::Jaccard), 2).unwrap();

    assert!(writer.segment().group("images").is_some());
    assert!(writer.segment().group(DEFAULT_VECTOR_GROUP).is_none());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_add_rejects_metric_mismatch() {
    let mut float = VectorBatch::float(vec![1], vec![0.0; 2]);
    let mut binary = VectorBatch::binary(vec![1], vec![0; 2]);
    let mut writer = writer();

    assert!(matches!(
        float.add(&mut writer, &schema(2, MetricType::Hamming), 1),
        Err(AtlasError::Source(_))
    ));
    assert!(matches!(
        binary.add(&mut writer, &schema(2, MetricType::L2), 1),
        Err(AtlasError::Source(_))
    ));
    assert_eq!(float.remaining(), 1);
    assert_eq!(writer.segment().row_count(), 0);
}

#[test]
fn test_add_rejects_ragged_data() {
    let mut batch = VectorBatch::float(vec![1, 2], vec![0.0; 5]);
    let mut writer = writer();

    let result = batch.add(&mut writer, &schema(2, MetricType::L2), 2);

    assert!(matches!(result, Err(AtlasError::Source(_))));
    assert_eq!(batch.remaining(), 2);
}

#[test]
fn test_add_rejects_invalid_dimension() {
    let mut batch = VectorBatch::float(vec![1], vec![0.0; 2]);
    let mut writer = writer();

    let result = batch.add(&mut writer, &schema(0, MetricType::L2), 1);

    assert!(matches!(result, Err(AtlasError::Source(_))));
}
