//! Tests for the segment layer
//!
//! These tests verify:
//! - Vector group append/erase
//! - Deletion ledger semantics
//! - Writer → reader persistence with the ledger applied
//! - Ledger merge across flushes of one directory
//! - Corruption detection
//! - Segment cache capacity and eviction

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use atlasvec::segment::{
    DeletedDocs, Segment, SegmentCache, SegmentReader, SegmentWriter, VectorGroup,
    DEFAULT_VECTOR_GROUP,
};
use atlasvec::AtlasError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("000001");
    (temp_dir, path)
}

/// Writer holding ids with one-byte-per-element vectors of dimension 2
fn writer_with(directory: &PathBuf, ids: &[i64]) -> SegmentWriter {
    let mut writer = SegmentWriter::new(directory.clone());
    let data: Vec<u8> = ids.iter().flat_map(|&id| [id as u8, id as u8]).collect();
    writer.add_vectors(DEFAULT_VECTOR_GROUP, 2, 1, ids, &data).unwrap();
    writer
}

// =============================================================================
// VectorGroup Tests
// =============================================================================

#[test]
fn test_group_append_and_lookup() {
    let mut group = VectorGroup::new(2, 4);

    group.append(&[10, 11], &[0u8; 16]).unwrap();

    assert_eq!(group.len(), 2);
    assert_eq!(group.uids(), &[10, 11]);
    assert_eq!(group.vector(1).unwrap().len(), 8);
    assert!(group.vector(2).is_none());
}

#[test]
fn test_group_append_rejects_wrong_length() {
    let mut group = VectorGroup::new(2, 4);

    let result = group.append(&[10, 11], &[0u8; 15]);

    assert!(matches!(result, Err(AtlasError::Segment(_))));
    assert!(group.is_empty());
}

#[test]
fn test_group_erase_middle() {
    let mut group = VectorGroup::new(2, 1);
    group.append(&[1, 2, 3], &[1, 1, 2, 2, 3, 3]).unwrap();

    group.erase(1, 1);

    assert_eq!(group.uids(), &[1, 3]);
    assert_eq!(group.data(), &[1, 1, 3, 3]);
}

#[test]
fn test_group_erase_out_of_range_is_noop() {
    let mut group = VectorGroup::new(2, 1);
    group.append(&[1, 2], &[1, 1, 2, 2]).unwrap();

    group.erase(5, 1);

    assert_eq!(group.uids(), &[1, 2]);
    assert_eq!(group.data().len(), 4);
}

#[test]
fn test_segment_rejects_mismatched_group_layout() {
    let mut segment = Segment::new();
    segment.group_for_insert("v", 4, 4).unwrap();

    let result = segment.group_for_insert("v", 8, 4);

    assert!(matches!(result, Err(AtlasError::Segment(_))));
}

// =============================================================================
// DeletedDocs Tests
// =============================================================================

#[test]
fn test_ledger_add_is_idempotent() {
    let mut ledger = DeletedDocs::new();

    assert!(ledger.add_delete_doc(5));
    assert!(!ledger.add_delete_doc(5));

    assert_eq!(ledger.len(), 1);
    assert!(ledger.contains(5));
}

#[test]
fn test_ledger_merge() {
    let mut a = DeletedDocs::new();
    a.add_delete_doc(1);
    a.add_delete_doc(3);
    let mut b = DeletedDocs::new();
    b.add_delete_doc(2);
    b.add_delete_doc(3);

    a.merge(&b);

    assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

// =============================================================================
// Writer / Reader Tests
// =============================================================================

#[test]
fn test_serialize_creates_directory_and_files() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1, 2, 3]);

    let stats = writer.serialize().unwrap();

    assert!(dir.join("vectors.seg").exists());
    assert!(dir.join("deleted_docs.del").exists());
    assert_eq!(stats.row_count, 3);
    assert_eq!(stats.deleted_count, 0);
    assert!(stats.file_size > 0);
}

#[test]
fn test_reader_round_trip() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1, 2, 3]);
    writer.serialize().unwrap();

    let reader = SegmentReader::open(&dir).unwrap();

    assert_eq!(reader.directory(), dir.as_path());
    assert_eq!(reader.doc_ids(), vec![1, 2, 3]);
    let group = reader.segment().group(DEFAULT_VECTOR_GROUP).unwrap();
    assert_eq!(group.vector(2).unwrap(), &[3, 3]);
}

#[test]
fn test_ledger_excludes_ids_never_resident() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1, 2, 3]);
    writer.segment_mut().deleted_docs_mut().add_delete_doc(77);

    writer.serialize().unwrap();

    let reader = SegmentReader::open(&dir).unwrap();
    assert_eq!(reader.row_count(), 3);
    assert!(!reader.contains(77));
    assert!(reader.segment().deleted_docs().contains(77));
}

#[test]
fn test_serialize_drops_ledger_ids_still_resident() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1, 2, 3]);
    writer.segment_mut().deleted_docs_mut().add_delete_doc(2);

    let stats = writer.serialize().unwrap();

    assert_eq!(stats.row_count, 2);
    assert_eq!(stats.deleted_count, 1);
    let reader = SegmentReader::open(&dir).unwrap();
    assert_eq!(reader.doc_ids(), vec![1, 3]);
}

#[test]
fn test_serialize_merges_ledger_on_disk() {
    let (_temp, dir) = setup_temp_dir();
    let mut first = writer_with(&dir, &[1]);
    first.segment_mut().deleted_docs_mut().add_delete_doc(9);
    first.serialize().unwrap();

    let mut second = writer_with(&dir, &[8, 9, 10]);
    second.serialize().unwrap();

    let reader = SegmentReader::open(&dir).unwrap();
    assert_eq!(reader.doc_ids(), vec![8, 10]);
    assert!(reader.segment().deleted_docs().contains(9));
}

#[test]
fn test_reserialize_after_delete() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1, 2, 3]);
    writer.serialize().unwrap();

    writer.segment_mut().deleted_docs_mut().add_delete_doc(1);
    writer.serialize().unwrap();

    let reader = SegmentReader::open(&dir).unwrap();
    assert_eq!(reader.doc_ids(), vec![2, 3]);
}

#[test]
fn test_reader_missing_segment() {
    let (_temp, dir) = setup_temp_dir();

    let result = SegmentReader::open(&dir);

    assert!(matches!(result, Err(AtlasError::Segment(_))));
}

#[test]
fn test_reader_detects_corruption() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1, 2, 3]);
    writer.serialize().unwrap();

    let path = dir.join("vectors.seg");
    let mut bytes = fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xFF;
    fs::write(&path, bytes).unwrap();

    let result = SegmentReader::open(&dir);

    assert!(matches!(result, Err(AtlasError::Corruption(_))));
}

#[test]
fn test_reader_rejects_bad_magic() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1]);
    writer.serialize().unwrap();

    let path = dir.join("vectors.seg");
    let mut bytes = fs::read(&path).unwrap();
    bytes[0] = b'X';
    fs::write(&path, bytes).unwrap();

    assert!(matches!(SegmentReader::open(&dir), Err(AtlasError::Corruption(_))));
}

#[test]
fn test_reader_rejects_oversized_body_length() {
    let (_temp, dir) = setup_temp_dir();
    fs::create_dir_all(&dir).unwrap();

    // header claims a body of u64::MAX bytes
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"AVSG");
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 8]);
    fs::write(dir.join("vectors.seg"), bytes).unwrap();

    assert!(matches!(SegmentReader::open(&dir), Err(AtlasError::Corruption(_))));
}

#[test]
fn test_serialize_rejects_ledger_with_oversized_body_length() {
    let (_temp, dir) = setup_temp_dir();
    let mut writer = writer_with(&dir, &[1]);
    writer.serialize().unwrap();

    let path = dir.join("deleted_docs.del");
    let mut bytes = fs::read(&path).unwrap();
    bytes[6..14].copy_from_slice(&(u64::MAX - 5).to_le_bytes());
    fs::write(&path, bytes).unwrap();

    assert!(matches!(writer.serialize(), Err(AtlasError::Corruption(_))));
}

#[test]
fn test_writer_cache_loads_segment() {
    let (_temp, dir) = setup_temp_dir();
    let cache = SegmentCache::new(1024);
    let mut writer = writer_with(&dir, &[1, 2]);
    writer.serialize().unwrap();

    writer.cache(&cache).unwrap();

    assert!(cache.contains(&dir));
    assert_eq!(cache.get(&dir).unwrap().row_count(), 2);
}

#[test]
fn test_writer_cache_before_serialize_fails() {
    let (_temp, dir) = setup_temp_dir();
    let cache = SegmentCache::new(1024);
    let writer = writer_with(&dir, &[1, 2]);

    assert!(writer.cache(&cache).is_err());
    assert!(cache.is_empty());
}

// =============================================================================
// SegmentCache Tests
// =============================================================================

/// Segment of `rows` two-byte vectors: byte_size = rows * (2 + 8)
fn segment_of(rows: i64) -> Arc<Segment> {
    let mut segment = Segment::new();
    let ids: Vec<i64> = (0..rows).collect();
    segment
        .group_for_insert(DEFAULT_VECTOR_GROUP, 2, 1)
        .unwrap()
        .append(&ids, &vec![0u8; rows as usize * 2])
        .unwrap();
    Arc::new(segment)
}

#[test]
fn test_cache_tracks_usage() {
    let cache = SegmentCache::new(100);

    assert!(cache.insert(PathBuf::from("a"), segment_of(3)));
    assert!(cache.insert(PathBuf::from("b"), segment_of(4)));

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.usage(), 70);
    assert_eq!(cache.capacity(), 100);
}

#[test]
fn test_cache_evicts_least_recently_used() {
    let cache = SegmentCache::new(100);
    cache.insert(PathBuf::from("a"), segment_of(4));
    cache.insert(PathBuf::from("b"), segment_of(4));
    cache.get(&PathBuf::from("a"));

    cache.insert(PathBuf::from("c"), segment_of(4));

    assert!(cache.contains(&PathBuf::from("a")));
    assert!(!cache.contains(&PathBuf::from("b")));
    assert!(cache.contains(&PathBuf::from("c")));
    assert_eq!(cache.usage(), 80);
}

#[test]
fn test_cache_rejects_oversized_segment() {
    let cache = SegmentCache::new(20);

    assert!(!cache.insert(PathBuf::from("a"), segment_of(3)));
    assert!(cache.is_empty());
}

#[test]
fn test_cache_replace_and_erase() {
    let cache = SegmentCache::new(100);
    cache.insert(PathBuf::from("a"), segment_of(2));
    cache.insert(PathBuf::from("a"), segment_of(5));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.usage(), 50);

    let removed = cache.erase(&PathBuf::from("a")).unwrap();
    assert_eq!(removed.row_count(), 5);
    assert_eq!(cache.usage(), 0);
}
