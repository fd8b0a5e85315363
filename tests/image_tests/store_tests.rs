//! Tests for ImageStore
//!
//! These tests verify:
//! - Missing images read as `None`
//! - Writes replace the image and leave no temp file behind
//! - Quarantine moves the image aside

use std::fs;

use flatvol::config::SyncStrategy;
use flatvol::image::ImageStore;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store(sync: SyncStrategy) -> (TempDir, ImageStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = ImageStore::new(temp_dir.path().join("volume.img"), sync);
    (temp_dir, store)
}

// =============================================================================
// Read / Write Tests
// =============================================================================

#[test]
fn test_read_missing_image_is_none() {
    let (_temp, store) = setup_store(SyncStrategy::EverySave);

    assert!(store.read().unwrap().is_none());
}

#[test]
fn test_write_then_read() {
    let (_temp, store) = setup_store(SyncStrategy::EverySave);

    store.write(b"first image").unwrap();

    assert_eq!(store.read().unwrap().unwrap(), b"first image");
    assert!(store.path().exists());
}

#[test]
fn test_write_replaces_previous_image() {
    let (_temp, store) = setup_store(SyncStrategy::EverySave);
    store.write(b"a much longer first image").unwrap();

    store.write(b"short").unwrap();

    assert_eq!(store.read().unwrap().unwrap(), b"short");
}

#[test]
fn test_write_leaves_no_temp_file() {
    let (temp, store) = setup_store(SyncStrategy::EverySave);

    store.write(b"image").unwrap();

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["volume.img".to_string()]);
}

#[test]
fn test_os_buffered_write() {
    let (_temp, store) = setup_store(SyncStrategy::OsBuffered);

    store.write(&[0u8; 4096]).unwrap();

    assert_eq!(store.read().unwrap().unwrap().len(), 4096);
}

#[test]
fn test_write_into_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let store = ImageStore::new(
        temp_dir.path().join("absent").join("volume.img"),
        SyncStrategy::EverySave,
    );

    assert!(store.write(b"image").is_err());
    assert!(!store.path().exists());
}

// =============================================================================
// Quarantine Tests
// =============================================================================

#[test]
fn test_quarantine_moves_image_aside() {
    let (temp, store) = setup_store(SyncStrategy::EverySave);
    store.write(b"garbage").unwrap();

    let moved_to = store.quarantine().unwrap();

    assert_eq!(moved_to, temp.path().join("volume.img.corrupt"));
    assert_eq!(moved_to, store.corrupt_path());
    assert_eq!(fs::read(&moved_to).unwrap(), b"garbage");
    assert!(store.read().unwrap().is_none());
}

#[test]
fn test_quarantine_replaces_older_corrupt_copy() {
    let (_temp, store) = setup_store(SyncStrategy::EverySave);
    store.write(b"old garbage").unwrap();
    store.quarantine().unwrap();
    store.write(b"new garbage").unwrap();

    store.quarantine().unwrap();

    assert_eq!(fs::read(store.corrupt_path()).unwrap(), b"new garbage");
}
