//! Tests for StorageEngine
//!
//! These tests verify:
//! - Volume lifecycle (open/initialize/close/reopen)
//! - Every namespace operation through the engine
//! - Command execution and outcomes
//! - Recovery from corrupt or mismatched images
//! - Concurrent access through SharedEngine

use std::fs;
use std::thread;

use flatvol::command::{Command, Outcome};
use flatvol::config::{Config, SyncStrategy};
use flatvol::engine::StorageEngine;
use flatvol::namespace::{RenamedEntry, ROOT_NAME};
use flatvol::{ErrorKind, SharedEngine, VolError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::OsBuffered)
        .build()
}

fn setup_temp_engine() -> (TempDir, StorageEngine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = StorageEngine::open(test_config(&temp_dir)).unwrap();
    (temp_dir, engine)
}

fn reopen(temp_dir: &TempDir, engine: StorageEngine) -> StorageEngine {
    engine.close().unwrap();
    StorageEngine::open(test_config(temp_dir)).unwrap()
}

fn run(engine: &mut StorageEngine, line: &str) -> Result<Outcome, VolError> {
    let command = Command::parse(line)?.expect("blank line");
    engine.execute(command)
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory_and_image() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("vol");

    let config = Config::builder().data_dir(&data_dir).build();
    let engine = StorageEngine::open(config).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("volume.img").exists());
    assert_eq!(engine.image_path(), data_dir.join("volume.img"));
}

#[test]
fn test_fresh_volume_has_only_root() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.current(), ROOT_NAME);
    assert_eq!(engine.free_count(), 1024);
    assert_eq!(engine.capacity(), 1024);

    let listing = engine.list_current().unwrap();
    assert_eq!(listing.container, "/");
    assert!(listing.files.is_empty());
    assert!(listing.children.is_empty());
}

#[test]
fn test_open_path_uses_default_geometry() {
    let temp_dir = TempDir::new().unwrap();

    let engine = StorageEngine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.config().block_size, 1024);
    assert_eq!(engine.capacity(), 1024);
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .block_size(0)
        .build();

    let err = StorageEngine::open(config).unwrap_err();

    assert!(matches!(err, VolError::Config(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_pool_larger_than_image_limit_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .block_count(65536)
        .block_size(65536)
        .build();

    let err = StorageEngine::open(config).unwrap_err();

    assert!(matches!(err, VolError::Config(_)));
    assert!(!temp_dir.path().join("volume.img").exists());
}

#[test]
fn test_pool_at_image_limit_accepted() {
    let config = Config::builder()
        .block_count(65535)
        .block_size(65537)
        .build();

    // 65535 * 65537 == u32::MAX
    assert!(config.validate().is_ok());
}

#[test]
fn test_custom_geometry() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .block_count(8)
        .block_size(16)
        .sync_strategy(SyncStrategy::OsBuffered)
        .build();
    let mut engine = StorageEngine::open(config).unwrap();

    engine.create_file("a", "rw", 100).unwrap();

    assert_eq!(engine.free_count(), 1);
    let err = engine.create_file("b", "rw", 17).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientSpace);
}

// =============================================================================
// File Operation Tests
// =============================================================================

#[test]
fn test_create_write_read() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.create_file("a.txt", "rw", 2048).unwrap();
    engine.write_file("a.txt", b"hello").unwrap();

    assert_eq!(engine.read_file("a.txt").unwrap(), b"hello");
    assert_eq!(engine.free_count(), 1022);
}

#[test]
fn test_write_replaces_content() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_file("a", "rw", 100).unwrap();
    engine.write_file("a", b"first version").unwrap();

    engine.write_file("a", b"second").unwrap();

    assert_eq!(engine.read_file("a").unwrap(), b"second");
}

#[test]
fn test_append_extends_content() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_file("log", "rw", 64).unwrap();

    engine.append_file("log", b"one ").unwrap();
    engine.append_file("log", b"two").unwrap();

    assert_eq!(engine.read_file("log").unwrap(), b"one two");
}

#[test]
fn test_write_over_capacity_leaves_content() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_file("a", "rw", 4).unwrap();
    engine.write_file("a", b"abc").unwrap();

    let err = engine.write_file("a", b"abcde").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    assert_eq!(engine.read_file("a").unwrap(), b"abc");
}

#[test]
fn test_delete_restores_free_blocks() {
    let (_temp, mut engine) = setup_temp_engine();
    let before = engine.free_count();

    engine.create_file("big", "rw", 4096).unwrap();
    assert_eq!(engine.free_count(), before - 4);

    engine.delete_file("big").unwrap();
    assert_eq!(engine.free_count(), before);
    assert_eq!(engine.read_file("big").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_duplicate_file_rejected() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_file("a", "rw", 10).unwrap();

    let err = engine.create_file("a", "r", 10).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(engine.free_count(), 1023);
}

#[test]
fn test_usage_reports_counts() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_file("a", "rw", 3000).unwrap();
    engine.create_container("docs").unwrap();

    let usage = engine.usage();

    assert_eq!(usage.block_size, 1024);
    assert_eq!(usage.total_blocks, 1024);
    assert_eq!(usage.free_blocks, 1021);
    assert_eq!(usage.used_blocks(), 3);
    assert_eq!(usage.containers, 2);
    assert_eq!(usage.files, 1);
}

// =============================================================================
// Container Operation Tests
// =============================================================================

#[test]
fn test_create_container_and_change_current() {
    let (_temp, mut engine) = setup_temp_engine();

    engine.create_container("docs").unwrap();
    engine.change_current("docs").unwrap();
    engine.create_file("notes", "rw", 10).unwrap();

    assert_eq!(engine.current(), "docs");
    assert!(engine.list_current().unwrap().files.iter().any(|f| f.name == "notes"));

    // Files are scoped to their container
    engine.change_current(ROOT_NAME).unwrap();
    assert_eq!(engine.read_file("notes").unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn test_change_to_missing_container() {
    let (_temp, mut engine) = setup_temp_engine();

    let err = engine.change_current("nowhere").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(engine.current(), ROOT_NAME);
}

#[test]
fn test_move_container() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_container("a").unwrap();
    engine.create_container("b").unwrap();

    engine.move_container("b", "a").unwrap();

    let ns = engine.namespace();
    assert_eq!(ns.container("b").unwrap().parent(), Some("a"));
    assert!(ns.container("a").unwrap().has_child("b"));
    assert!(!ns.container(ROOT_NAME).unwrap().has_child("b"));
}

#[test]
fn test_move_into_self_rejected() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_container("docs").unwrap();

    let err = engine.move_container("docs", "docs").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_move_into_descendant_rejected() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_container("a").unwrap();
    engine.change_current("a").unwrap();
    engine.create_container("b").unwrap();
    engine.change_current("b").unwrap();
    engine.create_container("c").unwrap();
    let before = engine.namespace().clone();

    let err = engine.move_container("a", "c").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CycleDetected);
    assert_eq!(engine.namespace(), &before);
}

#[test]
fn test_rename_file_and_container() {
    let (_temp, mut engine) = setup_temp_engine();
    engine.create_file("old.txt", "rw", 10).unwrap();
    engine.write_file("old.txt", b"data").unwrap();
    engine.create_container("olddir").unwrap();

    assert_eq!(
        engine.rename_entry("old.txt", "new.txt").unwrap(),
        RenamedEntry::File
    );
    assert_eq!(
        engine.rename_entry("olddir", "newdir").unwrap(),
        RenamedEntry::Container
    );

    assert_eq!(engine.read_file("new.txt").unwrap(), b"data");
    let listing = engine.list_current().unwrap();
    assert_eq!(listing.children, vec!["newdir".to_string()]);
    assert!(engine.namespace().container("olddir").is_none());
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_execute_mutations_report_done() {
    let (_temp, mut engine) = setup_temp_engine();

    let cases = [
        ("createfile a.txt rw 2048", "File created successfully."),
        ("writefile a.txt hello", "File written successfully."),
        ("appendfile a.txt world", "Content appended to file successfully."),
        ("mkdir docs", "Directory created successfully."),
        ("mkdir other", "Directory created successfully."),
        ("mv other docs", "Directory moved successfully."),
        ("rename a.txt b.txt", "Entry renamed successfully."),
        ("deletefile b.txt", "File deleted successfully."),
        ("cd docs", "Changed directory to: docs"),
    ];

    for (line, expected) in cases {
        assert_eq!(
            run(&mut engine, line).unwrap(),
            Outcome::Done(expected.to_string()),
            "{}",
            line
        );
    }
}

#[test]
fn test_execute_queries() {
    let (_temp, mut engine) = setup_temp_engine();
    run(&mut engine, "createfile a.txt rw 100").unwrap();
    run(&mut engine, "writefile a.txt hello there").unwrap();

    assert_eq!(
        run(&mut engine, "readfile a.txt").unwrap(),
        Outcome::Content(b"hello there".to_vec())
    );
    assert_eq!(
        run(&mut engine, "pwd").unwrap(),
        Outcome::Directory("/".to_string())
    );
    assert_eq!(run(&mut engine, "help").unwrap(), Outcome::Help);
    assert_eq!(run(&mut engine, "exit").unwrap(), Outcome::Exit);

    match run(&mut engine, "ls").unwrap() {
        Outcome::Listing(listing) => {
            assert_eq!(listing.files.len(), 1);
            assert_eq!(listing.files[0].len, 11);
            assert_eq!(listing.files[0].declared_size, 100);
            assert_eq!(listing.files[0].permissions, "rw");
        }
        other => panic!("Expected Listing, got {:?}", other),
    }
    match run(&mut engine, "df").unwrap() {
        Outcome::Usage(usage) => assert_eq!(usage.free_blocks, 1023),
        other => panic!("Expected Usage, got {:?}", other),
    }
}

#[test]
fn test_execute_propagates_errors() {
    let (_temp, mut engine) = setup_temp_engine();

    let err = run(&mut engine, "readfile missing").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_state_survives_reopen() {
    let (temp, mut engine) = setup_temp_engine();
    engine.create_file("a.txt", "rw", 2048).unwrap();
    engine.append_file("a.txt", b"hello").unwrap();
    engine.create_container("docs").unwrap();
    engine.change_current("docs").unwrap();
    engine.create_file("notes", "r", 3000).unwrap();
    engine.create_container("archive").unwrap();
    let namespace = engine.namespace().clone();
    let allocator = engine.allocator().clone();

    let engine = reopen(&temp, engine);

    assert_eq!(engine.namespace(), &namespace);
    assert_eq!(engine.allocator(), &allocator);
    assert_eq!(engine.current(), "docs");
    assert_eq!(engine.free_count(), 1024 - 5);
    assert_eq!(engine.list_current().unwrap().children, vec!["archive".to_string()]);
}

#[test]
fn test_every_mutation_is_saved_without_close() {
    let temp_dir = TempDir::new().unwrap();
    let mut engine = StorageEngine::open(test_config(&temp_dir)).unwrap();
    engine.create_file("a", "rw", 10).unwrap();
    engine.write_file("a", b"saved").unwrap();

    // Second handle sees the image as of the last mutation
    let other = StorageEngine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(other.read_file("a").unwrap(), b"saved");
    drop(engine);
}

#[test]
fn test_rename_and_move_persist() {
    let (temp, mut engine) = setup_temp_engine();
    engine.create_container("a").unwrap();
    engine.create_container("b").unwrap();
    engine.move_container("b", "a").unwrap();
    engine.rename_entry("a", "alpha").unwrap();

    let engine = reopen(&temp, engine);

    let ns = engine.namespace();
    assert!(ns.container("a").is_none());
    assert_eq!(ns.container("b").unwrap().parent(), Some("alpha"));
    assert_eq!(ns.container("alpha").unwrap().parent(), Some(ROOT_NAME));
    assert!(ns.container(ROOT_NAME).unwrap().has_child("alpha"));
}

#[test]
fn test_deleted_blocks_stay_free_after_reopen() {
    let (temp, mut engine) = setup_temp_engine();
    engine.create_file("a", "rw", 1024).unwrap();
    engine.create_file("b", "rw", 1024).unwrap();
    engine.delete_file("a").unwrap();

    let mut engine = reopen(&temp, engine);
    engine.create_file("c", "rw", 1024).unwrap();

    // The hole left by "a" is reused first
    let c = engine.namespace().container(ROOT_NAME).unwrap().file("c").unwrap();
    assert_eq!(c.blocks(), &[0]);
}

#[test]
fn test_corrupt_image_is_quarantined() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("volume.img");
    fs::write(&image, b"definitely not a volume image").unwrap();

    let engine = StorageEngine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(engine.current(), ROOT_NAME);
    assert_eq!(engine.free_count(), 1024);
    assert_eq!(
        fs::read(temp_dir.path().join("volume.img.corrupt")).unwrap(),
        b"definitely not a volume image"
    );
    // A fresh image replaced the bad one
    assert_ne!(fs::read(&image).unwrap(), b"definitely not a volume image");
}

#[test]
fn test_unreadable_image_is_quarantined() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("volume.img");
    // Reading a directory fails with something other than NotFound
    fs::create_dir(&image).unwrap();
    fs::write(image.join("keep"), b"old data").unwrap();

    let engine = StorageEngine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(engine.current(), ROOT_NAME);
    assert_eq!(engine.free_count(), 1024);
    let moved = temp_dir.path().join("volume.img.corrupt");
    assert_eq!(fs::read(moved.join("keep")).unwrap(), b"old data");
    assert!(image.is_file());
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_image_is_quarantined() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("volume.img");
    std::os::unix::fs::symlink("volume.img", &image).unwrap();

    let engine = StorageEngine::open(test_config(&temp_dir)).unwrap();

    assert_eq!(engine.current(), ROOT_NAME);
    let moved = fs::symlink_metadata(temp_dir.path().join("volume.img.corrupt")).unwrap();
    assert!(moved.file_type().is_symlink());
    assert!(fs::symlink_metadata(&image).unwrap().is_file());
}

#[test]
fn test_unreadable_image_kept_when_it_cannot_be_moved() {
    let temp_dir = TempDir::new().unwrap();
    let image = temp_dir.path().join("volume.img");
    fs::create_dir(&image).unwrap();
    fs::write(image.join("keep"), b"old data").unwrap();
    // A non-empty directory in the way makes the rename fail
    let moved = temp_dir.path().join("volume.img.corrupt");
    fs::create_dir(&moved).unwrap();
    fs::write(moved.join("other"), b"x").unwrap();

    let err = StorageEngine::open(test_config(&temp_dir)).unwrap_err();

    assert!(matches!(err, VolError::Io(_)));
    assert_eq!(fs::read(image.join("keep")).unwrap(), b"old data");
}

#[test]
fn test_geometry_mismatch_rejected() {
    let (temp, engine) = setup_temp_engine();
    engine.close().unwrap();

    let config = Config::builder()
        .data_dir(temp.path())
        .block_count(512)
        .build();
    let err = StorageEngine::open(config).unwrap_err();

    assert!(matches!(err, VolError::Config(_)));
    // The image is left untouched
    assert!(temp.path().join("volume.img").exists());
    assert!(!temp.path().join("volume.img.corrupt").exists());
}

#[test]
fn test_failed_save_reports_io_error() {
    let (temp, mut engine) = setup_temp_engine();
    // A directory where the temp image should go makes the save fail
    fs::create_dir(temp.path().join("volume.img.tmp")).unwrap();

    let err = engine.create_file("a", "rw", 10).unwrap_err();

    assert!(matches!(err, VolError::Io(_)));
    assert_eq!(err.kind(), ErrorKind::IoError);
    // The mutation itself was applied in memory
    assert!(engine.read_file("a").is_ok());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_shared_engine_concurrent_creates() {
    let temp_dir = TempDir::new().unwrap();
    let shared = SharedEngine::open(test_config(&temp_dir)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let command = Command::CreateFile {
                        name: format!("t{}_f{}", t, i),
                        permissions: "rw".to_string(),
                        size: 1024,
                    };
                    shared.execute(command).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    shared.with(|engine| {
        assert_eq!(engine.namespace().file_count(), 40);
        assert_eq!(engine.free_count(), 1024 - 40);

        // No block is handed to two files
        let mut blocks: Vec<u32> = engine
            .namespace()
            .files()
            .flat_map(|f| f.blocks().to_vec())
            .collect();
        blocks.sort_unstable();
        blocks.dedup();
        assert_eq!(blocks.len(), 40);
    });
}

#[test]
fn test_shared_engine_contended_last_block() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .block_count(1)
        .sync_strategy(SyncStrategy::OsBuffered)
        .build();
    let shared = SharedEngine::open(config).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let shared = shared.clone();
            thread::spawn(move || shared.with(|engine| engine.create_file(&format!("f{}", t), "rw", 1)))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err.kind(), ErrorKind::InsufficientSpace);
    }
}
