//! Working-directory override through the environment.
//!
//! Kept in its own test binary: the variable is process-wide and would
//! redirect every other directory started in the same process.

mod common;

use common::TestRoot;
use embedded_directory::fs_util::WORK_DIR_ENV;
use embedded_directory::{EmbeddedDirectory, LifecycleError};

#[test]
fn test_environment_overrides_the_generated_working_directory() {
    let root = TestRoot::new();
    let chosen = root.path().join("from-env");

    temp_env::with_var(WORK_DIR_ENV, Some(&chosen), || {
        tokio_test::block_on(async {
            let directory = EmbeddedDirectory::new(root.config().build().unwrap());
            let report = directory.start().await.unwrap();

            assert_eq!(report.working_dir, chosen);
            assert!(chosen.join("schema").is_dir());
            assert_eq!(root.working_dirs(), 0);

            directory.stop().await.unwrap();
            assert!(!chosen.exists());
        });
    });
}

#[test]
fn test_explicit_configuration_beats_the_environment() {
    let root = TestRoot::new();
    let from_env = root.path().join("from-env");
    let explicit = root.path().join("explicit");

    temp_env::with_var(WORK_DIR_ENV, Some(&from_env), || {
        tokio_test::block_on(async {
            let directory = EmbeddedDirectory::new(
                root.config().working_directory(&explicit).build().unwrap(),
            );
            let report = directory.start().await.unwrap();
            assert_eq!(report.working_dir, explicit);
            assert!(!from_env.exists());
            directory.stop().await.unwrap();
        });
    });
}

#[test]
fn test_existing_environment_directory_is_a_conflict() {
    let root = TestRoot::new();
    let occupied = root.path().join("occupied");
    std::fs::create_dir(&occupied).unwrap();

    temp_env::with_var(WORK_DIR_ENV, Some(&occupied), || {
        tokio_test::block_on(async {
            let directory = EmbeddedDirectory::new(root.config().build().unwrap());
            assert!(matches!(
                directory.start().await,
                Err(LifecycleError::WorkingDirectoryConflict { path }) if path == occupied
            ));
        });
    });
    assert!(occupied.is_dir());
}

#[test]
fn test_empty_environment_value_is_ignored() {
    let root = TestRoot::new();

    temp_env::with_var(WORK_DIR_ENV, Some(""), || {
        tokio_test::block_on(async {
            let directory = EmbeddedDirectory::new(root.config().build().unwrap());
            let report = directory.start().await.unwrap();
            assert!(report.working_dir.starts_with(root.work()));
            directory.stop().await.unwrap();
        });
    });
}
