/*!
 * Tests for temporary resource tracking and release
 */

use std::fs;

use textreel::ledger::{ReleaseReport, ResourceLedger};

use crate::common::{create_temp_dir, remaining_entries};

#[test]
fn test_new_withBaseDir_shouldCreateWorkspaceInside() {
    let dir = create_temp_dir().unwrap();
    let ledger = ResourceLedger::new(dir.path()).unwrap();

    assert!(ledger.workspace().is_dir());
    assert!(ledger.workspace().starts_with(dir.path()));
    assert!(ledger.tracked().is_empty());
    assert!(!ledger.is_released());
}

#[test]
fn test_write_temp_withContents_shouldTrackFile() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();

    let first = ledger.write_temp("audio_0000", "wav", b"one").unwrap();
    let second = ledger.write_temp("audio_0000", "wav", b"two").unwrap();

    assert_ne!(first, second);
    assert_eq!(fs::read(&first).unwrap(), b"one");
    assert_eq!(ledger.tracked(), &[first, second]);
}

#[test]
fn test_release_all_withTrackedFiles_shouldLeaveNothingBehind() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    ledger.write_temp("a", "wav", b"a").unwrap();
    ledger.write_temp("b", "txt", b"b").unwrap();
    let reserved = ledger.temp_path("never_written", "png");

    let report = ledger.release_all();

    assert_eq!(
        report,
        ReleaseReport {
            removed: 2,
            missing: 1,
            failed: 0
        }
    );
    assert!(!reserved.exists());
    assert!(ledger.is_released());
    assert!(ledger.tracked().is_empty());
    assert!(remaining_entries(dir.path()).is_empty());
}

#[test]
fn test_release_all_calledTwice_shouldBeIdempotent() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    ledger.write_temp("a", "wav", b"a").unwrap();

    let first = ledger.release_all();
    let second = ledger.release_all();

    assert_eq!(first.removed, 1);
    assert_eq!(second, ReleaseReport::default());
}

#[test]
fn test_release_all_withFileRemovedExternally_shouldCountItMissing() {
    let dir = create_temp_dir().unwrap();
    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    let path = ledger.write_temp("a", "wav", b"a").unwrap();
    fs::remove_file(&path).unwrap();

    let report = ledger.release_all();

    assert_eq!(report.removed, 0);
    assert_eq!(report.missing, 1);
    assert_eq!(report.failed, 0);
}

#[test]
fn test_track_withExternalFile_shouldReleaseIt() {
    let dir = create_temp_dir().unwrap();
    let outside = dir.path().join("caption.txt");
    fs::write(&outside, "Hola").unwrap();

    let mut ledger = ResourceLedger::new(dir.path()).unwrap();
    ledger.track(&outside);
    ledger.track(&outside);
    assert_eq!(ledger.tracked().len(), 1);

    ledger.release_all();
    assert!(!outside.exists());
}

#[test]
fn test_drop_withoutRelease_shouldCleanUp() {
    let dir = create_temp_dir().unwrap();
    let workspace;
    {
        let mut ledger = ResourceLedger::new(dir.path()).unwrap();
        ledger.write_temp("a", "wav", b"a").unwrap();
        workspace = ledger.workspace().to_path_buf();
    }

    assert!(!workspace.exists());
    assert!(remaining_entries(dir.path()).is_empty());
}
