/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::Path;
use anyhow::Result;
use textreel::file_utils::FileManager;
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(&temp_dir.path().to_path_buf(), "clip.mp4", "not really")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::dir_exists(&test_file));

    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

#[test]
fn test_ensure_dir_withNestedPath_shouldCreateParents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let nested = temp_dir.path().join("out").join("videos");

    FileManager::ensure_dir(&nested)?;
    FileManager::ensure_dir(&nested)?;

    assert!(FileManager::dir_exists(&nested));
    Ok(())
}

/// Test that footage discovery filters by extension, ignores case and sorts
#[test]
fn test_find_files_with_extensions_withMixedFiles_shouldReturnSortedMatches() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    common::create_test_file(&dir, "b.mp4", "")?;
    common::create_test_file(&dir, "a.MP4", "")?;
    common::create_test_file(&dir, "c.mov", "")?;
    common::create_test_file(&dir, "notes.txt", "")?;
    fs::create_dir(dir.join("nested"))?;
    common::create_test_file(&dir.join("nested"), "d.mp4", "")?;

    let only_mp4 = FileManager::find_files_with_extensions(&dir, &["mp4".to_string()])?;
    assert_eq!(only_mp4, vec![dir.join("a.MP4"), dir.join("b.mp4")]);

    let both = FileManager::find_files_with_extensions(&dir, &[".mp4".to_string(), "mov".to_string()])?;
    assert_eq!(both, vec![dir.join("a.MP4"), dir.join("b.mp4"), dir.join("c.mov")]);

    Ok(())
}

/// Test that generate_output_path uses the title or the default name
#[test]
fn test_generate_output_path_withTitle_shouldUseSanitizedTitle() {
    let output_dir = Path::new("/tmp/output");

    let titled = FileManager::generate_output_path(output_dir, Some("Mi video: parte 1/2"), "video_output.mp4");
    assert_eq!(titled, Path::new("/tmp/output/Mi video_ parte 1_2.mp4"));

    let already = FileManager::generate_output_path(output_dir, Some("final.mp4"), "video_output.mp4");
    assert_eq!(already, Path::new("/tmp/output/final.mp4"));
}

#[test]
fn test_generate_output_path_withoutUsableTitle_shouldUseDefault() {
    let output_dir = Path::new("/tmp/output");

    let untitled = FileManager::generate_output_path(output_dir, None, "video_output.mp4");
    assert_eq!(untitled, Path::new("/tmp/output/video_output.mp4"));

    let blank = FileManager::generate_output_path(output_dir, Some("  ..  "), "video_output.mp4");
    assert_eq!(blank, Path::new("/tmp/output/video_output.mp4"));
}

#[test]
fn test_sanitize_filename_withWhitespaceRuns_shouldCollapse() {
    assert_eq!(FileManager::sanitize_filename("  hola \t  mundo  "), "hola mundo");
    assert_eq!(FileManager::sanitize_filename("a<b>c?"), "a_b_c_");
}

#[test]
fn test_sanitize_filename_withLineBreaksAndControlChars_shouldKeepWordsApart() {
    assert_eq!(FileManager::sanitize_filename("hola\nmundo"), "hola mundo");
    assert_eq!(FileManager::sanitize_filename("hola\r\n\tmundo\n"), "hola mundo");
    assert_eq!(FileManager::sanitize_filename("bell\u{7}ring"), "bell_ring");
}

#[test]
fn test_read_to_string_withMissingFile_shouldFail() {
    assert!(FileManager::read_to_string("/definitely/not/here.txt").is_err());
}
