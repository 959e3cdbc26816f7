/*!
 * Common test utilities for the textreel test suite
 */

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use tempfile::TempDir;

use textreel::footage::{FootageClip, FootagePool};
use textreel::timeline::FrameSize;

// Re-export the fake collaborators module
pub mod fakes;

/// Frame size used by most test clips
pub const HD: FrameSize = FrameSize { width: 1280, height: 720 };

/// Routes library logging to the test harness output
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A pool of HD clips with the given durations, named `clip_<n>.mp4`
pub fn pool_of(durations: &[f64]) -> FootagePool {
    let clips = durations
        .iter()
        .enumerate()
        .map(|(i, d)| FootageClip::new(format!("clip_{}.mp4", i), *d, HD))
        .collect();
    FootagePool::new(clips).expect("test pool should be valid")
}

/// Every entry left under `dir`, recursively
pub fn remaining_entries(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .collect()
}

/// Build a probe that knows every clip in `clips`
pub fn probe_for(clips: &[(PathBuf, f64)]) -> fakes::FakeProbe {
    let mut known = HashMap::new();
    for (path, duration) in clips {
        known.insert(path.clone(), fakes::FakeProbe::readable(*duration, HD));
    }
    fakes::FakeProbe::new(known)
}
