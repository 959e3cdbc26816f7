use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Characters that cannot appear in a file name on common platforms
static INVALID_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap()
});

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").unwrap()
});

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files matching any of `extensions` directly inside a directory, sorted by path
    pub fn find_files_with_extensions<P: AsRef<Path>>(dir: P, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let wanted: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();

        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref()).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if wanted.iter().any(|w| *w == ext) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    // @generates: Output path for a generated video
    // @params: output_dir, title, default_filename
    pub fn generate_output_path<P: AsRef<Path>>(
        output_dir: P,
        title: Option<&str>,
        default_filename: &str,
    ) -> PathBuf {
        let filename = match title.map(Self::sanitize_filename) {
            Some(stem) if !stem.is_empty() => {
                if stem.to_lowercase().ends_with(".mp4") {
                    stem
                } else {
                    format!("{}.mp4", stem)
                }
            }
            _ => default_filename.to_string(),
        };

        output_dir.as_ref().join(filename)
    }

    /// Make a user-provided title safe to use as a file name
    pub fn sanitize_filename(title: &str) -> String {
        // Tabs and newlines are control characters too; fold them into spaces first
        let collapsed = WHITESPACE_RUNS.replace_all(title.trim(), " ");
        let cleaned = INVALID_FILENAME_CHARS.replace_all(&collapsed, "_");
        cleaned.trim_matches('.').trim().to_string()
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }
}
