// Filesystem helpers for run artifacts

use std::fs;
use std::path::{Path, PathBuf};

/// Create `dir` (and parents) and return its absolute path.
pub fn ensure_dir(dir: &Path) -> Result<PathBuf, String> {
    fs::create_dir_all(dir).map_err(|e| format!("cannot create {}: {}", dir.display(), e))?;
    fs::canonicalize(dir).map_err(|e| format!("cannot resolve {}: {}", dir.display(), e))
}

/// True once `path` exists and holds at least one byte.
pub fn file_ready(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Write UTF-8 text, replacing any existing file.
pub fn write_text(path: &Path, content: &str) -> Result<(), String> {
    fs::write(path, content).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

/// Files in `dir` with extension `ext` (case-insensitive), sorted by name.
pub fn list_files(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir).map_err(|e| format!("cannot list {}: {}", dir.display(), e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .collect();
    files.sort();
    Ok(files)
}
