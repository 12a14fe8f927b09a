use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively collect files under `dir` whose extension is `ext`.
///
/// `ext` may be given with or without its leading dot. A missing directory
/// yields an empty list. Results are sorted by file name within each directory.
pub fn find_files_by_extension(dir: &Path, ext: &str) -> Vec<PathBuf> {
    let wanted = ext.trim_start_matches('.');
    if wanted.is_empty() || !dir.is_dir() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|e| e == wanted))
        .collect()
}
