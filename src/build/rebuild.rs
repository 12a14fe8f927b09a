use crate::error::BuildError;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Suffix appended to a source path to name its object file.
pub const OBJECT_SUFFIX: &str = ".o";

/// Stands in for `..` inside the output directory.
const PARENT_DIR_NAME: &str = "__";

/// A source file and the object file it compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObjectPair {
    pub source: PathBuf,
    pub object: PathBuf,
}

impl SourceObjectPair {
    pub fn new(source: &Path, output_dir: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            object: object_path(output_dir, source, OBJECT_SUFFIX),
        }
    }
}

/// `<output_dir>/<source><suffix>`.
///
/// Root, drive prefix and `.` components are dropped and every `..` becomes a
/// `__` directory, so the object always lands inside `output_dir`.
pub fn object_path(output_dir: &Path, source: &Path, suffix: &str) -> PathBuf {
    let mut relative = PathBuf::new();
    for component in source.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::ParentDir => relative.push(PARENT_DIR_NAME),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
        }
    }

    let mut name: OsString = output_dir.join(relative).into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Does `object` have to be rebuilt from `source`?
///
/// Missing objects always rebuild. Otherwise only a source strictly newer than
/// its object triggers a rebuild; equal timestamps count as up to date.
pub fn needs_rebuild(source: &Path, object: &Path) -> Result<bool, BuildError> {
    if !object.exists() {
        return Ok(true);
    }

    let source_mtime = fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| BuildError::io(format!("failed to stat {}", source.display()), e))?;
    let object_mtime = fs::metadata(object)
        .and_then(|m| m.modified())
        .map_err(|e| BuildError::io(format!("failed to stat {}", object.display()), e))?;

    Ok(source_mtime > object_mtime)
}
