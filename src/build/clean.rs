//! Build output cleanup.
//!
//! Backs the `remove_dir` script function, which is what a `clean` recipe
//! usually calls:
//!
//! ```text
//! recipe("clean", || remove_dir("build"));
//! ```

use crate::error::BuildError;
use colored::*;
use std::fs;
use std::path::Path;

/// Remove `dir` and everything below it. Returns `false` when there was
/// nothing to remove.
pub fn remove_dir(dir: &Path) -> Result<bool, BuildError> {
    if !dir.exists() {
        println!("{} Nothing to clean at {}", "!".yellow(), dir.display());
        return Ok(false);
    }

    fs::remove_dir_all(dir)
        .map_err(|e| BuildError::io(format!("failed to remove {}", dir.display()), e))?;
    println!("{} Removed {}", "🗑️".red(), dir.display());
    Ok(true)
}
