//! Shared path helpers for the corpus cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Gets the cross-platform default cache path.
///
/// Returns the path as `{data_dir}/tagmine/corpus.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_cache_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("tagmine").join("corpus.db"))
}

/// Ensures the parent directory of the cache file exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_cache_directory(cache_path: &Path) -> Result<()> {
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {}", parent.display()))?;
    }
    Ok(())
}
