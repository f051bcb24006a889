//! File persistence helpers.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;

/// Write `contents` to `path`, creating missing parent directories first.
pub async fn create_and_write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}
