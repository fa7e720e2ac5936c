// Rendered template output

use fleet_core::application::RenderedFile;
use fleet_core::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write rendered files into `dir`
///
/// `dir` must be missing or empty, so a previous deployment is never
/// partially overwritten.
pub async fn write_rendered(dir: &Path, files: &[RenderedFile]) -> Result<Vec<PathBuf>> {
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        if entries.next_entry().await?.is_some() {
            return Err(AppError::Conflict(format!(
                "output directory {} is not empty",
                dir.display()
            )));
        }
    }
    tokio::fs::create_dir_all(dir).await?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.file_name);
        tokio::fs::write(&path, &file.contents).await?;
        written.push(path);
    }

    info!(dir = %dir.display(), files = %written.len(), "Wrote rendered templates");
    Ok(written)
}
