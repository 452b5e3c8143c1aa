//! Per-request staging directory.
//!
//! Every request gets `<root>/vidrelay-<uuid>` for its video and thumbnail.
//! The directory is removed by [`StagingArea::cleanup`] on every pipeline exit
//! path. If a staging area is dropped without cleanup (panic, aborted task),
//! `Drop` removes it synchronously.

use super::error::CleanupWarning;
use crate::core::config;
use crate::core::error::AppError;
use crate::core::metrics;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
    released: bool,
}

impl StagingArea {
    /// Creates a fresh directory under `root`. Fails if it already exists.
    pub async fn create(root: &Path, request_id: Uuid) -> Result<Self, AppError> {
        fs_err::tokio::create_dir_all(root).await?;

        let path = root.join(format!("{}{}", config::download::STAGING_PREFIX, request_id.simple()));
        fs_err::tokio::create_dir(&path).await?;

        log::debug!("Created staging directory {}", path.display());
        Ok(Self { path, released: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a file inside the staging directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Removes every entry and then the directory itself.
    ///
    /// Each removal is attempted independently; failures are logged and
    /// returned, never propagated.
    pub async fn cleanup(mut self) -> Vec<CleanupWarning> {
        self.released = true;
        let mut warnings = Vec::new();

        match tokio::fs::read_dir(&self.path).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let entry_path = entry.path();
                        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                        let result = if is_dir {
                            fs_err::tokio::remove_dir_all(&entry_path).await
                        } else {
                            fs_err::tokio::remove_file(&entry_path).await
                        };
                        push_warning(&mut warnings, entry_path, result);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        push_warning(&mut warnings, self.path.clone(), Err(e));
                        break;
                    }
                }
            },
            Err(e) => push_warning(&mut warnings, self.path.clone(), Err(e)),
        }

        let result = fs_err::tokio::remove_dir(&self.path).await;
        push_warning(&mut warnings, self.path.clone(), result);

        for warning in &warnings {
            log::warn!("Cleanup warning: {}", warning);
            metrics::record_cleanup_warning();
        }
        warnings
    }
}

fn push_warning(warnings: &mut Vec<CleanupWarning>, path: PathBuf, result: std::io::Result<()>) {
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => warnings.push(CleanupWarning { path, source }),
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log::warn!("Staging directory {} removed on drop", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove staging directory {} on drop: {}", self.path.display(), e),
        }
    }
}
