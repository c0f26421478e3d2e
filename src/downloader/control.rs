//! History deletion.

use crate::types::{Event, JobId};
use crate::utils::is_single_component;
use std::path::Path;

use super::CatalogDownloader;

impl CatalogDownloader {
    /// Remove downloads from the registry, optionally deleting their folders
    ///
    /// Unknown ids are skipped. With `delete_files`, both the complete folder and any
    /// incomplete folder left behind are removed; a folder that cannot be removed is
    /// logged and the entry is removed anyway.
    ///
    /// Returns the number of entries that were removed.
    pub async fn delete_history(&self, ids: &[JobId], delete_files: bool) -> usize {
        let mut removed = 0;

        for id in ids {
            let Some(tracked) = self.registry.delete(id).await else {
                tracing::debug!(download_id = %id, "History delete for unknown download");
                continue;
            };
            removed += 1;

            let folder = &tracked.download().folder_name;
            if delete_files {
                if is_single_component(folder) {
                    for root in [
                        self.config.download.complete_dir(),
                        self.config.download.incomplete_dir(),
                    ] {
                        remove_folder(id, &root.join(folder)).await;
                    }
                } else {
                    tracing::warn!(
                        download_id = %id,
                        folder = %folder,
                        "Folder name does not name a single directory, files kept"
                    );
                }
            }

            tracing::info!(download_id = %id, delete_files, "Download removed");
            self.emit_event(Event::Removed { id: id.clone() });
        }

        removed
    }
}

async fn remove_folder(id: &JobId, path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => tracing::debug!(download_id = %id, path = %path.display(), "Removed folder"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            download_id = %id,
            path = %path.display(),
            error = %e,
            "Failed to remove folder"
        ),
    }
}
