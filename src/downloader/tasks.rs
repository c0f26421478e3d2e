//! Acquisition task spawning and supervision.
//!
//! Every run executes on its own task. A wrapper task awaits the run's `JoinHandle`, so a
//! panic is reported the same way as an error, and sends the outcome to one supervisor task.
//! The supervisor is the only place a run's error is recorded on the aggregate.

use crate::error::{Error, Result};
use crate::registry::{FAILED_SENTINEL, TrackedDownload};
use crate::types::Event;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::CatalogDownloader;

/// How an acquisition run ended
pub(crate) struct RunOutcome {
    pub(crate) download: Arc<TrackedDownload>,
    pub(crate) result: Result<PathBuf>,
}

/// Start the supervisor and return the sender runs report to
///
/// The supervisor exits once every sender (every downloader clone) is gone.
pub(crate) fn spawn_supervisor(
    event_tx: broadcast::Sender<Event>,
) -> mpsc::UnboundedSender<RunOutcome> {
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    tokio::spawn(supervise(outcome_rx, event_tx));
    outcome_tx
}

async fn supervise(
    mut outcomes: mpsc::UnboundedReceiver<RunOutcome>,
    event_tx: broadcast::Sender<Event>,
) {
    while let Some(RunOutcome { download, result }) = outcomes.recv().await {
        let id = download.id().clone();

        match result {
            Ok(path) => {
                tracing::info!(
                    download_id = %id,
                    path = %path.display(),
                    "Download completed"
                );
                event_tx.send(Event::Completed { id, path }).ok();
            }
            Err(e) => {
                let error = e.to_string();
                download.record_error(error.clone()).await;

                if download.snapshot().await.completed == FAILED_SENTINEL {
                    tracing::error!(download_id = %id, error = %e, "Download failed");
                    event_tx.send(Event::Failed { id, error }).ok();
                } else {
                    tracing::error!(
                        download_id = %id,
                        error = %e,
                        "Acquisition stopped, download stays in the queue"
                    );
                    event_tx.send(Event::Stalled { id, error }).ok();
                }
            }
        }
    }

    tracing::debug!("Acquisition supervisor stopped");
}

impl CatalogDownloader {
    /// Spawn the acquisition run for a download claimed with
    /// [`crate::registry::DownloadRegistry::put_started`]
    pub(crate) fn start_acquisition(&self, download: Arc<TrackedDownload>) {
        let downloader = self.clone();
        let outcome_tx = self.outcome_tx.clone();

        tokio::spawn(async move {
            let run = tokio::spawn({
                let downloader = downloader.clone();
                let download = download.clone();
                async move { downloader.run_acquisition(download).await }
            });

            let result = match run.await {
                Ok(result) => result,
                Err(e) => Err(Error::Other(format!("acquisition task aborted: {}", e))),
            };

            if outcome_tx.send(RunOutcome { download, result }).is_err() {
                tracing::warn!("Acquisition supervisor is gone, outcome dropped");
            }
        });
    }
}
