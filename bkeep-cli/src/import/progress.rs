//! Progress polling for queued imports
//!
//! Polling runs as its own task and reports back over channels; the wizard
//! applies the outcome to its state. The task stops on a terminal status,
//! on the first failed request, or when its handle is cancelled or dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::api::ImportApi;
use crate::api::models::ImportProgress;

/// How a polling run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Terminal status received
    Finished(ImportProgress),
    /// A progress request failed; nothing terminal was observed
    Failed(String),
}

/// Owner of a running poll. Dropping it cancels the poll.
#[derive(Debug)]
pub struct PollHandle {
    import_id: String,
    cancel: CancellationToken,
    outcome: Option<oneshot::Receiver<PollOutcome>>,
    latest: watch::Receiver<Option<ImportProgress>>,
}

impl PollHandle {
    pub fn import_id(&self) -> &str {
        &self.import_id
    }

    /// Stop polling. No request is issued after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Most recent progress response, terminal or not
    pub fn latest(&self) -> Option<ImportProgress> {
        self.latest.borrow().clone()
    }

    /// Receiver that changes on every progress response
    pub fn subscribe(&self) -> watch::Receiver<Option<ImportProgress>> {
        self.latest.clone()
    }

    /// Wait for the poll to end. `None` if it was cancelled first or the
    /// outcome was already taken.
    pub async fn outcome(&mut self) -> Option<PollOutcome> {
        let rx = self.outcome.take()?;
        rx.await.ok()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start polling `import_id` every `interval`
pub fn spawn_progress_poll(
    api: Arc<dyn ImportApi>,
    import_id: String,
    interval: Duration,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (latest_tx, latest_rx) = watch::channel(None);

    tokio::spawn(poll_loop(
        api,
        import_id.clone(),
        interval,
        cancel.clone(),
        outcome_tx,
        latest_tx,
    ));

    PollHandle {
        import_id,
        cancel,
        outcome: Some(outcome_rx),
        latest: latest_rx,
    }
}

async fn poll_loop(
    api: Arc<dyn ImportApi>,
    import_id: String,
    interval: Duration,
    cancel: CancellationToken,
    outcome_tx: oneshot::Sender<PollOutcome>,
    latest_tx: watch::Sender<Option<ImportProgress>>,
) {
    let mut attempts: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Polling for import {} cancelled", import_id);
                return;
            }
            result = api.import_progress(&import_id) => result,
        };
        attempts += 1;

        match result {
            Ok(progress) => {
                log::debug!(
                    "Import {} poll #{}: {} ({}/{} ok, {} failed)",
                    import_id,
                    attempts,
                    progress.status.label(),
                    progress.successful_rows,
                    progress.total_rows,
                    progress.failed_rows
                );
                let _ = latest_tx.send(Some(progress.clone()));

                if progress.status.is_terminal() {
                    log::info!(
                        "Import {} finished as {} after {} checks",
                        import_id,
                        progress.status.label(),
                        attempts
                    );
                    let _ = outcome_tx.send(PollOutcome::Finished(progress));
                    return;
                }
            }
            Err(e) => {
                log::error!("Progress check for import {} failed: {:#}", import_id, e);
                let _ = outcome_tx.send(PollOutcome::Failed(e.to_string()));
                return;
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("Polling for import {} cancelled", import_id);
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
