//! Process census — background refresh of the device's process list.
//!
//! Publishes each successful refresh as a whole new snapshot on a watch
//! channel so the supervisor never observes a half-written process list.
//! A single refresh failure means connectivity to the instrumentation
//! server is gone; stale data would cause false "still hooked" assumptions,
//! so the failure is escalated immediately as a fatal shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::device::{Device, ProcessSnapshot};

/// Interval between process-list refreshes.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn the background census task.
///
/// The task refreshes immediately, then once per [`REFRESH_INTERVAL`] until
/// the `CancellationToken` fires. On any refresh failure it sets `fatal`
/// and cancels the token, terminating the whole program.
///
/// # Arguments
///
/// * `device`      — Connected device to enumerate processes on.
/// * `snapshot_tx` — Watch channel the snapshot is published on.
/// * `fatal`       — Flag distinguishing fatal escalation from signal exit.
/// * `cancel`      — Cancellation token shared with the rest of the program.
#[must_use]
pub fn spawn_census(
    device: Arc<dyn Device>,
    snapshot_tx: watch::Sender<Arc<ProcessSnapshot>>,
    fatal: Arc<AtomicBool>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let dev = Arc::clone(&device);
            // The device call is synchronous FFI; keep it off the runtime
            // worker threads.
            let refreshed = tokio::task::spawn_blocking(move || dev.enumerate_processes()).await;

            match refreshed {
                Ok(Ok(snapshot)) => {
                    let _ = snapshot_tx.send(Arc::new(snapshot));
                }
                Ok(Err(err)) => {
                    error!(%err, "lost connection to the instrumentation server");
                    fatal.store(true, Ordering::SeqCst);
                    cancel.cancel();
                    break;
                }
                Err(err) => {
                    error!(%err, "process census worker panicked");
                    fatal.store(true, Ordering::SeqCst);
                    cancel.cancel();
                    break;
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("process census shutting down");
                    break;
                }
                () = tokio::time::sleep(REFRESH_INTERVAL) => {}
            }
        }
    })
}
