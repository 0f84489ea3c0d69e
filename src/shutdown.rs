//! Shutdown coordination.
//!
//! Shutdown is immediate by design: a termination signal or a fatal census
//! escalation cancels the shared token, both background loops break out of
//! their `select!`s, and the process exits. In-flight attaches are not
//! drained.

use tracing::warn;

/// Wait for a termination request from the operator.
///
/// Resolves on ctrl-c, or on SIGTERM where available.
pub async fn wait_for_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}
