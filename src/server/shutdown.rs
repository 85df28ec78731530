//! Shutdown sources for [`Server`](super::Server).
//!
//! A server stops when either its [`ShutdownHandle`] fires or the future
//! passed to `run_with_shutdown` resolves. [`os_signal`] is the future used
//! by `run`: it resolves on SIGINT or SIGTERM (Ctrl-C elsewhere).

use log::warn;
use tokio::signal;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Cloneable trigger for an in-process shutdown.
///
/// # Examples
///
/// ```
/// use numwire::server::ShutdownHandle;
///
/// let handle = ShutdownHandle::new();
/// let observer = handle.clone();
/// handle.shutdown();
/// assert!(observer.is_shutdown());
/// ```
#[derive(Clone, Debug, Default)]
pub struct ShutdownHandle(CancellationToken);

impl ShutdownHandle {
    /// Create a handle that has not fired.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Request shutdown. Repeated calls have no further effect.
    pub fn shutdown(&self) { self.0.cancel(); }

    /// Returns `true` once shutdown has been requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool { self.0.is_cancelled() }

    /// Resolves once shutdown has been requested.
    pub fn requested(&self) -> WaitForCancellationFuture<'_> { self.0.cancelled() }
}

/// Resolve when the process receives an interrupt or termination signal.
///
/// If signal handlers cannot be installed the future never resolves and the
/// server can only be stopped through a [`ShutdownHandle`].
pub async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!("failed to listen for interrupt: error={e}");
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: error={e}");
                ctrl_c_or_pending().await;
            }
        }
    }
    #[cfg(not(unix))]
    ctrl_c_or_pending().await;
}

async fn ctrl_c_or_pending() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("failed to listen for interrupt: error={e}");
        std::future::pending::<()>().await;
    }
}
