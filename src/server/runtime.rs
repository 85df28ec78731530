//! Runtime control for [`Server`].

mod accept;
mod backoff;
#[cfg(test)]
mod tests;

use std::sync::Arc;

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use log::{info, warn};
use tokio::{select, sync::Semaphore, time::timeout};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, Server, ServerError, connection::SessionContext, os_signal};
use crate::session::SessionLimits;

impl Server<Bound> {
    /// Run the server until SIGINT or SIGTERM arrives, or until its
    /// [`ShutdownHandle`](super::ShutdownHandle) is triggered.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AcceptLoop`] if the accept loop panicked.
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors.
    pub async fn run(self) -> Result<(), ServerError> { self.run_with_shutdown(os_signal()).await }

    /// Run the server until `signal` resolves or the shutdown handle fires.
    ///
    /// Shutdown stops the accept loop and drops the listener, force-closes
    /// every live session, then waits up to the drain timeout for session
    /// tasks to finish.
    ///
    /// # Examples
    ///
    /// ```
    /// use numwire::{config::ServerConfig, server::Server, sink::StdoutSink};
    /// use tokio::sync::oneshot;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), numwire::server::ServerError> {
    /// let server = Server::new(ServerConfig::default(), StdoutSink::new()).bind_ephemeral()?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(server.run_with_shutdown(async {
    ///     let _ = rx.await;
    /// }));
    ///
    /// let _ = tx.send(());
    /// handle.await.expect("join server task")?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AcceptLoop`] if the accept loop panicked.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let Server {
            config,
            sink,
            payload_limit,
            drain_timeout,
            backoff,
            ready_tx,
            shutdown,
            sessions,
            state: Bound { listener },
        } = self;

        let local_addr = listener.local_addr().ok();
        let max_connections = config.max_connections.get().min(Semaphore::MAX_PERMITS);
        let accept_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let session = SessionContext {
            limits: SessionLimits {
                payload_limit,
                ..SessionLimits::from(&config)
            },
            sink,
            sessions: Arc::clone(&sessions),
        };

        let accept = tokio::spawn(accept_loop(
            listener,
            AcceptLoopOptions {
                permits: Arc::new(Semaphore::new(max_connections)),
                shutdown: accept_token.clone(),
                tracker: tracker.clone(),
                backoff,
                session,
            },
        ));
        info!("server listening: local_addr={local_addr:?}, max_connections={max_connections}");

        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        select! {
            () = signal => info!("shutdown signal received"),
            () = shutdown.requested() => info!("shutdown requested"),
        }

        accept_token.cancel();
        let accept_result = accept.await;
        let closed = sessions.close_all();
        info!("listener closed: live_sessions={closed}");

        tracker.close();
        if timeout(drain_timeout, tracker.wait()).await.is_err() {
            warn!(
                "drain timeout elapsed: remaining_sessions={}, drain_timeout={drain_timeout:?}",
                sessions.len()
            );
        }

        accept_result?;
        info!("server stopped");
        Ok(())
    }
}
