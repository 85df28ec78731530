//! Builder methods for [`Server`].

use std::{sync::Arc, time::Duration};

use tokio::sync::oneshot;

use super::{BackoffConfig, LiveSessions, Server, ServerState, ShutdownHandle, Unbound};
use crate::{config::ServerConfig, sink::Sink};

mod binding;

/// Default time allowed for sessions to finish after shutdown is requested.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

impl Server<Unbound> {
    /// Create an unbound server delivering sequences to `sink`.
    #[must_use]
    pub fn new(config: ServerConfig, sink: impl Sink + 'static) -> Self {
        Self {
            config,
            sink: Arc::new(sink),
            payload_limit: None,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            backoff: BackoffConfig::default(),
            ready_tx: None,
            shutdown: ShutdownHandle::new(),
            sessions: Arc::new(LiveSessions::default()),
            state: Unbound,
        }
    }
}

impl<S> Server<S>
where
    S: ServerState,
{
    /// Cap the accumulated payload of each session at `bytes`.
    ///
    /// Sessions exceeding the cap abort with a protocol error. There is no
    /// cap by default.
    #[must_use]
    pub fn payload_limit(mut self, bytes: usize) -> Self {
        self.payload_limit = Some(bytes);
        self
    }

    /// Set how long shutdown waits for closed sessions to finish.
    #[must_use]
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Configure the pause applied after failed accepts.
    #[must_use]
    pub fn accept_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Configure a channel signalled once the accept loop is running.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// The configuration this server was built with.
    #[must_use]
    pub fn config(&self) -> &ServerConfig { &self.config }

    /// Handle that stops the server when triggered.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle { self.shutdown.clone() }

    /// Registry of sessions currently running on this server.
    #[must_use]
    pub fn sessions(&self) -> Arc<LiveSessions> { Arc::clone(&self.sessions) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::sink::ChannelSink;

    fn server() -> Server<Unbound> { Server::new(ServerConfig::default(), ChannelSink::new().0) }

    #[test]
    fn new_server_uses_defaults() {
        let server = server();
        assert_eq!(server.config(), &ServerConfig::default());
        assert_eq!(server.payload_limit, None);
        assert_eq!(server.drain_timeout, DEFAULT_DRAIN_TIMEOUT);
        assert!(server.sessions().is_empty());
        assert!(server.local_addr().is_none());
    }

    #[rstest]
    #[case(0)]
    #[case(16 * 1024 * 1024)]
    fn payload_limit_is_recorded(#[case] bytes: usize) {
        assert_eq!(server().payload_limit(bytes).payload_limit, Some(bytes));
    }

    #[test]
    fn shutdown_handles_are_shared() {
        let server = server();
        server.shutdown_handle().shutdown();
        assert!(server.shutdown_handle().is_shutdown());
    }
}
