//! Tokio-based TCP server receiving numeric sequences.
//!
//! `Server` owns the listening socket, bounds concurrent sessions with a
//! counting semaphore, and spawns one task per accepted connection. A
//! shutdown source closes the listener and force-closes every live session.

use std::{sync::Arc, time::Duration};

use tokio::{net::TcpListener, sync::oneshot};

use crate::{config::ServerConfig, sink::Sink};

/// TCP server driving reception sessions.
///
/// The server carries a typestate `S` indicating whether it is [`Unbound`]
/// (no listener yet) or [`Bound`]. New servers start `Unbound` and must be
/// bound with [`Server::bind`] or one of its variants before they can run.
///
/// # Examples
///
/// ```no_run
/// use numwire::{config::ServerConfig, server::Server, sink::StdoutSink};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), numwire::server::ServerError> {
/// let server = Server::new(ServerConfig::default(), StdoutSink::new()).bind()?;
/// server.run().await
/// # }
/// ```
pub struct Server<S = Unbound>
where
    S: ServerState,
{
    pub(crate) config: ServerConfig,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) payload_limit: Option<usize>,
    pub(crate) drain_timeout: Duration,
    pub(crate) backoff: BackoffConfig,
    /// Channel used to notify when the accept loop is running.
    ///
    /// A `oneshot::Sender` carries a single notification, so a fresh sender
    /// is needed for every run.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    pub(crate) shutdown: ShutdownHandle,
    pub(crate) sessions: Arc<LiveSessions>,
    pub(crate) state: S,
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
pub use config::DEFAULT_DRAIN_TIMEOUT;
mod connection;
pub mod error;
mod registry;
mod runtime;
mod shutdown;

pub use error::ServerError;
pub use registry::LiveSessions;
pub use runtime::BackoffConfig;
pub use shutdown::{ShutdownHandle, os_signal};

#[cfg(test)]
pub(crate) mod test_util;
