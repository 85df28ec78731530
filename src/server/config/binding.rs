//! Listener binding for [`Server`].

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::TcpListener;

use crate::server::{Bound, Server, ServerError, ServerState, Unbound};

impl<S> Server<S>
where
    S: ServerState,
{
    fn bind_to_listener(self, std_listener: StdTcpListener) -> Result<Server<Bound>, ServerError> {
        let Server {
            config,
            sink,
            payload_limit,
            drain_timeout,
            backoff,
            ready_tx,
            shutdown,
            sessions,
            ..
        } = self;

        std_listener
            .set_nonblocking(true)
            .map_err(ServerError::Bind)?;
        let tokio_listener = TcpListener::from_std(std_listener).map_err(ServerError::Bind)?;

        Ok(Server {
            config,
            sink,
            payload_limit,
            drain_timeout,
            backoff,
            ready_tx,
            shutdown,
            sessions,
            state: Bound {
                listener: Arc::new(tokio_listener),
            },
        })
    }
}

impl Server<Unbound> {
    /// Return `None` as the server is not bound.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }

    /// Bind to `localhost` on the configured port.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub fn bind(self) -> Result<Server<Bound>, ServerError> {
        let std_listener =
            StdTcpListener::bind(("localhost", self.config.port)).map_err(ServerError::Bind)?;
        self.bind_existing_listener(std_listener)
    }

    /// Bind to an explicit address, ignoring the configured port.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::{Ipv4Addr, SocketAddr};
    ///
    /// use numwire::{config::ServerConfig, server::Server, sink::StdoutSink};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let server = Server::new(ServerConfig::default(), StdoutSink::new())
    ///     .bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    ///     .expect("bind failed");
    /// assert!(server.local_addr().is_some());
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind_addr(self, addr: SocketAddr) -> Result<Server<Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.bind_existing_listener(std_listener)
    }

    /// Bind to an ephemeral loopback port.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if no port is available.
    pub fn bind_ephemeral(self) -> Result<Server<Bound>, ServerError> {
        self.bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    }

    /// Bind to an existing `StdTcpListener`.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if configuring the listener fails.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<Server<Bound>, ServerError> {
        self.bind_to_listener(std_listener)
    }
}

impl Server<Bound> {
    /// Returns the bound address, or `None` if retrieving it fails.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }
}
