//! Test helpers shared across server modules.

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    num::{NonZeroU64, NonZeroUsize},
    time::Duration,
};

use rstest::fixture;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{Bound, Server};
use crate::{config::ServerConfig, decode::Sequence, dtype::Dtype, sink::ChannelSink};

pub type Received = UnboundedReceiver<(Dtype, Sequence)>;

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free loopback port.
///
/// Keeping the listener bound prevents another process from claiming the
/// port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

#[must_use]
pub fn listener_addr(listener: &StdTcpListener) -> SocketAddr {
    listener
        .local_addr()
        .expect("failed to get listener address")
}

/// Configuration with `max_connections` permits and a long idle wait.
#[must_use]
pub fn config_with_connections(max_connections: usize) -> ServerConfig {
    ServerConfig {
        max_connections: NonZeroUsize::new(max_connections).expect("non-zero connections"),
        max_read_wait_seconds: NonZeroU64::new(60).expect("non-zero wait"),
        ..ServerConfig::default()
    }
}

/// Bind a server delivering to a channel, with a short drain timeout.
pub fn bind_server(config: ServerConfig, listener: StdTcpListener) -> (Server<Bound>, Received) {
    let (sink, rx) = ChannelSink::new();
    let server = Server::new(config, sink)
        .drain_timeout(Duration::from_secs(2))
        .bind_existing_listener(listener)
        .expect("Failed to bind");
    (server, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_addr_is_loopback() {
        let listener = free_listener();
        assert_eq!(
            listener_addr(&listener).ip(),
            std::net::IpAddr::from(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn config_with_connections_sets_permits() {
        assert_eq!(config_with_connections(3).max_connections.get(), 3);
    }
}
