//! A server running on a loopback port, plus paced raw-frame helpers.

use std::{
    net::SocketAddr,
    num::{NonZeroU64, NonZeroUsize},
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use numwire::{
    ServerConfig,
    client::send_frames,
    decode::Sequence,
    dtype::Dtype,
    server::{LiveSessions, Server, ServerError, ShutdownHandle, Unbound},
    sink::ChannelSink,
};
use rstest::fixture;
use tokio::{
    io::AsyncReadExt,
    net::TcpStream,
    sync::{mpsc::UnboundedReceiver, oneshot},
    task::JoinHandle,
    time::{sleep, timeout},
};

/// Configuration with short timeouts suited to tests.
///
/// Four permits, a 1 second idle wait, and a 10 second session budget.
#[fixture]
pub fn fast_config() -> ServerConfig {
    ServerConfig {
        max_connections: NonZeroUsize::new(4).expect("non-zero"),
        max_connection_seconds: NonZeroU64::new(10).expect("non-zero"),
        max_read_wait_seconds: NonZeroU64::new(1).expect("non-zero"),
        ..ServerConfig::default()
    }
}

/// A running server bound to an ephemeral loopback port.
pub struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    sessions: Arc<LiveSessions>,
    received: UnboundedReceiver<(Dtype, Sequence)>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Start a server with `config` and wait until it accepts connections.
    pub async fn spawn(config: ServerConfig) -> Self { Self::spawn_with(config, |s| s).await }

    /// Start a server after applying `configure` to the unbound builder.
    pub async fn spawn_with<F>(config: ServerConfig, configure: F) -> Self
    where
        F: FnOnce(Server<Unbound>) -> Server<Unbound>,
    {
        let (sink, received) = ChannelSink::new();
        let (ready_tx, ready_rx) = oneshot::channel();
        let server = configure(Server::new(config, sink))
            .drain_timeout(Duration::from_secs(2))
            .ready_signal(ready_tx)
            .bind_ephemeral()
            .expect("bind ephemeral port");
        let addr = server.local_addr().expect("bound address");
        let shutdown = server.shutdown_handle();
        let sessions = server.sessions();
        let task = tokio::spawn(server.run_with_shutdown(std::future::pending()));
        ready_rx.await.expect("server ready");
        Self {
            addr,
            shutdown,
            sessions,
            received,
            task,
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Registry of the server's live sessions.
    #[must_use]
    pub fn sessions(&self) -> &LiveSessions { &self.sessions }

    /// Open a new connection to the server.
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.expect("connect to test server")
    }

    /// Wait up to `wait` for the next delivered sequence.
    pub async fn next_sequence(&mut self, wait: Duration) -> Option<(Dtype, Sequence)> {
        timeout(wait, self.received.recv()).await.ok().flatten()
    }

    /// Return a delivered sequence if one is already queued.
    pub fn try_next_sequence(&mut self) -> Option<(Dtype, Sequence)> {
        self.received.try_recv().ok()
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.shutdown();
        timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server stopped in time")
            .expect("server task joined")
            .expect("server run succeeded");
    }
}

/// Write each of `frames` as a separate segment, pausing in between.
pub async fn send_raw_frames(stream: &mut TcpStream, frames: &[&[u8]], pause: Duration) {
    let frames: Vec<Bytes> = frames.iter().map(|f| Bytes::copy_from_slice(f)).collect();
    send_frames(stream, &frames, pause)
        .await
        .expect("send raw frames");
}

/// Read until the server closes `stream`, failing after `wait`.
///
/// Returns `true` if the peer closed or reset the connection.
pub async fn read_until_closed(stream: &mut TcpStream, wait: Duration) -> bool {
    let mut buf = [0_u8; 64];
    timeout(wait, async {
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    })
    .await
    .is_ok()
}

/// Poll `sessions` until it holds `expected` entries or `wait` elapses.
pub async fn wait_for_sessions(sessions: &LiveSessions, expected: usize, wait: Duration) -> bool {
    timeout(wait, async {
        while sessions.len() != expected {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
