//! Tests for server runtime behaviour.

use std::{
    io,
    sync::{Arc, Mutex},
};

use rstest::rstest;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{Semaphore, oneshot},
    task::yield_now,
    time::{Duration, Instant, advance, sleep, timeout},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{AcceptLoopOptions, BackoffConfig, MockAcceptListener, accept_loop};
use crate::{
    config::ServerConfig,
    decode::Sequence,
    dtype::Dtype,
    server::{
        LiveSessions,
        connection::SessionContext,
        test_util::{bind_server, config_with_connections, free_listener, listener_addr},
    },
    session::{SessionId, SessionLimits},
    sink::ChannelSink,
};

fn options(permits: usize, token: &CancellationToken, tracker: &TaskTracker) -> AcceptLoopOptions {
    AcceptLoopOptions {
        permits: Arc::new(Semaphore::new(permits)),
        shutdown: token.clone(),
        tracker: tracker.clone(),
        backoff: BackoffConfig::default(),
        session: SessionContext {
            limits: SessionLimits::from(&ServerConfig::default()),
            sink: Arc::new(ChannelSink::new().0),
            sessions: Arc::new(LiveSessions::default()),
        },
    }
}

async fn wait_for_sessions(sessions: &LiveSessions, expected: usize) {
    timeout(Duration::from_secs(5), async {
        while sessions.len() != expected {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session count never reached expected value");
}

#[rstest]
#[tokio::test]
async fn run_with_immediate_shutdown(free_listener: std::net::TcpListener) {
    let (server, _rx) = bind_server(ServerConfig::default(), free_listener);
    let result = timeout(
        Duration::from_millis(1000),
        server.run_with_shutdown(sleep(Duration::from_millis(10))),
    )
    .await;
    assert!(result.expect("server did not finish in time").is_ok());
}

#[rstest]
#[tokio::test]
async fn ready_signal_fires_and_handle_stops_server(free_listener: std::net::TcpListener) {
    let (server, _rx) = bind_server(ServerConfig::default(), free_listener);
    let (ready_tx, ready_rx) = oneshot::channel();
    let server = server.ready_signal(ready_tx);
    let handle = server.shutdown_handle();
    let task = tokio::spawn(server.run_with_shutdown(std::future::pending()));

    ready_rx.await.expect("ready signal");
    handle.shutdown();
    timeout(Duration::from_secs(1), task)
        .await
        .expect("server did not stop in time")
        .expect("server join error")
        .expect("server run failed");
}

#[tokio::test]
async fn accept_loop_stops_on_cancel() {
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let listener = Arc::new(
        TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener"),
    );

    tracker.spawn(accept_loop(listener, options(1, &token, &tracker)));

    token.cancel();
    tracker.close();

    let result = timeout(Duration::from_millis(100), tracker.wait()).await;
    assert!(result.is_ok());
}

/// Creates a mock listener whose accepts always fail, logging each attempt.
fn failing_listener(calls: &Arc<Mutex<Vec<Instant>>>) -> MockAcceptListener {
    let mut listener = MockAcceptListener::new();
    let call_log = Arc::clone(calls);
    listener.expect_accept().returning(move || {
        let call_log = Arc::clone(&call_log);
        Box::pin(async move {
            call_log.lock().expect("lock").push(Instant::now());
            Err(io::Error::other("mock error"))
        })
    });
    listener
        .expect_local_addr()
        .returning(|| Ok("127.0.0.1:0".parse().expect("addr parse")));
    listener
}

#[tokio::test(start_paused = true)]
async fn accept_errors_back_off_exponentially() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(failing_listener(&calls));
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let mut opts = options(1, &token, &tracker);
    opts.backoff = BackoffConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    };

    tracker.spawn(accept_loop(listener, opts));
    yield_now().await;
    assert_eq!(calls.lock().expect("lock").len(), 1);

    for ms in [5, 10, 20, 20] {
        advance(Duration::from_millis(ms)).await;
        yield_now().await;
    }

    token.cancel();
    tracker.close();
    tracker.wait().await;

    let calls = calls.lock().expect("lock");
    let intervals: Vec<Duration> = calls
        .windows(2)
        .filter_map(|pair| match pair {
            [a, b] => b.checked_duration_since(*a),
            _ => None,
        })
        .collect();
    assert_eq!(
        intervals,
        [5, 10, 20, 20].map(Duration::from_millis).to_vec()
    );
}

#[tokio::test(start_paused = true)]
async fn failed_accepts_release_permits_and_consume_ids() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let listener = Arc::new(failing_listener(&calls));
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let opts = options(1, &token, &tracker);
    let permits = Arc::clone(&opts.permits);
    let first_id = SessionId::next();

    tracker.spawn(accept_loop(listener, opts));
    sleep(Duration::from_millis(100)).await;
    token.cancel();
    tracker.close();
    tracker.wait().await;

    let attempts = calls.lock().expect("lock").len();
    assert!(attempts >= 3, "only {attempts} accept attempts");
    assert_eq!(permits.available_permits(), 1);
    let attempts = u64::try_from(attempts).expect("attempt count fits u64");
    assert!(SessionId::next().as_u64() > first_id.as_u64() + attempts);
}

#[rstest]
#[tokio::test]
async fn permits_bound_concurrent_sessions(free_listener: std::net::TcpListener) {
    let addr = listener_addr(&free_listener);
    let (server, mut rx) = bind_server(config_with_connections(1), free_listener);
    let sessions = server.sessions();
    let handle = server.shutdown_handle();
    let task = tokio::spawn(server.run_with_shutdown(std::future::pending()));

    let mut first = TcpStream::connect(addr).await.expect("connect first");
    wait_for_sessions(&sessions, 1).await;
    let mut second = TcpStream::connect(addr).await.expect("connect second");
    sleep(Duration::from_millis(50)).await;
    assert_eq!(sessions.len(), 1);

    second.write_all(&[0, 0, 7]).await.expect("write second");
    sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err(), "second peer served before a permit freed");

    first.write_all(&[0, 10, 1, 2]).await.expect("write first");
    let received = [
        timeout(Duration::from_secs(5), rx.recv()).await.expect("first sequence"),
        timeout(Duration::from_secs(5), rx.recv()).await.expect("second sequence"),
    ];
    assert_eq!(
        received,
        [
            Some((Dtype::Uint8, Sequence::Uint8(vec![1, 2]))),
            Some((Dtype::Int8, Sequence::Int8(vec![7]))),
        ]
    );

    handle.shutdown();
    task.await
        .expect("server join error")
        .expect("server run failed");
}

#[rstest]
#[tokio::test]
async fn shutdown_force_closes_live_sessions(free_listener: std::net::TcpListener) {
    let addr = listener_addr(&free_listener);
    let (server, mut rx) = bind_server(config_with_connections(4), free_listener);
    let sessions = server.sessions();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.run_with_shutdown(async {
        let _ = stop_rx.await;
    }));

    let mut clients = Vec::new();
    for _ in 0..2 {
        let mut client = TcpStream::connect(addr).await.expect("connect");
        client.write_all(&[1, 2, 1, 0, 0, 0]).await.expect("write partial sequence");
        clients.push(client);
    }
    wait_for_sessions(&sessions, 2).await;

    let started = Instant::now();
    let _ = stop_tx.send(());
    timeout(Duration::from_secs(1), task)
        .await
        .expect("shutdown not prompt")
        .expect("server join error")
        .expect("server run failed");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(sessions.is_empty());

    for client in &mut clients {
        let mut buf = [0_u8; 8];
        let n = timeout(Duration::from_secs(1), client.read(&mut buf))
            .await
            .expect("read before timeout")
            .unwrap_or(0);
        assert_eq!(n, 0);
    }
    assert!(rx.try_recv().is_err(), "partial sequences must not be delivered");
    assert!(TcpStream::connect(addr).await.is_err(), "listener still open");
}

#[tokio::test]
async fn accepted_sessions_are_registered_until_closed() {
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();
    let listener = Arc::new(
        TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener"),
    );
    let addr = listener.local_addr().expect("listener addr");
    let opts = options(2, &token, &tracker);
    let sessions = Arc::clone(&opts.session.sessions);
    tracker.spawn(accept_loop(listener, opts));

    let mut clients = Vec::new();
    for _ in 0..2 {
        clients.push(TcpStream::connect(addr).await.expect("connect"));
    }
    wait_for_sessions(&sessions, 2).await;

    token.cancel();
    sessions.close_all();
    tracker.close();
    timeout(Duration::from_secs(1), tracker.wait())
        .await
        .expect("sessions drained");
    assert!(sessions.is_empty());
}
