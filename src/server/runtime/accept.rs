//! Permit-gated accept loop.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use log::{info, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    sync::Semaphore,
    time::{Duration, sleep},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::backoff::BackoffConfig;
use crate::{
    server::connection::{SessionContext, spawn_session_task},
    session::SessionId,
};

/// Source of incoming connections consumed by the accept loop.
///
/// Dropping a pending `accept()` future must not leak resources.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(in crate::server) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

pub(in crate::server) struct AcceptLoopOptions {
    /// One permit per concurrently running session.
    pub permits: Arc<Semaphore>,
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
    pub session: SessionContext,
}

/// Accept connections until `shutdown` is cancelled.
///
/// A permit is acquired before each accept, so at most
/// `permits.available_permits()` sessions run at once and further peers
/// wait in the listen backlog. Every accept attempt consumes a fresh
/// [`SessionId`]. Failed accepts release their permit and pause with
/// exponential back-off.
pub(in crate::server) async fn accept_loop<L>(listener: Arc<L>, options: AcceptLoopOptions)
where
    L: AcceptListener + 'static,
{
    let backoff = options.backoff.normalized();
    let mut delay = backoff.initial_delay;
    while let Some(next_delay) = accept_iteration(listener.as_ref(), &options, &backoff, delay).await
    {
        delay = next_delay;
    }
}

#[expect(
    clippy::integer_division_remainder_used,
    reason = "tokio::select! expands to modulus internally"
)]
async fn accept_iteration<L>(
    listener: &L,
    options: &AcceptLoopOptions,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    L: AcceptListener,
{
    let permit = select! {
        biased;

        () = options.shutdown.cancelled() => return None,
        permit = Arc::clone(&options.permits).acquire_owned() => permit.ok()?,
    };

    let accepted = select! {
        biased;

        () = options.shutdown.cancelled() => return None,
        res = listener.accept() => res,
    };

    let id = SessionId::next();
    match accepted {
        Ok((stream, peer_addr)) => {
            info!("connection established: session_id={id}, peer_addr={peer_addr}");
            spawn_session_task(
                stream,
                peer_addr,
                id,
                permit,
                &options.session,
                &options.tracker,
            );
            Some(backoff.initial_delay)
        }
        Err(e) => {
            drop(permit);
            let local_addr = listener.local_addr().ok();
            warn!("accept error: session_id={id}, error={e:?}, local_addr={local_addr:?}");
            select! {
                biased;

                () = options.shutdown.cancelled() => None,
                () = sleep(delay) => Some(backoff.next_delay(delay)),
            }
        }
    }
}
