//! Session task spawning for [`Server`](super::Server).

use std::{any::Any, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::{net::TcpStream, sync::OwnedSemaphorePermit};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Instrument, error, info_span};

use super::LiveSessions;
use crate::{
    metrics,
    session::{Session, SessionId, SessionLimits},
    sink::Sink,
};

/// State shared by every session a server spawns.
#[derive(Clone)]
pub(super) struct SessionContext {
    pub limits: SessionLimits,
    pub sink: Arc<dyn Sink>,
    pub sessions: Arc<LiveSessions>,
}

/// Registration of one live session.
///
/// Dropping the guard removes the session from the registry and then
/// releases its concurrency permit, so teardown happens exactly once on
/// every exit path, panics included.
struct SessionGuard {
    id: SessionId,
    sessions: Arc<LiveSessions>,
    _permit: OwnedSemaphorePermit,
}

impl SessionGuard {
    fn register(
        id: SessionId,
        close: CancellationToken,
        sessions: Arc<LiveSessions>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        sessions.insert(id, close);
        metrics::inc_sessions();
        Self {
            id,
            sessions,
            _permit: permit,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
        metrics::dec_sessions();
    }
}

/// Spawn a task driving one accepted connection, logging and discarding any panics.
pub(super) fn spawn_session_task(
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: SessionId,
    permit: OwnedSemaphorePermit,
    context: &SessionContext,
    tracker: &TaskTracker,
) {
    let close = CancellationToken::new();
    let guard = SessionGuard::register(id, close.clone(), Arc::clone(&context.sessions), permit);
    let session = Session::new(id, stream, context.limits, close);
    let sink = Arc::clone(&context.sink);
    let span = info_span!("session", session_id = %id, %peer_addr);

    tracker.spawn(
        async move {
            let _guard = guard;
            let fut = AssertUnwindSafe(session.run(sink.as_ref())).catch_unwind();
            if let Err(panic) = fut.await {
                let panic_msg = panic_message(panic.as_ref());
                error!(panic = %panic_msg, session_id = %id, %peer_addr, "session task panicked");
            }
        }
        .instrument(span),
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else {
        format!("{payload:?}")
    }
}
