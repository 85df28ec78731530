//! Per-connection reception sessions.
//!
//! A [`Session`] owns one byte stream and drives it through the reception
//! state machine: every read is one frame, payloads accumulate until a
//! terminal frame, and the result is decoded and handed to a [`Sink`].
//! Two deadlines bound the session: an overall budget armed once at start
//! and an idle deadline re-armed before every read. A cancellation token
//! lets the server force the session closed during shutdown.

mod assembler;

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

pub use assembler::{AssembledPayload, PayloadAssembler, Progress};
use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    select,
    time::{Instant, sleep_until},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{config::ServerConfig, dtype::Dtype, error::SessionError, metrics, sink::Sink};

/// Source of session identifiers shared by every server in the process.
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Identifier assigned to an accept attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a [`SessionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Draw the next identifier from the process-wide counter.
    ///
    /// Identifiers increase monotonically across all servers in the process.
    #[must_use]
    pub fn next() -> Self { Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Resource limits applied to a single session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    /// Overall budget measured from session start.
    pub connection_budget: Duration,
    /// Maximum wait for each frame.
    pub read_wait: Duration,
    /// Size of the read buffer, and therefore the largest possible frame.
    pub buffer_len: usize,
    /// Optional cap on the accumulated payload in bytes.
    pub payload_limit: Option<usize>,
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            connection_budget: config.connection_budget(),
            read_wait: config.read_wait(),
            buffer_len: config.buffer_len(),
            payload_limit: None,
        }
    }
}

/// Summary of a session that delivered its sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// Identifier of the session.
    pub id: SessionId,
    /// Element type of the decoded sequence.
    pub dtype: Dtype,
    /// Frames received, including the terminal frame.
    pub frames: usize,
    /// Elements decoded.
    pub elements: usize,
}

/// A single connection being driven through the reception state machine.
pub struct Session<S> {
    id: SessionId,
    stream: S,
    limits: SessionLimits,
    close: CancellationToken,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Create a session over `stream`.
    ///
    /// Cancelling `close` aborts any pending read and ends the session.
    #[must_use]
    pub fn new(id: SessionId, stream: S, limits: SessionLimits, close: CancellationToken) -> Self {
        Self {
            id,
            stream,
            limits,
            close,
        }
    }

    /// Identifier of this session.
    #[must_use]
    pub fn id(&self) -> SessionId { self.id }

    /// Receive, decode and deliver one sequence, then close the stream.
    ///
    /// The outcome is logged before returning. Sink failures are logged and
    /// do not fail the session.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that aborted the session. No sequence is
    /// delivered in that case.
    pub async fn run(mut self, sink: &dyn Sink) -> Result<SessionReport, SessionError> {
        let overall_deadline = Instant::now() + self.limits.connection_budget;
        let outcome = match self.receive(overall_deadline).await {
            Ok(assembled) => deliver(self.id, assembled, sink).await,
            Err(e) => Err(e),
        };
        self.close_stream().await;

        match &outcome {
            Ok(report) => info!(
                session_id = %self.id,
                dtype = %report.dtype,
                frames = report.frames,
                elements = report.elements,
                "session completed"
            ),
            Err(e) => {
                metrics::inc_session_errors(e.kind());
                warn!(session_id = %self.id, kind = %e.kind(), error = %e, "session aborted");
            }
        }
        outcome
    }

    async fn receive(&mut self, overall_deadline: Instant) -> Result<AssembledPayload, SessionError> {
        let mut buffer = vec![0_u8; self.limits.buffer_len];
        let mut assembler = PayloadAssembler::new(
            self.limits.buffer_len.saturating_mul(10),
            self.limits.payload_limit,
        );

        loop {
            let n = self.read_frame(&mut buffer, overall_deadline).await?;
            // The read buffer is reused; never let a frame alias it.
            let frame = Bytes::copy_from_slice(&buffer[..n]);
            metrics::inc_frames();

            match assembler.accept_frame(&frame)? {
                Progress::Incomplete => trace!(
                    session_id = %self.id,
                    frame_len = n,
                    buffered = assembler.buffered_len(),
                    "awaiting next frame"
                ),
                Progress::Complete(assembled) => return Ok(assembled),
            }
        }
    }

    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    async fn read_frame(
        &mut self,
        buffer: &mut [u8],
        overall_deadline: Instant,
    ) -> Result<usize, SessionError> {
        let SessionLimits {
            connection_budget,
            read_wait,
            ..
        } = self.limits;
        let idle_deadline = Instant::now() + read_wait;

        select! {
            biased;

            () = self.close.cancelled() => Err(SessionError::Shutdown),
            () = sleep_until(overall_deadline) => Err(SessionError::OverallTimeout(connection_budget)),
            () = sleep_until(idle_deadline) => Err(SessionError::IdleTimeout(read_wait)),
            read = self.stream.read(buffer) => match read? {
                0 => Err(SessionError::PeerClosed),
                n => Ok(n),
            },
        }
    }

    async fn close_stream(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(session_id = %self.id, error = %e, "stream shutdown failed");
        }
    }
}

async fn deliver(
    id: SessionId,
    assembled: AssembledPayload,
    sink: &dyn Sink,
) -> Result<SessionReport, SessionError> {
    let values = assembled.decode()?;
    let report = SessionReport {
        id,
        dtype: assembled.dtype,
        frames: assembled.frames,
        elements: values.len(),
    };
    metrics::inc_sequences(assembled.dtype);
    if let Err(e) = sink.emit(assembled.dtype, values).await {
        warn!(session_id = %id, error = %e, "sink rejected sequence");
    }
    Ok(report)
}
