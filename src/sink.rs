//! Destinations for decoded sequences.
//!
//! A session hands every completed `(dtype, sequence)` pair to a [`Sink`].
//! Sink failures are logged by the session and otherwise ignored.

use std::io;

use async_trait::async_trait;
use tokio::{
    io::AsyncWriteExt,
    sync::{Mutex, mpsc},
};

use crate::{decode::Sequence, dtype::Dtype};

/// Consumer of decoded sequences.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one decoded sequence.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the sequence could not be delivered.
    async fn emit(&self, dtype: Dtype, values: Sequence) -> io::Result<()>;
}

/// Writes each sequence as one human-readable line on standard output.
///
/// Lines look like `int8 [1, 2, 4, 7, 9]`.
#[derive(Debug, Default)]
pub struct StdoutSink {
    // Serialises concurrent sessions so lines never interleave.
    out: Mutex<()>,
}

impl StdoutSink {
    /// Create a sink writing to the process's standard output.
    #[must_use]
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn emit(&self, dtype: Dtype, values: Sequence) -> io::Result<()> {
        let line = format!("{dtype} {values}\n");
        let _guard = self.out.lock().await;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(line.as_bytes()).await?;
        stdout.flush().await
    }
}

/// Forwards each sequence over an unbounded channel.
///
/// # Examples
///
/// ```
/// use numwire::{
///     decode::Sequence,
///     dtype::Dtype,
///     sink::{ChannelSink, Sink},
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (sink, mut rx) = ChannelSink::new();
/// sink.emit(Dtype::Int8, Sequence::Int8(vec![1, 2]))
///     .await
///     .expect("receiver alive");
/// assert_eq!(rx.recv().await, Some((Dtype::Int8, Sequence::Int8(vec![1, 2]))));
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(Dtype, Sequence)>,
}

impl ChannelSink {
    /// Create a sink and the receiver observing it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(Dtype, Sequence)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn emit(&self, dtype: Dtype, values: Sequence) -> io::Result<()> {
        self.tx
            .send((dtype, values))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "sink receiver dropped"))
    }
}
