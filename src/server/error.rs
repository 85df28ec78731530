//! Errors raised by [`Server`](super::Server) operations.

use std::io;

use thiserror::Error;
use tokio::task::JoinError;

/// Errors that may occur while binding or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or configuring the listener failed.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),
    /// The accept loop task panicked or was aborted.
    #[error("accept loop failed: {0}")]
    AcceptLoop(#[from] JoinError),
}
