//! Session-scoped error taxonomy.
//!
//! Every way a session can end abnormally is a [`SessionError`]. Each error
//! maps onto a coarse [`ErrorKind`] used for logging and metric labels.
//! Session errors are logged and absorbed at the session boundary; they
//! never reach the accept loop.

use std::{fmt, io, time::Duration};

use thiserror::Error;

use crate::{decode::DecodeError, frame::FrameError};

/// Coarse classification of session failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed frame or protocol limit exceeded.
    Protocol,
    /// Payload length is not a whole number of elements.
    Alignment,
    /// Unsupported element width.
    Size,
    /// Transport failure, peer close or forced close.
    Io,
    /// No frame arrived within the idle deadline.
    IdleTimeout,
    /// The overall session budget elapsed.
    OverallTimeout,
}

impl ErrorKind {
    /// Stable lower-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Protocol => "protocol",
            ErrorKind::Alignment => "alignment",
            ErrorKind::Size => "size",
            ErrorKind::Io => "io",
            ErrorKind::IdleTimeout => "idle_timeout",
            ErrorKind::OverallTimeout => "overall_timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Reasons a session aborts.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A frame could not be parsed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The accumulated payload outgrew the configured cap.
    #[error("payload exceeds limit of {limit} bytes")]
    PayloadLimit {
        /// Configured cap in bytes.
        limit: usize,
    },
    /// The accumulated payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Reading from or closing the stream failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// The peer closed its side before sending a terminal frame.
    #[error("peer closed the connection before the terminal frame")]
    PeerClosed,
    /// The server is shutting down and closed the connection.
    #[error("connection closed by server shutdown")]
    Shutdown,
    /// No frame arrived within the idle read deadline.
    #[error("no frame received within {0:?}")]
    IdleTimeout(Duration),
    /// The overall session deadline elapsed.
    #[error("session exceeded its {0:?} budget")]
    OverallTimeout(Duration),
}

impl SessionError {
    /// Classify this error.
    ///
    /// ```
    /// use numwire::{
    ///     error::{ErrorKind, SessionError},
    ///     frame::FrameError,
    /// };
    ///
    /// let err = SessionError::from(FrameError::InvalidDtype(42));
    /// assert_eq!(err.kind(), ErrorKind::Protocol);
    /// assert_eq!(SessionError::PeerClosed.kind(), ErrorKind::Io);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Frame(_) | SessionError::PayloadLimit { .. } => ErrorKind::Protocol,
            SessionError::Decode(DecodeError::Alignment { .. }) => ErrorKind::Alignment,
            SessionError::Decode(DecodeError::Size(_)) => ErrorKind::Size,
            SessionError::Io(_) | SessionError::PeerClosed | SessionError::Shutdown => {
                ErrorKind::Io
            }
            SessionError::IdleTimeout(_) => ErrorKind::IdleTimeout,
            SessionError::OverallTimeout(_) => ErrorKind::OverallTimeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SessionError::from(FrameError::MissingDtype), ErrorKind::Protocol)]
    #[case(SessionError::PayloadLimit { limit: 4 }, ErrorKind::Protocol)]
    #[case(
        SessionError::from(DecodeError::Alignment { len: 3, width: 16 }),
        ErrorKind::Alignment
    )]
    #[case(SessionError::from(DecodeError::Size(24)), ErrorKind::Size)]
    #[case(SessionError::from(io::Error::from(io::ErrorKind::ConnectionReset)), ErrorKind::Io)]
    #[case(SessionError::Shutdown, ErrorKind::Io)]
    #[case(SessionError::IdleTimeout(Duration::from_secs(5)), ErrorKind::IdleTimeout)]
    #[case(SessionError::OverallTimeout(Duration::from_secs(1)), ErrorKind::OverallTimeout)]
    fn errors_map_to_kinds(#[case] err: SessionError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn frame_errors_keep_their_message() {
        let err = SessionError::from(FrameError::InvalidDtype(42));
        assert_eq!(err.to_string(), "invalid dtype code: 42");
    }
}
