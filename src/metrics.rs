//! Metric helpers for `numwire`.
//!
//! This module defines metric names and thin wrappers around the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::{dtype::Dtype, error::ErrorKind};

/// Name of the gauge tracking live sessions.
pub const SESSIONS_ACTIVE: &str = "numwire_sessions_active";
/// Name of the counter tracking received frames.
pub const FRAMES_RECEIVED: &str = "numwire_frames_received_total";
/// Name of the counter tracking decoded sequences, labelled by `dtype`.
pub const SEQUENCES_DECODED: &str = "numwire_sequences_decoded_total";
/// Name of the counter tracking aborted sessions, labelled by `kind`.
pub const SESSION_ERRORS: &str = "numwire_session_errors_total";

/// Increment the live sessions gauge.
pub fn inc_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_ACTIVE).increment(1.0);
}

/// Decrement the live sessions gauge.
pub fn dec_sessions() {
    #[cfg(feature = "metrics")]
    gauge!(SESSIONS_ACTIVE).decrement(1.0);
}

/// Record a received frame.
pub fn inc_frames() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_RECEIVED).increment(1);
}

/// Record a decoded sequence.
pub fn inc_sequences(dtype: Dtype) {
    #[cfg(feature = "metrics")]
    counter!(SEQUENCES_DECODED, "dtype" => dtype.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = dtype;
}

/// Record an aborted session.
pub fn inc_session_errors(kind: ErrorKind) {
    #[cfg(feature = "metrics")]
    counter!(SESSION_ERRORS, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
