//! Server configuration record.
//!
//! [`ServerConfig`] is an immutable value describing connection limits and
//! the listening port. Positive quantities use `NonZero*` types so invalid
//! configurations cannot be expressed.

use std::{
    num::{NonZeroU64, NonZeroUsize},
    time::Duration,
};

/// Bytes per kibibyte of read buffer.
const KIB: usize = 1024;

/// Limits and port for a [`crate::server::Server`].
///
/// # Examples
///
/// ```
/// use std::{num::NonZeroUsize, time::Duration};
///
/// use numwire::config::ServerConfig;
///
/// let config = ServerConfig {
///     max_connections: NonZeroUsize::new(4).expect("non-zero"),
///     ..ServerConfig::default()
/// };
/// assert_eq!(config.read_wait(), Duration::from_secs(5));
/// assert_eq!(config.buffer_len(), 1024);
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Upper bound on concurrently live sessions.
    pub max_connections: NonZeroUsize,
    /// Overall budget for a single session, in seconds.
    pub max_connection_seconds: NonZeroU64,
    /// Idle read timeout between frames, in seconds.
    pub max_read_wait_seconds: NonZeroU64,
    /// Per-session read buffer size, in kibibytes.
    pub buffer_size_kb: NonZeroUsize,
    /// TCP port to listen on.
    pub port: u16,
}

impl ServerConfig {
    /// Default concurrent session limit.
    pub const DEFAULT_MAX_CONNECTIONS: NonZeroUsize = NonZeroUsize::MIN;
    /// Default overall session budget.
    pub const DEFAULT_MAX_CONNECTION_SECONDS: NonZeroU64 = NonZeroU64::new(1000).unwrap();
    /// Default idle read timeout.
    pub const DEFAULT_MAX_READ_WAIT_SECONDS: NonZeroU64 = NonZeroU64::new(5).unwrap();
    /// Default read buffer size.
    pub const DEFAULT_BUFFER_SIZE_KB: NonZeroUsize = NonZeroUsize::MIN;
    /// Default listening port.
    pub const DEFAULT_PORT: u16 = 8080;

    /// Overall session budget as a [`Duration`].
    #[must_use]
    pub fn connection_budget(&self) -> Duration {
        Duration::from_secs(self.max_connection_seconds.get())
    }

    /// Idle read timeout as a [`Duration`].
    #[must_use]
    pub fn read_wait(&self) -> Duration { Duration::from_secs(self.max_read_wait_seconds.get()) }

    /// Read buffer size in bytes.
    #[must_use]
    pub fn buffer_len(&self) -> usize { self.buffer_size_kb.get().saturating_mul(KIB) }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            max_connection_seconds: Self::DEFAULT_MAX_CONNECTION_SECONDS,
            max_read_wait_seconds: Self::DEFAULT_MAX_READ_WAIT_SECONDS,
            buffer_size_kb: Self::DEFAULT_BUFFER_SIZE_KB,
            port: Self::DEFAULT_PORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections.get(), 1);
        assert_eq!(config.max_connection_seconds.get(), 1000);
        assert_eq!(config.max_read_wait_seconds.get(), 5);
        assert_eq!(config.buffer_size_kb.get(), 1);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn derived_views_scale_units() {
        let config = ServerConfig {
            max_connection_seconds: NonZeroU64::new(30).expect("non-zero"),
            buffer_size_kb: NonZeroUsize::new(4).expect("non-zero"),
            ..ServerConfig::default()
        };
        assert_eq!(config.connection_budget(), Duration::from_secs(30));
        assert_eq!(config.buffer_len(), 4096);
    }
}
