//! Command line interface for the receiver binary.
//!
//! Also compiled by `build.rs` to render the manual page, so this module
//! depends only on `clap` and `std`.

use std::{
    net::SocketAddr,
    num::{NonZeroU64, NonZeroUsize},
};

use clap::Parser;

/// Command line arguments for the `numwire` binary.
#[derive(Debug, Parser)]
#[command(
    name = "numwire",
    version,
    about = "Receive framed numeric sequences over TCP and print them"
)]
pub struct Cli {
    /// Maximum number of sessions served at once.
    #[arg(long, default_value = "1")]
    pub max_connections: NonZeroUsize,

    /// Overall time budget of one session, in seconds.
    #[arg(long, default_value = "1000")]
    pub max_connection_seconds: NonZeroU64,

    /// Longest wait for the next frame, in seconds.
    #[arg(long, default_value = "5")]
    pub max_read_wait_seconds: NonZeroU64,

    /// Read buffer size in kibibytes; also the largest frame accepted.
    #[arg(long, default_value = "1")]
    pub buffer_size_kb: NonZeroUsize,

    /// TCP port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Reject sessions whose accumulated payload exceeds this many bytes.
    #[arg(long)]
    pub payload_limit: Option<usize>,

    /// Serve Prometheus metrics on this address.
    #[arg(long)]
    pub metrics_listen: Option<SocketAddr>,
}
