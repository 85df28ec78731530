//! Utilities for driving a `numwire` server over real sockets in tests.
//!
//! [`TestServer`] runs a server on an ephemeral loopback port with a
//! channel sink, so tests can send raw frames and assert on the decoded
//! sequences.
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use numwire::{Dtype, Sequence};
//! use numwire_testing::{TestServer, fast_config, send_raw_frames};
//!
//! # async fn example() {
//! let mut server = TestServer::spawn(fast_config()).await;
//! let mut stream = server.connect().await;
//! send_raw_frames(&mut stream, &[&[0, 10, 1, 2]], Duration::ZERO).await;
//! assert_eq!(
//!     server.next_sequence(Duration::from_secs(1)).await,
//!     Some((Dtype::Uint8, Sequence::Uint8(vec![1, 2])))
//! );
//! server.stop().await;
//! # }
//! ```

pub mod logging;
pub mod server;

pub use logging::{LoggerHandle, logger};
pub use server::{
    TestServer,
    fast_config,
    read_until_closed,
    send_raw_frames,
    wait_for_sessions,
};
