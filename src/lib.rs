#![doc(html_root_url = "https://docs.rs/numwire/latest")]
//! Receiver for framed numeric sequences over TCP.
//!
//! A peer sends one typed sequence per connection as a run of frames. The
//! first frame names the element type, a continuation byte on every frame
//! marks whether more follow, and the concatenated little-endian payload is
//! decoded and handed to a [`sink::Sink`] once the final frame arrives.
//!
//! The crate is layered bottom-up: [`frame`] parses single frames,
//! [`decode`] turns payloads into [`decode::Sequence`] values, [`session`]
//! drives one connection, and [`server`] accepts connections under a
//! concurrency limit with coordinated shutdown.

pub mod client;
pub mod config;
pub mod decode;
pub mod dtype;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod server;
pub mod session;
pub mod sink;

pub use config::ServerConfig;
pub use decode::{DecodeError, Sequence, decode};
pub use dtype::Dtype;
pub use error::{ErrorKind, SessionError};
pub use frame::{FrameError, parse_frame};
pub use server::{Server, ServerError, ShutdownHandle};
pub use session::{SessionId, SessionReport};
pub use sink::{ChannelSink, Sink, StdoutSink};
