//! Frame parsing for the continuation-byte protocol.
//!
//! Every frame starts with a continuation byte; only the value `1` means
//! more frames follow. The first frame of a session additionally carries the
//! dtype descriptor in byte 1. All remaining bytes are payload.

use thiserror::Error;

use crate::dtype::Dtype;

/// Offset of the payload within the first frame of a session.
pub const FIRST_PAYLOAD_OFFSET: usize = 2;
/// Offset of the payload within every later frame.
pub const NEXT_PAYLOAD_OFFSET: usize = 1;

/// Byte value asserting that more frames follow.
pub const CONTINUE: u8 = 1;
/// Conventional byte value marking the terminal frame.
pub const STOP: u8 = 0;

/// Malformed frame errors. All of them are protocol violations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A read produced no bytes to inspect.
    #[error("empty frame")]
    Empty,
    /// The first frame ended before the dtype descriptor.
    #[error("first frame is missing the dtype descriptor")]
    MissingDtype,
    /// The dtype byte is not one of the ten valid codes.
    #[error("invalid dtype code: {0}")]
    InvalidDtype(u8),
}

/// Result of inspecting a single frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    /// `true` when more frames follow.
    pub continuation: bool,
    /// Descriptor decoded from the first frame; `None` for later frames.
    pub dtype: Option<Dtype>,
    /// Index of the first payload byte within the frame.
    pub payload_offset: usize,
    /// Payload bytes of this frame; may be empty.
    pub payload: &'a [u8],
}

/// Inspect `chunk` and locate its payload.
///
/// Any continuation byte other than `1` is read as "stop" rather than
/// rejected.
///
/// # Errors
///
/// Returns [`FrameError::Empty`] for an empty chunk and, when `is_first` is
/// set, [`FrameError::MissingDtype`] or [`FrameError::InvalidDtype`] if the
/// descriptor is absent or unknown.
///
/// # Examples
///
/// ```
/// use numwire::{dtype::Dtype, frame::parse_frame};
///
/// let frame = parse_frame(&[1, 11, 0x2c, 0x01], true).expect("valid first frame");
/// assert!(frame.continuation);
/// assert_eq!(frame.dtype, Some(Dtype::Uint16));
/// assert_eq!(frame.payload, &[0x2c, 0x01]);
/// ```
pub fn parse_frame(chunk: &[u8], is_first: bool) -> Result<ParsedFrame<'_>, FrameError> {
    let Some(&head) = chunk.first() else {
        return Err(FrameError::Empty);
    };
    let continuation = head == CONTINUE;

    let (dtype, payload_offset) = if is_first {
        let code = *chunk.get(1).ok_or(FrameError::MissingDtype)?;
        let dtype = Dtype::try_from(code).map_err(|_| FrameError::InvalidDtype(code))?;
        (Some(dtype), FIRST_PAYLOAD_OFFSET)
    } else {
        (None, NEXT_PAYLOAD_OFFSET)
    };

    Ok(ParsedFrame {
        continuation,
        dtype,
        payload_offset,
        payload: &chunk[payload_offset..],
    })
}
