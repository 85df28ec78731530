//! Reception state machine for a single session.
//!
//! [`PayloadAssembler`] consumes frames in arrival order, records the dtype
//! from the first frame, and concatenates payloads until a terminal frame
//! arrives. It performs no I/O, so every protocol rule can be exercised
//! without a socket.

use bytes::{Bytes, BytesMut};

use crate::{
    decode::{DecodeError, Sequence, decode},
    dtype::Dtype,
    error::SessionError,
    frame::{FrameError, parse_frame},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    AwaitFirst,
    AwaitNext(Dtype),
}

/// Outcome of feeding one frame to a [`PayloadAssembler`].
#[derive(Debug, PartialEq)]
pub enum Progress {
    /// More frames are expected.
    Incomplete,
    /// A terminal frame completed the payload.
    Complete(AssembledPayload),
}

/// A complete payload awaiting decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledPayload {
    /// Descriptor recorded from the first frame.
    pub dtype: Dtype,
    /// Concatenated payload bytes in arrival order.
    pub payload: Bytes,
    /// Number of frames that contributed to the payload.
    pub frames: usize,
}

impl AssembledPayload {
    /// Decode the payload into a typed sequence.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the payload is not a whole number of
    /// elements.
    pub fn decode(&self) -> Result<Sequence, DecodeError> { decode(&self.payload, self.dtype) }
}

/// Accumulates frames until a terminal frame arrives.
///
/// # Examples
///
/// ```
/// use numwire::{
///     decode::Sequence,
///     session::{PayloadAssembler, Progress},
/// };
///
/// let mut assembler = PayloadAssembler::new(64, None);
/// assert_eq!(
///     assembler.accept_frame(&[1, 0, 1, 2]).expect("first frame"),
///     Progress::Incomplete
/// );
/// let Progress::Complete(payload) = assembler.accept_frame(&[0, 3]).expect("terminal frame")
/// else {
///     panic!("terminal frame completes the payload");
/// };
/// assert_eq!(payload.decode(), Ok(Sequence::Int8(vec![1, 2, 3])));
/// ```
#[derive(Debug)]
pub struct PayloadAssembler {
    state: State,
    payload: BytesMut,
    frames: usize,
    limit: Option<usize>,
}

impl PayloadAssembler {
    /// Create an assembler.
    ///
    /// `capacity_hint` pre-sizes the accumulator; it is not a bound.
    /// `limit`, when set, caps the accumulated payload in bytes.
    #[must_use]
    pub fn new(capacity_hint: usize, limit: Option<usize>) -> Self {
        Self {
            state: State::AwaitFirst,
            payload: BytesMut::with_capacity(capacity_hint),
            frames: 0,
            limit,
        }
    }

    /// Returns `true` until the first frame has been accepted.
    #[must_use]
    pub fn awaiting_first(&self) -> bool { self.state == State::AwaitFirst }

    /// Descriptor recorded from the first frame, if any.
    #[must_use]
    pub fn dtype(&self) -> Option<Dtype> {
        match self.state {
            State::AwaitFirst => None,
            State::AwaitNext(dtype) => Some(dtype),
        }
    }

    /// Bytes accumulated so far.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.payload.len() }

    /// Frames accepted so far.
    #[must_use]
    pub fn frames(&self) -> usize { self.frames }

    /// Feed the next frame.
    ///
    /// On completion the assembler returns to its initial state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Frame`] for a malformed frame and
    /// [`SessionError::PayloadLimit`] when the payload would exceed the cap.
    /// The assembler must be discarded after an error.
    pub fn accept_frame(&mut self, frame: &[u8]) -> Result<Progress, SessionError> {
        let parsed = parse_frame(frame, self.awaiting_first())?;
        let dtype = match self.state {
            State::AwaitNext(dtype) => dtype,
            State::AwaitFirst => parsed.dtype.ok_or(FrameError::MissingDtype)?,
        };

        if let Some(limit) = self.limit
            && self.payload.len().saturating_add(parsed.payload.len()) > limit
        {
            return Err(SessionError::PayloadLimit { limit });
        }
        self.payload.extend_from_slice(parsed.payload);
        self.frames += 1;

        if parsed.continuation {
            self.state = State::AwaitNext(dtype);
            return Ok(Progress::Incomplete);
        }

        let assembled = AssembledPayload {
            dtype,
            payload: self.payload.split().freeze(),
            frames: self.frames,
        };
        self.state = State::AwaitFirst;
        self.frames = 0;
        Ok(Progress::Complete(assembled))
    }
}
