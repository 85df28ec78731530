//! Sender side of the framing protocol.
//!
//! The receiver treats each read as one frame, so a sender has to keep
//! frames apart on the wire. Over TCP that means pausing between writes;
//! [`send_frames`] does so with a configurable pause.

use std::{io, time::Duration};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    time::sleep,
};

use crate::{
    decode::Sequence,
    frame::{CONTINUE, FIRST_PAYLOAD_OFFSET, NEXT_PAYLOAD_OFFSET, STOP},
};

/// Pause between frames used by [`send_sequence`] callers that have no
/// better figure.
pub const DEFAULT_FRAME_PAUSE: Duration = Duration::from_millis(50);

/// Smallest frame able to carry payload after the first frame's header.
const MIN_FRAME_LEN: usize = FIRST_PAYLOAD_OFFSET;

/// Split `sequence` into frames no longer than `max_frame_len` bytes.
///
/// The first frame carries the dtype code. The last frame has its
/// continuation byte cleared. `max_frame_len` is raised to 2 if smaller.
/// An empty sequence encodes as the single frame `[0, dtype]`.
///
/// # Examples
///
/// ```
/// use numwire::{client::encode_frames, decode::Sequence};
///
/// let frames = encode_frames(&Sequence::Uint16(vec![1, 2]), 4);
/// assert_eq!(frames.len(), 2);
/// assert_eq!(&frames[0][..], &[1, 11, 1, 0]);
/// assert_eq!(&frames[1][..], &[0, 2, 0]);
/// ```
#[must_use]
pub fn encode_frames(sequence: &Sequence, max_frame_len: usize) -> Vec<Bytes> {
    let max_frame_len = max_frame_len.max(MIN_FRAME_LEN);
    let payload = sequence.to_le_bytes();

    let first_len = payload.len().min(max_frame_len - FIRST_PAYLOAD_OFFSET);
    let mut frames = Vec::new();
    let mut first = BytesMut::with_capacity(FIRST_PAYLOAD_OFFSET + first_len);
    first.put_u8(CONTINUE);
    first.put_u8(sequence.dtype().code());
    first.put_slice(&payload[..first_len]);
    frames.push(first);

    let step = max_frame_len - NEXT_PAYLOAD_OFFSET;
    for chunk in payload[first_len..].chunks(step) {
        let mut frame = BytesMut::with_capacity(NEXT_PAYLOAD_OFFSET + chunk.len());
        frame.put_u8(CONTINUE);
        frame.put_slice(chunk);
        frames.push(frame);
    }

    if let Some(last) = frames.last_mut() {
        last[0] = STOP;
    }
    frames.into_iter().map(BytesMut::freeze).collect()
}

/// Write `frames` to `writer`, pausing for `pause` between consecutive frames.
///
/// # Errors
/// Returns any error raised while writing or flushing.
pub async fn send_frames<W>(writer: &mut W, frames: &[Bytes], pause: Duration) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for (index, frame) in frames.iter().enumerate() {
        if index > 0 {
            sleep(pause).await;
        }
        writer.write_all(frame).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Encode `sequence` and send it as paced frames.
///
/// # Errors
/// Returns any error raised while writing or flushing.
pub async fn send_sequence<W>(
    writer: &mut W,
    sequence: &Sequence,
    max_frame_len: usize,
    pause: Duration,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frames = encode_frames(sequence, max_frame_len);
    send_frames(writer, &frames, pause).await
}
