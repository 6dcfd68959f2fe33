//! Provider byte stream to normalized chunk stream.
//!
//! The transcoder is deliberately stateless, so this adapter owns the
//! per-stream state: the SSE line buffer and the frame index. Frames are
//! processed strictly in arrival order; frames that transcode to a skip
//! produce nothing. Concurrent client streams each get their own adapter
//! with no shared state.

use async_stream::stream;
use bytes::Bytes;
use futures::{pin_mut, Stream, StreamExt};
use tracing::warn;

use super::gemini::{transcode_frame, StreamContext};
use super::{FrameOutcome, StreamChunk};
use crate::streaming::SseLineBuffer;

/// Adapt an upstream SSE byte stream into normalized chunks.
///
/// A transport error ends the stream after a warning; it is the caller's
/// job to decide what, if anything, to tell the client.
pub fn transcode_byte_stream<S, E>(
    upstream: S,
    ctx: StreamContext,
) -> impl Stream<Item = StreamChunk>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    stream! {
        pin_mut!(upstream);
        let mut buffer = SseLineBuffer::new();
        let mut frame_index = 0usize;

        while let Some(piece) = upstream.next().await {
            let bytes = match piece {
                Ok(bytes) => bytes,
                Err(transport_error) => {
                    warn!(error = %transport_error, "upstream stream ended with transport error");
                    break;
                }
            };

            for line in buffer.feed(&bytes) {
                if !line.starts_with("data:") {
                    continue;
                }
                if let FrameOutcome::Chunk(chunk) = transcode_frame(&line, frame_index, &ctx) {
                    yield chunk;
                }
                frame_index += 1;
            }
        }

        if buffer.has_incomplete() {
            warn!(remaining = %buffer.remaining(), "stream ended with truncated frame");
        }
    }
}
