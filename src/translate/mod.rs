//! Normalized streaming output.
//!
//! Clients speak one wire format regardless of which provider generated the
//! response: OpenAI-style `chat.completion.chunk` objects. This module holds
//! the normalized chunk types, their SSE encoding, and the per-frame
//! transcode outcome.

pub mod gemini;
pub mod stream;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Object tag stamped on every streaming chunk.
pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

/// Delta content in a streaming chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A choice in a streaming chunk.
///
/// `finish_reason` serializes as an explicit `null` until the stream
/// finishes; clients key off its presence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

/// One normalized incremental-completion chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
}

impl StreamChunk {
    /// Build a single-choice content chunk stamped with the given identity.
    pub fn content_delta(
        id: String,
        model: String,
        content: String,
        finish_reason: Option<String>,
    ) -> Self {
        Self {
            id,
            object: CHUNK_OBJECT.to_string(),
            created: chrono::Utc::now().timestamp(),
            model,
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta {
                    content: Some(content),
                },
                finish_reason,
            }],
        }
    }
}

/// Result of feeding one provider frame through a transcoder.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Forward this normalized chunk to the client.
    Chunk(StreamChunk),
    /// Nothing to forward. Not an error: end-of-stream sentinels and
    /// recovered malformed frames both land here.
    Skip,
}

impl FrameOutcome {
    pub fn into_chunk(self) -> Option<StreamChunk> {
        match self {
            FrameOutcome::Chunk(chunk) => Some(chunk),
            FrameOutcome::Skip => None,
        }
    }
}

/// Encode a chunk as an SSE data event: `data: {json}\n\n`.
pub fn format_sse_chunk(chunk: &StreamChunk) -> Bytes {
    let json = serde_json::to_string(chunk).expect("StreamChunk should always serialize");
    Bytes::from(format!("data: {}\n\n", json))
}

/// The stream termination marker: `data: [DONE]\n\n`.
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}
