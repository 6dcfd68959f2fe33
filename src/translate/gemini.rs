//! Gemini streaming transcoder.
//!
//! Converts one Gemini `streamGenerateContent` SSE frame into at most one
//! normalized completion chunk. Pure per-frame: the caller owns the frame
//! index and supplies the identifiers stamped on every chunk, because the
//! provider's frames do not echo them consistently. Nothing here may panic
//! or propagate an error into the forwarding loop; every failure resolves
//! to a skip after logging.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::gemini::{Candidate, StreamEvent};
use crate::streaming::SseFrame;

use super::{FrameOutcome, StreamChunk};

/// Stream-termination sentinel.
const DONE_SENTINEL: &str = "[DONE]";

/// Prefix marking chunk ids that originated from a Gemini stream.
const CHUNK_ID_PREFIX: &str = "gemini-";

/// Finish reasons meaning the model was cut off by a filter rather than
/// finishing on its own.
const BLOCKED_FINISH_REASONS: [&str; 2] = ["SAFETY", "OTHER"];

/// Leading `Speaker: ` label the model occasionally prepends to the first
/// frame of generated dialogue even when none was requested. Bounded
/// lookahead to the first colon-space; legitimate text that opens with
/// `word: ` will be mis-stripped.
static SPEAKER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.{0,50}?): ").expect("speaker prefix pattern must compile"));

/// Caller-supplied identifiers stamped on every emitted chunk.
#[derive(Debug, Clone)]
pub struct StreamContext {
    /// Fallback completion id; the emitted chunk id is this with a
    /// provider tag prepended.
    pub completion_id: String,
    /// Fallback model name.
    pub model: String,
}

impl StreamContext {
    pub fn new(completion_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            completion_id: completion_id.into(),
            model: model.into(),
        }
    }
}

/// Transcode one raw SSE frame into a normalized chunk, or skip it.
///
/// `index` is the zero-based position of this frame within the stream;
/// speaker-prefix stripping applies only at index 0.
pub fn transcode_frame(raw_frame: &str, index: usize, ctx: &StreamContext) -> FrameOutcome {
    let frame = SseFrame::parse(raw_frame);
    let payload = frame.data.trim();

    // Normal end-of-stream signal, not a failure.
    if payload.is_empty() || payload == DONE_SENTINEL {
        return FrameOutcome::Skip;
    }

    let event: StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(parse_error) => {
            warn!(
                error = %parse_error,
                frame = %raw_frame,
                "skipping unparsable stream frame"
            );
            return FrameOutcome::Skip;
        }
    };
    let Some(candidate) = event.candidates.first() else {
        warn!(frame = %raw_frame, "skipping stream frame without candidates");
        return FrameOutcome::Skip;
    };

    let mut content = candidate.first_part_text();
    if is_blocked(candidate) {
        content = blocked_notice(candidate);
    }
    if index == 0 {
        content = strip_speaker_prefix(&content);
    }

    FrameOutcome::Chunk(StreamChunk::content_delta(
        format!("{}{}", CHUNK_ID_PREFIX, ctx.completion_id),
        ctx.model.clone(),
        content,
        candidate.finish_reason.clone(),
    ))
}

/// A candidate was blocked when it stopped for a safety/unclassified reason
/// and produced no content at all.
fn is_blocked(candidate: &Candidate) -> bool {
    let blocked_reason = candidate
        .finish_reason
        .as_deref()
        .is_some_and(|reason| BLOCKED_FINISH_REASONS.contains(&reason));
    blocked_reason && !candidate.has_parts()
}

/// Replacement text for a blocked candidate, carrying the safety ratings
/// verbatim so the client can see why the model declined.
fn blocked_notice(candidate: &Candidate) -> String {
    let ratings = serde_json::to_string(&candidate.safety_ratings)
        .unwrap_or_else(|_| "[]".to_string());
    format!(
        "The upstream model stopped without output (finish reason: {}). Safety ratings: {}",
        candidate.finish_reason.as_deref().unwrap_or("unknown"),
        ratings
    )
}

fn strip_speaker_prefix(text: &str) -> String {
    SPEAKER_PREFIX.replace(text, "").trim().to_string()
}
