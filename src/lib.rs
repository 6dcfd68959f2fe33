//! Palisade - key lifecycle and stream normalization core for an AI proxy
//!
//! This library provides the two load-bearing subsystems of a proxy that
//! fronts the Gemini API with pooled upstream credentials: a serialized
//! background health-checker that learns which keys are usable and retires
//! the dead ones, and a per-frame transcoder that rewrites Gemini streaming
//! events into OpenAI-style `chat.completion.chunk` objects.

pub mod checker;
pub mod config;
pub mod error;
pub mod gemini;
pub mod keys;
pub mod streaming;
pub mod translate;

pub use crate::checker::gemini::GeminiKeyChecker;
pub use crate::checker::{CheckScheduler, KeyChecker, SchedulerConfig, SchedulerHandle};
pub use crate::config::Config;
pub use crate::error::{CheckError, CheckResult};
pub use crate::gemini::GeminiClient;
pub use crate::keys::{KeyHash, KeyPatch, KeyPool, KeyRecord, ModelFamily};
pub use crate::translate::gemini::{transcode_frame, StreamContext};
pub use crate::translate::{FrameOutcome, StreamChunk};
