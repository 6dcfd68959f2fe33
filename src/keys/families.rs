//! Model family classification.
//!
//! Maps a raw Gemini model identifier to a coarse capability family. The
//! rules are substring heuristics over the id; anything generative that is
//! neither flash- nor ultra-branded counts as pro.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse capability family of a Gemini model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFamily {
    GeminiFlash,
    GeminiPro,
    GeminiUltra,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::GeminiFlash => "gemini-flash",
            ModelFamily::GeminiPro => "gemini-pro",
            ModelFamily::GeminiUltra => "gemini-ultra",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a raw model identifier. Returns `None` for models with no
/// generative family (embeddings, AQA, image models).
pub fn classify_model(model_id: &str) -> Option<ModelFamily> {
    let id = model_id.to_ascii_lowercase();
    if id.contains("embedding") || id.contains("aqa") || id.contains("imagen") {
        return None;
    }
    if id.contains("ultra") {
        Some(ModelFamily::GeminiUltra)
    } else if id.contains("flash") || id.contains("lite") {
        Some(ModelFamily::GeminiFlash)
    } else {
        Some(ModelFamily::GeminiPro)
    }
}
