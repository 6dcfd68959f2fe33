//! Gemini API client and wire types.
//!
//! Thin wrapper over the generativelanguage REST API: the paginated model
//! listing and a minimal `generateContent` call used as a smoke test.
//! Non-2xx responses surface with their body text intact so the checker can
//! pattern-match on the error envelope. The credential travels as a query
//! parameter, so request URLs are never logged.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{CheckError, CheckResult};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// One entry from the model listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Fully-qualified name, e.g. `models/gemini-2.0-flash`.
    pub name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelEntry {
    /// Model id without the `models/` prefix.
    pub fn short_id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
    next_page_token: Option<String>,
}

/// One event from a `streamGenerateContent` SSE stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

impl Candidate {
    /// Text of the first content part, empty if there is none.
    pub fn first_part_text(&self) -> String {
        self.content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
            .unwrap_or_default()
    }

    pub fn has_parts(&self) -> bool {
        self.content.as_ref().is_some_and(|c| !c.parts.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

/// Safety verdict attached to a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<i64>,
    pub message: String,
    pub status: Option<String>,
}

/// Gemini API client
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// List every model visible to the credential, following pagination.
    pub async fn list_models(&self, api_key: &str) -> CheckResult<Vec<ModelEntry>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut url = format!(
                "{}/v1beta/models?key={}&pageSize=1000",
                self.base_url, api_key
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(CheckError::UpstreamStatus {
                    status: status.as_u16(),
                    body,
                });
            }

            let body = response.text().await?;
            let page: ModelListResponse = match serde_json::from_str(&body) {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "failed to parse model list response");
                    return Err(e.into());
                }
            };

            pages += 1;
            models.extend(page.models);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(model_count = models.len(), pages, "listed models");
        Ok(models)
    }

    /// Minimal one-token generation against `model`.
    ///
    /// Exactly HTTP 200 counts as a pass; everything else surfaces as an
    /// [`CheckError::UpstreamStatus`] for the policy table.
    pub async fn smoke_generate(&self, api_key: &str, model: &str) -> CheckResult<()> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        );
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": "hi"}]}],
            "tools": [],
            "safetySettings": [],
            "generationConfig": {"maxOutputTokens": 1}
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        debug!(model = %model, "smoke generation passed");
        Ok(())
    }
}

/// Human-oriented summary of an error body: the envelope's status and
/// message when it parses, otherwise the (truncated) raw text.
pub fn summarize_error_body(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "{}: {}",
            envelope.error.status.as_deref().unwrap_or("UNKNOWN"),
            envelope.error.message
        ),
        Err(_) => {
            let mut text = body.to_string();
            if text.len() > 200 {
                text.truncate(200);
                text.push_str("...");
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_entry_short_id() {
        let entry = ModelEntry {
            name: "models/gemini-2.0-flash".to_string(),
            supported_generation_methods: vec!["generateContent".to_string()],
        };
        assert_eq!(entry.short_id(), "gemini-2.0-flash");
        assert!(entry.supports_generation());
    }

    #[test]
    fn test_model_entry_without_prefix() {
        let entry = ModelEntry {
            name: "gemini-2.0-flash".to_string(),
            supported_generation_methods: vec!["embedContent".to_string()],
        };
        assert_eq!(entry.short_id(), "gemini-2.0-flash");
        assert!(!entry.supports_generation());
    }

    #[test]
    fn test_stream_event_deserializes_candidates() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hello"}], "role": "model"},
                "finishReason": "STOP",
                "safetyRatings": [{"category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE"}]
            }]
        }"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        let candidate = &event.candidates[0];
        assert_eq!(candidate.first_part_text(), "Hello");
        assert_eq!(candidate.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(candidate.safety_ratings.len(), 1);
    }

    #[test]
    fn test_candidate_without_parts() {
        let raw = r#"{"candidates": [{"finishReason": "SAFETY", "safetyRatings": []}]}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        let candidate = &event.candidates[0];
        assert!(!candidate.has_parts());
        assert_eq!(candidate.first_part_text(), "");
    }

    #[test]
    fn test_summarize_error_body_envelope() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            summarize_error_body(body),
            "RESOURCE_EXHAUSTED: Quota exceeded"
        );
    }

    #[test]
    fn test_summarize_error_body_garbage_is_truncated() {
        let body = "x".repeat(500);
        let summary = summarize_error_body(&body);
        assert!(summary.len() <= 203);
        assert!(summary.ends_with("..."));
    }
}
