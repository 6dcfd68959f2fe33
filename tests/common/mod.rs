//! Common test utilities for Palisade
//!
//! Shared fixtures and mock Gemini response builders used across the
//! integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};

/// Test configuration constants
pub mod constants {
    /// Default test credential
    pub const TEST_KEY: &str = "AIzaTestKey123";
    /// Second test credential
    pub const TEST_KEY_B: &str = "AIzaTestKey456";
}

/// Model listing response body.
///
/// Each entry is `(model_id, supports_generation)`; ids are emitted with
/// the `models/` prefix the API uses.
pub fn models_body(models: &[(&str, bool)]) -> Value {
    let entries: Vec<Value> = models
        .iter()
        .map(|(id, generative)| {
            let methods = if *generative {
                vec!["generateContent", "countTokens"]
            } else {
                vec!["embedContent"]
            };
            json!({
                "name": format!("models/{}", id),
                "displayName": id,
                "supportedGenerationMethods": methods,
            })
        })
        .collect();
    json!({ "models": entries })
}

/// Model listing page with a continuation token.
pub fn models_page(models: &[(&str, bool)], next_page_token: &str) -> Value {
    let mut body = models_body(models);
    body["nextPageToken"] = json!(next_page_token);
    body
}

/// Successful generateContent response body.
pub fn generate_success_body() -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": "Hi" }], "role": "model" },
            "finishReason": "STOP",
        }],
        "usageMetadata": { "promptTokenCount": 1, "candidatesTokenCount": 1 }
    })
}

/// Gemini error envelope.
pub fn error_body(code: u16, message: &str, status: &str) -> Value {
    json!({
        "error": { "code": code, "message": message, "status": status }
    })
}

/// 429 envelope whose quota violation carries a zero limit value.
pub fn zero_quota_body() -> Value {
    json!({
        "error": {
            "code": 429,
            "message": "Quota exceeded for quota metric 'Generate requests per minute'",
            "status": "RESOURCE_EXHAUSTED",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.QuotaFailure",
                "violations": [{
                    "quotaId": "GenerateRequestsPerDayPerProjectPerModel",
                    "quota_limit_value": "0"
                }]
            }]
        }
    })
}

/// Generic 429 envelope without any zero-quota marker.
pub fn rate_limit_body() -> Value {
    error_body(
        429,
        "Resource has been exhausted (e.g. check quota).",
        "RESOURCE_EXHAUSTED",
    )
}

/// 400 envelope for a key the provider considers dead.
pub fn invalid_key_body() -> Value {
    error_body(
        400,
        "API key not valid. Please pass a valid API key.",
        "INVALID_ARGUMENT",
    )
}
