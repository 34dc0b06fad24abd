//! Google Gemini REST API schemas
//!
//! Request and response structures for the `generateContent` endpoint,
//! trimmed to plain text generation.

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Generation configuration
// ============================================================================

/// Sampling configuration forwarded with every generate request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature, 0.0 (deterministic) to 1.0
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: f32,

    /// Upper bound on generated tokens; must be positive
    #[validate(range(min = 1))]
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 1000,
        }
    }
}

// ============================================================================
// Request types
// ============================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GeminiRequest {
    /// Single-turn user prompt with generation config.
    pub fn from_prompt(prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            contents: vec![GeminiContent::user(prompt)],
            generation_config: Some(config),
        }
    }
}

/// One content block: role plus text parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

impl GeminiContent {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

/// A part of a content block. Only text parts are used here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Response body for `generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate, if any.
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: GeminiContent,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error body returned by the Gemini API on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorBody {
    pub error: GeminiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiErrorDetail {
    pub code: i32,
    pub message: String,

    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn request_serializes_in_camel_case() {
        let config = GenerationConfig {
            temperature: 0.5,
            max_output_tokens: 800,
        };
        let request = GeminiRequest::from_prompt("tell me a story", config);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "tell me a story");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 800);
    }

    #[test]
    fn response_text_concatenates_parts() {
        let body = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Once upon "}, {"text": "a time."}]
                },
                "finishReason": "STOP"
            }]
        }"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text().unwrap(), "Once upon a time.");
    }

    #[test]
    fn response_without_candidates_has_no_text() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn error_body_parses() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let parsed: GeminiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.code, 429);
        assert_eq!(parsed.error.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn generation_config_validates_ranges() {
        assert!(GenerationConfig::default().validate().is_ok());

        let bad_temp = GenerationConfig {
            temperature: 1.5,
            max_output_tokens: 100,
        };
        assert!(bad_temp.validate().is_err());

        let zero_tokens = GenerationConfig {
            temperature: 0.5,
            max_output_tokens: 0,
        };
        assert!(zero_tokens.validate().is_err());
    }
}
