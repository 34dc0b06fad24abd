//! Generation error taxonomy
//!
//! Transient, credential-scoped failures (timeouts, rate limits) are
//! retried inside the executor and never surface per attempt; only the
//! terminal classifications below reach the caller. Non-credential errors
//! are passed through unchanged with their original message.

use thiserror::Error;

/// Error returned by a single remote generate call.
///
/// Carries the HTTP status when one was received, so the classifier can
/// recognize rate-limit responses without parsing the message.
#[derive(Debug, Clone, Error)]
#[error("remote call failed: {message}")]
pub struct RemoteError {
    /// HTTP status code, if the request got far enough to receive one
    pub status: Option<u16>,
    /// Diagnostic message from the remote service or transport
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Classify this error for the rotation policy.
    ///
    /// The substring heuristic mirrors what the Gemini API actually puts in
    /// quota error bodies. It is isolated here so the matching rule can be
    /// swapped without touching the retry control flow.
    pub fn class(&self) -> ErrorClass {
        if self.status == Some(429) {
            return ErrorClass::RateLimited;
        }
        let msg = self.message.to_lowercase();
        if msg.contains("429") || msg.contains("quota") || msg.contains("rate limit") {
            ErrorClass::RateLimited
        } else {
            ErrorClass::Other
        }
    }
}

/// Closed classification of a remote error.
///
/// Timeouts never reach the classifier; the executor detects them from the
/// wall-clock bound and handles them as their own case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Quota or rate-limit condition scoped to the active key
    RateLimited,
    /// Anything else: malformed request, auth failure, parse error, ...
    Other,
}

/// Rotation failure reported by the rotation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RotationError {
    #[error("no API keys available, all are blocked")]
    NoKeysAvailable,

    #[error("no alternate key to rotate to")]
    NoAlternateKey,
}

/// Terminal error for one logical `generate` request.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("every attempt timed out and no alternate key was available")]
    TimeoutExhausted,

    #[error("rate limit hit and no API key left to rotate to")]
    QuotaExhausted,

    #[error("no API keys available, all are blocked")]
    NoKeysAvailable,

    /// Non-transient remote error, passed through unchanged
    #[error(transparent)]
    Remote(RemoteError),

    #[error("retries and API keys exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("invalid generation config: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_classifies_as_rate_limited() {
        let err = RemoteError::with_status(429, "Resource has been exhausted");
        assert_eq!(err.class(), ErrorClass::RateLimited);
    }

    #[test]
    fn quota_message_classifies_as_rate_limited() {
        for msg in [
            "Quota exceeded for quota metric",
            "error 429 from upstream",
            "Rate limit reached, slow down",
        ] {
            assert_eq!(RemoteError::new(msg).class(), ErrorClass::RateLimited);
        }
    }

    #[test]
    fn other_errors_classify_as_other() {
        let err = RemoteError::with_status(400, "Invalid request: contents required");
        assert_eq!(err.class(), ErrorClass::Other);

        let err = RemoteError::new("connection reset by peer");
        assert_eq!(err.class(), ErrorClass::Other);
    }

    #[test]
    fn remote_error_message_is_preserved() {
        let err = RemoteError::with_status(403, "API key not valid");
        let wrapped = GenerateError::Remote(err);
        assert!(wrapped.to_string().contains("API key not valid"));
    }
}
