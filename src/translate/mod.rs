//! Translation types shared by the engine, the worker and the facade.

pub mod cache;
pub mod decode;
pub mod transport;

use std::time::Instant;

/// Sentinel translation for an exhausted credit balance.
pub const INSUFFICIENT_CREDITS: &str = "INSUFFICIENT_CREDITS";
/// Sentinel translation for a rejected API key.
pub const INVALID_API_KEY: &str = "INVALID_API_KEY";

/// Queued translation request.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub id: String,
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub submitted_at: Instant,
    /// Log correlation only; never sent to the remote.
    pub trace_id: String,
}

impl TranslationRequest {
    pub fn new(id: &str, text: &str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            submitted_at: Instant::now(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Terminal result of one queued request.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    pub id: String,
    /// Empty on failure.
    pub translation: String,
    pub error: Option<String>,
    pub ready: bool,
}

impl TranslationOutcome {
    pub fn from_result(id: String, result: Result<String, TranslateError>) -> Self {
        match result {
            Ok(translation) => Self {
                id,
                translation,
                error: None,
                ready: true,
            },
            Err(e) => Self {
                id,
                translation: String::new(),
                error: Some(e.outcome_text()),
                ready: true,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Application-level failure reported by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFailure {
    InsufficientCredits,
    InvalidApiKey,
    /// Error text passed through verbatim.
    Remote(String),
    /// Reply had neither an error nor a translation.
    Unparseable,
}

impl ApiFailure {
    pub fn from_error_text(text: &str) -> Self {
        if text.contains("Insufficient credits") {
            ApiFailure::InsufficientCredits
        } else if text.contains("Invalid API key") || text.contains("Unauthorized") {
            ApiFailure::InvalidApiKey
        } else {
            ApiFailure::Remote(text.to_string())
        }
    }

    /// Sentinel or verbatim text carried in place of a translation.
    pub fn carried_text(&self) -> Option<&str> {
        match self {
            ApiFailure::InsufficientCredits => Some(INSUFFICIENT_CREDITS),
            ApiFailure::InvalidApiKey => Some(INVALID_API_KEY),
            ApiFailure::Remote(text) => Some(text),
            ApiFailure::Unparseable => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    /// Transport returned no body.
    #[error("network error")]
    Network,
    #[error("API error")]
    Api(ApiFailure),
    /// Request body could not be built.
    #[error("encoding error")]
    Encoding,
    /// Reserved: transport timeouts currently surface as `Network`.
    #[error("timeout")]
    Timeout,
    #[error("invalid parameters")]
    InvalidParams(&'static str),
}

impl TranslateError {
    /// Error text for an async outcome. API failures carry their sentinel or
    /// the remote's own message; everything else uses the kind string.
    pub fn outcome_text(&self) -> String {
        match self {
            TranslateError::Api(failure) => failure
                .carried_text()
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
            other => other.to_string(),
        }
    }
}

/// Char-safe prefix for log lines.
pub(crate) fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
