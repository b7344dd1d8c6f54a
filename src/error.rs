//! Error types for drawing submission and image generation

use thiserror::Error;

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";
pub const NO_CONTENT_ERROR: &str = "Failed to generate image. No content returned from the model.";
pub const RETRY_ERROR: &str = "Failed to generate image. Please try again.";

/// Errors that can end a generation request
#[derive(Error, Debug)]
pub enum GenerateError {
    /// No API key was configured
    #[error("API key is not configured.")]
    MissingApiKey,

    /// The request never got a response
    #[error("{0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("got status: {status}. {body}")]
    Http { status: u16, body: String },

    /// The prompt was refused
    #[error("Image generation failed: {reason} {}", .message.as_deref().unwrap_or(""))]
    Blocked {
        reason: String,
        message: Option<String>,
    },

    /// Neither candidates nor prompt feedback came back
    #[error("{}", NO_CONTENT_ERROR)]
    NoContent,

    /// The model answered, but without an image
    #[error("{}", RETRY_ERROR)]
    NoImage,

    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Invalid image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl GenerateError {
    /// Non-success reply. JSON bodies are re-serialized compactly so the
    /// `{"error":...}` envelope is found however the service formatted it.
    pub fn http(status: u16, body: String) -> Self {
        let body = serde_json::from_str::<serde_json::Value>(&body)
            .map(|value| value.to_string())
            .unwrap_or(body);
        GenerateError::Http { status, body }
    }
}

/// Reasons a submission is refused before anything is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Please enter a prompt.")]
    EmptyPrompt,

    #[error("A generation request is already in progress.")]
    AlreadyLoading,

    #[error("Failed to encode drawing: {0}")]
    Encode(String),
}

/// Turn an error text into what the error dialog shows.
///
/// Service failures often carry the JSON body inline, e.g.
/// `got status: 429. {"error":{"code":429,"message":"Quota exceeded"}}`;
/// when the `{"error":...}` envelope parses, its `message` is shown instead.
/// Anything that doesn't parse is returned unchanged.
pub fn parse_error(raw: &str) -> String {
    if raw.is_empty() {
        return UNEXPECTED_ERROR.to_string();
    }
    envelope_message(raw).unwrap_or_else(|| raw.to_string())
}

fn envelope_message(raw: &str) -> Option<String> {
    const MARKER: &str = "{\"error\":";

    let start = raw.find(MARKER)? + MARKER.len();
    // greedy: everything up to the last closing brace
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    let inner: serde_json::Value = serde_json::from_str(&raw[start..end]).ok()?;
    match inner.get("message").and_then(|m| m.as_str()) {
        Some(message) if !message.is_empty() => Some(message.to_string()),
        _ => None,
    }
}
