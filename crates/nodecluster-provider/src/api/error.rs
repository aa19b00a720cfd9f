//! Provisioning API error classification
//!
//! Maps HTTP status codes returned by the provisioning service onto typed
//! errors so lifecycle code can tell "absent" apart from real failures.

use thiserror::Error;

/// Provisioning API error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// The node cluster does not exist (or no longer exists)
    #[error("node cluster '{id}' not found")]
    NotFound { id: String },

    /// Credentials were rejected
    #[error("provisioning API rejected the credentials: {message}")]
    Unauthorized { message: String },

    /// Rate limit exceeded
    #[error("provisioning API rate limit exceeded")]
    Throttled,

    /// Any other non-success response
    #[error("provisioning API returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response
    #[error("request to provisioning API failed")]
    Transport(#[from] reqwest::Error),

    /// The response body was not what we expected
    #[error("failed to decode provisioning API response")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Check if the call could succeed if repeated later
    ///
    /// Lifecycle operations never retry on their own; this is only used to
    /// shape the message shown to the user.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Throttled => true,
            ApiError::Http { status, .. } => *status >= 500,
            ApiError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            ApiError::Unauthorized { .. } => {
                Some("Check NODECLUSTER_USER and NODECLUSTER_APIKEY")
            }
            ApiError::Transport(_) => Some("Check NODECLUSTER_API_URL and network access"),
            _ if self.is_retryable() => Some("The service may be busy, try again later"),
            _ => None,
        }
    }
}

/// Classify a non-success HTTP response.
///
/// `id` names the cluster the request was about; it is empty for the
/// collection endpoint.
pub fn classify_status(status: u16, id: &str, body: &str) -> ApiError {
    let message = summarize_body(body);

    match status {
        404 => ApiError::NotFound { id: id.to_string() },
        401 | 403 => ApiError::Unauthorized { message },
        429 => ApiError::Throttled,
        _ => ApiError::Http { status, message },
    }
}

/// Error responses carry either `{"error": "..."}`, `{"detail": "..."}` or
/// free text. Keep messages short enough for a terminal line.
fn summarize_body(body: &str) -> String {
    const MAX_LEN: usize = 200;

    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "detail", "message"]
                .iter()
                .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(str::to_string))
        });

    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return "no details".to_string();
    }
    if message.chars().count() > MAX_LEN {
        let truncated: String = message.chars().take(MAX_LEN).collect();
        return format!("{truncated}...");
    }
    message
}
