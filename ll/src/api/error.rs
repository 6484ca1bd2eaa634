//! API error types

use thiserror::Error;

/// Errors that can occur while talking to the recommendation service
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API error {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Api { status: u16, detail: Option<String> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    /// Build an API error from a non-success status and its raw body
    pub fn from_body(status: u16, body: &str) -> Self {
        Self::Api {
            status,
            detail: extract_detail(body),
        }
    }

    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the server rejected our credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Message to show the learner
    ///
    /// Uses the server-provided detail when there is one, the fallback otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                detail: Some(detail), ..
            } => detail.clone(),
            Self::Api { status, detail: None } => format!("{} (HTTP {})", fallback, status),
            _ => fallback.to_string(),
        }
    }
}

/// Pull a readable message out of an error body
///
/// Understands `{"detail": "..."}`, validation lists `{"detail": [{"msg": "..."}]}`
/// and short plain-text bodies.
pub fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        return match value.get("detail") {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if msgs.is_empty() { None } else { Some(msgs.join("; ")) }
            }
            _ => value
                .get("message")
                .and_then(|m| m.as_str())
                .map(|m| m.to_string()),
        };
    }

    // Plain text, but not an HTML error page
    if trimmed.len() <= 200 && !trimmed.starts_with('<') {
        return Some(trimmed.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_detail_string() {
        let body = r#"{"detail": "Invalid credentials"}"#;
        assert_eq!(extract_detail(body), Some("Invalid credentials".to_string()));
    }

    #[test]
    fn test_extract_detail_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "user_id"], "msg": "field required"}, {"msg": "too short"}]}"#;
        assert_eq!(extract_detail(body), Some("field required; too short".to_string()));
    }

    #[test]
    fn test_extract_detail_ignores_html_and_empty() {
        assert_eq!(extract_detail(""), None);
        assert_eq!(extract_detail("   "), None);
        assert_eq!(extract_detail("<html><body>Bad Gateway</body></html>"), None);
        assert_eq!(extract_detail("Service Unavailable"), Some("Service Unavailable".to_string()));
    }

    #[test]
    fn test_user_message_prefers_detail() {
        let err = ApiError::from_body(400, r#"{"detail": "User already exists"}"#);
        assert_eq!(err.user_message("Unable to register"), "User already exists");

        let err = ApiError::from_body(500, "");
        assert_eq!(err.user_message("Unable to register"), "Unable to register (HTTP 500)");

        let err = ApiError::InvalidResponse("truncated".to_string());
        assert_eq!(err.user_message("Unable to register"), "Unable to register");
    }

    #[test]
    fn test_is_unauthorized() {
        assert!(ApiError::from_body(401, "").is_unauthorized());
        assert!(ApiError::from_body(403, "").is_unauthorized());
        assert!(!ApiError::from_body(404, "").is_unauthorized());
        assert!(!ApiError::InvalidUrl("x".to_string()).is_unauthorized());
    }
}
