use thiserror::Error;

/// Failure modes of a single Xtream API request, split so the retry policy
/// can tell transient from permanent failures.
#[derive(Error, Debug, Clone)]
pub enum XtreamApiError {
    /// 401, 403
    #[error("Authentication failed (status: {status})")]
    Authentication { status: u16 },

    #[error("Rate limited: {message}")]
    RateLimit { message: String },

    #[error("Server error: {message} (status: {status})")]
    ServerError { status: u16, message: String },

    #[error("Client error: {message} (status: {status})")]
    ClientError { status: u16, message: String },

    /// Timeouts, refused connections and dropped bodies
    #[error("Network error: {0}")]
    Network(String),

    /// Body was not JSON
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("API error: {0}")]
    Other(String),
}

impl XtreamApiError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            XtreamApiError::Network(_)
                | XtreamApiError::ServerError { .. }
                | XtreamApiError::RateLimit { .. }
        )
    }

    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            XtreamApiError::Network(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            XtreamApiError::Network(format!("Connection failed: {}", error))
        } else if error.is_request() || error.is_body() {
            XtreamApiError::Network(format!("Request error: {}", error))
        } else {
            XtreamApiError::Other(error.to_string())
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => XtreamApiError::Authentication { status },
            429 => XtreamApiError::RateLimit { message: body },
            400..=499 => XtreamApiError::ClientError {
                status,
                message: body,
            },
            500..=599 => XtreamApiError::ServerError {
                status,
                message: body,
            },
            _ => XtreamApiError::Other(format!("HTTP {}: {}", status, body)),
        }
    }
}
