//! Error type for calls against the chat backend.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, ...)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a status the caller does not tolerate.
    /// Displays as the bare status text, e.g. "Internal Server Error".
    #[error("{text}")]
    Status { status: u16, text: String },

    /// The body was not the JSON shape we expected
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A JSON reply with nothing in it
    #[error("No response body")]
    EmptyBody,
}

impl ApiError {
    pub fn status(status: StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            text: status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string()),
        }
    }

    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Status { status, .. } if *status == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_reason() {
        let err = ApiError::status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
        assert!(err.is_status(500));
        assert!(!err.is_status(404));
    }

    #[test]
    fn test_status_error_without_reason_uses_code() {
        let code = StatusCode::from_u16(599).unwrap();
        assert_eq!(ApiError::status(code).to_string(), "599");
    }
}
