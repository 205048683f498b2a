//! Response envelope types.
//!
//! Every library-boundary response, success or failure, is wrapped in a
//! uniform envelope carrying a timestamp and a request id. Callers may supply
//! their own request id; one is generated otherwise.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorCode;
use crate::Any2mdError;

/// Successful response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>, request_id: Option<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            timestamp: Utc::now(),
            request_id: request_id.unwrap_or_else(generate_request_id),
        }
    }
}

/// Error body inside an error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    /// Build an error body from an error.
    ///
    /// The source chain goes into `details` only when `debug` is set; error
    /// sources can leak paths and internals that do not belong in production
    /// responses.
    pub fn from_error(error: &Any2mdError, debug: bool) -> Self {
        let details = if debug {
            let mut chain = Vec::new();
            let mut source = std::error::Error::source(error);
            while let Some(err) = source {
                chain.push(err.to_string());
                source = err.source();
            }
            if chain.is_empty() { None } else { Some(chain.join(": ")) }
        } else {
            None
        };

        Self {
            code: error.error_code(),
            message: error.to_string(),
            details,
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl ApiErrorResponse {
    pub fn new(error: &Any2mdError, debug: bool, request_id: Option<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody::from_error(error, debug),
            timestamp: Utc::now(),
            request_id: request_id.unwrap_or_else(generate_request_id),
        }
    }

    /// HTTP-style status code for the wrapped error.
    pub fn status_code(&self) -> u16 {
        self.error.code.status_code()
    }
}

/// Fresh request id (UUID v4).
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
