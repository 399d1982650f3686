//! Uniform response envelope.
//!
//! Every response body is `{"status", "message", "data", "statusCode"}` with
//! the HTTP status mirrored in `statusCode`.

use serde::Serialize;

use crate::error::AppError;

/// Body returned when the envelope itself cannot be serialized.
const INTERNAL_ERROR_BODY: &str =
    r#"{"status":false,"message":"Internal server error","data":null,"statusCode":500}"#;

/// JSON envelope wrapping every outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'a, T: Serialize> {
    pub status: bool,
    pub message: &'a str,
    pub data: Option<T>,
    pub status_code: u16,
}

/// Serialized response ready for the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: String,
}

impl ApiResponse {
    /// Content type of every body.
    pub const CONTENT_TYPE: &'static str = "application/json";

    /// Build a response from an outcome.
    ///
    /// Serialization failures degrade to a fixed internal-error response.
    pub fn envelope<T: Serialize>(
        status_code: u16,
        status: bool,
        message: &str,
        data: Option<T>,
    ) -> Self {
        let envelope = Envelope {
            status,
            message,
            data,
            status_code,
        };

        match serde_json::to_string(&envelope) {
            Ok(body) => Self { status_code, body },
            Err(e) => {
                log::error!("Failed to serialize response: {}", e);
                Self::internal_error()
            }
        }
    }

    /// Successful response carrying `data`.
    pub fn ok<T: Serialize>(message: &str, data: T) -> Self {
        Self::envelope(200, true, message, Some(data))
    }

    /// Failed response without data.
    pub fn failure(status_code: u16, message: &str) -> Self {
        Self::envelope::<()>(status_code, false, message, None)
    }

    /// Failed response for an application error.
    pub fn from_error(err: &AppError) -> Self {
        Self::failure(err.status_code(), &err.to_string())
    }

    /// Fixed response used when nothing else can be produced.
    pub fn internal_error() -> Self {
        Self {
            status_code: 500,
            body: INTERNAL_ERROR_BODY.to_string(),
        }
    }
}
