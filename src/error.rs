//! Error types shared by the adapters and the HTTP layer.
//!
//! Remote failures are normalized once, at the adapter boundary, into a
//! [`BackendError`] carrying the backend's own code and diagnostics. The
//! HTTP layer turns an [`AppError`] into the response envelope.

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use axum::http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Code used when a backend failure carries no code of its own.
pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Key under which the SDK stores the AWS request id in error metadata.
const AWS_REQUEST_ID: &str = "aws_request_id";

/// A remote service failure in uniform shape.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    pub code: String,
    pub details: Value,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: json!({}),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Normalizes any AWS SDK error.
    ///
    /// `code` is the service's error name (`ConditionalCheckFailedException`,
    /// `NoSuchBucket`, ...) when one was returned. Transport failures have no
    /// code and fall back to [`UNKNOWN_ERROR`], with the full cause chain in
    /// `details.context`.
    pub fn from_aws<E>(err: &E, fallback_message: &str) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let context = DisplayErrorContext(err).to_string();
        let code = err.code().unwrap_or(UNKNOWN_ERROR).to_string();
        let message = err
            .message()
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if context.is_empty() {
                    fallback_message.to_string()
                } else {
                    context.clone()
                }
            });

        let details = json!({
            "name": err.code(),
            "message": err.message(),
            "requestId": err.meta().extra(AWS_REQUEST_ID),
            "context": context,
        });

        Self {
            message,
            code,
            details,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("Todo not found")]
    NotFound { id: String },

    #[error("No todos to export")]
    NoData,

    #[error("{0}")]
    Store(BackendError),

    #[error("{0}")]
    ObjectStore(BackendError),

    #[error("{0}")]
    Queue(BackendError),

    #[error("{message}")]
    Configuration { message: String, details: Value },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn configuration(message: impl Into<String>, details: Value) -> Self {
        Self::Configuration {
            message: message.into(),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::NoData => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Store(_)
            | Self::ObjectStore(_)
            | Self::Queue(_)
            | Self::Configuration { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NoData => "NO_DATA",
            Self::Store(e) | Self::ObjectStore(e) | Self::Queue(e) => &e.code,
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Validation { details, .. } | Self::Configuration { details, .. } => {
                Some(details.clone())
            }
            Self::NotFound { id } => Some(json!({ "id": id })),
            Self::NoData => Some(json!({ "hint": "Add some todos before exporting" })),
            Self::Store(e) | Self::ObjectStore(e) | Self::Queue(e) => Some(e.details.clone()),
            Self::Internal(_) => None,
        }
    }
}
