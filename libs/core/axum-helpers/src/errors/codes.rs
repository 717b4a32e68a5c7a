//! Type-safe error codes for API responses.
//!
//! Each code carries a client-facing identifier (`"NOT_FOUND"`), an integer
//! for logs and metrics (`1004`) and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::ValidationError;
//! assert_eq!(code.as_str(), "VALIDATION_ERROR");
//! assert_eq!(code.code(), 1001);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request validation failed
    ValidationError,

    /// Query string could not be read as the expected parameters
    QueryExtraction,

    /// Request body could not be read as the expected JSON shape
    JsonExtraction,

    /// Requested resource was not found
    NotFound,

    /// Request is valid but a policy forbids it
    Forbidden,

    /// Request conflicts with current resource state
    Conflict,

    /// HTTP method not supported by the endpoint
    MethodNotAllowed,

    // Database errors (2000-2999)
    /// The document store reported an error
    DatabaseError,
}

impl ErrorCode {
    /// SCREAMING_SNAKE_CASE identifier for programmatic handling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::QueryExtraction => "QUERY_EXTRACTION",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::NotFound => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Integer code for structured logs.
    ///
    /// - 1000-1999: client errors
    /// - 2000-2999: database errors
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::QueryExtraction => 1002,
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::Forbidden => 1007,
            Self::Conflict => 1008,
            Self::MethodNotAllowed => 1011,
            Self::DatabaseError => 2003,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::QueryExtraction => "Failed to parse query string",
            Self::JsonExtraction => "Failed to parse request body",
            Self::NotFound => "Resource not found",
            Self::Forbidden => "Access forbidden",
            Self::Conflict => "Resource already exists",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::DatabaseError => "Database error occurred",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
