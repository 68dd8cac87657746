//! Error taxonomy for the banking API and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::schema::Entity;

pub type Result<T> = std::result::Result<T, BankingError>;

#[derive(Debug, Error)]
pub enum BankingError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Required fields absent (or falsy) in the payload
    #[error("{message}")]
    MissingFields {
        message: &'static str,
        fields: Vec<&'static str>,
    },

    /// A field is present but cannot be stored in its column type
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{0}")]
    InvalidBody(String),

    /// Foreign key target does not exist
    #[error("{} references a row that does not exist", .entity.name())]
    InvalidReference { entity: Entity },

    /// List over an empty table
    #[error("No {} found", .entity.plural())]
    EmptyResult { entity: Entity },

    #[error("{} not found", .entity.name())]
    NotFound { entity: Entity },

    /// Duplicate identifier rejected by the store
    #[error("{} with ID {id} already exists", .entity.name())]
    Conflict { entity: Entity, id: String },

    /// Delete blocked by rows that still reference this one
    #[error("{} with ID {id} is still referenced", .entity.name())]
    InUse { entity: Entity, id: String },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Insert reported success but the row could not be read back
    #[error("Failed to retrieve the added {}", .entity.singular())]
    PersistFailure { entity: Entity },

    #[error("Row has {actual} columns, descriptor expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl BankingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BankingError::MissingFields { .. }
            | BankingError::InvalidField { .. }
            | BankingError::InvalidBody(_)
            | BankingError::InvalidReference { .. } => StatusCode::BAD_REQUEST,

            BankingError::EmptyResult { .. } | BankingError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            BankingError::Conflict { .. } | BankingError::InUse { .. } => StatusCode::CONFLICT,

            BankingError::PersistFailure { .. }
            | BankingError::ShapeMismatch { .. }
            | BankingError::Store(_)
            | BankingError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients; store internals stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            BankingError::Store(_)
            | BankingError::Unavailable(_)
            | BankingError::ShapeMismatch { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for BankingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });
        (status, body).into_response()
    }
}
