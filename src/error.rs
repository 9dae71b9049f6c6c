//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure a handler can surface is one of its variants, and each variant knows its
//! HTTP status and the message that is safe to show to a client.
//!
//! `AppError` implements `actix_web::error::ResponseError`, producing the
//! `{statusCode, timestamp, path, message}` body. The path is filled in by
//! [`crate::envelope::ErrorEnvelope`], which also normalizes errors raised outside handlers.
//! `From` implementations exist for store, validation, JWT, bcrypt and IO errors so that
//! `?` works everywhere.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::ValidationErrors;

use crate::store::StoreError;

/// Message returned to clients for any failure that is not their fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
/// Message returned for store failures that could not be classified.
pub const DATABASE_ERROR_MESSAGE: &str = "An unexpected database error occurred.";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed or is missing (HTTP 401).
    Unauthorized(String),
    /// Malformed or invalid request (HTTP 400).
    BadRequest(String),
    /// Requested resource does not exist (HTTP 404).
    NotFound(String),
    /// A write collided with an existing record, phrased for the user (HTTP 400).
    Conflict(String),
    /// Store-level unique constraint violation on the named fields (HTTP 400).
    UniqueViolation(Vec<String>),
    /// Field-level validation failures with a typed code per field (HTTP 400).
    Validation(ValidationErrors),
    /// Unclassified persistence failure (HTTP 400, generic message).
    DatabaseError(String),
    /// Unexpected server-side failure (HTTP 500, generic message).
    InternalServerError(String),
    /// Invalid or missing configuration at startup.
    Configuration(String),
}

impl AppError {
    /// The message shown to the client. Internal details never leave the process.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::UniqueViolation(fields) => {
                format!("Unique constraint failed on {}.", fields.join(", "))
            }
            AppError::Validation(errors) => describe_validation(errors),
            AppError::DatabaseError(_) => DATABASE_ERROR_MESSAGE.to_string(),
            AppError::InternalServerError(_) | AppError::Configuration(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::UniqueViolation(fields) => {
                write!(f, "Unique Violation: {}", fields.join(", "))
            }
            AppError::Validation(errors) => {
                write!(f, "Validation Error: {}", describe_validation(errors))
            }
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::Configuration(msg) => write!(f, "Configuration Error: {}", msg),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, path: Option<String>, message: String) -> Self {
        Self {
            status_code: status.as_u16(),
            timestamp: Utc::now(),
            path,
            message,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::Conflict(_)
            | AppError::UniqueViolation(_)
            | AppError::Validation(_)
            | AppError::DatabaseError(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerError(_) | AppError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(status).json(ErrorBody::new(status, None, self.message()))
    }
}

/// Flattens validation errors into one sentence, fields in alphabetical order.
/// Identical messages reported for several fields are listed once.
pub fn describe_validation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    let mut messages: Vec<String> = Vec::new();
    for (field, field_errors) in fields {
        for error in field_errors {
            let message = match &error.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid ({}).", field, error.code),
            };
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
    }

    if messages.is_empty() {
        "Validation error occurred.".to_string()
    } else {
        messages.join(" ")
    }
}

/// Store failures are classified by their typed kind, never by message text.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        match error {
            StoreError::UniqueViolation { fields } => AppError::UniqueViolation(fields),
            StoreError::RecordNotFound => AppError::NotFound("Record not found.".into()),
            StoreError::Other(msg) => {
                log::error!("store failure: {}", msg);
                AppError::DatabaseError(msg)
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::Unauthorized(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::BadRequest(error.to_string())
    }
}
