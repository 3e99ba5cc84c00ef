/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>` which converts automatically
/// to the right status code.
///
/// The three policy failure kinds stay distinguishable on the wire:
/// authorization denials become 403 with the denial reason as the error
/// code, validation rejections become 400 with per-field details, and
/// missing entities become 404. Unique-constraint races (duplicate email
/// or plan title) surface as 409.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gymtrack_shared::auth::jwt::JwtError;
use gymtrack_shared::auth::middleware::AuthError;
use gymtrack_shared::auth::password::PasswordError;
use gymtrack_shared::models::account::{CreateAccountError, UpdateAccountError};
use gymtrack_shared::models::plan::PLAN_TITLE_CONSTRAINT;
use gymtrack_shared::policy::{Denial, Rejection};
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403) - authorization denial with machine-readable reason
    #[error("Forbidden: {message}")]
    Forbidden {
        reason: &'static str,
        message: String,
    },

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email or plan title
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation failure (400) - per-field details
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Service unavailable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "branch_mismatch", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden { reason, message } => {
                (StatusCode::FORBIDDEN, reason, message, None)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert authorization denials to 403 responses
impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        ApiError::Forbidden {
            reason: denial.reason.as_str(),
            message: denial.message,
        }
    }
}

/// Convert validation rejections to 400 responses
impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: rejection.field,
            message: rejection.message,
        }])
    }
}

/// Convert sqlx errors to API errors
///
/// Unique violations on known constraints become 409; they are the
/// commit-time arbiters for duplicate email/username/title races.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint == "accounts_email_key" {
                        return ApiError::Conflict("Email already exists".to_string());
                    }
                    if constraint == "accounts_username_key" {
                        return ApiError::Conflict("Username already exists".to_string());
                    }
                    if constraint == PLAN_TITLE_CONSTRAINT {
                        return ApiError::Conflict(
                            "A plan with this title already exists in this branch".to_string(),
                        );
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert account-creation failures to API errors
impl From<CreateAccountError> for ApiError {
    fn from(err: CreateAccountError) -> Self {
        match err {
            CreateAccountError::TrainerCapacity => {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "role".to_string(),
                    message: err.to_string(),
                }])
            }
            CreateAccountError::BranchNotFound => {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "branch_id".to_string(),
                    message: err.to_string(),
                }])
            }
            CreateAccountError::UsernameExhausted => ApiError::InternalError(err.to_string()),
            CreateAccountError::Db(e) => e.into(),
        }
    }
}

/// Convert account-update failures to API errors
impl From<UpdateAccountError> for ApiError {
    fn from(err: UpdateAccountError) -> Self {
        match err {
            UpdateAccountError::TrainerCapacity => {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "role".to_string(),
                    message: err.to_string(),
                }])
            }
            UpdateAccountError::Db(e) => e.into(),
        }
    }
}

/// Convert auth middleware errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) => ApiError::BadRequest(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::AccountUnavailable => {
                ApiError::Unauthorized("Account is inactive or removed".to_string())
            }
            AuthError::DatabaseError(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert request-payload validation errors to 400 responses
impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        let errors: Vec<ValidationErrorDetail> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        ApiError::ValidationError(errors)
    }
}
