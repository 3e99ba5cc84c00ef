/// Authentication endpoints: login, token refresh, and profile
///
/// Login verifies credentials against the Argon2id hash and issues an
/// access/refresh token pair. Failed logins all answer with the same
/// message so the response does not reveal whether the email exists.
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use gymtrack_shared::auth::jwt::{create_token, refresh_access_token, Claims, TokenType};
use gymtrack_shared::auth::middleware::AuthContext;
use gymtrack_shared::auth::password::verify_password;
use gymtrack_shared::models::account::{Account, AccountRole};
use gymtrack_shared::policy::audit;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response with token pair
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account_id: Uuid,
    pub role: AccountRole,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token refresh request payload
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// POST /v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    payload.validate()?;

    let account = Account::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !account.is_active {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !verify_password(&payload.password, &account.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let secret = state.jwt_secret();
    let access_token = create_token(&Claims::new(account.id, TokenType::Access), secret)?;
    let refresh_token = create_token(&Claims::new(account.id, TokenType::Refresh), secret)?;

    audit::record_login(&state.db, account.id).await;

    tracing::info!(account_id = %account.id, role = account.role.as_str(), "account logged in");

    Ok(Json(LoginResponse {
        account_id: account.id,
        role: account.role,
        access_token,
        refresh_token,
    }))
}

/// POST /v1/auth/refresh
///
/// Exchanges a valid refresh token for a fresh access token. The refresh
/// token itself is not rotated.
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = refresh_access_token(&payload.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// GET /v1/auth/profile
///
/// Returns the authenticated account (password hash is never serialized).
pub async fn profile(Extension(auth): Extension<AuthContext>) -> Json<Account> {
    Json(auth.account)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_validation() {
        let valid = LoginRequest {
            email: "manager@gym.com".to_string(),
            password: "Secret123!".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = LoginRequest {
            email: "not-an-email".to_string(),
            password: "Secret123!".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let empty_password = LoginRequest {
            email: "manager@gym.com".to_string(),
            password: String::new(),
        };
        assert!(empty_password.validate().is_err());
    }
}
