/// Authentication middleware for Axum
///
/// Validates Bearer tokens from the Authorization header, then loads the
/// account row for the token subject. The policy engine therefore always
/// sees the account's current role and branch: a demoted or deactivated
/// account is cut off on its next request, not at token expiry.
///
/// # Request Extensions
///
/// After successful authentication the middleware adds an [`AuthContext`]
/// carrying the loaded account; handlers extract it with Axum's
/// `Extension` extractor and derive the policy [`Actor`] from it.
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use super::jwt::{validate_access_token, JwtError};
use crate::models::account::Account;
use crate::policy::Actor;

/// Authentication context added to request extensions
///
/// Wraps the account row loaded for the validated token.
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use gymtrack_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.account.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The authenticated account, freshly loaded
    pub account: Account,
}

impl AuthContext {
    pub fn new(account: Account) -> Self {
        Self { account }
    }

    /// The policy-engine view of this authentication
    pub fn actor(&self) -> Actor {
        Actor::from_account(&self.account)
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Account missing or deactivated
    AccountUnavailable,

    /// Database error
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            AuthError::AccountUnavailable => {
                (StatusCode::UNAUTHORIZED, "Account is inactive or removed").into_response()
            }
            AuthError::DatabaseError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// JWT authentication middleware
///
/// Validates the `Authorization: Bearer <token>` header, loads the account
/// for the token subject, and rejects inactive or deleted accounts.
///
/// Returns 401 Unauthorized if the header is missing, the token is invalid
/// or expired, or the account cannot be used.
pub async fn jwt_auth_middleware(
    pool: PgPool,
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let account = Account::find_by_id(&pool, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Database error: {}", e)))?
        .ok_or(AuthError::AccountUnavailable)?;

    if !account.is_active {
        return Err(AuthError::AccountUnavailable);
    }

    req.extensions_mut().insert(AuthContext::new(account));

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// Captures the pool and secret and returns a function usable with
/// `axum::middleware::from_fn`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use gymtrack_shared::auth::middleware::create_jwt_middleware;
/// use sqlx::PgPool;
///
/// fn protected(pool: PgPool) -> Router {
///     Router::new()
///         .route("/protected", get(|| async { "OK" }))
///         .layer(middleware::from_fn(create_jwt_middleware(pool, "secret")))
/// }
/// ```
pub fn create_jwt_middleware(
    pool: PgPool,
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>
       + Clone {
    let secret = secret.into();
    move |req, next| {
        let pool = pool.clone();
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(pool, secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::account::AccountRole;

    #[test]
    fn test_auth_context_actor() {
        let branch = Uuid::new_v4();
        let account = Account {
            id: Uuid::new_v4(),
            email: "trainer@gym.com".to_string(),
            username: "trainer".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: AccountRole::Trainer,
            branch_id: Some(branch),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let context = AuthContext::new(account.clone());
        let actor = context.actor();

        assert_eq!(actor.id, account.id);
        assert_eq!(actor.role, AccountRole::Trainer);
        assert_eq!(actor.branch_id, Some(branch));
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AuthError::AccountUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::DatabaseError("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
