/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use gymtrack_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = gymtrack_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use gymtrack_shared::auth::middleware::jwt_auth_middleware;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # Health check (public)
/// └── /v1/                          # API v1 (versioned)
///     ├── /auth/
///     │   ├── POST /login           # Login, returns tokens (public)
///     │   ├── POST /refresh         # Refresh access token (public)
///     │   └── GET  /profile         # Current account (authenticated)
///     ├── /branches/                # Gym branches (authenticated, scoped)
///     ├── /accounts/                # Accounts (authenticated, scoped)
///     │   ├── GET /trainers         # Trainer listing
///     │   └── GET /members          # Member listing
///     ├── /plans/                   # Workout plans (authenticated, scoped)
///     ├── /tasks/                   # Workout tasks (authenticated, scoped)
///     └── /activity/                # Activity log (super admin)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route-group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Login and refresh are the only public endpoints
    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let profile_routes = Router::new()
        .route("/profile", get(routes::auth::profile))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let branch_routes = Router::new()
        .route(
            "/",
            get(routes::branches::list_branches).post(routes::branches::create_branch),
        )
        .route(
            "/:id",
            get(routes::branches::get_branch)
                .patch(routes::branches::update_branch)
                .delete(routes::branches::delete_branch),
        );

    let account_routes = Router::new()
        .route(
            "/",
            get(routes::accounts::list_accounts).post(routes::accounts::create_account),
        )
        .route("/trainers", get(routes::accounts::list_trainers))
        .route("/members", get(routes::accounts::list_members))
        .route(
            "/:id",
            get(routes::accounts::get_account)
                .patch(routes::accounts::update_account)
                .delete(routes::accounts::delete_account),
        );

    let plan_routes = Router::new()
        .route(
            "/",
            get(routes::plans::list_plans).post(routes::plans::create_plan),
        )
        .route(
            "/:id",
            get(routes::plans::get_plan)
                .patch(routes::plans::update_plan)
                .delete(routes::plans::delete_plan),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_task_status));

    let activity_routes = Router::new().route("/", get(routes::activity::list_activity));

    // Everything except login/refresh/health requires a valid token
    let protected = Router::new()
        .nest("/branches", branch_routes)
        .nest("/accounts", account_routes)
        .nest("/plans", plan_routes)
        .nest("/tasks", task_routes)
        .nest("/activity", activity_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/auth", profile_routes)
        .merge(protected);

    let cors = build_cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Configures CORS from the allowed-origins list
///
/// A literal "*" keeps the permissive development behavior; anything else
/// restricts origins, methods, and headers.
fn build_cors_layer(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    }
}

/// JWT authentication middleware layer
///
/// Delegates to the shared middleware, which validates the token, loads
/// the account row, and injects an `AuthContext` extension.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let secret = state.jwt_secret().to_string();

    jwt_auth_middleware(state.db.clone(), secret, req, next)
        .await
        .map_err(crate::error::ApiError::from)
}
