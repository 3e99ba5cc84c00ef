/// Activity log endpoint
///
/// Read-only and super-admin only. The log itself is append-only; entries
/// are written by the audit recorder after successful mutations and
/// logins, never through this surface.
use axum::{
    extract::{Query, State},
    Extension, Json,
};

use gymtrack_shared::auth::middleware::AuthContext;
use gymtrack_shared::models::activity::ActivityLog;
use gymtrack_shared::policy::scope::scope_filter;
use gymtrack_shared::policy::{authorize, Action, Resource};

use crate::app::AppState;
use crate::error::ApiResult;
use crate::routes::Pagination;

/// GET /v1/activity
pub async fn list_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::ActivityLog)?;

    let scope = scope_filter(&actor, Resource::ActivityLog);
    let entries =
        ActivityLog::list_scoped(&state.db, &scope, pagination.limit(), pagination.offset())
            .await?;

    Ok(Json(entries))
}
