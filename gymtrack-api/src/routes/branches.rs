/// Gym branch endpoints
///
/// Branch mutation is super-admin only; reading is open to every
/// authenticated account but scoped, so non-admins only ever see their
/// own branch. Deleting a branch cascades to everything it owns.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use gymtrack_shared::auth::middleware::AuthContext;
use gymtrack_shared::models::activity::ActivityAction;
use gymtrack_shared::models::branch::{
    CreateGymBranch, GymBranch, GymBranchWithCounts, UpdateGymBranch,
};
use gymtrack_shared::policy::scope::{permits_branch, scope_filter};
use gymtrack_shared::policy::{audit, authorize, Action, Denial, Resource};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::Pagination;

/// Branch creation payload
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 255, message = "Location must be 1-255 characters"))]
    pub location: String,
}

/// Branch update payload
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBranchRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Location must be 1-255 characters"))]
    pub location: Option<String>,

    pub is_active: Option<bool>,
}

/// GET /v1/branches
pub async fn list_branches(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<GymBranchWithCounts>>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::Branch)?;

    let scope = scope_filter(&actor, Resource::Branch);
    let branches =
        GymBranch::list_scoped(&state.db, &scope, pagination.limit(), pagination.offset()).await?;

    Ok(Json(branches))
}

/// POST /v1/branches
pub async fn create_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateBranchRequest>,
) -> ApiResult<(StatusCode, Json<GymBranch>)> {
    let actor = auth.actor();
    authorize(&actor, Action::Create, Resource::Branch)?;

    payload.validate()?;

    let branch = GymBranch::create(
        &state.db,
        CreateGymBranch {
            name: payload.name,
            location: payload.location,
        },
    )
    .await?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Create,
        "gym_branch",
        &branch.id.to_string(),
        json!({ "name": branch.name, "location": branch.location }),
    )
    .await;

    tracing::info!(branch_id = %branch.id, "gym branch created");

    Ok((StatusCode::CREATED, Json(branch)))
}

/// GET /v1/branches/:id
///
/// An out-of-scope branch answers 403, not 404: the coarse read gate
/// admits every role, so existence is not being hidden here.
pub async fn get_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GymBranchWithCounts>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::Branch)?;

    let branch = GymBranch::find_with_counts(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Gym branch not found".to_string()))?;

    if !permits_branch(&actor, Resource::Branch, branch.branch.id) {
        return Err(Denial::branch_mismatch("Branch is outside your scope").into());
    }

    Ok(Json(branch))
}

/// PATCH /v1/branches/:id
pub async fn update_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBranchRequest>,
) -> ApiResult<Json<GymBranch>> {
    let actor = auth.actor();
    authorize(&actor, Action::Update, Resource::Branch)?;

    payload.validate()?;

    let branch = GymBranch::update(
        &state.db,
        id,
        UpdateGymBranch {
            name: payload.name,
            location: payload.location,
            is_active: payload.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Gym branch not found".to_string()))?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Update,
        "gym_branch",
        &branch.id.to_string(),
        json!({ "name": branch.name, "location": branch.location, "is_active": branch.is_active }),
    )
    .await;

    Ok(Json(branch))
}

/// DELETE /v1/branches/:id
///
/// Cascades to the branch's accounts, plans, and tasks atomically.
pub async fn delete_branch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = auth.actor();
    authorize(&actor, Action::Delete, Resource::Branch)?;

    let deleted = GymBranch::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Gym branch not found".to_string()));
    }

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Delete,
        "gym_branch",
        &id.to_string(),
        json!({}),
    )
    .await;

    tracing::info!(branch_id = %id, "gym branch deleted with cascade");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_branch_request_validation() {
        let valid = CreateBranchRequest {
            name: "Downtown".to_string(),
            location: "12 Main St".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_name = CreateBranchRequest {
            name: String::new(),
            location: "12 Main St".to_string(),
        };
        assert!(empty_name.validate().is_err());
    }
}
