/// Workout plan endpoints
///
/// Plans are authored by trainers for their own branch; only the creator
/// may modify or delete one. Titles are unique per branch without case
/// sensitivity — the validator pre-checks for a friendly 400, the unique
/// index catches the remaining race as a 409.
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
use gymtrack_shared::models::plan::{
    CreateWorkoutPlan, UpdateWorkoutPlan, WorkoutPlan, WorkoutPlanWithCount,
};
use gymtrack_shared::policy::authorize::authorize_plan_mutation;
use gymtrack_shared::policy::scope::{permits_plan, scope_filter};
use gymtrack_shared::policy::validate::{check_plan_creator, check_plan_title_available};
use gymtrack_shared::policy::{audit, authorize, Action, Denial, Resource};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::Pagination;

/// Plan creation payload
///
/// `branch_id` is optional and only accepted when it names the acting
/// trainer's own branch; creator and branch are always forced from the
/// actor on persist.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub branch_id: Option<Uuid>,
}

/// Plan update payload (title/description only)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,
}

/// GET /v1/plans
///
/// Members resolve to an empty scope here; they see tasks, not plans.
pub async fn list_plans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<WorkoutPlanWithCount>>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::WorkoutPlan)?;

    let scope = scope_filter(&actor, Resource::WorkoutPlan);
    let plans =
        WorkoutPlan::list_scoped(&state.db, &scope, pagination.limit(), pagination.offset())
            .await?;

    Ok(Json(plans))
}

/// POST /v1/plans
pub async fn create_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<WorkoutPlan>)> {
    let actor = auth.actor();
    authorize(&actor, Action::Create, Resource::WorkoutPlan)?;

    payload.validate()?;
    check_plan_creator(&actor, payload.branch_id)?;

    let branch_id = actor
        .branch_id
        .ok_or_else(|| Denial::missing_branch("Trainer has no branch assigned"))?;

    check_plan_title_available(&state.db, branch_id, &payload.title, None).await??;

    let plan = WorkoutPlan::create(
        &state.db,
        CreateWorkoutPlan {
            title: payload.title,
            description: payload.description,
            created_by: actor.id,
            branch_id,
        },
    )
    .await?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Create,
        "workout_plan",
        &plan.id.to_string(),
        json!({ "title": plan.title, "branch_id": plan.branch_id }),
    )
    .await;

    tracing::info!(plan_id = %plan.id, branch_id = %plan.branch_id, "workout plan created");

    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /v1/plans/:id
pub async fn get_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkoutPlanWithCount>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::WorkoutPlan)?;

    let plan = WorkoutPlan::find_with_count(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout plan not found".to_string()))?;

    if !permits_plan(&actor, &plan.plan) {
        return Err(Denial::branch_mismatch("Plan is outside your scope").into());
    }

    Ok(Json(plan))
}

/// PATCH /v1/plans/:id
pub async fn update_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> ApiResult<Json<WorkoutPlan>> {
    let actor = auth.actor();
    authorize(&actor, Action::Update, Resource::WorkoutPlan)?;

    payload.validate()?;

    let existing = WorkoutPlan::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout plan not found".to_string()))?;

    authorize_plan_mutation(&actor, &existing)?;

    if let Some(title) = &payload.title {
        check_plan_title_available(&state.db, existing.branch_id, title, Some(id)).await??;
    }

    let plan = WorkoutPlan::update(
        &state.db,
        id,
        UpdateWorkoutPlan {
            title: payload.title,
            description: payload.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Workout plan not found".to_string()))?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Update,
        "workout_plan",
        &plan.id.to_string(),
        json!({ "title": plan.title, "description": plan.description }),
    )
    .await;

    Ok(Json(plan))
}

/// DELETE /v1/plans/:id
///
/// Deletes the plan together with its tasks in one transaction.
pub async fn delete_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = auth.actor();
    authorize(&actor, Action::Delete, Resource::WorkoutPlan)?;

    let existing = WorkoutPlan::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout plan not found".to_string()))?;

    authorize_plan_mutation(&actor, &existing)?;

    WorkoutPlan::delete(&state.db, id).await?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Delete,
        "workout_plan",
        &id.to_string(),
        json!({}),
    )
    .await;

    tracing::info!(plan_id = %id, "workout plan deleted with its tasks");

    Ok(StatusCode::NO_CONTENT)
}
