/// Workout task endpoints
///
/// Tasks are assigned to members by trainers, derived from a plan. The
/// assignee, the creating trainer, and the plan must all share one branch.
/// Members may move their own task's status and nothing else; a payload
/// touching any other field is refused as a whole.
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use gymtrack_shared::auth::middleware::AuthContext;
use gymtrack_shared::models::account::Account;
use gymtrack_shared::models::activity::ActivityAction;
use gymtrack_shared::models::plan::WorkoutPlan;
use gymtrack_shared::models::task::{
    CreateWorkoutTask, TaskStatus, UpdateWorkoutTask, WorkoutTask,
};
use gymtrack_shared::policy::authorize::{
    authorize_task_assignment, authorize_task_delete, authorize_task_update,
};
use gymtrack_shared::policy::scope::{permits_task, scope_filter};
use gymtrack_shared::policy::validate::check_task_consistency;
use gymtrack_shared::policy::{audit, authorize, Action, Denial, Resource};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::routes::{deserialize_explicit_null, Pagination};

/// Task creation payload
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub plan_id: Uuid,
    pub member_id: Uuid,
    pub status: Option<TaskStatus>,
    pub due_date: DateTime<Utc>,
}

/// Task update payload
///
/// Any field besides `status` counts as a non-status change for the
/// member restriction — including a field sent with a null value, and
/// unknown fields are refused outright rather than silently dropped.
/// The double `Option` keeps field presence observable after parsing.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskRequest {
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub plan_id: Option<Option<Uuid>>,

    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub member_id: Option<Option<Uuid>>,

    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl UpdateTaskRequest {
    fn touches_non_status(&self) -> bool {
        self.plan_id.is_some() || self.member_id.is_some() || self.due_date.is_some()
    }
}

/// Status-only update payload for the convenience endpoint
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

/// Task list filters: pagination plus optional status narrowing
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub status: Option<TaskStatus>,
}

impl TaskListQuery {
    fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// GET /v1/tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Vec<WorkoutTask>>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::WorkoutTask)?;

    let scope = scope_filter(&actor, Resource::WorkoutTask);
    let pagination = query.pagination();
    let tasks = WorkoutTask::list_scoped(
        &state.db,
        &scope,
        query.status,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(Json(tasks))
}

/// POST /v1/tasks
///
/// The assignment check runs against the member's branch independently of
/// the plan's, so a cross-branch member denies with 403 even when the plan
/// matches the trainer; the plan/assignee consistency check then covers
/// the remaining combinations as 400s.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<WorkoutTask>)> {
    let actor = auth.actor();
    authorize(&actor, Action::Create, Resource::WorkoutTask)?;

    let plan = WorkoutPlan::find_by_id(&state.db, payload.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout plan not found".to_string()))?;

    let member = Account::find_by_id(&state.db, payload.member_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member account not found".to_string()))?;

    authorize_task_assignment(&actor, member.branch_id)?;
    check_task_consistency(&member, Some(&auth.account), &plan)?;

    let task = WorkoutTask::create(
        &state.db,
        CreateWorkoutTask {
            plan_id: plan.id,
            member_id: member.id,
            status: payload.status.unwrap_or(TaskStatus::Pending),
            due_date: payload.due_date,
            created_by: actor.id,
        },
    )
    .await?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Create,
        "workout_task",
        &task.id.to_string(),
        json!({
            "plan_id": task.plan_id,
            "member_id": task.member_id,
            "due_date": task.due_date,
        }),
    )
    .await;

    tracing::info!(task_id = %task.id, member_id = %task.member_id, "workout task assigned");

    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /v1/tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<WorkoutTask>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::WorkoutTask)?;

    let task = WorkoutTask::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout task not found".to_string()))?;

    let plan = WorkoutPlan::find_by_id(&state.db, task.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout task not found".to_string()))?;

    if !permits_task(&actor, &task, plan.branch_id) {
        return Err(Denial::branch_mismatch("Task is outside your scope").into());
    }

    Ok(Json(task))
}

/// PATCH /v1/tasks/:id
///
/// Reassignments re-run the branch and consistency checks against the
/// effective (post-update) plan and member.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> ApiResult<Json<WorkoutTask>> {
    let actor = auth.actor();
    authorize(&actor, Action::Update, Resource::WorkoutTask)?;

    let task = WorkoutTask::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout task not found".to_string()))?;

    let current_plan = WorkoutPlan::find_by_id(&state.db, task.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout task not found".to_string()))?;

    authorize_task_update(&actor, &task, current_plan.branch_id, payload.touches_non_status())?;

    // Explicit nulls on these non-nullable fields mean "leave unchanged"
    // once authorization has seen the field was touched
    let new_plan_id = payload.plan_id.flatten();
    let new_member_id = payload.member_id.flatten();
    let new_due_date = payload.due_date.flatten();

    // Effective plan and assignee after the update
    let effective_plan = match new_plan_id {
        Some(plan_id) if plan_id != task.plan_id => WorkoutPlan::find_by_id(&state.db, plan_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Workout plan not found".to_string()))?,
        _ => current_plan,
    };

    let effective_member =
        Account::find_by_id(&state.db, new_member_id.unwrap_or(task.member_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Member account not found".to_string()))?;

    if new_member_id.is_some_and(|m| m != task.member_id) {
        authorize_task_assignment(&actor, effective_member.branch_id)?;
    }

    check_task_consistency(&effective_member, None, &effective_plan)?;

    let updated = WorkoutTask::update(
        &state.db,
        id,
        UpdateWorkoutTask {
            plan_id: new_plan_id,
            member_id: new_member_id,
            status: payload.status,
            due_date: new_due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Workout task not found".to_string()))?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Update,
        "workout_task",
        &updated.id.to_string(),
        json!({
            "plan_id": updated.plan_id,
            "member_id": updated.member_id,
            "status": updated.status.as_str(),
            "due_date": updated.due_date,
        }),
    )
    .await;

    Ok(Json(updated))
}

/// PATCH /v1/tasks/:id/status
///
/// Status-only convenience endpoint; takes the same authorization path as
/// a full update with no non-status fields, so it is the one task write
/// members can perform.
pub async fn update_task_status(
    state: State<AppState>,
    auth: Extension<AuthContext>,
    path: Path<Uuid>,
    Json(payload): Json<UpdateTaskStatusRequest>,
) -> ApiResult<Json<WorkoutTask>> {
    update_task(
        state,
        auth,
        path,
        Json(UpdateTaskRequest {
            status: Some(payload.status),
            ..Default::default()
        }),
    )
    .await
}

/// DELETE /v1/tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = auth.actor();
    authorize(&actor, Action::Delete, Resource::WorkoutTask)?;

    let task = WorkoutTask::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workout task not found".to_string()))?;

    authorize_task_delete(&actor, &task)?;

    WorkoutTask::delete(&state.db, id).await?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Delete,
        "workout_task",
        &id.to_string(),
        json!({}),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_non_status() {
        let status_only = UpdateTaskRequest {
            status: Some(TaskStatus::Completed),
            ..Default::default()
        };
        assert!(!status_only.touches_non_status());

        let with_due_date = UpdateTaskRequest {
            status: Some(TaskStatus::Completed),
            due_date: Some(Some(Utc::now())),
            ..Default::default()
        };
        assert!(with_due_date.touches_non_status());

        let reassignment = UpdateTaskRequest {
            member_id: Some(Some(Uuid::new_v4())),
            ..Default::default()
        };
        assert!(reassignment.touches_non_status());
    }

    #[test]
    fn test_null_field_counts_as_touched() {
        // A field sent with a null value is still a touched field; a
        // member smuggling `"due_date": null` past the status-only rule
        // must be refused as a whole, not have the null dropped.
        let payload: UpdateTaskRequest =
            serde_json::from_str(r#"{"status": "completed", "due_date": null}"#).unwrap();
        assert!(payload.touches_non_status());

        let payload: UpdateTaskRequest =
            serde_json::from_str(r#"{"status": "completed", "member_id": null}"#).unwrap();
        assert!(payload.touches_non_status());

        let payload: UpdateTaskRequest =
            serde_json::from_str(r#"{"status": "completed"}"#).unwrap();
        assert!(!payload.touches_non_status());
    }

    #[test]
    fn test_unknown_fields_are_refused() {
        let result = serde_json::from_str::<UpdateTaskRequest>(
            r#"{"status": "completed", "priority": "high"}"#,
        );
        assert!(result.is_err());

        let result = serde_json::from_str::<UpdateTaskStatusRequest>(
            r#"{"status": "completed", "due_date": "2026-01-01T00:00:00Z"}"#,
        );
        assert!(result.is_err());
    }
}
