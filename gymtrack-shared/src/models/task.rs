/// Workout task model and database operations
///
/// Tasks are assigned to members by trainers, derived from a workout plan.
/// The assignee, the creator, and the plan must all share one branch —
/// enforced in the consistency validator before any write lands here.
/// `created_by` is nullable: deleting the authoring trainer clears the
/// reference instead of deleting or orphaning the task.
///
/// # Status machine
///
/// ```text
/// pending → in_progress → completed
/// ```
///
/// Status moves freely between the three values in this version; only WHO
/// may move it is restricted (the assignee, or a trainer of the branch).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
///
/// CREATE TABLE workout_tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     plan_id UUID NOT NULL REFERENCES workout_plans(id) ON DELETE CASCADE,
///     member_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     status task_status NOT NULL DEFAULT 'pending',
///     due_date TIMESTAMPTZ NOT NULL,
///     created_by UUID REFERENCES accounts(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::policy::scope::ScopeFilter;

/// Progress of a workout task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Assigned, not started
    Pending,

    /// Member is working on it
    InProgress,

    /// Done
    Completed,
}

impl TaskStatus {
    /// Status as stored in the database / wire format
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

/// Workout task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutTask {
    /// Unique task ID
    pub id: Uuid,

    /// Plan the task derives from
    pub plan_id: Uuid,

    /// Member the task is assigned to
    pub member_id: Uuid,

    pub status: TaskStatus,

    pub due_date: DateTime<Utc>,

    /// Trainer who created the task (None if that trainer was removed)
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// `created_by` is forced from the acting trainer by the caller, never
/// taken from the request payload.
#[derive(Debug, Clone)]
pub struct CreateWorkoutTask {
    pub plan_id: Uuid,
    pub member_id: Uuid,
    pub status: TaskStatus,
    pub due_date: DateTime<Utc>,
    pub created_by: Uuid,
}

/// Input for updating a task
///
/// Only non-None fields are written. Which fields a given actor may touch
/// is decided by the action authorizer before this runs (members: status
/// only).
#[derive(Debug, Clone, Default)]
pub struct UpdateWorkoutTask {
    pub plan_id: Option<Uuid>,
    pub member_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str =
    "id, plan_id, member_id, status, due_date, created_by, created_at, updated_at";

const TASK_COLUMNS_QUALIFIED: &str =
    "t.id, t.plan_id, t.member_id, t.status, t.due_date, t.created_by, t.created_at, t.updated_at";

impl WorkoutTask {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateWorkoutTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, WorkoutTask>(&format!(
            "INSERT INTO workout_tasks (plan_id, member_id, status, due_date, created_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(data.plan_id)
        .bind(data.member_id)
        .bind(data.status)
        .bind(data.due_date)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, WorkoutTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM workout_tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists tasks visible under the given scope filter, newest first
    ///
    /// Branch scoping goes through the plan: a task belongs to the branch
    /// of the plan it derives from. `status` optionally narrows within the
    /// scope; it can never widen it.
    pub async fn list_scoped(
        pool: &PgPool,
        scope: &ScopeFilter,
        status: Option<TaskStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = match scope {
            ScopeFilter::All => {
                sqlx::query_as::<_, WorkoutTask>(&format!(
                    "SELECT {TASK_COLUMNS} FROM workout_tasks
                     WHERE ($1::task_status IS NULL OR status = $1)
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::Branch(branch_id) => {
                sqlx::query_as::<_, WorkoutTask>(&format!(
                    "SELECT {TASK_COLUMNS_QUALIFIED} FROM workout_tasks t
                     JOIN workout_plans p ON p.id = t.plan_id
                     WHERE p.branch_id = $1
                       AND ($2::task_status IS NULL OR t.status = $2)
                     ORDER BY t.created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(branch_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::AssignedTo(member_id) => {
                sqlx::query_as::<_, WorkoutTask>(&format!(
                    "SELECT {TASK_COLUMNS} FROM workout_tasks
                     WHERE member_id = $1
                       AND ($2::task_status IS NULL OR status = $2)
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(member_id)
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            _ => Vec::new(),
        };

        Ok(tasks)
    }

    /// Updates a task
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateWorkoutTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, WorkoutTask>(&format!(
            "UPDATE workout_tasks
             SET plan_id = COALESCE($2, plan_id),
                 member_id = COALESCE($3, member_id),
                 status = COALESCE($4, status),
                 due_date = COALESCE($5, due_date),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(data.plan_id)
        .bind(data.member_id)
        .bind(data.status)
        .bind(data.due_date)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task
    ///
    /// Returns true if the task existed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workout_tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
