/// Workout plan model and database operations
///
/// Plans are authored by trainers for their own branch. A branch cannot
/// hold two plans with the same title (case-insensitively); the unique
/// index on `(branch_id, LOWER(title))` is the commit-time arbiter for
/// that rule even when two requests race past the validator's pre-check.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE workout_plans (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     created_by UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
///     branch_id UUID NOT NULL REFERENCES gym_branches(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::policy::scope::ScopeFilter;

/// Name of the unique index enforcing one case-insensitive title per branch
pub const PLAN_TITLE_CONSTRAINT: &str = "workout_plans_branch_title_key";

/// Workout plan model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkoutPlan {
    /// Unique plan ID
    pub id: Uuid,

    /// Plan title (unique per branch, case-insensitive)
    pub title: String,

    pub description: String,

    /// Trainer who authored the plan; only they may mutate it
    pub created_by: Uuid,

    /// Branch the plan belongs to (always the creator's branch)
    pub branch_id: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a plan
///
/// `created_by` and `branch_id` are forced from the acting trainer by the
/// caller; they are never taken from the request payload.
#[derive(Debug, Clone)]
pub struct CreateWorkoutPlan {
    pub title: String,
    pub description: String,
    pub created_by: Uuid,
    pub branch_id: Uuid,
}

/// Input for updating a plan (title/description only)
#[derive(Debug, Clone, Default)]
pub struct UpdateWorkoutPlan {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A plan together with its task count, as returned by list and retrieve
/// endpoints
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WorkoutPlanWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub plan: WorkoutPlan,

    /// Tasks derived from this plan
    pub task_count: i64,
}

const PLAN_COLUMNS: &str = "id, title, description, created_by, branch_id, created_at, updated_at";

const PLAN_WITH_COUNT: &str = r#"
    p.id, p.title, p.description, p.created_by, p.branch_id, p.created_at, p.updated_at,
    (SELECT COUNT(*) FROM workout_tasks t WHERE t.plan_id = p.id) AS task_count
"#;

impl WorkoutPlan {
    /// Creates a new plan
    ///
    /// A duplicate title races to the unique index; the resulting
    /// constraint violation carries [`PLAN_TITLE_CONSTRAINT`].
    pub async fn create(pool: &PgPool, data: CreateWorkoutPlan) -> Result<Self, sqlx::Error> {
        let plan = sqlx::query_as::<_, WorkoutPlan>(&format!(
            "INSERT INTO workout_plans (title, description, created_by, branch_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.created_by)
        .bind(data.branch_id)
        .fetch_one(pool)
        .await?;

        Ok(plan)
    }

    /// Finds a plan by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, WorkoutPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM workout_plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }

    /// Finds a plan by ID together with its task count
    pub async fn find_with_count(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<WorkoutPlanWithCount>, sqlx::Error> {
        let plan = sqlx::query_as::<_, WorkoutPlanWithCount>(&format!(
            "SELECT {PLAN_WITH_COUNT} FROM workout_plans p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }

    /// Lists plans visible under the given scope filter, newest first
    pub async fn list_scoped(
        pool: &PgPool,
        scope: &ScopeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WorkoutPlanWithCount>, sqlx::Error> {
        let plans = match scope {
            ScopeFilter::All => {
                sqlx::query_as::<_, WorkoutPlanWithCount>(&format!(
                    "SELECT {PLAN_WITH_COUNT} FROM workout_plans p
                     ORDER BY p.created_at DESC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::Branch(branch_id) => {
                sqlx::query_as::<_, WorkoutPlanWithCount>(&format!(
                    "SELECT {PLAN_WITH_COUNT} FROM workout_plans p
                     WHERE p.branch_id = $1
                     ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(branch_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            // Members (and anyone else) never see plans directly
            _ => Vec::new(),
        };

        Ok(plans)
    }

    /// Checks whether a branch already has a plan with this title
    /// (case-insensitive), optionally ignoring one plan (for updates)
    pub async fn title_exists(
        pool: &PgPool,
        branch_id: Uuid,
        title: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(
                SELECT 1 FROM workout_plans
                WHERE branch_id = $1
                  AND LOWER(title) = LOWER($2)
                  AND ($3::uuid IS NULL OR id <> $3)
            )",
        )
        .bind(branch_id)
        .bind(title)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Updates a plan's title/description
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateWorkoutPlan,
    ) -> Result<Option<Self>, sqlx::Error> {
        let plan = sqlx::query_as::<_, WorkoutPlan>(&format!(
            "UPDATE workout_plans
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {PLAN_COLUMNS}"
        ))
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .fetch_optional(pool)
        .await?;

        Ok(plan)
    }

    /// Deletes a plan and its tasks in one transaction
    ///
    /// Returns true if the plan existed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM workout_tasks WHERE plan_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM workout_plans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
