/// Gym branch model and database operations
///
/// A branch is the tenancy root: every non-super-admin account and every
/// workout plan belongs to exactly one branch, and tasks belong to a branch
/// through their plan.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE gym_branches (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     location VARCHAR(255) NOT NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::policy::scope::ScopeFilter;

/// A gym branch/location
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GymBranch {
    /// Unique branch ID
    pub id: Uuid,

    /// Branch name
    pub name: String,

    /// Physical location
    pub location: String,

    /// Whether the branch is operating
    pub is_active: bool,

    /// When the branch was created
    pub created_at: DateTime<Utc>,

    /// When the branch was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGymBranch {
    pub name: String,
    pub location: String,
}

/// Input for updating a branch
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGymBranch {
    pub name: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

/// A branch together with its trainer/member headcounts, as returned by
/// list and retrieve endpoints
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GymBranchWithCounts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub branch: GymBranch,

    /// Accounts with role = trainer in this branch
    pub trainer_count: i64,

    /// Accounts with role = member in this branch
    pub member_count: i64,
}

const BRANCH_COLUMNS: &str = "id, name, location, is_active, created_at, updated_at";

const BRANCH_WITH_COUNTS: &str = r#"
    b.id, b.name, b.location, b.is_active, b.created_at, b.updated_at,
    (SELECT COUNT(*) FROM accounts a WHERE a.branch_id = b.id AND a.role = 'trainer') AS trainer_count,
    (SELECT COUNT(*) FROM accounts a WHERE a.branch_id = b.id AND a.role = 'member') AS member_count
"#;

impl GymBranch {
    /// Creates a new branch
    pub async fn create(pool: &PgPool, data: CreateGymBranch) -> Result<Self, sqlx::Error> {
        let branch = sqlx::query_as::<_, GymBranch>(&format!(
            "INSERT INTO gym_branches (name, location) VALUES ($1, $2) RETURNING {BRANCH_COLUMNS}"
        ))
        .bind(data.name)
        .bind(data.location)
        .fetch_one(pool)
        .await?;

        Ok(branch)
    }

    /// Finds a branch by ID together with its headcounts
    pub async fn find_with_counts(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<GymBranchWithCounts>, sqlx::Error> {
        let branch = sqlx::query_as::<_, GymBranchWithCounts>(&format!(
            "SELECT {BRANCH_WITH_COUNTS} FROM gym_branches b WHERE b.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(branch)
    }

    /// Lists branches visible under the given scope filter, newest first
    ///
    /// The filter is the innermost restriction: pagination applies after it
    /// and callers cannot widen it.
    pub async fn list_scoped(
        pool: &PgPool,
        scope: &ScopeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GymBranchWithCounts>, sqlx::Error> {
        let branches = match scope {
            ScopeFilter::All => {
                sqlx::query_as::<_, GymBranchWithCounts>(&format!(
                    "SELECT {BRANCH_WITH_COUNTS} FROM gym_branches b
                     ORDER BY b.created_at DESC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::Branch(branch_id) => {
                sqlx::query_as::<_, GymBranchWithCounts>(&format!(
                    "SELECT {BRANCH_WITH_COUNTS} FROM gym_branches b
                     WHERE b.id = $1
                     ORDER BY b.created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(branch_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            _ => Vec::new(),
        };

        Ok(branches)
    }

    /// Updates a branch
    ///
    /// Returns the updated branch if found, None otherwise.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateGymBranch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let branch = sqlx::query_as::<_, GymBranch>(&format!(
            "UPDATE gym_branches
             SET name = COALESCE($2, name),
                 location = COALESCE($3, location),
                 is_active = COALESCE($4, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {BRANCH_COLUMNS}"
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.location)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await?;

        Ok(branch)
    }

    /// Deletes a branch and everything it owns
    ///
    /// The cascade is applied explicitly, in one transaction: tasks touching
    /// the branch (through its plans or its members), then plans, then
    /// accounts, then the branch itself. A partially applied cascade is an
    /// invariant violation, so any failure rolls the whole delete back.
    ///
    /// Returns true if the branch existed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "DELETE FROM workout_tasks
             WHERE plan_id IN (SELECT id FROM workout_plans WHERE branch_id = $1)
                OR member_id IN (SELECT id FROM accounts WHERE branch_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM workout_plans WHERE branch_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM accounts WHERE branch_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM gym_branches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts trainers currently assigned to a branch
    pub async fn trainer_count(pool: &PgPool, branch_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM accounts WHERE branch_id = $1 AND role = 'trainer'",
        )
        .bind(branch_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_branch_default_is_empty() {
        let update = UpdateGymBranch::default();
        assert!(update.name.is_none());
        assert!(update.location.is_none());
        assert!(update.is_active.is_none());
    }

    // Database operations are exercised against a live PostgreSQL instance;
    // the cascade path is covered by the branch deletion tests there.
}
