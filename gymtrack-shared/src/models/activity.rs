/// Activity log model and database operations
///
/// The log is append-only: rows are inserted after a mutation commits and
/// are never updated or deleted through the application. Each row names
/// who acted, what they did, what entity it touched, and a JSON snapshot
/// of the changed fields.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::policy::scope::ScopeFilter;

/// Kind of action recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Login,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Delete => "delete",
            ActivityAction::Login => "login",
        }
    }
}

/// One recorded action
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    /// Unique log entry ID
    pub id: Uuid,

    /// Account that performed the action
    pub account_id: Uuid,

    pub action: ActivityAction,

    /// Entity kind, e.g. "account", "workout_plan"
    pub entity: String,

    /// ID of the touched entity, stringly typed so deleted rows keep
    /// their reference
    pub entity_id: String,

    /// JSON snapshot of the changed fields
    pub changes: Value,

    pub created_at: DateTime<Utc>,
}

/// Input for appending a log entry
#[derive(Debug, Clone)]
pub struct CreateActivityLog {
    pub account_id: Uuid,
    pub action: ActivityAction,
    pub entity: String,
    pub entity_id: String,
    pub changes: Value,
}

const LOG_COLUMNS: &str = "id, account_id, action, entity, entity_id, changes, created_at";

impl ActivityLog {
    /// Appends a log entry
    pub async fn create(pool: &PgPool, data: CreateActivityLog) -> Result<Self, sqlx::Error> {
        let entry = sqlx::query_as::<_, ActivityLog>(&format!(
            "INSERT INTO activity_logs (account_id, action, entity, entity_id, changes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {LOG_COLUMNS}"
        ))
        .bind(data.account_id)
        .bind(data.action)
        .bind(data.entity)
        .bind(data.entity_id)
        .bind(data.changes)
        .fetch_one(pool)
        .await?;

        Ok(entry)
    }

    /// Lists log entries visible under the given scope filter, newest first
    ///
    /// Branch scoping follows the acting account: a manager sees actions
    /// performed by accounts of their branch.
    pub async fn list_scoped(
        pool: &PgPool,
        scope: &ScopeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let entries = match scope {
            ScopeFilter::All => {
                sqlx::query_as::<_, ActivityLog>(&format!(
                    "SELECT {LOG_COLUMNS} FROM activity_logs
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2"
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::Branch(branch_id) => {
                sqlx::query_as::<_, ActivityLog>(&format!(
                    "SELECT {LOG_COLUMNS} FROM activity_logs
                     WHERE account_id IN (SELECT id FROM accounts WHERE branch_id = $1)
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(branch_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::OwnAccount(account_id) => {
                sqlx::query_as::<_, ActivityLog>(&format!(
                    "SELECT {LOG_COLUMNS} FROM activity_logs
                     WHERE account_id = $1
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(account_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            _ => Vec::new(),
        };

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_as_str() {
        assert_eq!(ActivityAction::Create.as_str(), "create");
        assert_eq!(ActivityAction::Update.as_str(), "update");
        assert_eq!(ActivityAction::Delete.as_str(), "delete");
        assert_eq!(ActivityAction::Login.as_str(), "login");
    }
}
