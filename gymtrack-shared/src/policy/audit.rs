/// Audit recorder
///
/// Appends activity-log entries after successful operations. Recording is
/// fire-and-forget: a failed append is logged and swallowed, never turned
/// into a user-visible error, so a flaky audit sink cannot fail the
/// primary operation.
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::activity::{ActivityAction, ActivityLog, CreateActivityLog};

/// Records an action against an entity
///
/// `changes` is a JSON snapshot of the fields that changed (empty object
/// for deletes and logins).
pub async fn record(
    pool: &PgPool,
    account_id: Uuid,
    action: ActivityAction,
    entity: &str,
    entity_id: &str,
    changes: Value,
) {
    let result = ActivityLog::create(
        pool,
        CreateActivityLog {
            account_id,
            action,
            entity: entity.to_string(),
            entity_id: entity_id.to_string(),
            changes,
        },
    )
    .await;

    if let Err(e) = result {
        tracing::warn!(
            account_id = %account_id,
            action = action.as_str(),
            entity = entity,
            error = %e,
            "failed to record activity log entry"
        );
    }
}

/// Records a successful login
pub async fn record_login(pool: &PgPool, account_id: Uuid) {
    record(
        pool,
        account_id,
        ActivityAction::Login,
        "account",
        &account_id.to_string(),
        Value::Object(Default::default()),
    )
    .await;
}
