/// Account model and database operations
///
/// Accounts carry the role that drives every authorization decision. Role
/// and branch presence are coupled: `super_admin` is the only role without
/// a branch, every other role must have one (enforced by a CHECK constraint
/// and re-validated in the policy layer).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_role AS ENUM ('super_admin', 'gym_manager', 'trainer', 'member');
///
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     username VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     role account_role NOT NULL DEFAULT 'member',
///     branch_id UUID REFERENCES gym_branches(id) ON DELETE CASCADE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Emails and usernames are unique (emails case-insensitively, via a
/// functional index on `LOWER(email)`).
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::policy::scope::ScopeFilter;

/// Maximum number of trainers per gym branch (hard cap)
pub const TRAINER_CAP: i64 = 3;

/// How many suffixed username candidates to try before giving up
const USERNAME_ATTEMPTS: u32 = 100;

/// Role of an account
///
/// The closed set of roles the authorization engine dispatches on.
/// `SuperAdmin` is global; the other three are branch-scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Global operator: manages branches and every account
    SuperAdmin,

    /// Runs one branch: creates trainers and members for it
    GymManager,

    /// Creates workout plans and assigns tasks within their branch
    Trainer,

    /// Receives tasks; may update only their own task status
    Member,
}

impl AccountRole {
    /// Role as stored in the database / wire format
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::SuperAdmin => "super_admin",
            AccountRole::GymManager => "gym_manager",
            AccountRole::Trainer => "trainer",
            AccountRole::Member => "member",
        }
    }

    /// Whether this role requires a branch assignment
    ///
    /// Inverse of the super-admin rule: the top role must NOT have one.
    pub fn requires_branch(&self) -> bool {
        !matches!(self, AccountRole::SuperAdmin)
    }
}

/// Account model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID
    pub id: Uuid,

    /// Email address (unique, case-insensitive)
    pub email: String,

    /// Unique handle derived from the email local part
    pub username: String,

    /// Argon2id password hash, never serialized out
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    /// Role driving authorization
    pub role: AccountRole,

    /// Branch assignment (None only for super_admin)
    pub branch_id: Option<Uuid>,

    /// Inactive accounts cannot log in
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account
///
/// The username is not an input: it is derived from the email local part,
/// with an integer suffix on collision.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: AccountRole,
    pub branch_id: Option<Uuid>,
}

/// Input for updating an account (super-admin only operation)
///
/// Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<AccountRole>,
    pub branch_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}

/// Error creating an account
///
/// Capacity and missing-branch failures are validation outcomes distinct
/// from store errors; callers map them to 400-class responses.
#[derive(Debug, thiserror::Error)]
pub enum CreateAccountError {
    /// The branch already holds the maximum number of trainers
    #[error("maximum {TRAINER_CAP} trainers allowed per gym branch")]
    TrainerCapacity,

    /// The referenced branch does not exist
    #[error("gym branch not found")]
    BranchNotFound,

    /// No free username candidate was found
    #[error("could not derive a unique username from email")]
    UsernameExhausted,

    /// Underlying database error (unique violations included)
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Error updating an account
///
/// Like creation, the capacity failure is a validation outcome distinct
/// from store errors.
#[derive(Debug, thiserror::Error)]
pub enum UpdateAccountError {
    /// The target branch already holds the maximum number of trainers
    #[error("maximum {TRAINER_CAP} trainers allowed per gym branch")]
    TrainerCapacity,

    /// Underlying database error
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const ACCOUNT_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
                               role, branch_id, is_active, created_at, updated_at";

impl Account {
    /// Creates a new account with capacity and handle guarantees
    ///
    /// Runs in one transaction:
    ///
    /// 1. If a branch is referenced, its row is locked (`FOR UPDATE`) so
    ///    concurrent creations against the same branch serialize. A missing
    ///    branch surfaces as [`CreateAccountError::BranchNotFound`].
    /// 2. For trainers, the trainer count is re-checked under that lock —
    ///    two concurrent requests cannot both slip past the cap.
    /// 3. The username is derived from the email local part; on collision an
    ///    increasing suffix is tried (`jane`, `jane1`, `jane2`, ...). The
    ///    unique index on `username` is the final arbiter, so even a
    ///    concurrent insert of the same handle cannot produce duplicates.
    ///
    /// Role/branch coupling and password confirmation are checked by the
    /// consistency validator before this is called.
    pub async fn create(pool: &PgPool, data: CreateAccount) -> Result<Self, CreateAccountError> {
        let mut tx = pool.begin().await?;

        if let Some(branch_id) = data.branch_id {
            let locked: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM gym_branches WHERE id = $1 FOR UPDATE")
                    .bind(branch_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            if locked.is_none() {
                return Err(CreateAccountError::BranchNotFound);
            }

            if data.role == AccountRole::Trainer {
                let (count,): (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM accounts WHERE branch_id = $1 AND role = 'trainer'",
                )
                .bind(branch_id)
                .fetch_one(&mut *tx)
                .await?;

                if count >= TRAINER_CAP {
                    return Err(CreateAccountError::TrainerCapacity);
                }
            }
        }

        let base = username_base(&data.email);
        let taken: Vec<(String,)> =
            sqlx::query_as("SELECT username FROM accounts WHERE username LIKE $1 || '%'")
                .bind(&base)
                .fetch_all(&mut *tx)
                .await?;
        let taken: std::collections::HashSet<String> =
            taken.into_iter().map(|(u,)| u).collect();

        // The prefix scan plus the unique index make this loop terminate
        // quickly; the cap is a guard against pathological inputs.
        let mut last_err = None;
        for candidate in username_candidates(&base).take(USERNAME_ATTEMPTS as usize) {
            if taken.contains(&candidate) {
                continue;
            }

            let inserted = sqlx::query_as::<_, Account>(&format!(
                "INSERT INTO accounts
                     (email, username, password_hash, first_name, last_name, role, branch_id)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {ACCOUNT_COLUMNS}"
            ))
            .bind(&data.email)
            .bind(&candidate)
            .bind(&data.password_hash)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(data.role)
            .bind(data.branch_id)
            .fetch_one(&mut *tx)
            .await;

            match inserted {
                Ok(account) => {
                    tx.commit().await?;
                    return Ok(account);
                }
                // Lost the username race to a concurrent insert: try the
                // next candidate. Any other violation (email) propagates.
                Err(e) if is_unique_violation(&e, "accounts_username_key") => {
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_err
            .map(CreateAccountError::Db)
            .unwrap_or(CreateAccountError::UsernameExhausted))
    }

    /// Finds an account by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }

    /// Finds an account by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(account)
    }

    /// Lists accounts visible under the given scope filter, newest first
    ///
    /// `role` optionally narrows within the scope (used by the trainer and
    /// member listings); it can never widen it.
    pub async fn list_scoped(
        pool: &PgPool,
        scope: &ScopeFilter,
        role: Option<AccountRole>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let accounts = match scope {
            ScopeFilter::All => {
                sqlx::query_as::<_, Account>(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE ($1::account_role IS NULL OR role = $1)
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                ))
                .bind(role)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::Branch(branch_id) => {
                sqlx::query_as::<_, Account>(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE branch_id = $1
                       AND ($2::account_role IS NULL OR role = $2)
                     ORDER BY created_at DESC LIMIT $3 OFFSET $4"
                ))
                .bind(branch_id)
                .bind(role)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await?
            }
            ScopeFilter::OwnAccount(account_id) => {
                sqlx::query_as::<_, Account>(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM accounts
                     WHERE id = $1
                       AND ($2::account_role IS NULL OR role = $2)"
                ))
                .bind(account_id)
                .bind(role)
                .fetch_all(pool)
                .await?
            }
            _ => Vec::new(),
        };

        Ok(accounts)
    }

    /// Updates an account
    ///
    /// Runs in one transaction. When the update makes the account a
    /// trainer of a branch it was not already counted in (role change,
    /// branch move, or both), that branch row is locked and the trainer
    /// count re-checked under the lock — the same serialization point
    /// creation uses, so concurrent promotions cannot push a branch past
    /// the cap.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAccount,
    ) -> Result<Option<Self>, UpdateAccountError> {
        let mut tx = pool.begin().await?;

        let current: Option<(AccountRole, Option<Uuid>)> =
            sqlx::query_as("SELECT role, branch_id FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((current_role, current_branch)) = current else {
            return Ok(None);
        };

        let effective_role = data.role.unwrap_or(current_role);
        let effective_branch = match data.branch_id {
            Some(value) => value,
            None => current_branch,
        };

        if effective_role == AccountRole::Trainer {
            if let Some(branch_id) = effective_branch {
                let already_counted =
                    current_role == AccountRole::Trainer && current_branch == Some(branch_id);

                if !already_counted {
                    sqlx::query_as::<_, (Uuid,)>(
                        "SELECT id FROM gym_branches WHERE id = $1 FOR UPDATE",
                    )
                    .bind(branch_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                    let (count,): (i64,) = sqlx::query_as(
                        "SELECT COUNT(*) FROM accounts WHERE branch_id = $1 AND role = 'trainer'",
                    )
                    .bind(branch_id)
                    .fetch_one(&mut *tx)
                    .await?;

                    if count >= TRAINER_CAP {
                        return Err(UpdateAccountError::TrainerCapacity);
                    }
                }
            }
        }

        // branch_id uses a sentinel pair (set_branch, branch value) because
        // COALESCE cannot distinguish "leave unchanged" from "clear".
        let (set_branch, branch_value) = match data.branch_id {
            Some(value) => (true, value),
            None => (false, None),
        };

        let account = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 role = COALESCE($4, role),
                 branch_id = CASE WHEN $5 THEN $6 ELSE branch_id END,
                 is_active = COALESCE($7, is_active),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.role)
        .bind(set_branch)
        .bind(branch_value)
        .bind(data.is_active)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(account)
    }

    /// Deletes an account, applying the declared reference semantics
    ///
    /// In one transaction:
    /// - tasks the account created keep existing with `created_by` cleared
    ///   (set-null-on-delete);
    /// - plans the account created are deleted together with their tasks
    ///   (cascade);
    /// - tasks assigned to the account are deleted (cascade);
    /// - finally the account row.
    ///
    /// Returns true if the account existed.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE workout_tasks SET created_by = NULL WHERE created_by = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "DELETE FROM workout_tasks
             WHERE member_id = $1
                OR plan_id IN (SELECT id FROM workout_plans WHERE created_by = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM workout_plans WHERE created_by = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Base username: the email local part, lowercased
pub fn username_base(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or(email)
        .to_ascii_lowercase()
}

/// Candidate handles for a base: `base`, `base1`, `base2`, ...
pub fn username_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    let first = std::iter::once(base.to_string());
    first.chain((1u32..).map(move |n| format!("{base}{n}")))
}

/// Checks whether a sqlx error is a unique violation on a named constraint
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(AccountRole::SuperAdmin.as_str(), "super_admin");
        assert_eq!(AccountRole::GymManager.as_str(), "gym_manager");
        assert_eq!(AccountRole::Trainer.as_str(), "trainer");
        assert_eq!(AccountRole::Member.as_str(), "member");
    }

    #[test]
    fn test_role_branch_requirement() {
        assert!(!AccountRole::SuperAdmin.requires_branch());
        assert!(AccountRole::GymManager.requires_branch());
        assert!(AccountRole::Trainer.requires_branch());
        assert!(AccountRole::Member.requires_branch());
    }

    #[test]
    fn test_username_base() {
        assert_eq!(username_base("jane.doe@gym.com"), "jane.doe");
        assert_eq!(username_base("Trainer1@Gym.com"), "trainer1");
        // No '@' falls back to the whole string
        assert_eq!(username_base("plain"), "plain");
    }

    #[test]
    fn test_username_candidates_sequence() {
        let candidates: Vec<String> = username_candidates("jane").take(4).collect();
        assert_eq!(candidates, vec!["jane", "jane1", "jane2", "jane3"]);
    }

    #[test]
    fn test_update_account_branch_sentinel() {
        // None = leave unchanged, Some(None) = clear
        let unchanged = UpdateAccount::default();
        assert!(unchanged.branch_id.is_none());

        let cleared = UpdateAccount {
            branch_id: Some(None),
            ..Default::default()
        };
        assert_eq!(cleared.branch_id, Some(None));
    }
}
