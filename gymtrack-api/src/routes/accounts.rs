/// Account endpoints
///
/// Creation is open to super admins (any role, any branch) and managers
/// (trainers and members for their own branch only). Updates and deletes
/// are super-admin operations. Listing and retrieval are open but scoped:
/// managers see their branch, everyone else sees only themself.
///
/// The trainer cap and the username derivation both have check-then-act
/// hazards; the friendly pre-checks here are backed by the branch row
/// lock and the unique index inside [`Account::create`].
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
use gymtrack_shared::auth::password::{hash_password, validate_password_strength};
use gymtrack_shared::models::account::{Account, AccountRole, CreateAccount, UpdateAccount};
use gymtrack_shared::models::activity::ActivityAction;
use gymtrack_shared::models::branch::GymBranch;
use gymtrack_shared::policy::authorize::authorize_account_creation;
use gymtrack_shared::policy::scope::{permits_account, scope_filter};
use gymtrack_shared::policy::validate::{
    check_password_confirmation, check_role_branch_coupling, check_trainer_capacity,
};
use gymtrack_shared::policy::{audit, authorize, Action, Denial, Resource};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use crate::routes::{deserialize_explicit_null, Pagination};

/// Account creation payload
///
/// No username field: the handle is derived from the email local part.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub password_confirm: String,

    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    #[serde(default)]
    pub first_name: String,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    #[serde(default)]
    pub last_name: String,

    pub role: AccountRole,

    pub branch_id: Option<Uuid>,
}

/// Account update payload (super-admin only)
///
/// `branch_id` distinguishes absent ("leave unchanged") from null
/// ("clear"): send the field with a null value to detach the branch.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,

    pub role: Option<AccountRole>,

    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    pub branch_id: Option<Option<Uuid>>,

    pub is_active: Option<bool>,
}

/// GET /v1/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<Account>>> {
    list_with_role(state, auth, pagination, None).await
}

/// GET /v1/accounts/trainers
pub async fn list_trainers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<Account>>> {
    list_with_role(state, auth, pagination, Some(AccountRole::Trainer)).await
}

/// GET /v1/accounts/members
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Vec<Account>>> {
    list_with_role(state, auth, pagination, Some(AccountRole::Member)).await
}

/// Shared listing path; the role narrows within the scope, never beyond it
async fn list_with_role(
    state: AppState,
    auth: AuthContext,
    pagination: Pagination,
    role: Option<AccountRole>,
) -> ApiResult<Json<Vec<Account>>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::Account)?;

    let scope = scope_filter(&actor, Resource::Account);
    let accounts = Account::list_scoped(
        &state.db,
        &scope,
        role,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;

    Ok(Json(accounts))
}

/// POST /v1/accounts
///
/// The full check sequence, in order: coarse role gate (403), object-level
/// creation rules (403), role/branch coupling (400), password confirmation
/// (400), password strength (400), advisory trainer-capacity pre-check
/// (400). [`Account::create`] then re-checks capacity under a branch row
/// lock and derives the username, so concurrent requests cannot exceed the
/// cap or collide on a handle.
pub async fn create_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    let actor = auth.actor();
    authorize(&actor, Action::Create, Resource::Account)?;
    authorize_account_creation(&actor, payload.role, payload.branch_id)?;

    payload.validate()?;
    check_role_branch_coupling(payload.role, payload.branch_id)?;
    check_password_confirmation(&payload.password, &payload.password_confirm)?;

    validate_password_strength(&payload.password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })?;

    if let Some(branch_id) = payload.branch_id {
        let current = GymBranch::trainer_count(&state.db, branch_id).await?;
        check_trainer_capacity(payload.role, current)?;
    }

    let password_hash = hash_password(&payload.password)?;

    let account = Account::create(
        &state.db,
        CreateAccount {
            email: payload.email,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: payload.role,
            branch_id: payload.branch_id,
        },
    )
    .await?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Create,
        "account",
        &account.id.to_string(),
        json!({
            "email": account.email,
            "username": account.username,
            "role": account.role.as_str(),
            "branch_id": account.branch_id,
        }),
    )
    .await;

    tracing::info!(
        account_id = %account.id,
        role = account.role.as_str(),
        "account created"
    );

    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /v1/accounts/:id
pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Account>> {
    let actor = auth.actor();
    authorize(&actor, Action::Read, Resource::Account)?;

    let account = Account::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    if !permits_account(&actor, account.id, account.branch_id) {
        return Err(Denial::branch_mismatch("Account is outside your scope").into());
    }

    Ok(Json(account))
}

/// PATCH /v1/accounts/:id
///
/// Role and branch changes re-run the coupling check against the
/// account's effective (post-update) state; the trainer cap is
/// re-checked inside [`Account::update`] under the branch row lock, so
/// concurrent promotions serialize the same way creations do.
pub async fn update_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountRequest>,
) -> ApiResult<Json<Account>> {
    let actor = auth.actor();
    authorize(&actor, Action::Update, Resource::Account)?;

    payload.validate()?;

    let existing = Account::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    let effective_role = payload.role.unwrap_or(existing.role);
    let effective_branch = match payload.branch_id {
        Some(value) => value,
        None => existing.branch_id,
    };

    check_role_branch_coupling(effective_role, effective_branch)?;

    let account = Account::update(
        &state.db,
        id,
        UpdateAccount {
            first_name: payload.first_name,
            last_name: payload.last_name,
            role: payload.role,
            branch_id: payload.branch_id,
            is_active: payload.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Update,
        "account",
        &account.id.to_string(),
        json!({
            "role": account.role.as_str(),
            "branch_id": account.branch_id,
            "is_active": account.is_active,
        }),
    )
    .await;

    Ok(Json(account))
}

/// DELETE /v1/accounts/:id
///
/// Applies the declared reference semantics atomically: tasks the account
/// created survive with `created_by` cleared, plans it created go with
/// their tasks, tasks assigned to it go too.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let actor = auth.actor();
    authorize(&actor, Action::Delete, Resource::Account)?;

    let deleted = Account::delete(&state.db, id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Account not found".to_string()));
    }

    audit::record(
        &state.db,
        actor.id,
        ActivityAction::Delete,
        "account",
        &id.to_string(),
        json!({}),
    )
    .await;

    tracing::info!(account_id = %id, "account deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_account_request_validation() {
        let valid = CreateAccountRequest {
            email: "jane.doe@gym.com".to_string(),
            password: "Secret123!".to_string(),
            password_confirm: "Secret123!".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: AccountRole::Member,
            branch_id: Some(Uuid::new_v4()),
        };
        assert!(valid.validate().is_ok());

        let short_password = CreateAccountRequest {
            password: "Sh0rt!".to_string(),
            password_confirm: "Sh0rt!".to_string(),
            ..valid
        };
        assert!(short_password.validate().is_err());
    }

    #[test]
    fn test_update_branch_id_explicit_null() {
        // Absent field leaves the branch unchanged
        let unchanged: UpdateAccountRequest =
            serde_json::from_str(r#"{"first_name": "Jane"}"#).unwrap();
        assert!(unchanged.branch_id.is_none());

        // Present-but-null clears it
        let cleared: UpdateAccountRequest =
            serde_json::from_str(r#"{"branch_id": null}"#).unwrap();
        assert_eq!(cleared.branch_id, Some(None));

        // Present with a value sets it
        let id = Uuid::new_v4();
        let set: UpdateAccountRequest =
            serde_json::from_str(&format!(r#"{{"branch_id": "{id}"}}"#)).unwrap();
        assert_eq!(set.branch_id, Some(Some(id)));
    }
}
