/// Consistency validator
///
/// Checks cross-entity invariants on create and update payloads before
/// anything is written. A failed check produces a [`Rejection`] naming the
/// offending field — the 400-class failure, disjoint from authorization
/// denials (403) and from not-found.
///
/// Most checks here are pure and take already-fetched entity state. The
/// two check-then-act hazards (trainer capacity, duplicate plan title) are
/// pre-checked here for a friendly error but finally arbitrated by the
/// store: capacity under a branch row lock in [`Account::create`], titles
/// by the unique index on `(branch_id, LOWER(title))`.
use sqlx::PgPool;
use uuid::Uuid;

use super::Actor;
use crate::models::account::{Account, AccountRole, TRAINER_CAP};
use crate::models::plan::WorkoutPlan;

/// A validation rejection: offending field plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct Rejection {
    pub field: String,
    pub message: String,
}

impl Rejection {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Rejection {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Checks the role/branch coupling for an account payload
///
/// Super admins must have no branch; every other role must have one.
pub fn check_role_branch_coupling(
    role: AccountRole,
    branch_id: Option<Uuid>,
) -> Result<(), Rejection> {
    match (role.requires_branch(), branch_id) {
        (true, None) => Err(Rejection::new(
            "branch_id",
            format!("Role {} requires a gym branch", role.as_str()),
        )),
        (false, Some(_)) => Err(Rejection::new(
            "branch_id",
            "Super admin accounts cannot be assigned to a branch",
        )),
        _ => Ok(()),
    }
}

/// Checks that the two submitted password fields match exactly
///
/// Byte comparison, case-sensitive.
pub fn check_password_confirmation(password: &str, confirm: &str) -> Result<(), Rejection> {
    if password != confirm {
        return Err(Rejection::new("password_confirm", "Passwords do not match"));
    }

    Ok(())
}

/// Checks the trainer cap against an already-fetched count
///
/// Advisory pre-check: [`Account::create`] re-counts under a branch row
/// lock, so a race past this check still cannot exceed the cap.
pub fn check_trainer_capacity(role: AccountRole, current_trainers: i64) -> Result<(), Rejection> {
    if role == AccountRole::Trainer && current_trainers >= TRAINER_CAP {
        return Err(Rejection::new(
            "role",
            format!("Maximum {TRAINER_CAP} trainers allowed per gym branch"),
        ));
    }

    Ok(())
}

/// Checks a plan payload against the acting trainer
///
/// The creator must currently hold the trainer role, and an explicitly
/// supplied branch must be the trainer's own. On persist the caller forces
/// creator and branch from the actor regardless of payload.
pub fn check_plan_creator(actor: &Actor, supplied_branch: Option<Uuid>) -> Result<(), Rejection> {
    if actor.role != AccountRole::Trainer {
        return Err(Rejection::new(
            "created_by",
            "Workout plans can only be created by trainers",
        ));
    }

    if let Some(branch) = supplied_branch {
        if actor.branch_id != Some(branch) {
            return Err(Rejection::new(
                "branch_id",
                "Trainers can only create plans for their own branch",
            ));
        }
    }

    Ok(())
}

/// Checks a task payload against fetched assignee/creator/plan state
///
/// The assignee must be a member of the plan's branch; the creator, when
/// present, must be a trainer of the plan's branch.
pub fn check_task_consistency(
    assignee: &Account,
    creator: Option<&Account>,
    plan: &WorkoutPlan,
) -> Result<(), Rejection> {
    if assignee.role != AccountRole::Member {
        return Err(Rejection::new(
            "member_id",
            "Tasks can only be assigned to members",
        ));
    }

    if assignee.branch_id != Some(plan.branch_id) {
        return Err(Rejection::new(
            "member_id",
            "Assigned member must belong to the plan's branch",
        ));
    }

    if let Some(creator) = creator {
        if creator.role != AccountRole::Trainer {
            return Err(Rejection::new(
                "created_by",
                "Tasks can only be created by trainers",
            ));
        }

        if creator.branch_id != Some(plan.branch_id) {
            return Err(Rejection::new(
                "created_by",
                "Creating trainer must belong to the plan's branch",
            ));
        }
    }

    Ok(())
}

/// Checks that a branch does not already hold a plan with this title
/// (case-insensitive), optionally ignoring one plan for updates
///
/// Advisory pre-check over current store state; the unique index is the
/// commit-time arbiter when two creations race.
pub async fn check_plan_title_available(
    pool: &PgPool,
    branch_id: Uuid,
    title: &str,
    exclude: Option<Uuid>,
) -> Result<Result<(), Rejection>, sqlx::Error> {
    if WorkoutPlan::title_exists(pool, branch_id, title, exclude).await? {
        return Ok(Err(Rejection::new(
            "title",
            "A plan with this title already exists in this branch",
        )));
    }

    Ok(Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: AccountRole, branch_id: Option<Uuid>) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
            branch_id,
        }
    }

    fn account(role: AccountRole, branch_id: Option<Uuid>) -> Account {
        use chrono::Utc;

        Account {
            id: Uuid::new_v4(),
            email: "someone@gym.com".to_string(),
            username: "someone".to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role,
            branch_id,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn plan(branch_id: Uuid) -> WorkoutPlan {
        use chrono::Utc;

        WorkoutPlan {
            id: Uuid::new_v4(),
            title: "Cardio".to_string(),
            description: String::new(),
            created_by: Uuid::new_v4(),
            branch_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_branch_coupling() {
        let branch = Uuid::new_v4();

        assert!(check_role_branch_coupling(AccountRole::SuperAdmin, None).is_ok());
        assert!(check_role_branch_coupling(AccountRole::Trainer, Some(branch)).is_ok());

        let rejection =
            check_role_branch_coupling(AccountRole::SuperAdmin, Some(branch)).unwrap_err();
        assert_eq!(rejection.field, "branch_id");

        let rejection = check_role_branch_coupling(AccountRole::Member, None).unwrap_err();
        assert_eq!(rejection.field, "branch_id");
    }

    #[test]
    fn test_password_confirmation_is_byte_exact() {
        assert!(check_password_confirmation("Secret123!", "Secret123!").is_ok());
        assert!(check_password_confirmation("Secret123!", "secret123!").is_err());
        assert!(check_password_confirmation("Secret123!", "Secret123! ").is_err());
    }

    #[test]
    fn test_trainer_capacity() {
        assert!(check_trainer_capacity(AccountRole::Trainer, 0).is_ok());
        assert!(check_trainer_capacity(AccountRole::Trainer, TRAINER_CAP - 1).is_ok());

        let rejection = check_trainer_capacity(AccountRole::Trainer, TRAINER_CAP).unwrap_err();
        assert_eq!(rejection.field, "role");

        // The cap only applies to trainers
        assert!(check_trainer_capacity(AccountRole::Member, 1000).is_ok());
    }

    #[test]
    fn test_plan_creator_must_be_trainer() {
        let manager = actor(AccountRole::GymManager, Some(Uuid::new_v4()));
        let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));

        assert!(check_plan_creator(&trainer, None).is_ok());
        assert!(check_plan_creator(&trainer, trainer.branch_id).is_ok());

        let rejection = check_plan_creator(&manager, None).unwrap_err();
        assert_eq!(rejection.field, "created_by");
    }

    #[test]
    fn test_plan_branch_must_be_own() {
        let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));

        let rejection = check_plan_creator(&trainer, Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(rejection.field, "branch_id");
    }

    #[test]
    fn test_task_assignee_must_be_branch_member() {
        let branch = Uuid::new_v4();
        let p = plan(branch);

        let member = account(AccountRole::Member, Some(branch));
        assert!(check_task_consistency(&member, None, &p).is_ok());

        let trainer_as_assignee = account(AccountRole::Trainer, Some(branch));
        let rejection = check_task_consistency(&trainer_as_assignee, None, &p).unwrap_err();
        assert_eq!(rejection.field, "member_id");

        let foreign_member = account(AccountRole::Member, Some(Uuid::new_v4()));
        let rejection = check_task_consistency(&foreign_member, None, &p).unwrap_err();
        assert_eq!(rejection.field, "member_id");
    }

    #[test]
    fn test_task_creator_must_be_branch_trainer() {
        let branch = Uuid::new_v4();
        let p = plan(branch);
        let member = account(AccountRole::Member, Some(branch));

        let trainer = account(AccountRole::Trainer, Some(branch));
        assert!(check_task_consistency(&member, Some(&trainer), &p).is_ok());

        let manager = account(AccountRole::GymManager, Some(branch));
        let rejection = check_task_consistency(&member, Some(&manager), &p).unwrap_err();
        assert_eq!(rejection.field, "created_by");

        let foreign_trainer = account(AccountRole::Trainer, Some(Uuid::new_v4()));
        let rejection = check_task_consistency(&member, Some(&foreign_trainer), &p).unwrap_err();
        assert_eq!(rejection.field, "created_by");
    }
}
