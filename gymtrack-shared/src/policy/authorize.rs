/// Action authorizer
///
/// Decides, for an actor and a requested action on a resource kind,
/// allow or deny — first coarsely by role, then refined per object once
/// the target instance has been fetched. Every denial carries a
/// machine-readable reason distinct from not-found, so the caller can
/// answer 403 without leaking existence through 404.
///
/// The full role table lives in [`authorize`]; the per-object refinements
/// are the `authorize_*` functions below. All of them are pure: entity
/// state is fetched by the caller and passed in.
///
/// # Example
///
/// ```
/// use gymtrack_shared::models::account::AccountRole;
/// use gymtrack_shared::policy::authorize::{authorize, DenyReason};
/// use gymtrack_shared::policy::{Action, Actor, Resource};
/// use uuid::Uuid;
///
/// let member = Actor {
///     id: Uuid::new_v4(),
///     role: AccountRole::Member,
///     branch_id: Some(Uuid::new_v4()),
/// };
///
/// let denial = authorize(&member, Action::Create, Resource::WorkoutPlan).unwrap_err();
/// assert_eq!(denial.reason, DenyReason::RoleMismatch);
/// ```
use uuid::Uuid;

use super::{Action, Actor, Resource};
use crate::models::account::AccountRole;
use crate::models::plan::WorkoutPlan;
use crate::models::task::WorkoutTask;

/// Machine-readable category of an authorization denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The actor's role is not allowed to perform this action
    RoleMismatch,

    /// The target belongs to a different branch than the actor
    BranchMismatch,

    /// The actor is not the creator/assignee the rule requires
    NotOwner,

    /// The payload touches a field this actor may not modify
    FieldNotAllowed,

    /// The actor has no branch but the action requires one
    MissingBranch,
}

impl DenyReason {
    /// Stable code for API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::RoleMismatch => "role_mismatch",
            DenyReason::BranchMismatch => "branch_mismatch",
            DenyReason::NotOwner => "not_owner",
            DenyReason::FieldNotAllowed => "field_not_allowed",
            DenyReason::MissingBranch => "missing_branch",
        }
    }
}

/// An authorization denial: reason category plus human-readable detail
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Denial {
    pub reason: DenyReason,
    pub message: String,
}

impl Denial {
    fn new(reason: DenyReason, message: impl Into<String>) -> Self {
        Denial {
            reason,
            message: message.into(),
        }
    }

    pub fn role_mismatch(message: impl Into<String>) -> Self {
        Denial::new(DenyReason::RoleMismatch, message)
    }

    pub fn branch_mismatch(message: impl Into<String>) -> Self {
        Denial::new(DenyReason::BranchMismatch, message)
    }

    pub fn not_owner(message: impl Into<String>) -> Self {
        Denial::new(DenyReason::NotOwner, message)
    }

    pub fn field_not_allowed(message: impl Into<String>) -> Self {
        Denial::new(DenyReason::FieldNotAllowed, message)
    }

    pub fn missing_branch(message: impl Into<String>) -> Self {
        Denial::new(DenyReason::MissingBranch, message)
    }
}

/// Coarse, role-level authorization
///
/// Evaluated before any data is touched. The table, by resource:
///
/// | Resource     | create          | read            | update             | delete        |
/// |--------------|-----------------|-----------------|--------------------|---------------|
/// | Branch       | super_admin     | any             | super_admin        | super_admin   |
/// | Account      | admin/manager   | any (scoped)    | super_admin        | super_admin   |
/// | WorkoutPlan  | trainer         | any (scoped)    | trainer (creator)  | trainer (creator) |
/// | WorkoutTask  | trainer         | any (scoped)    | assignee or trainer| trainer (creator) |
/// | ActivityLog  | never           | super_admin     | never              | never         |
///
/// The parenthesized refinements require the target instance and live in
/// the `authorize_*` functions below; this function only answers whether
/// the role can ever perform the action.
pub fn authorize(actor: &Actor, action: Action, resource: Resource) -> Result<(), Denial> {
    use AccountRole::*;

    let allowed = match (resource, action) {
        (Resource::Branch, Action::Read) => true,
        (Resource::Branch, _) => actor.role == SuperAdmin,

        (Resource::Account, Action::Create) => matches!(actor.role, SuperAdmin | GymManager),
        (Resource::Account, Action::Read) => true,
        (Resource::Account, _) => actor.role == SuperAdmin,

        (Resource::WorkoutPlan, Action::Read) => true,
        (Resource::WorkoutPlan, _) => actor.role == Trainer,

        (Resource::WorkoutTask, Action::Create) => actor.role == Trainer,
        (Resource::WorkoutTask, Action::Read) => true,
        (Resource::WorkoutTask, Action::Update) => matches!(actor.role, Trainer | Member),
        (Resource::WorkoutTask, Action::Delete) => actor.role == Trainer,

        (Resource::ActivityLog, Action::Read) => actor.role == SuperAdmin,
        (Resource::ActivityLog, _) => false,
    };

    if !allowed {
        return Err(Denial::role_mismatch(format!(
            "Role {} may not {} this resource",
            actor.role.as_str(),
            action_verb(action),
        )));
    }

    Ok(())
}

fn action_verb(action: Action) -> &'static str {
    match action {
        Action::Create => "create",
        Action::Read => "read",
        Action::Update => "update",
        Action::Delete => "delete",
    }
}

/// Object-level check for a manager-issued account creation
///
/// Super admins create any role in any branch. Managers may only create
/// trainers and members, and only for their own branch; both restrictions
/// are checked before any validation runs.
pub fn authorize_account_creation(
    actor: &Actor,
    requested_role: AccountRole,
    requested_branch: Option<Uuid>,
) -> Result<(), Denial> {
    if actor.role == AccountRole::SuperAdmin {
        return Ok(());
    }

    // Coarse gate already restricted this to super_admin or gym_manager
    if !matches!(requested_role, AccountRole::Trainer | AccountRole::Member) {
        return Err(Denial::role_mismatch(format!(
            "Managers may only create trainer or member accounts, not {}",
            requested_role.as_str()
        )));
    }

    let own_branch = actor
        .branch_id
        .ok_or_else(|| Denial::missing_branch("Manager has no branch assigned"))?;

    if requested_branch != Some(own_branch) {
        return Err(Denial::branch_mismatch(
            "Managers may only create accounts for their own branch",
        ));
    }

    Ok(())
}

/// Object-level check for updating or deleting a workout plan
///
/// Only the plan's creator may mutate it, and they must be acting from
/// the plan's branch.
pub fn authorize_plan_mutation(actor: &Actor, plan: &WorkoutPlan) -> Result<(), Denial> {
    if actor.branch_id != Some(plan.branch_id) {
        return Err(Denial::branch_mismatch(
            "Plan belongs to a different branch",
        ));
    }

    if plan.created_by != actor.id {
        return Err(Denial::not_owner("Only the plan's creator may modify it"));
    }

    Ok(())
}

/// Object-level check for updating a workout task
///
/// Trainers of the task's branch may touch any field. The assignee may
/// update only the status; a payload touching anything else is rejected
/// as a whole, not silently trimmed.
///
/// `plan_branch` is the branch of the plan the task derives from, fetched
/// by the caller. `touches_non_status` reports whether the payload carries
/// any field besides status.
pub fn authorize_task_update(
    actor: &Actor,
    task: &WorkoutTask,
    plan_branch: Uuid,
    touches_non_status: bool,
) -> Result<(), Denial> {
    match actor.role {
        AccountRole::Trainer => {
            if actor.branch_id != Some(plan_branch) {
                return Err(Denial::branch_mismatch(
                    "Task belongs to a different branch",
                ));
            }
            Ok(())
        }
        AccountRole::Member => {
            if task.member_id != actor.id {
                return Err(Denial::not_owner("Task is assigned to another member"));
            }
            if touches_non_status {
                return Err(Denial::field_not_allowed(
                    "Members may only update the task status",
                ));
            }
            Ok(())
        }
        _ => Err(Denial::role_mismatch(format!(
            "Role {} may not update tasks",
            actor.role.as_str()
        ))),
    }
}

/// Object-level check for deleting a workout task
///
/// Only the task's creator may delete it.
pub fn authorize_task_delete(actor: &Actor, task: &WorkoutTask) -> Result<(), Denial> {
    if task.created_by != Some(actor.id) {
        return Err(Denial::not_owner("Only the task's creator may delete it"));
    }

    Ok(())
}

/// Object-level check for assigning a task to a member
///
/// The member must belong to the acting trainer's branch. This is checked
/// independently of the plan's branch (which the validator covers), so a
/// cross-branch assignment denies here even when the plan would match.
pub fn authorize_task_assignment(actor: &Actor, member_branch: Option<Uuid>) -> Result<(), Denial> {
    let own_branch = actor
        .branch_id
        .ok_or_else(|| Denial::missing_branch("Trainer has no branch assigned"))?;

    if member_branch != Some(own_branch) {
        return Err(Denial::branch_mismatch(
            "Member belongs to a different branch",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::task::TaskStatus;

    fn actor(role: AccountRole, branch_id: Option<Uuid>) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
            branch_id,
        }
    }

    fn plan(created_by: Uuid, branch_id: Uuid) -> WorkoutPlan {
        WorkoutPlan {
            id: Uuid::new_v4(),
            title: "Cardio".to_string(),
            description: String::new(),
            created_by,
            branch_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task(member_id: Uuid, created_by: Option<Uuid>) -> WorkoutTask {
        WorkoutTask {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            member_id,
            status: TaskStatus::Pending,
            due_date: Utc::now(),
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_branch_mutation_is_super_admin_only() {
        let branch = Uuid::new_v4();
        let admin = actor(AccountRole::SuperAdmin, None);
        let manager = actor(AccountRole::GymManager, Some(branch));

        assert!(authorize(&admin, Action::Create, Resource::Branch).is_ok());
        assert!(authorize(&admin, Action::Delete, Resource::Branch).is_ok());

        let denial = authorize(&manager, Action::Create, Resource::Branch).unwrap_err();
        assert_eq!(denial.reason, DenyReason::RoleMismatch);

        // Reading branches is open to any authenticated actor
        assert!(authorize(&manager, Action::Read, Resource::Branch).is_ok());
    }

    #[test]
    fn test_account_creation_roles() {
        let branch = Uuid::new_v4();

        assert!(authorize(
            &actor(AccountRole::SuperAdmin, None),
            Action::Create,
            Resource::Account
        )
        .is_ok());
        assert!(authorize(
            &actor(AccountRole::GymManager, Some(branch)),
            Action::Create,
            Resource::Account
        )
        .is_ok());
        assert!(authorize(
            &actor(AccountRole::Trainer, Some(branch)),
            Action::Create,
            Resource::Account
        )
        .is_err());
        assert!(authorize(
            &actor(AccountRole::Member, Some(branch)),
            Action::Create,
            Resource::Account
        )
        .is_err());
    }

    #[test]
    fn test_activity_log_is_super_admin_read_only() {
        let admin = actor(AccountRole::SuperAdmin, None);
        let manager = actor(AccountRole::GymManager, Some(Uuid::new_v4()));

        assert!(authorize(&admin, Action::Read, Resource::ActivityLog).is_ok());
        assert!(authorize(&manager, Action::Read, Resource::ActivityLog).is_err());
        assert!(authorize(&admin, Action::Create, Resource::ActivityLog).is_err());
        assert!(authorize(&admin, Action::Delete, Resource::ActivityLog).is_err());
    }

    #[test]
    fn test_authorize_is_idempotent() {
        let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));

        let first = authorize(&trainer, Action::Create, Resource::WorkoutPlan);
        let second = authorize(&trainer, Action::Create, Resource::WorkoutPlan);
        assert_eq!(first, second);

        let first = authorize(&trainer, Action::Update, Resource::Branch);
        let second = authorize(&trainer, Action::Update, Resource::Branch);
        assert_eq!(first, second);
    }

    #[test]
    fn test_manager_cannot_create_manager_accounts() {
        let branch = Uuid::new_v4();
        let manager = actor(AccountRole::GymManager, Some(branch));

        let denial =
            authorize_account_creation(&manager, AccountRole::GymManager, Some(branch)).unwrap_err();
        assert_eq!(denial.reason, DenyReason::RoleMismatch);

        let denial =
            authorize_account_creation(&manager, AccountRole::SuperAdmin, None).unwrap_err();
        assert_eq!(denial.reason, DenyReason::RoleMismatch);
    }

    #[test]
    fn test_manager_cannot_create_for_foreign_branch() {
        let manager = actor(AccountRole::GymManager, Some(Uuid::new_v4()));

        let denial =
            authorize_account_creation(&manager, AccountRole::Trainer, Some(Uuid::new_v4()))
                .unwrap_err();
        assert_eq!(denial.reason, DenyReason::BranchMismatch);

        assert!(
            authorize_account_creation(&manager, AccountRole::Trainer, manager.branch_id).is_ok()
        );
    }

    #[test]
    fn test_super_admin_creates_any_account() {
        let admin = actor(AccountRole::SuperAdmin, None);

        assert!(authorize_account_creation(&admin, AccountRole::GymManager, Some(Uuid::new_v4()))
            .is_ok());
        assert!(authorize_account_creation(&admin, AccountRole::SuperAdmin, None).is_ok());
    }

    #[test]
    fn test_plan_mutation_creator_only() {
        let branch = Uuid::new_v4();
        let creator = actor(AccountRole::Trainer, Some(branch));
        let other = actor(AccountRole::Trainer, Some(branch));
        let p = plan(creator.id, branch);

        assert!(authorize_plan_mutation(&creator, &p).is_ok());

        let denial = authorize_plan_mutation(&other, &p).unwrap_err();
        assert_eq!(denial.reason, DenyReason::NotOwner);
    }

    #[test]
    fn test_plan_mutation_foreign_branch() {
        let creator = actor(AccountRole::Trainer, Some(Uuid::new_v4()));
        let p = plan(creator.id, Uuid::new_v4());

        let denial = authorize_plan_mutation(&creator, &p).unwrap_err();
        assert_eq!(denial.reason, DenyReason::BranchMismatch);
    }

    #[test]
    fn test_member_updates_own_task_status_only() {
        let member = actor(AccountRole::Member, Some(Uuid::new_v4()));
        let branch = member.branch_id.unwrap();
        let t = task(member.id, None);

        assert!(authorize_task_update(&member, &t, branch, false).is_ok());

        let denial = authorize_task_update(&member, &t, branch, true).unwrap_err();
        assert_eq!(denial.reason, DenyReason::FieldNotAllowed);
    }

    #[test]
    fn test_member_cannot_update_foreign_task() {
        let member = actor(AccountRole::Member, Some(Uuid::new_v4()));
        let branch = member.branch_id.unwrap();
        let t = task(Uuid::new_v4(), None);

        let denial = authorize_task_update(&member, &t, branch, false).unwrap_err();
        assert_eq!(denial.reason, DenyReason::NotOwner);
    }

    #[test]
    fn test_trainer_updates_any_field_in_own_branch() {
        let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));
        let t = task(Uuid::new_v4(), Some(trainer.id));

        assert!(authorize_task_update(&trainer, &t, trainer.branch_id.unwrap(), true).is_ok());

        let denial = authorize_task_update(&trainer, &t, Uuid::new_v4(), true).unwrap_err();
        assert_eq!(denial.reason, DenyReason::BranchMismatch);
    }

    #[test]
    fn test_task_delete_creator_only() {
        let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));
        let own = task(Uuid::new_v4(), Some(trainer.id));
        let foreign = task(Uuid::new_v4(), Some(Uuid::new_v4()));
        let orphaned = task(Uuid::new_v4(), None);

        assert!(authorize_task_delete(&trainer, &own).is_ok());
        assert_eq!(
            authorize_task_delete(&trainer, &foreign).unwrap_err().reason,
            DenyReason::NotOwner
        );
        assert_eq!(
            authorize_task_delete(&trainer, &orphaned).unwrap_err().reason,
            DenyReason::NotOwner
        );
    }

    #[test]
    fn test_cross_branch_assignment_denied() {
        let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));

        assert!(authorize_task_assignment(&trainer, trainer.branch_id).is_ok());

        let denial = authorize_task_assignment(&trainer, Some(Uuid::new_v4())).unwrap_err();
        assert_eq!(denial.reason, DenyReason::BranchMismatch);

        let denial = authorize_task_assignment(&trainer, None).unwrap_err();
        assert_eq!(denial.reason, DenyReason::BranchMismatch);
    }

    #[test]
    fn test_deny_reason_codes() {
        assert_eq!(DenyReason::RoleMismatch.as_str(), "role_mismatch");
        assert_eq!(DenyReason::BranchMismatch.as_str(), "branch_mismatch");
        assert_eq!(DenyReason::NotOwner.as_str(), "not_owner");
        assert_eq!(DenyReason::FieldNotAllowed.as_str(), "field_not_allowed");
        assert_eq!(DenyReason::MissingBranch.as_str(), "missing_branch");
    }
}
