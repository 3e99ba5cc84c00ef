/// Integration tests for the policy engine
///
/// These exercise the authorizer, scope resolver, and validator together
/// across role/branch combinations. All decisions are pure, so no database
/// is needed; the store-level arbiters (branch row lock, unique indexes)
/// are covered by the database test suite.
use chrono::Utc;
use uuid::Uuid;

use gymtrack_shared::models::account::{
    username_base, username_candidates, Account, AccountRole, TRAINER_CAP,
};
use gymtrack_shared::models::plan::WorkoutPlan;
use gymtrack_shared::models::task::{TaskStatus, WorkoutTask};
use gymtrack_shared::policy::authorize::{
    authorize_account_creation, authorize_plan_mutation, authorize_task_assignment,
    authorize_task_delete, authorize_task_update,
};
use gymtrack_shared::policy::scope::{
    permits_account, permits_branch, permits_plan, permits_task, scope_filter,
};
use gymtrack_shared::policy::validate::{
    check_password_confirmation, check_plan_creator, check_role_branch_coupling,
    check_task_consistency, check_trainer_capacity,
};
use gymtrack_shared::policy::{authorize, Action, Actor, DenyReason, Resource, ScopeFilter};

fn actor(role: AccountRole, branch_id: Option<Uuid>) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role,
        branch_id,
    }
}

fn account(role: AccountRole, branch_id: Option<Uuid>) -> Account {
    Account {
        id: Uuid::new_v4(),
        email: "person@gym.com".to_string(),
        username: "person".to_string(),
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

fn plan(created_by: Uuid, branch_id: Uuid) -> WorkoutPlan {
    WorkoutPlan {
        id: Uuid::new_v4(),
        title: "Endurance Block".to_string(),
        description: String::new(),
        created_by,
        branch_id,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn task(plan_id: Uuid, member_id: Uuid, created_by: Option<Uuid>) -> WorkoutTask {
    WorkoutTask {
        id: Uuid::new_v4(),
        plan_id,
        member_id,
        status: TaskStatus::Pending,
        due_date: Utc::now(),
        created_by,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// No branch-scoped role, on any resource, ever resolves to a scope that
/// admits another branch's instances.
#[test]
fn branch_isolation_holds_across_roles_and_resources() {
    let home = Uuid::new_v4();
    let foreign = Uuid::new_v4();

    for role in [
        AccountRole::GymManager,
        AccountRole::Trainer,
        AccountRole::Member,
    ] {
        let a = actor(role, Some(home));

        assert!(!permits_branch(&a, Resource::Branch, foreign));
        assert!(!permits_account(&a, Uuid::new_v4(), Some(foreign)));

        let foreign_plan = plan(Uuid::new_v4(), foreign);
        assert!(!permits_plan(&a, &foreign_plan));

        let foreign_task = task(foreign_plan.id, Uuid::new_v4(), None);
        assert!(!permits_task(&a, &foreign_task, foreign));

        assert_eq!(scope_filter(&a, Resource::ActivityLog), ScopeFilter::Nothing);
    }
}

/// Super admins see everything and pass every branch admission check.
#[test]
fn super_admin_scope_is_unrestricted() {
    let admin = actor(AccountRole::SuperAdmin, None);
    let some_branch = Uuid::new_v4();

    for resource in [
        Resource::Branch,
        Resource::Account,
        Resource::WorkoutPlan,
        Resource::WorkoutTask,
        Resource::ActivityLog,
    ] {
        assert_eq!(scope_filter(&admin, resource), ScopeFilter::All);
    }

    assert!(permits_branch(&admin, Resource::Branch, some_branch));
    assert!(permits_account(&admin, Uuid::new_v4(), Some(some_branch)));
}

/// A member may move their own task's status but any payload touching
/// another field is refused as a whole, not trimmed.
#[test]
fn member_task_update_is_status_only() {
    let branch = Uuid::new_v4();
    let member = actor(AccountRole::Member, Some(branch));
    let own_task = task(Uuid::new_v4(), member.id, None);

    assert!(authorize_task_update(&member, &own_task, branch, false).is_ok());

    let denial = authorize_task_update(&member, &own_task, branch, true).unwrap_err();
    assert_eq!(denial.reason, DenyReason::FieldNotAllowed);

    // Another member's task is off limits entirely
    let foreign_task = task(Uuid::new_v4(), Uuid::new_v4(), None);
    let denial = authorize_task_update(&member, &foreign_task, branch, false).unwrap_err();
    assert_eq!(denial.reason, DenyReason::NotOwner);
}

/// Assigning a task to a member of another branch is denied on the
/// member's branch alone, before plan consistency is even considered.
#[test]
fn cross_branch_assignment_denied_regardless_of_plan() {
    let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));
    let foreign_branch = Uuid::new_v4();

    // Even with a plan in the trainer's own branch, the foreign member
    // fails the assignment check.
    let denial = authorize_task_assignment(&trainer, Some(foreign_branch)).unwrap_err();
    assert_eq!(denial.reason, DenyReason::BranchMismatch);

    assert!(authorize_task_assignment(&trainer, trainer.branch_id).is_ok());
}

/// Manager creation rules: trainers and members of the own branch pass,
/// elevated roles and foreign branches deny.
#[test]
fn manager_account_creation_round_trip() {
    let branch = Uuid::new_v4();
    let manager = actor(AccountRole::GymManager, Some(branch));

    assert!(authorize_account_creation(&manager, AccountRole::Trainer, Some(branch)).is_ok());
    assert!(authorize_account_creation(&manager, AccountRole::Member, Some(branch)).is_ok());

    let denial =
        authorize_account_creation(&manager, AccountRole::GymManager, Some(branch)).unwrap_err();
    assert_eq!(denial.reason, DenyReason::RoleMismatch);

    let denial =
        authorize_account_creation(&manager, AccountRole::SuperAdmin, None).unwrap_err();
    assert_eq!(denial.reason, DenyReason::RoleMismatch);

    let denial =
        authorize_account_creation(&manager, AccountRole::Member, Some(Uuid::new_v4()))
            .unwrap_err();
    assert_eq!(denial.reason, DenyReason::BranchMismatch);
}

/// Only the creator mutates a plan, and only from the plan's branch.
#[test]
fn plan_mutation_requires_creator_in_branch() {
    let branch = Uuid::new_v4();
    let creator = actor(AccountRole::Trainer, Some(branch));
    let colleague = actor(AccountRole::Trainer, Some(branch));
    let p = plan(creator.id, branch);

    assert!(authorize_plan_mutation(&creator, &p).is_ok());
    assert_eq!(
        authorize_plan_mutation(&colleague, &p).unwrap_err().reason,
        DenyReason::NotOwner
    );

    let relocated = actor(AccountRole::Trainer, Some(Uuid::new_v4()));
    let theirs = plan(relocated.id, branch);
    assert_eq!(
        authorize_plan_mutation(&relocated, &theirs).unwrap_err().reason,
        DenyReason::BranchMismatch
    );
}

/// Task deletion is creator-only; an orphaned task (creator removed)
/// cannot be deleted by anyone through this path.
#[test]
fn task_delete_is_creator_only() {
    let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));

    let own = task(Uuid::new_v4(), Uuid::new_v4(), Some(trainer.id));
    assert!(authorize_task_delete(&trainer, &own).is_ok());

    let orphaned = task(Uuid::new_v4(), Uuid::new_v4(), None);
    assert_eq!(
        authorize_task_delete(&trainer, &orphaned).unwrap_err().reason,
        DenyReason::NotOwner
    );
}

/// The same decision inputs always produce the same result.
#[test]
fn decisions_are_deterministic() {
    let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));
    let member = actor(AccountRole::Member, Some(Uuid::new_v4()));

    for _ in 0..3 {
        assert!(authorize(&trainer, Action::Create, Resource::WorkoutPlan).is_ok());
        assert_eq!(
            authorize(&member, Action::Create, Resource::WorkoutPlan)
                .unwrap_err()
                .reason,
            DenyReason::RoleMismatch
        );
        assert_eq!(
            scope_filter(&member, Resource::WorkoutPlan),
            ScopeFilter::Nothing
        );
    }
}

/// Capacity boundary: the cap-th trainer is refused, roles other than
/// trainer are never counted against it.
#[test]
fn trainer_capacity_boundary() {
    assert!(check_trainer_capacity(AccountRole::Trainer, TRAINER_CAP - 1).is_ok());
    assert!(check_trainer_capacity(AccountRole::Trainer, TRAINER_CAP).is_err());
    assert!(check_trainer_capacity(AccountRole::Trainer, TRAINER_CAP + 5).is_err());
    assert!(check_trainer_capacity(AccountRole::Member, TRAINER_CAP * 10).is_ok());
}

/// Role/branch coupling is a two-sided rule.
#[test]
fn role_branch_coupling_is_two_sided() {
    let branch = Uuid::new_v4();

    assert!(check_role_branch_coupling(AccountRole::SuperAdmin, None).is_ok());
    assert!(check_role_branch_coupling(AccountRole::GymManager, Some(branch)).is_ok());

    assert!(check_role_branch_coupling(AccountRole::SuperAdmin, Some(branch)).is_err());
    assert!(check_role_branch_coupling(AccountRole::GymManager, None).is_err());
    assert!(check_role_branch_coupling(AccountRole::Trainer, None).is_err());
    assert!(check_role_branch_coupling(AccountRole::Member, None).is_err());
}

/// Password confirmation compares bytes, not normalized forms.
#[test]
fn password_confirmation_is_byte_exact() {
    assert!(check_password_confirmation("Tr@in3r-pw", "Tr@in3r-pw").is_ok());
    assert!(check_password_confirmation("Tr@in3r-pw", "tr@in3r-pw").is_err());
    assert!(check_password_confirmation("Tr@in3r-pw", "Tr@in3r-pw\u{00a0}").is_err());
}

/// Plan creation payload rules: trainers only, own branch only.
#[test]
fn plan_creator_rules() {
    let trainer = actor(AccountRole::Trainer, Some(Uuid::new_v4()));

    assert!(check_plan_creator(&trainer, None).is_ok());
    assert!(check_plan_creator(&trainer, trainer.branch_id).is_ok());
    assert_eq!(
        check_plan_creator(&trainer, Some(Uuid::new_v4()))
            .unwrap_err()
            .field,
        "branch_id"
    );

    for role in [
        AccountRole::SuperAdmin,
        AccountRole::GymManager,
        AccountRole::Member,
    ] {
        let branch = (role != AccountRole::SuperAdmin).then(Uuid::new_v4);
        assert_eq!(
            check_plan_creator(&actor(role, branch), None)
                .unwrap_err()
                .field,
            "created_by"
        );
    }
}

/// Task consistency ties assignee, creator, and plan to one branch.
#[test]
fn task_consistency_requires_single_branch() {
    let branch = Uuid::new_v4();
    let p = plan(Uuid::new_v4(), branch);
    let member = account(AccountRole::Member, Some(branch));
    let trainer = account(AccountRole::Trainer, Some(branch));

    assert!(check_task_consistency(&member, Some(&trainer), &p).is_ok());
    assert!(check_task_consistency(&member, None, &p).is_ok());

    let foreign_member = account(AccountRole::Member, Some(Uuid::new_v4()));
    assert_eq!(
        check_task_consistency(&foreign_member, None, &p).unwrap_err().field,
        "member_id"
    );

    let foreign_trainer = account(AccountRole::Trainer, Some(Uuid::new_v4()));
    assert_eq!(
        check_task_consistency(&member, Some(&foreign_trainer), &p)
            .unwrap_err()
            .field,
        "created_by"
    );

    let non_member = account(AccountRole::Trainer, Some(branch));
    assert_eq!(
        check_task_consistency(&non_member, None, &p).unwrap_err().field,
        "member_id"
    );
}

/// Username derivation: lowercased local part, then increasing suffixes.
#[test]
fn username_derivation_sequence() {
    assert_eq!(username_base("Jane.Doe@Gym.com"), "jane.doe");

    let candidates: Vec<String> = username_candidates("jane.doe").take(3).collect();
    assert_eq!(candidates, vec!["jane.doe", "jane.doe1", "jane.doe2"]);

    // A taken set simulating prior registrations skips to the first free
    // candidate, mirroring what account creation does against the store.
    let taken: std::collections::HashSet<&str> =
        ["jane.doe", "jane.doe1"].into_iter().collect();
    let free = username_candidates("jane.doe")
        .find(|c| !taken.contains(c.as_str()))
        .unwrap();
    assert_eq!(free, "jane.doe2");
}
