/// Scope resolver
///
/// Translates an actor and a resource kind into the filter restricting
/// which instances the actor may see. The filter is the only visibility
/// gate for list and retrieve operations: the model layer applies it as
/// the innermost WHERE clause, before pagination or any caller-supplied
/// narrowing, so no request parameter can widen it.
use uuid::Uuid;

use super::{Actor, Resource};
use crate::models::account::AccountRole;
use crate::models::plan::WorkoutPlan;
use crate::models::task::WorkoutTask;

/// Visibility filter for a (actor, resource) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Every instance (super admins)
    All,

    /// Instances belonging to one branch
    Branch(Uuid),

    /// The actor's own account only
    OwnAccount(Uuid),

    /// Tasks assigned to this member
    AssignedTo(Uuid),

    /// Nothing at all
    Nothing,
}

/// Resolves the visibility filter for an actor and resource kind
///
/// The table:
///
/// | Resource     | super_admin | gym_manager     | trainer         | member          |
/// |--------------|-------------|-----------------|-----------------|-----------------|
/// | Branch       | All         | own branch      | own branch      | own branch      |
/// | Account      | All         | branch accounts | own account     | own account     |
/// | WorkoutPlan  | All         | branch plans    | branch plans    | Nothing         |
/// | WorkoutTask  | All         | branch tasks    | branch tasks    | assigned to self|
/// | ActivityLog  | All         | Nothing         | Nothing         | Nothing         |
///
/// Members never see plans directly, only the tasks derived from them.
/// A branch-scoped role with no branch resolves to [`ScopeFilter::Nothing`].
pub fn scope_filter(actor: &Actor, resource: Resource) -> ScopeFilter {
    use AccountRole::*;

    if actor.role == SuperAdmin {
        return ScopeFilter::All;
    }

    let branch = match actor.branch_id {
        Some(id) => id,
        None => return ScopeFilter::Nothing,
    };

    match (resource, actor.role) {
        (Resource::Branch, _) => ScopeFilter::Branch(branch),

        (Resource::Account, GymManager) => ScopeFilter::Branch(branch),
        (Resource::Account, _) => ScopeFilter::OwnAccount(actor.id),

        (Resource::WorkoutPlan, Member) => ScopeFilter::Nothing,
        (Resource::WorkoutPlan, _) => ScopeFilter::Branch(branch),

        (Resource::WorkoutTask, Member) => ScopeFilter::AssignedTo(actor.id),
        (Resource::WorkoutTask, _) => ScopeFilter::Branch(branch),

        (Resource::ActivityLog, _) => ScopeFilter::Nothing,
    }
}

/// Whether the actor's branch scope admits an entity of the given branch
///
/// Used by retrieve handlers for branch-scoped resources; an out-of-scope
/// instance is answered as forbidden, not as absent.
pub fn permits_branch(actor: &Actor, resource: Resource, entity_branch: Uuid) -> bool {
    match scope_filter(actor, resource) {
        ScopeFilter::All => true,
        ScopeFilter::Branch(branch) => branch == entity_branch,
        _ => false,
    }
}

/// Whether the actor may retrieve the given account
pub fn permits_account(actor: &Actor, account_id: Uuid, account_branch: Option<Uuid>) -> bool {
    match scope_filter(actor, Resource::Account) {
        ScopeFilter::All => true,
        ScopeFilter::Branch(branch) => account_branch == Some(branch),
        ScopeFilter::OwnAccount(id) => id == account_id,
        _ => false,
    }
}

/// Whether the actor may retrieve the given plan
pub fn permits_plan(actor: &Actor, plan: &WorkoutPlan) -> bool {
    permits_branch(actor, Resource::WorkoutPlan, plan.branch_id)
}

/// Whether the actor may retrieve the given task
///
/// `plan_branch` is the branch of the task's plan, fetched by the caller.
pub fn permits_task(actor: &Actor, task: &WorkoutTask, plan_branch: Uuid) -> bool {
    match scope_filter(actor, Resource::WorkoutTask) {
        ScopeFilter::All => true,
        ScopeFilter::Branch(branch) => branch == plan_branch,
        ScopeFilter::AssignedTo(member_id) => task.member_id == member_id,
        _ => false,
    }
}
