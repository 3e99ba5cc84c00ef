/// Role-based, branch-scoped policy engine
///
/// Every request passes through this module before it touches the store:
/// the action authorizer gates the (role, action, resource) combination and
/// refines it per object, the scope resolver restricts what lists and
/// retrievals may return, the consistency validator checks cross-entity
/// invariants on writes, and the audit recorder appends a trail entry
/// afterwards.
///
/// All decision functions here are pure: they take the actor and already
/// fetched entity state and return a tagged result. Reads needed to gather
/// that state happen in the validator's `*_checked` helpers or in the
/// calling handler, never inside a decision.
///
/// # Failure taxonomy
///
/// - [`authorize::Denial`] — a role/branch/ownership rule failed (403)
/// - [`validate::Rejection`] — the payload violates a data invariant (400)
/// - Not-found is reported by the store layer, never by the engine
///
/// The split is deliberate: a request can be well-formed and authorized yet
/// still fail validation, and callers must be able to tell the classes
/// apart.
///
/// # Example
///
/// ```
/// use gymtrack_shared::models::account::AccountRole;
/// use gymtrack_shared::policy::{authorize, Action, Actor, Resource};
/// use uuid::Uuid;
///
/// let trainer = Actor {
///     id: Uuid::new_v4(),
///     role: AccountRole::Trainer,
///     branch_id: Some(Uuid::new_v4()),
/// };
///
/// assert!(authorize::authorize(&trainer, Action::Create, Resource::WorkoutPlan).is_ok());
/// assert!(authorize::authorize(&trainer, Action::Create, Resource::Branch).is_err());
/// ```
pub mod audit;
pub mod authorize;
pub mod scope;
pub mod validate;

use uuid::Uuid;

use crate::models::account::{Account, AccountRole};

/// The authenticated identity a request acts as
///
/// Built by the auth middleware from the account row loaded for the token,
/// so role and branch reflect current state, not what the token was issued
/// with. Immutable for the duration of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: AccountRole,

    /// None exactly when role is super_admin
    pub branch_id: Option<Uuid>,
}

impl Actor {
    /// Builds the actor for an account row
    pub fn from_account(account: &Account) -> Self {
        Actor {
            id: account.id,
            role: account.role,
            branch_id: account.branch_id,
        }
    }
}

/// Action being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// Resource kind the action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Branch,
    Account,
    WorkoutPlan,
    WorkoutTask,
    ActivityLog,
}

pub use authorize::{authorize, Denial, DenyReason};
pub use scope::ScopeFilter;
pub use validate::Rejection;
