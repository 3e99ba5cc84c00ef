/// Database models for GymTrack
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `branch`: Gym branches, the tenancy root
/// - `account`: User accounts across the four roles
/// - `plan`: Workout plans authored by trainers
/// - `task`: Workout tasks assigned to members
/// - `activity`: Append-only activity log
///
/// # Example
///
/// ```no_run
/// use gymtrack_shared::models::branch::{GymBranch, CreateGymBranch};
/// use gymtrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let branch = GymBranch::create(
///     &pool,
///     CreateGymBranch {
///         name: "Downtown".to_string(),
///         location: "42 Main St".to_string(),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub mod account;
pub mod activity;
pub mod branch;
pub mod plan;
pub mod task;
