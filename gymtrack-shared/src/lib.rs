//! # GymTrack Shared Library
//!
//! This crate contains the data layer and the authorization/consistency
//! engine shared by the GymTrack API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `policy`: Role-based, branch-scoped authorization, scoping,
//!   validation, and audit recording
//! - `auth`: Password hashing, JWT tokens, and the Axum auth middleware
//! - `db`: Connection pooling and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod policy;

/// Current version of the GymTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
