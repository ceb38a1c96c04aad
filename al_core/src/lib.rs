//! # Airlift Core
//!
//! Shared types and provider traits for the airlift deployment pipeline.
//!
//! This crate provides:
//! - Account and role identity types with permissive ARN parsing
//! - The account topology that drives every resource-routing decision
//! - Build lifecycle types (status, snapshot, outcome)
//! - Provider traits that put every network-facing dependency behind a seam

pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use traits::{BuildRunner, CallerIdentity, ImageRegistry, ProjectStore, RoleStore, SourceStore};
pub use types::{
    AccountId, AccountTopology, BuildOutcome, BuildSnapshot, BuildStatus, ProjectSpec, RoleArn,
    SessionCredentials,
};
