//! # Airlift Errors
//!
//! Error taxonomy for the airlift deployment pipeline.
//!
//! One enum per failure domain, `thiserror` throughout. The top-level
//! [`LaunchError`] composes the domain enums via `#[from]` so every step of
//! the launch workflow propagates with `?`.
//!
//! A malformed or absent cross-account role reference is deliberately NOT
//! represented here: it degrades to same-account mode instead of failing.

use thiserror::Error;

/// Failures while resolving or exchanging AWS credentials.
///
/// Both variants are fatal and never retried: identity failures are not
/// transient, and retrying cannot fix a trust-policy mismatch.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Unable to resolve caller identity: {reason}")]
    Resolution { reason: String },

    #[error("Assuming {role_arn} failed: {reason}")]
    Assumption { role_arn: String, reason: String },
}

/// Failures while packaging or uploading the source archive.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Failed to package source tree at {path}: {reason}")]
    Package { path: String, reason: String },

    #[error("Staging bucket {bucket} could not be created: {reason}")]
    CreateFailed { bucket: String, reason: String },

    #[error("Staging bucket {bucket} is not owned by account {expected_owner}")]
    ForeignOwner {
        bucket: String,
        expected_owner: String,
    },

    #[error("Upload of {key} to {bucket} failed: {reason}")]
    UploadFailed {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// Failures in the build project or execution lifecycle.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Project {name} could not be created or updated: {reason}")]
    Project { name: String, reason: String },

    /// Recoverable: a concurrent caller won the create race. The remote
    /// uniqueness constraint is the tie-breaker; callers retry once as an
    /// update.
    #[error("Project {name} already exists")]
    ProjectExists { name: String },

    #[error("Failed to start build for {project}: {reason}")]
    StartFailed { project: String, reason: String },

    #[error("Status poll for {execution_id} failed: {reason}")]
    Poll {
        execution_id: String,
        reason: String,
    },

    #[error("Build {execution_id} did not finish within {timeout_secs}s (last phase: {phase})")]
    Timeout {
        execution_id: String,
        timeout_secs: u64,
        phase: String,
    },

    #[error("Build {execution_id} ended as {status} in phase {phase}")]
    Failed {
        execution_id: String,
        status: String,
        phase: String,
        logs: Option<String>,
    },

    #[error("Failed to stop build {execution_id}: {reason}")]
    StopFailed {
        execution_id: String,
        reason: String,
    },
}

/// Failures while provisioning image repositories or IAM roles.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("ECR repository {name}: {reason}")]
    Repository { name: String, reason: String },

    #[error("IAM role {name}: {reason}")]
    Role { name: String, reason: String },

    /// Recoverable: the resource was created concurrently. Callers resolve
    /// this by reading the existing resource back.
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },
}

/// Top-level launch failure. Any step's failure aborts the remaining steps;
/// each step's own retry policy is exhausted before it surfaces here.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type LaunchResult<T> = std::result::Result<T, LaunchError>;
