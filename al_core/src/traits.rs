//! Provider traits for the AWS seams.
//!
//! Every network-facing dependency of the pipeline sits behind one of these
//! traits, so orchestration logic is exercised against in-memory fakes
//! instead of patched globals. The AWS SDK implementations live in the
//! `services` crate; test doubles live in the `testing` crate.

use async_trait::async_trait;
use errors::{BuildError, IdentityError, ProvisionError, StagingError};

use crate::types::{AccountId, BuildSnapshot, ProjectSpec, SessionCredentials};

/// STS-shaped identity operations.
#[async_trait]
pub trait CallerIdentity: Send + Sync {
    /// Account id of the ambient credentials.
    async fn account(&self) -> Result<AccountId, IdentityError>;

    /// Exchange the ambient credentials for a session in the role's account.
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<SessionCredentials, IdentityError>;
}

/// S3-shaped staging operations, scoped to one account's credentials.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Head-style probe. `Ok(true)` means the bucket exists and is owned by
    /// `expected_owner`; `Ok(false)` means it does not exist. A bucket owned
    /// by a different account is an error, never a silent reuse.
    async fn bucket_exists(
        &self,
        bucket: &str,
        expected_owner: &AccountId,
    ) -> Result<bool, StagingError>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StagingError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>)
    -> Result<(), StagingError>;
}

/// Project-definition half of the managed build service.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn project_exists(&self, name: &str) -> Result<bool, BuildError>;

    /// Create a new project. Losing a concurrent create race surfaces as
    /// [`BuildError::ProjectExists`].
    async fn create_project(&self, spec: &ProjectSpec) -> Result<(), BuildError>;

    async fn update_project(&self, spec: &ProjectSpec) -> Result<(), BuildError>;
}

/// Execution half of the managed build service.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Start exactly one build run; returns immediately with its id.
    async fn start_build(&self, project: &str) -> Result<String, BuildError>;

    /// One independent, idempotent status poll.
    async fn build_snapshot(&self, execution_id: &str) -> Result<BuildSnapshot, BuildError>;

    /// Stop a running build. Stopping an already-terminal build is a no-op
    /// success.
    async fn stop_build(&self, execution_id: &str) -> Result<(), BuildError>;
}

/// ECR-shaped image repository operations.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    async fn repository_uri(&self, name: &str) -> Result<Option<String>, ProvisionError>;

    /// Create the repository and return its URI. A concurrent create
    /// surfaces as [`ProvisionError::AlreadyExists`].
    async fn create_repository(&self, name: &str) -> Result<String, ProvisionError>;
}

/// IAM-shaped role operations.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn role_arn(&self, name: &str) -> Result<Option<String>, ProvisionError>;

    /// Create the role and return its ARN. A concurrent create surfaces as
    /// [`ProvisionError::AlreadyExists`].
    async fn create_role(
        &self,
        name: &str,
        trust_policy: &str,
        description: &str,
    ) -> Result<String, ProvisionError>;

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy: &str,
    ) -> Result<(), ProvisionError>;
}
