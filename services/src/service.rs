//! The cross-account build service.
//!
//! Owns both credential contexts for the duration of one launch and routes
//! every resource operation through the account that owns it. The topology
//! is computed once at construction and immutable for the service's
//! lifetime; the staging bucket name is resolved lazily and memoized.
//!
//! One service instance backs one launch; it is not shared across
//! concurrently-running deployments.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use al_core::traits::{BuildRunner, ProjectStore, RoleStore, SourceStore};
use al_core::types::{AccountId, AccountTopology, BuildSnapshot};
use errors::{BuildError, IdentityError, ProvisionError, StagingError};
use tracing::info;

use crate::aws::AwsContext;
use crate::{execution, identity, project, source};

pub struct CodeBuildService {
    topology: AccountTopology,
    region: String,
    sources: Arc<dyn SourceStore>,
    projects: Arc<dyn ProjectStore>,
    runner: Arc<dyn BuildRunner>,
    roles: Arc<dyn RoleStore>,
    staging_bucket: OnceCell<String>,
}

impl CodeBuildService {
    /// Connect against live AWS.
    ///
    /// Resolves the deployment account, assumes the cross-account role when
    /// one is configured, and wires every store to the account that owns
    /// the build. This is the only place a second credential context is
    /// created.
    pub async fn connect(
        deployment: AwsContext,
        cross_account_role: Option<&str>,
    ) -> Result<Self, IdentityError> {
        let sts = deployment.identity();
        let topology = identity::resolve_topology(&sts, cross_account_role).await?;
        let build_context =
            identity::derive_build_context(&sts, &deployment, cross_account_role).await?;
        let owning = build_context.as_ref().unwrap_or(&deployment);
        let region = deployment.region().to_string();
        Ok(Self::from_parts(
            topology,
            region,
            Arc::new(owning.source_store()),
            Arc::new(owning.codebuild()),
            Arc::new(owning.codebuild()),
            Arc::new(owning.roles()),
        ))
    }

    /// Assemble from pre-built stores; the seam used by tests.
    pub fn from_parts(
        topology: AccountTopology,
        region: String,
        sources: Arc<dyn SourceStore>,
        projects: Arc<dyn ProjectStore>,
        runner: Arc<dyn BuildRunner>,
        roles: Arc<dyn RoleStore>,
    ) -> Self {
        Self {
            topology,
            region,
            sources,
            projects,
            runner,
            roles,
            staging_bucket: OnceCell::new(),
        }
    }

    pub fn topology(&self) -> &AccountTopology {
        &self.topology
    }

    pub fn is_cross_account(&self) -> bool {
        self.topology.is_cross_account()
    }

    pub fn deployment_account(&self) -> &AccountId {
        self.topology.deployment_account()
    }

    pub fn build_account(&self) -> Option<&AccountId> {
        self.topology.build_account()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Staging bucket in the owning account, created on first use and
    /// memoized for the service lifetime.
    pub async fn staging_bucket(&self) -> Result<&str, StagingError> {
        self.staging_bucket
            .get_or_try_init(|| async {
                let owner = self.topology.owning_account();
                source::ensure_staging_bucket(self.sources.as_ref(), owner, &self.region).await
            })
            .await
            .map(String::as_str)
    }

    /// Package the tree at `source_root` and upload it for `agent`.
    /// Returns the staging bucket and object key.
    pub async fn upload_source(
        &self,
        agent: &str,
        source_root: &Path,
    ) -> Result<(String, String), StagingError> {
        let archive = source::package_source(source_root)?;
        let bucket = self.staging_bucket().await?.to_string();
        let key = source::source_key(agent);
        self.sources.put_object(&bucket, &key, archive).await?;
        info!(bucket = %bucket, key = %key, "uploaded source archive");
        Ok((bucket, key))
    }

    /// Create or update the build project for `agent` under the owning
    /// account.
    pub async fn create_or_update_project(
        &self,
        agent: &str,
        ecr_uri: &str,
        service_role: &str,
        source_bucket: &str,
        source_key: &str,
        compute_type: &str,
    ) -> Result<String, BuildError> {
        let spec = project::build_project_spec(
            agent,
            ecr_uri,
            service_role,
            source_bucket,
            source_key,
            &self.region,
            compute_type,
        )?;
        project::create_or_update_project(self.projects.as_ref(), &spec).await
    }

    /// Provision the build service role in the owning account.
    pub async fn create_build_role(&self, agent: &str) -> Result<String, ProvisionError> {
        let owner = self.topology.owning_account();
        let bucket = source::staging_bucket_name(owner, &self.region);
        project::create_build_role(self.roles.as_ref(), agent, owner, &self.region, &bucket).await
    }

    pub async fn start_build(&self, project_name: &str) -> Result<String, BuildError> {
        execution::start_build(self.runner.as_ref(), project_name).await
    }

    pub async fn wait_for_completion(
        &self,
        execution_id: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<BuildSnapshot, BuildError> {
        execution::await_completion(self.runner.as_ref(), execution_id, poll_interval, timeout)
            .await
    }

    pub async fn stop_build(&self, execution_id: &str) -> Result<(), BuildError> {
        execution::stop_build(self.runner.as_ref(), execution_id).await
    }
}
