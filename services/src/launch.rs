//! One deployment request from source tree to image.
//!
//! Sequences identity, staging, project management, and execution for a
//! single launch. Any step's failure aborts the remaining steps; each
//! step's own retry policy is exhausted first.

use std::path::{Path, PathBuf};
use std::time::Duration;

use al_core::traits::{ImageRegistry, RoleStore};
use al_core::types::BuildOutcome;
use config::AgentConfig;
use errors::LaunchResult;
use tracing::info;

use crate::service::CodeBuildService;
use crate::{ecr, roles};

/// Inputs for one launch, already resolved from configuration.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub agent: String,
    pub source_root: PathBuf,
    /// Short repository name within the registry.
    pub ecr_repository: String,
    /// Explicit service role override; always wins over provisioning.
    pub execution_role: Option<String>,
    /// Provision the repository and return before touching staging or the
    /// build.
    pub ecr_only: bool,
    pub compute_type: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl LaunchRequest {
    pub fn from_config(agent: &AgentConfig, source_root: &Path, ecr_only: bool) -> Self {
        let ecr_repository = agent
            .aws
            .ecr_repository
            .as_deref()
            .map(repository_name)
            .unwrap_or_else(|| format!("airlift-{}", agent.name));
        Self {
            agent: agent.name.clone(),
            source_root: source_root.to_path_buf(),
            ecr_repository,
            execution_role: agent.aws.execution_role.clone(),
            ecr_only,
            compute_type: agent.codebuild.compute_type.clone(),
            poll_interval: Duration::from_secs(agent.codebuild.poll_interval_seconds),
            timeout: Duration::from_secs(agent.codebuild.timeout_minutes * 60),
        }
    }
}

/// Short repository name from either a bare name or a full registry URI.
fn repository_name(target: &str) -> String {
    target.rsplit('/').next().unwrap_or(target).to_string()
}

/// Execute the launch workflow.
///
/// `registry` and `deployment_roles` act in the deployment account;
/// everything behind `service` acts in the account that owns the build.
pub async fn run_launch(
    service: &CodeBuildService,
    registry: &dyn ImageRegistry,
    deployment_roles: &dyn RoleStore,
    request: &LaunchRequest,
) -> LaunchResult<BuildOutcome> {
    // The image repository exists independent of any build
    let image_uri = ecr::ensure_repository(registry, &request.ecr_repository).await?;

    if request.ecr_only {
        info!(agent = %request.agent, "repository provisioned, skipping build");
        return Ok(BuildOutcome {
            execution_id: None,
            image_uri: Some(image_uri),
            logs_url: None,
        });
    }

    // Execution role: an explicit override always wins; cross-account
    // provisions in the build account; same-account defers to the
    // deployment-account collaborator
    let service_role = match &request.execution_role {
        Some(role) => role.clone(),
        None if service.is_cross_account() => service.create_build_role(&request.agent).await?,
        None => roles::ensure_execution_role(deployment_roles, &request.agent).await?,
    };

    // Stage the source under the owning account
    let (bucket, key) = service
        .upload_source(&request.agent, &request.source_root)
        .await?;

    let project = service
        .create_or_update_project(
            &request.agent,
            &image_uri,
            &service_role,
            &bucket,
            &key,
            &request.compute_type,
        )
        .await?;

    let execution_id = service.start_build(&project).await?;
    let snapshot = service
        .wait_for_completion(&execution_id, request.poll_interval, request.timeout)
        .await?;

    info!(agent = %request.agent, execution_id = %execution_id, "launch complete");
    Ok(BuildOutcome {
        execution_id: Some(execution_id),
        image_uri: Some(format!("{image_uri}:latest")),
        logs_url: snapshot.logs_url,
    })
}
