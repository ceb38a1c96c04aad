//! Build project definition: naming, buildspec rendering, idempotent
//! create-or-update, and the build-account execution role.

use serde_json::json;

use al_core::traits::{ProjectStore, RoleStore};
use al_core::types::{AccountId, ProjectSpec};
use errors::{BuildError, ProvisionError};
use tracing::{info, warn};

pub const PROJECT_PREFIX: &str = "airlift-build";
pub const BUILD_ROLE_PREFIX: &str = "AirliftCodeBuild";

const BUILD_IMAGE: &str = "aws/codebuild/amazonlinux2-aarch64-standard:3.0";
const ENVIRONMENT_TYPE: &str = "ARM_CONTAINER";
const DEFAULT_TIMEOUT_MINUTES: i32 = 60;

/// Deterministic project name for an agent.
pub fn project_name(agent: &str) -> String {
    format!("{PROJECT_PREFIX}-{agent}")
}

fn buildspec_value(ecr_uri: &str, region: &str) -> serde_json::Value {
    let registry = ecr_uri.split('/').next().unwrap_or(ecr_uri);
    json!({
        "version": "0.2",
        "phases": {
            "pre_build": {
                "commands": [
                    format!(
                        "aws ecr get-login-password --region {region} | docker login --username AWS --password-stdin {registry}"
                    ),
                ]
            },
            "build": {
                "commands": [
                    format!("docker build --platform linux/arm64 -t {ecr_uri}:latest ."),
                ]
            },
            "post_build": {
                "commands": [
                    format!("docker push {ecr_uri}:latest"),
                ]
            },
        },
    })
}

/// Assemble the full project spec for one agent build.
pub fn build_project_spec(
    agent: &str,
    ecr_uri: &str,
    service_role: &str,
    source_bucket: &str,
    source_key: &str,
    region: &str,
    compute_type: &str,
) -> Result<ProjectSpec, BuildError> {
    let name = project_name(agent);
    let buildspec = serde_yaml::to_string(&buildspec_value(ecr_uri, region)).map_err(|e| {
        BuildError::Project {
            name: name.clone(),
            reason: e.to_string(),
        }
    })?;
    Ok(ProjectSpec {
        name,
        service_role: service_role.to_string(),
        source_bucket: source_bucket.to_string(),
        source_key: source_key.to_string(),
        buildspec,
        image: BUILD_IMAGE.to_string(),
        compute_type: compute_type.to_string(),
        environment_type: ENVIRONMENT_TYPE.to_string(),
        privileged: true,
        timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
    })
}

/// Create the project, or update it in place when it already exists.
///
/// Losing a concurrent create race surfaces as `ProjectExists` and is
/// retried once as an update; the remote uniqueness constraint is the
/// tie-breaker.
pub async fn create_or_update_project(
    store: &dyn ProjectStore,
    spec: &ProjectSpec,
) -> Result<String, BuildError> {
    if store.project_exists(&spec.name).await? {
        info!(project = %spec.name, "updating existing build project");
        store.update_project(spec).await?;
        return Ok(spec.name.clone());
    }
    match store.create_project(spec).await {
        Ok(()) => {
            info!(project = %spec.name, "created build project");
            Ok(spec.name.clone())
        }
        Err(BuildError::ProjectExists { .. }) => {
            warn!(project = %spec.name, "lost create race, updating instead");
            store.update_project(spec).await?;
            Ok(spec.name.clone())
        }
        Err(err) => Err(err),
    }
}

/// Provision the build service role in the build account.
///
/// Only reached in cross-account mode with no explicit role override; the
/// same-account path provisions through the caller-level collaborator.
pub async fn create_build_role(
    roles: &dyn RoleStore,
    agent: &str,
    account: &AccountId,
    region: &str,
    staging_bucket: &str,
) -> Result<String, ProvisionError> {
    let role_name = format!("{BUILD_ROLE_PREFIX}-{agent}");
    let trust = json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": "codebuild.amazonaws.com" },
            "Action": "sts:AssumeRole",
        }]
    })
    .to_string();

    let arn = match roles
        .create_role(&role_name, &trust, "CodeBuild service role managed by airlift")
        .await
    {
        Ok(arn) => arn,
        Err(ProvisionError::AlreadyExists { .. }) => roles
            .role_arn(&role_name)
            .await?
            .ok_or_else(|| ProvisionError::Role {
                name: role_name.clone(),
                reason: "role vanished after create conflict".to_string(),
            })?,
        Err(err) => return Err(err),
    };

    let policy = json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Action": ["ecr:GetAuthorizationToken"],
                "Resource": "*"
            },
            {
                "Effect": "Allow",
                "Action": [
                    "ecr:BatchCheckLayerAvailability",
                    "ecr:InitiateLayerUpload",
                    "ecr:UploadLayerPart",
                    "ecr:CompleteLayerUpload",
                    "ecr:PutImage",
                    "ecr:BatchGetImage"
                ],
                "Resource": "*"
            },
            {
                "Effect": "Allow",
                "Action": ["s3:GetObject", "s3:GetObjectVersion"],
                "Resource": format!("arn:aws:s3:::{staging_bucket}/*")
            },
            {
                "Effect": "Allow",
                "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                "Resource": format!("arn:aws:logs:{region}:{account}:log-group:/aws/codebuild/*")
            },
        ]
    })
    .to_string();
    roles
        .put_role_policy(&role_name, "airlift-codebuild", &policy)
        .await?;
    info!(role = %role_name, "build execution role ready");
    Ok(arn)
}
