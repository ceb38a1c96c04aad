//! CodeBuild client adapter.
//!
//! Implements both halves of the managed build service: the project store
//! and the build runner. Everything here is a thin mapping between the SDK
//! surface and the `al_core` traits; lifecycle decisions live in
//! [`crate::project`] and [`crate::execution`].

use async_trait::async_trait;
use aws_sdk_codebuild::types::{
    ArtifactsType, ComputeType, EnvironmentType, ProjectArtifacts, ProjectEnvironment,
    ProjectSource, SourceType,
};

use al_core::traits::{BuildRunner, ProjectStore};
use al_core::types::{BuildSnapshot, BuildStatus, ProjectSpec};
use errors::BuildError;

pub struct CodeBuildApi {
    client: aws_sdk_codebuild::Client,
}

impl CodeBuildApi {
    pub fn new(client: aws_sdk_codebuild::Client) -> Self {
        Self { client }
    }
}

fn sdk_project_parts(
    spec: &ProjectSpec,
) -> Result<(ProjectSource, ProjectArtifacts, ProjectEnvironment), BuildError> {
    let invalid = |reason: String| BuildError::Project {
        name: spec.name.clone(),
        reason,
    };

    let source = ProjectSource::builder()
        .r#type(SourceType::S3)
        .location(format!("{}/{}", spec.source_bucket, spec.source_key))
        .buildspec(&spec.buildspec)
        .build()
        .map_err(|e| invalid(e.to_string()))?;
    let artifacts = ProjectArtifacts::builder()
        .r#type(ArtifactsType::NoArtifacts)
        .build()
        .map_err(|e| invalid(e.to_string()))?;
    let environment = ProjectEnvironment::builder()
        .r#type(EnvironmentType::from(spec.environment_type.as_str()))
        .image(&spec.image)
        .compute_type(ComputeType::from(spec.compute_type.as_str()))
        .privileged_mode(spec.privileged)
        .build()
        .map_err(|e| invalid(e.to_string()))?;
    Ok((source, artifacts, environment))
}

#[async_trait]
impl ProjectStore for CodeBuildApi {
    async fn project_exists(&self, name: &str) -> Result<bool, BuildError> {
        let out = self
            .client
            .batch_get_projects()
            .names(name)
            .send()
            .await
            .map_err(|e| BuildError::Project {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(!out.projects().is_empty())
    }

    async fn create_project(&self, spec: &ProjectSpec) -> Result<(), BuildError> {
        let (source, artifacts, environment) = sdk_project_parts(spec)?;
        match self
            .client
            .create_project()
            .name(&spec.name)
            .source(source)
            .artifacts(artifacts)
            .environment(environment)
            .service_role(&spec.service_role)
            .timeout_in_minutes(spec.timeout_minutes)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_already_exists_exception()) =>
            {
                Err(BuildError::ProjectExists {
                    name: spec.name.clone(),
                })
            }
            Err(err) => Err(BuildError::Project {
                name: spec.name.clone(),
                reason: err.to_string(),
            }),
        }
    }

    async fn update_project(&self, spec: &ProjectSpec) -> Result<(), BuildError> {
        let (source, artifacts, environment) = sdk_project_parts(spec)?;
        self.client
            .update_project()
            .name(&spec.name)
            .source(source)
            .artifacts(artifacts)
            .environment(environment)
            .service_role(&spec.service_role)
            .timeout_in_minutes(spec.timeout_minutes)
            .send()
            .await
            .map_err(|e| BuildError::Project {
                name: spec.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl BuildRunner for CodeBuildApi {
    async fn start_build(&self, project: &str) -> Result<String, BuildError> {
        let out = self
            .client
            .start_build()
            .project_name(project)
            .send()
            .await
            .map_err(|e| BuildError::StartFailed {
                project: project.to_string(),
                reason: e.to_string(),
            })?;
        out.build_value()
            .and_then(|b| b.id())
            .map(str::to_string)
            .ok_or_else(|| BuildError::StartFailed {
                project: project.to_string(),
                reason: "no build id returned".to_string(),
            })
    }

    async fn build_snapshot(&self, execution_id: &str) -> Result<BuildSnapshot, BuildError> {
        let poll_err = |reason: String| BuildError::Poll {
            execution_id: execution_id.to_string(),
            reason,
        };
        let out = self
            .client
            .batch_get_builds()
            .ids(execution_id)
            .send()
            .await
            .map_err(|e| poll_err(e.to_string()))?;
        let build = out
            .builds()
            .first()
            .ok_or_else(|| poll_err("build not found".to_string()))?;
        // Unknown statuses read as still running; the deadline bounds them
        let status = build
            .build_status()
            .map(|s| s.as_str().parse::<BuildStatus>().unwrap_or(BuildStatus::InProgress))
            .unwrap_or(BuildStatus::InProgress);
        Ok(BuildSnapshot {
            status,
            phase: build.current_phase().map(str::to_string),
            logs_url: build.logs().and_then(|l| l.deep_link()).map(str::to_string),
        })
    }

    async fn stop_build(&self, execution_id: &str) -> Result<(), BuildError> {
        match self.client.stop_build().id(execution_id).send().await {
            Ok(_) => Ok(()),
            // stopping a finished build reports invalid input; treat as done
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_invalid_input_exception()) =>
            {
                Ok(())
            }
            Err(err) => Err(BuildError::StopFailed {
                execution_id: execution_id.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}
