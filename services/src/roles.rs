//! IAM role provisioning.
//!
//! The same-account execution role lives here as a caller-level
//! collaborator; the cross-account build role is provisioned through
//! [`crate::project::create_build_role`] against the build account instead.

use async_trait::async_trait;
use serde_json::json;

use al_core::traits::RoleStore;
use errors::ProvisionError;
use tracing::{debug, info};

use crate::source::STAGING_BUCKET_PREFIX;

pub const EXECUTION_ROLE_PREFIX: &str = "AirliftExecution";

/// IAM-backed [`RoleStore`].
pub struct IamRoleStore {
    client: aws_sdk_iam::Client,
}

impl IamRoleStore {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleStore for IamRoleStore {
    async fn role_arn(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        match self.client.get_role().role_name(name).send().await {
            Ok(out) => Ok(out.role().map(|r| r.arn().to_string())),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_no_such_entity_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(ProvisionError::Role {
                name: name.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    async fn create_role(
        &self,
        name: &str,
        trust_policy: &str,
        description: &str,
    ) -> Result<String, ProvisionError> {
        match self
            .client
            .create_role()
            .role_name(name)
            .assume_role_policy_document(trust_policy)
            .description(description)
            .send()
            .await
        {
            Ok(out) => out
                .role()
                .map(|r| r.arn().to_string())
                .ok_or_else(|| ProvisionError::Role {
                    name: name.to_string(),
                    reason: "no role returned".to_string(),
                }),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_entity_already_exists_exception()) =>
            {
                Err(ProvisionError::AlreadyExists {
                    resource: format!("iam role {name}"),
                })
            }
            Err(err) => Err(ProvisionError::Role {
                name: name.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy: &str,
    ) -> Result<(), ProvisionError> {
        self.client
            .put_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .policy_document(policy)
            .send()
            .await
            .map_err(|e| ProvisionError::Role {
                name: role_name.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// Same-account execution role for the build project: created once per
/// agent in the deployment account, read back on every later launch.
pub async fn ensure_execution_role(
    roles: &dyn RoleStore,
    agent: &str,
) -> Result<String, ProvisionError> {
    let role_name = format!("{EXECUTION_ROLE_PREFIX}-{agent}");
    if let Some(arn) = roles.role_arn(&role_name).await? {
        debug!(role = %role_name, "execution role already present");
        return Ok(arn);
    }

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
        .create_role(&role_name, &trust, "Execution role managed by airlift")
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
                "Resource": format!("arn:aws:s3:::{STAGING_BUCKET_PREFIX}-*/*")
            },
            {
                "Effect": "Allow",
                "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                "Resource": "*"
            },
        ]
    })
    .to_string();
    roles
        .put_role_policy(&role_name, "airlift-execution", &policy)
        .await?;
    info!(role = %role_name, "execution role ready");
    Ok(arn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::FakeRoleStore;

    #[tokio::test]
    async fn test_ensure_execution_role_creates_once() {
        let roles = FakeRoleStore::new("123456789012");

        let first = ensure_execution_role(&roles, "test-agent").await.unwrap();
        let second = ensure_execution_role(&roles, "test-agent").await.unwrap();

        assert_eq!(first, "arn:aws:iam::123456789012:role/AirliftExecution-test-agent");
        assert_eq!(first, second);
        assert_eq!(*roles.creates.lock().unwrap(), 1);
        assert_eq!(roles.policies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_execution_role_resolves_create_race() {
        let roles = FakeRoleStore::new("123456789012");
        *roles.create_conflict.lock().unwrap() = true;

        let arn = ensure_execution_role(&roles, "test-agent").await.unwrap();
        assert_eq!(arn, "arn:aws:iam::123456789012:role/AirliftExecution-test-agent");
        assert_eq!(*roles.creates.lock().unwrap(), 0);
    }
}
