//! ECR repository provisioning.
//!
//! Called before (or independent of) the build; the repository lives in the
//! deployment account and the build pushes into it.

use async_trait::async_trait;

use al_core::traits::ImageRegistry;
use errors::ProvisionError;
use tracing::{debug, info};

/// ECR-backed [`ImageRegistry`].
pub struct EcrRegistry {
    client: aws_sdk_ecr::Client,
}

impl EcrRegistry {
    pub fn new(client: aws_sdk_ecr::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageRegistry for EcrRegistry {
    async fn repository_uri(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        match self
            .client
            .describe_repositories()
            .repository_names(name)
            .send()
            .await
        {
            Ok(out) => Ok(out
                .repositories()
                .first()
                .and_then(|r| r.repository_uri())
                .map(str::to_string)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_repository_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(ProvisionError::Repository {
                name: name.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<String, ProvisionError> {
        match self
            .client
            .create_repository()
            .repository_name(name)
            .send()
            .await
        {
            Ok(out) => out
                .repository()
                .and_then(|r| r.repository_uri())
                .map(str::to_string)
                .ok_or_else(|| ProvisionError::Repository {
                    name: name.to_string(),
                    reason: "no repository uri returned".to_string(),
                }),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_repository_already_exists_exception()) =>
            {
                Err(ProvisionError::AlreadyExists {
                    resource: format!("ecr repository {name}"),
                })
            }
            Err(err) => Err(ProvisionError::Repository {
                name: name.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Create the repository if needed and return its URI.
pub async fn ensure_repository(
    registry: &dyn ImageRegistry,
    name: &str,
) -> Result<String, ProvisionError> {
    if let Some(uri) = registry.repository_uri(name).await? {
        debug!(repository = name, "repository already present");
        return Ok(uri);
    }
    match registry.create_repository(name).await {
        Ok(uri) => {
            info!(repository = name, "created repository");
            Ok(uri)
        }
        Err(ProvisionError::AlreadyExists { .. }) => registry
            .repository_uri(name)
            .await?
            .ok_or_else(|| ProvisionError::Repository {
                name: name.to_string(),
                reason: "repository vanished after create conflict".to_string(),
            }),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testing::FakeRegistry;

    #[tokio::test]
    async fn test_ensure_repository_creates_when_missing() {
        let registry = FakeRegistry::new();
        let uri = ensure_repository(&registry, "test-repo").await.unwrap();
        assert_eq!(uri, "123456789012.dkr.ecr.us-west-2.amazonaws.com/test-repo");
        assert_eq!(*registry.creates.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ensure_repository_reuses_existing() {
        let registry = FakeRegistry::new()
            .with_repository("test-repo", "123456789012.dkr.ecr.us-west-2.amazonaws.com/test-repo");
        let uri = ensure_repository(&registry, "test-repo").await.unwrap();
        assert_eq!(uri, "123456789012.dkr.ecr.us-west-2.amazonaws.com/test-repo");
        assert_eq!(*registry.creates.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ensure_repository_resolves_create_race() {
        let registry = FakeRegistry::new();
        *registry.create_conflict.lock().unwrap() = true;
        let uri = ensure_repository(&registry, "test-repo").await.unwrap();
        assert_eq!(uri, "123456789012.dkr.ecr.us-west-2.amazonaws.com/test-repo");
        assert_eq!(*registry.creates.lock().unwrap(), 0);
    }
}
