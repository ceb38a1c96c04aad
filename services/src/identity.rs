//! Identity resolution and cross-account session derivation.
//!
//! The deployment account comes from the ambient credentials' caller
//! identity. When a cross-account build role is configured, that role is
//! assumed exactly once here and the resulting session becomes the build
//! context; every build-owned resource is then reached through it.

use async_trait::async_trait;

use al_core::traits::CallerIdentity;
use al_core::types::{AccountId, AccountTopology, RoleArn, SessionCredentials};
use errors::IdentityError;
use tracing::{debug, info};

use crate::aws::AwsContext;

/// STS-backed [`CallerIdentity`].
pub struct StsIdentity {
    client: aws_sdk_sts::Client,
}

impl StsIdentity {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallerIdentity for StsIdentity {
    async fn account(&self) -> Result<AccountId, IdentityError> {
        let out = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| IdentityError::Resolution {
                reason: e.to_string(),
            })?;
        let account = out.account().ok_or_else(|| IdentityError::Resolution {
            reason: "caller identity has no account".to_string(),
        })?;
        AccountId::new(account).ok_or_else(|| IdentityError::Resolution {
            reason: format!("malformed account id: {account}"),
        })
    }

    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<SessionCredentials, IdentityError> {
        let out = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| IdentityError::Assumption {
                role_arn: role_arn.to_string(),
                reason: e.to_string(),
            })?;
        let creds = out.credentials().ok_or_else(|| IdentityError::Assumption {
            role_arn: role_arn.to_string(),
            reason: "no credentials returned".to_string(),
        })?;
        Ok(SessionCredentials {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().to_string(),
        })
    }
}

/// Pure parse of the build account out of a role reference.
///
/// Malformed or absent input yields `None`: a bad override degrades to
/// same-account mode rather than aborting the launch.
pub fn extract_build_account(build_role: Option<&str>) -> Option<AccountId> {
    build_role
        .and_then(RoleArn::parse)
        .map(|role| role.account().clone())
}

/// Resolve the account topology for one launch.
pub async fn resolve_topology(
    identity: &dyn CallerIdentity,
    build_role: Option<&str>,
) -> Result<AccountTopology, IdentityError> {
    let deployment = identity.account().await?;
    let build = extract_build_account(build_role);
    match &build {
        Some(build) => {
            info!(deployment = %deployment, build = %build, "cross-account build enabled");
        }
        None => {
            debug!(account = %deployment, "same-account build");
        }
    }
    Ok(AccountTopology::new(deployment, build))
}

/// Exchange deployment credentials for a build-account context.
///
/// `None` when no well-formed cross-account role is configured. This is the
/// only operation that performs a role-assumption call; failure is fatal
/// since retrying cannot fix an authorization mismatch.
pub async fn derive_build_context(
    identity: &dyn CallerIdentity,
    deployment: &AwsContext,
    build_role: Option<&str>,
) -> Result<Option<AwsContext>, IdentityError> {
    let Some(role) = build_role.and_then(RoleArn::parse) else {
        return Ok(None);
    };
    let session_name = format!("airlift-build-{}", chrono::Utc::now().timestamp());
    let creds = identity.assume_role(role.as_str(), &session_name).await?;
    info!(role = %role, "assumed cross-account build role");
    Ok(Some(AwsContext::from_session(&creds, deployment.region()).await))
}
