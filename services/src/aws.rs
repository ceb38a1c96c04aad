//! AWS client construction.
//!
//! One [`AwsContext`] per account: the deployment context comes from the
//! ambient credential chain, the build context from an assumed role. All
//! service clients for a given account are built here so nothing else in
//! the crate touches raw SDK configuration.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;

use al_core::types::SessionCredentials;

use crate::codebuild::CodeBuildApi;
use crate::ecr::EcrRegistry;
use crate::identity::StsIdentity;
use crate::roles::IamRoleStore;
use crate::source::S3SourceStore;

/// Credential context for one AWS account, plus the region every resource
/// lives in.
#[derive(Clone)]
pub struct AwsContext {
    sdk: SdkConfig,
    region: String,
}

impl AwsContext {
    /// Context from the ambient credential chain (env, profile, IMDS).
    pub async fn from_env(region: &str) -> Self {
        let sdk = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            sdk,
            region: region.to_string(),
        }
    }

    /// Context from assumed-role session credentials, same region.
    pub async fn from_session(creds: &SessionCredentials, region: &str) -> Self {
        let provider = Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            Some(creds.session_token.clone()),
            None,
            "airlift-cross-account",
        );
        let sdk = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            sdk,
            region: region.to_string(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn identity(&self) -> StsIdentity {
        StsIdentity::new(aws_sdk_sts::Client::new(&self.sdk))
    }

    pub fn source_store(&self) -> S3SourceStore {
        S3SourceStore::new(aws_sdk_s3::Client::new(&self.sdk))
    }

    pub fn codebuild(&self) -> CodeBuildApi {
        CodeBuildApi::new(aws_sdk_codebuild::Client::new(&self.sdk))
    }

    pub fn registry(&self) -> EcrRegistry {
        EcrRegistry::new(aws_sdk_ecr::Client::new(&self.sdk))
    }

    pub fn roles(&self) -> IamRoleStore {
        IamRoleStore::new(aws_sdk_iam::Client::new(&self.sdk))
    }
}
