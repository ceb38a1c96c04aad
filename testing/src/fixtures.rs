//! In-memory fakes for the provider traits.
//!
//! Each fake records the calls it receives behind a `Mutex` so tests can
//! assert on routing decisions (which bucket, which account, which role)
//! without any network access.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use al_core::traits::{
    BuildRunner, CallerIdentity, ImageRegistry, ProjectStore, RoleStore, SourceStore,
};
use al_core::types::{AccountId, BuildSnapshot, BuildStatus, ProjectSpec, SessionCredentials};
use async_trait::async_trait;
use config::{AgentConfig, AwsSettings, CodeBuildSettings};
use errors::{BuildError, IdentityError, ProvisionError, StagingError};

/// Owner sentinel set by [`FakeSourceStore::create_bucket`]: a bucket the
/// fake itself created matches any expected owner on later probes.
const SELF_OWNED: &str = "*";

/// Canned agent configuration used across integration tests.
pub fn sample_agent_config(name: &str, cross_account_role: Option<&str>) -> AgentConfig {
    AgentConfig {
        name: name.to_string(),
        entrypoint: "app/main.rs".to_string(),
        aws: AwsSettings {
            account: Some("123456789012".to_string()),
            region: "us-west-2".to_string(),
            execution_role: None,
            ecr_repository: Some(format!(
                "123456789012.dkr.ecr.us-west-2.amazonaws.com/{name}"
            )),
            ..AwsSettings::default()
        },
        codebuild: CodeBuildSettings {
            execution_role: cross_account_role.map(str::to_string),
            ..CodeBuildSettings::default()
        },
    }
}

/// Fake STS: a fixed caller account and scripted role assumptions.
pub struct FakeIdentity {
    account: AccountId,
    fail_assume: bool,
    pub assumed: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn new(account: &str) -> Self {
        Self {
            account: AccountId::new(account).expect("test account id"),
            fail_assume: false,
            assumed: Mutex::new(Vec::new()),
        }
    }

    /// Every assumption attempt fails, as a denied trust policy would.
    pub fn with_assume_failure(account: &str) -> Self {
        Self {
            fail_assume: true,
            ..Self::new(account)
        }
    }
}

#[async_trait]
impl CallerIdentity for FakeIdentity {
    async fn account(&self) -> Result<AccountId, IdentityError> {
        Ok(self.account.clone())
    }

    async fn assume_role(
        &self,
        role_arn: &str,
        _session_name: &str,
    ) -> Result<SessionCredentials, IdentityError> {
        if self.fail_assume {
            return Err(IdentityError::Assumption {
                role_arn: role_arn.to_string(),
                reason: "trust policy denied".to_string(),
            });
        }
        self.assumed.lock().unwrap().push(role_arn.to_string());
        Ok(SessionCredentials {
            access_key_id: "AKIAFAKE".to_string(),
            secret_access_key: "fake-secret".to_string(),
            session_token: "fake-token".to_string(),
        })
    }
}

/// Fake S3: a map of bucket name to owning account.
#[derive(Default)]
pub struct FakeSourceStore {
    pub owners: Mutex<HashMap<String, String>>,
    pub created: Mutex<Vec<(String, String)>>,
    pub objects: Mutex<Vec<(String, String, usize)>>,
    pub head_calls: Mutex<u32>,
}

impl FakeSourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-existing bucket owned by `owner`.
    pub fn with_bucket(self, bucket: &str, owner: &str) -> Self {
        self.owners
            .lock()
            .unwrap()
            .insert(bucket.to_string(), owner.to_string());
        self
    }
}

#[async_trait]
impl SourceStore for FakeSourceStore {
    async fn bucket_exists(
        &self,
        bucket: &str,
        expected_owner: &AccountId,
    ) -> Result<bool, StagingError> {
        *self.head_calls.lock().unwrap() += 1;
        match self.owners.lock().unwrap().get(bucket) {
            None => Ok(false),
            Some(owner) if owner == SELF_OWNED || owner == expected_owner.as_str() => Ok(true),
            Some(_) => Err(StagingError::ForeignOwner {
                bucket: bucket.to_string(),
                expected_owner: expected_owner.to_string(),
            }),
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), StagingError> {
        self.owners
            .lock()
            .unwrap()
            .insert(bucket.to_string(), SELF_OWNED.to_string());
        self.created
            .lock()
            .unwrap()
            .push((bucket.to_string(), region.to_string()));
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), StagingError> {
        self.objects
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), body.len()));
        Ok(())
    }
}

/// Fake CodeBuild covering both the project store and the build runner.
#[derive(Default)]
pub struct FakeCodeBuild {
    pub projects: Mutex<HashMap<String, ProjectSpec>>,
    pub creates: Mutex<u32>,
    pub updates: Mutex<u32>,
    pub started: Mutex<Vec<String>>,
    pub stopped: Mutex<Vec<String>>,
    /// The next create loses the remote uniqueness race.
    pub create_conflict: Mutex<bool>,
    /// Snapshots returned by successive polls; the last entry repeats.
    pub snapshots: Mutex<VecDeque<BuildSnapshot>>,
    /// Number of leading polls that fail with a transient error.
    pub poll_failures: Mutex<u32>,
}

impl FakeCodeBuild {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake that reports one terminal status after `leading` in-progress
    /// polls.
    pub fn with_terminal_status(status: BuildStatus, leading: usize) -> Self {
        let fake = Self::default();
        {
            let mut snapshots = fake.snapshots.lock().unwrap();
            for _ in 0..leading {
                snapshots.push_back(BuildSnapshot {
                    status: BuildStatus::InProgress,
                    phase: Some("BUILD".to_string()),
                    logs_url: None,
                });
            }
            snapshots.push_back(BuildSnapshot {
                status,
                phase: Some("COMPLETED".to_string()),
                logs_url: Some("https://console.aws.amazon.com/codesuite/codebuild".to_string()),
            });
        }
        fake
    }
}

#[async_trait]
impl ProjectStore for FakeCodeBuild {
    async fn project_exists(&self, name: &str) -> Result<bool, BuildError> {
        Ok(self.projects.lock().unwrap().contains_key(name))
    }

    async fn create_project(&self, spec: &ProjectSpec) -> Result<(), BuildError> {
        let mut conflict = self.create_conflict.lock().unwrap();
        if *conflict {
            *conflict = false;
            self.projects
                .lock()
                .unwrap()
                .insert(spec.name.clone(), spec.clone());
            return Err(BuildError::ProjectExists {
                name: spec.name.clone(),
            });
        }
        drop(conflict);
        *self.creates.lock().unwrap() += 1;
        self.projects
            .lock()
            .unwrap()
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn update_project(&self, spec: &ProjectSpec) -> Result<(), BuildError> {
        *self.updates.lock().unwrap() += 1;
        self.projects
            .lock()
            .unwrap()
            .insert(spec.name.clone(), spec.clone());
        Ok(())
    }
}

#[async_trait]
impl BuildRunner for FakeCodeBuild {
    async fn start_build(&self, project: &str) -> Result<String, BuildError> {
        let id = format!("{project}:{}", uuid::Uuid::new_v4());
        self.started.lock().unwrap().push(id.clone());
        Ok(id)
    }

    async fn build_snapshot(&self, execution_id: &str) -> Result<BuildSnapshot, BuildError> {
        {
            let mut failures = self.poll_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(BuildError::Poll {
                    execution_id: execution_id.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
        }
        let mut snapshots = self.snapshots.lock().unwrap();
        if snapshots.len() > 1 {
            Ok(snapshots.pop_front().expect("non-empty queue"))
        } else {
            snapshots
                .front()
                .cloned()
                .ok_or_else(|| BuildError::Poll {
                    execution_id: execution_id.to_string(),
                    reason: "build not found".to_string(),
                })
        }
    }

    async fn stop_build(&self, execution_id: &str) -> Result<(), BuildError> {
        self.stopped.lock().unwrap().push(execution_id.to_string());
        Ok(())
    }
}

/// Fake ECR: a map of repository name to URI.
#[derive(Default)]
pub struct FakeRegistry {
    pub repositories: Mutex<HashMap<String, String>>,
    pub creates: Mutex<u32>,
    /// The next create loses the remote uniqueness race.
    pub create_conflict: Mutex<bool>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(self, name: &str, uri: &str) -> Self {
        self.repositories
            .lock()
            .unwrap()
            .insert(name.to_string(), uri.to_string());
        self
    }

    fn uri_for(name: &str) -> String {
        format!("123456789012.dkr.ecr.us-west-2.amazonaws.com/{name}")
    }
}

#[async_trait]
impl ImageRegistry for FakeRegistry {
    async fn repository_uri(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        Ok(self.repositories.lock().unwrap().get(name).cloned())
    }

    async fn create_repository(&self, name: &str) -> Result<String, ProvisionError> {
        let mut conflict = self.create_conflict.lock().unwrap();
        if *conflict {
            *conflict = false;
            self.repositories
                .lock()
                .unwrap()
                .insert(name.to_string(), Self::uri_for(name));
            return Err(ProvisionError::AlreadyExists {
                resource: format!("ecr repository {name}"),
            });
        }
        drop(conflict);
        *self.creates.lock().unwrap() += 1;
        let uri = Self::uri_for(name);
        self.repositories
            .lock()
            .unwrap()
            .insert(name.to_string(), uri.clone());
        Ok(uri)
    }
}

/// Fake IAM: a map of role name to ARN plus recorded inline policies.
#[derive(Default)]
pub struct FakeRoleStore {
    pub roles: Mutex<HashMap<String, String>>,
    pub policies: Mutex<Vec<(String, String, String)>>,
    pub creates: Mutex<u32>,
    /// The next create loses the remote uniqueness race.
    pub create_conflict: Mutex<bool>,
    account: String,
}

impl FakeRoleStore {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Self::default()
        }
    }

    pub fn with_role(self, name: &str) -> Self {
        let arn = format!("arn:aws:iam::{}:role/{name}", self.account);
        self.roles.lock().unwrap().insert(name.to_string(), arn);
        self
    }
}

#[async_trait]
impl RoleStore for FakeRoleStore {
    async fn role_arn(&self, name: &str) -> Result<Option<String>, ProvisionError> {
        Ok(self.roles.lock().unwrap().get(name).cloned())
    }

    async fn create_role(
        &self,
        name: &str,
        _trust_policy: &str,
        _description: &str,
    ) -> Result<String, ProvisionError> {
        let arn = format!("arn:aws:iam::{}:role/{name}", self.account);
        let mut conflict = self.create_conflict.lock().unwrap();
        if *conflict {
            *conflict = false;
            self.roles
                .lock()
                .unwrap()
                .insert(name.to_string(), arn);
            return Err(ProvisionError::AlreadyExists {
                resource: format!("iam role {name}"),
            });
        }
        drop(conflict);
        *self.creates.lock().unwrap() += 1;
        self.roles
            .lock()
            .unwrap()
            .insert(name.to_string(), arn.clone());
        Ok(arn)
    }

    async fn put_role_policy(
        &self,
        role_name: &str,
        policy_name: &str,
        policy: &str,
    ) -> Result<(), ProvisionError> {
        self.policies.lock().unwrap().push((
            role_name.to_string(),
            policy_name.to_string(),
            policy.to_string(),
        ));
        Ok(())
    }
}
