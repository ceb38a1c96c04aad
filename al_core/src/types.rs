use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// 12-digit AWS account identifier.
///
/// Every resource-naming and ownership-check operation must use the id of
/// the account that actually owns the resource; [`AccountTopology`] is the
/// single place that decision is made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.len() == 12 && id.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(id))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| anyhow::anyhow!("Invalid account id: {s}"))
    }
}

/// IAM role ARN split into its meaningful segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleArn {
    account: AccountId,
    name: String,
    raw: String,
}

impl RoleArn {
    /// Parse `arn:aws:iam::<account-id>:role/<role-name>`.
    ///
    /// Malformed input yields `None`, never an error: a bad or missing
    /// cross-account override means same-account mode, not an abort.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix("arn:aws:iam::")?;
        let (account, resource) = rest.split_once(':')?;
        let name = resource.strip_prefix("role/")?;
        if name.is_empty() {
            return None;
        }
        let account = AccountId::new(account)?;
        Some(Self {
            account,
            name: name.to_string(),
            raw: raw.to_string(),
        })
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for RoleArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Which accounts participate in a launch and which one owns the build.
///
/// Computed once when the service is constructed and immutable for its
/// lifetime; every downstream account-selection decision routes through
/// [`AccountTopology::owning_account`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountTopology {
    deployment: AccountId,
    build: Option<AccountId>,
}

impl AccountTopology {
    pub fn new(deployment: AccountId, build: Option<AccountId>) -> Self {
        Self { deployment, build }
    }

    pub fn same_account(deployment: AccountId) -> Self {
        Self::new(deployment, None)
    }

    pub fn cross_account(deployment: AccountId, build: AccountId) -> Self {
        Self::new(deployment, Some(build))
    }

    pub fn deployment_account(&self) -> &AccountId {
        &self.deployment
    }

    pub fn build_account(&self) -> Option<&AccountId> {
        self.build.as_ref()
    }

    pub fn is_cross_account(&self) -> bool {
        self.build.is_some()
    }

    /// The single account-selection rule: build account when cross-account,
    /// deployment account otherwise. Every resource name and ownership check
    /// goes through the account returned here.
    pub fn owning_account(&self) -> &AccountId {
        self.build.as_ref().unwrap_or(&self.deployment)
    }
}

/// Short-lived credentials returned from a role assumption.
#[derive(Clone)]
pub struct SessionCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .finish()
    }
}

/// Build execution status as reported by the managed build service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Fault,
    TimedOut,
    Stopped,
}

impl BuildStatus {
    /// Terminal states end the poll loop; everything but `Succeeded` among
    /// them is a failure.
    pub fn is_terminal(self) -> bool {
        !matches!(self, BuildStatus::Pending | BuildStatus::InProgress)
    }
}

/// Point-in-time view of a build execution.
#[derive(Debug, Clone)]
pub struct BuildSnapshot {
    pub status: BuildStatus,
    pub phase: Option<String>,
    pub logs_url: Option<String>,
}

/// Everything needed to create or update a build project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSpec {
    pub name: String,
    pub service_role: String,
    pub source_bucket: String,
    pub source_key: String,
    pub buildspec: String,
    pub image: String,
    pub compute_type: String,
    pub environment_type: String,
    pub privileged: bool,
    pub timeout_minutes: i32,
}

/// Result of one launch returned to the caller.
///
/// `execution_id` is absent when the launch short-circuited after
/// repository provisioning.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub execution_id: Option<String>,
    pub image_uri: Option<String>,
    pub logs_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_accepts_twelve_digits() {
        let id = AccountId::new("123456789012").unwrap();
        assert_eq!(id.as_str(), "123456789012");
    }

    #[test]
    fn test_account_id_rejects_malformed() {
        assert!(AccountId::new("12345").is_none());
        assert!(AccountId::new("1234567890123").is_none());
        assert!(AccountId::new("12345678901a").is_none());
        assert!(AccountId::new("").is_none());
    }

    #[test]
    fn test_role_arn_parse_well_formed() {
        let arn = RoleArn::parse("arn:aws:iam::987654321098:role/BuildRole").unwrap();
        assert_eq!(arn.account().as_str(), "987654321098");
        assert_eq!(arn.name(), "BuildRole");
        assert_eq!(arn.as_str(), "arn:aws:iam::987654321098:role/BuildRole");
    }

    #[test]
    fn test_role_arn_parse_nested_path() {
        let arn = RoleArn::parse("arn:aws:iam::987654321098:role/service/BuildRole").unwrap();
        assert_eq!(arn.account().as_str(), "987654321098");
        assert_eq!(arn.name(), "service/BuildRole");
    }

    #[test]
    fn test_role_arn_parse_malformed_is_none() {
        for raw in [
            "invalid-arn",
            "",
            "arn:aws:iam::12345:role/Short",
            "arn:aws:iam::987654321098:user/NotARole",
            "arn:aws:iam::987654321098:role/",
            "arn:aws:s3:::some-bucket",
        ] {
            assert!(RoleArn::parse(raw).is_none(), "expected None for {raw:?}");
        }
    }

    #[test]
    fn test_topology_same_account_owning() {
        let topology = AccountTopology::same_account(AccountId::new("123456789012").unwrap());
        assert!(!topology.is_cross_account());
        assert!(topology.build_account().is_none());
        assert_eq!(topology.owning_account().as_str(), "123456789012");
    }

    #[test]
    fn test_topology_cross_account_owning() {
        let topology = AccountTopology::cross_account(
            AccountId::new("123456789012").unwrap(),
            AccountId::new("987654321098").unwrap(),
        );
        assert!(topology.is_cross_account());
        assert_eq!(topology.deployment_account().as_str(), "123456789012");
        assert_eq!(topology.owning_account().as_str(), "987654321098");
    }

    #[test]
    fn test_build_status_terminal() {
        assert!(BuildStatus::Succeeded.is_terminal());
        assert!(BuildStatus::Failed.is_terminal());
        assert!(BuildStatus::Fault.is_terminal());
        assert!(BuildStatus::TimedOut.is_terminal());
        assert!(BuildStatus::Stopped.is_terminal());
        assert!(!BuildStatus::Pending.is_terminal());
        assert!(!BuildStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_build_status_round_trips_wire_format() {
        assert_eq!(BuildStatus::TimedOut.to_string(), "TIMED_OUT");
        assert_eq!(BuildStatus::InProgress.to_string(), "IN_PROGRESS");
        assert_eq!("SUCCEEDED".parse::<BuildStatus>().unwrap(), BuildStatus::Succeeded);
        assert_eq!("TIMED_OUT".parse::<BuildStatus>().unwrap(), BuildStatus::TimedOut);
        assert!("BOGUS".parse::<BuildStatus>().is_err());
    }

    #[test]
    fn test_session_credentials_debug_redacts_secrets() {
        let creds = SessionCredentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "sk-value".to_string(),
            session_token: "st-value".to_string(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIAEXAMPLE"));
        assert!(!debug.contains("sk-value"));
        assert!(!debug.contains("st-value"));
    }
}
