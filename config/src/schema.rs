//! # Configuration Structures
//!
//! All configuration structures for the airlift project file.
//!
//! Every structure:
//! - Uses `serde` for serialization/deserialization
//! - Uses `validator` for input validation
//! - Provides defaults through `default_*` functions so a minimal file works

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Top-level project configuration.
///
/// ## Purpose
/// One file per project, holding every deployable agent plus the agent used
/// when the CLI is invoked without `--agent`.
///
/// ## Fields
/// - `default_agent`: name looked up in `agents` when no agent is given
/// - `agents`: agent name to [`AgentConfig`]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LaunchConfig {
    #[serde(default)]
    pub default_agent: Option<String>,

    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
}

impl LaunchConfig {
    /// Resolve the agent to operate on: an explicit name wins, otherwise the
    /// configured default.
    pub fn agent(&self, name: Option<&str>) -> Option<&AgentConfig> {
        let name = name.or(self.default_agent.as_deref())?;
        self.agents.get(name)
    }

    /// Validate every agent entry.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        for agent in self.agents.values() {
            agent.validate()?;
        }
        Ok(())
    }
}

/// One deployable agent.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct AgentConfig {
    /// Agent name; used to derive project, bucket key, and role names
    #[validate(custom(function = "validate_resource_name"))]
    pub name: String,

    /// Entrypoint file within the source tree
    #[validate(length(min = 1))]
    pub entrypoint: String,

    /// AWS deployment target
    #[serde(default)]
    #[validate(nested)]
    pub aws: AwsSettings,

    /// Managed build settings
    #[serde(default)]
    #[validate(nested)]
    pub codebuild: CodeBuildSettings,
}

/// AWS deployment target for one agent.
///
/// ## Fields
/// - `account`: deployment account id, filled in after the first launch
/// - `region`: region for every resource the launch touches
/// - `execution_role`: explicit build service role; overrides provisioning
/// - `ecr_repository`: image repository (name or full URI)
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct AwsSettings {
    #[serde(default)]
    #[validate(custom(function = "validate_account_id"))]
    pub account: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub execution_role: Option<String>,

    #[serde(default)]
    pub ecr_repository: Option<String>,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            account: None,
            region: default_region(),
            execution_role: None,
            ecr_repository: None,
            network: NetworkSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

/// Network placement for the deployed agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSettings {
    #[serde(default = "default_network_mode")]
    pub mode: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            mode: default_network_mode(),
        }
    }
}

/// Observability toggle for the deployed agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilitySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// Managed build settings.
///
/// `execution_role` names a role in ANOTHER account; its presence switches
/// the launch into cross-account mode, with staging and the build project
/// owned by that role's account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CodeBuildSettings {
    #[serde(default)]
    pub execution_role: Option<String>,

    #[serde(default = "default_compute_type")]
    pub compute_type: String,

    #[serde(default = "default_build_timeout_minutes")]
    pub timeout_minutes: u64,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
}

impl Default for CodeBuildSettings {
    fn default() -> Self {
        Self {
            execution_role: None,
            compute_type: default_compute_type(),
            timeout_minutes: default_build_timeout_minutes(),
            poll_interval_seconds: default_poll_interval_seconds(),
        }
    }
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_network_mode() -> String {
    "PUBLIC".to_string()
}

fn default_true() -> bool {
    true
}

fn default_compute_type() -> String {
    "BUILD_GENERAL1_SMALL".to_string()
}

fn default_build_timeout_minutes() -> u64 {
    15
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn validate_account_id(value: &str) -> Result<(), validator::ValidationError> {
    if al_core::AccountId::new(value).is_some() {
        Ok(())
    } else {
        Err(validator::ValidationError::new("Invalid AWS account id"))
    }
}

fn validate_resource_name(value: &str) -> Result<(), validator::ValidationError> {
    let ok = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(validator::ValidationError::new("Invalid agent name"))
    }
}
