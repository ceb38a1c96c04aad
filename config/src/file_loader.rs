//! # Configuration File Loading
//!
//! Loads and saves the YAML project file.

use crate::schema::LaunchConfig;
use std::path::Path;
use tracing::debug;

/// Default project file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".airlift.yaml";

/// Configuration file error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Failed to serialize YAML: {0}")]
    YamlSerialize(String),
}

/// Load the project configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<LaunchConfig, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    let config: LaunchConfig =
        serde_yaml::from_str(&contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))?;

    debug!(path = %path.display(), agents = config.agents.len(), "loaded configuration");
    Ok(config)
}

/// Save the project configuration as YAML.
pub fn save_config(path: &Path, config: &LaunchConfig) -> Result<(), ConfigFileError> {
    let contents =
        serde_yaml::to_string(config).map_err(|e| ConfigFileError::YamlSerialize(e.to_string()))?;

    std::fs::write(path, contents)?;
    debug!(path = %path.display(), "saved configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AgentConfig, AwsSettings, CodeBuildSettings};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let yaml_content = r"
default_agent: test-agent
agents:
  test-agent:
    name: test-agent
    entrypoint: app/main.rs
    aws:
      account: '123456789012'
      region: us-west-2
      ecr_repository: 123456789012.dkr.ecr.us-west-2.amazonaws.com/test-repo
    codebuild:
      execution_role: arn:aws:iam::987654321098:role/BuildRole
";
        fs::write(&path, yaml_content).unwrap();

        let config = load_config(&path).unwrap();
        let agent = config.agent(None).unwrap();
        assert_eq!(agent.name, "test-agent");
        assert_eq!(agent.aws.account.as_deref(), Some("123456789012"));
        assert_eq!(
            agent.codebuild.execution_role.as_deref(),
            Some("arn:aws:iam::987654321098:role/BuildRole")
        );
    }

    #[test]
    fn test_load_config_not_found() {
        let result = load_config(Path::new("/nonexistent/path/.airlift.yaml"));
        assert!(matches!(result, Err(ConfigFileError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "agents: [unmatched").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigFileError::YamlParse(_))));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let mut config = LaunchConfig::default();
        config.default_agent = Some("alpha".to_string());
        config.agents.insert(
            "alpha".to_string(),
            AgentConfig {
                name: "alpha".to_string(),
                entrypoint: "app/main.rs".to_string(),
                aws: AwsSettings::default(),
                codebuild: CodeBuildSettings::default(),
            },
        );

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(config, loaded);
    }
}
