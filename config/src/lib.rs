//! # Launch Configuration
//!
//! Configuration for the airlift deployment pipeline.
//!
//! This crate provides:
//! - Configuration structures for agents and their AWS targets
//! - YAML file loading and saving
//! - Configuration validation via the `validator` crate
//!
//! The project file (`.airlift.yaml` by default) holds a map of agents plus
//! an optional default agent; every launch resolves one agent entry from it.

pub mod file_loader;
pub mod schema;

pub use file_loader::{ConfigFileError, DEFAULT_CONFIG_FILE, load_config, save_config};
pub use schema::{
    AgentConfig, AwsSettings, CodeBuildSettings, LaunchConfig, NetworkSettings,
    ObservabilitySettings,
};
pub use validator::Validate;
