//! # Airlift Services
//!
//! The AWS-facing build pipeline: identity resolution and cross-account
//! session derivation, source packaging and staging, CodeBuild project
//! management, build execution, and the launch orchestrator that sequences
//! them for one deployment request.
//!
//! Network-facing dependencies are consumed through the `al_core` provider
//! traits; the AWS SDK implementations of those traits live next to the
//! logic that uses them.

pub mod aws;
pub mod codebuild;
pub mod ecr;
pub mod execution;
pub mod identity;
pub mod launch;
pub mod project;
pub mod roles;
pub mod service;
pub mod source;

pub use aws::AwsContext;
pub use launch::{LaunchRequest, run_launch};
pub use service::CodeBuildService;
