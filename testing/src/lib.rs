//! # Test Fixtures
//!
//! In-memory fakes for the `al_core` provider traits plus canned
//! configuration fixtures. Used across the workspace's unit and integration
//! tests in place of live AWS clients.

pub mod fixtures;

pub use fixtures::{
    FakeCodeBuild, FakeIdentity, FakeRegistry, FakeRoleStore, FakeSourceStore, sample_agent_config,
};
