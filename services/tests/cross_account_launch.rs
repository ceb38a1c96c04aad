//! Cross-account launch scenarios, end to end against in-memory fakes.
//!
//! These exercise the account-routing contract: which account every bucket,
//! project, and role operation targets in same-account and cross-account
//! mode, and how the workflow short-circuits and fails.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use al_core::traits::CallerIdentity;
use al_core::types::{AccountId, AccountTopology, BuildStatus};
use errors::{BuildError, IdentityError, LaunchError};
use services::launch::LaunchRequest;
use services::{CodeBuildService, identity, run_launch};
use testing::{FakeCodeBuild, FakeIdentity, FakeRegistry, FakeRoleStore, FakeSourceStore};

const DEPLOYMENT_ACCOUNT: &str = "123456789012";
const BUILD_ACCOUNT: &str = "987654321098";
const CROSS_ACCOUNT_ROLE: &str = "arn:aws:iam::987654321098:role/BuildRole";

struct Harness {
    service: CodeBuildService,
    sources: Arc<FakeSourceStore>,
    codebuild: Arc<FakeCodeBuild>,
    build_roles: Arc<FakeRoleStore>,
    registry: FakeRegistry,
    deployment_roles: FakeRoleStore,
}

fn harness(cross_account: bool, terminal: BuildStatus) -> Harness {
    let topology = if cross_account {
        AccountTopology::cross_account(
            AccountId::new(DEPLOYMENT_ACCOUNT).unwrap(),
            AccountId::new(BUILD_ACCOUNT).unwrap(),
        )
    } else {
        AccountTopology::same_account(AccountId::new(DEPLOYMENT_ACCOUNT).unwrap())
    };
    let owning = if cross_account {
        BUILD_ACCOUNT
    } else {
        DEPLOYMENT_ACCOUNT
    };

    let sources = Arc::new(FakeSourceStore::new());
    let codebuild = Arc::new(FakeCodeBuild::with_terminal_status(terminal, 1));
    let build_roles = Arc::new(FakeRoleStore::new(owning));
    let service = CodeBuildService::from_parts(
        topology,
        "us-west-2".to_string(),
        sources.clone(),
        codebuild.clone(),
        codebuild.clone(),
        build_roles.clone(),
    );
    Harness {
        service,
        sources,
        codebuild,
        build_roles,
        registry: FakeRegistry::new(),
        deployment_roles: FakeRoleStore::new(DEPLOYMENT_ACCOUNT),
    }
}

fn request(source_root: &Path, ecr_only: bool) -> LaunchRequest {
    let agent = testing::sample_agent_config("test-agent", None);
    let mut request = LaunchRequest::from_config(&agent, source_root, ecr_only);
    request.poll_interval = Duration::from_millis(1);
    request.timeout = Duration::from_millis(250);
    request
}

fn source_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM scratch").unwrap();
    std::fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
    dir
}

#[tokio::test]
async fn test_same_account_launch_targets_deployment_account() {
    let h = harness(false, BuildStatus::Succeeded);
    let dir = source_tree();

    let outcome = run_launch(
        &h.service,
        &h.registry,
        &h.deployment_roles,
        &request(dir.path(), false),
    )
    .await
    .unwrap();

    assert!(outcome.execution_id.is_some());
    // every staging operation targeted the deployment account
    let objects = h.sources.objects.lock().unwrap();
    assert_eq!(
        objects[0].0,
        "airlift-build-sources-123456789012-us-west-2"
    );
    // the execution role came from the deployment-account collaborator
    assert_eq!(*h.deployment_roles.creates.lock().unwrap(), 1);
    assert_eq!(*h.build_roles.creates.lock().unwrap(), 0);
    // one project, created not duplicated
    assert_eq!(h.codebuild.projects.lock().unwrap().len(), 1);
    assert!(
        h.codebuild
            .projects
            .lock()
            .unwrap()
            .contains_key("airlift-build-test-agent")
    );
}

#[tokio::test]
async fn test_cross_account_launch_targets_build_account() {
    let h = harness(true, BuildStatus::Succeeded);
    let dir = source_tree();

    let outcome = run_launch(
        &h.service,
        &h.registry,
        &h.deployment_roles,
        &request(dir.path(), false),
    )
    .await
    .unwrap();

    assert!(outcome.execution_id.is_some());
    assert!(h.service.is_cross_account());
    assert_eq!(h.service.build_account().unwrap().as_str(), BUILD_ACCOUNT);
    assert_ne!(
        h.service.deployment_account(),
        h.service.build_account().unwrap()
    );

    // staging resolved to the build account and its region
    let objects = h.sources.objects.lock().unwrap();
    assert_eq!(
        objects[0].0,
        "airlift-build-sources-987654321098-us-west-2"
    );
    // the build role was provisioned in the build account, not the
    // deployment account
    assert_eq!(*h.build_roles.creates.lock().unwrap(), 1);
    assert_eq!(*h.deployment_roles.creates.lock().unwrap(), 0);
    let roles = h.build_roles.roles.lock().unwrap();
    assert!(
        roles
            .get("AirliftCodeBuild-test-agent")
            .unwrap()
            .contains(BUILD_ACCOUNT)
    );
}

#[tokio::test]
async fn test_explicit_execution_role_wins_over_provisioning() {
    let h = harness(true, BuildStatus::Succeeded);
    let dir = source_tree();
    let mut request = request(dir.path(), false);
    request.execution_role = Some("arn:aws:iam::987654321098:role/Explicit".to_string());

    run_launch(&h.service, &h.registry, &h.deployment_roles, &request)
        .await
        .unwrap();

    assert_eq!(*h.build_roles.creates.lock().unwrap(), 0);
    assert_eq!(*h.deployment_roles.creates.lock().unwrap(), 0);
    let projects = h.codebuild.projects.lock().unwrap();
    assert_eq!(
        projects["airlift-build-test-agent"].service_role,
        "arn:aws:iam::987654321098:role/Explicit"
    );
}

#[tokio::test]
async fn test_ecr_only_short_circuits_before_staging_and_build() {
    let h = harness(false, BuildStatus::Succeeded);
    let dir = source_tree();

    let outcome = run_launch(
        &h.service,
        &h.registry,
        &h.deployment_roles,
        &request(dir.path(), true),
    )
    .await
    .unwrap();

    assert!(outcome.execution_id.is_none());
    assert!(outcome.image_uri.is_some());
    assert_eq!(*h.registry.creates.lock().unwrap(), 1);
    // staging and build were never touched
    assert_eq!(*h.sources.head_calls.lock().unwrap(), 0);
    assert!(h.sources.objects.lock().unwrap().is_empty());
    assert!(h.codebuild.projects.lock().unwrap().is_empty());
    assert!(h.codebuild.started.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_build_surfaces_terminal_status() {
    let h = harness(false, BuildStatus::Fault);
    let dir = source_tree();

    let err = run_launch(
        &h.service,
        &h.registry,
        &h.deployment_roles,
        &request(dir.path(), false),
    )
    .await
    .unwrap_err();

    match err {
        LaunchError::Build(BuildError::Failed { status, .. }) => assert_eq!(status, "FAULT"),
        other => panic!("expected build failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_foreign_staging_bucket_aborts_before_upload() {
    let h = harness(true, BuildStatus::Succeeded);
    // the build-account bucket name already exists under another owner
    h.sources.owners.lock().unwrap().insert(
        "airlift-build-sources-987654321098-us-west-2".to_string(),
        "555555555555".to_string(),
    );
    let dir = source_tree();

    let err = run_launch(
        &h.service,
        &h.registry,
        &h.deployment_roles,
        &request(dir.path(), false),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, LaunchError::Staging(_)));
    assert!(h.sources.objects.lock().unwrap().is_empty());
    assert!(h.codebuild.started.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_role_assumption_failure_is_fatal() {
    let sts = FakeIdentity::with_assume_failure(DEPLOYMENT_ACCOUNT);
    let topology = identity::resolve_topology(&sts, Some(CROSS_ACCOUNT_ROLE))
        .await
        .unwrap();
    assert!(topology.is_cross_account());

    let err = sts
        .assume_role(CROSS_ACCOUNT_ROLE, "airlift-build-test")
        .await
        .unwrap_err();
    assert!(matches!(err, IdentityError::Assumption { .. }));
}

#[tokio::test]
async fn test_malformed_role_reference_degrades_to_same_account() {
    let sts = FakeIdentity::new(DEPLOYMENT_ACCOUNT);
    let topology = identity::resolve_topology(&sts, Some("invalid-arn"))
        .await
        .unwrap();
    assert!(!topology.is_cross_account());
    assert!(topology.build_account().is_none());
    assert_eq!(topology.owning_account().as_str(), DEPLOYMENT_ACCOUNT);
}
