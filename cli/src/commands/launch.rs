use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use services::launch::LaunchRequest;
use services::{AwsContext, CodeBuildService, run_launch};

use crate::output;

#[derive(Args)]
pub struct LaunchArgs {
    /// Agent to launch (defaults to the config's default agent)
    #[arg(long)]
    pub agent: Option<String>,

    /// Source tree to package
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Provision the image repository and exit without building
    #[arg(long)]
    pub ecr_only: bool,
}

pub async fn run(args: LaunchArgs) -> Result<()> {
    let project_config = config::load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    project_config
        .validate_all()
        .context("invalid configuration")?;
    let agent = project_config
        .agent(args.agent.as_deref())
        .context("no agent selected and no default agent configured")?;

    let deployment = AwsContext::from_env(&agent.aws.region).await;
    let cross_account_role = agent.codebuild.execution_role.as_deref();
    let service = CodeBuildService::connect(deployment.clone(), cross_account_role).await?;

    output::info(&format!(
        "deployment account {}",
        service.deployment_account()
    ));
    if let Some(build) = service.build_account() {
        output::info(&format!("build account {build} (cross-account)"));
    }

    let request = LaunchRequest::from_config(agent, &args.source_dir, args.ecr_only);
    let registry = deployment.registry();
    let deployment_roles = deployment.roles();
    let outcome = run_launch(&service, &registry, &deployment_roles, &request).await?;

    match &outcome.execution_id {
        Some(execution_id) => {
            output::success(&format!("build {execution_id} succeeded"));
        }
        None => {
            output::success("repository provisioned");
        }
    }
    if let Some(image_uri) = &outcome.image_uri {
        output::field("image", image_uri);
    }
    if let Some(logs_url) = &outcome.logs_url {
        output::field("logs", logs_url);
    }
    Ok(())
}
