use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use services::{AwsContext, CodeBuildService};

use crate::output;

#[derive(Args)]
pub struct StopArgs {
    /// Build execution id to stop
    #[arg(long)]
    pub execution_id: String,

    /// Agent whose build account should be used (defaults to the config's
    /// default agent)
    #[arg(long)]
    pub agent: Option<String>,

    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

pub async fn run(args: StopArgs) -> Result<()> {
    let project_config = config::load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let agent = project_config
        .agent(args.agent.as_deref())
        .context("no agent selected and no default agent configured")?;

    // The stop has to land in the account that owns the build
    let deployment = AwsContext::from_env(&agent.aws.region).await;
    let service =
        CodeBuildService::connect(deployment, agent.codebuild.execution_role.as_deref()).await?;

    service.stop_build(&args.execution_id).await?;
    output::success(&format!("stop requested for {}", args.execution_id));
    Ok(())
}
