use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use config::{AgentConfig, LaunchConfig};

use crate::output;

#[derive(Args)]
pub struct InitArgs {
    /// Name of the first agent entry
    #[arg(long, default_value = "my-agent")]
    pub agent: String,

    /// Entrypoint file within the source tree
    #[arg(long, default_value = "app/main.py")]
    pub entrypoint: String,

    /// Config file to write
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    if args.config.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            args.config.display()
        );
    }

    let mut launch_config = LaunchConfig {
        default_agent: Some(args.agent.clone()),
        ..LaunchConfig::default()
    };
    launch_config.agents.insert(
        args.agent.clone(),
        AgentConfig {
            name: args.agent.clone(),
            entrypoint: args.entrypoint.clone(),
            aws: config::AwsSettings::default(),
            codebuild: config::CodeBuildSettings::default(),
        },
    );
    launch_config
        .validate_all()
        .context("generated configuration is invalid")?;

    config::save_config(&args.config, &launch_config)
        .with_context(|| format!("writing {}", args.config.display()))?;

    output::success(&format!("wrote {}", args.config.display()));
    output::field("agent", &args.agent);
    output::field("entrypoint", &args.entrypoint);
    Ok(())
}
