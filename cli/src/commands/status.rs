use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    /// Show one agent instead of all
    #[arg(long)]
    pub agent: Option<String>,

    /// Config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let project_config = config::load_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let mut names: Vec<&String> = project_config
        .agents
        .keys()
        .filter(|name| args.agent.as_ref().is_none_or(|wanted| wanted == *name))
        .collect();
    names.sort();

    if names.is_empty() {
        output::warn("no matching agents configured");
        return Ok(());
    }

    for name in names {
        let agent = &project_config.agents[name];
        let is_default = project_config.default_agent.as_deref() == Some(name.as_str());
        println!(
            "{}{}",
            name,
            if is_default { " (default)" } else { "" }
        );
        output::field("region", &agent.aws.region);
        if let Some(account) = &agent.aws.account {
            output::field("account", account);
        }
        if let Some(repository) = &agent.aws.ecr_repository {
            output::field("repository", repository);
        }
        match &agent.codebuild.execution_role {
            Some(role) => output::field("build", &format!("cross-account via {role}")),
            None => output::field("build", "same-account"),
        }
    }
    Ok(())
}
