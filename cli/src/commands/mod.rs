pub mod init;
pub mod launch;
pub mod status;
pub mod stop;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "airlift",
    author,
    version,
    about = "Airlift - package, build, and ship agent containers",
    long_about = "Packages your source tree, runs the container build in AWS CodeBuild, and \
                  pushes the image to ECR.\n\nSupports building in a separate AWS account: \
                  configure a cross-account build role and every build resource is routed \
                  through the account that owns it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Write a starter .airlift.yaml in the current directory")]
    Init(init::InitArgs),

    #[command(about = "Package source, run the build, and push the image")]
    Launch(launch::LaunchArgs),

    #[command(about = "Show configured agents and their build targets")]
    Status(status::StatusArgs),

    #[command(about = "Stop a running build (timeouts never stop builds implicitly)")]
    Stop(stop::StopArgs),
}
