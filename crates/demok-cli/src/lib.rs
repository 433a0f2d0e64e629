//! demok CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Args, Parser, Subcommand};
use demok_stack::StackConfig;

/// demok - declare a multi-tier demo topology on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "demok")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose against the manifest engine and print the YAML stream
    Render(commands::render::RenderArgs),
    /// Compose against a live cluster via server-side apply
    Apply(commands::apply::ApplyArgs),
    /// Load and validate a stack file without declaring anything
    Validate(commands::StackArgs),
}

/// Flags that override the loaded stack file
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Deployment instance label
    #[arg(long, global = true, env = "DEMOK_INSTANCE")]
    pub instance: Option<String>,

    /// Application name (prefix of every tier)
    #[arg(long, global = true)]
    pub application: Option<String>,

    /// Replica count for every tier
    #[arg(long, global = true)]
    pub replicas: Option<u32>,
}

impl Overrides {
    /// Apply the overrides that were given
    pub fn apply_to(&self, config: &mut StackConfig) {
        if let Some(instance) = &self.instance {
            config.instance = instance.clone();
        }
        if let Some(application) = &self.application {
            config.application = application.clone();
        }
        if let Some(replicas) = self.replicas {
            config.replicas = replicas;
        }
    }
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Render(args) => commands::render::run(args, &self.overrides).await,
            Commands::Apply(args) => commands::apply::run(args, &self.overrides).await,
            Commands::Validate(args) => commands::validate(args, &self.overrides),
        }
    }
}
