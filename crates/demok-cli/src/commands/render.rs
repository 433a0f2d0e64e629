//! Render command

use std::path::PathBuf;

use clap::Args;
use demok_common::provision::ManifestProvisioner;
use demok_stack::compose;
use tracing::info;

use super::{print_exports, StackArgs};
use crate::{Overrides, Result};

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Write manifests here instead of stdout; exports then go to stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub async fn run(args: RenderArgs, overrides: &Overrides) -> Result<()> {
    let config = args.stack.load(overrides)?;
    let engine = ManifestProvisioner::new();
    let exports = compose(&config, &engine).await?;
    let yaml = engine.render_yaml()?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, yaml)?;
            info!(path = %path.display(), resources = engine.len(), "wrote manifests");
            print_exports(&exports)
        }
        None => {
            print!("{}", yaml);
            Ok(())
        }
    }
}
