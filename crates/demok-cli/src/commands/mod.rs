//! CLI commands

use std::path::PathBuf;

use clap::Args;
use demok_stack::{ExportMap, StackConfig};
use tracing::info;

use crate::{Overrides, Result};

pub mod apply;
pub mod render;

/// Stack file selection shared by every command
#[derive(Args, Debug, Default)]
pub struct StackArgs {
    /// Stack file (YAML); built-in defaults when omitted
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
}

impl StackArgs {
    /// Load the stack file (or defaults) and apply CLI overrides
    pub fn load(&self, overrides: &Overrides) -> Result<StackConfig> {
        let mut config = match &self.file {
            Some(path) => StackConfig::from_file(path)?,
            None => StackConfig::default(),
        };
        overrides.apply_to(&mut config);
        Ok(config)
    }
}

/// Validate command
pub fn validate(args: StackArgs, overrides: &Overrides) -> Result<()> {
    let config = args.load(overrides)?;
    config.validate()?;

    info!(
        application = %config.application,
        namespace = %config.namespace_name(),
        clustered = config.raft.is_some(),
        "stack is valid"
    );
    Ok(())
}

/// Print the export map to stdout as pretty JSON
pub fn print_exports(exports: &ExportMap) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(exports)?);
    Ok(())
}
