//! Apply command

use clap::Args;
use demok_common::provision::KubeProvisioner;
use demok_stack::compose;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use super::{print_exports, StackArgs};
use crate::{Error, Overrides, Result};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Kubeconfig to use instead of the kube defaults
    #[arg(long)]
    pub kubeconfig: Option<String>,
}

pub async fn run(args: ApplyArgs, overrides: &Overrides) -> Result<()> {
    let config = args.stack.load(overrides)?;
    config.validate()?;

    let engine = match args.kubeconfig.as_deref() {
        Some(path) => KubeProvisioner::new(kube_client_from_path(path).await?),
        None => KubeProvisioner::try_default().await?,
    };

    let exports = compose(&config, &engine).await?;
    info!(namespace = %config.namespace_name(), "topology applied");
    print_exports(&exports)
}

/// Build a kube [`Client`] from a kubeconfig file path (default context).
async fn kube_client_from_path(path: &str) -> Result<Client> {
    let kubeconfig = Kubeconfig::read_from(path)
        .map_err(|e| Error::command_failed(format!("failed to read kubeconfig {}: {}", path, e)))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| Error::command_failed(format!("invalid kubeconfig {}: {}", path, e)))?;
    Client::try_from(config).map_err(|e| Error::Stack(e.into()))
}
