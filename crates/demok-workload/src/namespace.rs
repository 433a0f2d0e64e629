//! Namespace bootstrap, the first step of every composition

use demok_common::k8s::Namespace;
use demok_common::labels::selector_labels;
use demok_common::{Provisioner, Result};
use tracing::info;

use crate::handle::NamespaceHandle;

/// Declare the namespace and return a handle for the tiers built inside it
pub async fn build_namespace(
    provisioner: &dyn Provisioner,
    name: &str,
    instance: &str,
    managed_by: &str,
) -> Result<NamespaceHandle> {
    let declared = provisioner
        .declare_namespace(&Namespace::new(name, selector_labels(name, instance)))
        .await?;

    info!(namespace = %declared.name, instance = %instance, "declared namespace");
    Ok(NamespaceHandle {
        name: declared.name,
        instance: instance.to_string(),
        managed_by: managed_by.to_string(),
    })
}
