//! Boundary to the external provisioning engine
//!
//! The composition pipeline only ever *declares* resources. Diffing against
//! live state, retries and garbage collection belong to whatever sits behind
//! [`Provisioner`]:
//! - [`KubeProvisioner`]: server-side apply against a live cluster
//! - [`ManifestProvisioner`]: records declarations and renders them as YAML

mod apply;
mod manifest;

pub use apply::KubeProvisioner;
pub use manifest::ManifestProvisioner;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::k8s::{Deployment, Ingress, Namespace, Service};
use crate::kube_utils::HasApiResource;
use crate::Result;

/// Handle for a resource the engine accepted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declared {
    /// Resource kind
    pub kind: String,
    /// Resolved resource name
    pub name: String,
    /// Namespace (None for cluster-scoped kinds)
    pub namespace: Option<String>,
    /// UID assigned by the API server, when the engine talks to one
    pub uid: Option<String>,
}

impl Declared {
    /// Handle for a resource of type `K`
    pub fn of<K: HasApiResource>(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            kind: K::KIND.to_string(),
            name: name.into(),
            namespace,
            uid: None,
        }
    }
}

/// One "declare" call per resource kind.
///
/// Implementations either accept the description and return a [`Declared`]
/// handle or return the engine's error; callers propagate that error unchanged.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Declare a namespace
    async fn declare_namespace(&self, namespace: &Namespace) -> Result<Declared>;

    /// Declare a workload
    async fn declare_deployment(&self, deployment: &Deployment) -> Result<Declared>;

    /// Declare a service
    async fn declare_service(&self, service: &Service) -> Result<Declared>;

    /// Declare the routing table
    async fn declare_ingress(&self, ingress: &Ingress) -> Result<Declared>;
}
