//! Provisioner backed by a live cluster via server-side apply

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::Client;
use serde::Serialize;
use tracing::debug;

use super::{Declared, Provisioner};
use crate::k8s::{Deployment, Ingress, Namespace, Service};
use crate::kube_utils::HasApiResource;
use crate::{Error, Result, FIELD_MANAGER};

/// Declares resources by server-side applying them with field manager `demok`.
///
/// Conflicts are forced: the declared description is the source of truth and
/// re-running a composition converges on it.
pub struct KubeProvisioner {
    client: Client,
    params: PatchParams,
}

impl KubeProvisioner {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            params: PatchParams::apply(FIELD_MANAGER).force(),
        }
    }

    /// Connect using the default kubeconfig / in-cluster config
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    async fn apply<K>(&self, name: &str, namespace: Option<&str>, resource: &K) -> Result<Declared>
    where
        K: HasApiResource + Serialize + Sync,
    {
        let ar = K::api_resource();
        let json = serde_json::to_value(resource)
            .map_err(|e| Error::serialization_for_kind(K::KIND, e.to_string()))?;

        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };

        debug!(kind = K::KIND, name = %name, namespace = ?namespace, "applying resource");
        let applied = api
            .patch(name, &self.params, &Patch::Apply(&json))
            .await
            .map_err(|e| classify(e, K::KIND, name))?;

        Ok(Declared {
            kind: K::KIND.to_string(),
            name: applied.metadata.name.unwrap_or_else(|| name.to_string()),
            namespace: applied.metadata.namespace,
            uid: applied.metadata.uid,
        })
    }
}

/// 4xx means the API server refused the description itself; anything else is
/// a transport or server failure.
fn classify(err: kube::Error, kind: &str, name: &str) -> Error {
    match err {
        kube::Error::Api(ae) if (400..500).contains(&ae.code) => {
            Error::declaration(kind, name, ae.message)
        }
        other => Error::from(other),
    }
}

#[async_trait]
impl Provisioner for KubeProvisioner {
    async fn declare_namespace(&self, namespace: &Namespace) -> Result<Declared> {
        self.apply(&namespace.metadata.name, None, namespace).await
    }

    async fn declare_deployment(&self, deployment: &Deployment) -> Result<Declared> {
        let meta = &deployment.metadata;
        self.apply(&meta.name, meta.namespace.as_deref(), deployment)
            .await
    }

    async fn declare_service(&self, service: &Service) -> Result<Declared> {
        let meta = &service.metadata;
        self.apply(&meta.name, meta.namespace.as_deref(), service)
            .await
    }

    async fn declare_ingress(&self, ingress: &Ingress) -> Result<Declared> {
        let meta = &ingress.metadata;
        self.apply(&meta.name, meta.namespace.as_deref(), ingress)
            .await
    }
}
