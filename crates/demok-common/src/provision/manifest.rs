//! Provisioner that records declarations instead of applying them

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{Declared, Provisioner};
use crate::k8s::{Deployment, Ingress, Namespace, Service};
use crate::kube_utils::HasApiResource;
use crate::{Error, Result};

#[derive(Debug)]
struct Recorded {
    declared: Declared,
    manifest: serde_json::Value,
}

/// Dry-run engine: keeps every declared resource in declaration order.
///
/// Declaring the same kind/namespace/name twice is a naming collision and is
/// rejected, as the API server would reject a second create.
#[derive(Debug, Default)]
pub struct ManifestProvisioner {
    records: Mutex<Vec<Recorded>>,
}

impl ManifestProvisioner {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<Recorded>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record<K>(&self, name: &str, namespace: Option<&str>, resource: &K) -> Result<Declared>
    where
        K: HasApiResource + Serialize,
    {
        let manifest = serde_json::to_value(resource)
            .map_err(|e| Error::serialization_for_kind(K::KIND, e.to_string()))?;
        let declared = Declared::of::<K>(name, namespace.map(str::to_string));

        let mut records = self.records();
        let collision = records.iter().any(|r| {
            r.declared.kind == declared.kind
                && r.declared.name == declared.name
                && r.declared.namespace == declared.namespace
        });
        if collision {
            return Err(Error::declaration(K::KIND, name, "already declared"));
        }

        debug!(kind = K::KIND, name = %name, "recorded resource");
        records.push(Recorded {
            declared: declared.clone(),
            manifest,
        });
        Ok(declared)
    }

    /// Handles of every declared resource, in declaration order
    pub fn declared(&self) -> Vec<Declared> {
        self.records().iter().map(|r| r.declared.clone()).collect()
    }

    /// Serialized manifests, in declaration order
    pub fn manifests(&self) -> Vec<serde_json::Value> {
        self.records().iter().map(|r| r.manifest.clone()).collect()
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// True when nothing has been declared
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Render all manifests as a multi-document YAML stream
    pub fn render_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for record in self.records().iter() {
            let doc = serde_yaml::to_string(&record.manifest).map_err(|e| {
                Error::serialization_for_kind(record.declared.kind.clone(), e.to_string())
            })?;
            out.push_str("---\n");
            out.push_str(&doc);
        }
        Ok(out)
    }
}

#[async_trait]
impl Provisioner for ManifestProvisioner {
    async fn declare_namespace(&self, namespace: &Namespace) -> Result<Declared> {
        self.record(&namespace.metadata.name, None, namespace)
    }

    async fn declare_deployment(&self, deployment: &Deployment) -> Result<Declared> {
        let meta = &deployment.metadata;
        self.record(&meta.name, meta.namespace.as_deref(), deployment)
    }

    async fn declare_service(&self, service: &Service) -> Result<Declared> {
        let meta = &service.metadata;
        self.record(&meta.name, meta.namespace.as_deref(), service)
    }

    async fn declare_ingress(&self, ingress: &Ingress) -> Result<Declared> {
        let meta = &ingress.metadata;
        self.record(&meta.name, meta.namespace.as_deref(), ingress)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::k8s::{IntOrString, ServicePort, ServiceSpec};
    use crate::kube_utils::ObjectMeta;

    fn service(name: &str) -> Service {
        Service::new(
            ObjectMeta::new(name, "k8s-demo"),
            ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                cluster_ip: None,
                selector: BTreeMap::new(),
                ports: vec![ServicePort {
                    name: "http".to_string(),
                    port: 8080,
                    target_port: IntOrString::String("http".to_string()),
                }],
            },
        )
    }

    #[tokio::test]
    async fn records_in_declaration_order() {
        let engine = ManifestProvisioner::new();
        engine
            .declare_namespace(&Namespace::new("k8s-demo", BTreeMap::new()))
            .await
            .unwrap();
        engine.declare_service(&service("a")).await.unwrap();
        engine.declare_service(&service("b")).await.unwrap();

        let names: Vec<_> = engine.declared().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["k8s-demo", "a", "b"]);
        assert_eq!(engine.len(), 3);
    }

    #[tokio::test]
    async fn rejects_naming_collision() {
        let engine = ManifestProvisioner::new();
        engine.declare_service(&service("a")).await.unwrap();

        let err = engine.declare_service(&service("a")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Declaration { ref kind, ref name, .. } if kind == "Service" && name == "a"
        ));
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn same_name_different_kind_is_allowed() {
        let engine = ManifestProvisioner::new();
        engine
            .declare_namespace(&Namespace::new("a", BTreeMap::new()))
            .await
            .unwrap();
        engine.declare_service(&service("a")).await.unwrap();
        assert_eq!(engine.len(), 2);
    }

    #[tokio::test]
    async fn renders_multi_document_yaml() {
        let engine = ManifestProvisioner::new();
        assert!(engine.is_empty());
        engine.declare_service(&service("a")).await.unwrap();
        engine.declare_service(&service("b")).await.unwrap();

        let yaml = engine.render_yaml().unwrap();
        assert_eq!(yaml.matches("---\n").count(), 2);
        assert!(yaml.contains("kind: Service"));
        assert!(yaml.contains("name: b"));
    }

    #[tokio::test]
    async fn declared_handle_reports_namespace() {
        let engine = ManifestProvisioner::new();
        let declared = engine.declare_service(&service("a")).await.unwrap();
        assert_eq!(declared.kind, "Service");
        assert_eq!(declared.namespace.as_deref(), Some("k8s-demo"));
        assert!(declared.uid.is_none());
    }
}
