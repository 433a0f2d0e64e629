//! Compiles a [`RouteSet`] into a networking.k8s.io/v1 Ingress

use std::collections::BTreeMap;

use demok_common::k8s::{
    HttpIngressPath, HttpIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use demok_common::kube_utils::ObjectMeta;
use demok_common::{Declared, Error, Provisioner, Result};
use tracing::info;

use crate::routes::{PortSelector, RouteEntry, RouteSet};

/// Legacy annotation selecting the ingress controller
pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

/// Where and how the routing table is exposed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressParams {
    /// Ingress object name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// External host
    pub host: String,
    /// Ingress class (`nginx`, ...)
    pub class_name: String,
    /// Metadata labels
    pub labels: BTreeMap<String, String>,
}

/// Ingress compiler
pub struct IngressCompiler;

impl IngressCompiler {
    /// Compile one host rule with one HTTP path per route, in route order
    pub fn compile(params: &IngressParams, routes: &RouteSet) -> Ingress {
        let paths = routes.iter().map(Self::compile_path).collect();

        Ingress::new(
            ObjectMeta::new(&params.name, &params.namespace)
                .with_labels(params.labels.clone())
                .with_annotation(INGRESS_CLASS_ANNOTATION, &params.class_name),
            IngressSpec {
                ingress_class_name: Some(params.class_name.clone()),
                rules: vec![IngressRule {
                    host: Some(params.host.clone()),
                    http: HttpIngressRuleValue { paths },
                }],
            },
        )
    }

    fn compile_path(route: &RouteEntry) -> HttpIngressPath {
        let port = match &route.port {
            PortSelector::Number(n) => ServiceBackendPort {
                name: None,
                number: Some(*n),
            },
            PortSelector::Name(name) => ServiceBackendPort {
                name: Some(name.clone()),
                number: None,
            },
        };

        HttpIngressPath {
            path: route.path.clone(),
            path_type: route.path_match.as_str().to_string(),
            backend: IngressBackend {
                service: IngressServiceBackend {
                    name: route.service.clone(),
                    port,
                },
            },
        }
    }
}

/// Compile and declare the Ingress for a routing table.
///
/// An empty table is a [`Error::Dependency`]: an HTTP rule needs at least one
/// path.
pub async fn build_ingress(
    provisioner: &dyn Provisioner,
    params: &IngressParams,
    routes: &RouteSet,
) -> Result<Declared> {
    if routes.is_empty() {
        return Err(Error::dependency(
            "ingress",
            format!("no routes to expose on {}", params.host),
        ));
    }

    let ingress = IngressCompiler::compile(params, routes);
    let declared = provisioner.declare_ingress(&ingress).await?;

    info!(
        ingress = %declared.name,
        host = %params.host,
        routes = routes.len(),
        "declared routing table"
    );
    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::PathMatch;
    use demok_common::provision::{ManifestProvisioner, MockProvisioner};

    fn params() -> IngressParams {
        IngressParams {
            name: "k8s-demo-ingress".to_string(),
            namespace: "k8s-demo".to_string(),
            host: "demok.cdk.here".to_string(),
            class_name: "nginx".to_string(),
            labels: BTreeMap::from([("app.kubernetes.io/name".to_string(), "k8s-demo-api".to_string())]),
        }
    }

    fn routes() -> RouteSet {
        RouteSet::new(vec![
            RouteEntry {
                path: "/test".to_string(),
                path_match: PathMatch::Prefix,
                service: "k8s-demo-api".to_string(),
                port: PortSelector::Number(8080),
            },
            RouteEntry {
                path: "/".to_string(),
                path_match: PathMatch::Prefix,
                service: "k8s-demo-raft".to_string(),
                port: PortSelector::Name("k8s-demo-raft-http".to_string()),
            },
        ])
    }

    #[test]
    fn one_host_rule_with_paths_in_route_order() {
        let ingress = IngressCompiler::compile(&params(), &routes());

        assert_eq!(ingress.spec.rules.len(), 1);
        let rule = &ingress.spec.rules[0];
        assert_eq!(rule.host.as_deref(), Some("demok.cdk.here"));
        let paths: Vec<_> = rule.http.paths.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["/test", "/"]);
        assert!(rule.http.paths.iter().all(|p| p.path_type == "Prefix"));
    }

    #[test]
    fn ports_are_selected_by_number_or_name() {
        let ingress = IngressCompiler::compile(&params(), &routes());
        let paths = &ingress.spec.rules[0].http.paths;

        assert_eq!(paths[0].backend.service.port.number, Some(8080));
        assert!(paths[0].backend.service.port.name.is_none());
        assert_eq!(
            paths[1].backend.service.port.name.as_deref(),
            Some("k8s-demo-raft-http")
        );
        assert!(paths[1].backend.service.port.number.is_none());
    }

    #[test]
    fn ingress_class_is_set_twice() {
        let ingress = IngressCompiler::compile(&params(), &routes());
        assert_eq!(ingress.spec.ingress_class_name.as_deref(), Some("nginx"));
        assert_eq!(
            ingress.metadata.annotations[INGRESS_CLASS_ANNOTATION],
            "nginx"
        );
        assert_eq!(ingress.metadata.namespace.as_deref(), Some("k8s-demo"));
    }

    #[test]
    fn compiled_ingress_matches_upstream_schema() {
        let ingress = IngressCompiler::compile(&params(), &routes());
        let json = serde_json::to_value(&ingress).unwrap();
        let upstream: k8s_openapi::api::networking::v1::Ingress =
            serde_json::from_value(json).unwrap();

        let spec = upstream.spec.unwrap();
        let rule = &spec.rules.unwrap()[0];
        assert_eq!(rule.http.as_ref().unwrap().paths.len(), 2);
    }

    #[tokio::test]
    async fn build_declares_one_ingress() {
        let engine = ManifestProvisioner::new();
        let declared = build_ingress(&engine, &params(), &routes()).await.unwrap();

        assert_eq!(declared.kind, "Ingress");
        assert_eq!(declared.name, "k8s-demo-ingress");
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn empty_routing_table_declares_nothing() {
        let mut engine = MockProvisioner::new();
        engine.expect_declare_ingress().never();

        let err = build_ingress(&engine, &params(), &RouteSet::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Dependency { ref stage, .. } if stage == "ingress"));
    }

    #[tokio::test]
    async fn engine_rejection_propagates() {
        let mut engine = MockProvisioner::new();
        engine
            .expect_declare_ingress()
            .returning(|i| Err(Error::declaration("Ingress", i.metadata.name.clone(), "bad host")));

        let err = build_ingress(&engine, &params(), &routes())
            .await
            .unwrap_err();
        assert_eq!(err.resource_name(), Some("k8s-demo-ingress"));
    }
}
