//! End-to-end composition against the recording and mock engines

use demok_common::k8s::Deployment;
use demok_common::provision::{ManifestProvisioner, MockProvisioner};
use demok_common::{Declared, Error};
use demok_stack::export::*;
use demok_stack::{compose, StackConfig};

fn scenario_config() -> StackConfig {
    let mut config = StackConfig::default();
    config.backend.version = "0.1".to_string();
    config.api.version = "0.4".to_string();
    config
}

// =============================================================================
// Scenario A: full three-tier topology
// =============================================================================

#[tokio::test]
async fn exports_every_resolved_name() {
    let engine = ManifestProvisioner::new();
    let exports = compose(&scenario_config(), &engine).await.unwrap();

    assert_eq!(exports.iter().count(), 9);
    assert_eq!(exports.get(KEY_NAMESPACE), Some("k8s-demo"));
    assert_eq!(exports.get(KEY_BACKEND_DEPLOYMENT), Some("k8s-demo-backend"));
    assert_eq!(exports.get(KEY_BACKEND_SERVICE), Some("k8s-demo-backend"));
    assert_eq!(exports.get(KEY_API_DEPLOYMENT), Some("k8s-demo-api"));
    assert_eq!(exports.get(KEY_API_SERVICE), Some("k8s-demo-api"));
    assert_eq!(exports.get(KEY_RAFT_DEPLOYMENT), Some("k8s-demo-raft"));
    assert_eq!(exports.get(KEY_RAFT_SERVICE), Some("k8s-demo-raft"));
    assert_eq!(
        exports.get(KEY_RAFT_HEADLESS_SERVICE),
        Some("k8s-demo-raft-headless")
    );
    assert_eq!(exports.get(KEY_INGRESS), Some("k8s-demo-ingress"));
}

#[tokio::test]
async fn declarations_follow_dependency_order() {
    let engine = ManifestProvisioner::new();
    compose(&scenario_config(), &engine).await.unwrap();

    let declared: Vec<_> = engine
        .declared()
        .into_iter()
        .map(|d| format!("{}/{}", d.kind, d.name))
        .collect();
    assert_eq!(
        declared,
        vec![
            "Namespace/k8s-demo",
            "Deployment/k8s-demo-backend",
            "Service/k8s-demo-backend",
            "Deployment/k8s-demo-api",
            "Service/k8s-demo-api",
            "Service/k8s-demo-raft-headless",
            "Deployment/k8s-demo-raft",
            "Service/k8s-demo-raft",
            "Ingress/k8s-demo-ingress",
        ]
    );
}

#[tokio::test]
async fn every_service_selects_its_workload() {
    let engine = ManifestProvisioner::new();
    compose(&scenario_config(), &engine).await.unwrap();

    let manifests = engine.manifests();
    let workloads: Vec<_> = manifests.iter().filter(|m| m["kind"] == "Deployment").collect();
    for service in manifests.iter().filter(|m| m["kind"] == "Service") {
        let selector = &service["spec"]["selector"];
        let matching = workloads
            .iter()
            .filter(|w| &w["spec"]["selector"]["matchLabels"] == selector)
            .count();
        assert_eq!(matching, 1, "service {} selects one workload", service["metadata"]["name"]);
    }
}

#[tokio::test]
async fn ingress_routes_catch_all_last() {
    let engine = ManifestProvisioner::new();
    compose(&scenario_config(), &engine).await.unwrap();

    let manifests = engine.manifests();
    let ingress = manifests.iter().find(|m| m["kind"] == "Ingress").unwrap();
    let paths: Vec<_> = ingress["spec"]["rules"][0]["http"]["paths"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["/test", "/raft", "/"]);
    assert_eq!(ingress["spec"]["rules"][0]["host"], "demok.cdk.here");
}

#[tokio::test]
async fn two_tier_topology_omits_raft_exports_and_routes() {
    let config = StackConfig {
        raft: None,
        ..scenario_config()
    };
    let engine = ManifestProvisioner::new();
    let exports = compose(&config, &engine).await.unwrap();

    assert_eq!(exports.iter().count(), 6);
    assert!(exports.get(KEY_RAFT_DEPLOYMENT).is_none());
    assert!(exports.get(KEY_RAFT_HEADLESS_SERVICE).is_none());

    let manifests = engine.manifests();
    let ingress = manifests.last().unwrap();
    assert_eq!(
        ingress["spec"]["rules"][0]["http"]["paths"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn exports_serialize_as_flat_json() {
    let engine = ManifestProvisioner::new();
    let exports = compose(&scenario_config(), &engine).await.unwrap();

    let json = serde_json::to_value(&exports).unwrap();
    assert_eq!(json["raftHeadlessService"], "k8s-demo-raft-headless");
    assert!(json.as_object().unwrap().values().all(|v| v.is_string()));
}

// =============================================================================
// Scenario B: fail-fast on a declaration error
// =============================================================================

#[tokio::test]
async fn backend_rejection_aborts_composition() {
    let mut engine = MockProvisioner::new();
    engine
        .expect_declare_namespace()
        .times(1)
        .returning(|ns| Ok(Declared::of::<demok_common::k8s::Namespace>(ns.metadata.name.clone(), None)));
    engine
        .expect_declare_deployment()
        .times(1)
        .withf(|d| d.metadata.name == "k8s-demo-backend")
        .returning(|d| {
            Err(Error::declaration(
                "Deployment",
                d.metadata.name.clone(),
                "admission webhook denied the request",
            ))
        });
    engine.expect_declare_service().never();
    engine.expect_declare_ingress().never();

    let err = compose(&scenario_config(), &engine).await.unwrap_err();
    match err {
        Error::Declaration {
            kind,
            name,
            message,
        } => {
            assert_eq!(kind, "Deployment");
            assert_eq!(name, "k8s-demo-backend");
            assert_eq!(message, "admission webhook denied the request");
        }
        other => panic!("expected declaration error, got {other:?}"),
    }
}

#[tokio::test]
async fn invalid_config_declares_nothing() {
    let mut engine = MockProvisioner::new();
    engine.expect_declare_namespace().never();

    let config = StackConfig {
        replicas: 0,
        ..scenario_config()
    };
    let err = compose(&config, &engine).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
}

// =============================================================================
// Scenario C: api wired to backend
// =============================================================================

#[tokio::test]
async fn api_env_points_at_backend_service() {
    let engine = ManifestProvisioner::new();
    compose(&scenario_config(), &engine).await.unwrap();

    let manifests = engine.manifests();
    let api: Deployment = manifests
        .iter()
        .find(|m| m["kind"] == "Deployment" && m["metadata"]["name"] == "k8s-demo-api")
        .map(|m| serde_json::from_value(m.clone()).unwrap())
        .unwrap();
    let backend_service = manifests
        .iter()
        .find(|m| m["kind"] == "Service" && m["metadata"]["name"] == "k8s-demo-backend")
        .unwrap();
    let backend_port = backend_service["spec"]["ports"][0]["port"].as_u64().unwrap();

    let env = &api.spec.template.spec.containers[0].env;
    let value = |name: &str| {
        env.iter()
            .find(|e| e.name == name)
            .map(|e| e.value.clone())
            .unwrap()
    };
    assert_eq!(value("DEMOK_BACKEND_SERVICE_NAME"), "k8s-demo-backend");
    assert_eq!(value("DEMOK_BACKEND_SERVICE_PORT"), backend_port.to_string());
}

#[tokio::test]
async fn api_env_uses_engine_resolved_backend_name() {
    let mut engine = MockProvisioner::new();
    engine
        .expect_declare_namespace()
        .returning(|ns| Ok(Declared::of::<demok_common::k8s::Namespace>(ns.metadata.name.clone(), None)));
    engine.expect_declare_deployment().returning(|d| {
        let env = &d.spec.template.spec.containers[0].env;
        if d.metadata.name == "k8s-demo-api"
            && !env.iter().any(|e| e.value == "k8s-demo-backend-x7k2")
        {
            return Err(Error::declaration(
                "Deployment",
                d.metadata.name.clone(),
                "api is not wired to the resolved backend service",
            ));
        }
        Ok(Declared::of::<Deployment>(d.metadata.name.clone(), None))
    });
    engine.expect_declare_service().returning(|s| {
        // engine appends a suffix the way a generated-name backend would
        Ok(Declared::of::<demok_common::k8s::Service>(
            format!("{}-x7k2", s.metadata.name),
            None,
        ))
    });
    engine
        .expect_declare_ingress()
        .returning(|i| Ok(Declared::of::<demok_common::k8s::Ingress>(i.metadata.name.clone(), None)));

    let exports = compose(&scenario_config(), &engine).await.unwrap();
    assert_eq!(exports.get(KEY_BACKEND_SERVICE), Some("k8s-demo-backend-x7k2"));
    assert_eq!(exports.get(KEY_API_SERVICE), Some("k8s-demo-api-x7k2"));
    assert_eq!(
        exports.get(KEY_RAFT_HEADLESS_SERVICE),
        Some("k8s-demo-raft-headless-x7k2")
    );
}
