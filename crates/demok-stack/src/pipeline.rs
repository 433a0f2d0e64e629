//! Composition pipeline
//!
//! namespace → backend → api (wired to backend) → raft → routes → ingress →
//! exports. Steps run strictly in order; the first error aborts the run and
//! is returned as-is. Nothing already declared is rolled back.

use demok_common::{Provisioner, Result};
use demok_ingress::{build_ingress, build_routes, IngressParams, RoutePaths};
use demok_workload::{
    build_clustered_tier, build_namespace, build_tier, ClusteredTierSpec, ProbePaths, TierHandle,
    TierSpec,
};
use tracing::{info, instrument};

use crate::config::{StackConfig, TierConfig};
use crate::export::ExportMap;

/// Role of the backend tier; also the discovery env prefix handed to the api
pub const BACKEND: &str = "backend";
/// Role of the api tier
pub const API: &str = "api";
/// Role of the clustered tier
pub const RAFT: &str = "raft";

/// Validate the configuration, declare the whole topology and return its exports
#[instrument(skip_all, fields(application = %config.application, instance = %config.instance))]
pub async fn compose(config: &StackConfig, provisioner: &dyn Provisioner) -> Result<ExportMap> {
    config.validate()?;

    let namespace = build_namespace(
        provisioner,
        &config.namespace_name(),
        &config.instance,
        &config.managed_by,
    )
    .await?;

    let backend = build_tier(provisioner, &namespace, &tier_spec(config, BACKEND, &config.backend))
        .await?;

    let mut api_spec = tier_spec(config, API, &config.api);
    api_spec.env = backend.discovery_env(BACKEND);
    let api = build_tier(provisioner, &namespace, &api_spec).await?;

    let raft = match clustered_spec(config) {
        Some(spec) => Some(build_clustered_tier(provisioner, &namespace, &spec).await?),
        None => {
            info!("no clustered tier configured");
            None
        }
    };

    let routes = build_routes(&route_paths(config), &api, raft.as_ref())?;
    let ingress = build_ingress(provisioner, &ingress_params(config, &api), &routes).await?;

    let exports = ExportMap::collect(&namespace, &backend, &api, raft.as_ref(), &ingress);
    info!(exports = exports.iter().count(), "composition complete");
    Ok(exports)
}

fn tier_spec(config: &StackConfig, role: &str, tier: &TierConfig) -> TierSpec {
    let name = config.tier_name(role);
    let image = config.image(&name, &tier.version);
    let mut spec = TierSpec::new(
        name,
        &tier.version,
        role,
        image,
        tier.http_port,
        ProbePaths::new(&tier.liveness_path, &tier.readiness_path),
    );
    spec.replicas = config.replicas;
    spec.pre_stop_delay = tier.pre_stop_delay_seconds;
    spec
}

fn clustered_spec(config: &StackConfig) -> Option<ClusteredTierSpec> {
    let raft = config.raft.as_ref()?;
    let name = config.tier_name(RAFT);
    let image = config.image(&name, &raft.version);

    let mut spec = ClusteredTierSpec::new(
        name,
        &raft.version,
        RAFT,
        image,
        (raft.http_port, raft.peer_port),
        ProbePaths::new(&raft.liveness_path, &raft.readiness_path),
    );
    spec.replicas = config.replicas;
    if let Some(headless) = config.headless_service_name() {
        spec.peer_service_name = headless;
    }
    Some(spec)
}

fn route_paths(config: &StackConfig) -> RoutePaths {
    RoutePaths {
        test: config.ingress.test_path.clone(),
        raft: config.ingress.raft_path.clone(),
        default: config.ingress.default_path.clone(),
    }
}

/// The Ingress lives beside the api tier and carries its labels
fn ingress_params(config: &StackConfig, api: &TierHandle) -> IngressParams {
    IngressParams {
        name: config.ingress_name(),
        namespace: api.namespace().to_string(),
        host: config.ingress.host.clone(),
        class_name: config.ingress.class_name.clone(),
        labels: api.identity().full.clone(),
    }
}
