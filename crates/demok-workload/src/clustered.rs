//! Clustered tier: a consensus workload with HTTP and peer ports, a
//! load-balanced service and a headless peer-discovery service

use demok_common::k8s::{Container, ContainerPort, Deployment, EnvVar, Probe, Service};
use demok_common::{Identity, Provisioner, Result, DEFAULT_REPLICAS, HTTP_PORT_NAME, PEER_PORT_NAME};
use tracing::info;

use crate::handle::{NamespaceHandle, TierHandle, TierPort};
use crate::tier::{
    compile_deployment, compile_service, derive_tier_identity, service_port, ProbePaths,
    IMAGE_PULL_POLICY,
};

/// Env var carrying the namespace replicas run in
pub const ENV_NAMESPACE: &str = "DEMOK_NAMESPACE";

/// Env var carrying the headless service replicas resolve to find peers
pub const ENV_HEADLESS_SERVICE_NAME: &str = "DEMOK_RAFT_HEADLESS_SERVICE_NAME";

/// Everything needed to build a clustered tier
#[derive(Clone, Debug, PartialEq)]
pub struct ClusteredTierSpec {
    /// Tier name; also the workload, load-balanced service and container name
    pub name: String,
    /// Version label value
    pub version: String,
    /// Component role label value
    pub component: String,
    /// Image reference (`name:version`)
    pub image: String,
    /// HTTP container port
    pub http_port: u16,
    /// Peer-to-peer container port
    pub peer_port: u16,
    /// Health check paths
    pub probes: ProbePaths,
    /// Replica count
    pub replicas: u32,
    /// Name of the headless peer-discovery service
    pub peer_service_name: String,
}

impl ClusteredTierSpec {
    /// Spec with default replicas and `<name>-headless` as peer service name
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        component: impl Into<String>,
        image: impl Into<String>,
        ports: (u16, u16),
        probes: ProbePaths,
    ) -> Self {
        let name = name.into();
        let peer_service_name = format!("{}-headless", name);
        Self {
            name,
            version: version.into(),
            component: component.into(),
            image: image.into(),
            http_port: ports.0,
            peer_port: ports.1,
            probes,
            replicas: DEFAULT_REPLICAS,
            peer_service_name,
        }
    }

    fn http_service_port_name(&self) -> String {
        format!("{}-{}", self.name, HTTP_PORT_NAME)
    }

    fn peer_service_port_name(&self) -> String {
        format!("{}-{}", self.name, PEER_PORT_NAME)
    }
}

/// Resource descriptions compiled for a clustered tier
#[derive(Clone, Debug)]
pub struct CompiledClusteredTier {
    /// Identity the resources were labelled with
    pub identity: Identity,
    /// The workload
    pub deployment: Deployment,
    /// Load-balanced service exposing both ports
    pub service: Service,
    /// Headless service exposing only the peer port
    pub headless_service: Service,
}

impl CompiledClusteredTier {
    /// Point the replicas' peer-discovery env at `name`
    pub fn bind_peer_service(&mut self, name: &str) {
        let containers = &mut self.deployment.spec.template.spec.containers;
        for var in containers.iter_mut().flat_map(|c| c.env.iter_mut()) {
            if var.name == ENV_HEADLESS_SERVICE_NAME {
                var.value = name.to_string();
            }
        }
    }
}

/// Compiles a [`ClusteredTierSpec`] into resource descriptions
pub struct ClusteredTierCompiler;

impl ClusteredTierCompiler {
    /// Compile the Deployment and both Services for a clustered tier. Pure.
    pub fn compile(namespace: &NamespaceHandle, spec: &ClusteredTierSpec) -> CompiledClusteredTier {
        let identity = derive_tier_identity(namespace, &spec.name, &spec.version, &spec.component);

        let container = Container {
            name: spec.name.clone(),
            image: spec.image.clone(),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
            ports: vec![
                ContainerPort::named(HTTP_PORT_NAME, spec.http_port),
                ContainerPort::named(PEER_PORT_NAME, spec.peer_port),
            ],
            env: vec![
                EnvVar::literal(ENV_NAMESPACE, &namespace.name),
                EnvVar::literal(ENV_HEADLESS_SERVICE_NAME, &spec.peer_service_name),
            ],
            liveness_probe: Some(Probe::http_get(&spec.probes.liveness, HTTP_PORT_NAME)),
            readiness_probe: Some(Probe::http_get(&spec.probes.readiness, HTTP_PORT_NAME)),
            lifecycle: None,
        };

        let deployment =
            compile_deployment(&spec.name, &namespace.name, &identity, spec.replicas, container);

        let service = compile_service(
            &spec.name,
            &namespace.name,
            &identity,
            &deployment,
            vec![
                service_port(spec.http_service_port_name(), spec.http_port, HTTP_PORT_NAME),
                service_port(spec.peer_service_port_name(), spec.peer_port, PEER_PORT_NAME),
            ],
        );

        let mut headless_service = compile_service(
            &spec.peer_service_name,
            &namespace.name,
            &identity,
            &deployment,
            vec![service_port(
                spec.peer_service_port_name(),
                spec.peer_port,
                PEER_PORT_NAME,
            )],
        );
        headless_service.spec.type_ = None;
        headless_service.spec.cluster_ip = Some(Service::HEADLESS_CLUSTER_IP.to_string());

        CompiledClusteredTier {
            identity,
            deployment,
            service,
            headless_service,
        }
    }
}

/// Declare a clustered tier: headless service, workload, load-balanced service.
///
/// The headless service goes first so replicas are handed the name the
/// engine resolved for it, the same name the handle reports. The returned
/// handle's ports are `[http, peer]`.
pub async fn build_clustered_tier(
    provisioner: &dyn Provisioner,
    namespace: &NamespaceHandle,
    spec: &ClusteredTierSpec,
) -> Result<TierHandle> {
    let mut compiled = ClusteredTierCompiler::compile(namespace, spec);

    let headless = provisioner
        .declare_service(&compiled.headless_service)
        .await?;
    compiled.bind_peer_service(&headless.name);

    let workload = provisioner.declare_deployment(&compiled.deployment).await?;
    let service = provisioner.declare_service(&compiled.service).await?;

    info!(
        tier = %workload.name,
        service = %service.name,
        headless = %headless.name,
        http_port = spec.http_port,
        peer_port = spec.peer_port,
        replicas = spec.replicas,
        "declared clustered tier"
    );

    Ok(TierHandle::clustered(
        workload.name,
        namespace.name.clone(),
        service.name,
        headless.name,
        (
            TierPort {
                number: spec.http_port,
                service_port_name: spec.http_service_port_name(),
            },
            TierPort {
                number: spec.peer_port,
                service_port_name: spec.peer_service_port_name(),
            },
        ),
        compiled.identity,
    ))
}
