//! Stateless tier: one Deployment plus one ClusterIP Service

use demok_common::k8s::{
    Container, ContainerPort, Deployment, DeploymentSpec, EnvVar, IntOrString, LabelSelector,
    Lifecycle, PodMeta, PodSpec, PodTemplateSpec, Probe, Service, ServicePort, ServiceSpec,
};
use demok_common::kube_utils::ObjectMeta;
use demok_common::{Identity, Provisioner, Result, DEFAULT_REPLICAS, HTTP_PORT_NAME};
use tracing::info;

use crate::handle::{NamespaceHandle, TierHandle, TierPort};

/// Image pull policy used for every tier container
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Service type of load-balanced tier services
pub const CLUSTER_IP: &str = "ClusterIP";

/// Liveness and readiness probe paths
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbePaths {
    /// Path probed to decide whether to restart the container
    pub liveness: String,
    /// Path probed to decide whether the pod receives traffic
    pub readiness: String,
}

impl ProbePaths {
    /// Probe paths from string slices
    pub fn new(liveness: impl Into<String>, readiness: impl Into<String>) -> Self {
        Self {
            liveness: liveness.into(),
            readiness: readiness.into(),
        }
    }
}

/// Everything needed to build a stateless tier
#[derive(Clone, Debug, PartialEq)]
pub struct TierSpec {
    /// Tier name; also the workload, service and container name
    pub name: String,
    /// Version label value
    pub version: String,
    /// Component role label value
    pub component: String,
    /// Image reference (`name:version`)
    pub image: String,
    /// HTTP container port
    pub http_port: u16,
    /// Health check paths
    pub probes: ProbePaths,
    /// Replica count
    pub replicas: u32,
    /// Environment variables copied verbatim into the container
    pub env: Vec<EnvVar>,
    /// Seconds to sleep in a pre-stop hook, if any
    pub pre_stop_delay: Option<u32>,
}

impl TierSpec {
    /// Spec with default replicas, no env and no pre-stop hook
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        component: impl Into<String>,
        image: impl Into<String>,
        http_port: u16,
        probes: ProbePaths,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            component: component.into(),
            image: image.into(),
            http_port,
            probes,
            replicas: DEFAULT_REPLICAS,
            env: Vec::new(),
            pre_stop_delay: None,
        }
    }
}

/// Resource descriptions compiled for a stateless tier
#[derive(Clone, Debug)]
pub struct CompiledTier {
    /// Identity the resources were labelled with
    pub identity: Identity,
    /// The workload
    pub deployment: Deployment,
    /// Load-balanced service exposing the HTTP port as `http`
    pub service: Service,
}

/// Compiles a [`TierSpec`] into resource descriptions
pub struct TierCompiler;

impl TierCompiler {
    /// Compile the Deployment and Service for a tier. Pure.
    pub fn compile(namespace: &NamespaceHandle, spec: &TierSpec) -> CompiledTier {
        let identity = derive_tier_identity(namespace, &spec.name, &spec.version, &spec.component);

        let container = Container {
            name: spec.name.clone(),
            image: spec.image.clone(),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
            ports: vec![ContainerPort::named(HTTP_PORT_NAME, spec.http_port)],
            env: spec.env.clone(),
            liveness_probe: Some(Probe::http_get(&spec.probes.liveness, HTTP_PORT_NAME)),
            readiness_probe: Some(Probe::http_get(&spec.probes.readiness, HTTP_PORT_NAME)),
            lifecycle: spec.pre_stop_delay.map(Lifecycle::pre_stop_sleep),
        };

        let deployment =
            compile_deployment(&spec.name, &namespace.name, &identity, spec.replicas, container);

        let service = compile_service(
            &spec.name,
            &namespace.name,
            &identity,
            &deployment,
            vec![service_port(HTTP_PORT_NAME, spec.http_port, HTTP_PORT_NAME)],
        );

        CompiledTier {
            identity,
            deployment,
            service,
        }
    }
}

/// Declare a stateless tier and return its handle.
///
/// The workload is declared before the service; the first engine error aborts
/// the build and is returned unchanged.
pub async fn build_tier(
    provisioner: &dyn Provisioner,
    namespace: &NamespaceHandle,
    spec: &TierSpec,
) -> Result<TierHandle> {
    let compiled = TierCompiler::compile(namespace, spec);

    let workload = provisioner.declare_deployment(&compiled.deployment).await?;
    let service = provisioner.declare_service(&compiled.service).await?;

    info!(
        tier = %workload.name,
        service = %service.name,
        port = spec.http_port,
        replicas = spec.replicas,
        "declared tier"
    );

    Ok(TierHandle::stateless(
        workload.name,
        namespace.name.clone(),
        service.name,
        TierPort {
            number: spec.http_port,
            service_port_name: HTTP_PORT_NAME.to_string(),
        },
        compiled.identity,
    ))
}

pub(crate) fn derive_tier_identity(
    namespace: &NamespaceHandle,
    name: &str,
    version: &str,
    component: &str,
) -> Identity {
    Identity::derive_managed(name, &namespace.instance, version, component, &namespace.managed_by)
}

pub(crate) fn compile_deployment(
    name: &str,
    namespace: &str,
    identity: &Identity,
    replicas: u32,
    container: Container,
) -> Deployment {
    Deployment::new(
        ObjectMeta::new(name, namespace).with_labels(identity.full.clone()),
        DeploymentSpec {
            replicas,
            selector: LabelSelector {
                match_labels: identity.selector.clone(),
            },
            template: PodTemplateSpec {
                metadata: PodMeta {
                    labels: identity.full.clone(),
                },
                spec: PodSpec {
                    containers: vec![container],
                },
            },
        },
    )
}

/// Service whose selector is copied from the workload's selector
pub(crate) fn compile_service(
    name: &str,
    namespace: &str,
    identity: &Identity,
    workload: &Deployment,
    ports: Vec<ServicePort>,
) -> Service {
    Service::new(
        ObjectMeta::new(name, namespace).with_labels(identity.full.clone()),
        ServiceSpec {
            type_: Some(CLUSTER_IP.to_string()),
            cluster_ip: None,
            selector: workload.spec.selector.match_labels.clone(),
            ports,
        },
    )
}

pub(crate) fn service_port(name: impl Into<String>, port: u16, target: &str) -> ServicePort {
    ServicePort {
        name: name.into(),
        port,
        target_port: IntOrString::String(target.to_string()),
    }
}
