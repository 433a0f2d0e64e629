//! Immutable handles threaded from one build step to the next

use demok_common::k8s::EnvVar;
use demok_common::Identity;

/// Resolved namespace a composition declares everything into
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespaceHandle {
    /// Namespace name
    pub name: String,
    /// Deployment instance every tier is labelled with
    pub instance: String,
    /// `managed-by` marker applied to tier labels
    pub managed_by: String,
}

/// One port a tier exposes through its load-balanced service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierPort {
    /// Port number
    pub number: u16,
    /// Name of the port on the tier's service
    pub service_port_name: String,
}

/// Output of building a tier.
///
/// Downstream tiers and the routing table depend only on this value. Ports are
/// ordered: position 0 is HTTP, position 1 (clustered tiers only) is the peer
/// port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TierHandle {
    name: String,
    namespace: String,
    service_name: String,
    headless_service_name: Option<String>,
    http: TierPort,
    peer: Option<TierPort>,
    identity: Identity,
}

impl TierHandle {
    pub(crate) fn stateless(
        name: String,
        namespace: String,
        service_name: String,
        http: TierPort,
        identity: Identity,
    ) -> Self {
        Self {
            name,
            namespace,
            service_name,
            headless_service_name: None,
            http,
            peer: None,
            identity,
        }
    }

    pub(crate) fn clustered(
        name: String,
        namespace: String,
        service_name: String,
        headless_service_name: String,
        ports: (TierPort, TierPort),
        identity: Identity,
    ) -> Self {
        Self {
            name,
            namespace,
            service_name,
            headless_service_name: Some(headless_service_name),
            http: ports.0,
            peer: Some(ports.1),
            identity,
        }
    }

    /// Workload name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning namespace name
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the load-balanced service
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Name of the headless peer-discovery service, for clustered tiers
    pub fn headless_service_name(&self) -> Option<&str> {
        self.headless_service_name.as_deref()
    }

    /// Ports in contract order: `[http]` or `[http, peer]`
    pub fn ports(&self) -> Vec<&TierPort> {
        std::iter::once(&self.http).chain(self.peer.as_ref()).collect()
    }

    /// The HTTP port (position 0)
    pub fn http_port(&self) -> &TierPort {
        &self.http
    }

    /// Label sets the tier's workload and services were built with
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Environment variables that point a downstream tier at this one:
    /// `DEMOK_<ROLE>_SERVICE_NAME` and `DEMOK_<ROLE>_SERVICE_PORT`.
    pub fn discovery_env(&self, role: &str) -> Vec<EnvVar> {
        let prefix = format!("DEMOK_{}", role.to_ascii_uppercase().replace('-', "_"));
        vec![
            EnvVar::literal(format!("{}_SERVICE_NAME", prefix), &self.service_name),
            EnvVar::literal(format!("{}_SERVICE_PORT", prefix), self.http.number.to_string()),
        ]
    }
}
