//! Stack configuration
//!
//! Every field has a default, so an empty document describes the stock
//! three-tier `k8s-demo` topology. Setting `raft: null` drops the clustered
//! tier and its routes.

use std::path::Path;

use demok_common::{
    Error, Result, DEFAULT_REPLICAS, HTTP_PORT_NAME, MANAGED_BY_DEMOK, PEER_PORT_NAME,
};
use serde::{Deserialize, Serialize};

/// Maximum length of a DNS-1123 label
const MAX_NAME_LEN: usize = 63;

const CATCH_ALL_PATH: &str = "/";

/// Configuration for one composition run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackConfig {
    /// Application name; prefix of every tier name
    pub application: String,
    /// Deployment instance label value
    pub instance: String,
    /// Namespace override, defaults to the application name
    pub namespace: Option<String>,
    /// `app.kubernetes.io/managed-by` value
    pub managed_by: String,
    /// Registry prefix for tier images
    pub image_registry: Option<String>,
    /// Replica count for every tier
    pub replicas: u32,
    /// Backend tier
    pub backend: TierConfig,
    /// Api tier
    pub api: TierConfig,
    /// Clustered tier; `None` composes a two-tier topology
    pub raft: Option<RaftConfig>,
    /// Routing table exposure
    pub ingress: IngressConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            application: "k8s-demo".to_string(),
            instance: "dev".to_string(),
            namespace: None,
            managed_by: MANAGED_BY_DEMOK.to_string(),
            image_registry: None,
            replicas: DEFAULT_REPLICAS,
            backend: TierConfig::default(),
            api: TierConfig {
                version: "0.4".to_string(),
                ..TierConfig::default()
            },
            raft: Some(RaftConfig::default()),
            ingress: IngressConfig::default(),
        }
    }
}

/// Stateless tier settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TierConfig {
    /// Image tag and version label
    pub version: String,
    /// HTTP container port
    pub http_port: u16,
    /// Liveness probe path
    pub liveness_path: String,
    /// Readiness probe path
    pub readiness_path: String,
    /// Pre-stop sleep in seconds
    pub pre_stop_delay_seconds: Option<u32>,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            http_port: 8080,
            liveness_path: "/actuator/health/liveness".to_string(),
            readiness_path: "/actuator/health/readiness".to_string(),
            pre_stop_delay_seconds: Some(30),
        }
    }
}

/// Clustered tier settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaftConfig {
    /// Image tag and version label
    pub version: String,
    /// HTTP container port
    pub http_port: u16,
    /// Peer container port
    pub peer_port: u16,
    /// Liveness probe path
    pub liveness_path: String,
    /// Readiness probe path
    pub readiness_path: String,
    /// Headless service name, defaults to `<tier>-headless`
    pub headless_service_name: Option<String>,
}

impl Default for RaftConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            http_port: 8080,
            peer_port: 6666,
            liveness_path: "/live".to_string(),
            readiness_path: "/ready".to_string(),
            headless_service_name: None,
        }
    }
}

/// Ingress settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngressConfig {
    /// External host
    pub host: String,
    /// Ingress class
    pub class_name: String,
    /// Path routed to the api tier
    pub test_path: String,
    /// Path routed to the clustered tier's peer port
    pub raft_path: String,
    /// Catch-all path routed to the clustered tier's HTTP port
    pub default_path: String,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            host: "demok.cdk.here".to_string(),
            class_name: "nginx".to_string(),
            test_path: "/test".to_string(),
            raft_path: "/raft".to_string(),
            default_path: "/".to_string(),
        }
    }
}

impl StackConfig {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::serialization(format!("invalid stack config: {}", e)))
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::validation_for_field("file", format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&data)
    }

    /// Namespace everything is declared into
    pub fn namespace_name(&self) -> String {
        self.namespace
            .clone()
            .unwrap_or_else(|| self.application.clone())
    }

    /// Name of a tier, `<application>-<role>`
    pub fn tier_name(&self, role: &str) -> String {
        format!("{}-{}", self.application, role)
    }

    /// Name of the headless peer-discovery service
    pub fn headless_service_name(&self) -> Option<String> {
        self.raft.as_ref().map(|raft| {
            raft.headless_service_name
                .clone()
                .unwrap_or_else(|| format!("{}-headless", self.tier_name("raft")))
        })
    }

    /// Names of the clustered load-balanced service ports, `<tier>-http` and
    /// `<tier>-raft`
    pub fn raft_service_port_names(&self) -> [String; 2] {
        let tier = self.tier_name("raft");
        [
            format!("{}-{}", tier, HTTP_PORT_NAME),
            format!("{}-{}", tier, PEER_PORT_NAME),
        ]
    }

    /// Name of the Ingress object
    pub fn ingress_name(&self) -> String {
        self.tier_name("ingress")
    }

    /// Image reference for a tier
    pub fn image(&self, name: &str, version: &str) -> String {
        match self.image_registry.as_deref() {
            Some(registry) => format!("{}/{}:{}", registry.trim_end_matches('/'), name, version),
            None => format!("{}:{}", name, version),
        }
    }

    /// Reject configuration that would fail at declaration time
    pub fn validate(&self) -> Result<()> {
        validate_name("application", &self.application)?;
        validate_name("instance", &self.instance)?;
        validate_name("namespace", &self.namespace_name())?;
        for role in ["backend", "api", "ingress"] {
            validate_name(role, &self.tier_name(role))?;
        }

        if self.replicas == 0 {
            return Err(Error::validation_for_field("replicas", "must be at least 1"));
        }

        validate_tier("backend", &self.backend)?;
        validate_tier("api", &self.api)?;

        if let Some(raft) = &self.raft {
            validate_name("raft", &self.tier_name("raft"))?;
            if let Some(headless) = self.headless_service_name() {
                validate_name("raft.headlessServiceName", &headless)?;
            }
            for port_name in self.raft_service_port_names() {
                validate_name("raft.servicePorts", &port_name)?;
            }
            validate_port("raft.httpPort", raft.http_port)?;
            validate_port("raft.peerPort", raft.peer_port)?;
            if raft.http_port == raft.peer_port {
                return Err(Error::validation_for_field(
                    "raft.peerPort",
                    format!("must differ from httpPort {}", raft.http_port),
                ));
            }
            validate_path("raft.livenessPath", &raft.liveness_path)?;
            validate_path("raft.readinessPath", &raft.readiness_path)?;
        }

        if self.ingress.host.is_empty() {
            return Err(Error::validation_for_field("ingress.host", "must not be empty"));
        }
        validate_path("ingress.testPath", &self.ingress.test_path)?;
        validate_path("ingress.raftPath", &self.ingress.raft_path)?;
        validate_path("ingress.defaultPath", &self.ingress.default_path)?;
        if self.raft.is_some() {
            self.validate_route_overlap()?;
        }

        Ok(())
    }

    /// With a clustered tier all three routes are emitted; the test and raft
    /// paths must be distinct from each other and from the catch-all.
    fn validate_route_overlap(&self) -> Result<()> {
        let ingress = &self.ingress;
        for (field, path) in [
            ("ingress.testPath", &ingress.test_path),
            ("ingress.raftPath", &ingress.raft_path),
        ] {
            if path == CATCH_ALL_PATH || *path == ingress.default_path {
                return Err(Error::validation_for_field(
                    field,
                    format!("path '{}' overlaps the catch-all route", path),
                ));
            }
        }
        if ingress.test_path == ingress.raft_path {
            return Err(Error::validation_for_field(
                "ingress.raftPath",
                format!("path '{}' is already routed to the api tier", ingress.raft_path),
            ));
        }
        Ok(())
    }
}

fn validate_tier(role: &str, tier: &TierConfig) -> Result<()> {
    validate_port(&format!("{}.httpPort", role), tier.http_port)?;
    validate_path(&format!("{}.livenessPath", role), &tier.liveness_path)?;
    validate_path(&format!("{}.readinessPath", role), &tier.readiness_path)
}

fn validate_port(field: &str, port: u16) -> Result<()> {
    if port == 0 {
        return Err(Error::validation_for_field(field, "port must be non-zero"));
    }
    Ok(())
}

fn validate_path(field: &str, path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::validation_for_field(
            field,
            format!("path '{}' must start with '/'", path),
        ));
    }
    Ok(())
}

/// DNS-1123 label: lowercase alphanumerics and '-', alphanumeric at both ends
fn validate_name(field: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation_for_field(field, "name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(Error::validation_for_field(
            field,
            format!("name '{}' exceeds {} characters", name, MAX_NAME_LEN),
        ));
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_ends = !name.starts_with('-') && !name.ends_with('-');
    if !valid_chars || !valid_ends {
        return Err(Error::validation_for_field(
            field,
            format!("name '{}' is not a valid DNS-1123 label", name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: Error) -> String {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_describe_the_three_tier_stack() {
        let config = StackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.namespace_name(), "k8s-demo");
        assert_eq!(config.tier_name("api"), "k8s-demo-api");
        assert_eq!(config.api.version, "0.4");
        assert_eq!(config.backend.version, "0.1");
        assert_eq!(config.replicas, 3);
        assert_eq!(
            config.headless_service_name().as_deref(),
            Some("k8s-demo-raft-headless")
        );
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = StackConfig::from_yaml("{}").unwrap();
        assert_eq!(config, StackConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let yaml = r#"
application: shop
instance: prod
backend:
  version: "2.0"
ingress:
  host: shop.example.com
"#;
        let config = StackConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.application, "shop");
        assert_eq!(config.backend.version, "2.0");
        assert_eq!(config.backend.http_port, 8080);
        assert_eq!(config.ingress.host, "shop.example.com");
        assert_eq!(config.ingress.class_name, "nginx");
        assert!(config.raft.is_some());
    }

    #[test]
    fn null_raft_drops_the_clustered_tier() {
        let config = StackConfig::from_yaml("raft: null").unwrap();
        assert!(config.raft.is_none());
        assert!(config.headless_service_name().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_serialization_error() {
        let err = StackConfig::from_yaml("replicas: [1, 2]").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = StackConfig::from_file("/nonexistent/stack.yaml").unwrap_err();
        assert_eq!(field_of(err), "file");
    }

    #[test]
    fn image_with_and_without_registry() {
        let mut config = StackConfig::default();
        assert_eq!(config.image("k8s-demo-api", "0.4"), "k8s-demo-api:0.4");

        config.image_registry = Some("registry.local:5000/".to_string());
        assert_eq!(
            config.image("k8s-demo-api", "0.4"),
            "registry.local:5000/k8s-demo-api:0.4"
        );
    }

    #[test]
    fn namespace_override() {
        let config = StackConfig {
            namespace: Some("team-a".to_string()),
            ..StackConfig::default()
        };
        assert_eq!(config.namespace_name(), "team-a");
    }

    #[test]
    fn rejects_invalid_names() {
        let too_long = "a".repeat(64);
        for application in ["", "K8s", "-demo", "demo-", "demo_app", too_long.as_str()] {
            let config = StackConfig {
                application: application.to_string(),
                ..StackConfig::default()
            };
            assert_eq!(field_of(config.validate().unwrap_err()), "application");
        }
    }

    #[test]
    fn rejects_derived_names_over_the_limit() {
        let config = StackConfig {
            application: "a".repeat(60),
            ..StackConfig::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "backend");
    }

    #[test]
    fn rejects_zero_replicas() {
        let config = StackConfig {
            replicas: 0,
            ..StackConfig::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "replicas");
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = StackConfig::default();
        config.api.http_port = 0;
        assert_eq!(field_of(config.validate().unwrap_err()), "api.httpPort");
    }

    #[test]
    fn rejects_shared_http_and_peer_port() {
        let mut config = StackConfig::default();
        if let Some(raft) = config.raft.as_mut() {
            raft.peer_port = raft.http_port;
        }
        assert_eq!(field_of(config.validate().unwrap_err()), "raft.peerPort");
    }

    #[test]
    fn rejects_relative_paths() {
        let mut config = StackConfig::default();
        config.ingress.raft_path = "raft".to_string();
        assert_eq!(field_of(config.validate().unwrap_err()), "ingress.raftPath");
    }

    #[test]
    fn rejects_overlapping_route_paths() {
        let mut config = StackConfig::default();
        config.ingress.test_path = "/".to_string();
        assert_eq!(field_of(config.validate().unwrap_err()), "ingress.testPath");

        let mut config = StackConfig::default();
        config.ingress.raft_path = "/".to_string();
        assert_eq!(field_of(config.validate().unwrap_err()), "ingress.raftPath");

        let mut config = StackConfig::default();
        config.ingress.test_path = "/raft".to_string();
        assert_eq!(field_of(config.validate().unwrap_err()), "ingress.raftPath");

        let mut config = StackConfig::default();
        config.ingress.default_path = "/api".to_string();
        config.ingress.test_path = "/api".to_string();
        assert_eq!(field_of(config.validate().unwrap_err()), "ingress.testPath");
    }

    #[test]
    fn two_tier_stack_may_route_test_path_at_root() {
        let mut config = StackConfig::default();
        config.raft = None;
        config.ingress.test_path = "/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_raft_service_port_names_over_the_limit() {
        let mut config = StackConfig {
            application: "a".repeat(54),
            ..StackConfig::default()
        };
        if let Some(raft) = config.raft.as_mut() {
            raft.headless_service_name = Some("peers".to_string());
        }

        let [http, peer] = config.raft_service_port_names();
        assert_eq!(http.len(), 64);
        assert_eq!(peer.len(), 64);
        assert_eq!(field_of(config.validate().unwrap_err()), "raft.servicePorts");
    }
}
