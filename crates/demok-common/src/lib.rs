//! Common types for demok: errors, labels, resource descriptions and the
//! provisioning-engine boundary

#![cfg_attr(not(any(test, feature = "testing")), deny(missing_docs))]

pub mod error;
pub mod k8s;
pub mod kube_utils;
pub mod labels;
pub mod provision;

pub use error::Error;
pub use labels::{derive_identity, Identity};
pub use provision::{Declared, Provisioner};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Replica count applied to every tier unless configured otherwise
pub const DEFAULT_REPLICAS: u32 = 3;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "demok";

/// Value of `app.kubernetes.io/managed-by` on everything demok declares
pub const MANAGED_BY_DEMOK: &str = "demok";

/// Named container port carrying HTTP traffic
pub const HTTP_PORT_NAME: &str = "http";

/// Named container port carrying raft peer traffic
pub const PEER_PORT_NAME: &str = "raft";
