//! Error types for demok
//!
//! Errors carry the kind and name of the resource involved so a failed
//! composition run can be traced back to the exact declaration that broke it.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for demok operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The provisioning engine rejected a resource description
    #[error("declaration of {kind} {name} rejected: {message}")]
    Declaration {
        /// Resource kind (Namespace, Deployment, Service, Ingress)
        kind: String,
        /// Resource name
        name: String,
        /// Reason given by the engine
        message: String,
    },

    /// A step was handed a tier handle that lacks what it depends on
    #[error("dependency error in {stage}: {message}")]
    Dependency {
        /// Pipeline stage that detected the problem (e.g., "routes")
        stage: String,
        /// Description of the missing dependency
        message: String,
    },

    /// Configuration rejected before anything was declared
    #[error("validation error for {field}: {message}")]
    Validation {
        /// The invalid field path (e.g., "raft.peerPort")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a declaration error for a resource the engine refused
    pub fn declaration(
        kind: impl Into<String>,
        name: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Declaration {
            kind: kind.into(),
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create a dependency error for the given pipeline stage
    pub fn dependency(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Dependency {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error without a field path
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            field: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error for a specific config field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Name of the resource this error concerns, if any
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Error::Declaration { name, .. } => Some(name),
            _ => None,
        }
    }
}
