//! Canonical labels shared by every resource description
//!
//! Each tier carries two label sets:
//! - **selector labels**: `name` + `instance`, used by the Deployment selector and
//!   by every Service that targets it
//! - **full labels**: selector labels plus `version`, `component` and `managed-by`,
//!   attached to metadata and pod templates
//!
//! Services never declare their own selectors; they copy [`Identity::selector`]
//! so a Service can't drift from the workload it fronts.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the name of the application (e.g., "k8s-demo-api")
pub const LABEL_NAME: &str = "app.kubernetes.io/name";

/// Standard label for a unique name identifying the deployment instance
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";

/// Standard label for the version of the application
pub const LABEL_VERSION: &str = "app.kubernetes.io/version";

/// Standard label for the component within the architecture (e.g., "api", "raft")
pub const LABEL_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool managing the resource
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Label sets derived for one tier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Minimal labels binding workloads and services to pods
    pub selector: BTreeMap<String, String>,
    /// Selector labels plus descriptive labels for tooling
    pub full: BTreeMap<String, String>,
}

impl Identity {
    /// Derive the selector and full label sets for a tier
    pub fn derive(name: &str, instance: &str, version: &str, component: &str) -> Self {
        Self::derive_managed(name, instance, version, component, crate::MANAGED_BY_DEMOK)
    }

    /// Derive label sets with an explicit `managed-by` marker
    pub fn derive_managed(
        name: &str,
        instance: &str,
        version: &str,
        component: &str,
        managed_by: &str,
    ) -> Self {
        let selector = selector_labels(name, instance);

        let mut full = selector.clone();
        full.insert(LABEL_VERSION.to_string(), version.to_string());
        full.insert(LABEL_COMPONENT.to_string(), component.to_string());
        full.insert(LABEL_MANAGED_BY.to_string(), managed_by.to_string());

        Self { selector, full }
    }

    /// True when every selector label appears with the same value in the full set
    pub fn is_consistent(&self) -> bool {
        is_subset(&self.selector, &self.full)
    }
}

/// Free-function form of [`Identity::derive`], returning `(selector, full)`
pub fn derive_identity(
    name: &str,
    instance: &str,
    version: &str,
    component: &str,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let identity = Identity::derive(name, instance, version, component);
    (identity.selector, identity.full)
}

/// The `name` + `instance` label pair
pub fn selector_labels(name: &str, instance: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), name.to_string()),
        (LABEL_INSTANCE.to_string(), instance.to_string()),
    ])
}

/// True when every entry of `subset` appears in `superset` with the same value
pub fn is_subset(subset: &BTreeMap<String, String>, superset: &BTreeMap<String, String>) -> bool {
    subset
        .iter()
        .all(|(key, value)| superset.get(key) == Some(value))
}
