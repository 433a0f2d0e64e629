//! Output export: fixed keys mapped to resolved names

use std::collections::BTreeMap;

use demok_common::Declared;
use demok_workload::{NamespaceHandle, TierHandle};
use serde::{Deserialize, Serialize};

/// Export key for the namespace
pub const KEY_NAMESPACE: &str = "namespace";
/// Export key for the backend workload
pub const KEY_BACKEND_DEPLOYMENT: &str = "backendDeployment";
/// Export key for the backend service
pub const KEY_BACKEND_SERVICE: &str = "backendService";
/// Export key for the api workload
pub const KEY_API_DEPLOYMENT: &str = "apiDeployment";
/// Export key for the api service
pub const KEY_API_SERVICE: &str = "apiService";
/// Export key for the clustered workload
pub const KEY_RAFT_DEPLOYMENT: &str = "raftDeployment";
/// Export key for the clustered load-balanced service
pub const KEY_RAFT_SERVICE: &str = "raftService";
/// Export key for the headless peer-discovery service
pub const KEY_RAFT_HEADLESS_SERVICE: &str = "raftHeadlessService";
/// Export key for the Ingress
pub const KEY_INGRESS: &str = "ingress";

/// Flat mapping of export keys to resolved names.
///
/// Raft keys are absent when the topology has no clustered tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportMap(BTreeMap<String, String>);

impl ExportMap {
    /// Collect the export map from the handles of a finished composition
    pub fn collect(
        namespace: &NamespaceHandle,
        backend: &TierHandle,
        api: &TierHandle,
        raft: Option<&TierHandle>,
        ingress: &Declared,
    ) -> Self {
        let mut map = Self::default();
        map.insert(KEY_NAMESPACE, &namespace.name);
        map.insert(KEY_BACKEND_DEPLOYMENT, backend.name());
        map.insert(KEY_BACKEND_SERVICE, backend.service_name());
        map.insert(KEY_API_DEPLOYMENT, api.name());
        map.insert(KEY_API_SERVICE, api.service_name());
        if let Some(raft) = raft {
            map.insert(KEY_RAFT_DEPLOYMENT, raft.name());
            map.insert(KEY_RAFT_SERVICE, raft.service_name());
            if let Some(headless) = raft.headless_service_name() {
                map.insert(KEY_RAFT_HEADLESS_SERVICE, headless);
            }
        }
        map.insert(KEY_INGRESS, &ingress.name);
        map
    }

    fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    /// Resolved name for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
