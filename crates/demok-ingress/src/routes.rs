//! Path-to-backend routing table

use demok_common::{Error, Result};
use demok_workload::TierHandle;

/// Path that matches every request
pub const CATCH_ALL: &str = "/";

/// How a route's path is matched
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathMatch {
    /// Match on path prefix
    #[default]
    Prefix,
    /// Match the exact path
    Exact,
}

impl PathMatch {
    /// Value of the Ingress `pathType` field
    pub fn as_str(&self) -> &'static str {
        match self {
            PathMatch::Prefix => "Prefix",
            PathMatch::Exact => "Exact",
        }
    }
}

/// Target port on a backend service
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortSelector {
    /// Literal port number
    Number(u16),
    /// Named service port
    Name(String),
}

/// One path-prefix-to-backend mapping
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    /// Path
    pub path: String,
    /// Match mode
    pub path_match: PathMatch,
    /// Target service name
    pub service: String,
    /// Target service port
    pub port: PortSelector,
}

impl RouteEntry {
    /// True for the `/` prefix route
    pub fn is_catch_all(&self) -> bool {
        self.path == CATCH_ALL && self.path_match == PathMatch::Prefix
    }
}

/// Routes in evaluation order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteSet {
    entries: Vec<RouteEntry>,
}

impl RouteSet {
    /// Build a route set, moving catch-all routes behind every other route
    pub fn new(mut entries: Vec<RouteEntry>) -> Self {
        // stable: relative order of specific routes is preserved
        entries.sort_by_key(RouteEntry::is_catch_all);
        Self { entries }
    }

    /// Entries in evaluation order
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Number of routes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no routes
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in evaluation order
    pub fn iter(&self) -> std::slice::Iter<'_, RouteEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a RouteSet {
    type Item = &'a RouteEntry;
    type IntoIter = std::slice::Iter<'a, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Externally visible paths
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePaths {
    /// Routed to the api tier's HTTP port
    pub test: String,
    /// Routed to the clustered tier's peer port
    pub raft: String,
    /// Routed to the clustered tier's HTTP port
    pub default: String,
}

impl Default for RoutePaths {
    fn default() -> Self {
        Self {
            test: "/test".to_string(),
            raft: "/raft".to_string(),
            default: CATCH_ALL.to_string(),
        }
    }
}

/// Build the routing table from the api and (optional) clustered tier handles.
///
/// Without a clustered tier only the test route is emitted. A clustered
/// handle without a peer port is a [`Error::Dependency`].
pub fn build_routes(
    paths: &RoutePaths,
    api: &TierHandle,
    raft: Option<&TierHandle>,
) -> Result<RouteSet> {
    let mut entries = vec![RouteEntry {
        path: paths.test.clone(),
        path_match: PathMatch::Prefix,
        service: api.service_name().to_string(),
        port: PortSelector::Number(api.http_port().number),
    }];

    if let Some(raft) = raft {
        // peer port is position 1 of a clustered handle
        let peer = raft.ports().get(1).copied().ok_or_else(|| {
            Error::dependency(
                "routes",
                format!("tier {} has no peer port to route {} to", raft.name(), paths.raft),
            )
        })?;

        entries.push(RouteEntry {
            path: paths.raft.clone(),
            path_match: PathMatch::Prefix,
            service: raft.service_name().to_string(),
            port: PortSelector::Name(peer.service_port_name.clone()),
        });
        entries.push(RouteEntry {
            path: paths.default.clone(),
            path_match: PathMatch::Prefix,
            service: raft.service_name().to_string(),
            port: PortSelector::Name(raft.http_port().service_port_name.clone()),
        });
    }

    Ok(RouteSet::new(entries))
}
