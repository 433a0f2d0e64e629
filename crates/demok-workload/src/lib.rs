//! Tier descriptors for demok
//!
//! Each builder compiles pure resource descriptions, declares them through a
//! [`Provisioner`](demok_common::Provisioner) and returns an immutable handle:
//! - [`build_namespace`] → [`NamespaceHandle`]
//! - [`build_tier`] → [`TierHandle`] with one HTTP port
//! - [`build_clustered_tier`] → [`TierHandle`] with `[http, peer]` ports and a
//!   headless peer-discovery service

#![deny(missing_docs)]

pub mod clustered;
pub mod handle;
pub mod namespace;
pub mod tier;

pub use clustered::{
    build_clustered_tier, ClusteredTierCompiler, ClusteredTierSpec, CompiledClusteredTier,
};
pub use handle::{NamespaceHandle, TierHandle, TierPort};
pub use namespace::build_namespace;
pub use tier::{build_tier, CompiledTier, ProbePaths, TierCompiler, TierSpec};
