//! Composition of the demok multi-tier topology
//!
//! [`compose`] turns a [`StackConfig`] into declarations against a
//! [`Provisioner`](demok_common::Provisioner) and returns the [`ExportMap`].

#![deny(missing_docs)]

pub mod config;
pub mod export;
pub mod pipeline;

pub use config::{IngressConfig, RaftConfig, StackConfig, TierConfig};
pub use export::ExportMap;
pub use pipeline::compose;
