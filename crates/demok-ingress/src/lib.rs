//! Routing table builder and Ingress compilation for demok
//!
//! [`build_routes`] turns tier handles into an ordered [`RouteSet`] (specific
//! prefixes first, `/` last); [`IngressCompiler`] renders that set as a single
//! host rule.

#![deny(missing_docs)]

pub mod compiler;
pub mod routes;

pub use compiler::{build_ingress, IngressCompiler, IngressParams};
pub use routes::{build_routes, PathMatch, PortSelector, RouteEntry, RoutePaths, RouteSet};
