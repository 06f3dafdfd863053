//! Action runtime
//!
//! This crate provides the provider catalog (providers, groups, bindings),
//! requirement loading, catalog listings and the execution environment
//! that hands out invocation contexts.

mod catalog;
mod config;
mod environment;
mod group;
mod provider;
mod registry;

pub use catalog::{ActionGroupListing, ActionSummary, ProviderSummary};
pub use config::RuntimeConfig;
pub use environment::{init_tracing, Environment};
pub use group::Group;
pub use provider::{OAuthEndpoint, Provider};
pub use registry::Registry;
