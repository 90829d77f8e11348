#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

//! Per-pod configuration of the pluton Vault agent.
//!
//! An [`AgentConfig`] is built once per injection request, from the pod's annotations layered on
//! top of the injector-wide [`InjectorDefaults`], and is never mutated afterwards.
//!
//! The [`vault_agent`] module renders the configuration file the Vault agent reads at startup.
pub mod agent;
pub mod annotations;
pub mod defaults;
pub mod error;
pub mod vault_agent;

pub use agent::{AgentConfig, ResourcesConfig, Secret, VaultConfig};
pub use defaults::InjectorDefaults;
pub use error::{ConfigError, Result};

