#![warn(clippy::indexing_slicing)]
#![deny(unused_crate_dependencies)]

//! Builds the containers the injector adds to a pod.
//!
//! Everything here is a pure function of an [`AgentConfig`](pluton_config::AgentConfig) and the
//! pod as it was observed, except for [`mesh`], which reads the shared istio configuration from
//! the cluster.
//!
//! - [`container::sidecar`]: the long running Vault agent sidecar;
//! - [`container::init`]: the privileged istio network init container;
//! - [`template::version_hash`]: version tag of the istio injection template.

pub mod container;
pub mod env;
pub mod error;
pub mod mesh;
pub mod mounts;
pub mod quantity;
pub mod resources;
pub mod template;

pub use container::{init::build_istio_init, sidecar::build_sidecar, ContainerVariant};
pub use error::{InjectError, Result};
