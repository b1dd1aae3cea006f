//! Core library for the linto deployment CLI.
//!
//! Renders deployment profiles for a multi-service speech/LLM platform into
//! artifacts for one of three orchestration backends (Docker Compose, Docker
//! Swarm, Kubernetes/Helm) and drives the external tools that apply them.
//!
//! The rendering pipeline is a pure function of the profile: profile model →
//! secret provider fills gaps → backend renderer invokes catalog factories
//! gated by feature flags → serializable artifact. Re-rendering a filled
//! profile is byte-identical.

pub mod catalog;
pub mod docker;
pub mod error;
pub mod gpu;
pub mod model;
pub mod render;
pub mod runner;
pub mod secrets;
pub mod store;
pub mod tls;

pub use error::{DeployError, Result};
pub use model::{DeploymentBackend, GpuArchitecture, GpuMode, ProfileConfig, StreamingSttVariant, TlsMode};
pub use render::{Artifact, Backend, DeployContext, DestroyOptions, LogOptions, ServiceStatus, backend_for};
pub use runner::CommandRunner;
pub use secrets::{RandomSecretProvider, SecretProvider};
pub use store::ProfileStore;
