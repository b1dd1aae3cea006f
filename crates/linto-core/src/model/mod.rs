//! Configuration and service entity models.

pub mod profile;
pub mod service;

pub use profile::{
    DeploymentBackend, GpuArchitecture, GpuMode, ProfileConfig, StreamingSttVariant, TlsMode,
};
pub use service::{
    DeployConfig, HealthcheckConfig, Resources, ResourceSpec, RestartPolicy, ServiceCategory,
    ServiceCommand, ServiceDefinition, VolumeMount,
};
