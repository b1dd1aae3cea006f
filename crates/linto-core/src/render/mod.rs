//! Backend renderers for deployment artifacts.
//!
//! Each orchestration backend implements the `Backend` trait; call sites
//! select one once through `backend_for` instead of branching on the
//! backend enum everywhere.

pub mod artifact;
pub mod compose;
pub mod convert;
pub mod k3s;
pub mod plan;
pub mod swarm;

use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::model::{DeploymentBackend, ProfileConfig};
use crate::runner::CommandRunner;
use crate::secrets::{RandomSecretProvider, SecretProvider};
use crate::store::ProfileStore;

pub use artifact::{Artifact, ChartKind, ChartValues, ComposeFile, SwarmFile};

/// Shared state for backend operations: where `.linto/` lives and how to
/// invoke external tools.
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub base_dir: PathBuf,
    pub runner: CommandRunner,
}

impl DeployContext {
    pub fn new(base_dir: impl Into<PathBuf>, runner: CommandRunner) -> Self {
        DeployContext {
            base_dir: base_dir.into(),
            runner,
        }
    }

    pub fn from_cwd(runner: CommandRunner) -> Result<Self> {
        Ok(DeployContext::new(std::env::current_dir()?, runner))
    }

    /// Directory where a backend writes its rendered artifacts.
    pub fn render_dir(&self, backend: DeploymentBackend, profile_name: &str) -> PathBuf {
        self.base_dir
            .join(".linto")
            .join("render")
            .join(backend.as_str())
            .join(profile_name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOptions {
    /// Remove rendered files on disk.
    pub remove_files: bool,
    /// k3s only: also delete PVCs.
    pub remove_volumes: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct LogOptions {
    pub follow: bool,
    pub tail: u32,
}

impl Default for LogOptions {
    fn default() -> Self {
        LogOptions {
            follow: false,
            tail: 100,
        }
    }
}

/// One row of deployment status.
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    pub name: String,
    pub status: String,
    pub detail: Option<String>,
}

/// Backend interface for deployment renderers.
pub trait Backend {
    fn kind(&self) -> DeploymentBackend;

    /// Render deployment artifacts from a fully populated profile. Pure:
    /// no I/O, no secret filling, deterministic for a given profile.
    fn render(&self, profile: &ProfileConfig) -> Result<Artifact>;

    /// Generate deployment files on disk, filling and persisting secrets
    /// first.
    fn generate(&self, ctx: &DeployContext, profile_name: &str, output_dir: Option<&Path>) -> Result<PathBuf>;

    /// Apply the deployment.
    fn apply(&self, ctx: &DeployContext, profile_name: &str) -> Result<()>;

    /// Tear the deployment down.
    fn destroy(&self, ctx: &DeployContext, profile_name: &str, opts: &DestroyOptions) -> Result<()>;

    /// Status of deployed services.
    fn status(&self, _ctx: &DeployContext, _profile_name: &str) -> Result<Vec<ServiceStatus>> {
        Err(DeployError::UnsupportedBackend(format!(
            "status is not available for the '{}' backend",
            self.kind().as_str()
        )))
    }

    /// Stream service logs.
    fn logs(
        &self,
        _ctx: &DeployContext,
        _profile_name: &str,
        _service: Option<&str>,
        _opts: &LogOptions,
    ) -> Result<()> {
        Err(DeployError::UnsupportedBackend(format!(
            "logs are not available for the '{}' backend",
            self.kind().as_str()
        )))
    }
}

/// Load a profile, fill any unset secrets, and persist it back. Every
/// generate pass starts here so profile edits take effect and secrets are
/// minted exactly once.
pub(crate) fn load_filled_profile(ctx: &DeployContext, profile_name: &str) -> Result<ProfileConfig> {
    let store = ProfileStore::new(&ctx.base_dir);
    let mut profile = store.load(profile_name)?;
    RandomSecretProvider.fill(&mut profile);
    store.save(&profile)?;
    Ok(profile)
}

/// Filesystem side effects shared by the compose and swarm generators:
/// TLS material and the LLM gateway's mounted config directories.
pub(crate) fn prepare_stack_dirs(ctx: &DeployContext, profile: &ProfileConfig) -> Result<()> {
    crate::tls::prepare(&ctx.runner, &ctx.base_dir, profile)?;

    if profile.llm_enabled {
        let llm_dir = ctx.base_dir.join(".linto").join("llm");
        std::fs::create_dir_all(llm_dir.join("hydra-conf"))?;
        std::fs::create_dir_all(llm_dir.join("prompts"))?;
    }
    Ok(())
}

/// Select the renderer for a backend.
pub fn backend_for(backend: DeploymentBackend) -> Box<dyn Backend> {
    match backend {
        DeploymentBackend::Compose => Box::new(compose::ComposeBackend),
        DeploymentBackend::Swarm => Box::new(swarm::SwarmBackend),
        DeploymentBackend::K3s => Box::new(k3s::K3sBackend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_factory_covers_all_backends() {
        for kind in [DeploymentBackend::Compose, DeploymentBackend::Swarm, DeploymentBackend::K3s] {
            assert_eq!(backend_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_render_dir_layout() {
        let ctx = DeployContext::new("/tmp/base", CommandRunner::default());
        assert_eq!(
            ctx.render_dir(DeploymentBackend::K3s, "dev"),
            PathBuf::from("/tmp/base/.linto/render/k3s/dev")
        );
    }
}
