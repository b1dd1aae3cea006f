//! Docker Compose renderer and operations.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::docker;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentBackend, ProfileConfig};
use crate::render::artifact::{Artifact, ComposeFile, NetworkSpec, VolumeSpec};
use crate::render::convert::to_compose_service;
use crate::render::plan::plan_stack;
use crate::render::{Backend, DeployContext, DestroyOptions, load_filled_profile, prepare_stack_dirs};

pub struct ComposeBackend;

/// Render the compose document for a profile.
pub fn render_compose(profile: &ProfileConfig) -> Result<ComposeFile> {
    let plan = plan_stack(profile)?;

    let mut services = IndexMap::new();
    for service in &plan.services {
        services.insert(
            service.name.clone(),
            to_compose_service(service, &profile.domain, profile.tls_mode),
        );
    }

    let mut networks = IndexMap::new();
    networks.insert(crate::catalog::BASE_NETWORK.to_string(), NetworkSpec::bridge());
    for name in &plan.networks {
        networks.insert(name.to_string(), NetworkSpec::bridge());
    }

    let mut volumes = IndexMap::new();
    for name in &plan.volumes {
        volumes.insert(name.to_string(), VolumeSpec::default());
    }

    Ok(ComposeFile {
        version: "3.8".to_string(),
        services,
        networks,
        volumes,
    })
}

impl Backend for ComposeBackend {
    fn kind(&self) -> DeploymentBackend {
        DeploymentBackend::Compose
    }

    fn render(&self, profile: &ProfileConfig) -> Result<Artifact> {
        Ok(Artifact::Compose(render_compose(profile)?))
    }

    fn generate(&self, ctx: &DeployContext, profile_name: &str, output_dir: Option<&Path>) -> Result<PathBuf> {
        let profile = load_filled_profile(ctx, profile_name)?;

        let compose_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => ctx.render_dir(DeploymentBackend::Compose, profile_name),
        };
        std::fs::create_dir_all(&compose_dir)?;

        prepare_stack_dirs(ctx, &profile)?;

        let compose = render_compose(&profile)?;
        let compose_path = compose_dir.join("docker-compose.yml");
        std::fs::write(&compose_path, serde_yaml::to_string(&compose)?)?;

        // Non-sensitive vars for `docker compose` convenience.
        let env = format!(
            "COMPOSE_PROJECT_NAME=linto-{}\nDOMAIN={}\nIMAGE_TAG={}\n",
            profile_name, profile.domain, profile.image_tag
        );
        std::fs::write(compose_dir.join(".env"), env)?;

        tracing::info!(path = %compose_path.display(), "generated compose artifacts");
        Ok(compose_path)
    }

    fn apply(&self, ctx: &DeployContext, profile_name: &str) -> Result<()> {
        let compose_dir = ctx.render_dir(DeploymentBackend::Compose, profile_name);

        if !compose_dir.join("docker-compose.yml").exists() {
            tracing::info!("no rendered artifacts found, generating");
            self.generate(ctx, profile_name, None)?;
        }

        let result = docker::run_docker_compose(&ctx.runner, &compose_dir, &["up", "-d"], false)?;
        if !result.success() {
            return Err(DeployError::external(
                "APPLY_FAILED",
                format!("docker compose up failed with code {}", result.status),
            ));
        }
        tracing::info!(profile = profile_name, "deployment started");
        Ok(())
    }

    fn destroy(&self, ctx: &DeployContext, profile_name: &str, opts: &DestroyOptions) -> Result<()> {
        let compose_dir = ctx.render_dir(DeploymentBackend::Compose, profile_name);

        if !compose_dir.join("docker-compose.yml").exists() {
            return Err(DeployError::ProfileNotFound(format!(
                "No deployment found for profile '{profile_name}'"
            )));
        }

        let result = docker::run_docker_compose(&ctx.runner, &compose_dir, &["down", "-v"], false)?;
        if !result.success() {
            tracing::warn!(code = result.status, "docker compose down returned non-zero");
        }

        if opts.remove_files {
            std::fs::remove_dir_all(&compose_dir)?;
            tracing::info!(dir = %compose_dir.display(), "removed generated files");
        }
        Ok(())
    }
}
