//! Docker Swarm stack renderer and operations.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::docker;
use crate::error::{DeployError, Result};
use crate::model::{DeploymentBackend, ProfileConfig};
use crate::render::artifact::{Artifact, NetworkSpec, SwarmFile, VolumeSpec};
use crate::render::convert::to_swarm_service;
use crate::render::plan::plan_stack;
use crate::render::{Backend, DeployContext, DestroyOptions, load_filled_profile, prepare_stack_dirs};

pub struct SwarmBackend;

fn stack_name(profile_name: &str) -> String {
    format!("linto-{profile_name}")
}

/// Render the swarm stack document for a profile.
pub fn render_stack(profile: &ProfileConfig) -> Result<SwarmFile> {
    let plan = plan_stack(profile)?;

    let mut services = IndexMap::new();
    for service in &plan.services {
        services.insert(
            service.name.clone(),
            to_swarm_service(service, &profile.domain, profile.tls_mode),
        );
    }

    // The ingress network is created out-of-band so multiple stacks can
    // attach to it.
    let mut networks = IndexMap::new();
    networks.insert(crate::catalog::BASE_NETWORK.to_string(), NetworkSpec::external_overlay());
    for name in &plan.networks {
        networks.insert(name.to_string(), NetworkSpec::overlay());
    }

    let mut volumes = IndexMap::new();
    for name in &plan.volumes {
        volumes.insert(name.to_string(), VolumeSpec::default());
    }

    Ok(SwarmFile {
        version: "3.8".to_string(),
        services,
        networks,
        volumes,
    })
}

impl Backend for SwarmBackend {
    fn kind(&self) -> DeploymentBackend {
        DeploymentBackend::Swarm
    }

    fn render(&self, profile: &ProfileConfig) -> Result<Artifact> {
        Ok(Artifact::Swarm(render_stack(profile)?))
    }

    fn generate(&self, ctx: &DeployContext, profile_name: &str, output_dir: Option<&Path>) -> Result<PathBuf> {
        let profile = load_filled_profile(ctx, profile_name)?;

        let stack_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => ctx.render_dir(DeploymentBackend::Swarm, profile_name),
        };
        std::fs::create_dir_all(&stack_dir)?;

        prepare_stack_dirs(ctx, &profile)?;

        let stack = render_stack(&profile)?;
        let stack_path = stack_dir.join("stack.yml");
        std::fs::write(&stack_path, serde_yaml::to_string(&stack)?)?;

        tracing::info!(path = %stack_path.display(), "generated stack artifacts");
        Ok(stack_path)
    }

    fn apply(&self, ctx: &DeployContext, profile_name: &str) -> Result<()> {
        let stack_dir = ctx.render_dir(DeploymentBackend::Swarm, profile_name);
        let stack_path = stack_dir.join("stack.yml");

        if !stack_path.exists() {
            tracing::info!("no rendered artifacts found, generating");
            self.generate(ctx, profile_name, None)?;
        }

        let result = docker::run_docker_stack_deploy(&ctx.runner, &stack_path, &stack_name(profile_name))?;
        if !result.success() {
            return Err(DeployError::external(
                "APPLY_FAILED",
                format!("docker stack deploy failed with code {}", result.status),
            ));
        }
        tracing::info!(profile = profile_name, "stack deployed");
        Ok(())
    }

    fn destroy(&self, ctx: &DeployContext, profile_name: &str, opts: &DestroyOptions) -> Result<()> {
        let stack_dir = ctx.render_dir(DeploymentBackend::Swarm, profile_name);

        let result = docker::run_docker_stack_rm(&ctx.runner, &stack_name(profile_name))?;
        if !result.success() {
            tracing::warn!(code = result.status, "docker stack rm returned non-zero");
        }

        if opts.remove_files && stack_dir.exists() {
            std::fs::remove_dir_all(&stack_dir)?;
            tracing::info!(dir = %stack_dir.display(), "removed generated files");
        }
        Ok(())
    }
}
