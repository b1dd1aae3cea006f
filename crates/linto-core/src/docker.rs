//! Docker daemon and swarm helpers used by the compose and swarm backends.

use std::path::Path;
use std::time::Duration;

use crate::error::{DeployError, Result};
use crate::runner::{CmdOutput, CommandRunner, RunOptions};

/// Whether the Docker daemon is accessible.
pub fn check_docker_running(runner: &CommandRunner) -> bool {
    runner
        .run(
            &["docker", "info"],
            &RunOptions::capture_with_timeout(Duration::from_secs(10)),
        )
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Whether Docker is in swarm mode (manager or worker).
pub fn check_swarm_mode(runner: &CommandRunner) -> bool {
    runner
        .run(
            &["docker", "info", "--format", "{{.Swarm.LocalNodeState}}"],
            &RunOptions::capture_with_timeout(Duration::from_secs(10)),
        )
        .map(|out| out.success() && out.stdout.trim() == "active")
        .unwrap_or(false)
}

/// Initialize swarm mode if it is not already active.
pub fn init_swarm(runner: &CommandRunner) -> Result<bool> {
    if check_swarm_mode(runner) {
        return Ok(true);
    }

    let opts = RunOptions::capture_with_timeout(Duration::from_secs(30));
    let result = runner.run(&["docker", "swarm", "init"], &opts)?;
    if result.success() {
        return Ok(true);
    }
    // Automatic address selection can fail on multi-homed hosts.
    let retry = runner.run(
        &["docker", "swarm", "init", "--advertise-addr", "127.0.0.1"],
        &opts,
    )?;
    Ok(retry.success())
}

/// Create an attachable overlay network if it does not already exist.
pub fn create_overlay_network(runner: &CommandRunner, network_name: &str) -> bool {
    let inspect = runner.run(
        &["docker", "network", "inspect", network_name],
        &RunOptions::capture_with_timeout(Duration::from_secs(10)),
    );
    if matches!(inspect, Ok(out) if out.success()) {
        return true;
    }

    runner
        .run(
            &[
                "docker",
                "network",
                "create",
                "--driver",
                "overlay",
                "--attachable",
                network_name,
            ],
            &RunOptions::capture_with_timeout(Duration::from_secs(30)),
        )
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Run a `docker compose` subcommand against a rendered compose directory.
pub fn run_docker_compose(
    runner: &CommandRunner,
    compose_dir: &Path,
    command: &[&str],
    capture: bool,
) -> Result<CmdOutput> {
    if !check_docker_running(runner) {
        return Err(DeployError::external(
            "DOCKER_NOT_RUNNING",
            "Docker daemon is not accessible. Please start Docker.",
        ));
    }

    let compose_file = compose_dir.join("docker-compose.yml");
    if !compose_file.exists() {
        return Err(DeployError::external(
            "COMPOSE_GENERATION_FAILED",
            format!("docker-compose.yml not found at {}", compose_file.display()),
        ));
    }

    let compose_file = compose_file.display().to_string();
    let mut argv = vec!["docker", "compose", "-f", compose_file.as_str()];
    argv.extend_from_slice(command);

    let opts = RunOptions {
        capture,
        cwd: Some(compose_dir.to_path_buf()),
        timeout: None,
    };
    runner.run(&argv, &opts)
}

/// Deploy a stack file, initializing swarm mode and the shared ingress
/// network as needed.
pub fn run_docker_stack_deploy(runner: &CommandRunner, stack_file: &Path, stack_name: &str) -> Result<CmdOutput> {
    if !check_docker_running(runner) {
        return Err(DeployError::external(
            "DOCKER_NOT_RUNNING",
            "Docker daemon is not accessible. Please start Docker.",
        ));
    }

    if !check_swarm_mode(runner) && !init_swarm(runner)? {
        return Err(DeployError::external(
            "SWARM_NOT_ACTIVE",
            "Docker is not in Swarm mode. Run 'docker swarm init' first.",
        ));
    }

    if !stack_file.exists() {
        return Err(DeployError::external(
            "STACK_FILE_NOT_FOUND",
            format!("Stack file not found at {}", stack_file.display()),
        ));
    }

    create_overlay_network(runner, crate::catalog::BASE_NETWORK);

    let stack_file = stack_file.display().to_string();
    runner.run(
        &["docker", "stack", "deploy", "-c", stack_file.as_str(), stack_name],
        &RunOptions::inherit(),
    )
}

pub fn run_docker_stack_rm(runner: &CommandRunner, stack_name: &str) -> Result<CmdOutput> {
    if !check_docker_running(runner) {
        return Err(DeployError::external(
            "DOCKER_NOT_RUNNING",
            "Docker daemon is not accessible. Please start Docker.",
        ));
    }
    runner.run(&["docker", "stack", "rm", stack_name], &RunOptions::inherit())
}
