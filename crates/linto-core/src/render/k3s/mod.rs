//! Kubernetes (k3s) backend using Helm charts.
//!
//! Renders one values document per enabled chart and deploys each with
//! `helm upgrade --install`. Chart failures during apply/destroy are
//! isolated: one chart's failure is reported but the remaining charts are
//! still attempted.

pub mod cluster;
pub mod values;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DeployError, Result};
use crate::model::{DeploymentBackend, ProfileConfig, TlsMode};
use crate::render::artifact::{Artifact, ChartKind, ChartValues};
use crate::render::{Backend, DeployContext, DestroyOptions, LogOptions, ServiceStatus, load_filled_profile};
use crate::runner::RunOptions;
use crate::store::ProfileStore;

pub struct K3sBackend;

/// Locate the Helm charts shipped with the platform: `charts/` under the
/// deployment base dir, falling back to the current working directory.
fn charts_dir(base_dir: &Path) -> Result<PathBuf> {
    let local = base_dir.join("charts");
    if local.exists() {
        return Ok(local);
    }
    let cwd = std::env::current_dir()?.join("charts");
    if cwd.exists() {
        return Ok(cwd);
    }
    Err(DeployError::PrerequisiteMissing("Helm charts directory not found".to_string()))
}

fn check_prerequisites_gate(ctx: &DeployContext) -> Result<()> {
    let missing = cluster::check_prerequisites(&ctx.runner);
    if !missing.is_empty() {
        return Err(DeployError::PrerequisiteMissing(format!(
            "Missing prerequisites: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Write values files for every enabled chart under `<output>/values/`.
pub fn write_values_files(profile: &ProfileConfig, output_dir: &Path) -> Result<Vec<(ChartKind, PathBuf)>> {
    let values_dir = output_dir.join("values");
    std::fs::create_dir_all(&values_dir)?;

    let mut generated = Vec::new();
    for chart in values::enabled_charts(profile) {
        let document = values::chart_values(profile, chart);
        let path = values_dir.join(chart.values_file());
        std::fs::write(&path, serde_yaml::to_string(&document)?)?;
        generated.push((chart, path));
    }
    Ok(generated)
}

impl Backend for K3sBackend {
    fn kind(&self) -> DeploymentBackend {
        DeploymentBackend::K3s
    }

    fn render(&self, profile: &ProfileConfig) -> Result<Artifact> {
        let charts = values::enabled_charts(profile)
            .into_iter()
            .map(|chart| ChartValues {
                chart,
                values: values::chart_values(profile, chart),
            })
            .collect();
        Ok(Artifact::HelmValues(charts))
    }

    fn generate(&self, ctx: &DeployContext, profile_name: &str, output_dir: Option<&Path>) -> Result<PathBuf> {
        let profile = load_filled_profile(ctx, profile_name)?;

        let k3s_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => ctx.render_dir(DeploymentBackend::K3s, profile_name),
        };
        std::fs::create_dir_all(&k3s_dir)?;

        let generated = write_values_files(&profile, &k3s_dir)?;
        for (chart, path) in &generated {
            tracing::info!(chart = chart.name(), path = %path.display(), "generated values file");
        }
        Ok(k3s_dir)
    }

    fn apply(&self, ctx: &DeployContext, profile_name: &str) -> Result<()> {
        let store = ProfileStore::new(&ctx.base_dir);
        let profile = store.load(profile_name)?;
        let namespace = profile.k3s_namespace.clone();

        check_prerequisites_gate(ctx)?;

        if !cluster::ensure_namespace(&ctx.runner, &namespace) {
            return Err(DeployError::external(
                "NAMESPACE_CREATION_FAILED",
                format!("Failed to create namespace '{namespace}'"),
            ));
        }

        if profile.tls_mode == TlsMode::Acme {
            if profile.k3s_install_cert_manager && !cluster::install_cert_manager(&ctx.runner) {
                tracing::warn!("cert-manager installation failed");
            }
            // Reuse backed-up certificates to stay under issuer rate limits.
            cluster::restore_tls_certificates(&ctx.runner, &namespace, profile_name, &ctx.base_dir)?;
        }

        // Always regenerate so profile edits since the last apply take
        // effect.
        let k3s_dir = self.generate(ctx, profile_name, None)?;
        let values_dir = k3s_dir.join("values");
        let charts_root = charts_dir(&ctx.base_dir)?;

        tracing::info!(namespace = %namespace, "deploying charts");

        for chart in values::enabled_charts(&profile) {
            let chart_path = charts_root.join(chart.chart_dir());
            let values_path = values_dir.join(chart.values_file());

            if !chart_path.exists() {
                tracing::error!(chart = chart.name(), path = %chart_path.display(), "chart not found");
                continue;
            }
            if !values_path.exists() {
                tracing::warn!(chart = chart.name(), path = %values_path.display(), "values file not found");
                continue;
            }

            let release = chart.release();
            let chart_arg = chart_path.display().to_string();
            let values_arg = values_path.display().to_string();

            tracing::info!(release = %release, "installing/upgrading chart");
            let result = ctx.runner.run(
                &[
                    "helm",
                    "upgrade",
                    "--install",
                    release.as_str(),
                    chart_arg.as_str(),
                    "--namespace",
                    namespace.as_str(),
                    "--values",
                    values_arg.as_str(),
                    "--wait",
                    "--timeout",
                    "10m",
                ],
                &RunOptions::capture_with_timeout(Duration::from_secs(600)),
            );

            // Chart failures are isolated; the remaining charts still get
            // their chance.
            match result {
                Ok(out) if out.success() => {
                    tracing::info!(release = %release, "chart deployed");
                }
                Ok(out) => {
                    tracing::error!(release = %release, stderr = %out.stderr.trim(), "chart deployment failed");
                }
                Err(err) => {
                    tracing::error!(release = %release, %err, "chart deployment failed");
                }
            }
        }

        if profile.monitoring_enabled && !cluster::install_monitoring(&ctx.runner) {
            tracing::warn!("monitoring installation failed");
        }

        tracing::info!(domain = %profile.domain, "deployment complete");
        Ok(())
    }

    fn destroy(&self, ctx: &DeployContext, profile_name: &str, opts: &DestroyOptions) -> Result<()> {
        let store = ProfileStore::new(&ctx.base_dir);
        let profile = store.load(profile_name)?;
        let namespace = profile.k3s_namespace.clone();

        check_prerequisites_gate(ctx)?;

        if profile.tls_mode == TlsMode::Acme {
            tracing::info!("backing up TLS certificates");
            cluster::backup_tls_certificates(&ctx.runner, &namespace, profile_name, &ctx.base_dir)?;
        }

        tracing::info!(namespace = %namespace, "removing deployment");

        if profile.monitoring_enabled {
            cluster::uninstall_monitoring(&ctx.runner);
        }

        for chart in ChartKind::ALL {
            let release = chart.release();
            let result = ctx.runner.run(
                &["helm", "uninstall", release.as_str(), "--namespace", namespace.as_str()],
                &RunOptions::capture_with_timeout(Duration::from_secs(120)),
            );
            match result {
                Ok(out) if out.success() => tracing::info!(release = %release, "uninstalled"),
                Ok(_) => {}
                Err(err) => tracing::warn!(release = %release, %err, "uninstall failed"),
            }
        }

        if opts.remove_volumes {
            tracing::info!("removing PVCs");
            let result = ctx.runner.run(
                &["kubectl", "delete", "pvc", "--all", "--namespace", namespace.as_str()],
                &RunOptions::capture_with_timeout(Duration::from_secs(120)),
            );
            match result {
                Ok(out) if out.success() => tracing::info!("PVCs removed"),
                Ok(out) => tracing::warn!(stderr = %out.stderr.trim(), "PVC removal failed"),
                Err(err) => tracing::warn!(%err, "PVC removal failed"),
            }
        }

        if opts.remove_files {
            let k3s_dir = ctx.render_dir(DeploymentBackend::K3s, profile_name);
            if k3s_dir.exists() {
                std::fs::remove_dir_all(&k3s_dir)?;
                tracing::info!(dir = %k3s_dir.display(), "removed generated files");
            }
        }

        Ok(())
    }

    fn status(&self, ctx: &DeployContext, profile_name: &str) -> Result<Vec<ServiceStatus>> {
        let store = ProfileStore::new(&ctx.base_dir);
        let profile = store.load(profile_name)?;
        let namespace = profile.k3s_namespace.as_str();

        check_prerequisites_gate(ctx)?;

        let mut services = Vec::new();

        let releases = ctx.runner.run(
            &["helm", "list", "--namespace", namespace, "--output", "json"],
            &RunOptions::capture_with_timeout(Duration::from_secs(30)),
        )?;
        if releases.success() && !releases.stdout.trim().is_empty() {
            let parsed: serde_json::Value = serde_json::from_str(&releases.stdout)?;
            if let Some(items) = parsed.as_array() {
                for release in items {
                    let name = release.get("name").and_then(|v| v.as_str()).unwrap_or("unknown");
                    let status = release.get("status").and_then(|v| v.as_str()).unwrap_or("unknown");
                    let chart = release.get("chart").and_then(|v| v.as_str()).unwrap_or("unknown");
                    services.push(ServiceStatus {
                        name: name.to_string(),
                        status: status.to_string(),
                        detail: Some(chart.to_string()),
                    });
                }
            }
        }

        let pods = ctx.runner.run(
            &["kubectl", "get", "pods", "--namespace", namespace, "-o", "json"],
            &RunOptions::capture_with_timeout(Duration::from_secs(30)),
        )?;
        if pods.success() && !pods.stdout.trim().is_empty() {
            let parsed: serde_json::Value = serde_json::from_str(&pods.stdout)?;
            for pod in parsed.get("items").and_then(|i| i.as_array()).into_iter().flatten() {
                let metadata = pod.get("metadata");
                let pod_name = metadata
                    .and_then(|m| m.get("name"))
                    .and_then(|n| n.as_str())
                    .unwrap_or("unknown");
                let status = pod.get("status");
                let phase = status
                    .and_then(|s| s.get("phase"))
                    .and_then(|p| p.as_str())
                    .unwrap_or("unknown");

                services.push(ServiceStatus {
                    name: format!("pod/{pod_name}"),
                    status: phase.to_string(),
                    detail: pod_detail(pod),
                });
            }
        }

        Ok(services)
    }

    fn logs(
        &self,
        ctx: &DeployContext,
        profile_name: &str,
        service: Option<&str>,
        opts: &LogOptions,
    ) -> Result<()> {
        let store = ProfileStore::new(&ctx.base_dir);
        let profile = store.load(profile_name)?;
        let namespace = profile.k3s_namespace.as_str();

        check_prerequisites_gate(ctx)?;

        let Some(service) = service else {
            return Err(DeployError::external(
                "SERVICE_REQUIRED",
                "Service/pod name is required for k3s logs",
            ));
        };

        let tail = opts.tail.to_string();
        let mut argv = vec!["kubectl", "logs", "--namespace", namespace, "--tail", tail.as_str()];
        if opts.follow {
            argv.push("-f");
        }

        // A plain name is matched by chart label; pod/... and
        // deployment/... pass through untouched.
        let selector = format!("app.kubernetes.io/name={service}");
        if service.contains('/') {
            argv.push(service);
        } else {
            argv.push("-l");
            argv.push(selector.as_str());
        }

        let result = ctx.runner.run(&argv, &RunOptions::inherit())?;
        if !result.success() {
            return Err(DeployError::external(
                "LOGS_FAILED",
                format!("kubectl logs exited with code {}", result.status),
            ));
        }
        Ok(())
    }
}

/// Container-level detail beyond the pod phase: waiting/terminated reasons,
/// init-container pulls, pending deletion.
fn pod_detail(pod: &serde_json::Value) -> Option<String> {
    let status = pod.get("status")?;

    if pod
        .get("metadata")
        .and_then(|m| m.get("deletionTimestamp"))
        .is_some()
    {
        return Some("Terminating".to_string());
    }

    for cs in status
        .get("containerStatuses")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
    {
        let Some(state) = cs.get("state") else { continue };
        if let Some(waiting) = state.get("waiting") {
            let reason = waiting.get("reason").and_then(|r| r.as_str()).unwrap_or("Waiting");
            return Some(reason.to_string());
        }
        if let Some(terminated) = state.get("terminated") {
            let reason = terminated.get("reason").and_then(|r| r.as_str()).unwrap_or("Terminated");
            return Some(reason.to_string());
        }
    }

    for cs in status
        .get("initContainerStatuses")
        .and_then(|c| c.as_array())
        .into_iter()
        .flatten()
    {
        if let Some(waiting) = cs.get("state").and_then(|s| s.get("waiting")) {
            let reason = waiting.get("reason").and_then(|r| r.as_str()).unwrap_or("Waiting");
            return Some(format!("Init:{reason}"));
        }
    }

    None
}
