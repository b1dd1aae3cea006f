//! Cluster-level kubectl/helm plumbing for the k3s backend: prerequisite
//! checks, namespace management, cert-manager, the monitoring stack, and
//! TLS secret backup/restore.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::runner::{CommandRunner, RunOptions};

pub const MONITORING_NAMESPACE: &str = "monitoring";

fn capture(seconds: u64) -> RunOptions {
    RunOptions::capture_with_timeout(Duration::from_secs(seconds))
}

/// Check for required tools and cluster reachability. Returns the list of
/// missing prerequisites, empty when everything is present.
pub fn check_prerequisites(runner: &CommandRunner) -> Vec<String> {
    let mut missing = Vec::new();

    match runner.run(&["kubectl", "version", "--client", "--output=json"], &capture(10)) {
        Ok(out) if out.success() => {}
        Ok(_) => missing.push("kubectl not properly configured".to_string()),
        Err(_) => missing.push("kubectl not found".to_string()),
    }

    match runner.run(&["helm", "version", "--short"], &capture(10)) {
        Ok(out) if out.success() => {}
        Ok(_) => missing.push("helm not properly configured".to_string()),
        Err(_) => missing.push("helm not found".to_string()),
    }

    match runner.run(&["kubectl", "cluster-info"], &capture(15)) {
        Ok(out) if out.success() => {}
        Ok(_) => missing.push("Kubernetes cluster not accessible".to_string()),
        Err(_) => missing.push("Cannot connect to Kubernetes cluster".to_string()),
    }

    missing
}

/// Ensure the namespace exists, creating it if absent.
pub fn ensure_namespace(runner: &CommandRunner, namespace: &str) -> bool {
    let exists = runner.run(&["kubectl", "get", "namespace", namespace], &capture(10));
    if matches!(exists, Ok(out) if out.success()) {
        return true;
    }
    runner
        .run(&["kubectl", "create", "namespace", namespace], &capture(10))
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Install cert-manager for ACME TLS support. Idempotent: a present
/// cert-manager namespace short-circuits.
pub fn install_cert_manager(runner: &CommandRunner) -> bool {
    let present = runner.run(&["kubectl", "get", "namespace", "cert-manager"], &capture(10));
    if matches!(present, Ok(out) if out.success()) {
        tracing::debug!("cert-manager already installed");
        return true;
    }

    tracing::info!("installing cert-manager");
    let _ = runner.run(
        &["helm", "repo", "add", "jetstack", "https://charts.jetstack.io"],
        &capture(30),
    );
    let _ = runner.run(&["helm", "repo", "update"], &capture(60));

    match runner.run(
        &[
            "helm",
            "install",
            "cert-manager",
            "jetstack/cert-manager",
            "--namespace",
            "cert-manager",
            "--create-namespace",
            "--set",
            "installCRDs=true",
            "--wait",
            "--timeout",
            "5m",
        ],
        &capture(300),
    ) {
        Ok(out) if out.success() => {
            tracing::info!("cert-manager installed");
            true
        }
        Ok(out) => {
            tracing::warn!(stderr = %out.stderr.trim(), "failed to install cert-manager");
            false
        }
        Err(err) => {
            tracing::warn!(%err, "failed to install cert-manager");
            false
        }
    }
}

/// Install the NVIDIA DCGM exporter for GPU metrics. Skipped when the
/// cluster has no GPU nodes.
fn install_dcgm_exporter(runner: &CommandRunner) -> bool {
    let gpu_nodes = runner.run(
        &["kubectl", "get", "nodes", "-l", "nvidia.com/gpu=true", "-o", "name"],
        &capture(10),
    );
    match gpu_nodes {
        Ok(out) if out.success() && !out.stdout.trim().is_empty() => {}
        _ => {
            tracing::debug!("no GPU nodes found, skipping DCGM exporter");
            return true;
        }
    }

    tracing::info!("installing NVIDIA DCGM exporter for GPU metrics");
    let _ = runner.run(
        &[
            "helm",
            "repo",
            "add",
            "gpu-helm-charts",
            "https://nvidia.github.io/dcgm-exporter/helm-charts",
        ],
        &capture(30),
    );

    let result = runner.run(
        &[
            "helm",
            "upgrade",
            "--install",
            "dcgm-exporter",
            "gpu-helm-charts/dcgm-exporter",
            "--namespace",
            MONITORING_NAMESPACE,
            "--set",
            "serviceMonitor.enabled=true",
            "--set",
            "serviceMonitor.interval=15s",
            "--set",
            "serviceMonitor.additionalLabels.release=prometheus",
            "--set",
            "nodeSelector.nvidia\\.com/gpu=true",
        ],
        &capture(300),
    );
    match result {
        Ok(out) if out.success() => {
            tracing::info!("DCGM exporter installed");
            true
        }
        Ok(out) => {
            tracing::warn!(stderr = %out.stderr.trim(), "DCGM exporter installation failed");
            false
        }
        Err(err) => {
            tracing::warn!(%err, "DCGM exporter installation skipped");
            false
        }
    }
}

/// Install kube-prometheus-stack in its own namespace, plus the DCGM
/// exporter when GPU nodes are present.
pub fn install_monitoring(runner: &CommandRunner) -> bool {
    let present = runner.run(
        &["kubectl", "get", "svc", "prometheus-grafana", "-n", MONITORING_NAMESPACE],
        &capture(10),
    );
    if matches!(present, Ok(out) if out.success()) {
        tracing::debug!("monitoring stack already installed");
        install_dcgm_exporter(runner);
        return true;
    }

    tracing::info!(namespace = MONITORING_NAMESPACE, "installing monitoring stack");
    let _ = runner.run(
        &[
            "helm",
            "repo",
            "add",
            "prometheus-community",
            "https://prometheus-community.github.io/helm-charts",
        ],
        &capture(30),
    );
    let _ = runner.run(&["helm", "repo", "update"], &capture(60));

    let result = runner.run(
        &[
            "helm",
            "upgrade",
            "--install",
            "prometheus",
            "prometheus-community/kube-prometheus-stack",
            "--namespace",
            MONITORING_NAMESPACE,
            "--create-namespace",
            "--set",
            "grafana.adminPassword=admin",
            "--set",
            "grafana.grafana\\.ini.auth\\.anonymous.enabled=true",
            "--set",
            "grafana.grafana\\.ini.auth\\.anonymous.org_role=Admin",
            "--set",
            "grafana.grafana\\.ini.auth.disable_login_form=true",
            "--wait",
            "--timeout",
            "10m",
        ],
        &capture(600),
    );
    match result {
        Ok(out) if out.success() => {
            tracing::info!("monitoring stack installed");
            install_dcgm_exporter(runner);
            true
        }
        Ok(out) => {
            tracing::warn!(stderr = %out.stderr.trim(), "failed to install monitoring stack");
            false
        }
        Err(err) => {
            tracing::warn!(%err, "failed to install monitoring stack");
            false
        }
    }
}

/// Uninstall the monitoring stack and the DCGM exporter.
pub fn uninstall_monitoring(runner: &CommandRunner) -> bool {
    let _ = runner.run(
        &["helm", "uninstall", "dcgm-exporter", "--namespace", MONITORING_NAMESPACE],
        &capture(60),
    );
    runner
        .run(
            &["helm", "uninstall", "prometheus", "--namespace", MONITORING_NAMESPACE],
            &capture(120),
        )
        .map(|out| out.success())
        .unwrap_or(false)
}

fn cert_backup_dir(base_dir: &Path, profile_name: &str) -> PathBuf {
    base_dir.join(".linto").join("certs").join(profile_name)
}

/// Backup cert-manager TLS secrets to local storage so a redeploy can
/// restore them instead of re-issuing and hitting Let's Encrypt rate
/// limits.
pub fn backup_tls_certificates(
    runner: &CommandRunner,
    namespace: &str,
    profile_name: &str,
    base_dir: &Path,
) -> Result<bool> {
    let backup_dir = cert_backup_dir(base_dir, profile_name);
    std::fs::create_dir_all(&backup_dir)?;

    let mut result = runner.run(
        &[
            "kubectl",
            "get",
            "secrets",
            "-n",
            namespace,
            "-l",
            "controller.cert-manager.io/fao=true",
            "-o",
            "json",
        ],
        &capture(30),
    )?;
    if !result.success() {
        // Fall back to any TLS-typed secrets.
        result = runner.run(
            &[
                "kubectl",
                "get",
                "secrets",
                "-n",
                namespace,
                "--field-selector",
                "type=kubernetes.io/tls",
                "-o",
                "json",
            ],
            &capture(30),
        )?;
    }

    if !result.success() {
        tracing::debug!("could not retrieve TLS certificates for backup");
        return Ok(true);
    }

    let secrets: serde_json::Value = serde_json::from_str(&result.stdout)?;
    let items = secrets.get("items").and_then(|i| i.as_array()).cloned().unwrap_or_default();
    if items.is_empty() {
        tracing::debug!("no TLS certificates found to backup");
        return Ok(true);
    }

    let secrets_file = backup_dir.join("tls-secrets.json");
    std::fs::write(&secrets_file, serde_json::to_string_pretty(&secrets)?)?;
    tracing::info!(count = items.len(), dir = %backup_dir.display(), "backed up TLS certificates");
    Ok(true)
}

/// Restore previously backed-up TLS secrets into the cluster.
pub fn restore_tls_certificates(
    runner: &CommandRunner,
    namespace: &str,
    profile_name: &str,
    base_dir: &Path,
) -> Result<bool> {
    let secrets_file = cert_backup_dir(base_dir, profile_name).join("tls-secrets.json");
    if !secrets_file.exists() {
        tracing::debug!("no certificate backup found, new certificates will be requested");
        return Ok(true);
    }

    let raw = std::fs::read_to_string(&secrets_file)?;
    let secrets: serde_json::Value = serde_json::from_str(&raw)?;
    let items = secrets.get("items").and_then(|i| i.as_array()).cloned().unwrap_or_default();
    if items.is_empty() {
        return Ok(true);
    }

    tracing::info!(count = items.len(), "restoring TLS certificates from backup");

    for mut secret in items {
        // Re-target the secret and drop server-assigned metadata so apply
        // recreates it cleanly.
        if let Some(metadata) = secret.get_mut("metadata").and_then(|m| m.as_object_mut()) {
            metadata.insert("namespace".to_string(), serde_json::Value::String(namespace.to_string()));
            metadata.remove("resourceVersion");
            metadata.remove("uid");
            metadata.remove("creationTimestamp");
        }

        let secret_name = secret
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or("unknown")
            .to_string();

        // kubectl reads the manifest from a temp file; piping stdin through
        // the runner would complicate the timeout handling for no gain.
        let manifest_path = cert_backup_dir(base_dir, profile_name).join(".restore.json");
        std::fs::write(&manifest_path, serde_json::to_string(&secret)?)?;
        let manifest_arg = manifest_path.display().to_string();

        let result = runner.run(&["kubectl", "apply", "-f", manifest_arg.as_str()], &capture(30))?;
        if result.success() {
            tracing::info!(secret = %secret_name, "restored certificate");
        } else {
            tracing::warn!(secret = %secret_name, stderr = %result.stderr.trim(), "could not restore certificate");
        }
        let _ = std::fs::remove_file(&manifest_path);
    }

    Ok(true)
}
