//! mkcert integration for local TLS certificates.

use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::runner::{CommandRunner, RunOptions};

/// Generate certificates for a domain using mkcert.
///
/// Returns the (cert, key) paths on success.
pub fn generate_certs(runner: &CommandRunner, domain: &str, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(output_dir)?;
    let cert_path = output_dir.join(format!("{domain}.pem"));
    let key_path = output_dir.join(format!("{domain}-key.pem"));

    let cert_arg = cert_path.display().to_string();
    let key_arg = key_path.display().to_string();
    let wildcard = format!("*.{domain}");

    let mut argv = vec!["mkcert", "-cert-file", cert_arg.as_str(), "-key-file", key_arg.as_str(), domain];
    if domain != "localhost" {
        argv.push(wildcard.as_str());
    }

    match runner.run(&argv, &RunOptions::capture()) {
        Ok(output) if output.success() => Ok((cert_path, key_path)),
        Ok(output) => Err(DeployError::external(
            "MKCERT_FAILED",
            format!("mkcert failed: {}", output.stderr.trim()),
        )),
        Err(DeployError::PrerequisiteMissing(_)) => Err(DeployError::PrerequisiteMissing(
            "mkcert is not installed. Please install it: https://github.com/FiloSottile/mkcert".to_string(),
        )),
        Err(err) => Err(err),
    }
}
