//! ACME/Let's Encrypt TLS storage setup.

use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};

/// Create `acme.json` with the 600 permissions traefik requires.
pub fn setup_acme_storage(base_dir: &Path) -> Result<PathBuf> {
    let tls_dir = base_dir.join(".linto").join("tls");
    std::fs::create_dir_all(&tls_dir)?;

    let acme_path = tls_dir.join("acme.json");
    if !acme_path.exists() {
        std::fs::write(&acme_path, "")?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&acme_path, permissions).map_err(|err| {
            DeployError::external(
                "ACME_SETUP_FAILED",
                format!("Failed to set permissions on acme.json: {err}"),
            )
        })?;
    }

    Ok(acme_path)
}

/// Sanity-check an ACME configuration before first use.
pub fn validate_acme_config(email: &str, domain: &str) -> Result<()> {
    if !email.contains('@') || !email.split('@').next_back().is_some_and(|d| d.contains('.')) {
        return Err(DeployError::external(
            "INVALID_ACME_EMAIL",
            format!("Invalid email address for ACME: {email}"),
        ));
    }
    if domain == "localhost" {
        return Err(DeployError::external(
            "INVALID_ACME_DOMAIN",
            "ACME/Let's Encrypt cannot be used with localhost. Use a real domain or mkcert.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acme_rejects_localhost() {
        assert!(validate_acme_config("ops@example.com", "localhost").is_err());
        assert!(validate_acme_config("ops@example.com", "example.com").is_ok());
    }

    #[test]
    fn test_acme_rejects_bad_email() {
        assert!(validate_acme_config("not-an-email", "example.com").is_err());
    }
}
