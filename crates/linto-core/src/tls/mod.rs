//! TLS provisioning helpers.
//!
//! The core only needs the profile's TLS mode to emit the right labels and
//! volumes; these helpers perform the filesystem side effects that the
//! compose and swarm generators rely on (local certs, ACME storage,
//! imported custom certs).

pub mod acme;
pub mod custom;
pub mod mkcert;

use std::path::Path;

use crate::error::Result;
use crate::model::{ProfileConfig, TlsMode};
use crate::render::convert::traefik_dynamic_config;
use crate::runner::CommandRunner;

/// Write the traefik dynamic file-provider config pointing at the certs
/// mounted under `/certs`.
fn write_dynamic_config(base_dir: &Path, domain: &str) -> Result<()> {
    let dynamic_dir = base_dir.join(".linto").join("traefik").join("dynamic");
    std::fs::create_dir_all(&dynamic_dir)?;
    let config = traefik_dynamic_config(domain);
    let content = serde_yaml::to_string(&config)?;
    std::fs::write(dynamic_dir.join("tls.yml"), content)?;
    Ok(())
}

/// Perform the TLS side effects for a compose/swarm generate pass.
pub fn prepare(runner: &CommandRunner, base_dir: &Path, profile: &ProfileConfig) -> Result<()> {
    match profile.tls_mode {
        TlsMode::Off => Ok(()),
        TlsMode::Mkcert => {
            let certs_dir = base_dir.join(".linto").join("tls").join("certs");
            mkcert::generate_certs(runner, &profile.domain, &certs_dir)?;
            tracing::info!(dir = %certs_dir.display(), "generated TLS certificates");
            write_dynamic_config(base_dir, &profile.domain)
        }
        TlsMode::Acme => {
            acme::setup_acme_storage(base_dir)?;
            tracing::info!("prepared ACME storage for Let's Encrypt");
            Ok(())
        }
        TlsMode::Custom => {
            let (cert, key) = match (&profile.custom_cert_path, &profile.custom_key_path) {
                (Some(cert), Some(key)) => (cert, key),
                // Validation guarantees both paths; nothing to import otherwise.
                _ => return Ok(()),
            };
            custom::import_custom_certs(Path::new(cert), Path::new(key), &profile.domain, base_dir)?;
            tracing::info!("imported custom TLS certificates");
            write_dynamic_config(base_dir, &profile.domain)
        }
    }
}
