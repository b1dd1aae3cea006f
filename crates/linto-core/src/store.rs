//! Profile store: one JSON document per profile under `.linto/profiles/`.
//!
//! Profiles are fully re-validated on every load, so a file that no longer
//! satisfies the current rules fails with `CONFIG_INVALID`, distinguishable
//! from a missing file (`PROFILE_NOT_FOUND`).

use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::model::ProfileConfig;

#[derive(Debug, Clone)]
pub struct ProfileStore {
    base_dir: PathBuf,
}

/// Summary row for the profile list view.
#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub name: String,
    pub backend: String,
    pub domain: String,
    pub services: String,
}

impl ProfileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ProfileStore {
            base_dir: base_dir.into(),
        }
    }

    /// Store rooted at the current working directory.
    pub fn from_cwd() -> Result<Self> {
        Ok(ProfileStore::new(std::env::current_dir()?))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.base_dir.join(".linto").join("profiles")
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(format!("{name}.json"))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    pub fn load(&self, name: &str) -> Result<ProfileConfig> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(DeployError::ProfileNotFound(format!(
                "Profile '{}' not found at {}",
                name,
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(&path)?;
        let profile: ProfileConfig = serde_json::from_str(&raw).map_err(|err| {
            DeployError::ConfigInvalid(format!("Profile '{name}' is not a valid profile document: {err}"))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn save(&self, profile: &ProfileConfig) -> Result<PathBuf> {
        profile.validate()?;
        let dir = self.profiles_dir();
        std::fs::create_dir_all(&dir)?;
        let path = self.path_for(&profile.name);
        let content = serde_json::to_string_pretty(profile)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// All loadable profiles, sorted by name. Invalid files are skipped.
    pub fn list(&self) -> Result<Vec<ProfileConfig>> {
        let dir = self.profiles_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut profiles = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(stem) {
                Ok(profile) => profiles.push(profile),
                Err(err) => {
                    tracing::warn!(profile = stem, %err, "skipping unreadable profile");
                }
            }
        }
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(DeployError::ProfileNotFound(format!("Profile '{name}' not found")));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Copy a profile to a new name. The source must exist and the
    /// destination must not.
    pub fn copy(&self, src: &str, dst: &str) -> Result<PathBuf> {
        let source = self.load(src)?;
        if self.exists(dst) {
            return Err(DeployError::ProfileExists(format!("Profile '{dst}' already exists")));
        }
        let mut copy = source;
        copy.name = dst.to_string();
        self.save(&copy)
    }

    pub fn summary(profile: &ProfileConfig) -> ProfileSummary {
        let services = profile.enabled_services();
        ProfileSummary {
            name: profile.name.clone(),
            backend: profile.backend.as_str().to_string(),
            domain: profile.domain.clone(),
            services: if services.is_empty() {
                "none".to_string()
            } else {
                services.join(", ")
            },
        }
    }
}
