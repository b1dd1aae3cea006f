//! Error taxonomy shared by the core and the CLI.
//!
//! Every error renders as `CODE: sentence` so callers can surface a stable
//! short code next to a human-readable message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Profile fails a structural validation rule. Never retried: the input
    /// must be fixed before re-attempting.
    #[error("CONFIG_INVALID: {0}")]
    ConfigInvalid(String),

    /// Load requested for a profile file that does not exist.
    #[error("PROFILE_NOT_FOUND: {0}")]
    ProfileNotFound(String),

    /// Copy/create would overwrite an existing profile.
    #[error("PROFILE_EXISTS: {0}")]
    ProfileExists(String),

    /// Operation requested against a backend that does not implement it.
    #[error("UNSUPPORTED_BACKEND: {0}")]
    UnsupportedBackend(String),

    /// Required binary absent or cluster unreachable, detected before any
    /// mutating call is attempted.
    #[error("PREREQUISITES_MISSING: {0}")]
    PrerequisiteMissing(String),

    /// Non-zero exit or timeout from an external tool. The code keeps the
    /// operation-specific identifier (APPLY_FAILED, DESTROY_FAILED, ...).
    #[error("{code}: {message}")]
    ExternalTool { code: &'static str, message: String },

    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("PROFILE_SERIALIZATION_FAILED: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ARTIFACT_SERIALIZATION_FAILED: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Convenience constructor for external tool failures.
    pub fn external(code: &'static str, message: impl Into<String>) -> Self {
        DeployError::ExternalTool {
            code,
            message: message.into(),
        }
    }

    /// The short error code, without the message.
    pub fn code(&self) -> &str {
        match self {
            DeployError::ConfigInvalid(_) => "CONFIG_INVALID",
            DeployError::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            DeployError::ProfileExists(_) => "PROFILE_EXISTS",
            DeployError::UnsupportedBackend(_) => "UNSUPPORTED_BACKEND",
            DeployError::PrerequisiteMissing(_) => "PREREQUISITES_MISSING",
            DeployError::ExternalTool { code, .. } => code,
            DeployError::Io(_) => "IO_ERROR",
            DeployError::Json(_) => "PROFILE_SERIALIZATION_FAILED",
            DeployError::Yaml(_) => "ARTIFACT_SERIALIZATION_FAILED",
        }
    }

    /// The human-readable sentence, without the code prefix.
    pub fn message(&self) -> String {
        match self {
            DeployError::ConfigInvalid(msg)
            | DeployError::ProfileNotFound(msg)
            | DeployError::ProfileExists(msg)
            | DeployError::UnsupportedBackend(msg)
            | DeployError::PrerequisiteMissing(msg) => msg.clone(),
            DeployError::ExternalTool { message, .. } => message.clone(),
            DeployError::Io(err) => err.to_string(),
            DeployError::Json(err) => err.to_string(),
            DeployError::Yaml(err) => err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = DeployError::ConfigInvalid("bad profile".to_string());
        assert_eq!(err.to_string(), "CONFIG_INVALID: bad profile");
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert_eq!(err.message(), "bad profile");
    }

    #[test]
    fn test_external_tool_keeps_operation_code() {
        let err = DeployError::external("APPLY_FAILED", "helm exited with 1");
        assert_eq!(err.code(), "APPLY_FAILED");
        assert_eq!(err.to_string(), "APPLY_FAILED: helm exited with 1");
    }
}
