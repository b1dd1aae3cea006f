//! Profile configuration model.
//!
//! `ProfileConfig` is the single source of truth for a deployment intent.
//! It is constructed from the wizard or a profile file and validated
//! exhaustively before anything downstream may observe it: per-field format
//! rules first, then a fixed-order list of cross-field invariants, each with
//! a stable message.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};

/// Deployment backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentBackend {
    #[default]
    Compose,
    Swarm,
    K3s,
}

impl DeploymentBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentBackend::Compose => "compose",
            DeploymentBackend::Swarm => "swarm",
            DeploymentBackend::K3s => "k3s",
        }
    }
}

/// TLS mode for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TlsMode {
    Off,
    #[default]
    Mkcert,
    Acme,
    Custom,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::Off => "off",
            TlsMode::Mkcert => "mkcert",
            TlsMode::Acme => "acme",
            TlsMode::Custom => "custom",
        }
    }

    pub fn enabled(&self) -> bool {
        *self != TlsMode::Off
    }

    /// URL scheme for externally reachable endpoints.
    pub fn scheme(&self) -> &'static str {
        if self.enabled() { "https" } else { "http" }
    }
}

/// Streaming STT model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamingSttVariant {
    Whisper,
    KaldiFrench,
    NemoFrench,
    NemoEnglish,
    Kyutai,
}

impl StreamingSttVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamingSttVariant::Whisper => "whisper",
            StreamingSttVariant::KaldiFrench => "kaldi-french",
            StreamingSttVariant::NemoFrench => "nemo-french",
            StreamingSttVariant::NemoEnglish => "nemo-english",
            StreamingSttVariant::Kyutai => "kyutai",
        }
    }

    pub const ALL: [StreamingSttVariant; 5] = [
        StreamingSttVariant::Whisper,
        StreamingSttVariant::KaldiFrench,
        StreamingSttVariant::NemoFrench,
        StreamingSttVariant::NemoEnglish,
        StreamingSttVariant::Kyutai,
    ];
}

/// GPU architecture for the Kyutai streaming model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GpuArchitecture {
    /// H100
    Hopper,
    /// RTX 40xx
    Ada,
    /// RTX 30xx, A100
    Ampere,
}

impl GpuArchitecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpuArchitecture::Hopper => "hopper",
            GpuArchitecture::Ada => "ada",
            GpuArchitecture::Ampere => "ampere",
        }
    }
}

/// GPU sharing mode for Kubernetes deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GpuMode {
    #[default]
    None,
    /// 1 GPU per pod.
    Exclusive,
    /// Share GPUs via time-slicing. Older profiles spelled this
    /// "timeslicing"; both parse to the same variant.
    #[serde(alias = "timeslicing")]
    TimeSlicing,
}

impl GpuMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpuMode::None => "none",
            GpuMode::Exclusive => "exclusive",
            GpuMode::TimeSlicing => "time-slicing",
        }
    }

    pub fn enabled(&self) -> bool {
        *self != GpuMode::None
    }
}

/// Configuration for a deployment profile.
///
/// Persisted as one JSON document per profile and fully re-validated on
/// every load. Mutation after construction only happens through the secret
/// provider filling null secret fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileConfig {
    pub name: String,
    pub domain: String,

    /// Embedded kubeconfig for cluster access (opaque to the core).
    pub kubeconfig: Option<serde_json::Value>,
    pub image_tag: String,
    /// Individual service tags (override `image_tag` for specific services).
    pub service_tags: IndexMap<String, String>,
    pub tls_mode: TlsMode,

    pub backend: DeploymentBackend,

    pub gpu_mode: GpuMode,

    // Service toggles
    pub studio_enabled: bool,
    pub stt_enabled: bool,

    // STT settings
    pub security_level: String,

    // Live session
    pub live_session_enabled: bool,
    pub streaming_stt_variants: Vec<StreamingSttVariant>,
    pub kyutai_gpu_architecture: Option<GpuArchitecture>,
    pub session_transcriber_replicas: u32,

    // LLM
    pub llm_enabled: bool,
    pub openai_api_base: Option<String>,
    pub openai_api_token: Option<String>,
    pub vllm_enabled: bool,

    // ACME TLS
    pub acme_email: Option<String>,

    // Custom TLS certs
    pub custom_cert_path: Option<String>,
    pub custom_key_path: Option<String>,

    // Secrets (filled by the secret provider when unset)
    pub redis_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub jwt_refresh_secret: Option<String>,
    pub super_admin_email: String,
    pub super_admin_password: Option<String>,

    // Session secrets
    pub session_postgres_password: Option<String>,
    pub session_crypt_key: Option<String>,

    // LLM secrets
    pub llm_postgres_password: Option<String>,
    pub llm_redis_password: Option<String>,
    pub llm_encryption_key: Option<String>,
    pub llm_admin_username: String,
    pub llm_admin_password: Option<String>,

    // K3s-specific settings
    pub k3s_namespace: String,
    pub k3s_storage_class: Option<String>,
    pub k3s_install_cert_manager: bool,
    pub k3s_tls_secret_name: String,
    pub k3s_database_host_path: Option<String>,
    pub k3s_files_host_path: Option<String>,
    pub k3s_database_node_selector: Option<IndexMap<String, String>>,
    /// Node label for database placement, used when no explicit selector is
    /// given.
    pub k3s_database_node_role: Option<String>,

    // GPU settings (for multi-GPU setups)
    pub gpu_count: u32,
    /// For time-slicing mode.
    pub gpu_slices_per_gpu: u32,

    /// Prometheus + Grafana stack.
    pub monitoring_enabled: bool,

    // SMTP configuration
    pub smtp_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_secure: bool,
    pub smtp_require_tls: bool,
    pub smtp_auth: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_no_reply_email: Option<String>,

    // Google OIDC
    pub oidc_google_enabled: bool,
    pub oidc_google_client_id: Option<String>,
    pub oidc_google_client_secret: Option<String>,

    // GitHub OIDC
    pub oidc_github_enabled: bool,
    pub oidc_github_client_id: Option<String>,
    pub oidc_github_client_secret: Option<String>,

    // Native OIDC ("linagora" or "eu")
    pub oidc_native_type: Option<String>,
    pub oidc_native_client_id: Option<String>,
    pub oidc_native_client_secret: Option<String>,
    pub oidc_native_url: Option<String>,
    pub oidc_native_scope: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            name: "dev".to_string(),
            domain: "localhost".to_string(),
            kubeconfig: None,
            image_tag: "latest-unstable".to_string(),
            service_tags: IndexMap::new(),
            tls_mode: TlsMode::Mkcert,
            backend: DeploymentBackend::Compose,
            gpu_mode: GpuMode::None,
            studio_enabled: true,
            stt_enabled: true,
            security_level: "0".to_string(),
            live_session_enabled: false,
            streaming_stt_variants: Vec::new(),
            kyutai_gpu_architecture: None,
            session_transcriber_replicas: 2,
            llm_enabled: false,
            openai_api_base: None,
            openai_api_token: None,
            vllm_enabled: false,
            acme_email: None,
            custom_cert_path: None,
            custom_key_path: None,
            redis_password: None,
            jwt_secret: None,
            jwt_refresh_secret: None,
            super_admin_email: "admin@linto.local".to_string(),
            super_admin_password: None,
            session_postgres_password: None,
            session_crypt_key: None,
            llm_postgres_password: None,
            llm_redis_password: None,
            llm_encryption_key: None,
            llm_admin_username: "admin".to_string(),
            llm_admin_password: None,
            k3s_namespace: "linto".to_string(),
            k3s_storage_class: None,
            k3s_install_cert_manager: false,
            k3s_tls_secret_name: "linto-tls".to_string(),
            k3s_database_host_path: None,
            k3s_files_host_path: None,
            k3s_database_node_selector: None,
            k3s_database_node_role: None,
            gpu_count: 1,
            gpu_slices_per_gpu: 4,
            monitoring_enabled: false,
            smtp_enabled: false,
            smtp_host: None,
            smtp_port: 465,
            smtp_secure: true,
            smtp_require_tls: true,
            smtp_auth: None,
            smtp_password: None,
            smtp_no_reply_email: None,
            oidc_google_enabled: false,
            oidc_google_client_id: None,
            oidc_google_client_secret: None,
            oidc_github_enabled: false,
            oidc_github_client_id: None,
            oidc_github_client_secret: None,
            oidc_native_type: None,
            oidc_native_client_id: None,
            oidc_native_client_secret: None,
            oidc_native_url: None,
            oidc_native_scope: "openid,email,profile".to_string(),
        }
    }
}

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*$").expect("valid regex"));

// RFC 952/1123 compliant hostname.
static HOSTNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid regex")
});

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex"));

/// A single cross-field invariant. Checks run in declaration order and the
/// first failing one wins, so error messages are stable.
type Check = fn(&ProfileConfig) -> Result<()>;

const CROSS_FIELD_CHECKS: &[Check] = &[
    check_at_least_one_service,
    check_kyutai_architecture,
    check_acme_email,
    check_custom_tls_paths,
    check_smtp_host,
    check_smtp_auth,
    check_smtp_no_reply,
    check_google_client_id,
    check_google_client_secret,
    check_github_client_id,
    check_github_client_secret,
    check_native_type_known,
    check_native_client_id,
    check_native_client_secret,
    check_native_url,
];

fn invalid(msg: &str) -> DeployError {
    DeployError::ConfigInvalid(msg.to_string())
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

fn check_at_least_one_service(p: &ProfileConfig) -> Result<()> {
    if !p.studio_enabled && !p.stt_enabled && !p.live_session_enabled && !p.llm_enabled {
        return Err(invalid(
            "At least one service must be enabled (Studio, STT, Live Session, or LLM)",
        ));
    }
    Ok(())
}

fn check_kyutai_architecture(p: &ProfileConfig) -> Result<()> {
    if p.live_session_enabled
        && p.streaming_stt_variants.contains(&StreamingSttVariant::Kyutai)
        && p.kyutai_gpu_architecture.is_none()
    {
        return Err(invalid(
            "Kyutai streaming STT requires kyutai_gpu_architecture to be set",
        ));
    }
    Ok(())
}

fn check_acme_email(p: &ProfileConfig) -> Result<()> {
    if p.tls_mode == TlsMode::Acme && is_unset(&p.acme_email) {
        return Err(invalid("ACME TLS mode requires acme_email"));
    }
    Ok(())
}

fn check_custom_tls_paths(p: &ProfileConfig) -> Result<()> {
    if p.tls_mode == TlsMode::Custom && (is_unset(&p.custom_cert_path) || is_unset(&p.custom_key_path)) {
        return Err(invalid(
            "Custom TLS mode requires custom_cert_path and custom_key_path",
        ));
    }
    Ok(())
}

fn check_smtp_host(p: &ProfileConfig) -> Result<()> {
    if p.smtp_enabled && is_unset(&p.smtp_host) {
        return Err(invalid("SMTP host is required when SMTP is enabled"));
    }
    Ok(())
}

fn check_smtp_auth(p: &ProfileConfig) -> Result<()> {
    if p.smtp_enabled && is_unset(&p.smtp_auth) {
        return Err(invalid("SMTP auth user is required when SMTP is enabled"));
    }
    Ok(())
}

fn check_smtp_no_reply(p: &ProfileConfig) -> Result<()> {
    if p.smtp_enabled && is_unset(&p.smtp_no_reply_email) {
        return Err(invalid("No-reply email is required when SMTP is enabled"));
    }
    Ok(())
}

fn check_google_client_id(p: &ProfileConfig) -> Result<()> {
    if p.oidc_google_enabled && is_unset(&p.oidc_google_client_id) {
        return Err(invalid("Google client ID is required when Google OIDC is enabled"));
    }
    Ok(())
}

fn check_google_client_secret(p: &ProfileConfig) -> Result<()> {
    if p.oidc_google_enabled && is_unset(&p.oidc_google_client_secret) {
        return Err(invalid(
            "Google client secret is required when Google OIDC is enabled",
        ));
    }
    Ok(())
}

fn check_github_client_id(p: &ProfileConfig) -> Result<()> {
    if p.oidc_github_enabled && is_unset(&p.oidc_github_client_id) {
        return Err(invalid("GitHub client ID is required when GitHub OIDC is enabled"));
    }
    Ok(())
}

fn check_github_client_secret(p: &ProfileConfig) -> Result<()> {
    if p.oidc_github_enabled && is_unset(&p.oidc_github_client_secret) {
        return Err(invalid(
            "GitHub client secret is required when GitHub OIDC is enabled",
        ));
    }
    Ok(())
}

fn check_native_type_known(p: &ProfileConfig) -> Result<()> {
    if let Some(native_type) = p.oidc_native_type.as_deref()
        && !native_type.is_empty()
        && native_type != "linagora"
        && native_type != "eu"
    {
        return Err(invalid("Native OIDC type must be 'linagora' or 'eu'"));
    }
    Ok(())
}

fn check_native_client_id(p: &ProfileConfig) -> Result<()> {
    if p.native_oidc_enabled() && is_unset(&p.oidc_native_client_id) {
        return Err(invalid("Native OIDC client ID is required when type is set"));
    }
    Ok(())
}

fn check_native_client_secret(p: &ProfileConfig) -> Result<()> {
    if p.native_oidc_enabled() && is_unset(&p.oidc_native_client_secret) {
        return Err(invalid("Native OIDC client secret is required when type is set"));
    }
    Ok(())
}

fn check_native_url(p: &ProfileConfig) -> Result<()> {
    if p.native_oidc_enabled() {
        if is_unset(&p.oidc_native_url) {
            return Err(invalid("Native OIDC URL is required when type is set"));
        }
        let raw = p.oidc_native_url.as_deref().unwrap_or_default();
        if url::Url::parse(raw).is_err() {
            return Err(invalid("Native OIDC URL is not a valid URL"));
        }
    }
    Ok(())
}

impl ProfileConfig {
    /// Validate the full profile: per-field formats, then cross-field
    /// invariants in a fixed order. The first failure is returned.
    pub fn validate(&self) -> Result<()> {
        self.validate_fields()?;
        for check in CROSS_FIELD_CHECKS {
            check(self)?;
        }
        Ok(())
    }

    fn validate_fields(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > 32 {
            return Err(invalid("Profile name must be between 1 and 32 characters"));
        }
        if !NAME_PATTERN.is_match(&self.name) {
            return Err(invalid("Profile name must be alphanumeric with optional hyphens"));
        }
        if self.domain != "localhost" && !HOSTNAME_PATTERN.is_match(&self.domain) {
            return Err(invalid("Invalid hostname format"));
        }
        if !EMAIL_PATTERN.is_match(&self.super_admin_email) {
            return Err(invalid("Invalid email format"));
        }
        if let Some(password) = self.super_admin_password.as_deref()
            && password.len() < 8
        {
            return Err(invalid("Password must be at least 8 characters"));
        }
        if self.session_transcriber_replicas < 1 {
            return Err(invalid("session_transcriber_replicas must be at least 1"));
        }
        if self.gpu_count < 1 {
            return Err(invalid("gpu_count must be at least 1"));
        }
        if self.gpu_slices_per_gpu < 1 {
            return Err(invalid("gpu_slices_per_gpu must be at least 1"));
        }
        Ok(())
    }

    /// Whether the native OIDC block is active (a non-empty type is set).
    pub fn native_oidc_enabled(&self) -> bool {
        self.oidc_native_type.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// OpenAI-compatible API base for the LLM gateway: the configured
    /// external base, or the local vLLM service when vLLM is enabled.
    pub fn resolved_openai_api_base(&self) -> String {
        match self.openai_api_base.as_deref() {
            Some(base) if !base.is_empty() => base.to_string(),
            _ if self.vllm_enabled => "http://vllm-service:8000/v1".to_string(),
            _ => String::new(),
        }
    }

    /// Names of the enabled feature blocks, for display.
    pub fn enabled_services(&self) -> Vec<&'static str> {
        let mut services = Vec::new();
        if self.studio_enabled {
            services.push("studio");
        }
        if self.stt_enabled {
            services.push("stt");
        }
        if self.live_session_enabled {
            services.push("live");
        }
        if self.llm_enabled {
            services.push("llm");
        }
        services
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studio_only() -> ProfileConfig {
        ProfileConfig {
            name: "test".to_string(),
            domain: "test.local".to_string(),
            tls_mode: TlsMode::Off,
            stt_enabled: false,
            ..ProfileConfig::default()
        }
    }

    #[test]
    fn test_default_profile_is_valid() {
        assert!(ProfileConfig::default().validate().is_ok());
    }

    #[test]
    fn test_name_rejects_leading_hyphen() {
        let profile = ProfileConfig {
            name: "-bad".to_string(),
            ..studio_only()
        };
        let err = profile.validate().unwrap_err();
        assert_eq!(err.message(), "Profile name must be alphanumeric with optional hyphens");
    }

    #[test]
    fn test_domain_rejects_invalid_hostname() {
        let profile = ProfileConfig {
            domain: "bad_host!".to_string(),
            ..studio_only()
        };
        let err = profile.validate().unwrap_err();
        assert_eq!(err.message(), "Invalid hostname format");
    }

    #[test]
    fn test_short_admin_password_rejected() {
        let profile = ProfileConfig {
            super_admin_password: Some("short".to_string()),
            ..studio_only()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_gpu_mode_timeslicing_alias() {
        let mode: GpuMode = serde_json::from_str("\"timeslicing\"").unwrap();
        assert_eq!(mode, GpuMode::TimeSlicing);
        let mode: GpuMode = serde_json::from_str("\"time-slicing\"").unwrap();
        assert_eq!(mode, GpuMode::TimeSlicing);
    }

    #[test]
    fn test_resolved_openai_api_base() {
        let mut profile = studio_only();
        profile.llm_enabled = true;
        assert_eq!(profile.resolved_openai_api_base(), "");
        profile.vllm_enabled = true;
        assert_eq!(profile.resolved_openai_api_base(), "http://vllm-service:8000/v1");
        profile.openai_api_base = Some("https://api.openai.com/v1".to_string());
        assert_eq!(profile.resolved_openai_api_base(), "https://api.openai.com/v1");
    }
}
