use linto_core::model::{
    DeploymentBackend, GpuArchitecture, GpuMode, ProfileConfig, StreamingSttVariant, TlsMode,
};
use linto_core::render::k3s::values::{
    database_tag, enabled_charts, live_values, llm_service_tag, llm_values, service_tag, stt_values,
    studio_values,
};
use linto_core::render::ChartKind;
use serde_yaml::Value;

fn k3s_profile() -> ProfileConfig {
    ProfileConfig {
        name: "test".to_string(),
        domain: "test.local".to_string(),
        backend: DeploymentBackend::K3s,
        tls_mode: TlsMode::Mkcert,
        stt_enabled: false,
        ..ProfileConfig::default()
    }
}

fn get<'a>(value: &'a Value, path: &[&str]) -> &'a Value {
    let mut current = value;
    for key in path {
        current = &current[*key];
    }
    current
}

fn as_str<'a>(value: &'a Value, path: &[&str]) -> &'a str {
    get(value, path).as_str().unwrap_or_else(|| panic!("missing string at {path:?}"))
}

#[test]
fn gpu_fanout_uses_replicas_per_gpu() {
    let profile = ProfileConfig {
        stt_enabled: true,
        gpu_mode: GpuMode::Exclusive,
        gpu_count: 3,
        ..k3s_profile()
    };
    let values = stt_values(&profile);

    let per_gpu = get(&values, &["whisperWorkers", "replicasPerGpu"]);
    let slots: Vec<u64> = per_gpu
        .as_sequence()
        .expect("replicasPerGpu should be a sequence")
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect();
    assert_eq!(slots, vec![1, 1, 1]);

    assert!(
        get(&values, &["whisperWorkers", "replicas"]).is_null(),
        "flat replicas must be absent in multi-GPU mode"
    );
    let diarization_per_gpu = get(&values, &["diarization", "replicasPerGpu"]);
    assert_eq!(diarization_per_gpu.as_sequence().unwrap().len(), 3);
}

#[test]
fn single_gpu_falls_back_to_flat_replicas() {
    let profile = ProfileConfig {
        stt_enabled: true,
        gpu_mode: GpuMode::Exclusive,
        gpu_count: 1,
        ..k3s_profile()
    };
    let values = stt_values(&profile);

    assert_eq!(get(&values, &["whisperWorkers", "replicas"]).as_u64(), Some(1));
    assert!(get(&values, &["whisperWorkers", "replicasPerGpu"]).is_null());
    assert_eq!(as_str(&values, &["whisperWorkers", "env", "DEVICE"]), "cuda");
}

#[test]
fn cpu_mode_uses_cpu_device() {
    let profile = ProfileConfig {
        stt_enabled: true,
        gpu_mode: GpuMode::None,
        ..k3s_profile()
    };
    let values = stt_values(&profile);
    assert_eq!(as_str(&values, &["whisperWorkers", "env", "DEVICE"]), "cpu");
    assert_eq!(as_str(&values, &["diarization", "env", "DEVICE"]), "cpu");
}

#[test]
fn smtp_secret_separated_from_env() {
    let profile = ProfileConfig {
        smtp_enabled: true,
        smtp_host: Some("smtp.test.com".to_string()),
        smtp_auth: Some("user@test.com".to_string()),
        smtp_password: Some("smtp-password".to_string()),
        smtp_no_reply_email: Some("noreply@test.com".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);

    assert_eq!(as_str(&values, &["studioApi", "env", "SMTP_HOST"]), "smtp.test.com");
    assert_eq!(as_str(&values, &["studioApi", "env", "SMTP_PORT"]), "465");
    assert_eq!(as_str(&values, &["studioApi", "env", "SMTP_SECURE"]), "true");
    assert_eq!(as_str(&values, &["studioApi", "env", "NO_REPLY_EMAIL"]), "noreply@test.com");
    assert_eq!(as_str(&values, &["studioApi", "secrets", "SMTP_PSWD"]), "smtp-password");
    assert!(get(&values, &["studioApi", "env", "SMTP_PSWD"]).is_null());
}

#[test]
fn every_oidc_secret_lands_in_secrets_not_env() {
    let profile = ProfileConfig {
        smtp_enabled: true,
        smtp_host: Some("smtp.test.com".to_string()),
        smtp_auth: Some("user@test.com".to_string()),
        smtp_password: Some("smtp-password".to_string()),
        smtp_no_reply_email: Some("noreply@test.com".to_string()),
        oidc_google_enabled: true,
        oidc_google_client_id: Some("google-id".to_string()),
        oidc_google_client_secret: Some("google-secret".to_string()),
        oidc_github_enabled: true,
        oidc_github_client_id: Some("github-id".to_string()),
        oidc_github_client_secret: Some("github-secret".to_string()),
        oidc_native_type: Some("linagora".to_string()),
        oidc_native_client_id: Some("native-id".to_string()),
        oidc_native_client_secret: Some("native-secret".to_string()),
        oidc_native_url: Some("https://sso.linagora.com".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);

    for secret_key in ["SMTP_PSWD", "GOOGLE_CLIENT_SECRET", "GITHUB_CLIENT_SECRET", "OIDC_CLIENT_SECRET"] {
        assert!(
            get(&values, &["studioApi", "env", secret_key]).is_null(),
            "{secret_key} must not appear under env"
        );
        assert!(
            !get(&values, &["studioApi", "secrets", secret_key]).is_null(),
            "{secret_key} must appear under secrets"
        );
    }

    assert_eq!(as_str(&values, &["studioApi", "env", "OIDC_GOOGLE_ENABLED"]), "true");
    assert_eq!(as_str(&values, &["studioApi", "env", "OIDC_GITHUB_ENABLED"]), "true");
    assert_eq!(as_str(&values, &["studioApi", "env", "OIDC_TYPE"]), "linagora");
}

#[test]
fn oidc_callback_uri_derived_from_domain_and_tls() {
    let profile = ProfileConfig {
        domain: "example.com".to_string(),
        oidc_google_enabled: true,
        oidc_google_client_id: Some("client-id".to_string()),
        oidc_google_client_secret: Some("secret".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);
    assert_eq!(
        as_str(&values, &["studioApi", "env", "GOOGLE_OIDC_CALLBACK_URI"]),
        "https://example.com/cm-api/auth/oidc/google/cb"
    );

    let plain = ProfileConfig {
        tls_mode: TlsMode::Off,
        ..profile
    };
    let values = studio_values(&plain);
    assert_eq!(
        as_str(&values, &["studioApi", "env", "GOOGLE_OIDC_CALLBACK_URI"]),
        "http://example.com/cm-api/auth/oidc/google/cb"
    );
}

#[test]
fn native_callback_uri_has_no_provider_segment() {
    let profile = ProfileConfig {
        domain: "example.com".to_string(),
        oidc_native_type: Some("eu".to_string()),
        oidc_native_client_id: Some("client-id".to_string()),
        oidc_native_client_secret: Some("secret".to_string()),
        oidc_native_url: Some("https://sso.example.com".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);
    assert_eq!(
        as_str(&values, &["studioApi", "env", "OIDC_CALLBACK_URI"]),
        "https://example.com/cm-api/auth/oidc/cb"
    );
    assert_eq!(as_str(&values, &["studioApi", "env", "OIDC_SCOPE"]), "openid,email,profile");
}

#[test]
fn service_tag_override_precedence() {
    let mut profile = k3s_profile();
    profile.image_tag = "latest-unstable".to_string();
    profile.service_tags.insert("studio-api".to_string(), "1.6.0".to_string());

    assert_eq!(service_tag(&profile, "studio-api"), "1.6.0");
    assert_eq!(service_tag(&profile, "studio-frontend"), "latest-unstable");

    let values = studio_values(&profile);
    assert_eq!(as_str(&values, &["studioApi", "image", "tag"]), "1.6.0");
    assert_eq!(as_str(&values, &["studioFrontend", "image", "tag"]), "latest-unstable");
}

#[test]
fn database_tags_use_prefixed_overrides_and_pinned_defaults() {
    let mut profile = k3s_profile();
    assert_eq!(database_tag(&profile, "studio-mongo"), "6.0.2");
    assert_eq!(database_tag(&profile, "stt-redis"), "7.4.0-v8");
    assert_eq!(database_tag(&profile, "live-postgres"), "15-alpine");
    assert_eq!(database_tag(&profile, "live-mosquitto"), "2");
    assert_eq!(database_tag(&profile, "something-else"), "latest");

    profile.service_tags.insert("db-studio-mongo".to_string(), "7.0.0".to_string());
    assert_eq!(database_tag(&profile, "studio-mongo"), "7.0.0");
}

#[test]
fn llm_tags_use_prefixed_overrides() {
    let mut profile = k3s_profile();
    assert_eq!(llm_service_tag(&profile, "vllm-openai"), "latest");
    profile.service_tags.insert("llm-vllm-openai".to_string(), "v0.6.0".to_string());
    assert_eq!(llm_service_tag(&profile, "vllm-openai"), "v0.6.0");
}

#[test]
fn only_studio_creates_the_certificate() {
    let profile = ProfileConfig {
        stt_enabled: true,
        ..k3s_profile()
    };
    let studio = studio_values(&profile);
    let stt = stt_values(&profile);
    assert_eq!(get(&studio, &["global", "tls", "createCertificate"]).as_bool(), Some(true));
    assert_eq!(get(&stt, &["global", "tls", "createCertificate"]).as_bool(), Some(false));
    assert_eq!(as_str(&studio, &["global", "tls", "secretName"]), "linto-tls");
}

#[test]
fn tls_off_omits_secret_name() {
    let profile = ProfileConfig {
        tls_mode: TlsMode::Off,
        ..k3s_profile()
    };
    let values = studio_values(&profile);
    assert_eq!(get(&values, &["global", "tls", "enabled"]).as_bool(), Some(false));
    assert!(get(&values, &["global", "tls", "secretName"]).is_null());
}

#[test]
fn acme_email_propagates_to_global_tls() {
    let profile = ProfileConfig {
        tls_mode: TlsMode::Acme,
        acme_email: Some("ops@test.local".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);
    assert_eq!(as_str(&values, &["global", "tls", "acmeEmail"]), "ops@test.local");
    assert_eq!(as_str(&values, &["global", "tls", "mode"]), "acme");
}

#[test]
fn database_host_path_and_node_role_land_in_global_storage() {
    let profile = ProfileConfig {
        k3s_database_host_path: Some("/mnt/data".to_string()),
        k3s_database_node_role: Some("database".to_string()),
        k3s_files_host_path: Some("/mnt/files".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);
    assert_eq!(as_str(&values, &["global", "storage", "database", "hostPath"]), "/mnt/data");
    assert_eq!(
        as_str(&values, &["global", "storage", "database", "nodeSelector", "linto.ai/role"]),
        "database"
    );
    assert_eq!(as_str(&values, &["global", "storage", "files", "hostPath"]), "/mnt/files");
}

#[test]
fn storage_class_propagates_to_persistence() {
    let profile = ProfileConfig {
        k3s_storage_class: Some("local-path".to_string()),
        ..k3s_profile()
    };
    let values = studio_values(&profile);
    assert_eq!(as_str(&values, &["global", "storageClass"]), "local-path");
    assert_eq!(as_str(&values, &["mongodb", "persistence", "storageClass"]), "local-path");
}

#[test]
fn live_values_map_streaming_variants() {
    let profile = ProfileConfig {
        live_session_enabled: true,
        gpu_mode: GpuMode::Exclusive,
        streaming_stt_variants: vec![
            StreamingSttVariant::KaldiFrench,
            StreamingSttVariant::NemoFrench,
            StreamingSttVariant::Kyutai,
        ],
        kyutai_gpu_architecture: Some(GpuArchitecture::Ampere),
        ..k3s_profile()
    };
    let values = live_values(&profile);

    // Keys are variant names with dashes flattened to underscores.
    assert_eq!(get(&values, &["streamingStt", "kaldi_french", "enabled"]).as_bool(), Some(true));
    assert!(
        get(&values, &["streamingStt", "kaldi_french", "resources"]).is_null(),
        "CPU variant gets no GPU resources"
    );
    assert_eq!(
        as_str(&values, &["streamingStt", "nemo_french", "resources", "limits", "nvidia.com/gpu"]),
        "1"
    );
    assert_eq!(as_str(&values, &["streamingStt", "kyutai", "gpuArchitecture"]), "ampere");
}

#[test]
fn live_values_carry_transcriber_replicas() {
    let profile = ProfileConfig {
        live_session_enabled: true,
        session_transcriber_replicas: 3,
        session_postgres_password: Some("pg-pass".to_string()),
        session_crypt_key: Some("CRYPTKEY01".to_string()),
        ..k3s_profile()
    };
    let values = live_values(&profile);
    assert_eq!(get(&values, &["sessionTranscriber", "replicas"]).as_u64(), Some(3));
    assert_eq!(as_str(&values, &["sessionApi", "env", "DB_PASSWORD"]), "pg-pass");
    assert_eq!(as_str(&values, &["sessionApi", "env", "SECURITY_CRYPT_KEY"]), "CRYPTKEY01");
    assert_eq!(as_str(&values, &["postgres", "password"]), "pg-pass");
}

#[test]
fn llm_values_include_basic_auth_and_cors() {
    let profile = ProfileConfig {
        llm_enabled: true,
        llm_admin_password: Some("admin-password".to_string()),
        llm_redis_password: Some("redis-pass".to_string()),
        llm_encryption_key: Some("enc-key".to_string()),
        ..k3s_profile()
    };
    let values = llm_values(&profile);

    assert_eq!(as_str(&values, &["llmGatewayFrontend", "basicAuth", "username"]), "admin");
    assert_eq!(
        as_str(&values, &["llmGatewayFrontend", "basicAuth", "password"]),
        "admin-password"
    );
    assert_eq!(as_str(&values, &["llmGatewayApi", "env", "CORS_ORIGINS"]), "https://test.local");
    assert_eq!(as_str(&values, &["llmGatewayApi", "env", "REDIS_PASSWORD"]), "redis-pass");
    assert_eq!(as_str(&values, &["llmGatewayApi", "env", "ENCRYPTION_KEY"]), "enc-key");
    assert_eq!(get(&values, &["vllm", "enabled"]).as_bool(), Some(false));
}

#[test]
fn vllm_gets_gpu_resources_only_when_gpu_enabled() {
    let mut profile = ProfileConfig {
        llm_enabled: true,
        vllm_enabled: true,
        gpu_mode: GpuMode::Exclusive,
        ..k3s_profile()
    };
    let values = llm_values(&profile);
    assert_eq!(as_str(&values, &["vllm", "resources", "limits", "nvidia.com/gpu"]), "1");

    profile.gpu_mode = GpuMode::None;
    let values = llm_values(&profile);
    assert!(get(&values, &["vllm", "resources", "limits"]).is_null());
}

#[test]
fn enabled_charts_follow_feature_flags() {
    let profile = ProfileConfig {
        stt_enabled: true,
        llm_enabled: true,
        ..k3s_profile()
    };
    assert_eq!(
        enabled_charts(&profile),
        vec![ChartKind::Studio, ChartKind::Stt, ChartKind::Llm]
    );
}

#[test]
fn values_generation_is_idempotent() {
    let profile = ProfileConfig {
        stt_enabled: true,
        gpu_mode: GpuMode::TimeSlicing,
        gpu_count: 2,
        redis_password: Some("fixed".to_string()),
        ..k3s_profile()
    };
    let first = serde_yaml::to_string(&stt_values(&profile)).unwrap();
    let second = serde_yaml::to_string(&stt_values(&profile)).unwrap();
    assert_eq!(first, second);
}
