//! Helm values generation for the four platform charts.
//!
//! Every chart document carries its own `global` block. Sensitive fields go
//! under a `secrets` subtree, distinct from `env`, so the chart can route
//! them to a Kubernetes Secret instead of a ConfigMap. That separation is
//! an invariant every new integration must preserve.

use serde_yaml::{Mapping, Value};

use crate::model::{ProfileConfig, StreamingSttVariant, TlsMode};
use crate::render::artifact::ChartKind;

pub(crate) trait MappingExt {
    fn set(&mut self, key: &str, value: impl Into<Value>);
}

impl MappingExt for Mapping {
    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(Value::String(key.to_string()), value.into());
    }
}

fn image_block(tag: String) -> Mapping {
    let mut image = Mapping::new();
    image.set("tag", tag);
    image
}

fn persistence_block(size: &str, storage_class: Option<&str>) -> Mapping {
    let mut persistence = Mapping::new();
    persistence.set("enabled", true);
    persistence.set("size", size);
    if let Some(class) = storage_class {
        persistence.set("storageClass", class);
    }
    persistence
}

/// `resources: {limits: {}}`: request nothing, cap nothing.
fn unbounded_resources() -> Mapping {
    let mut resources = Mapping::new();
    resources.set("limits", Mapping::new());
    resources
}

fn gpu_resources() -> Mapping {
    let mut slot = Mapping::new();
    slot.set("nvidia.com/gpu", "1");
    let mut resources = Mapping::new();
    resources.set("limits", slot.clone());
    resources.set("requests", slot);
    resources
}

/// Tag for a platform service: per-service override, else the profile tag.
pub fn service_tag(profile: &ProfileConfig, service_name: &str) -> String {
    profile
        .service_tags
        .get(service_name)
        .cloned()
        .unwrap_or_else(|| profile.image_tag.clone())
}

/// Tag for a database image: `db-` prefixed override, else a pinned
/// per-database default.
pub fn database_tag(profile: &ProfileConfig, db_name: &str) -> String {
    if let Some(tag) = profile.service_tags.get(&format!("db-{db_name}")) {
        return tag.clone();
    }
    match db_name {
        "studio-mongo" | "stt-mongo" => "6.0.2",
        "stt-redis" | "llm-redis" => "7.4.0-v8",
        "live-postgres" | "llm-postgres" => "15-alpine",
        "live-mosquitto" => "2",
        _ => "latest",
    }
    .to_string()
}

/// Tag for an LLM-stack image: `llm-` prefixed override, else latest.
pub fn llm_service_tag(profile: &ProfileConfig, service_name: &str) -> String {
    profile
        .service_tags
        .get(&format!("llm-{service_name}"))
        .cloned()
        .unwrap_or_else(|| "latest".to_string())
}

/// Global values shared across charts. Only the first chart creates the TLS
/// certificate; the others reference the same secret.
pub fn global_values(profile: &ProfileConfig, create_certificate: bool) -> Mapping {
    let mut global = Mapping::new();
    global.set("domain", profile.domain.as_str());
    global.set("imageTag", profile.image_tag.as_str());

    let tls_enabled = profile.tls_mode.enabled();
    let mut tls = Mapping::new();
    tls.set("enabled", tls_enabled);
    tls.set("mode", profile.tls_mode.as_str());
    if tls_enabled {
        tls.set("secretName", profile.k3s_tls_secret_name.as_str());
        tls.set("createCertificate", create_certificate);
    }
    if profile.tls_mode == TlsMode::Acme
        && let Some(email) = profile.acme_email.as_deref()
    {
        tls.set("acmeEmail", email);
    }
    global.set("tls", tls);

    if let Some(class) = profile.k3s_storage_class.as_deref() {
        global.set("storageClass", class);
    }

    if profile.k3s_database_host_path.is_some() || profile.k3s_files_host_path.is_some() {
        let mut storage = Mapping::new();
        if let Some(host_path) = profile.k3s_database_host_path.as_deref() {
            let mut database = Mapping::new();
            database.set("hostPath", host_path);
            if let Some(selector) = &profile.k3s_database_node_selector {
                let mut node_selector = Mapping::new();
                for (key, value) in selector {
                    node_selector.set(key, value.as_str());
                }
                database.set("nodeSelector", node_selector);
            } else if let Some(role) = profile.k3s_database_node_role.as_deref() {
                let mut node_selector = Mapping::new();
                node_selector.set("linto.ai/role", role);
                database.set("nodeSelector", node_selector);
            }
            storage.set("database", database);
        }
        if let Some(host_path) = profile.k3s_files_host_path.as_deref() {
            let mut files = Mapping::new();
            files.set("hostPath", host_path);
            storage.set("files", files);
        }
        global.set("storage", storage);
    }

    global
}

/// Values for the studio chart.
pub fn studio_values(profile: &ProfileConfig) -> Value {
    let storage_class = profile.k3s_storage_class.as_deref();
    let scheme = profile.tls_mode.scheme();

    let mut env = Mapping::new();
    env.set("SUPER_ADMIN_EMAIL", profile.super_admin_email.as_str());
    env.set("SUPER_ADMIN_PWD", profile.super_admin_password.as_deref().unwrap_or_default());
    env.set("CM_JWT_SECRET", profile.jwt_secret.as_deref().unwrap_or_default());
    env.set("CM_REFRESH_SECRET", profile.jwt_refresh_secret.as_deref().unwrap_or_default());
    if profile.stt_enabled {
        env.set("GATEWAY_SERVICES", "http://linto-stt-api-gateway:80");
    }
    if profile.llm_enabled {
        env.set("LLM_GATEWAY_SERVICES", "http://linto-llm-llm-api:80");
    }

    let mut secrets = Mapping::new();

    if profile.smtp_enabled {
        env.set("SMTP_HOST", profile.smtp_host.as_deref().unwrap_or_default());
        env.set("SMTP_PORT", profile.smtp_port.to_string());
        env.set("SMTP_SECURE", profile.smtp_secure.to_string());
        env.set("SMTP_REQUIRE_TLS", profile.smtp_require_tls.to_string());
        env.set("SMTP_AUTH", profile.smtp_auth.as_deref().unwrap_or_default());
        env.set("NO_REPLY_EMAIL", profile.smtp_no_reply_email.as_deref().unwrap_or_default());
        secrets.set("SMTP_PSWD", profile.smtp_password.as_deref().unwrap_or_default());
    }

    if profile.oidc_google_enabled {
        env.set("OIDC_GOOGLE_ENABLED", "true");
        env.set("GOOGLE_CLIENT_ID", profile.oidc_google_client_id.as_deref().unwrap_or_default());
        env.set(
            "GOOGLE_OIDC_CALLBACK_URI",
            format!("{scheme}://{}/cm-api/auth/oidc/google/cb", profile.domain),
        );
        secrets.set(
            "GOOGLE_CLIENT_SECRET",
            profile.oidc_google_client_secret.as_deref().unwrap_or_default(),
        );
    }

    if profile.oidc_github_enabled {
        env.set("OIDC_GITHUB_ENABLED", "true");
        env.set("GITHUB_CLIENT_ID", profile.oidc_github_client_id.as_deref().unwrap_or_default());
        env.set(
            "GITHUB_OIDC_CALLBACK_URI",
            format!("{scheme}://{}/cm-api/auth/oidc/github/cb", profile.domain),
        );
        secrets.set(
            "GITHUB_CLIENT_SECRET",
            profile.oidc_github_client_secret.as_deref().unwrap_or_default(),
        );
    }

    if profile.native_oidc_enabled() {
        env.set("OIDC_TYPE", profile.oidc_native_type.as_deref().unwrap_or_default());
        env.set("OIDC_CLIENT_ID", profile.oidc_native_client_id.as_deref().unwrap_or_default());
        env.set("OIDC_CALLBACK_URI", format!("{scheme}://{}/cm-api/auth/oidc/cb", profile.domain));
        env.set("OIDC_URL", profile.oidc_native_url.as_deref().unwrap_or_default());
        env.set("OIDC_SCOPE", profile.oidc_native_scope.as_str());
        secrets.set(
            "OIDC_CLIENT_SECRET",
            profile.oidc_native_client_secret.as_deref().unwrap_or_default(),
        );
        // The native provider sends account mail through the no-reply
        // address even without the SMTP block (which already set it above).
        if let Some(no_reply) = profile.smtp_no_reply_email.as_deref()
            && !profile.smtp_enabled
        {
            env.set("NO_REPLY_EMAIL", no_reply);
        }
    }

    let mut studio_api = Mapping::new();
    studio_api.set("enabled", true);
    studio_api.set("replicas", 1);
    studio_api.set("image", image_block(service_tag(profile, "studio-api")));
    studio_api.set("env", env);
    let mut api_limits = Mapping::new();
    api_limits.set("cpu", "2");
    api_limits.set("memory", "8Gi");
    let mut api_resources = Mapping::new();
    api_resources.set("limits", api_limits);
    studio_api.set("resources", api_resources);
    studio_api.set("secrets", secrets);

    let mut studio_frontend = Mapping::new();
    studio_frontend.set("enabled", true);
    studio_frontend.set("replicas", 1);
    studio_frontend.set("image", image_block(service_tag(profile, "studio-frontend")));

    let mut websocket_env = Mapping::new();
    websocket_env.set("CM_JWT_SECRET", profile.jwt_secret.as_deref().unwrap_or_default());
    let mut studio_websocket = Mapping::new();
    studio_websocket.set("enabled", true);
    studio_websocket.set("replicas", 1);
    studio_websocket.set("image", image_block(service_tag(profile, "studio-websocket")));
    studio_websocket.set("env", websocket_env);

    let mut mongodb = Mapping::new();
    mongodb.set("enabled", true);
    mongodb.set("image", image_block(database_tag(profile, "studio-mongo")));
    mongodb.set("persistence", persistence_block("10Gi", storage_class));
    mongodb.set("resources", unbounded_resources());

    let mut values = Mapping::new();
    // Studio creates the certificate (first chart).
    values.set("global", global_values(profile, true));
    values.set("studioApi", studio_api);
    values.set("studioFrontend", studio_frontend);
    values.set("studioWebsocket", studio_websocket);
    values.set("mongodb", mongodb);
    Value::Mapping(values)
}

/// Values for the stt chart, including the multi-GPU placement policy.
pub fn stt_values(profile: &ProfileConfig) -> Value {
    let gpu_enabled = profile.gpu_mode.enabled();
    let gpu_count = if gpu_enabled { profile.gpu_count } else { 0 };
    let storage_class = profile.k3s_storage_class.as_deref();
    let device = if gpu_enabled { "cuda" } else { "cpu" };
    let redis_password = profile.redis_password.as_deref().unwrap_or_default();

    let mut gateway_env = Mapping::new();
    gateway_env.set("COMPONENTS", "ApiWatcher,WebServer");
    let mut gateway_ingress = Mapping::new();
    gateway_ingress.set("enabled", false);
    let mut api_gateway = Mapping::new();
    api_gateway.set("enabled", true);
    api_gateway.set("replicas", 1);
    api_gateway.set("image", image_block(service_tag(profile, "linto-api-gateway")));
    api_gateway.set("env", gateway_env);
    api_gateway.set("ingress", gateway_ingress);

    let mut whisper_env = Mapping::new();
    whisper_env.set("BROKER_PASS", redis_password);
    let mut whisper_ingress = Mapping::new();
    whisper_ingress.set("enabled", false);
    let mut whisper = Mapping::new();
    whisper.set("enabled", true);
    whisper.set("replicas", 1);
    whisper.set("image", image_block(service_tag(profile, "linto-transcription-service")));
    whisper.set("env", whisper_env);
    whisper.set("ingress", whisper_ingress);

    let mut workers_env = Mapping::new();
    workers_env.set("BROKER_PASS", redis_password);
    workers_env.set("DEVICE", device);
    let mut whisper_workers = Mapping::new();
    whisper_workers.set("enabled", true);
    whisper_workers.set("image", image_block(service_tag(profile, "linto-stt-whisper")));
    whisper_workers.set("env", workers_env);

    let mut diarization_env = Mapping::new();
    diarization_env.set("SERVICE_NAME", "stt-diarization-pyannote");
    diarization_env.set("QUEUE_NAME", "diarization-pyannote");
    diarization_env.set("BROKER_PASS", redis_password);
    diarization_env.set("DEVICE", device);
    let mut diarization = Mapping::new();
    diarization.set("enabled", true);
    diarization.set("image", image_block(service_tag(profile, "linto-diarization-pyannote")));
    diarization.set("env", diarization_env);

    // Multi-GPU fan-out: one replica slot per GPU instead of a flat count.
    if gpu_enabled && gpu_count > 1 {
        let replicas_per_gpu = Value::from(vec![1u32; gpu_count as usize]);
        whisper_workers.set("replicasPerGpu", replicas_per_gpu.clone());
        diarization.set("replicasPerGpu", replicas_per_gpu);
    } else {
        whisper_workers.set("replicas", 1);
        whisper_workers.set("resources", Mapping::new());
        diarization.set("replicas", 1);
        diarization.set("resources", Mapping::new());
    }

    let mut redis = Mapping::new();
    redis.set("enabled", true);
    redis.set("image", image_block(database_tag(profile, "stt-redis")));
    redis.set("password", redis_password);
    redis.set("persistence", persistence_block("5Gi", storage_class));
    redis.set("resources", unbounded_resources());

    let mut mongodb = Mapping::new();
    mongodb.set("enabled", true);
    mongodb.set("image", image_block(database_tag(profile, "stt-mongo")));
    mongodb.set("persistence", persistence_block("10Gi", storage_class));
    mongodb.set("resources", unbounded_resources());

    let mut values = Mapping::new();
    values.set("global", global_values(profile, false));
    values.set("apiGateway", api_gateway);
    values.set("whisper", whisper);
    values.set("whisperWorkers", whisper_workers);
    values.set("diarization", diarization);
    values.set("redis", redis);
    values.set("mongodb", mongodb);
    Value::Mapping(values)
}

const VARIANT_GPU_SERVICES: [StreamingSttVariant; 4] = [
    StreamingSttVariant::Whisper,
    StreamingSttVariant::NemoFrench,
    StreamingSttVariant::NemoEnglish,
    StreamingSttVariant::Kyutai,
];

fn variant_image(variant: StreamingSttVariant) -> &'static str {
    match variant {
        StreamingSttVariant::Whisper => "linto-stt-whisper",
        StreamingSttVariant::KaldiFrench => "linto-stt-kaldi",
        StreamingSttVariant::NemoFrench | StreamingSttVariant::NemoEnglish => "linto-stt-nemo",
        StreamingSttVariant::Kyutai => "kyutai-moshi-stt-server-cuda",
    }
}

/// Values for the live chart.
pub fn live_values(profile: &ProfileConfig) -> Value {
    let gpu_enabled = profile.gpu_mode.enabled();
    let storage_class = profile.k3s_storage_class.as_deref();
    let postgres_password = profile.session_postgres_password.as_deref().unwrap_or_default();
    let crypt_key = profile.session_crypt_key.as_deref().unwrap_or_default();

    let mut migration = Mapping::new();
    migration.set("enabled", true);
    migration.set("image", image_block(service_tag(profile, "studio-plugins-migration")));

    let mut api_env = Mapping::new();
    api_env.set("DB_PASSWORD", postgres_password);
    api_env.set("SECURITY_CRYPT_KEY", crypt_key);
    let mut api_limits = Mapping::new();
    api_limits.set("cpu", "2");
    api_limits.set("memory", "8Gi");
    let mut api_resources = Mapping::new();
    api_resources.set("limits", api_limits);
    let mut session_api = Mapping::new();
    session_api.set("enabled", true);
    session_api.set("replicas", 1);
    session_api.set("image", image_block(service_tag(profile, "studio-plugins-sessionapi")));
    session_api.set("env", api_env);
    session_api.set("resources", api_resources);

    let mut scheduler_env = Mapping::new();
    scheduler_env.set("DB_PASSWORD", postgres_password);
    let mut session_scheduler = Mapping::new();
    session_scheduler.set("enabled", true);
    session_scheduler.set("replicas", 1);
    session_scheduler.set("image", image_block(service_tag(profile, "studio-plugins-scheduler")));
    session_scheduler.set("env", scheduler_env);

    let mut transcriber_env = Mapping::new();
    transcriber_env.set("SECURITY_CRYPT_KEY", crypt_key);
    let mut transcriber_limits = Mapping::new();
    transcriber_limits.set("cpu", "8");
    transcriber_limits.set("memory", "8Gi");
    let mut transcriber_resources = Mapping::new();
    transcriber_resources.set("limits", transcriber_limits);
    let mut session_transcriber = Mapping::new();
    session_transcriber.set("enabled", true);
    session_transcriber.set("replicas", profile.session_transcriber_replicas);
    session_transcriber.set("image", image_block(service_tag(profile, "studio-plugins-transcriber")));
    session_transcriber.set("env", transcriber_env);
    session_transcriber.set("resources", transcriber_resources);

    let mut postgres = Mapping::new();
    postgres.set("enabled", true);
    postgres.set("image", image_block(database_tag(profile, "live-postgres")));
    postgres.set("password", postgres_password);
    postgres.set("persistence", persistence_block("10Gi", storage_class));
    postgres.set("resources", unbounded_resources());

    let mut broker = Mapping::new();
    broker.set("enabled", true);
    broker.set("image", image_block(database_tag(profile, "live-mosquitto")));
    broker.set("resources", unbounded_resources());

    let mut streaming_stt = Mapping::new();
    for variant in &profile.streaming_stt_variants {
        let mut config = Mapping::new();
        config.set("enabled", true);
        config.set("replicas", 1);
        config.set("image", image_block(service_tag(profile, variant_image(*variant))));

        if gpu_enabled && VARIANT_GPU_SERVICES.contains(variant) {
            config.set("resources", gpu_resources());
        }
        if *variant == StreamingSttVariant::Kyutai
            && let Some(architecture) = profile.kyutai_gpu_architecture
        {
            config.set("gpuArchitecture", architecture.as_str());
        }

        streaming_stt.set(&variant.as_str().replace('-', "_"), config);
    }

    let mut values = Mapping::new();
    values.set("global", global_values(profile, false));
    values.set("migration", migration);
    values.set("sessionApi", session_api);
    values.set("sessionScheduler", session_scheduler);
    values.set("sessionTranscriber", session_transcriber);
    values.set("postgres", postgres);
    values.set("broker", broker);
    values.set("streamingStt", streaming_stt);
    Value::Mapping(values)
}

/// Values for the llm chart.
pub fn llm_values(profile: &ProfileConfig) -> Value {
    let gpu_enabled = profile.gpu_mode.enabled();
    let storage_class = profile.k3s_storage_class.as_deref();
    let scheme = profile.tls_mode.scheme();

    let mut gateway_env = Mapping::new();
    gateway_env.set("REDIS_PASSWORD", profile.llm_redis_password.as_deref().unwrap_or_default());
    gateway_env.set("ENCRYPTION_KEY", profile.llm_encryption_key.as_deref().unwrap_or_default());
    gateway_env.set("DEBUG", "false");
    gateway_env.set("CORS_ORIGINS", format!("{scheme}://{}", profile.domain));
    let mut gateway_api = Mapping::new();
    gateway_api.set("enabled", true);
    gateway_api.set("replicas", 1);
    gateway_api.set("image", image_block(service_tag(profile, "llm-gateway")));
    gateway_api.set("env", gateway_env);

    let mut celery_worker = Mapping::new();
    celery_worker.set("enabled", true);
    celery_worker.set("replicas", 1);
    celery_worker.set("image", image_block(service_tag(profile, "llm-gateway")));

    let mut basic_auth = Mapping::new();
    basic_auth.set("enabled", true);
    basic_auth.set("username", profile.llm_admin_username.as_str());
    basic_auth.set("password", profile.llm_admin_password.as_deref().unwrap_or_default());
    let mut gateway_frontend = Mapping::new();
    gateway_frontend.set("enabled", true);
    gateway_frontend.set("replicas", 1);
    gateway_frontend.set("image", image_block(service_tag(profile, "llm-gateway-frontend")));
    gateway_frontend.set("basicAuth", basic_auth);

    let mut postgres = Mapping::new();
    postgres.set("enabled", true);
    postgres.set("image", image_block(database_tag(profile, "llm-postgres")));
    postgres.set("password", profile.llm_postgres_password.as_deref().unwrap_or_default());
    postgres.set("persistence", persistence_block("10Gi", storage_class));
    postgres.set("resources", unbounded_resources());

    let mut redis = Mapping::new();
    redis.set("enabled", true);
    redis.set("image", image_block(database_tag(profile, "llm-redis")));
    redis.set("password", profile.llm_redis_password.as_deref().unwrap_or_default());
    redis.set("persistence", persistence_block("5Gi", storage_class));
    redis.set("resources", unbounded_resources());

    let mut vllm = Mapping::new();
    vllm.set("enabled", profile.vllm_enabled);
    vllm.set("replicas", 1);
    vllm.set("image", image_block(llm_service_tag(profile, "vllm-openai")));
    if profile.vllm_enabled && gpu_enabled {
        vllm.set("resources", gpu_resources());
    } else {
        vllm.set("resources", Mapping::new());
    }

    let mut values = Mapping::new();
    values.set("global", global_values(profile, false));
    values.set("llmGatewayApi", gateway_api);
    values.set("celeryWorker", celery_worker);
    values.set("llmGatewayFrontend", gateway_frontend);
    values.set("postgres", postgres);
    values.set("redis", redis);
    values.set("vllm", vllm);
    Value::Mapping(values)
}

/// Values document for a chart.
pub fn chart_values(profile: &ProfileConfig, chart: ChartKind) -> Value {
    match chart {
        ChartKind::Studio => studio_values(profile),
        ChartKind::Stt => stt_values(profile),
        ChartKind::Live => live_values(profile),
        ChartKind::Llm => llm_values(profile),
    }
}

/// Charts enabled by the profile's feature flags, in deploy order.
pub fn enabled_charts(profile: &ProfileConfig) -> Vec<ChartKind> {
    let mut charts = Vec::new();
    if profile.studio_enabled {
        charts.push(ChartKind::Studio);
    }
    if profile.stt_enabled {
        charts.push(ChartKind::Stt);
    }
    if profile.live_session_enabled {
        charts.push(ChartKind::Live);
    }
    if profile.llm_enabled {
        charts.push(ChartKind::Llm);
    }
    charts
}
