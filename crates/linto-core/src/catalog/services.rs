//! Factory functions for every service in the platform.

use indexmap::IndexMap;

use crate::error::{DeployError, Result};
use crate::model::{
    DeployConfig, GpuArchitecture, HealthcheckConfig, RestartPolicy, ServiceCategory, ServiceCommand,
    ServiceDefinition, StreamingSttVariant, VolumeMount,
};

fn envmap<const N: usize>(pairs: [(&str, String); N]) -> IndexMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn wget_healthcheck(interval: &str, retries: u32, start_period: &str) -> HealthcheckConfig {
    HealthcheckConfig {
        test: ["CMD", "wget", "--quiet", "--tries=1", "--spider", "http://localhost:80/healthcheck"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        interval: interval.to_string(),
        timeout: "10s".to_string(),
        retries,
        start_period: start_period.to_string(),
    }
}

fn mongo_healthcheck() -> HealthcheckConfig {
    HealthcheckConfig {
        test: ["CMD", "mongosh", "--eval", "db.adminCommand('ping')"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ..HealthcheckConfig::default()
    }
}

fn redis_healthcheck() -> HealthcheckConfig {
    HealthcheckConfig {
        test: ["CMD", "redis-cli", "ping"].iter().map(|s| s.to_string()).collect(),
        start_period: "10s".to_string(),
        ..HealthcheckConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Infrastructure services
// ---------------------------------------------------------------------------

/// Reverse-proxy/ingress entry point. Command-line flags and extra volume
/// mounts depend on the TLS mode: mkcert/custom mount a certs directory and
/// a dynamic-config directory, acme mounts a single ACME state file.
pub fn traefik_service(_domain: &str, tls_mode: &str) -> ServiceDefinition {
    let mut volumes = vec![VolumeMount::read_only(
        "/var/run/docker.sock",
        "/var/run/docker.sock",
    )];

    let mut command: Vec<String> = [
        "--api.insecure=true",
        "--providers.docker=true",
        "--providers.docker.exposedbydefault=false",
        "--entrypoints.web.address=:80",
        "--entrypoints.websecure.address=:443",
        "--entrypoints.rtmp.address=:1935/tcp",
        "--entrypoints.srt.address=:8889/udp",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    match tls_mode {
        "mkcert" | "custom" => {
            command.push("--providers.file.directory=/etc/traefik/dynamic".to_string());
            command.push("--providers.file.watch=true".to_string());
            volumes.push(VolumeMount::read_only("./.linto/tls/certs", "/certs"));
            volumes.push(VolumeMount::read_only("./.linto/traefik/dynamic", "/etc/traefik/dynamic"));
        }
        "acme" => {
            command.push("--certificatesresolvers.leresolver.acme.httpchallenge=true".to_string());
            command.push("--certificatesresolvers.leresolver.acme.httpchallenge.entrypoint=web".to_string());
            command.push("--certificatesresolvers.leresolver.acme.storage=/acme.json".to_string());
            volumes.push(VolumeMount::new("./.linto/tls/acme.json", "/acme.json"));
        }
        _ => {}
    }

    ServiceDefinition {
        ports: ["80:80", "443:443", "8080:8080", "1935:1935", "8889:8889/udp"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        networks: vec!["linto".to_string()],
        volumes,
        command: Some(ServiceCommand::Argv(command)),
        healthcheck: Some(HealthcheckConfig {
            test: ["CMD", "traefik", "healthcheck", "--ping"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            interval: "10s".to_string(),
            timeout: "5s".to_string(),
            retries: 3,
            start_period: "10s".to_string(),
        }),
        ..ServiceDefinition::new("traefik", ServiceCategory::Infra, "traefik:2.9.1".to_string())
    }
}

/// API gateway for STT routing. Needs the Docker socket for service
/// discovery; in swarm mode it must run on manager nodes.
pub fn api_gateway_service(image_tag: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["linto".to_string(), "net_stt_services".to_string()],
        traefik_endpoint: Some("/gateway".to_string()),
        traefik_strip_prefix: true,
        volumes: vec![VolumeMount::read_only("/var/run/docker.sock", "/var/run/docker.sock")],
        environment: envmap([
            ("COMPONENT", "ServiceWatcher,WebServer".to_string()),
            ("DEBUG", "saas-api-gateway*".to_string()),
        ]),
        ..ServiceDefinition::new(
            "api-gateway",
            ServiceCategory::Stt,
            format!("lintoai/linto-api-gateway:{image_tag}"),
        )
    }
}

// ---------------------------------------------------------------------------
// Studio services
// ---------------------------------------------------------------------------

pub fn studio_mongodb_service() -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["net_studio".to_string()],
        volumes: vec![VolumeMount::new("studio_mongodb_data", "/data/db")],
        healthcheck: Some(mongo_healthcheck()),
        ..ServiceDefinition::new("studio-mongodb", ServiceCategory::Studio, "mongo:6.0.2".to_string())
    }
}

#[allow(clippy::too_many_arguments)]
pub fn studio_api_service(
    domain: &str,
    image_tag: &str,
    jwt_secret: &str,
    jwt_refresh_secret: &str,
    super_admin_email: &str,
    super_admin_password: &str,
    live_session_enabled: bool,
    llm_enabled: bool,
    stt_enabled: bool,
) -> ServiceDefinition {
    // COMPONENTS accumulates capability tokens per enabled feature.
    let mut components = vec!["WebServer", "MongoMigration"];
    if live_session_enabled {
        components.extend(["BrokerClient", "IoHandler"]);
    }

    let mut networks = vec!["linto".to_string(), "net_studio".to_string()];
    if live_session_enabled {
        networks.push("session_network".to_string());
    }

    let mut environment = envmap([
        ("DB_HOST", "studio-mongodb".to_string()),
        ("DB_PORT", "27017".to_string()),
        ("DB_NAME", "conversations".to_string()),
        ("DB_REQUIRE_LOGIN", "false".to_string()),
        ("CM_JWT_SECRET", jwt_secret.to_string()),
        ("CM_REFRESH_SECRET", jwt_refresh_secret.to_string()),
        ("JWT_ALGORITHM", "HS256".to_string()),
        ("SUPER_ADMIN_EMAIL", super_admin_email.to_string()),
        ("SUPER_ADMIN_PWD", super_admin_password.to_string()),
        ("CORS_API_WHITELIST", format!("https://{domain}")),
        ("CORS_ENABLED", "true".to_string()),
        ("WEBSERVER_HTTP_PORT", "80".to_string()),
        ("NODE_ENV", "production".to_string()),
        ("COMPONENTS", components.join(",")),
        ("AXIOS_SIZE_FILE_MAX", "1000000000".to_string()),
        ("EXPRESS_SIZE_FILE_MAX", "1gb".to_string()),
        ("MAX_SUBTITLE_VERSION", "5".to_string()),
        ("DISABLE_DEFAULT_ORGANIZATION_CREATION", "false".to_string()),
        ("ORGANIZATION_DEFAULT_PERMISSIONS", "upload,summary,session".to_string()),
        ("LOCAL_AUTH_ENABLED", "true".to_string()),
    ]);

    if stt_enabled {
        environment.insert("GATEWAY_SERVICES".to_string(), "http://api-gateway".to_string());
    }

    if llm_enabled {
        environment.insert("LLM_GATEWAY_SERVICES".to_string(), "http://llm-gateway-api".to_string());
        environment.insert(
            "LLM_GATEWAY_SERVICES_WS".to_string(),
            "ws://llm-gateway-api/ws/results".to_string(),
        );
    }

    if live_session_enabled {
        environment.insert("BROKER_HOST".to_string(), "session-broker".to_string());
        environment.insert("BROKER_PORT".to_string(), "1883".to_string());
        environment.insert("BROKER_PROTOCOL".to_string(), "mqtt".to_string());
        environment.insert("BROKER_KEEPALIVE".to_string(), "60".to_string());
        environment.insert(
            "SESSION_API_ENDPOINT".to_string(),
            "http://session-api/v1".to_string(),
        );
    }

    ServiceDefinition {
        depends_on: vec!["studio-mongodb".to_string()],
        networks,
        traefik_endpoint: Some("/cm-api".to_string()),
        traefik_strip_prefix: true,
        environment,
        healthcheck: Some(wget_healthcheck("30s", 3, "60s")),
        ..ServiceDefinition::new(
            "studio-api",
            ServiceCategory::Studio,
            format!("lintoai/studio-api:{image_tag}"),
        )
    }
}

pub fn studio_frontend_service(domain: &str, image_tag: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["studio-api".to_string()],
        networks: vec!["linto".to_string(), "net_studio".to_string()],
        traefik_endpoint: Some("/".to_string()),
        environment: envmap([
            ("VUE_APP_CM_API", format!("https://{domain}/cm-api")),
            ("VUE_APP_WS_URL", format!("wss://{domain}/ws")),
        ]),
        ..ServiceDefinition::new(
            "studio-frontend",
            ServiceCategory::Studio,
            format!("lintoai/studio-frontend:{image_tag}"),
        )
    }
}

pub fn studio_websocket_service(_domain: &str, image_tag: &str, jwt_secret: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["studio-api".to_string()],
        networks: vec!["linto".to_string(), "net_studio".to_string()],
        traefik_endpoint: Some("/ws".to_string()),
        traefik_strip_prefix: true,
        environment: envmap([
            ("CM_API_URL", "http://studio-api:80".to_string()),
            ("CM_JWT_SECRET", jwt_secret.to_string()),
            ("NODE_ENV", "production".to_string()),
        ]),
        ..ServiceDefinition::new(
            "studio-websocket",
            ServiceCategory::Studio,
            format!("lintoai/studio-websocket:{image_tag}"),
        )
    }
}

// ---------------------------------------------------------------------------
// STT services (file-based transcription)
// ---------------------------------------------------------------------------

pub fn stt_mongo_service() -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["net_stt_services".to_string()],
        volumes: vec![VolumeMount::new("stt_mongodb_data", "/data/db")],
        healthcheck: Some(mongo_healthcheck()),
        ..ServiceDefinition::new("stt-mongo", ServiceCategory::Stt, "mongo:6.0.2".to_string())
    }
}

pub fn task_broker_redis_service(redis_password: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["task_broker_services".to_string()],
        command: Some(ServiceCommand::argv(["redis-server", "--requirepass", redis_password])),
        volumes: vec![VolumeMount::new("task_broker_redis_data", "/data")],
        healthcheck: Some(redis_healthcheck()),
        ..ServiceDefinition::new("task-broker-redis", ServiceCategory::Stt, "redis:7".to_string())
    }
}

/// Whisper transcription API. Registers itself with the API gateway via the
/// `GATEWAY_*` variables: the proxy path is its own traefik endpoint, so
/// discovery at the gateway is dynamic rather than statically routed.
pub fn stt_whisper_service(image_tag: &str, redis_password: &str) -> ServiceDefinition {
    let service_name = "stt-all-whisper-v3-turbo";
    ServiceDefinition {
        depends_on: vec![
            "task-broker-redis".to_string(),
            "stt-mongo".to_string(),
            "api-gateway".to_string(),
        ],
        networks: vec![
            "linto".to_string(),
            "net_stt_services".to_string(),
            "task_broker_services".to_string(),
        ],
        traefik_endpoint: Some(format!("/{service_name}")),
        traefik_strip_prefix: true,
        environment: envmap([
            ("SERVICES_BROKER", "redis://task-broker-redis:6379".to_string()),
            ("BROKER_PASS", redis_password.to_string()),
            ("MONGO_HOST", "stt-mongo".to_string()),
            ("MONGO_PORT", "27017".to_string()),
            ("SERVICE_NAME", service_name.to_string()),
            ("LANGUAGE", "*".to_string()),
            ("CONCURRENCY", "2".to_string()),
            ("GATEWAY_SERVICE_BASE_URL", "http://api-gateway".to_string()),
            ("GATEWAY_PROXY_PATH", format!("/{service_name}")),
            (
                "GATEWAY_DESCRIPTION",
                format!("{{\"en\": \"{service_name}\", \"fr\": \"{service_name}\"}}"),
            ),
            ("PROXIED_SERVICE_BASE_URL", format!("http://{service_name}")),
            ("REGISTRATION_MODE", "DOCKER".to_string()),
            ("RESOLVE_POLICY", "ANY".to_string()),
            ("ACCOUSTIC", "1".to_string()),
            ("MODEL_QUALITY", "1".to_string()),
            ("SECURITY_LEVEL", "0".to_string()),
            ("MODEL_TYPE", "whisper".to_string()),
            ("DIARIZATION_DEFAULT", "false".to_string()),
            ("WEBSERVER_HTTP_PORT", "80".to_string()),
            ("SWAGGER_PREFIX", format!("/{service_name}")),
            ("SWAGGER_URLS", format!("/{service_name}")),
        ]),
        healthcheck: Some(wget_healthcheck("15s", 4, "180s")),
        ..ServiceDefinition::new(
            service_name,
            ServiceCategory::Stt,
            format!("lintoai/linto-transcription-service:{image_tag}"),
        )
    }
}

pub fn stt_whisper_workers_service(image_tag: &str, redis_password: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["task-broker-redis".to_string()],
        networks: vec!["net_stt_services".to_string(), "task_broker_services".to_string()],
        environment: envmap([
            ("SERVICES_BROKER", "redis://task-broker-redis:6379".to_string()),
            ("BROKER_PASS", redis_password.to_string()),
            ("SERVICE_NAME", "stt-all-whisper-v3-turbo".to_string()),
            ("MODEL", "large-v3-turbo".to_string()),
            ("LANGUAGE", "*".to_string()),
            ("DEVICE", "cpu".to_string()),
            ("CONCURRENCY", "1".to_string()),
            ("SECURITY_LEVEL", "0".to_string()),
        ]),
        ..ServiceDefinition::new(
            "stt-whisper-workers",
            ServiceCategory::Stt,
            format!("lintoai/linto-stt-whisper:{image_tag}"),
        )
    }
}

pub fn diarization_pyannote_service(image_tag: &str, redis_password: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["task-broker-redis".to_string()],
        networks: vec!["net_stt_services".to_string(), "task_broker_services".to_string()],
        environment: envmap([
            ("SERVICES_BROKER", "redis://task-broker-redis:6379".to_string()),
            ("BROKER_PASS", redis_password.to_string()),
            ("SERVICE_NAME", "diarization".to_string()),
            ("DEVICE", "cpu".to_string()),
            ("CONCURRENCY", "1".to_string()),
        ]),
        ..ServiceDefinition::new(
            "diarization-pyannote",
            ServiceCategory::Stt,
            format!("lintoai/linto-diarization-pyannote:{image_tag}"),
        )
    }
}

// ---------------------------------------------------------------------------
// Live session services
// ---------------------------------------------------------------------------

pub fn session_postgres_service(password: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["session_network".to_string(), "net_studio".to_string()],
        volumes: vec![VolumeMount::new("session_postgres_data", "/var/lib/postgresql/data")],
        environment: envmap([
            ("POSTGRES_DB", "session_DB".to_string()),
            ("POSTGRES_USER", "session_user".to_string()),
            ("POSTGRES_PASSWORD", password.to_string()),
        ]),
        deploy: Some(DeployConfig {
            placement_constraints: vec!["node.role==manager".to_string()],
            ..DeployConfig::default()
        }),
        healthcheck: Some(HealthcheckConfig {
            test: ["CMD-SHELL", "pg_isready -U session_user -d session_DB"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..HealthcheckConfig::default()
        }),
        ..ServiceDefinition::new(
            "session-postgres",
            ServiceCategory::Live,
            "postgres:15-alpine".to_string(),
        )
    }
}

pub fn session_postgres_migration_service(image_tag: &str, password: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["session-postgres".to_string()],
        networks: vec!["session_network".to_string()],
        environment: envmap([
            ("DB_HOST", "session-postgres".to_string()),
            ("DB_PORT", "5432".to_string()),
            ("DB_NAME", "session_DB".to_string()),
            ("DB_USER", "session_user".to_string()),
            ("DB_PASSWORD", password.to_string()),
            ("NODE_ENV", "production".to_string()),
        ]),
        restart: "no".to_string(),
        deploy: Some(DeployConfig {
            restart_policy: Some(RestartPolicy::default()),
            ..DeployConfig::default()
        }),
        ..ServiceDefinition::new(
            "session-postgres-migration",
            ServiceCategory::Live,
            format!("lintoai/studio-plugins-migration:{image_tag}"),
        )
    }
}

pub fn session_broker_service() -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["session_network".to_string(), "net_studio".to_string()],
        command: Some(ServiceCommand::shell("mosquitto -c /mosquitto-no-auth.conf")),
        expose: vec!["1883".to_string()],
        healthcheck: Some(HealthcheckConfig {
            test: ["CMD-SHELL", "mosquitto_sub -t '$SYS/#' -C 1 -W 3 || exit 1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            start_period: "10s".to_string(),
            ..HealthcheckConfig::default()
        }),
        ..ServiceDefinition::new(
            "session-broker",
            ServiceCategory::Live,
            "eclipse-mosquitto:2".to_string(),
        )
    }
}

pub fn session_api_service(
    domain: &str,
    image_tag: &str,
    session_postgres_password: &str,
    session_crypt_key: &str,
) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["session-postgres".to_string(), "session-broker".to_string()],
        networks: vec!["session_network".to_string(), "linto".to_string()],
        traefik_endpoint: Some("/session-api".to_string()),
        traefik_strip_prefix: true,
        expose: vec!["80".to_string()],
        environment: envmap([
            ("BROKER_HOST", "session-broker".to_string()),
            ("BROKER_PORT", "1883".to_string()),
            ("BROKER_PROTOCOL", "mqtt".to_string()),
            ("BROKER_KEEPALIVE", "60".to_string()),
            ("DB_HOST", "session-postgres".to_string()),
            ("DB_PORT", "5432".to_string()),
            ("DB_NAME", "session_DB".to_string()),
            ("DB_USER", "session_user".to_string()),
            ("DB_PASSWORD", session_postgres_password.to_string()),
            ("SESSION_API_BASE_PATH", "/".to_string()),
            ("SESSION_API_WEBSERVER_HTTP_PORT", "80".to_string()),
            ("STREAMING_HOST", "session-transcriber".to_string()),
            ("STREAMING_PASSPHRASE", "false".to_string()),
            ("STREAMING_PROXY_RTMP_HOST", domain.to_string()),
            ("STREAMING_PROXY_RTMP_TCP_PORT", "1935".to_string()),
            ("STREAMING_PROXY_SRT_HOST", domain.to_string()),
            ("STREAMING_PROXY_SRT_UDP_PORT", "8889".to_string()),
            ("STREAMING_PROXY_WS_HOST", domain.to_string()),
            ("STREAMING_PROXY_WS_TCP_PORT", "443".to_string()),
            ("STREAMING_WS_SECURE", "true".to_string()),
            ("SECURITY_CRYPT_KEY", session_crypt_key.to_string()),
            ("LOG_FORMAT", "text".to_string()),
            ("LOG_LEVEL", "debug".to_string()),
        ]),
        ..ServiceDefinition::new(
            "session-api",
            ServiceCategory::Live,
            format!("lintoai/studio-plugins-sessionapi:{image_tag}"),
        )
    }
}

pub fn session_scheduler_service(image_tag: &str, session_postgres_password: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["session-postgres".to_string(), "session-broker".to_string()],
        networks: vec!["session_network".to_string(), "net_studio".to_string()],
        environment: envmap([
            ("BROKER_HOST", "session-broker".to_string()),
            ("BROKER_PORT", "1883".to_string()),
            ("BROKER_PROTOCOL", "mqtt".to_string()),
            ("BROKER_KEEPALIVE", "60".to_string()),
            ("DB_HOST", "session-postgres".to_string()),
            ("DB_PORT", "5432".to_string()),
            ("DB_NAME", "session_DB".to_string()),
            ("DB_USER", "session_user".to_string()),
            ("DB_PASSWORD", session_postgres_password.to_string()),
            ("LOG_FORMAT", "text".to_string()),
            ("LOG_LEVEL", "debug".to_string()),
            ("SCHEDULER_WEBSERVER_HTTP_PORT", "80".to_string()),
        ]),
        ..ServiceDefinition::new(
            "session-scheduler",
            ServiceCategory::Live,
            format!("lintoai/studio-plugins-scheduler:{image_tag}"),
        )
    }
}

/// The transcriber terminates SRT and RTMP streams, which are not HTTP, so
/// the generic traefik label helper cannot route them. The raw TCP/UDP
/// router labels are emitted by hand through `extra_labels`.
pub fn session_transcriber_service(
    domain: &str,
    image_tag: &str,
    replicas: u32,
    session_crypt_key: &str,
) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["session-broker".to_string()],
        networks: vec!["linto".to_string(), "session_network".to_string()],
        traefik_endpoint: Some("/transcriber-ws".to_string()),
        traefik_strip_prefix: true,
        traefik_server_port: 8080,
        expose: vec!["8889/udp".to_string(), "1935".to_string(), "8080".to_string()],
        volumes: vec![VolumeMount::new("session_audio_data", "/session_audio")],
        environment: envmap([
            ("BROKER_HOST", "session-broker".to_string()),
            ("BROKER_PORT", "1883".to_string()),
            ("BROKER_PROTOCOL", "mqtt".to_string()),
            ("BROKER_KEEPALIVE", "60".to_string()),
            ("AUDIO_STORAGE_PATH", "/session_audio".to_string()),
            ("STREAMING_PROTOCOLS", "SRT,RTMP,WS".to_string()),
            ("STREAMING_SRT_MODE", "listener".to_string()),
            ("STREAMING_SRT_UDP_PORT", "8889".to_string()),
            ("STREAMING_RTMP_TCP_PORT", "1935".to_string()),
            ("STREAMING_RTMP_SECURE", "false".to_string()),
            ("STREAMING_WS_TCP_PORT", "8080".to_string()),
            ("STREAMING_WS_ENDPOINT", "transcriber-ws".to_string()),
            ("STREAMING_WS_SECURE", "true".to_string()),
            ("STREAMING_PASSPHRASE", "false".to_string()),
            ("STREAMING_HEALTHCHECK_TCP", "9999".to_string()),
            ("STREAMING_PROXY_RTMP_HOST", domain.to_string()),
            ("STREAMING_PROXY_RTMP_TCP_PORT", "1935".to_string()),
            ("STREAMING_PROXY_SRT_HOST", domain.to_string()),
            ("STREAMING_PROXY_SRT_UDP_PORT", "8889".to_string()),
            ("STREAMING_PROXY_WS_HOST", domain.to_string()),
            ("STREAMING_PROXY_WS_TCP_PORT", "443".to_string()),
            ("SECURITY_CRYPT_KEY", session_crypt_key.to_string()),
            ("LOG_FORMAT", "text".to_string()),
            ("LOG_LEVEL", "debug".to_string()),
        ]),
        deploy: Some(DeployConfig {
            replicas,
            ..DeployConfig::default()
        }),
        extra_labels: [
            "traefik.udp.routers.session-transcriber-srt.entrypoints=srt",
            "traefik.udp.routers.session-transcriber-srt.service=session-transcriber-srt",
            "traefik.udp.services.session-transcriber-srt.loadbalancer.server.port=8889",
            "traefik.tcp.routers.session-transcriber-rtmp.entrypoints=rtmp",
            "traefik.tcp.routers.session-transcriber-rtmp.rule=HostSNI(`*`)",
            "traefik.tcp.routers.session-transcriber-rtmp.service=session-transcriber-rtmp",
            "traefik.tcp.services.session-transcriber-rtmp.loadbalancer.server.port=1935",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        ..ServiceDefinition::new(
            "session-transcriber",
            ServiceCategory::Live,
            format!("lintoai/studio-plugins-transcriber:{image_tag}"),
        )
    }
}

// ---------------------------------------------------------------------------
// Streaming STT services
// ---------------------------------------------------------------------------

fn stt_whisper_streaming_service(image_tag: &str, use_gpu: bool) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["session_network".to_string()],
        environment: envmap([
            ("SERVICE_MODE", "websocket".to_string()),
            ("MODEL", "large-v3-turbo".to_string()),
            ("LANGUAGE", "*".to_string()),
            ("DEVICE", if use_gpu { "cuda" } else { "cpu" }.to_string()),
            ("VAD", "true".to_string()),
            ("STREAMING_MIN_CHUNK_SIZE", "0.5".to_string()),
            ("STREAMING_BUFFER_TRIMMING_SEC", "8".to_string()),
            ("STREAMING_PAUSE_FOR_FINAL", "1.0".to_string()),
        ]),
        gpu_required: use_gpu,
        ..ServiceDefinition::new(
            "stt-whisper-streaming",
            ServiceCategory::Live,
            format!("lintoai/linto-stt-whisper:{image_tag}"),
        )
    }
}

fn stt_kaldi_french_streaming_service(image_tag: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["session_network".to_string()],
        environment: envmap([
            ("SERVICE_MODE", "websocket".to_string()),
            ("LANGUAGE", "fr-FR".to_string()),
        ]),
        ..ServiceDefinition::new(
            "stt-kaldi-french-streaming",
            ServiceCategory::Live,
            format!("lintoai/linto-stt-kaldi:{image_tag}"),
        )
    }
}

fn stt_nemo_streaming_service(name: &str, image_tag: &str, language: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["session_network".to_string()],
        environment: envmap([
            ("SERVICE_MODE", "websocket".to_string()),
            ("LANGUAGE", language.to_string()),
            ("DEVICE", "cuda".to_string()),
        ]),
        gpu_required: true,
        ..ServiceDefinition::new(name, ServiceCategory::Live, format!("lintoai/linto-stt-nemo:{image_tag}"))
    }
}

fn stt_kyutai_streaming_service(image_tag: &str, gpu_architecture: GpuArchitecture) -> ServiceDefinition {
    // Image tag carries the architecture suffix.
    let full_tag = format!("{image_tag}-{}", gpu_architecture.as_str());
    ServiceDefinition {
        networks: vec!["session_network".to_string()],
        environment: envmap([("DEVICE", "cuda".to_string())]),
        gpu_required: true,
        ..ServiceDefinition::new(
            "stt-kyutai-streaming",
            ServiceCategory::Live,
            format!("lintoai/kyutai-moshi-stt-server-cuda:{full_tag}"),
        )
    }
}

/// Streaming STT dispatch over the five variants.
///
/// The kyutai branch errors when the GPU architecture is missing. Profile
/// validation already forbids that combination, so the error path is a
/// defensive assertion against callers bypassing validation.
pub fn streaming_stt_service(
    variant: StreamingSttVariant,
    image_tag: &str,
    gpu_architecture: Option<GpuArchitecture>,
) -> Result<ServiceDefinition> {
    match variant {
        StreamingSttVariant::Whisper => Ok(stt_whisper_streaming_service(image_tag, true)),
        StreamingSttVariant::KaldiFrench => Ok(stt_kaldi_french_streaming_service(image_tag)),
        StreamingSttVariant::NemoFrench => {
            Ok(stt_nemo_streaming_service("stt-nemo-french-streaming", image_tag, "fr-FR"))
        }
        StreamingSttVariant::NemoEnglish => {
            Ok(stt_nemo_streaming_service("stt-nemo-english-streaming", image_tag, "en-US"))
        }
        StreamingSttVariant::Kyutai => match gpu_architecture {
            Some(architecture) => Ok(stt_kyutai_streaming_service(image_tag, architecture)),
            None => Err(DeployError::ConfigInvalid("Kyutai requires gpu_architecture".to_string())),
        },
    }
}

// ---------------------------------------------------------------------------
// LLM services
// ---------------------------------------------------------------------------

pub fn llm_postgres_service(password: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["net_llm_services".to_string()],
        volumes: vec![VolumeMount::new("llm_postgres_data", "/var/lib/postgresql/data")],
        environment: envmap([
            ("POSTGRES_DB", "llm_DB".to_string()),
            ("POSTGRES_USER", "llm_user".to_string()),
            ("POSTGRES_PASSWORD", password.to_string()),
        ]),
        deploy: Some(DeployConfig {
            placement_constraints: vec!["node.role==manager".to_string()],
            ..DeployConfig::default()
        }),
        healthcheck: Some(HealthcheckConfig {
            test: ["CMD-SHELL", "pg_isready -U llm_user -d llm_DB"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..HealthcheckConfig::default()
        }),
        ..ServiceDefinition::new("llm-postgres", ServiceCategory::Llm, "postgres:15-alpine".to_string())
    }
}

pub fn llm_redis_service(password: &str) -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["net_llm_services".to_string()],
        command: Some(ServiceCommand::Shell(format!(
            "/bin/sh -c 'redis-stack-server --requirepass {password}'"
        ))),
        volumes: vec![VolumeMount::new("llm_redis_data", "/data")],
        healthcheck: Some(redis_healthcheck()),
        ..ServiceDefinition::new(
            "llm-redis",
            ServiceCategory::Llm,
            "redis/redis-stack-server:latest".to_string(),
        )
    }
}

/// Web-server half of the gateway. Shares its image with the celery worker;
/// the two differ only by command.
pub fn llm_gateway_api_service(
    image_tag: &str,
    openai_api_base: &str,
    openai_api_token: &str,
    redis_password: &str,
) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["llm-redis".to_string()],
        networks: vec!["net_llm_services".to_string(), "linto".to_string()],
        traefik_endpoint: Some("/llm-gateway".to_string()),
        traefik_strip_prefix: true,
        command: Some(ServiceCommand::shell("-m app --debug")),
        volumes: vec![
            VolumeMount::new("llm_models_cache", "/root/.cache"),
            VolumeMount::new("./.linto/llm/hydra-conf", "/usr/src/.hydra-conf"),
            VolumeMount::new("./.linto/llm/prompts", "/usr/src/prompts"),
        ],
        environment: envmap([
            ("SERVICES_BROKER", "redis://llm-redis:6379".to_string()),
            ("BROKER_PASS", redis_password.to_string()),
            ("OPENAI_API_BASE", openai_api_base.to_string()),
            ("OPENAI_API_TOKEN", openai_api_token.to_string()),
            ("HTTP_PORT", "80".to_string()),
            ("CONCURRENCY", "1".to_string()),
            ("SERVICE_NAME", "LLM_Gateway".to_string()),
            ("SWAGGER_PATH", "../document/swagger_llm_gateway.yml".to_string()),
            ("SWAGGER_PREFIX", "/llm-gateway".to_string()),
            ("SWAGGER_URL", "/llm-gateway".to_string()),
            ("PYTHONUNBUFFERED", "1".to_string()),
            ("TIMEOUT", "60".to_string()),
            ("RESULT_DB_PATH", "./results.sqlite".to_string()),
        ]),
        ..ServiceDefinition::new(
            "llm-gateway-api",
            ServiceCategory::Llm,
            format!("lintoai/llm-gateway:{image_tag}"),
        )
    }
}

pub fn llm_celery_worker_service(
    image_tag: &str,
    redis_password: &str,
    openai_api_base: &str,
    openai_api_token: &str,
) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["llm-redis".to_string(), "llm-postgres".to_string()],
        networks: vec!["net_llm_services".to_string()],
        command: Some(ServiceCommand::shell(
            "celery -A app.celery.celery_app worker --loglevel=info",
        )),
        environment: envmap([
            ("SERVICES_BROKER", "redis://llm-redis:6379".to_string()),
            ("BROKER_PASS", redis_password.to_string()),
            ("OPENAI_API_BASE", openai_api_base.to_string()),
            ("OPENAI_API_TOKEN", openai_api_token.to_string()),
            ("PYTHONUNBUFFERED", "1".to_string()),
            ("CONCURRENCY", "1".to_string()),
        ]),
        ..ServiceDefinition::new(
            "llm-celery-worker",
            ServiceCategory::Llm,
            format!("lintoai/llm-gateway:{image_tag}"),
        )
    }
}

pub fn llm_gateway_frontend_service(domain: &str, image_tag: &str) -> ServiceDefinition {
    ServiceDefinition {
        depends_on: vec!["llm-gateway-api".to_string()],
        networks: vec!["net_llm_services".to_string(), "linto".to_string()],
        traefik_endpoint: Some("/llm-admin".to_string()),
        environment: envmap([("NEXT_PUBLIC_API_URL", format!("https://{domain}/llm-gateway"))]),
        ..ServiceDefinition::new(
            "llm-gateway-frontend",
            ServiceCategory::Llm,
            format!("lintoai/llm-gateway-frontend:{image_tag}"),
        )
    }
}

pub fn vllm_service() -> ServiceDefinition {
    ServiceDefinition {
        networks: vec!["net_llm_services".to_string(), "linto".to_string()],
        command: Some(ServiceCommand::shell(
            "--model casperhansen/llama-3-8b-instruct-awq --quantization awq --gpu-memory-utilization 0.65",
        )),
        volumes: vec![VolumeMount::new("vllm_models_cache", "/root/.cache/huggingface")],
        environment: envmap([
            ("NVIDIA_DRIVER_CAPABILITIES", "all".to_string()),
            ("NVIDIA_VISIBLE_DEVICES", "0".to_string()),
        ]),
        gpu_required: true,
        deploy: Some(DeployConfig {
            placement_constraints: vec!["node.labels.ip==ingress".to_string()],
            ..DeployConfig::default()
        }),
        ..ServiceDefinition::new("vllm-service", ServiceCategory::Llm, "vllm/vllm-openai:latest".to_string())
    }
}
