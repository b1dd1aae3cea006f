use linto_core::model::{GpuArchitecture, ProfileConfig, StreamingSttVariant, TlsMode};
use linto_core::render::compose::render_compose;
use linto_core::secrets::{RandomSecretProvider, SecretProvider};

fn minimal_profile() -> ProfileConfig {
    ProfileConfig {
        name: "test".to_string(),
        domain: "test.local".to_string(),
        tls_mode: TlsMode::Off,
        studio_enabled: true,
        stt_enabled: false,
        live_session_enabled: false,
        llm_enabled: false,
        ..ProfileConfig::default()
    }
}

#[test]
fn minimal_render_contains_exactly_studio_services() {
    let compose = render_compose(&minimal_profile()).unwrap();
    let names: Vec<&str> = compose.services.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        ["traefik", "studio-mongodb", "studio-api", "studio-frontend", "studio-websocket"]
    );
}

#[test]
fn minimal_render_has_no_tls_labels() {
    let compose = render_compose(&minimal_profile()).unwrap();
    for (name, service) in &compose.services {
        assert!(
            !service.labels.iter().any(|l| l.contains(".tls")),
            "service {name} should carry no TLS labels when tls_mode is off"
        );
        assert!(
            !service.labels.iter().any(|l| l.contains("websecure")),
            "service {name} should route through the plain web entrypoint"
        );
    }
}

#[test]
fn rendering_is_idempotent() {
    let mut profile = ProfileConfig {
        live_session_enabled: true,
        llm_enabled: true,
        vllm_enabled: true,
        streaming_stt_variants: vec![StreamingSttVariant::Whisper, StreamingSttVariant::Kyutai],
        kyutai_gpu_architecture: Some(GpuArchitecture::Ada),
        ..ProfileConfig::default()
    };
    RandomSecretProvider.fill(&mut profile);

    let first = serde_yaml::to_string(&render_compose(&profile).unwrap()).unwrap();
    let second = serde_yaml::to_string(&render_compose(&profile).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn traefik_always_present_with_stream_ports() {
    let compose = render_compose(&minimal_profile()).unwrap();
    let traefik = &compose.services["traefik"];
    assert_eq!(traefik.image, "traefik:2.9.1");
    assert!(traefik.ports.contains(&"1935:1935".to_string()));
    assert!(traefik.ports.contains(&"8889:8889/udp".to_string()));
}

#[test]
fn stt_block_adds_gateway_registration() {
    let profile = ProfileConfig {
        stt_enabled: true,
        redis_password: Some("broker-pw".to_string()),
        ..minimal_profile()
    };
    let compose = render_compose(&profile).unwrap();

    assert!(compose.services.contains_key("api-gateway"));
    let whisper = &compose.services["stt-all-whisper-v3-turbo"];
    assert_eq!(whisper.environment["GATEWAY_PROXY_PATH"], "/stt-all-whisper-v3-turbo");
    assert_eq!(whisper.environment["GATEWAY_SERVICE_BASE_URL"], "http://api-gateway");
    assert_eq!(whisper.environment["BROKER_PASS"], "broker-pw");

    assert!(compose.networks.contains_key("net_stt_services"));
    assert!(compose.networks.contains_key("task_broker_services"));
    assert!(compose.volumes.contains_key("task_broker_redis_data"));
}

#[test]
fn studio_api_wiring_follows_feature_flags() {
    let profile = ProfileConfig {
        stt_enabled: true,
        llm_enabled: true,
        live_session_enabled: true,
        ..minimal_profile()
    };
    let compose = render_compose(&profile).unwrap();
    let api = &compose.services["studio-api"];

    assert_eq!(
        api.environment["COMPONENTS"],
        "WebServer,MongoMigration,BrokerClient,IoHandler"
    );
    assert_eq!(api.environment["GATEWAY_SERVICES"], "http://api-gateway");
    assert_eq!(api.environment["LLM_GATEWAY_SERVICES"], "http://llm-gateway-api");
    assert_eq!(api.environment["BROKER_HOST"], "session-broker");
}

#[test]
fn streaming_variants_render_one_service_each() {
    let profile = ProfileConfig {
        live_session_enabled: true,
        streaming_stt_variants: vec![
            StreamingSttVariant::Whisper,
            StreamingSttVariant::KaldiFrench,
            StreamingSttVariant::Kyutai,
        ],
        kyutai_gpu_architecture: Some(GpuArchitecture::Hopper),
        ..minimal_profile()
    };
    let compose = render_compose(&profile).unwrap();

    assert!(compose.services.contains_key("stt-whisper-streaming"));
    assert!(compose.services.contains_key("stt-kaldi-french-streaming"));
    let kyutai = &compose.services["stt-kyutai-streaming"];
    assert_eq!(kyutai.image, "lintoai/kyutai-moshi-stt-server-cuda:latest-unstable-hopper");
}

#[test]
fn llm_gateway_defaults_to_vllm_base_url() {
    let profile = ProfileConfig {
        llm_enabled: true,
        vllm_enabled: true,
        openai_api_base: None,
        ..minimal_profile()
    };
    let compose = render_compose(&profile).unwrap();

    let gateway = &compose.services["llm-gateway-api"];
    assert_eq!(gateway.environment["OPENAI_API_BASE"], "http://vllm-service:8000/v1");
    assert!(compose.services.contains_key("vllm-service"));
    assert!(compose.volumes.contains_key("vllm_models_cache"));
}

#[test]
fn explicit_api_base_wins_over_vllm_default() {
    let profile = ProfileConfig {
        llm_enabled: true,
        vllm_enabled: true,
        openai_api_base: Some("https://api.example.com/v1".to_string()),
        ..minimal_profile()
    };
    let compose = render_compose(&profile).unwrap();
    let gateway = &compose.services["llm-gateway-api"];
    assert_eq!(gateway.environment["OPENAI_API_BASE"], "https://api.example.com/v1");
}

#[test]
fn tls_mkcert_adds_router_tls_flags() {
    let profile = ProfileConfig {
        tls_mode: TlsMode::Mkcert,
        ..minimal_profile()
    };
    let compose = render_compose(&profile).unwrap();
    let api = &compose.services["studio-api"];
    assert!(api.labels.contains(&"traefik.http.routers.studio_api.tls=true".to_string()));
    assert!(
        api.labels
            .contains(&"traefik.http.routers.studio_api.entrypoints=websecure".to_string())
    );
    // mkcert terminates with local certs, no cert resolver involved.
    assert!(!api.labels.iter().any(|l| l.contains("certresolver")));
}

#[test]
fn compose_document_shape() {
    let compose = render_compose(&minimal_profile()).unwrap();
    assert_eq!(compose.version, "3.8");
    assert_eq!(compose.networks["linto"].driver.as_deref(), Some("bridge"));
    assert_eq!(compose.networks["net_studio"].driver.as_deref(), Some("bridge"));
    assert_eq!(compose.networks["linto"].external, None);

    let yaml = serde_yaml::to_string(&compose).unwrap();
    assert!(yaml.contains("services:"));
    assert!(yaml.contains("networks:"));
    assert!(yaml.contains("volumes:"));
}
