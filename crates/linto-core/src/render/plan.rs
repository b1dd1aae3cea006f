//! Feature-gated service selection shared by the compose and swarm
//! renderers.
//!
//! Both stack backends walk the same decision tree (studio → stt →
//! live-session → llm); only the per-service conversion differs. The plan
//! captures that tree once: which services to emit, which networks each
//! block brings, and which named volumes they need, in a stable order.

use crate::catalog;
use crate::error::Result;
use crate::model::{ProfileConfig, ServiceDefinition};

#[derive(Debug, Clone)]
pub struct StackPlan {
    pub services: Vec<ServiceDefinition>,
    /// Feature networks beyond the base ingress network, in insertion order.
    pub networks: Vec<&'static str>,
    /// Named volumes, in insertion order.
    pub volumes: Vec<&'static str>,
}

/// Select catalog services for a stack deployment of this profile.
///
/// The profile must already be validated; secrets may still be unset, in
/// which case the affected env values are empty strings.
pub fn plan_stack(profile: &ProfileConfig) -> Result<StackPlan> {
    let mut services = Vec::new();
    let mut networks: Vec<&'static str> = Vec::new();
    let mut volumes: Vec<&'static str> = Vec::new();

    let domain = profile.domain.as_str();
    let image_tag = profile.image_tag.as_str();
    let tls_mode = profile.tls_mode.as_str();

    services.push(catalog::traefik_service(domain, tls_mode));

    if profile.studio_enabled {
        networks.extend(catalog::STUDIO_NETWORKS);

        services.push(catalog::studio_mongodb_service());
        volumes.push("studio_mongodb_data");

        services.push(catalog::studio_api_service(
            domain,
            image_tag,
            profile.jwt_secret.as_deref().unwrap_or_default(),
            profile.jwt_refresh_secret.as_deref().unwrap_or_default(),
            &profile.super_admin_email,
            profile.super_admin_password.as_deref().unwrap_or_default(),
            profile.live_session_enabled,
            profile.llm_enabled,
            profile.stt_enabled,
        ));
        services.push(catalog::studio_frontend_service(domain, image_tag));
        services.push(catalog::studio_websocket_service(
            domain,
            image_tag,
            profile.jwt_secret.as_deref().unwrap_or_default(),
        ));
    }

    if profile.stt_enabled {
        networks.extend(catalog::STT_NETWORKS);

        let redis_password = profile.redis_password.as_deref().unwrap_or_default();

        services.push(catalog::api_gateway_service(image_tag));

        services.push(catalog::stt_mongo_service());
        volumes.push("stt_mongodb_data");

        services.push(catalog::task_broker_redis_service(redis_password));
        volumes.push("task_broker_redis_data");

        services.push(catalog::stt_whisper_service(image_tag, redis_password));
        services.push(catalog::stt_whisper_workers_service(image_tag, redis_password));
        services.push(catalog::diarization_pyannote_service(image_tag, redis_password));
    }

    if profile.live_session_enabled {
        networks.extend(catalog::SESSION_NETWORKS);

        let postgres_password = profile.session_postgres_password.as_deref().unwrap_or_default();
        let crypt_key = profile.session_crypt_key.as_deref().unwrap_or_default();

        services.push(catalog::session_postgres_service(postgres_password));
        volumes.push("session_postgres_data");

        services.push(catalog::session_postgres_migration_service(image_tag, postgres_password));
        services.push(catalog::session_broker_service());
        services.push(catalog::session_api_service(domain, image_tag, postgres_password, crypt_key));
        services.push(catalog::session_scheduler_service(image_tag, postgres_password));

        services.push(catalog::session_transcriber_service(
            domain,
            image_tag,
            profile.session_transcriber_replicas,
            crypt_key,
        ));
        volumes.push("session_audio_data");

        for variant in &profile.streaming_stt_variants {
            services.push(catalog::streaming_stt_service(
                *variant,
                image_tag,
                profile.kyutai_gpu_architecture,
            )?);
        }
    }

    if profile.llm_enabled {
        networks.extend(catalog::LLM_NETWORKS);

        let redis_password = profile.llm_redis_password.as_deref().unwrap_or_default();
        let openai_api_base = profile.resolved_openai_api_base();
        let openai_api_token = profile.openai_api_token.as_deref().unwrap_or_default();

        services.push(catalog::llm_postgres_service(
            profile.llm_postgres_password.as_deref().unwrap_or_default(),
        ));
        volumes.push("llm_postgres_data");

        services.push(catalog::llm_redis_service(redis_password));
        volumes.push("llm_redis_data");

        services.push(catalog::llm_gateway_api_service(
            image_tag,
            &openai_api_base,
            openai_api_token,
            redis_password,
        ));
        volumes.push("llm_models_cache");

        services.push(catalog::llm_celery_worker_service(
            image_tag,
            redis_password,
            &openai_api_base,
            openai_api_token,
        ));
        services.push(catalog::llm_gateway_frontend_service(domain, image_tag));

        if profile.vllm_enabled {
            services.push(catalog::vllm_service());
            volumes.push("vllm_models_cache");
        }
    }

    Ok(StackPlan {
        services,
        networks,
        volumes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TlsMode;

    #[test]
    fn test_minimal_plan_has_only_traefik_and_studio() {
        let profile = ProfileConfig {
            stt_enabled: false,
            tls_mode: TlsMode::Off,
            ..ProfileConfig::default()
        };
        let plan = plan_stack(&profile).unwrap();
        let names: Vec<_> = plan.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["traefik", "studio-mongodb", "studio-api", "studio-frontend", "studio-websocket"]
        );
        assert_eq!(plan.networks, ["net_studio"]);
        assert_eq!(plan.volumes, ["studio_mongodb_data"]);
    }

    #[test]
    fn test_vllm_only_present_when_enabled() {
        let mut profile = ProfileConfig {
            studio_enabled: false,
            stt_enabled: false,
            llm_enabled: true,
            ..ProfileConfig::default()
        };
        let plan = plan_stack(&profile).unwrap();
        assert!(!plan.services.iter().any(|s| s.name == "vllm-service"));

        profile.vllm_enabled = true;
        let plan = plan_stack(&profile).unwrap();
        assert!(plan.services.iter().any(|s| s.name == "vllm-service"));
        assert!(plan.volumes.contains(&"vllm_models_cache"));
    }
}
