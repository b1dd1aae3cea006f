//! Shared conversion logic for the compose and swarm renderers.
//!
//! Traefik label generation is deliberately backend-independent: both stack
//! renderers attach the exact same routing labels, only their placement in
//! the document differs (service-level for compose, deploy-level for swarm).

use serde_yaml::{Mapping, Value};

use crate::model::{ServiceDefinition, TlsMode};
use crate::render::artifact::{
    ComposeService, DeploySpec, HealthcheckSpec, PlacementSpec, ResourceLimitsSpec, ResourcesSpec,
    RestartPolicySpec, SwarmService,
};

/// Generate traefik routing labels for a service.
///
/// Root-path services act as catch-all routers and get `priority=1` so any
/// longer PathPrefix match wins.
pub fn generate_traefik_labels(
    service_name: &str,
    endpoint: &str,
    domain: &str,
    strip_prefix: bool,
    tls_mode: TlsMode,
    server_port: u16,
) -> Vec<String> {
    let router_name = service_name.replace('-', "_");
    let tls_enabled = tls_mode.enabled();
    let entrypoint = if tls_enabled { "websecure" } else { "web" };

    let mut labels = vec![
        "traefik.enable=true".to_string(),
        format!("traefik.http.routers.{router_name}.entrypoints={entrypoint}"),
        format!("traefik.http.services.{router_name}.loadbalancer.server.port={server_port}"),
    ];

    if endpoint == "/" {
        labels.push(format!("traefik.http.routers.{router_name}.rule=Host(`{domain}`)"));
        labels.push(format!("traefik.http.routers.{router_name}.priority=1"));
    } else {
        labels.push(format!(
            "traefik.http.routers.{router_name}.rule=Host(`{domain}`) && PathPrefix(`{endpoint}`)"
        ));
    }

    if tls_enabled {
        labels.push(format!("traefik.http.routers.{router_name}.tls=true"));
        if tls_mode == TlsMode::Acme {
            labels.push(format!("traefik.http.routers.{router_name}.tls.certresolver=leresolver"));
        }
    }

    if strip_prefix && endpoint != "/" {
        let middleware_name = format!("{router_name}_strip");
        labels.push(format!(
            "traefik.http.middlewares.{middleware_name}.stripPrefix.prefixes={endpoint}"
        ));
        labels.push(format!("traefik.http.routers.{router_name}.middlewares={middleware_name}"));
    }

    labels
}

fn service_labels(service: &ServiceDefinition, domain: &str, tls_mode: TlsMode) -> Vec<String> {
    let mut labels = Vec::new();
    if let Some(endpoint) = &service.traefik_endpoint {
        labels = generate_traefik_labels(
            &service.name,
            endpoint,
            domain,
            service.traefik_strip_prefix,
            tls_mode,
            service.traefik_server_port,
        );
    }
    labels.extend(service.extra_labels.iter().cloned());
    labels
}

fn healthcheck_spec(service: &ServiceDefinition) -> Option<HealthcheckSpec> {
    service.healthcheck.as_ref().map(|hc| HealthcheckSpec {
        test: hc.test.clone(),
        interval: hc.interval.clone(),
        timeout: hc.timeout.clone(),
        retries: hc.retries,
        start_period: hc.start_period.clone(),
    })
}

/// Convert a service definition into a compose service entry.
pub fn to_compose_service(service: &ServiceDefinition, domain: &str, tls_mode: TlsMode) -> ComposeService {
    ComposeService {
        image: service.image.clone(),
        restart: service.restart.clone(),
        depends_on: service.depends_on.clone(),
        networks: service.networks.clone(),
        volumes: service.volumes.iter().map(|v| v.to_spec()).collect(),
        environment: service.environment.clone(),
        ports: service.ports.clone(),
        expose: service.expose.clone(),
        command: service.command.clone(),
        healthcheck: healthcheck_spec(service),
        labels: service_labels(service, domain, tls_mode),
    }
}

/// Convert a service definition into a swarm stack entry.
///
/// Swarm drops `depends_on` (ordering comes from healthchecks and restart
/// policies) and moves replicas/placement/resources/labels into `deploy`.
pub fn to_swarm_service(service: &ServiceDefinition, domain: &str, tls_mode: TlsMode) -> SwarmService {
    let mut deploy = match &service.deploy {
        Some(config) => DeploySpec {
            mode: config.mode.clone(),
            replicas: config.replicas,
            placement: (!config.placement_constraints.is_empty()).then(|| PlacementSpec {
                constraints: config.placement_constraints.clone(),
            }),
            resources: config.resources.as_ref().and_then(|resources| {
                let limits = resources.limits.as_ref().and_then(limits_spec);
                let reservations = resources.reservations.as_ref().and_then(limits_spec);
                (limits.is_some() || reservations.is_some()).then_some(ResourcesSpec { limits, reservations })
            }),
            restart_policy: config.restart_policy.as_ref().map(|policy| RestartPolicySpec {
                condition: policy.condition.clone(),
                delay: policy.delay.clone(),
                max_attempts: policy.max_attempts,
                window: policy.window.clone(),
            }),
            labels: Vec::new(),
        },
        None => DeploySpec::default(),
    };

    let mut labels = service_labels(service, domain, tls_mode);
    if let Some(config) = &service.deploy {
        labels.extend(config.labels.iter().cloned());
    }
    deploy.labels = labels;

    SwarmService {
        image: service.image.clone(),
        networks: service.networks.clone(),
        volumes: service.volumes.iter().map(|v| v.to_spec()).collect(),
        environment: service.environment.clone(),
        ports: service.ports.clone(),
        expose: service.expose.clone(),
        command: service.command.clone(),
        healthcheck: healthcheck_spec(service),
        deploy,
    }
}

fn limits_spec(spec: &crate::model::ResourceSpec) -> Option<ResourceLimitsSpec> {
    (spec.cpus.is_some() || spec.memory.is_some()).then(|| ResourceLimitsSpec {
        cpus: spec.cpus.clone(),
        memory: spec.memory.clone(),
    })
}

/// Traefik dynamic file-provider configuration for mkcert/custom TLS.
pub fn traefik_dynamic_config(domain: &str) -> Value {
    let cert_file = format!("/certs/{domain}.pem");
    let key_file = format!("/certs/{domain}-key.pem");

    let mut certificate = Mapping::new();
    certificate.insert("certFile".into(), cert_file.clone().into());
    certificate.insert("keyFile".into(), key_file.clone().into());

    let mut default_certificate = Mapping::new();
    default_certificate.insert("certFile".into(), cert_file.into());
    default_certificate.insert("keyFile".into(), key_file.into());

    let mut default_store = Mapping::new();
    default_store.insert("defaultCertificate".into(), Value::Mapping(default_certificate));

    let mut stores = Mapping::new();
    stores.insert("default".into(), Value::Mapping(default_store));

    let mut tls = Mapping::new();
    tls.insert("certificates".into(), Value::Sequence(vec![Value::Mapping(certificate)]));
    tls.insert("stores".into(), Value::Mapping(stores));

    let mut root = Mapping::new();
    root.insert("tls".into(), Value::Mapping(tls));
    Value::Mapping(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::model::{DeployConfig, ServiceCategory};

    #[test]
    fn test_root_path_gets_catchall_priority() {
        let labels = generate_traefik_labels("studio-frontend", "/", "example.com", false, TlsMode::Off, 80);
        assert!(labels.contains(&"traefik.http.routers.studio_frontend.rule=Host(`example.com`)".to_string()));
        assert!(labels.contains(&"traefik.http.routers.studio_frontend.priority=1".to_string()));
        assert!(labels.contains(&"traefik.http.routers.studio_frontend.entrypoints=web".to_string()));
        assert!(!labels.iter().any(|l| l.contains("tls")));
    }

    #[test]
    fn test_path_prefix_with_strip_middleware() {
        let labels = generate_traefik_labels("studio-api", "/cm-api", "example.com", true, TlsMode::Mkcert, 80);
        assert!(labels.contains(
            &"traefik.http.routers.studio_api.rule=Host(`example.com`) && PathPrefix(`/cm-api`)".to_string()
        ));
        assert!(
            labels.contains(&"traefik.http.middlewares.studio_api_strip.stripPrefix.prefixes=/cm-api".to_string())
        );
        assert!(labels.contains(&"traefik.http.routers.studio_api.middlewares=studio_api_strip".to_string()));
        assert!(labels.contains(&"traefik.http.routers.studio_api.tls=true".to_string()));
        assert!(labels.contains(&"traefik.http.routers.studio_api.entrypoints=websecure".to_string()));
    }

    #[test]
    fn test_acme_adds_cert_resolver() {
        let labels = generate_traefik_labels("studio-api", "/cm-api", "example.com", false, TlsMode::Acme, 80);
        assert!(labels.contains(&"traefik.http.routers.studio_api.tls.certresolver=leresolver".to_string()));
    }

    #[test]
    fn test_swarm_conversion_drops_depends_on_and_defaults_deploy() {
        let service = catalog::studio_api_service(
            "example.com",
            "latest",
            "jwt",
            "refresh",
            "admin@example.com",
            "password",
            false,
            false,
            false,
        );
        assert!(!service.depends_on.is_empty());

        let swarm = to_swarm_service(&service, "example.com", TlsMode::Off);
        assert_eq!(swarm.deploy.mode, "replicated");
        assert_eq!(swarm.deploy.replicas, 1);
        // depends_on has no representation in a stack file.
        let yaml = serde_yaml::to_string(&swarm).unwrap();
        assert!(!yaml.contains("depends_on"));
    }

    #[test]
    fn test_swarm_conversion_keeps_placement_constraints() {
        let mut service = catalog::session_postgres_service("pw");
        service.deploy = Some(DeployConfig {
            placement_constraints: vec!["node.role==manager".to_string()],
            ..DeployConfig::default()
        });
        let swarm = to_swarm_service(&service, "example.com", TlsMode::Off);
        assert_eq!(
            swarm.deploy.placement.unwrap().constraints,
            vec!["node.role==manager".to_string()]
        );
    }

    #[test]
    fn test_extra_labels_appended_after_traefik_labels() {
        let mut service = ServiceDefinition::new("svc", ServiceCategory::Infra, "img:1".to_string());
        service.traefik_endpoint = Some("/svc".to_string());
        service.extra_labels = vec!["custom.label=1".to_string()];
        let compose = to_compose_service(&service, "example.com", TlsMode::Off);
        assert_eq!(compose.labels.last().unwrap(), "custom.label=1");
        assert!(compose.labels.iter().any(|l| l == "traefik.enable=true"));
    }

    #[test]
    fn test_dynamic_config_points_at_domain_certs() {
        let config = traefik_dynamic_config("example.com");
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("/certs/example.com.pem"));
        assert!(yaml.contains("/certs/example.com-key.pem"));
        assert!(yaml.contains("defaultCertificate"));
    }
}
