//! Service definition model.
//!
//! A `ServiceDefinition` is the backend-agnostic node produced by the
//! catalog factories. Backend-specific shape (compose service dict, swarm
//! deploy block, Helm values subtree) is derived by the renderers, never
//! stored here.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Deployable unit category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Studio,
    Stt,
    Infra,
    Live,
    Llm,
}

/// Volume mount configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeMount {
    pub fn new(source: &str, target: &str) -> Self {
        VolumeMount {
            source: source.to_string(),
            target: target.to_string(),
            read_only: false,
        }
    }

    pub fn read_only(source: &str, target: &str) -> Self {
        VolumeMount {
            source: source.to_string(),
            target: target.to_string(),
            read_only: true,
        }
    }

    /// Short `source:target[:ro]` syntax used by compose and stack files.
    pub fn to_spec(&self) -> String {
        if self.read_only {
            format!("{}:{}:ro", self.source, self.target)
        } else {
            format!("{}:{}", self.source, self.target)
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthcheckConfig {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    pub start_period: String,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        HealthcheckConfig {
            test: Vec::new(),
            interval: "30s".to_string(),
            timeout: "10s".to_string(),
            retries: 3,
            start_period: "30s".to_string(),
        }
    }
}

/// Restart policy for swarm deploy blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartPolicy {
    pub condition: String,
    #[serde(default)]
    pub delay: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub window: Option<String>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy {
            condition: "on-failure".to_string(),
            delay: None,
            max_attempts: None,
            window: None,
        }
    }
}

/// Resource limits/reservations for swarm deploy blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(default)]
    pub cpus: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub limits: Option<ResourceSpec>,
    #[serde(default)]
    pub reservations: Option<ResourceSpec>,
}

/// Swarm deploy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    pub mode: String,
    pub replicas: u32,
    #[serde(default)]
    pub placement_constraints: Vec<String>,
    #[serde(default)]
    pub resources: Option<Resources>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub restart_policy: Option<RestartPolicy>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        DeployConfig {
            mode: "replicated".to_string(),
            replicas: 1,
            placement_constraints: Vec::new(),
            resources: None,
            labels: Vec::new(),
            restart_policy: None,
        }
    }
}

/// Container command: a shell string or an argv list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl ServiceCommand {
    pub fn shell(command: &str) -> Self {
        ServiceCommand::Shell(command.to_string())
    }

    pub fn argv<const N: usize>(args: [&str; N]) -> Self {
        ServiceCommand::Argv(args.iter().map(|a| a.to_string()).collect())
    }
}

/// Definition of a deployable service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub category: ServiceCategory,
    pub image: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub ports: Vec<String>,
    /// Internal ports, used by swarm stacks.
    #[serde(default)]
    pub expose: Vec<String>,
    #[serde(default)]
    pub command: Option<ServiceCommand>,
    #[serde(default)]
    pub traefik_endpoint: Option<String>,
    #[serde(default)]
    pub traefik_strip_prefix: bool,
    pub traefik_server_port: u16,
    #[serde(default)]
    pub healthcheck: Option<HealthcheckConfig>,
    pub restart: String,
    #[serde(default)]
    pub deploy: Option<DeployConfig>,
    #[serde(default)]
    pub gpu_required: bool,
    /// Labels the generic traefik helper cannot express (raw TCP/UDP
    /// routers for SRT/RTMP).
    #[serde(default)]
    pub extra_labels: Vec<String>,
}

impl ServiceDefinition {
    pub fn new(name: &str, category: ServiceCategory, image: String) -> Self {
        ServiceDefinition {
            name: name.to_string(),
            category,
            image,
            depends_on: Vec::new(),
            networks: Vec::new(),
            volumes: Vec::new(),
            environment: IndexMap::new(),
            ports: Vec::new(),
            expose: Vec::new(),
            command: None,
            traefik_endpoint: None,
            traefik_strip_prefix: false,
            traefik_server_port: 80,
            healthcheck: None,
            restart: "unless-stopped".to_string(),
            deploy: None,
            gpu_required: false,
            extra_labels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_mount_spec() {
        assert_eq!(VolumeMount::new("data", "/data").to_spec(), "data:/data");
        assert_eq!(
            VolumeMount::read_only("/var/run/docker.sock", "/var/run/docker.sock").to_spec(),
            "/var/run/docker.sock:/var/run/docker.sock:ro"
        );
    }

    #[test]
    fn test_service_command_serialization() {
        let shell = ServiceCommand::shell("mosquitto -c /mosquitto-no-auth.conf");
        assert_eq!(
            serde_json::to_string(&shell).unwrap(),
            "\"mosquitto -c /mosquitto-no-auth.conf\""
        );
        let argv = ServiceCommand::argv(["redis-server", "--requirepass", "pw"]);
        assert_eq!(
            serde_json::to_string(&argv).unwrap(),
            "[\"redis-server\",\"--requirepass\",\"pw\"]"
        );
    }
}
