//! Rendered artifact documents.
//!
//! Typed shapes for the compose/stack YAML files, plus the artifact
//! container returned by `Backend::render`. Serialization drops empty
//! collections so the emitted YAML carries only the keys a service needs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::ServiceCommand;

/// Output of a render pass: a single stack document for compose/swarm, or
/// one values document per enabled Helm chart for k3s.
#[derive(Debug, Clone)]
pub enum Artifact {
    Compose(ComposeFile),
    Swarm(SwarmFile),
    HelmValues(Vec<ChartValues>),
}

/// Helm chart identity for the k3s backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Studio,
    Stt,
    Live,
    Llm,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [ChartKind::Studio, ChartKind::Stt, ChartKind::Live, ChartKind::Llm];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Studio => "studio",
            ChartKind::Stt => "stt",
            ChartKind::Live => "live",
            ChartKind::Llm => "llm",
        }
    }

    /// Chart directory name under the charts root.
    pub fn chart_dir(&self) -> String {
        format!("linto-{}", self.name())
    }

    /// Helm release name.
    pub fn release(&self) -> String {
        format!("linto-{}", self.name())
    }

    pub fn values_file(&self) -> String {
        format!("{}-values.yaml", self.name())
    }
}

#[derive(Debug, Clone)]
pub struct ChartValues {
    pub chart: ChartKind,
    pub values: serde_yaml::Value,
}

/// `docker-compose.yml` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeFile {
    pub version: String,
    pub services: IndexMap<String, ComposeService>,
    pub networks: IndexMap<String, NetworkSpec>,
    pub volumes: IndexMap<String, VolumeSpec>,
}

/// `stack.yml` document for swarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmFile {
    pub version: String,
    pub services: IndexMap<String, SwarmService>,
    pub networks: IndexMap<String, NetworkSpec>,
    pub volumes: IndexMap<String, VolumeSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
}

impl NetworkSpec {
    pub fn bridge() -> Self {
        NetworkSpec {
            driver: Some("bridge".to_string()),
            external: None,
        }
    }

    pub fn overlay() -> Self {
        NetworkSpec {
            driver: Some("overlay".to_string()),
            external: None,
        }
    }

    pub fn external_overlay() -> Self {
        NetworkSpec {
            driver: Some("overlay".to_string()),
            external: Some(true),
        }
    }
}

/// Named volume declaration; an empty mapping in the emitted YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeSpec {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthcheckSpec {
    pub test: Vec<String>,
    pub interval: String,
    pub timeout: String,
    pub retries: u32,
    pub start_period: String,
}

/// One service entry in a compose file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeService {
    pub image: String,
    pub restart: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expose: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<ServiceCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// One service entry in a swarm stack file. Swarm has no compose-style
/// dependency ordering and puts scheduling concerns in `deploy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmService {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expose: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<ServiceCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckSpec>,
    pub deploy: DeploySpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySpec {
    pub mode: String,
    pub replicas: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl Default for DeploySpec {
    fn default() -> Self {
        DeploySpec {
            mode: "replicated".to_string(),
            replicas: 1,
            placement: None,
            resources: None,
            restart_policy: None,
            labels: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSpec {
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceLimitsSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations: Option<ResourceLimitsSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimitsSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartPolicySpec {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
}
