//! Service catalog: one pure factory per deployable unit.
//!
//! Factories take only the fields they need, never a whole profile. That
//! keeps the business logic (images, env var names, dependency edges)
//! identical across backends while only the rendering differs.

mod services;

pub use services::*;

/// Ingress network every externally routed service joins.
pub const BASE_NETWORK: &str = "linto";

pub const STUDIO_NETWORKS: &[&str] = &["net_studio"];
pub const STT_NETWORKS: &[&str] = &["net_stt_services", "task_broker_services"];
pub const SESSION_NETWORKS: &[&str] = &["session_network"];
pub const LLM_NETWORKS: &[&str] = &["net_llm_services"];
