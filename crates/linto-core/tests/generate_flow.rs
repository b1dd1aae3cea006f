use tempfile::TempDir;

use linto_core::model::{DeploymentBackend, ProfileConfig, TlsMode};
use linto_core::render::{DeployContext, backend_for};
use linto_core::runner::CommandRunner;
use linto_core::store::ProfileStore;

fn context(temp: &TempDir) -> DeployContext {
    DeployContext::new(temp.path(), CommandRunner::new(false))
}

fn offline_profile(name: &str, backend: DeploymentBackend) -> ProfileConfig {
    // tls off keeps generate free of external tool invocations.
    ProfileConfig {
        name: name.to_string(),
        domain: "test.local".to_string(),
        backend,
        tls_mode: TlsMode::Off,
        ..ProfileConfig::default()
    }
}

#[test]
fn compose_generate_writes_artifacts_and_env() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ProfileStore::new(temp.path());
    store.save(&offline_profile("dev", DeploymentBackend::Compose)).unwrap();

    let backend = backend_for(DeploymentBackend::Compose);
    let compose_path = backend.generate(&ctx, "dev", None).unwrap();

    assert!(compose_path.ends_with(".linto/render/compose/dev/docker-compose.yml"));
    let content = std::fs::read_to_string(&compose_path).unwrap();
    assert!(content.contains("traefik"));
    assert!(content.contains("studio-api"));

    let env = std::fs::read_to_string(compose_path.parent().unwrap().join(".env")).unwrap();
    assert!(env.contains("COMPOSE_PROJECT_NAME=linto-dev"));
    assert!(env.contains("DOMAIN=test.local"));
    assert!(env.contains("IMAGE_TAG=latest-unstable"));
}

#[test]
fn generate_fills_and_persists_secrets_once() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ProfileStore::new(temp.path());
    store.save(&offline_profile("dev", DeploymentBackend::Compose)).unwrap();

    let backend = backend_for(DeploymentBackend::Compose);
    backend.generate(&ctx, "dev", None).unwrap();

    let after_first = store.load("dev").unwrap();
    assert!(after_first.jwt_secret.is_some());
    assert!(after_first.redis_password.is_some());

    backend.generate(&ctx, "dev", None).unwrap();
    let after_second = store.load("dev").unwrap();
    assert_eq!(after_first.jwt_secret, after_second.jwt_secret);
    assert_eq!(after_first.redis_password, after_second.redis_password);
}

#[test]
fn repeated_generate_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ProfileStore::new(temp.path());
    store.save(&offline_profile("dev", DeploymentBackend::Compose)).unwrap();

    let backend = backend_for(DeploymentBackend::Compose);
    let path = backend.generate(&ctx, "dev", None).unwrap();
    let first = std::fs::read_to_string(&path).unwrap();
    let path = backend.generate(&ctx, "dev", None).unwrap();
    let second = std::fs::read_to_string(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn k3s_generate_writes_one_values_file_per_enabled_chart() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ProfileStore::new(temp.path());

    let mut profile = offline_profile("cluster", DeploymentBackend::K3s);
    profile.stt_enabled = true;
    profile.llm_enabled = true;
    store.save(&profile).unwrap();

    let backend = backend_for(DeploymentBackend::K3s);
    let out_dir = backend.generate(&ctx, "cluster", None).unwrap();

    let values_dir = out_dir.join("values");
    assert!(values_dir.join("studio-values.yaml").exists());
    assert!(values_dir.join("stt-values.yaml").exists());
    assert!(values_dir.join("llm-values.yaml").exists());
    assert!(!values_dir.join("live-values.yaml").exists());

    let studio: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(values_dir.join("studio-values.yaml")).unwrap()).unwrap();
    assert_eq!(studio["global"]["domain"].as_str(), Some("test.local"));
}

#[test]
fn generate_honors_explicit_output_dir() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ProfileStore::new(temp.path());
    store.save(&offline_profile("dev", DeploymentBackend::Swarm)).unwrap();

    let out = temp.path().join("custom-out");
    let backend = backend_for(DeploymentBackend::Swarm);
    let stack_path = backend.generate(&ctx, "dev", Some(&out)).unwrap();
    assert_eq!(stack_path, out.join("stack.yml"));
    assert!(stack_path.exists());
}

#[test]
fn llm_generate_creates_mounted_config_dirs() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let store = ProfileStore::new(temp.path());

    let mut profile = offline_profile("llm", DeploymentBackend::Compose);
    profile.llm_enabled = true;
    store.save(&profile).unwrap();

    backend_for(DeploymentBackend::Compose).generate(&ctx, "llm", None).unwrap();
    assert!(temp.path().join(".linto/llm/hydra-conf").is_dir());
    assert!(temp.path().join(".linto/llm/prompts").is_dir());
}

#[test]
fn generate_missing_profile_is_profile_not_found() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let backend = backend_for(DeploymentBackend::Compose);
    let err = backend.generate(&ctx, "ghost", None).unwrap_err();
    assert_eq!(err.code(), "PROFILE_NOT_FOUND");
}

#[test]
fn status_unsupported_on_stack_backends() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    for kind in [DeploymentBackend::Compose, DeploymentBackend::Swarm] {
        let err = backend_for(kind).status(&ctx, "dev").unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_BACKEND");
    }
}
