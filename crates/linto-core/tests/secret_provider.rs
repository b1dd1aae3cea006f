use linto_core::model::ProfileConfig;
use linto_core::secrets::{RandomSecretProvider, SecretProvider};

fn snapshot(profile: &ProfileConfig) -> Vec<Option<String>> {
    vec![
        profile.redis_password.clone(),
        profile.jwt_secret.clone(),
        profile.jwt_refresh_secret.clone(),
        profile.super_admin_password.clone(),
        profile.session_postgres_password.clone(),
        profile.session_crypt_key.clone(),
        profile.llm_postgres_password.clone(),
        profile.llm_redis_password.clone(),
        profile.llm_encryption_key.clone(),
        profile.llm_admin_password.clone(),
    ]
}

#[test]
fn fill_populates_core_secrets() {
    let provider = RandomSecretProvider;
    let mut profile = ProfileConfig::default();
    provider.fill(&mut profile);

    assert!(profile.redis_password.is_some());
    assert!(profile.jwt_secret.is_some());
    assert!(profile.jwt_refresh_secret.is_some());
    assert_eq!(profile.super_admin_password.as_ref().unwrap().len(), 16);
    // Live session and LLM are disabled: their secrets stay unset.
    assert!(profile.session_postgres_password.is_none());
    assert!(profile.session_crypt_key.is_none());
    assert!(profile.llm_postgres_password.is_none());
}

#[test]
fn fill_is_monotonic() {
    let provider = RandomSecretProvider;
    let mut profile = ProfileConfig {
        live_session_enabled: true,
        llm_enabled: true,
        ..ProfileConfig::default()
    };

    provider.fill(&mut profile);
    let first = snapshot(&profile);
    assert!(first.iter().all(Option::is_some));

    provider.fill(&mut profile);
    let second = snapshot(&profile);
    assert_eq!(first, second, "second fill must not change any secret");
}

#[test]
fn llm_secrets_are_complete_when_llm_enabled() {
    let provider = RandomSecretProvider;
    let mut profile = ProfileConfig {
        llm_enabled: true,
        ..ProfileConfig::default()
    };
    provider.fill(&mut profile);

    assert!(profile.llm_postgres_password.is_some());
    assert!(profile.llm_redis_password.is_some());
    assert!(profile.llm_encryption_key.is_some());
    assert_eq!(profile.llm_admin_password.as_ref().unwrap().len(), 16);
}

#[test]
fn session_secrets_are_gated_on_live_session() {
    let provider = RandomSecretProvider;
    let mut profile = ProfileConfig {
        live_session_enabled: true,
        ..ProfileConfig::default()
    };
    provider.fill(&mut profile);

    assert!(profile.session_postgres_password.is_some());
    let crypt_key = profile.session_crypt_key.as_ref().unwrap();
    assert_eq!(crypt_key.len(), 10);
    assert!(crypt_key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[test]
fn filled_profile_still_validates() {
    let provider = RandomSecretProvider;
    let mut profile = ProfileConfig {
        live_session_enabled: true,
        llm_enabled: true,
        ..ProfileConfig::default()
    };
    provider.fill(&mut profile);
    assert!(profile.validate().is_ok());
}
