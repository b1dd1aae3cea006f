//! Secret generation.
//!
//! The secret provider fills every unset secret field on a profile with a
//! freshly generated value. It never touches a field that already has one,
//! so filling is idempotent and re-rendering a filled profile stays
//! deterministic.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

use crate::model::ProfileConfig;

const PASSWORD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CRYPT_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fills unset secret fields on a profile.
pub trait SecretProvider {
    fn fill(&self, profile: &mut ProfileConfig);
}

/// Default provider backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct RandomSecretProvider;

impl RandomSecretProvider {
    /// Random alphanumeric password.
    pub fn password(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
            .collect()
    }

    /// Crypt key for session encryption: uppercase letters and digits.
    pub fn crypt_key(&self, length: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..length)
            .map(|_| CRYPT_KEY_ALPHABET[rng.gen_range(0..CRYPT_KEY_ALPHABET.len())] as char)
            .collect()
    }

    /// URL-safe base64-encoded 32-byte symmetric key.
    pub fn encryption_key(&self) -> String {
        let mut key = [0u8; 32];
        rand::thread_rng().fill(&mut key);
        URL_SAFE_NO_PAD.encode(key)
    }
}

fn fill_field(field: &mut Option<String>, generate: impl FnOnce() -> String) {
    if field.as_deref().is_none_or(str::is_empty) {
        *field = Some(generate());
    }
}

impl SecretProvider for RandomSecretProvider {
    fn fill(&self, profile: &mut ProfileConfig) {
        // Core secrets, always needed.
        fill_field(&mut profile.redis_password, || self.password(32));
        fill_field(&mut profile.jwt_secret, || self.password(32));
        fill_field(&mut profile.jwt_refresh_secret, || self.password(32));
        fill_field(&mut profile.super_admin_password, || self.password(16));

        if profile.live_session_enabled {
            fill_field(&mut profile.session_postgres_password, || self.password(32));
            fill_field(&mut profile.session_crypt_key, || self.crypt_key(10));
        }

        if profile.llm_enabled {
            fill_field(&mut profile.llm_postgres_password, || self.password(32));
            fill_field(&mut profile.llm_redis_password, || self.password(32));
            fill_field(&mut profile.llm_encryption_key, || self.encryption_key());
            fill_field(&mut profile.llm_admin_password, || self.password(16));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_alphabet_and_length() {
        let provider = RandomSecretProvider;
        let password = provider.password(32);
        assert_eq!(password.len(), 32);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_crypt_key_is_uppercase_alphanumeric() {
        let provider = RandomSecretProvider;
        let key = provider.crypt_key(10);
        assert_eq!(key.len(), 10);
        assert!(key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_fill_does_not_overwrite() {
        let provider = RandomSecretProvider;
        let mut profile = ProfileConfig {
            redis_password: Some("keep-me".to_string()),
            ..ProfileConfig::default()
        };
        provider.fill(&mut profile);
        assert_eq!(profile.redis_password.as_deref(), Some("keep-me"));
        assert!(profile.jwt_secret.is_some());
    }

    #[test]
    fn test_llm_secrets_gated_on_llm_enabled() {
        let provider = RandomSecretProvider;
        let mut profile = ProfileConfig::default();
        provider.fill(&mut profile);
        assert!(profile.llm_postgres_password.is_none());
        assert!(profile.llm_encryption_key.is_none());

        profile.llm_enabled = true;
        provider.fill(&mut profile);
        assert!(profile.llm_postgres_password.is_some());
        assert!(profile.llm_redis_password.is_some());
        assert!(profile.llm_encryption_key.is_some());
        assert!(profile.llm_admin_password.is_some());
    }
}
