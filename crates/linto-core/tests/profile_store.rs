use tempfile::TempDir;

use linto_core::error::DeployError;
use linto_core::model::{ProfileConfig, TlsMode};
use linto_core::store::ProfileStore;

fn test_profile(name: &str) -> ProfileConfig {
    ProfileConfig {
        name: name.to_string(),
        domain: "test.local".to_string(),
        tls_mode: TlsMode::Off,
        ..ProfileConfig::default()
    }
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    let profile = test_profile("dev");
    let path = store.save(&profile).unwrap();
    assert!(path.ends_with(".linto/profiles/dev.json"));

    let loaded = store.load("dev").unwrap();
    assert_eq!(loaded, profile);
}

#[test]
fn load_missing_is_profile_not_found() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    let err = store.load("ghost").unwrap_err();
    assert!(matches!(err, DeployError::ProfileNotFound(_)));
    assert!(err.message().contains("'ghost'"));
}

#[test]
fn load_corrupt_file_is_config_invalid_not_missing() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());
    std::fs::create_dir_all(store.profiles_dir()).unwrap();
    std::fs::write(store.path_for("broken"), "{ not json").unwrap();

    let err = store.load("broken").unwrap_err();
    assert!(matches!(err, DeployError::ConfigInvalid(_)));
}

#[test]
fn load_revalidates_against_current_rules() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    // Structurally valid JSON that breaks an invariant.
    let mut profile = test_profile("stale");
    profile.studio_enabled = false;
    profile.stt_enabled = false;
    let json = serde_json::to_string_pretty(&profile).unwrap();
    std::fs::create_dir_all(store.profiles_dir()).unwrap();
    std::fs::write(store.path_for("stale"), json).unwrap();

    let err = store.load("stale").unwrap_err();
    assert!(matches!(err, DeployError::ConfigInvalid(_)));
}

#[test]
fn save_rejects_invalid_profile() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    let mut profile = test_profile("bad");
    profile.studio_enabled = false;
    profile.stt_enabled = false;
    assert!(store.save(&profile).is_err());
    assert!(!store.exists("bad"));
}

#[test]
fn list_is_sorted_and_skips_unreadable() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    store.save(&test_profile("zeta")).unwrap();
    store.save(&test_profile("alpha")).unwrap();
    std::fs::write(store.path_for("corrupt"), "not json").unwrap();

    let profiles = store.list().unwrap();
    let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["alpha", "zeta"]);
}

#[test]
fn delete_removes_the_file() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    store.save(&test_profile("doomed")).unwrap();
    store.delete("doomed").unwrap();
    assert!(!store.exists("doomed"));

    let err = store.delete("doomed").unwrap_err();
    assert!(matches!(err, DeployError::ProfileNotFound(_)));
}

#[test]
fn copy_renames_and_refuses_overwrite() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());

    store.save(&test_profile("src")).unwrap();
    store.copy("src", "dst").unwrap();

    let copied = store.load("dst").unwrap();
    assert_eq!(copied.name, "dst");
    assert_eq!(copied.domain, "test.local");

    let err = store.copy("src", "dst").unwrap_err();
    assert!(matches!(err, DeployError::ProfileExists(_)));
}

#[test]
fn copy_missing_source_fails() {
    let temp = TempDir::new().unwrap();
    let store = ProfileStore::new(temp.path());
    let err = store.copy("ghost", "dst").unwrap_err();
    assert!(matches!(err, DeployError::ProfileNotFound(_)));
}

#[test]
fn summary_lists_enabled_services() {
    let mut profile = test_profile("dev");
    profile.llm_enabled = true;
    let summary = ProfileStore::summary(&profile);
    assert_eq!(summary.services, "studio, stt, llm");
    assert_eq!(summary.backend, "compose");
}
