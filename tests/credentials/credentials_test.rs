//! Coverage for `.env` loading, permission checks, and key resolution.

use std::fs;
use std::path::PathBuf;

use argos::credentials::{load_credentials, resolve_api_key};

fn temp_env_path() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("argos_test_{}", uuid::Uuid::new_v4()));
    let create = fs::create_dir_all(&dir);
    assert!(create.is_ok());
    dir.join(".env")
}

#[cfg(unix)]
fn make_private(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;

    let perms = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    assert!(perms.is_ok());
}

#[cfg(not(unix))]
fn make_private(_path: &std::path::Path) {}

#[test]
fn loads_env_credentials() {
    let env_path = temp_env_path();
    let write = fs::write(&env_path, "GEMINI_API_KEY=file-key\nOTHER=value\n");
    assert!(write.is_ok());
    make_private(&env_path);

    let credentials = match load_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };

    assert_eq!(credentials.get("GEMINI_API_KEY"), Some("file-key"));
    assert_eq!(credentials.get("OTHER"), Some("value"));
}

#[cfg(unix)]
#[test]
fn rejects_world_readable_env_file() {
    use std::os::unix::fs::PermissionsExt;

    let env_path = temp_env_path();
    let write = fs::write(&env_path, "GEMINI_API_KEY=file-key\n");
    assert!(write.is_ok());

    let perms = fs::set_permissions(&env_path, fs::Permissions::from_mode(0o644));
    assert!(perms.is_ok());

    let loaded = load_credentials(&env_path);
    assert!(loaded.is_err());
}

#[test]
fn dotenv_key_is_used_when_environment_is_empty() {
    let env_path = temp_env_path();
    let write = fs::write(&env_path, "API_KEY=fallback-key\n");
    assert!(write.is_ok());
    make_private(&env_path);

    let credentials = match load_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };

    let key = resolve_api_key(|_| None, &credentials);
    assert_eq!(key.as_ref().map(|k| k.expose()), Some("fallback-key"));
}
