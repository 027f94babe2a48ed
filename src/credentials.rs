//! API key loading from the process environment and an optional `.env` file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

/// Environment keys checked for the generative model API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Secret API key for the generative model service.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

impl ApiKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

/// Key-value pairs read from a `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }
}

/// Load credentials from a specific `.env` path.
///
/// # Errors
///
/// Returns an error if the file does not exist, permissions are too broad,
/// or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

/// Resolve the API key.
///
/// Resolution order: process environment (`GEMINI_API_KEY`, then `API_KEY`),
/// then the same keys in `credentials`. Blank values are skipped.
pub fn resolve_api_key(
    env: impl Fn(&str) -> Option<String>,
    credentials: &Credentials,
) -> Option<ApiKey> {
    for var in API_KEY_VARS {
        if let Some(key) = env(var).filter(|k| !k.trim().is_empty()) {
            debug!(source = var, "using API key from environment");
            return Some(ApiKey(key));
        }
    }
    for var in API_KEY_VARS {
        if let Some(key) = credentials.get(var).filter(|k| !k.trim().is_empty()) {
            debug!(source = var, "using API key from .env");
            return Some(ApiKey(key.to_owned()));
        }
    }
    None
}

/// Resolve the API key from the environment and, if present, `./.env`.
///
/// # Errors
///
/// Returns an error when no source provides a key or the `.env` file is
/// unreadable.
pub fn load_api_key() -> anyhow::Result<ApiKey> {
    let dotenv = Path::new(".env");
    let credentials = if dotenv.exists() {
        load_credentials(dotenv)?
    } else {
        Credentials::default()
    };
    resolve_api_key(|key| std::env::var(key).ok(), &credentials).ok_or_else(|| {
        anyhow::anyhow!(
            "no API key found; set {} in the environment or in .env",
            API_KEY_VARS.join(" or ")
        )
    })
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
