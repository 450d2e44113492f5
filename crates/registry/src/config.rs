use std::{convert::Infallible, env, path::PathBuf};

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CatalogError, ServiceCatalog, TenantRegistry};

pub const REGISTRY_CONFIG_ENV: &str = "MPX_REGISTRY_CONFIG_PATH";

/// Optional overrides for the bundled reference data.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory holding `{web,data,ingest}_services.json`.
    pub catalog_dir: Option<PathBuf>,
    /// Root registry snapshot file.
    pub root_snapshot: Option<PathBuf>,
}

impl RegistryConfig {
    /// Reads the config file; a missing or unreadable file means defaults.
    pub fn load() -> Result<Self, Infallible> {
        let path = default_config_path();
        if let Ok(content) = std::fs::read_to_string(&path) {
            match serde_json::from_str(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "registry config loaded");
                    return Ok(config);
                }
                Err(error) => warn!(path = %path.display(), error = %error, "ignoring unreadable registry config"),
            }
        }
        Ok(RegistryConfig::default())
    }

    /// The configured catalog, or the embedded one.
    pub fn load_catalog(&self) -> Result<ServiceCatalog, CatalogError> {
        match &self.catalog_dir {
            Some(dir) => ServiceCatalog::from_dir(&expand_tilde(&dir.to_string_lossy())),
            None => ServiceCatalog::from_embedded(),
        }
    }

    /// A registry seeded from the configured snapshot, or the embedded one.
    pub fn load_registry(&self) -> Result<TenantRegistry, CatalogError> {
        match &self.root_snapshot {
            Some(path) => TenantRegistry::from_snapshot_file(&expand_tilde(&path.to_string_lossy())),
            None => TenantRegistry::from_embedded(),
        }
    }
}

/// Get the default path for the registry configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(REGISTRY_CONFIG_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mpx")
        .join("registry.json")
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn env_override_points_at_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        fs::write(&path, r#"{"catalog_dir": "/opt/mpx/config"}"#).unwrap();

        temp_env::with_var(REGISTRY_CONFIG_ENV, Some(path.as_os_str()), || {
            let config = RegistryConfig::load().unwrap();
            assert_eq!(config.catalog_dir, Some(PathBuf::from("/opt/mpx/config")));
            assert_eq!(config.root_snapshot, None);
        });
    }

    #[test]
    fn missing_or_broken_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        temp_env::with_var(REGISTRY_CONFIG_ENV, Some(path.as_os_str()), || {
            assert_eq!(RegistryConfig::load().unwrap(), RegistryConfig::default());
            fs::write(&path, "not json").unwrap();
            assert_eq!(RegistryConfig::load().unwrap(), RegistryConfig::default());
        });
    }

    #[test]
    fn default_config_loads_embedded_data() {
        let config = RegistryConfig::default();
        assert!(!config.load_catalog().unwrap().is_empty());
        assert!(config.load_registry().unwrap().root().is_some());
    }

    #[test]
    fn snapshot_override_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("root.json");
        fs::write(
            &snapshot,
            r#"{"resolveDomainResponse": {"Media Data Service": "http://data.media.theplatform.com/media"}}"#,
        )
        .unwrap();

        let config = RegistryConfig {
            catalog_dir: None,
            root_snapshot: Some(snapshot),
        };
        let registry = config.load_registry().unwrap();
        assert_eq!(registry.root().unwrap().len(), 1);
    }
}
