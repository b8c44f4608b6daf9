//! Agent configuration from environment variables.

use std::path::PathBuf;

use library_core::InstanceRole;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Where migrated file bytes are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { root: PathBuf },
    /// Bucket settings are read from the `S3_*` variables by the store itself.
    S3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub global_api_url: String,
    pub global_api_token: Option<String>,
    pub role: InstanceRole,
    pub database_path: PathBuf,
    pub storage: StorageConfig,
}

impl SyncConfig {
    /// Read configuration from the process environment.
    ///
    /// Env vars:
    /// - GLOBAL_API_URL: Base URL of the global library (required)
    /// - GLOBAL_API_TOKEN: Bearer token for the global library
    /// - INSTANCE_ROLE: `organization` (default) or `global`
    /// - DATABASE_PATH: Replica database file (default `library.db`)
    /// - STORAGE_BACKEND: `local` (default) or `s3`
    /// - STORAGE_ROOT: Blob directory for the local backend (default `storage`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let global_api_url = var("GLOBAL_API_URL").ok_or(ConfigError::Missing("GLOBAL_API_URL"))?;

        let role = match var("INSTANCE_ROLE") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "INSTANCE_ROLE",
                value,
            })?,
            None => InstanceRole::default(),
        };

        let database_path = var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("library.db"));

        let storage = match var("STORAGE_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => StorageConfig::Local {
                root: Self::storage_root(&var),
            },
            Some(backend) if backend == "local" => StorageConfig::Local {
                root: Self::storage_root(&var),
            },
            Some(backend) if backend == "s3" => StorageConfig::S3,
            Some(backend) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: backend,
                })
            }
        };

        Ok(Self {
            global_api_url,
            global_api_token: var("GLOBAL_API_TOKEN"),
            role,
            database_path,
            storage,
        })
    }

    fn storage_root(var: &impl Fn(&str) -> Option<String>) -> PathBuf {
        var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("storage"))
    }
}
