//! Configuration Loader
//!
//! Layers an optional configuration file (TOML, YAML or JSON, detected from
//! the extension) under `DISPATCH_*` environment variables and validates the
//! result. Fields missing from every source fall back to `PoolConfig` defaults.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::PoolConfig;
use crate::constants::defaults;
use crate::error::{DispatchError, Result};

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    prefix: Option<String>,
    /// Replaces the process environment; used to keep tests hermetic
    environment: Option<config::Map<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read settings from a file. The file must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Override the environment variable prefix (default `DISPATCH`)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Use an explicit variable map instead of the process environment
    pub fn with_environment(mut self, vars: config::Map<String, String>) -> Self {
        self.environment = Some(vars);
        self
    }

    /// Build, deserialize and validate the configuration
    pub fn load(&self) -> Result<PoolConfig> {
        let prefix = self.prefix.as_deref().unwrap_or(defaults::ENV_PREFIX);
        let mut builder = config::Config::builder();

        if let Some(path) = &self.file {
            debug!("Loading pool configuration from {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.environment.clone()),
        );

        let settings = builder.build().map_err(|e| {
            DispatchError::Configuration(format!("failed to read configuration: {e}"))
        })?;

        let pool_config: PoolConfig = settings.try_deserialize().map_err(|e| {
            DispatchError::Configuration(format!("failed to parse configuration: {e}"))
        })?;

        pool_config.validate()?;

        info!(
            min_workers = pool_config.min_workers,
            max_workers = pool_config.max_workers,
            dynamic_scaling = pool_config.dynamic_scaling,
            use_workers = pool_config.use_workers,
            timeout_ms = pool_config.timeout_ms,
            "CONFIG: Pool configuration loaded"
        );

        Ok(pool_config)
    }
}
