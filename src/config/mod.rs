// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::cli::Args;
use crate::error::{OfflineError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. CLI arguments (highest, see [`AppConfig::apply_args`])
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest)
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_string(), true),
            None => (Self::default_config_path(), false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // An explicit --config must exist; the home default may not
            .add_source(File::with_name(&path).required(required))
            // Override with environment variables (KEGAMA_OFFLINE__UPSTREAM__BASE_URL)
            .add_source(
                Environment::with_prefix("KEGAMA_OFFLINE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.assets")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| OfflineError::Config(e.to_string()))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| OfflineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fold command-line overrides into a loaded configuration.
    pub fn apply_args(&mut self, args: &Args) -> Result<()> {
        if let Some(upstream) = &args.upstream {
            self.upstream.base_url = upstream.clone();
        }
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        self.validate()
    }

    /// Reject configurations the worker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.name.trim().is_empty() {
            return Err(OfflineError::Config("cache.name must not be empty".to_string()));
        }
        if let Some(bad) = self.cache.assets.iter().find(|a| !a.starts_with('/')) {
            return Err(OfflineError::Config(format!(
                "cache.assets entries must be origin-relative paths, got '{}'",
                bad
            )));
        }
        reqwest::Url::parse(&self.upstream.base_url).map_err(|e| {
            OfflineError::Config(format!("upstream.base_url '{}': {}", self.upstream.base_url, e))
        })?;
        Ok(())
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kegama-offline")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
