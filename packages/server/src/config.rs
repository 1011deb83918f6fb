//! Dispatcher configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable selecting [`Environment`].
pub const ENV_VAR: &str = "ISORESOURCE_ENV";
/// Environment variable overriding [`DispatchConfig::upload_dir`].
pub const UPLOAD_DIR_VAR: &str = "ISORESOURCE_UPLOAD_DIR";

/// Deployment environment. Production hides fatal error details.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    /// Parse an environment name; anything unrecognised is production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" | "test" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Settings shared by every dispatched request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub environment: Environment,
    /// Where octet-stream bodies are staged. `None` uses the system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<PathBuf>,
    /// Input field receiving a staged octet-stream body.
    pub octet_field: String,
    /// Message sent with fatal responses in production.
    pub fatal_message: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            upload_dir: None,
            octet_field: "file".to_string(),
            fatal_message: "Internal Server Error".to_string(),
        }
    }
}

impl DispatchConfig {
    /// Defaults overridden by `ISORESOURCE_ENV` and `ISORESOURCE_UPLOAD_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(env) = lookup(ENV_VAR) {
            config.environment = Environment::parse(&env);
        }
        if let Some(dir) = lookup(UPLOAD_DIR_VAR).filter(|d| !d.is_empty()) {
            config.upload_dir = Some(PathBuf::from(dir));
        }
        config
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            ..Self::default()
        }
    }

    /// The directory staged uploads are written to.
    pub fn staging_dir(&self) -> PathBuf {
        self.upload_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
