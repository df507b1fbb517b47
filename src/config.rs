use std::{env, str::FromStr};

use config_rs::{Config as ConfigRs, ConfigError};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{environment::Environment, field::FieldConfig, filter::FilterConfig, gate::GateConfig};

const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Defaults for the gates, fields and filter routers an application builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[must_use]
pub fn set_environment() -> Environment {
    env::var(ENVIRONMENT_VARIABLE)
        .ok()
        .and_then(|s| Environment::from_str(&s).ok())
        .unwrap_or_default()
}

/// Load `config/{environment}` and override it with `APP_` variables
/// (`APP_PERMISSIONS__GATE__OBJECT_PERMISSIONS=false`).
///
/// # Errors
/// Returns an error if the file is missing or does not deserialize.
pub fn read_config(environment: &Environment) -> Result<Config, ConfigError> {
    let config_file_name = format!("config/{environment}");

    trace!("Reading configuration from: {}", config_file_name);

    ConfigRs::builder()
        .add_source(config_rs::File::with_name(&config_file_name))
        .add_source(
            config_rs::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}
