use std::{env, fmt, fs::File, io::Read, path::Path};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::duration::DurationError;

/// Product whose token is used when the file does not name one.
pub const DEFAULT_PRODUCT: &str = "secure";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenConfig {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnvironmentConfig {
    pub name: String,
    pub url: String,
    pub secure: TokenConfig,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub monitor: Option<TokenConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SetupConfig {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_product: Option<String>,
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,
}

impl SetupConfig {
    /// Resolves the single environment named by `current-environment`.
    pub fn select(self) -> Result<ClientConfig, ConfigError> {
        let current = match self.current_environment {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(ConfigError::MissingCurrentEnvironment),
        };

        let mut matches: Vec<EnvironmentConfig> =
            self.environments.into_iter().filter(|env| env.name == current).collect();
        if matches.len() > 1 {
            return Err(ConfigError::AmbiguousEnvironment(current));
        }
        let selected = matches.pop().ok_or(ConfigError::EnvironmentNotFound(current))?;

        Ok(ClientConfig {
            url: selected.url,
            auth_token: selected.secure.token,
            environment: selected.name,
            product: self.current_product.unwrap_or_else(|| DEFAULT_PRODUCT.to_string()),
            monitor_token: selected.monitor.map(|monitor| monitor.token),
        })
    }
}

/// Connection settings for one environment of the platform.
///
/// Immutable once built; share it by cloning or behind an `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub auth_token: String,
    pub environment: String,
    pub product: String,
    pub monitor_token: Option<String>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            environment: "default".to_string(),
            product: DEFAULT_PRODUCT.to_string(),
            monitor_token: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("auth_token", &"***")
            .field("environment", &self.environment)
            .field("product", &self.product)
            .field("monitor_token", &self.monitor_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Can not find yaml")]
    CanNotFindYaml,

    #[error("Can not read yaml")]
    CanNotReadYaml,

    #[error("Config is invalid yaml and does not match the struct - {0}")]
    InvalidYaml(String),

    #[error("Environment variable {0} not found")]
    EnvironmentVariableNotFound(String),

    #[error("current-environment is not set")]
    MissingCurrentEnvironment,

    #[error("Environment {0} is not defined in environments")]
    EnvironmentNotFound(String),

    #[error("Environment {0} is defined more than once")]
    AmbiguousEnvironment(String),

    #[error("Auth token can not be used as a header value")]
    InvalidAuthToken,

    #[error("Invalid duration: {0}")]
    InvalidDuration(#[from] DurationError),
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

/// Replaces `${VAR}` placeholders with values from the process environment.
///
/// Lines whose first non-blank character is `#` are YAML comments and are
/// copied as they are. A comment trailing a value on the same line is not
/// recognised and its placeholders are substituted.
fn substitute_env_variables(contents: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;
    let mut result = String::with_capacity(contents.len());

    for line in contents.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let substituted = PLACEHOLDER.replace_all(line, |caps: &Captures| {
            let var_name = &caps[1];
            match env::var(var_name) {
                Ok(val) => val,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });
        result.push_str(&substituted);
    }

    if let Some(var_name) = missing {
        error!("Environment variable {} not found", var_name);
        return Err(ConfigError::EnvironmentVariableNotFound(var_name));
    }

    Ok(result)
}

/// Parses config text and selects the current environment.
///
/// `${VAR}` placeholders are replaced from the process environment before
/// parsing, except on full-line `#` comments.
pub fn read_str(contents: &str) -> Result<ClientConfig, ConfigError> {
    let substituted_contents = substitute_env_variables(contents)?;

    let config: SetupConfig = serde_yaml::from_str(&substituted_contents)
        .map_err(|e| ConfigError::InvalidYaml(e.to_string()))?;

    config.select()
}

/// Reads the config file at `file_path`. Every call reads the file again.
pub fn read(file_path: &Path) -> Result<ClientConfig, ConfigError> {
    let mut file = File::open(file_path).map_err(|_| ConfigError::CanNotFindYaml)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|_| ConfigError::CanNotReadYaml)?;

    read_str(&contents)
}
