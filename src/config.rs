use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const URL_ENV: &str = "GOHL_CONFIG_URL";
pub const TOKEN_ID_ENV: &str = "GOHL_CONFIG_TOKEN_ID";

const API_PATH: &str = "/api2/json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub token_id: String,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            token_id: String::new(),
            secret: None,
            secret_env: default_secret_env(),
            verify_tls: false,
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    /// Loads the optional YAML file, then applies environment overrides.
    /// Environment variables win over file values so the reporting host can
    /// inject connection settings without a file at all.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        if let Some(url) = non_empty_env(URL_ENV) {
            cfg.api_url = url;
        }
        if let Some(token_id) = non_empty_env(TOKEN_ID_ENV) {
            cfg.token_id = token_id;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "api_url is required (set it in the config file or via {URL_ENV})"
            )));
        }
        if self.token_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "token_id is required (set it in the config file or via {TOKEN_ID_ENV})"
            )));
        }
        if self.secret_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "secret_env must not be empty".to_string(),
            ));
        }
        let timeout = self.parsed_request_timeout()?;
        if timeout.is_zero() {
            return Err(ConfigError::Validation(
                "request_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// API token secret: the environment variable named by `secret_env`
    /// wins, the file-supplied value is the fallback.
    pub fn resolve_secret(&self) -> Result<String, ConfigError> {
        if let Some(secret) = non_empty_env(&self.secret_env) {
            return Ok(secret);
        }
        if let Some(secret) = self
            .secret
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            return Ok(secret);
        }
        Err(ConfigError::Validation(format!(
            "no API token secret found: set '{}' in the environment or secret in the config file",
            self.secret_env
        )))
    }

    /// Base URL for API requests, guaranteed to end in `/api2/json`.
    pub fn normalized_api_url(&self) -> String {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        if trimmed.ends_with(API_PATH) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{API_PATH}")
        }
    }

    pub fn parsed_request_timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(self.request_timeout.trim()).map_err(|err| {
            ConfigError::Validation(format!(
                "request_timeout '{}' is not a valid duration: {err}",
                self.request_timeout
            ))
        })
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn default_secret_env() -> String {
    "GOHL_CONFIG_SECRET".to_string()
}

fn default_request_timeout() -> String {
    "10s".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api_url: "https://pve.example.com:8006".to_string(),
            token_id: "gohl@pve!scanner".to_string(),
            secret: Some("s3cret".to_string()),
            secret_env: "PVESCAN_TEST_SECRET_UNSET".to_string(),
            verify_tls: false,
            request_timeout: "10s".to_string(),
        }
    }

    #[test]
    fn api_url_gets_api_path_appended() {
        let mut cfg = valid_config();
        assert_eq!(
            cfg.normalized_api_url(),
            "https://pve.example.com:8006/api2/json"
        );

        cfg.api_url = "https://pve.example.com:8006/".to_string();
        assert_eq!(
            cfg.normalized_api_url(),
            "https://pve.example.com:8006/api2/json"
        );
    }

    #[test]
    fn api_url_with_api_path_is_kept() {
        let mut cfg = valid_config();
        cfg.api_url = "https://pve.example.com:8006/api2/json".to_string();
        assert_eq!(
            cfg.normalized_api_url(),
            "https://pve.example.com:8006/api2/json"
        );

        cfg.api_url = "https://pve.example.com:8006/api2/json/".to_string();
        assert_eq!(
            cfg.normalized_api_url(),
            "https://pve.example.com:8006/api2/json"
        );
    }

    #[test]
    fn validation_rejects_missing_url_and_token() {
        let mut cfg = valid_config();
        cfg.api_url = String::new();
        assert!(cfg.validate().is_err());

        let mut cfg = valid_config();
        cfg.token_id = "  ".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_rejects_bad_timeout() {
        let mut cfg = valid_config();
        cfg.request_timeout = "soon".to_string();
        assert!(cfg.validate().is_err());

        cfg.request_timeout = "0s".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn secret_falls_back_to_file_value() {
        let cfg = valid_config();
        std::env::remove_var(&cfg.secret_env);
        assert_eq!(cfg.resolve_secret().expect("file secret"), "s3cret");
    }

    #[test]
    fn secret_env_wins_over_file_value() {
        let mut cfg = valid_config();
        cfg.secret_env = "PVESCAN_TEST_SECRET_SET".to_string();
        std::env::set_var(&cfg.secret_env, "from-env");
        assert_eq!(cfg.resolve_secret().expect("env secret"), "from-env");
        std::env::remove_var(&cfg.secret_env);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let mut cfg = valid_config();
        cfg.secret = None;
        std::env::remove_var(&cfg.secret_env);
        assert!(cfg.resolve_secret().is_err());
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("parse example");
        cfg.validate().expect("example config should validate");
    }
}
