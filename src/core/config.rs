//! # Configuration Module
//!
//! Startup configuration for the apiserver, loaded from YAML with
//! `BERTH_<SECTION>_<FIELD>` environment overrides applied on top.
//!
//! ```yaml
//! server:
//!   bind_address: "0.0.0.0"
//!   port: 2022
//!   path_prefix: "/api/v1alpha1"
//!   request_timeout: "30s"
//! store:
//!   backend: kube
//!   namespace: kubeberth
//! logging:
//!   level: info
//!   format: json
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {variable}: {reason}")]
    Environment { variable: String, reason: String },

    #[error("Configuration validation failed:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiServerConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Every route is mounted under this prefix
    pub path_prefix: String,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 2022,
            path_prefix: "/api/v1alpha1".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Custom resources in the cluster the process runs against
    #[default]
    Kube,
    /// In-process maps, for local runs
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kube" | "kubernetes" => Ok(StoreBackend::Kube),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Namespace every object is read from and written to
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Kube,
            namespace: "kubeberth".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

fn parse_var<T, E>(variable: &str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr<Err = E>,
    E: std::fmt::Display,
{
    value.trim().parse().map_err(|e: E| ConfigError::Environment {
        variable: variable.to_string(),
        reason: e.to_string(),
    })
}

impl ApiServerConfig {
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Read, apply environment overrides, validate
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;

        let mut config = Self::from_yaml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load_from_file`](Self::load_from_file), but a missing file
    /// means defaults plus environment overrides.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        if tokio::fs::try_exists(path.as_ref()).await.unwrap_or(false) {
            return Self::load_from_file(path).await;
        }

        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `BERTH_*` overrides read through `lookup`
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BERTH_SERVER_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = lookup("BERTH_SERVER_PORT") {
            self.server.port = parse_var("BERTH_SERVER_PORT", &v)?;
        }
        if let Some(v) = lookup("BERTH_SERVER_PATH_PREFIX") {
            self.server.path_prefix = v;
        }
        if let Some(v) = lookup("BERTH_SERVER_REQUEST_TIMEOUT") {
            self.server.request_timeout = humantime::parse_duration(v.trim()).map_err(|e| {
                ConfigError::Environment {
                    variable: "BERTH_SERVER_REQUEST_TIMEOUT".to_string(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(v) = lookup("BERTH_STORE_BACKEND") {
            self.store.backend = parse_var("BERTH_STORE_BACKEND", &v)?;
        }
        if let Some(v) = lookup("BERTH_STORE_NAMESPACE") {
            self.store.namespace = v;
        }
        if let Some(v) = lookup("BERTH_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("BERTH_LOG_FORMAT") {
            self.logging.format = parse_var("BERTH_LOG_FORMAT", &v)?;
        }
        Ok(())
    }

    /// Report every problem at once rather than the first
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.trim().is_empty() {
            errors.push("server.bind_address cannot be empty".to_string());
        }
        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }
        if !self.server.path_prefix.starts_with('/') {
            errors.push(format!(
                "server.path_prefix must start with '/', got {:?}",
                self.server.path_prefix
            ));
        }
        if self.server.request_timeout.is_zero() {
            errors.push("server.request_timeout must be greater than 0".to_string());
        }
        if self.store.namespace.trim().is_empty() {
            errors.push("store.namespace cannot be empty".to_string());
        }
        if self.logging.level.trim().is_empty() {
            errors.push("logging.level cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = ApiServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 2022);
        assert_eq!(config.server.path_prefix, "/api/v1alpha1");
        assert_eq!(config.store.namespace, "kubeberth");
        assert_eq!(config.store.backend, StoreBackend::Kube);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ApiServerConfig::from_yaml_str(
            r#"
server:
  port: 8080
  request_timeout: "5s"
store:
  backend: memory
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout, Duration::from_secs(5));
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.namespace, "kubeberth");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn test_load_config_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("apiserver.yaml");
        tokio::fs::write(
            &config_path,
            r#"
server:
  bind_address: "127.0.0.1"
  port: 9022
  path_prefix: "/api/v1alpha1"
  request_timeout: "45s"
store:
  backend: memory
  namespace: berth-dev
logging:
  level: debug
  format: text
"#,
        )
        .await
        .unwrap();

        let config = ApiServerConfig::load_from_file(&config_path).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.request_timeout, Duration::from_secs(45));
        assert_eq!(config.store.namespace, "berth-dev");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ApiServerConfig::load_or_default(temp_dir.path().join("absent.yaml"))
            .await
            .unwrap();
        assert_eq!(config.server.path_prefix, "/api/v1alpha1");

        let err = ApiServerConfig::load_from_file(temp_dir.path().join("absent.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_environment_variable_overrides() {
        let mut config = ApiServerConfig::default();
        config
            .apply_overrides_from(lookup(&[
                ("BERTH_SERVER_PORT", "3033"),
                ("BERTH_SERVER_REQUEST_TIMEOUT", "2m"),
                ("BERTH_STORE_BACKEND", "memory"),
                ("BERTH_STORE_NAMESPACE", "tenant-a"),
                ("BERTH_LOG_FORMAT", "text"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 3033);
        assert_eq!(config.server.request_timeout, Duration::from_secs(120));
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.namespace, "tenant-a");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_invalid_environment_variables() {
        let mut config = ApiServerConfig::default();
        let err = config
            .apply_overrides_from(lookup(&[("BERTH_SERVER_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::Environment { ref variable, .. } if variable == "BERTH_SERVER_PORT")
        );

        let err = config
            .apply_overrides_from(lookup(&[("BERTH_STORE_BACKEND", "etcd")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Environment { .. }));
    }

    #[test]
    fn test_config_validation_collects_all_errors() {
        let mut config = ApiServerConfig::default();
        config.server.bind_address = String::new();
        config.server.path_prefix = "api".to_string();
        config.server.request_timeout = Duration::ZERO;
        config.store.namespace = String::new();

        match config.validate() {
            Err(ConfigError::Invalid(errors)) => assert_eq!(errors.len(), 4),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }
}
