//! Configuration module for the OpenSpeech relay
//!
//! Handles server configuration from `.env` files, environment variables and
//! an optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `yaml`: YAML configuration file loading
//!
//! # Example
//! ```rust,no_run
//! use openspeech_relay::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::core::tts::openspeech::OpenSpeechConfig;

mod env;
mod yaml;

pub use env::{DEFAULT_HOST, DEFAULT_PORT};
pub use yaml::{OpenSpeechYaml, SecurityYaml, ServerYaml, YamlConfig};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Server configuration
///
/// Contains the bind address, the OpenSpeech upstream settings and the CORS
/// policy. Missing OpenSpeech credentials are allowed here; requests fail
/// individually until they are configured.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Upstream settings (the access token is zeroized on drop)
    pub openspeech: OpenSpeechConfig,

    /// Comma-separated CORS origins, `*` for any, `None` for same-origin only.
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            openspeech: OpenSpeechConfig::default(),
            cors_allowed_origins: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// The `.env` file is loaded in `main` before this is called, so its
    /// values are visible here as regular environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed, if an
    /// environment variable has an invalid format, or if validation fails.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = env::load_from_env()?;
        config.apply_yaml(yaml_config);
        config.validate()?;

        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Overlays every value present in the YAML file.
    fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
        }

        if let Some(openspeech) = yaml.openspeech {
            let target = &mut self.openspeech;
            if let Some(app_id) = openspeech.app_id {
                target.app_id = app_id;
            }
            if let Some(token) = openspeech.access_token {
                target.access_token = token;
            }
            if let Some(cluster) = openspeech.cluster {
                target.cluster = cluster;
            }
            if let Some(voice_type) = openspeech.voice_type {
                target.voice_type = voice_type;
            }
            if let Some(host) = openspeech.host {
                target.host = host;
            }
            if let Some(ws_url) = openspeech.ws_url {
                target.ws_url = Some(ws_url);
            }
            if let Some(uid) = openspeech.uid {
                target.uid = uid;
            }
        }

        if let Some(origins) = yaml.security.and_then(|s| s.cors_allowed_origins) {
            self.cors_allowed_origins = Some(origins);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.openspeech
            .validate()
            .map_err(|message| ConfigError::InvalidValue {
                name: "openspeech",
                message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "HOST",
        "PORT",
        "OPENSPEECH_APPID",
        "OPENSPEECH_TOKEN",
        "OPENSPEECH_CLUSTER",
        "OPENSPEECH_VOICE_TYPE",
        "OPENSPEECH_HOST",
        "OPENSPEECH_WS_URL",
        "OPENSPEECH_UID",
        "CORS_ALLOWED_ORIGINS",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            for name in ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.openspeech.cluster, "volcano_icl");
        assert_eq!(config.openspeech.voice_type, "S_nLVvYpzH1");
        assert_eq!(config.openspeech.host, "openspeech.bytedance.com");
        assert_eq!(
            config.openspeech.ws_url(),
            "wss://openspeech.bytedance.com/api/v1/tts/ws_binary"
        );
        assert!(!config.openspeech.has_credentials());
        assert!(config.cors_allowed_origins.is_none());
        assert_eq!(config.address(), "0.0.0.0:3001");
    }

    #[test]
    #[serial]
    fn test_from_env_reads_openspeech_settings() {
        cleanup_env_vars();
        unsafe {
            env::set_var("HOST", "127.0.0.1");
            env::set_var("PORT", "8088");
            env::set_var("OPENSPEECH_APPID", "env-app");
            env::set_var("OPENSPEECH_TOKEN", "env-token");
            env::set_var("OPENSPEECH_CLUSTER", "env-cluster");
            env::set_var("OPENSPEECH_VOICE_TYPE", "env-voice");
            env::set_var("OPENSPEECH_HOST", "tts.internal");
            env::set_var("CORS_ALLOWED_ORIGINS", "*");
        }

        let config = ServerConfig::from_env().unwrap();

        assert_eq!(config.address(), "127.0.0.1:8088");
        assert_eq!(config.openspeech.app_id, "env-app");
        assert_eq!(config.openspeech.access_token, "env-token");
        assert_eq!(config.openspeech.cluster, "env-cluster");
        assert_eq!(config.openspeech.voice_type, "env-voice");
        assert_eq!(
            config.openspeech.ws_url(),
            "wss://tts.internal/api/v1/tts/ws_binary"
        );
        assert_eq!(config.cors_allowed_origins, Some("*".to_string()));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_empty_values_are_unset() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENSPEECH_CLUSTER", "");
            env::set_var("OPENSPEECH_TOKEN", "   ");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.openspeech.cluster, "volcano_icl");
        assert!(config.openspeech.access_token.is_empty());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        cleanup_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("PORT"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_non_websocket_url() {
        cleanup_env_vars();
        unsafe {
            env::set_var("OPENSPEECH_WS_URL", "http://127.0.0.1:9000/tts");
        }

        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_only() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  port: 8080

openspeech:
  app_id: "yaml-app"
  access_token: "yaml-token"
  ws_url: "ws://127.0.0.1:9000/api/v1/tts/ws_binary"

security:
  cors_allowed_origins: "https://a.example.com,https://b.example.com"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.openspeech.app_id, "yaml-app");
        assert_eq!(config.openspeech.access_token, "yaml-token");
        assert_eq!(
            config.openspeech.ws_url(),
            "ws://127.0.0.1:9000/api/v1/tts/ws_binary"
        );
        assert_eq!(
            config.cors_allowed_origins,
            Some("https://a.example.com,https://b.example.com".to_string())
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
openspeech:
  access_token: "yaml-token"
  voice_type: "yaml-voice"
"#;

        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("OPENSPEECH_APPID", "env-app");
            env::set_var("OPENSPEECH_TOKEN", "env-token");
            env::set_var("PORT", "9999");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.openspeech.access_token, "yaml-token");
        assert_eq!(config.openspeech.voice_type, "yaml-voice");
        // ENV values survive where YAML is silent
        assert_eq!(config.openspeech.app_id, "env-app");
        assert_eq!(config.port, 9999);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_ws_url() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "openspeech:\n  ws_url: \"ftp://example.com\"\n").unwrap();

        let err = ServerConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("ws or wss"));

        cleanup_env_vars();
    }
}
