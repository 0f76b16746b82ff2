use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present here
/// override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// openspeech:
///   app_id: "your-app-id"
///   access_token: "your-access-token"
///   cluster: "volcano_icl"
///   voice_type: "S_nLVvYpzH1"
///   host: "openspeech.bytedance.com"
///   # ws_url: "ws://127.0.0.1:9000/api/v1/tts/ws_binary"
///   uid: "voice_clone_api"
///
/// security:
///   cors_allowed_origins: "https://app.example.com,https://admin.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub openspeech: Option<OpenSpeechYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// OpenSpeech upstream settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OpenSpeechYaml {
    pub app_id: Option<String>,
    pub access_token: Option<String>,
    pub cluster: Option<String>,
    pub voice_type: Option<String>,
    pub host: Option<String>,
    /// Full WebSocket URL; overrides `host` when set.
    pub ws_url: Option<String>,
    pub uid: Option<String>,
}

/// Security settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// Comma-separated origins, or `*`.
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(ConfigError::Parse)
    }
}
