use std::env;

use super::{ConfigError, ServerConfig};
use crate::core::tts::openspeech::OpenSpeechConfig;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port
pub const DEFAULT_PORT: u16 = 3001;

/// Reads an environment variable, treating empty values as unset.
pub(super) fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a port number, naming the source in the error.
pub(super) fn parse_port(name: &'static str, value: &str) -> Result<u16, ConfigError> {
    value
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidValue {
            name,
            message: format!("'{value}' is not a valid port: {e}"),
        })
}

/// Builds the configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, ConfigError> {
    let host = env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match env_var("PORT") {
        Some(value) => parse_port("PORT", &value)?,
        None => DEFAULT_PORT,
    };

    let mut openspeech = OpenSpeechConfig::default();
    if let Some(app_id) = env_var("OPENSPEECH_APPID") {
        openspeech.app_id = app_id;
    }
    if let Some(token) = env_var("OPENSPEECH_TOKEN") {
        openspeech.access_token = token;
    }
    if let Some(cluster) = env_var("OPENSPEECH_CLUSTER") {
        openspeech.cluster = cluster;
    }
    if let Some(voice_type) = env_var("OPENSPEECH_VOICE_TYPE") {
        openspeech.voice_type = voice_type;
    }
    if let Some(host) = env_var("OPENSPEECH_HOST") {
        openspeech.host = host;
    }
    openspeech.ws_url = env_var("OPENSPEECH_WS_URL");
    if let Some(uid) = env_var("OPENSPEECH_UID") {
        openspeech.uid = uid;
    }

    Ok(ServerConfig {
        host,
        port,
        openspeech,
        cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
    })
}
