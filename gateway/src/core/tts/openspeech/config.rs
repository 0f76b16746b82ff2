//! OpenSpeech provider configuration.
//!
//! Holds the process-wide credentials and defaults resolved once at startup.
//! The relay treats these as already-validated inputs; the only runtime check
//! is [`OpenSpeechConfig::has_credentials`], which the HTTP layer consults
//! before any connection is opened.

use std::fmt;

use url::Url;

use super::{DEFAULT_CLUSTER, DEFAULT_HOST, DEFAULT_UID, DEFAULT_VOICE_TYPE, WS_BINARY_PATH};

/// Resolved OpenSpeech settings.
#[derive(Clone, PartialEq, Eq)]
pub struct OpenSpeechConfig {
    /// Application id issued by the upstream console.
    pub app_id: String,
    /// Access token; sent in the upgrade header and inside the payload.
    pub access_token: String,
    /// Cluster name.
    pub cluster: String,
    /// Voice used when a request does not name one.
    pub voice_type: String,
    /// Upstream host, used to derive the WebSocket URL.
    pub host: String,
    /// Full WebSocket URL override (e.g. a local stub upstream).
    pub ws_url: Option<String>,
    /// User id reported in the submit payload.
    pub uid: String,
}

impl Default for OpenSpeechConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            access_token: String::new(),
            cluster: DEFAULT_CLUSTER.to_string(),
            voice_type: DEFAULT_VOICE_TYPE.to_string(),
            host: DEFAULT_HOST.to_string(),
            ws_url: None,
            uid: DEFAULT_UID.to_string(),
        }
    }
}

impl fmt::Debug for OpenSpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenSpeechConfig")
            .field("app_id", &self.app_id)
            .field("access_token", &"<redacted>")
            .field("cluster", &self.cluster)
            .field("voice_type", &self.voice_type)
            .field("host", &self.host)
            .field("ws_url", &self.ws_url)
            .field("uid", &self.uid)
            .finish()
    }
}

/// Clears the access token from memory when the config is dropped.
impl Drop for OpenSpeechConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.access_token.zeroize();
    }
}

impl OpenSpeechConfig {
    /// Creates a config with credentials and all other fields at their defaults.
    pub fn new(app_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.app_id = app_id.into();
        config.access_token = access_token.into();
        config
    }

    /// Sets the cluster name.
    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = cluster.into();
        self
    }

    /// Sets the default voice.
    pub fn with_voice_type(mut self, voice_type: impl Into<String>) -> Self {
        self.voice_type = voice_type.into();
        self
    }

    /// Sets the upstream host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Overrides the full WebSocket URL.
    pub fn with_ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    /// True when both the app id and the access token are configured.
    #[inline]
    pub fn has_credentials(&self) -> bool {
        !self.app_id.is_empty() && !self.access_token.is_empty()
    }

    /// Returns the WebSocket URL of the binary streaming endpoint.
    pub fn ws_url(&self) -> String {
        match &self.ws_url {
            Some(url) => url.clone(),
            None => format!("wss://{}{}", self.host, WS_BINARY_PATH),
        }
    }

    /// Value of the `Authorization` header on the WebSocket upgrade.
    ///
    /// The upstream expects the literal `Bearer;` prefix, semicolon included.
    pub fn authorization_header(&self) -> String {
        format!("Bearer; {}", self.access_token)
    }

    /// Validates the static parts of the configuration.
    ///
    /// Missing credentials are not an error here; they are reported per
    /// request so the server can still boot and answer health checks.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() && self.ws_url.is_none() {
            return Err("OpenSpeech host must not be empty".to_string());
        }
        if self.cluster.trim().is_empty() {
            return Err("OpenSpeech cluster must not be empty".to_string());
        }

        let url = self.ws_url();
        let parsed =
            Url::parse(&url).map_err(|e| format!("Invalid OpenSpeech WebSocket URL '{url}': {e}"))?;
        match parsed.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(format!(
                "OpenSpeech WebSocket URL must use ws or wss, got '{other}'"
            )),
        }
    }
}
