//! Shared application state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::session::SessionRegistry;
use crate::core::tts::openspeech::OpenSpeechConfig;

/// State handed to every handler.
///
/// The upstream settings are resolved once at startup and shared read-only;
/// the session registry is the only mutable piece and synchronizes itself.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub openspeech: Arc<OpenSpeechConfig>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let openspeech = Arc::new(config.openspeech.clone());

        if openspeech.has_credentials() {
            info!(
                upstream = %openspeech.ws_url(),
                cluster = %openspeech.cluster,
                "OpenSpeech upstream configured"
            );
        } else {
            warn!(
                "OPENSPEECH_APPID or OPENSPEECH_TOKEN is not set; synthesis requests will fail until configured"
            );
        }

        Arc::new(Self {
            config,
            openspeech,
            sessions: Arc::new(SessionRegistry::new()),
        })
    }
}
