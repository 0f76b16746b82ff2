//! JSON payload of the OpenSpeech submit request.
//!
//! The payload is serialized, gzip-compressed and wrapped into a full client
//! request frame by [`super::protocol::encode_request`].

use serde::{Deserialize, Serialize};

use super::config::OpenSpeechConfig;
use super::{AUDIO_ENCODING, OPERATION_SUBMIT, TEXT_TYPE_PLAIN, UNITY_RATIO};
use crate::core::tts::base::SynthesisRequest;

/// Application credentials block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSection {
    pub appid: String,
    pub token: String,
    pub cluster: String,
}

/// Caller identity block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSection {
    pub uid: String,
}

/// Voice and output format parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioSection {
    pub voice_type: String,
    pub encoding: String,
    pub speed_ratio: f32,
    pub volume_ratio: f32,
    pub pitch_ratio: f32,
}

/// Per-call request block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestSection {
    pub reqid: String,
    pub text: String,
    pub text_type: String,
    pub operation: String,
}

/// Complete submit payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitPayload {
    pub app: AppSection,
    pub user: UserSection,
    pub audio: AudioSection,
    pub request: RequestSection,
}

impl SubmitPayload {
    /// Builds the submit payload for one synthesis request.
    ///
    /// `reqid` must be fresh for every call; the upstream uses it to
    /// deduplicate requests.
    pub fn submit(config: &OpenSpeechConfig, request: &SynthesisRequest, reqid: String) -> Self {
        Self {
            app: AppSection {
                appid: config.app_id.clone(),
                token: config.access_token.clone(),
                cluster: config.cluster.clone(),
            },
            user: UserSection {
                uid: config.uid.clone(),
            },
            audio: AudioSection {
                voice_type: request.voice_type.clone(),
                encoding: AUDIO_ENCODING.to_string(),
                speed_ratio: UNITY_RATIO,
                volume_ratio: UNITY_RATIO,
                pitch_ratio: UNITY_RATIO,
            },
            request: RequestSection {
                reqid,
                text: request.text.clone(),
                text_type: TEXT_TYPE_PLAIN.to_string(),
                operation: OPERATION_SUBMIT.to_string(),
            },
        }
    }
}
