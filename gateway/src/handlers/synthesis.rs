//! Streaming synthesis endpoints.
//!
//! `POST /synthesis/stream` relays upstream audio as a chunked `audio/mpeg`
//! body. The first item of the driver stream is awaited before the response
//! is committed, so failures that happen before any audio still produce a
//! proper status code. After the first byte the status is fixed; a later
//! failure is logged and the body simply ends.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use futures_util::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::tts::{SynthesisRequest, stream_synthesis};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Response header carrying the (possibly generated) session id.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Media type of the relayed audio.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Body of a streaming synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Text to synthesize.
    pub text: String,
    /// Client session id; generated when absent or empty.
    #[serde(default, rename = "sessionId", alias = "session_id")]
    pub session_id: Option<String>,
    /// Upstream voice; the configured default when absent or empty.
    #[serde(default, rename = "voiceId", alias = "voice_type")]
    pub voice_id: Option<String>,
}

/// Body of an interrupt request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptRequest {
    #[serde(rename = "sessionId", alias = "session_id")]
    pub session_id: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Starts (or restarts) a synthesis session and streams its audio.
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StreamRequest>,
) -> AppResult<Response> {
    if !state.openspeech.has_credentials() {
        error!("Rejecting synthesis request: OpenSpeech credentials are not configured");
        return Err(AppError::MissingCredentials);
    }
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let session_id =
        non_empty(request.session_id).unwrap_or_else(|| Uuid::new_v4().to_string());
    let session_header = HeaderValue::from_str(&session_id).map_err(|_| {
        AppError::BadRequest("sessionId must be a valid header value".to_string())
    })?;
    let voice_type =
        non_empty(request.voice_id).unwrap_or_else(|| state.openspeech.voice_type.clone());

    info!(
        session_id = %session_id,
        voice_type = %voice_type,
        chars = request.text.chars().count(),
        "Starting synthesis stream"
    );

    let session = state.sessions.start_or_restart(&session_id).await;
    let synthesis = SynthesisRequest::new(request.text, session_id.clone(), voice_type);
    let mut audio = Box::pin(stream_synthesis(
        state.openspeech.clone(),
        state.sessions.clone(),
        session,
        synthesis,
    ));

    let head = match audio.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(e)) => {
            warn!(session_id = %session_id, "Synthesis failed before first byte: {}", e);
            return Err(e.into());
        }
        None => {
            debug!(session_id = %session_id, "Synthesis stream ended without audio");
            None
        }
    };

    let tail_session_id = session_id.clone();
    let tail = audio.scan((), move |_, item| {
        future::ready(match item {
            Ok(chunk) => Some(Ok::<Bytes, Infallible>(chunk)),
            Err(e) => {
                warn!(
                    session_id = %tail_session_id,
                    "Synthesis failed mid-stream, ending body early: {}", e
                );
                None
            }
        })
    });
    let body = Body::from_stream(stream::iter(head.map(Ok::<Bytes, Infallible>)).chain(tail));

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(AUDIO_CONTENT_TYPE)),
            (HeaderName::from_static(SESSION_ID_HEADER), session_header),
        ],
        body,
    )
        .into_response())
}

/// Signals the in-flight stream of a session to stop.
pub async fn interrupt_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InterruptRequest>,
) -> AppResult<Json<Value>> {
    if state.sessions.interrupt(&request.session_id) {
        info!(session_id = %request.session_id, "Synthesis interrupted");
        Ok(Json(json!({ "ok": true })))
    } else {
        debug!(session_id = %request.session_id, "Interrupt for unknown session");
        Err(AppError::SessionNotFound)
    }
}
