//! Upstream session driver for OpenSpeech streaming synthesis.
//!
//! One call to [`stream_synthesis`] owns one upstream WebSocket for the
//! lifetime of one synthesis request. The returned stream is lazy: nothing is
//! connected until it is first polled, and it is not restartable.
//!
//! # State machine
//!
//! ```text
//! Connecting --connect ok, submit sent--> Streaming --final frame--> Done
//!     |                                       |  \--cancel signal--> Cancelled
//!     \--connect error--> Failed <--error frame / codec error / drop--/
//! ```
//!
//! The receive wait is the only suspension point of the loop. The cancel
//! signal is checked before every receive and also wakes a parked receive, so
//! an interrupt never lets another chunk through. This goes beyond a purely
//! polled cancel check: an interrupt preempts a receive that is already
//! waiting instead of taking effect after the next upstream message.
//!
//! Cleanup is tied to a drop guard: however the stream ends (including the
//! HTTP client going away mid-stream), the session is released from the
//! registry exactly once and the socket is closed with the connection.

use std::fmt;
use std::sync::Arc;

use async_stream::try_stream;
use bytes::Bytes;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AUTH_ERROR_CODE;
use super::config::OpenSpeechConfig;
use super::messages::SubmitPayload;
use super::protocol::{
    AudioMessage, MSG_AUDIO_ONLY_RESPONSE, MSG_ERROR, MSG_FRONTEND_RESPONSE, decode_audio_payload,
    decode_error_payload, decode_frame, decode_frontend_payload, encode_request,
};
use crate::core::session::{Session, SessionRegistry};
use crate::core::tts::base::{SynthesisRequest, TTSError, TTSResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Driver State
// =============================================================================

/// Lifecycle state of one synthesis stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Connecting,
    Streaming,
    Done,
    Failed,
    Cancelled,
}

impl DriverState {
    /// True for states the driver never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Frame Classification
// =============================================================================

/// What the driver does with one decoded upstream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No output; keep receiving (ack or frontend metadata).
    Continue,
    /// An audio frame. `chunk` is `None` when the frame carried no bytes;
    /// `is_last` ends the stream after the chunk is emitted.
    Audio { chunk: Option<Bytes>, is_last: bool },
}

/// Decodes one raw upstream message and decides what to do with it.
///
/// Error frames and unknown message types come back as `Err`, which
/// terminates the stream.
pub fn classify_frame(raw: &[u8]) -> TTSResult<FrameOutcome> {
    let frame = decode_frame(raw)?;

    match frame.message_type {
        MSG_AUDIO_ONLY_RESPONSE => match decode_audio_payload(&frame.payload, frame.flags)? {
            AudioMessage::Ack => Ok(FrameOutcome::Continue),
            AudioMessage::Chunk {
                sequence, audio, ..
            } => Ok(FrameOutcome::Audio {
                chunk: (!audio.is_empty()).then_some(audio),
                is_last: sequence < 0,
            }),
        },
        MSG_FRONTEND_RESPONSE => {
            let frontend = decode_frontend_payload(&frame.payload, frame.compression)?;
            debug!(
                "Discarding frontend response ({} bytes): {}",
                frontend.body.len(),
                String::from_utf8_lossy(&frontend.body)
            );
            Ok(FrameOutcome::Continue)
        }
        MSG_ERROR => {
            let error = decode_error_payload(&frame.payload, frame.compression)?;
            if error.code == AUTH_ERROR_CODE {
                Err(TTSError::UpstreamAuth {
                    code: error.code,
                    message: error.message,
                })
            } else {
                Err(TTSError::UpstreamRequest {
                    code: error.code,
                    message: error.message,
                })
            }
        }
        other => Err(TTSError::ProtocolViolation(format!(
            "undefined message type 0x{other:X} from TTS server"
        ))),
    }
}

// =============================================================================
// Upstream Connection
// =============================================================================

/// One WebSocket connection to the upstream binary endpoint.
///
/// The socket is released when the value is dropped; [`Self::close`] adds a
/// best-effort close handshake on top.
pub struct UpstreamConnection {
    ws: WsStream,
    closed: bool,
}

impl UpstreamConnection {
    /// Opens the WebSocket with the bearer authorization header.
    pub async fn connect(config: &OpenSpeechConfig) -> TTSResult<Self> {
        let url = config.ws_url();
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TTSError::ConnectionFailed(format!("invalid upstream URL {url}: {e}")))?;

        let authorization = HeaderValue::from_str(&config.authorization_header()).map_err(|_| {
            TTSError::InvalidConfiguration("access token is not a valid header value".to_string())
        })?;
        request.headers_mut().insert(AUTHORIZATION, authorization);

        let (ws, response) = connect_async(request)
            .await
            .map_err(|e| TTSError::ConnectionFailed(format!("{url}: {e}")))?;

        debug!(status = %response.status(), "Connected to OpenSpeech upstream at {}", url);
        Ok(Self { ws, closed: false })
    }

    /// Sends one binary frame.
    pub async fn send_frame(&mut self, frame: Bytes) -> TTSResult<()> {
        self.ws
            .send(Message::Binary(frame))
            .await
            .map_err(|e| TTSError::ConnectionFailed(format!("failed to send request frame: {e}")))
    }

    /// Waits for the next binary message.
    ///
    /// Control frames are skipped. Text messages are a protocol violation; a
    /// close frame or end of stream is a dropped connection.
    pub async fn recv_frame(&mut self) -> TTSResult<Bytes> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(data),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Text(text))) => {
                    return Err(TTSError::ProtocolViolation(format!(
                        "unexpected text message from TTS server: {}",
                        text.as_str()
                    )));
                }
                Some(Ok(Message::Close(frame))) => {
                    self.closed = true;
                    let reason = frame
                        .map(|f| format!(" ({}: {})", f.code, f.reason))
                        .unwrap_or_default();
                    return Err(TTSError::ConnectionFailed(format!(
                        "upstream closed the connection before the final frame{reason}"
                    )));
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(TTSError::ConnectionFailed(e.to_string()));
                }
                None => {
                    self.closed = true;
                    return Err(TTSError::ConnectionFailed(
                        "upstream connection ended before the final frame".to_string(),
                    ));
                }
            }
        }
    }

    /// Best-effort close handshake; failures are swallowed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.ws.close(None).await {
            debug!("Ignoring upstream close error: {}", e);
        }
    }
}

// =============================================================================
// Session Guard
// =============================================================================

/// Releases the session from the registry when the driver ends.
struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session: Session,
    state: DriverState,
}

impl SessionGuard {
    fn transition(&mut self, next: DriverState) {
        debug!(
            session_id = %self.session.id(),
            from = %self.state,
            to = %next,
            "Synthesis state transition"
        );
        self.state = next;
    }

    fn fail(&mut self, error: TTSError) -> TTSError {
        warn!(session_id = %self.session.id(), state = %self.state, "Synthesis failed: {}", error);
        self.transition(DriverState::Failed);
        error
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.session);

        match self.state {
            DriverState::Done => {
                info!(session_id = %self.session.id(), "Synthesis stream completed")
            }
            DriverState::Cancelled => {
                info!(session_id = %self.session.id(), "Synthesis stream cancelled")
            }
            DriverState::Failed => {}
            state => info!(
                session_id = %self.session.id(),
                state = %state,
                "Synthesis stream dropped by consumer"
            ),
        }
    }
}

fn ensure_credentials(config: &OpenSpeechConfig) -> TTSResult<()> {
    if config.has_credentials() {
        Ok(())
    } else {
        Err(TTSError::InvalidConfiguration(
            "missing OpenSpeech app id or access token".to_string(),
        ))
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Streams synthesized audio for one request.
///
/// Yields audio chunks in the order the upstream sent them. The stream ends
/// after the final frame, when the session's cancel signal is set, or with one
/// `Err` item on the first failure. Dropping the stream, polled or not,
/// releases the session.
pub fn stream_synthesis(
    config: Arc<OpenSpeechConfig>,
    registry: Arc<SessionRegistry>,
    session: Session,
    request: SynthesisRequest,
) -> impl Stream<Item = TTSResult<Bytes>> + Send + 'static {
    // Built outside the generator so an unpolled stream still releases on drop.
    let cancel = session.cancel_token().clone();
    let mut guard = SessionGuard {
        registry,
        session,
        state: DriverState::Connecting,
    };

    try_stream! {
        ensure_credentials(&config).map_err(|e| guard.fail(e))?;

        let mut connection = UpstreamConnection::connect(&config)
            .await
            .map_err(|e| guard.fail(e))?;

        let reqid = Uuid::new_v4().to_string();
        info!(
            session_id = %guard.session.id(),
            reqid = %reqid,
            voice_type = %request.voice_type,
            "Submitting synthesis request"
        );
        let frame = encode_request(&SubmitPayload::submit(&config, &request, reqid))
            .map_err(|e| guard.fail(e))?;
        connection
            .send_frame(frame)
            .await
            .map_err(|e| guard.fail(e))?;
        guard.transition(DriverState::Streaming);

        loop {
            if cancel.is_cancelled() {
                connection.close().await;
                guard.transition(DriverState::Cancelled);
                break;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                received = connection.recv_frame() => Some(received),
            };

            let raw = match next {
                Some(received) => received.map_err(|e| guard.fail(e))?,
                None => continue,
            };

            match classify_frame(&raw).map_err(|e| guard.fail(e))? {
                FrameOutcome::Continue => continue,
                FrameOutcome::Audio { chunk, is_last } => {
                    if let Some(chunk) = chunk {
                        yield chunk;
                    }
                    if is_last {
                        connection.close().await;
                        guard.transition(DriverState::Done);
                        break;
                    }
                }
            }
        }
    }
}
