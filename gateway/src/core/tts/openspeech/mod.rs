//! OpenSpeech streaming TTS provider.
//!
//! The upstream speaks a proprietary binary protocol over a WebSocket: every
//! message is a frame with a 4-byte bit-packed header followed by an optional
//! header extension and a payload. The relay sends exactly one gzip-compressed
//! JSON "submit" frame and then consumes audio frames until the final
//! (negative sequence number) frame arrives.
//!
//! # Example
//!
//! ```rust,ignore
//! use openspeech_relay::core::session::SessionRegistry;
//! use openspeech_relay::core::tts::openspeech::{OpenSpeechConfig, stream_synthesis};
//! use openspeech_relay::core::tts::SynthesisRequest;
//!
//! let registry = Arc::new(SessionRegistry::new());
//! let session = registry.start_or_restart("s1").await;
//! let request = SynthesisRequest::new("hello", "s1", config.voice_type.clone());
//!
//! let mut audio = Box::pin(stream_synthesis(config, registry, session, request));
//! while let Some(chunk) = audio.next().await {
//!     sink.write_all(&chunk?).await?;
//! }
//! ```
//!
//! # Authentication
//!
//! The WebSocket upgrade carries `Authorization: Bearer; {access_token}`; the
//! same token and the app id are repeated inside the submit payload.

pub mod client;
pub mod config;
pub mod messages;
pub mod protocol;


pub use client::{DriverState, FrameOutcome, UpstreamConnection, classify_frame, stream_synthesis};
pub use config::OpenSpeechConfig;
pub use messages::SubmitPayload;
pub use protocol::{
    AudioMessage, ErrorPayload, FrontendPayload, ResponseFrame, decode_audio_payload,
    decode_error_payload, decode_frame, decode_frontend_payload, encode_request,
};

// =============================================================================
// API Constants
// =============================================================================

/// Default upstream host.
pub const DEFAULT_HOST: &str = "openspeech.bytedance.com";

/// Path of the binary streaming endpoint on the upstream host.
pub const WS_BINARY_PATH: &str = "/api/v1/tts/ws_binary";

/// Default cluster name.
pub const DEFAULT_CLUSTER: &str = "volcano_icl";

/// Default voice used when a request does not name one.
pub const DEFAULT_VOICE_TYPE: &str = "S_nLVvYpzH1";

/// User id reported in the submit payload.
pub const DEFAULT_UID: &str = "voice_clone_api";

/// Upstream error code reserved for authentication failures.
pub const AUTH_ERROR_CODE: u32 = 45_000_010;

// =============================================================================
// Submit Defaults
// =============================================================================

/// Operation name of the one outbound frame.
pub const OPERATION_SUBMIT: &str = "submit";

/// Audio encoding requested from the upstream; matches the `audio/mpeg` body.
pub const AUDIO_ENCODING: &str = "mp3";

/// Text type of the submitted text.
pub const TEXT_TYPE_PLAIN: &str = "plain";

/// Speed, volume and pitch ratios are fixed at unity.
pub const UNITY_RATIO: f32 = 1.0;
