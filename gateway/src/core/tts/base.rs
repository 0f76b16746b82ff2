//! Base types shared by the TTS relay.
//!
//! Holds the error taxonomy for upstream synthesis and the request type that
//! the HTTP layer hands to a provider driver.

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can terminate a synthesis stream.
#[derive(Debug, Error)]
pub enum TTSError {
    /// Required credentials are missing; raised before any connection is opened.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Upstream unreachable, or the connection dropped mid-stream.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Header or length inconsistency in a received frame.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A payload declared as gzip did not decompress.
    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    /// Error frame carrying the reserved authentication code.
    #[error("Upstream authentication failed ({code}): {message}")]
    UpstreamAuth { code: u32, message: String },

    /// Any other error frame reported by the upstream.
    #[error("Upstream request failed ({code}): {message}")]
    UpstreamRequest { code: u32, message: String },

    /// The outbound request could not be serialized or compressed.
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// Unrecognized message type or unexpected message shape.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl TTSError {
    /// Upstream error code, for errors reported by an error frame.
    pub fn upstream_code(&self) -> Option<u32> {
        match self {
            TTSError::UpstreamAuth { code, .. } | TTSError::UpstreamRequest { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Human-readable message without the variant prefix.
    ///
    /// Upstream errors expose the decoded message text verbatim so callers see
    /// exactly what the service reported.
    pub fn detail(&self) -> String {
        match self {
            TTSError::UpstreamAuth { message, .. } | TTSError::UpstreamRequest { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

/// Result type for TTS operations.
pub type TTSResult<T> = Result<T, TTSError>;

// =============================================================================
// Request Types
// =============================================================================

/// A single synthesis request, consumed once by one upstream session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    /// Text to synthesize (non-empty).
    pub text: String,
    /// Session identifier used to correlate interrupts.
    pub session_id: String,
    /// Upstream voice identifier.
    pub voice_type: String,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        session_id: impl Into<String>,
        voice_type: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            session_id: session_id.into(),
            voice_type: voice_type.into(),
        }
    }
}
