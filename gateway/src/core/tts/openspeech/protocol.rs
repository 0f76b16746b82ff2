//! Binary frame codec for the OpenSpeech WebSocket protocol.
//!
//! # Frame layout
//!
//! ```text
//!  byte 0          byte 1          byte 2          byte 3
//! +-------+-------+-------+-------+-------+-------+---------------+
//! |version|hdr len|msg type| flags |serial.|compr. |   reserved    |
//! +-------+-------+-------+-------+-------+-------+---------------+
//! | header extensions (hdr len * 4 - 4 bytes)                     |
//! +---------------------------------------------------------------+
//! | payload ...                                                   |
//! +---------------------------------------------------------------+
//! ```
//!
//! All multi-byte integers are big-endian. Outbound frames always use the
//! header `0x11 0x10 0x11 0x00` followed by a 4-byte payload length and the
//! gzip-compressed JSON payload.
//!
//! The header is parsed with explicit shifts and masks into plain integers;
//! interpretation of the message type happens afterwards, in the driver.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;

use crate::core::tts::base::{TTSError, TTSResult};

// =============================================================================
// Header Constants
// =============================================================================

/// Size of the fixed header in bytes (one header word).
pub const HEADER_WORD_SIZE: usize = 4;

/// Protocol version 1, header length 1 word.
pub const PROTOCOL_VERSION: u8 = 0b0001;
pub const HEADER_SIZE_WORDS: u8 = 0b0001;

/// Message type: full client request.
pub const MSG_FULL_CLIENT_REQUEST: u8 = 0b0001;
/// Message type: audio-only server response.
pub const MSG_AUDIO_ONLY_RESPONSE: u8 = 0xB;
/// Message type: frontend server response (non-audio metadata).
pub const MSG_FRONTEND_RESPONSE: u8 = 0xC;
/// Message type: error message from server.
pub const MSG_ERROR: u8 = 0xF;

/// Flags: no sequence number (acknowledgement without audio).
pub const FLAG_NO_SEQUENCE: u8 = 0b0000;
/// Flags: sequence number > 0.
pub const FLAG_POSITIVE_SEQUENCE: u8 = 0b0001;
/// Flags: sequence number < 0.
pub const FLAG_NEGATIVE_SEQUENCE: u8 = 0b0011;

/// Serialization: JSON.
pub const SERIALIZATION_JSON: u8 = 0b0001;

/// Compression: none.
pub const COMPRESSION_NONE: u8 = 0b0000;
/// Compression: gzip.
pub const COMPRESSION_GZIP: u8 = 0b0001;

/// Fixed header of every outbound request frame.
pub const CLIENT_REQUEST_HEADER: [u8; 4] = [
    (PROTOCOL_VERSION << 4) | HEADER_SIZE_WORDS,
    (MSG_FULL_CLIENT_REQUEST << 4) | FLAG_NO_SEQUENCE,
    (SERIALIZATION_JSON << 4) | COMPRESSION_GZIP,
    0x00,
];

// =============================================================================
// Decoded Types
// =============================================================================

/// One decoded upstream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub protocol_version: u8,
    /// Header length in 4-byte words (always >= 1).
    pub header_size: u8,
    pub message_type: u8,
    pub flags: u8,
    pub serialization: u8,
    pub compression: u8,
    pub reserved: u8,
    pub header_extensions: Bytes,
    pub payload: Bytes,
}

impl ResponseFrame {
    /// Byte offset of the payload within the raw frame.
    #[inline]
    pub fn payload_offset(&self) -> usize {
        self.header_size as usize * HEADER_WORD_SIZE
    }
}

/// Decoded payload of an audio-only response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioMessage {
    /// Acknowledgement without a sequence number or audio.
    Ack,
    /// A sequenced audio chunk. A negative sequence number marks the last one.
    Chunk {
        sequence: i32,
        declared_size: u32,
        audio: Bytes,
    },
}

impl AudioMessage {
    /// True when this chunk terminates the stream.
    pub fn is_last(&self) -> bool {
        matches!(self, AudioMessage::Chunk { sequence, .. } if *sequence < 0)
    }
}

/// Decoded payload of an error frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: u32,
    pub declared_size: u32,
    pub message: String,
}

/// Decoded payload of a frontend (metadata) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendPayload {
    pub declared_size: u32,
    pub body: Bytes,
}

// =============================================================================
// Encoding
// =============================================================================

/// Encodes a full client request frame.
///
/// The payload is serialized to JSON, gzip-compressed and prefixed with the
/// fixed header and the big-endian length of the compressed bytes.
pub fn encode_request<T: Serialize>(payload: &T) -> TTSResult<Bytes> {
    let json = serde_json::to_vec(payload)
        .map_err(|e| TTSError::EncodingFailed(format!("request payload: {e}")))?;
    let compressed = gzip_compress(&json)?;

    let mut buf = BytesMut::with_capacity(HEADER_WORD_SIZE + 4 + compressed.len());
    buf.put_slice(&CLIENT_REQUEST_HEADER);
    buf.put_u32(compressed.len() as u32);
    buf.put_slice(&compressed);
    Ok(buf.freeze())
}

// =============================================================================
// Decoding
// =============================================================================

/// Splits a raw upstream message into header fields, extensions and payload.
pub fn decode_frame(raw: &[u8]) -> TTSResult<ResponseFrame> {
    if raw.len() < HEADER_WORD_SIZE {
        return Err(TTSError::MalformedFrame(format!(
            "frame is {} bytes, shorter than the {}-byte header",
            raw.len(),
            HEADER_WORD_SIZE
        )));
    }

    let protocol_version = raw[0] >> 4;
    let header_size = raw[0] & 0x0f;
    let message_type = raw[1] >> 4;
    let flags = raw[1] & 0x0f;
    let serialization = raw[2] >> 4;
    let compression = raw[2] & 0x0f;
    let reserved = raw[3];

    if header_size == 0 {
        return Err(TTSError::MalformedFrame(
            "header size field is zero".to_string(),
        ));
    }

    let payload_offset = header_size as usize * HEADER_WORD_SIZE;
    if raw.len() < payload_offset {
        return Err(TTSError::MalformedFrame(format!(
            "header declares {} bytes but frame is {} bytes",
            payload_offset,
            raw.len()
        )));
    }

    Ok(ResponseFrame {
        protocol_version,
        header_size,
        message_type,
        flags,
        serialization,
        compression,
        reserved,
        header_extensions: Bytes::copy_from_slice(&raw[HEADER_WORD_SIZE..payload_offset]),
        payload: Bytes::copy_from_slice(&raw[payload_offset..]),
    })
}

/// Decodes the payload of an audio-only response.
pub fn decode_audio_payload(payload: &Bytes, flags: u8) -> TTSResult<AudioMessage> {
    if flags == FLAG_NO_SEQUENCE {
        return Ok(AudioMessage::Ack);
    }

    let (sequence, declared_size) = read_prefix(payload, "audio")?;
    Ok(AudioMessage::Chunk {
        sequence: sequence as i32,
        declared_size,
        audio: payload.slice(8..),
    })
}

/// Decodes the payload of an error frame, gunzipping the message if needed.
pub fn decode_error_payload(payload: &Bytes, compression: u8) -> TTSResult<ErrorPayload> {
    let (code, declared_size) = read_prefix(payload, "error")?;
    let message = maybe_decompress(&payload[8..], compression)?;

    Ok(ErrorPayload {
        code,
        declared_size,
        message: String::from_utf8_lossy(&message).into_owned(),
    })
}

/// Decodes the payload of a frontend frame, gunzipping the body if needed.
pub fn decode_frontend_payload(payload: &Bytes, compression: u8) -> TTSResult<FrontendPayload> {
    if payload.len() < 4 {
        return Err(TTSError::MalformedFrame(format!(
            "frontend payload is {} bytes, expected at least 4",
            payload.len()
        )));
    }
    let declared_size = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let body = maybe_decompress(&payload[4..], compression)?;

    Ok(FrontendPayload {
        declared_size,
        body: Bytes::from(body),
    })
}

/// Reads the two leading big-endian words shared by audio and error payloads.
fn read_prefix(payload: &[u8], kind: &str) -> TTSResult<(u32, u32)> {
    if payload.len() < 8 {
        return Err(TTSError::MalformedFrame(format!(
            "{kind} payload is {} bytes, expected at least 8",
            payload.len()
        )));
    }
    let first = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let second = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
    Ok((first, second))
}

fn maybe_decompress(data: &[u8], compression: u8) -> TTSResult<Vec<u8>> {
    if compression == COMPRESSION_GZIP {
        gzip_decompress(data)
    } else {
        Ok(data.to_vec())
    }
}

// =============================================================================
// Gzip
// =============================================================================

/// Gzip-compresses a byte slice.
pub fn gzip_compress(data: &[u8]) -> TTSResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| TTSError::EncodingFailed(format!("gzip: {e}")))?;
    encoder
        .finish()
        .map_err(|e| TTSError::EncodingFailed(format!("gzip: {e}")))
}

/// Gzip-decompresses a byte slice.
pub fn gzip_decompress(data: &[u8]) -> TTSResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| TTSError::DecompressionFailed(e.to_string()))?;
    Ok(out)
}
