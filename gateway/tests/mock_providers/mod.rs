//! Mock upstream servers for integration tests
//!
//! Simulates the OpenSpeech binary WebSocket endpoint with a scripted
//! sequence of frames, so the relay can be exercised end to end without
//! network access.

// Each integration test binary uses a different subset of the helpers
#![allow(dead_code)]

pub mod openspeech_mock;

pub use openspeech_mock::{MockReport, OpenSpeechMock, Step, frames};
