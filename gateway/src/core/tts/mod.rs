pub mod base;
pub mod openspeech;

pub use base::{SynthesisRequest, TTSError, TTSResult};
pub use openspeech::{OpenSpeechConfig, stream_synthesis};
