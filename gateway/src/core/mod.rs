pub mod session;
pub mod tts;

// Re-export commonly used types for convenience
pub use session::{Session, SessionRegistry};
pub use tts::{OpenSpeechConfig, SynthesisRequest, TTSError, TTSResult, stream_synthesis};
