//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `synthesis` - Streaming synthesis and interrupt endpoints

pub mod api;
pub mod synthesis;

// Re-export commonly used handlers for convenient access
pub use api::health_check;
pub use synthesis::{interrupt_handler, stream_handler};
