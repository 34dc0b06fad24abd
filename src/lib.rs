//! Fabula: grounded story generation over the Gemini API
//!
//! The core of the crate is the API-key rotation and retry controller:
//! a fixed pool of credentials for a rate-limited remote service, rotated
//! transparently on timeouts and rate limits, behind a single reliable
//! `generate` operation.

// Public modules
pub mod config;
pub mod error;
pub mod keypool;
pub mod logging;
pub mod schemas;
pub mod secret;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use error::{GenerateError, RemoteError};
pub use keypool::{KeyCredential, KeyPool};
pub use schemas::gemini::GenerationConfig;
pub use services::{GeminiClient, StoryGenerator};
