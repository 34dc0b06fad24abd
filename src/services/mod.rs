//! Service layer
//!
//! `generator` drives one logical generate request across retries and key
//! rotation; `gemini` is the concrete Gemini REST transport behind it.

pub mod gemini;
pub mod generator;

pub use gemini::GeminiClient;
pub use generator::{GeneratorConfig, RemoteGenerator, StoryGenerator};
