//! Error types for generation and key rotation

mod types;

pub use types::{ErrorClass, GenerateError, RemoteError, RotationError};
