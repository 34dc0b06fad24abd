//! Wire schema definitions

pub mod gemini;
