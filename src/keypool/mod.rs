//! API key pool with rotation and cooldown support
//!
//! This module owns credential health state for a fixed set of Gemini API
//! keys and the policy for switching between them: silent rotation on
//! timeouts, cooldown blocking on rate limits, least-recently-used
//! selection among available keys.

mod clock;
mod credential;
mod registry;
mod rotation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{ActiveKey, KeyCredential, KeyStatus, PoolStatus};
pub use registry::KeyPool;
pub use rotation::{RotationPolicy, DEFAULT_COOLDOWN};
