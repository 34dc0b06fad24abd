//! Credential types for the key pool

use crate::secret::Secret;
use serde::Serialize;
use std::time::Instant;

/// One API key plus its human-readable label.
///
/// The secret is wrapped so it never appears in logs or debug output; the
/// label is what shows up in diagnostics.
#[derive(Debug, Clone)]
pub struct KeyCredential {
    secret: Secret<String>,
    label: String,
}

impl KeyCredential {
    pub fn new(secret: impl Into<Secret<String>>, label: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn secret(&self) -> &Secret<String> {
        &self.secret
    }
}

/// Registry-internal health and usage bookkeeping for one key.
///
/// Mutated only through `KeyPool` operations while its mutex is held.
#[derive(Debug)]
pub(crate) struct KeyState {
    pub(crate) credential: KeyCredential,
    /// Timestamp of last activation, used for least-recently-used selection
    pub(crate) last_used_at: Option<Instant>,
    /// Cumulative rate-limit failures; reset when a cooldown expires
    pub(crate) failure_count: u32,
    pub(crate) blocked: bool,
    pub(crate) blocked_until: Option<Instant>,
}

impl KeyState {
    pub(crate) fn new(credential: KeyCredential) -> Self {
        Self {
            credential,
            last_used_at: None,
            failure_count: 0,
            blocked: false,
            blocked_until: None,
        }
    }
}

/// Snapshot of the currently active key, safe to move into an attempt task.
#[derive(Debug, Clone)]
pub struct ActiveKey {
    pub label: String,
    pub secret: Secret<String>,
}

/// Per-key entry of a status snapshot. Serializable for display by a UI
/// layer; carries no secret material.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStatus {
    pub label: String,
    pub blocked: bool,
    pub failure_count: u32,
    pub minutes_until_unblock: u64,
}

/// Side-effect-free view of the whole pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub current_key: String,
    pub total_keys: usize,
    pub blocked_keys: usize,
    pub available_keys: usize,
    pub keys: Vec<KeyStatus>,
}
