//! Key pool registry
//!
//! Owns all credential state and exposes the read/mutate operations the
//! rotation policy and executor are built from. Every operation takes the
//! pool mutex, so concurrent callers are serialized; sequences of
//! operations (block, then find, then activate) assume one logical caller
//! at a time, which is the documented usage model.

use super::clock::{Clock, SystemClock};
use super::credential::{ActiveKey, KeyCredential, KeyState, KeyStatus, PoolStatus};
use crate::error::RotationError;
use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct PoolInner {
    keys: Vec<KeyState>,
    active: usize,
}

/// Fixed, ordered pool of API keys plus the index of the active one.
///
/// Constructed once at startup and injected wherever it is needed; there is
/// no global instance. At most one key is active at a time, and blocked
/// keys are never selected until their cooldown expires.
pub struct KeyPool {
    inner: Mutex<PoolInner>,
    clock: Arc<dyn Clock>,
}

impl KeyPool {
    /// Create a pool from a static credential list. The first key is
    /// activated immediately.
    pub fn new(credentials: Vec<KeyCredential>) -> Result<Self> {
        Self::with_clock(credentials, Arc::new(SystemClock))
    }

    /// Create a pool with an explicit clock (deterministic in tests).
    pub fn with_clock(credentials: Vec<KeyCredential>, clock: Arc<dyn Clock>) -> Result<Self> {
        anyhow::ensure!(
            !credentials.is_empty(),
            "key pool requires at least one credential"
        );

        let keys: Vec<KeyState> = credentials.into_iter().map(KeyState::new).collect();
        let pool = Self {
            inner: Mutex::new(PoolInner { keys, active: 0 }),
            clock,
        };
        pool.activate(0);

        tracing::info!(key_count = pool.len(), "initialized API key pool");
        Ok(pool)
    }

    /// Mark the key at `index` as active and stamp its `last_used_at`.
    /// Indices come from `find_next_available`, so they are always valid.
    pub fn activate(&self, index: usize) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();
        inner.active = index;
        inner.keys[index].last_used_at = Some(now);
        tracing::info!(key = %inner.keys[index].credential.label(), "activated API key");
    }

    /// Index of the currently active key.
    pub fn active_index(&self) -> usize {
        self.inner.lock().unwrap().active
    }

    /// Label and secret of the currently active key.
    pub fn active(&self) -> ActiveKey {
        let inner = self.inner.lock().unwrap();
        let cred = &inner.keys[inner.active].credential;
        ActiveKey {
            label: cred.label().to_string(),
            secret: cred.secret().clone(),
        }
    }

    /// Return the active key, switching to an available one first if the
    /// active key is still under cooldown.
    pub fn ensure_active(&self) -> Result<ActiveKey, RotationError> {
        let blocked = {
            let inner = self.inner.lock().unwrap();
            inner.keys[inner.active].blocked
        };
        if blocked {
            let next = self
                .find_next_available()
                .ok_or(RotationError::NoKeysAvailable)?;
            self.activate(next);
        }
        Ok(self.active())
    }

    /// Find the key to rotate to: first clear any cooldown that has
    /// expired (resetting that key's failure count), then pick the
    /// non-blocked key with the oldest `last_used_at`, ties broken by
    /// lowest index. `None` when every key is blocked.
    pub fn find_next_available(&self) -> Option<usize> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();

        for state in &mut inner.keys {
            if state.blocked && state.blocked_until.is_some_and(|until| now > until) {
                state.blocked = false;
                state.blocked_until = None;
                state.failure_count = 0;
                tracing::info!(key = %state.credential.label(), "cooldown expired, key unblocked");
            }
        }

        // `None` last_used_at sorts first, so never-used keys win LRU.
        (0..inner.keys.len())
            .filter(|&i| !inner.keys[i].blocked)
            .min_by_key(|&i| (inner.keys[i].last_used_at, i))
    }

    /// Put the key at `index` under cooldown and count the failure.
    pub fn block(&self, index: usize, cooldown: Duration) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap();
        let state = &mut inner.keys[index];
        state.blocked = true;
        state.blocked_until = Some(now + cooldown);
        state.failure_count += 1;
        tracing::warn!(
            key = %state.credential.label(),
            cooldown_secs = cooldown.as_secs(),
            failures = state.failure_count,
            "blocked API key"
        );
    }

    /// Side-effect-free view of every key plus aggregate counts.
    pub fn status_snapshot(&self) -> PoolStatus {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap();

        let keys: Vec<KeyStatus> = inner
            .keys
            .iter()
            .map(|state| KeyStatus {
                label: state.credential.label().to_string(),
                blocked: state.blocked,
                failure_count: state.failure_count,
                minutes_until_unblock: minutes_until(state.blocked_until, state.blocked, now),
            })
            .collect();

        let blocked_keys = keys.iter().filter(|k| k.blocked).count();
        PoolStatus {
            current_key: inner.keys[inner.active].credential.label().to_string(),
            total_keys: keys.len(),
            blocked_keys,
            available_keys: keys.len() - blocked_keys,
            keys,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn minutes_until(blocked_until: Option<Instant>, blocked: bool, now: Instant) -> u64 {
    if !blocked {
        return 0;
    }
    blocked_until
        .map(|until| until.saturating_duration_since(now).as_secs() / 60)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypool::clock::ManualClock;

    const COOLDOWN: Duration = Duration::from_secs(3600);

    fn pool_with_clock(labels: &[&str]) -> (KeyPool, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let creds = labels
            .iter()
            .map(|l| KeyCredential::new(format!("secret-{l}"), *l))
            .collect();
        let pool = KeyPool::with_clock(creds, clock.clone()).unwrap();
        (pool, clock)
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(KeyPool::new(vec![]).is_err());
    }

    #[test]
    fn construction_activates_first_key() {
        let (pool, _clock) = pool_with_clock(&["a", "b"]);
        assert_eq!(pool.active_index(), 0);
        assert_eq!(pool.active().label, "a");
    }

    #[test]
    fn lru_selection_prefers_never_used_then_oldest() {
        let (pool, clock) = pool_with_clock(&["a", "b", "c"]);
        // a was activated at construction; b and c are never-used, tie
        // broken by lowest index.
        assert_eq!(pool.find_next_available(), Some(1));

        clock.advance(Duration::from_secs(10));
        pool.activate(1);
        assert_eq!(pool.find_next_available(), Some(2));

        clock.advance(Duration::from_secs(10));
        pool.activate(2);
        // All used now; a has the oldest last_used_at.
        assert_eq!(pool.find_next_available(), Some(0));
    }

    #[test]
    fn blocked_keys_are_skipped_regardless_of_lru() {
        let (pool, clock) = pool_with_clock(&["a", "b", "c"]);
        clock.advance(Duration::from_secs(5));
        pool.activate(2); // c is the most recently used
        pool.block(0, COOLDOWN);
        pool.block(1, COOLDOWN);
        assert_eq!(pool.find_next_available(), Some(2));
    }

    #[test]
    fn all_blocked_returns_none() {
        let (pool, _clock) = pool_with_clock(&["a", "b"]);
        pool.block(0, COOLDOWN);
        pool.block(1, COOLDOWN);
        assert_eq!(pool.find_next_available(), None);
    }

    #[test]
    fn block_increments_failure_count() {
        let (pool, _clock) = pool_with_clock(&["a"]);
        pool.block(0, COOLDOWN);
        let status = pool.status_snapshot();
        assert!(status.keys[0].blocked);
        assert_eq!(status.keys[0].failure_count, 1);
    }

    #[test]
    fn unblock_requires_cooldown_to_elapse_strictly() {
        let (pool, clock) = pool_with_clock(&["a"]);
        pool.block(0, COOLDOWN);

        // Exactly at blocked_until: still blocked.
        clock.advance(COOLDOWN);
        assert_eq!(pool.find_next_available(), None);

        // One tick past: unblocked with failure count reset.
        clock.advance(Duration::from_millis(1));
        assert_eq!(pool.find_next_available(), Some(0));
        let status = pool.status_snapshot();
        assert!(!status.keys[0].blocked);
        assert_eq!(status.keys[0].failure_count, 0);
    }

    #[test]
    fn unblocking_is_idempotent() {
        let (pool, clock) = pool_with_clock(&["a"]);
        pool.block(0, COOLDOWN);
        clock.advance(COOLDOWN + Duration::from_secs(1));

        assert_eq!(pool.find_next_available(), Some(0));
        // A second pass sees the same unblocked state, nothing to re-clear.
        assert_eq!(pool.find_next_available(), Some(0));
        assert_eq!(pool.status_snapshot().keys[0].failure_count, 0);
    }

    #[test]
    fn consecutive_blocks_exhaust_the_pool_until_earliest_cooldown() {
        let (pool, clock) = pool_with_clock(&["a", "b", "c"]);
        for i in 0..3 {
            pool.block(i, COOLDOWN);
        }
        assert_eq!(pool.status_snapshot().blocked_keys, 3);
        assert_eq!(pool.find_next_available(), None);

        clock.advance(COOLDOWN + Duration::from_secs(1));
        // All cooldowns started together, so all clear together; LRU picks
        // the oldest (b and c never activated, tie to b).
        assert_eq!(pool.find_next_available(), Some(1));
    }

    #[test]
    fn snapshot_reports_minutes_until_unblock() {
        let (pool, clock) = pool_with_clock(&["a", "b"]);
        pool.block(0, COOLDOWN);
        clock.advance(Duration::from_secs(600));

        let status = pool.status_snapshot();
        assert_eq!(status.keys[0].minutes_until_unblock, 50);
        assert_eq!(status.keys[1].minutes_until_unblock, 0);
        assert_eq!(status.blocked_keys, 1);
        assert_eq!(status.available_keys, 1);
        assert_eq!(status.current_key, "a");
    }

    #[test]
    fn snapshot_is_side_effect_free() {
        let (pool, clock) = pool_with_clock(&["a"]);
        pool.block(0, COOLDOWN);
        clock.advance(COOLDOWN + Duration::from_secs(1));

        // Snapshot after expiry must not unblock; only find_next_available
        // performs the unblock pass.
        let status = pool.status_snapshot();
        assert!(status.keys[0].blocked);
        assert_eq!(status.keys[0].failure_count, 1);
    }

    #[test]
    fn ensure_active_switches_off_a_blocked_key() {
        let (pool, _clock) = pool_with_clock(&["a", "b"]);
        pool.block(0, COOLDOWN);
        let key = pool.ensure_active().unwrap();
        assert_eq!(key.label, "b");
        assert_eq!(pool.active_index(), 1);
    }

    #[test]
    fn ensure_active_fails_when_everything_is_blocked() {
        let (pool, _clock) = pool_with_clock(&["a", "b"]);
        pool.block(0, COOLDOWN);
        pool.block(1, COOLDOWN);
        assert_eq!(
            pool.ensure_active().unwrap_err(),
            RotationError::NoKeysAvailable
        );
    }
}
