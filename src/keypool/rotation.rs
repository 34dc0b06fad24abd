//! Rotation policy
//!
//! Decides how the pool reacts to each attempt outcome. A timeout rotates
//! without penalizing the current key (it may be transient network
//! latency, not key exhaustion); a rate limit blocks the current key for a
//! cooldown before rotating. Any other error is not this policy's
//! business and propagates to the caller untouched.

use super::credential::ActiveKey;
use super::registry::KeyPool;
use crate::error::RotationError;
use std::time::Duration;

/// Default cooldown applied to a rate-limited key.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy)]
pub struct RotationPolicy {
    cooldown: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl RotationPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Rule for a timed-out attempt: switch to the least-recently-used
    /// available key WITHOUT blocking the current one. Fails when the pool
    /// has no other key to offer.
    pub fn on_timeout(&self, pool: &KeyPool) -> Result<ActiveKey, RotationError> {
        let next = pool
            .find_next_available()
            .ok_or(RotationError::NoKeysAvailable)?;
        if next == pool.active_index() {
            return Err(RotationError::NoAlternateKey);
        }
        pool.activate(next);
        let key = pool.active();
        tracing::info!(key = %key.label, "rotated after timeout");
        Ok(key)
    }

    /// Rule for a rate-limited attempt: block the current key for the
    /// cooldown, then activate the next available one. With every key
    /// blocked the rotation fails and the overall operation is out of
    /// credentials.
    pub fn on_rate_limit(&self, pool: &KeyPool) -> Result<ActiveKey, RotationError> {
        pool.block(pool.active_index(), self.cooldown);
        let next = pool
            .find_next_available()
            .ok_or(RotationError::NoKeysAvailable)?;
        pool.activate(next);
        let key = pool.active();
        tracing::info!(key = %key.label, "rotated after rate limit");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypool::clock::ManualClock;
    use crate::keypool::credential::KeyCredential;
    use std::sync::Arc;

    fn pool(labels: &[&str]) -> (KeyPool, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let creds = labels
            .iter()
            .map(|l| KeyCredential::new(format!("secret-{l}"), *l))
            .collect();
        (KeyPool::with_clock(creds, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn timeout_rotates_without_blocking() {
        let (pool, _clock) = pool(&["a", "b"]);
        let policy = RotationPolicy::default();

        let key = policy.on_timeout(&pool).unwrap();
        assert_eq!(key.label, "b");

        let status = pool.status_snapshot();
        assert!(!status.keys[0].blocked);
        assert_eq!(status.keys[0].failure_count, 0);
    }

    #[test]
    fn timeout_with_single_key_fails() {
        let (pool, _clock) = pool(&["a"]);
        let policy = RotationPolicy::default();
        assert_eq!(
            policy.on_timeout(&pool).unwrap_err(),
            RotationError::NoAlternateKey
        );
    }

    #[test]
    fn timeout_with_all_other_keys_blocked_fails() {
        let (pool, _clock) = pool(&["a", "b"]);
        let policy = RotationPolicy::default();
        pool.block(1, policy.cooldown());
        // The only available key is the current one.
        assert_eq!(
            policy.on_timeout(&pool).unwrap_err(),
            RotationError::NoAlternateKey
        );
    }

    #[test]
    fn rate_limit_blocks_current_and_rotates() {
        let (pool, _clock) = pool(&["a", "b"]);
        let policy = RotationPolicy::default();

        let key = policy.on_rate_limit(&pool).unwrap();
        assert_eq!(key.label, "b");

        let status = pool.status_snapshot();
        assert!(status.keys[0].blocked);
        assert_eq!(status.keys[0].failure_count, 1);
        assert!(!status.keys[1].blocked);
    }

    #[test]
    fn rate_limit_on_last_key_fails_and_still_blocks_it() {
        let (pool, _clock) = pool(&["a"]);
        let policy = RotationPolicy::default();
        assert_eq!(
            policy.on_rate_limit(&pool).unwrap_err(),
            RotationError::NoKeysAvailable
        );
        assert!(pool.status_snapshot().keys[0].blocked);
    }

    #[test]
    fn rate_limit_skips_blocked_keys_to_reach_available_one() {
        let (pool, _clock) = pool(&["a", "b", "c"]);
        let policy = RotationPolicy::default();
        pool.block(1, policy.cooldown());

        // a rate-limits; b is blocked; c must be chosen even though it was
        // never the LRU favorite among all three.
        let key = policy.on_rate_limit(&pool).unwrap();
        assert_eq!(key.label, "c");
    }
}
