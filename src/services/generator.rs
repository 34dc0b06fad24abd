//! Retry-with-timeout executor
//!
//! Drives one logical generate request to completion across at most
//! `max_retries + 1` attempts. Each attempt runs the remote call on its
//! own tokio task under a hard wall-clock bound; a hung call is abandoned
//! (the caller stops waiting, the task is not aborted at the transport
//! level). Timeouts rotate the key silently, rate limits block it for a
//! cooldown and back off briefly, anything else propagates unchanged.

use crate::error::{ErrorClass, GenerateError, RemoteError};
use crate::keypool::{ActiveKey, KeyPool, PoolStatus, RotationPolicy, DEFAULT_COOLDOWN};
use crate::schemas::gemini::GenerationConfig;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;
use validator::Validate;

/// The remote call primitive the executor retries over.
///
/// Implementations must not enforce their own overall deadline; the
/// executor bounds each attempt.
#[async_trait]
pub trait RemoteGenerator: Send + Sync + 'static {
    async fn call(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, RemoteError>;
}

/// Tuning knobs for rotation and backoff.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Cooldown applied to a rate-limited key
    pub cooldown: Duration,
    /// Lower bound of the randomized backoff after a rate-limit rotation
    pub backoff_min: Duration,
    /// Upper bound of the randomized backoff
    pub backoff_max: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(3),
        }
    }
}

impl GeneratorConfig {
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_min = min;
        self.backoff_max = max;
        self
    }
}

/// Outcome of a single bounded attempt.
enum AttemptOutcome {
    Success(String),
    TimedOut,
    RateLimited(RemoteError),
    Failed(RemoteError),
}

/// Story generator: the single reliable `generate` operation over a pool
/// of rotating API keys.
pub struct StoryGenerator<R: RemoteGenerator> {
    remote: Arc<R>,
    pool: Arc<KeyPool>,
    policy: RotationPolicy,
    config: GeneratorConfig,
}

impl<R: RemoteGenerator> StoryGenerator<R> {
    pub fn new(remote: Arc<R>, pool: Arc<KeyPool>) -> Self {
        Self::with_config(remote, pool, GeneratorConfig::default())
    }

    pub fn with_config(remote: Arc<R>, pool: Arc<KeyPool>, config: GeneratorConfig) -> Self {
        Self {
            remote,
            pool,
            policy: RotationPolicy::new(config.cooldown),
            config,
        }
    }

    /// Diagnostic view of the key pool, for display only.
    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status_snapshot()
    }

    /// Generate text for `prompt`, rotating and retrying across the key
    /// pool as needed. Returns the generated text or one of the terminal
    /// failures of the error taxonomy.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<String, GenerateError> {
        config.validate()?;

        let request_id = Uuid::new_v4();
        let attempts = max_retries + 1;

        for attempt in 1..=attempts {
            let key = self
                .pool
                .ensure_active()
                .map_err(|_| GenerateError::NoKeysAvailable)?;
            let label = key.label.clone();

            tracing::debug!(
                %request_id,
                attempt,
                total = attempts,
                key = %label,
                model = %model,
                "starting generate attempt"
            );

            match self.attempt(key, model, prompt, config, timeout).await? {
                AttemptOutcome::Success(text) => {
                    tracing::info!(%request_id, key = %label, chars = text.len(), "generate succeeded");
                    return Ok(text);
                }
                AttemptOutcome::TimedOut => {
                    tracing::info!(
                        %request_id,
                        key = %label,
                        timeout_secs = timeout.as_secs(),
                        "attempt timed out, rotating key"
                    );
                    match self.policy.on_timeout(&self.pool) {
                        Ok(_) if attempt < attempts => continue,
                        Ok(_) => break,
                        Err(_) => return Err(GenerateError::TimeoutExhausted),
                    }
                }
                AttemptOutcome::RateLimited(err) => {
                    tracing::warn!(
                        %request_id,
                        key = %label,
                        error = %err.message,
                        "rate limit hit, rotating key"
                    );
                    match self.policy.on_rate_limit(&self.pool) {
                        Err(_) => return Err(GenerateError::QuotaExhausted),
                        Ok(_) if attempt < attempts => {
                            sleep(self.backoff()).await;
                            continue;
                        }
                        Ok(_) => break,
                    }
                }
                AttemptOutcome::Failed(err) => {
                    tracing::error!(
                        %request_id,
                        key = %label,
                        error = %err.message,
                        "non-transient remote error"
                    );
                    return Err(GenerateError::Remote(err));
                }
            }
        }

        Err(GenerateError::RetriesExhausted { attempts })
    }

    /// One bounded attempt. The remote call runs on its own task so that
    /// a hung call can be abandoned without blocking the caller past the
    /// timeout.
    async fn attempt(
        &self,
        key: ActiveKey,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
        timeout: Duration,
    ) -> Result<AttemptOutcome, GenerateError> {
        let remote = Arc::clone(&self.remote);
        let model = model.to_string();
        let prompt = prompt.to_string();
        let config = config.clone();

        let handle = tokio::spawn(async move {
            remote
                .call(key.secret.expose(), &model, &prompt, &config)
                .await
        });

        match tokio::time::timeout(timeout, handle).await {
            // Dropping the JoinHandle detaches the task; we stop waiting,
            // the remote call finishes (or hangs) on its own.
            Err(_) => Ok(AttemptOutcome::TimedOut),
            Ok(Err(join_err)) => Err(GenerateError::Internal(
                anyhow::Error::new(join_err).context("generate attempt task failed"),
            )),
            Ok(Ok(Ok(text))) => Ok(AttemptOutcome::Success(text)),
            Ok(Ok(Err(err))) => match err.class() {
                ErrorClass::RateLimited => Ok(AttemptOutcome::RateLimited(err)),
                ErrorClass::Other => Ok(AttemptOutcome::Failed(err)),
            },
        }
    }

    fn backoff(&self) -> Duration {
        let min = self.config.backoff_min.as_millis() as u64;
        let max = self.config.backoff_max.as_millis() as u64;
        let ms = rand::thread_rng().gen_range(min..=max.max(min));
        Duration::from_millis(ms)
    }
}
