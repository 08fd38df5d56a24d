// src/provider/retry.rs — Retry with exponential backoff for provider calls
//
// Wraps an LlmProvider with bounded retries on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts.
// Does NOT retry: bad requests, auth errors, or any streamed call — the
// report stream is consumed once and its failure surfaced as-is.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{ChunkStream, Completion, CompletionRequest, LlmProvider, StructuredRequest};
use crate::infra::config::RetryConfig;
use crate::infra::errors::DossierError;

/// Explicit retry policy: attempt bound, backoff schedule, jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            backoff_factor: cfg.backoff_factor,
            max_delay: Duration::from_millis(cfg.max_delay_ms),
            jitter_fraction: cfg.jitter_fraction,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-indexed), honoring a
    /// server-provided rate-limit hint when present.
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(50.0);

        Duration::from_millis(final_ms as u64)
    }
}

fn rate_limit_delay(error: &DossierError) -> Option<Duration> {
    match error {
        DossierError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Jitter multiplier in [1 - fraction, 1 + fraction], deterministic per
/// attempt so retry timing stays reproducible in tests.
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

/// Provider wrapper adding retry with exponential backoff to the
/// single-shot call paths.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn retrying<T, F, Fut>(&self, mut call: F) -> Result<T, DossierError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, DossierError>>,
    {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retriable() || attempt + 1 == attempts {
                        return Err(e);
                    }

                    let delay = self.policy.delay_for_attempt(attempt, rate_limit_delay(&e));
                    tracing::warn!(
                        provider = self.inner.id(),
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DossierError::Provider {
            provider: self.inner.id().to_string(),
            message: "all retries exhausted".into(),
            retriable: false,
        }))
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, DossierError> {
        self.retrying(|| self.inner.complete(request.clone())).await
    }

    async fn complete_structured(
        &self,
        request: StructuredRequest,
    ) -> Result<Completion, DossierError> {
        self.retrying(|| self.inner.complete_structured(request.clone()))
            .await
    }

    async fn complete_streamed(
        &self,
        request: CompletionRequest,
    ) -> Result<ChunkStream, DossierError> {
        // Streamed calls are single-shot.
        self.inner.complete_streamed(request).await
    }
}
