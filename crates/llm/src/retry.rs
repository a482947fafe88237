use async_trait::async_trait;
use mentor_common::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{Completion, CompletionRequest, ReasoningModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Retries transient completion failures with exponential backoff.
///
/// Only `MentorError::Transient` is retried; permanent errors surface
/// immediately. If the failing provider included a Retry-After hint in its
/// error text, that delay wins over the computed backoff.
pub struct RetryingModel<T: ReasoningModel> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: ReasoningModel> RetryingModel<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    fn parse_retry_after(error_msg: &str) -> Option<u64> {
        let lower = error_msg.to_lowercase();
        if let Some(pos) = lower.find("retry-after") {
            let after = &error_msg[pos..];
            for word in after.split_whitespace().skip(1) {
                let cleaned = word.trim_end_matches(|c: char| !c.is_ascii_digit());
                if let Ok(secs) = cleaned.parse::<u64>() {
                    return Some(secs * 1000);
                }
            }
        }
        None
    }

    fn compute_delay(&self, attempt: u32) -> u64 {
        let base =
            self.policy.initial_delay_ms as f64 * self.policy.backoff_multiplier.powi(attempt as i32);
        let jitter = (base * 0.1 * attempt_jitter(attempt)) as u64;
        let delay = (base as u64).saturating_add(jitter);
        delay.min(self.policy.max_delay_ms)
    }
}

/// Deterministic jitter derived from the attempt number, so retries spread
/// out without pulling in a random-number dependency.
fn attempt_jitter(attempt: u32) -> f64 {
    let x = attempt.wrapping_mul(2654435761);
    (x % 100) as f64 / 100.0
}

#[async_trait]
impl<T: ReasoningModel> ReasoningModel for RetryingModel<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let mut last_error = None;

        for attempt in 0..=self.policy.max_retries {
            match self.inner.complete(request.clone()).await {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    if attempt == self.policy.max_retries || !e.is_transient() {
                        return Err(e);
                    }

                    let error_msg = e.to_string();
                    let delay = Self::parse_retry_after(&error_msg)
                        .unwrap_or_else(|| self.compute_delay(attempt));

                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay,
                        error = %error_msg,
                        "Retrying model request"
                    );

                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap())
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
