//! Execution controls around a [`ModelClient`]: timeout, bounded retry with
//! exponential backoff.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

use super::{ModelClient, RetryPolicy};
use crate::domain::{ModelTarget, RawResponse, TransportError};
use crate::metrics::METRICS;
use crate::obs;

/// Wraps a client with a [`RetryPolicy`]. Never returns an error: the final
/// transport failure is recorded in [`RawResponse::error`].
#[derive(Clone)]
pub struct ModelAdapter {
    client: Arc<dyn ModelClient>,
    policy: RetryPolicy,
}

impl ModelAdapter {
    pub fn new(client: Arc<dyn ModelClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `prompt` to `model`, retrying transport failures per the policy.
    ///
    /// At most `max_retries + 1` attempts are made. Non-retryable errors
    /// (see [`TransportError::is_retryable`]) end the loop immediately.
    pub async fn invoke(&self, test_id: &str, model: &ModelTarget, prompt: &str) -> RawResponse {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            METRICS.inc_transport_attempts();

            let started = Instant::now();
            let outcome =
                match tokio::time::timeout(self.policy.timeout(), self.client.generate(model, prompt))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_elapsed) => Err(TransportError::Timeout {
                        timeout_ms: self.policy.timeout_ms,
                    }),
                };
            let latency_ms = started.elapsed().as_millis() as u64;

            let err = match outcome {
                Ok(text) => {
                    debug!(test_id, model = %model.name, attempt, latency_ms, "model call succeeded");
                    return RawResponse {
                        test_id: test_id.to_string(),
                        model_name: model.name.clone(),
                        text,
                        latency_ms,
                        attempts: attempt,
                        error: None,
                    };
                }
                Err(err) => err,
            };

            if attempt >= max_attempts || !err.is_retryable() {
                METRICS.inc_transport_failures();
                return RawResponse {
                    test_id: test_id.to_string(),
                    model_name: model.name.clone(),
                    text: String::new(),
                    latency_ms,
                    attempts: attempt,
                    error: Some(err.to_string()),
                };
            }

            let backoff = self.policy.backoff_for(attempt);
            obs::emit_transport_retry(test_id, &model.name, attempt, &err, backoff);
            METRICS.inc_transport_retries();
            tokio::time::sleep(backoff).await;
        }
    }
}
