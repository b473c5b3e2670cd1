//! Model client adapter: "send prompt, get completion text".
//!
//! - [`ModelClient`]: one transport attempt against the serving endpoint
//! - [`OllamaClient`]: `reqwest` implementation for the Ollama HTTP API
//! - [`RetryPolicy`]: timeout, retry bound and backoff schedule
//! - [`ModelAdapter`]: applies a policy to a client and turns every outcome
//!   into a [`RawResponse`](crate::domain::RawResponse); it never fails
//! - [`fakes`]: scripted in-memory client for tests

pub mod adapter;
pub mod fakes;
pub mod ollama;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ModelTarget, TransportError};

pub use adapter::ModelAdapter;
pub use ollama::OllamaClient;
pub use retry::RetryPolicy;

/// A single generation attempt against the serving runtime.
///
/// Implementations report every failure as a [`TransportError`]; retries and
/// timeouts are applied by [`ModelAdapter`], not here.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, model: &ModelTarget, prompt: &str) -> Result<String, TransportError>;
}

/// Sampling options forwarded to the serving runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationOptions {
    /// Maximum tokens to generate. Keeps looping models bounded.
    pub num_predict: u32,
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            num_predict: 250,
            temperature: 0.7,
        }
    }
}
