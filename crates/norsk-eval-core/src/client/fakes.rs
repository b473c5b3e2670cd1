//! In-memory model client for tests (no network)
//!
//! [`ScriptedModelClient`] answers per model id from a queue of scripted
//! steps, then repeats a fallback step forever. It counts every call so
//! retry bounds can be asserted.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::ModelClient;
use crate::domain::{ModelTarget, TransportError};

/// One scripted outcome of a `generate` call.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Reply(String),
    Fail(TransportError),
    /// Never completes; only a timeout ends the call.
    Hang,
    /// Panics inside the client.
    Panic(String),
}

#[derive(Debug)]
struct ModelScript {
    steps: VecDeque<ScriptStep>,
    then: ScriptStep,
}

/// Scripted [`ModelClient`] keyed by model id.
///
/// Calls for a model id without a script fail with a connection error.
#[derive(Debug, Default)]
pub struct ScriptedModelClient {
    scripts: Mutex<HashMap<String, ModelScript>>,
    prompt_replies: HashMap<(String, String), String>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `steps` in order for `model_id`, then repeat `then`.
    pub fn script(self, model_id: &str, steps: Vec<ScriptStep>, then: ScriptStep) -> Self {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                model_id.to_string(),
                ModelScript {
                    steps: steps.into(),
                    then,
                },
            );
        self
    }

    pub fn reply_always(self, model_id: &str, text: &str) -> Self {
        self.script(model_id, vec![], ScriptStep::Reply(text.to_string()))
    }

    pub fn fail_always(self, model_id: &str, err: TransportError) -> Self {
        self.script(model_id, vec![], ScriptStep::Fail(err))
    }

    /// Reply with `text` whenever `model_id` is asked exactly `prompt`.
    /// Takes precedence over the model's script.
    pub fn reply_to(mut self, model_id: &str, prompt: &str, text: &str) -> Self {
        self.prompt_replies
            .insert((model_id.to_string(), prompt.to_string()), text.to_string());
        self
    }

    /// Number of `generate` calls seen for `model_id`.
    pub fn calls(&self, model_id: &str) -> u32 {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(model_id)
            .copied()
            .unwrap_or(0)
    }

    fn next_step(&self, model_id: &str, prompt: &str) -> ScriptStep {
        *self
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(model_id.to_string())
            .or_insert(0) += 1;

        if let Some(text) = self
            .prompt_replies
            .get(&(model_id.to_string(), prompt.to_string()))
        {
            return ScriptStep::Reply(text.clone());
        }

        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        match scripts.get_mut(model_id) {
            Some(script) => script.steps.pop_front().unwrap_or_else(|| script.then.clone()),
            None => ScriptStep::Fail(TransportError::Connect(format!(
                "no script for model `{model_id}`"
            ))),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn generate(&self, model: &ModelTarget, prompt: &str) -> Result<String, TransportError> {
        match self.next_step(&model.id, prompt) {
            ScriptStep::Reply(text) => Ok(text),
            ScriptStep::Fail(err) => Err(err),
            ScriptStep::Hang => {
                std::future::pending::<()>().await;
                Err(TransportError::Request("unreachable".to_string()))
            }
            ScriptStep::Panic(message) => panic!("{message}"),
        }
    }
}
