//! Instrumentation adapters for host applications
//!
//! The recorder itself is single-writer: every recording call takes `&mut self`.
//! This module is the bridge to hosts that do not look like that: multi-task
//! agents, async LLM clients, tool runners. It provides
//! [`SharedRecorder`], a cloneable thread-safe handle over one recorder, the
//! [`LlmGateway`] seam for LLM providers, and [`RecordingGateway`], a decorator
//! that records every call crossing that seam.
//!
//! # Architecture
//!
//! - **SharedRecorder**: `Arc<Mutex<Recorder>>` handle; clones share one
//!   session and serialize their recording calls through the lock
//! - **LlmGateway**: minimal async completion interface a host implements for
//!   its provider
//! - **RecordingGateway**: wraps any `LlmGateway`, measures each call, and
//!   records it (successes as `llm_call` events, failures as `error` events)
//!   before passing the outcome through unchanged
//! - **observe_tool**: runs a tool closure and records it as a `tool_call`
//!   event, success or failure
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use agent_replay::{Recorder, SharedRecorder, RecordingGateway};
//!
//! let recorder = SharedRecorder::new(Recorder::new());
//! let gateway = RecordingGateway::new(OllamaGateway::default(), recorder.clone());
//!
//! // Hand `gateway` to the agent; every completion lands in the session.
//! run_agent(&gateway).await?;
//! recorder.save("session.json")?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::recorder::Recorder;
use crate::session::{Session, TokenUsage};

/// Thread-safe shared handle over a [`Recorder`].
///
/// Clones share the same underlying recorder and session; each recording call
/// takes the lock for its duration, so events from concurrent tasks interleave
/// but ids stay strictly increasing and gapless. Recording methods return the
/// new event's id.
#[derive(Debug, Clone)]
pub struct SharedRecorder {
    inner: Arc<Mutex<Recorder>>,
}

impl SharedRecorder {
    /// Wrap a recorder in a shareable handle.
    pub fn new(recorder: Recorder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(recorder)),
        }
    }

    /// Run a closure with exclusive access to the recorder.
    ///
    /// This is the escape hatch for recorder APIs that do not fit a simple
    /// delegating method, such as spans:
    ///
    /// ```rust,ignore
    /// shared.with(|rec| {
    ///     let mut span = rec.span("plan", None);
    ///     span.record_log("info", "thinking", None);
    /// });
    /// ```
    pub fn with<R>(&self, f: impl FnOnce(&mut Recorder) -> R) -> R {
        let mut recorder = self.inner.lock().unwrap();
        f(&mut recorder)
    }

    /// Record an input event. Returns the event id.
    pub fn record_input(
        &self,
        role: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_input(role, content, metadata)
            .id
    }

    /// Record an output event. Returns the event id.
    pub fn record_output(
        &self,
        role: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_output(role, content, metadata)
            .id
    }

    /// Record an LLM call. Returns the event id.
    pub fn record_llm_call(
        &self,
        model: impl Into<String>,
        prompt: impl Into<Value>,
        response: impl Into<Value>,
        tokens: Option<TokenUsage>,
        duration_ms: Option<f64>,
        metadata: Option<HashMap<String, Value>>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_llm_call(model, prompt, response, tokens, duration_ms, metadata)
            .id
    }

    /// Record a tool call. Returns the event id.
    pub fn record_tool_call(
        &self,
        tool: impl Into<String>,
        args: HashMap<String, Value>,
        result: impl Into<Value>,
        duration_ms: Option<f64>,
        success: bool,
        error: Option<String>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_tool_call(tool, args, result, duration_ms, success, error)
            .id
    }

    /// Record a state change. Returns the event id.
    pub fn record_state_change(
        &self,
        key: impl Into<String>,
        old_value: impl Into<Value>,
        new_value: impl Into<Value>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_state_change(key, old_value, new_value)
            .id
    }

    /// Record an error event. Returns the event id.
    pub fn record_error(
        &self,
        error: impl Into<String>,
        error_type: Option<String>,
        stack_trace: Option<String>,
        context: Option<HashMap<String, Value>>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_error(error, error_type, stack_trace, context)
            .id
    }

    /// Record a log event. Returns the event id.
    pub fn record_log(
        &self,
        level: impl Into<String>,
        message: impl Into<String>,
        data: Option<HashMap<String, Value>>,
    ) -> u64 {
        self.inner
            .lock()
            .unwrap()
            .record_log(level, message, data)
            .id
    }

    /// Set a tracked state value without recording an event.
    pub fn set_state(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner.lock().unwrap().set_state(key, value);
    }

    /// Run a tool closure and record it as a `tool_call` event.
    ///
    /// The closure's outcome is returned unchanged; a failure is recorded with
    /// `success = false` and the error's display form, then handed back to the
    /// caller.
    pub fn observe_tool<F, E>(
        &self,
        tool: impl Into<String>,
        args: HashMap<String, Value>,
        f: F,
    ) -> std::result::Result<Value, E>
    where
        F: FnOnce() -> std::result::Result<Value, E>,
        E: std::fmt::Display,
    {
        let tool = tool.into();
        let started = Instant::now();
        let outcome = f();
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let (result, success, error) = match &outcome {
            Ok(value) => (value.clone(), true, None),
            Err(e) => (Value::Null, false, Some(e.to_string())),
        };
        debug!("Observed tool {} (success: {})", tool, success);
        self.inner.lock().unwrap().record_tool_call(
            tool,
            args,
            result,
            Some(duration_ms),
            success,
            error,
        );
        outcome
    }

    /// A point-in-time copy of the session recorded so far.
    ///
    /// Subsequent recording does not affect the returned value.
    pub fn session(&self) -> Session {
        self.inner.lock().unwrap().session().clone()
    }

    /// Serialize the session to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.inner.lock().unwrap().to_json()
    }

    /// Save the session to a file, stamping `ended_at` if unset.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.inner.lock().unwrap().save(path)
    }
}

/// A single LLM completion request crossing the [`LlmGateway`] seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model identifier.
    pub model: String,
    /// Messages in the provider's own document form.
    pub messages: Vec<Value>,
}

impl LlmRequest {
    /// Create a request from a model name and message list.
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
        }
    }
}

/// An LLM completion result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Response text.
    pub content: String,
    /// Token counts reported by the provider, zero when unknown.
    #[serde(default)]
    pub usage: TokenUsage,
}

/// Abstract interface for LLM providers
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Complete an LLM request with text response
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Decorator that records every [`LlmGateway`] call into a session.
///
/// Successes become `llm_call` events carrying the request messages, response
/// content, token usage, and measured duration. Failures become `error` events
/// tagged with the model, and the error is propagated unchanged.
pub struct RecordingGateway<G: LlmGateway> {
    inner: G,
    recorder: SharedRecorder,
}

impl<G: LlmGateway> RecordingGateway<G> {
    /// Wrap a gateway so its calls are recorded.
    pub fn new(inner: G, recorder: SharedRecorder) -> Self {
        Self { inner, recorder }
    }

    /// The recorder handle events are written to.
    pub fn recorder(&self) -> &SharedRecorder {
        &self.recorder
    }
}

#[async_trait]
impl<G: LlmGateway> LlmGateway for RecordingGateway<G> {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let model = request.model.clone();
        let prompt = Value::Array(request.messages.clone());

        let started = Instant::now();
        let outcome = self.inner.complete(request).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(response) => {
                debug!("Recording LLM call to {}", model);
                self.recorder.record_llm_call(
                    model,
                    prompt,
                    response.content.clone(),
                    Some(response.usage),
                    Some(duration_ms),
                    None,
                );
            }
            Err(e) => {
                let context = HashMap::from([("model".to_string(), Value::String(model))]);
                self.recorder.record_error(
                    format!("LLM call failed: {}", e),
                    Some("llm_call".to_string()),
                    None,
                    Some(context),
                );
            }
        }

        outcome
    }
}
