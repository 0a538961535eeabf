//! Session recording
//!
//! The [`Recorder`] owns exactly one [`Session`] for its lifetime and appends
//! events to it through the `record_*` methods. Every recording call funnels
//! through one internal step that assigns the next id, stamps the timestamp,
//! attributes the event to the innermost open span, appends it, and snapshots
//! the tracked state when there is any.
//!
//! Recording is single-writer by construction: every recording method takes
//! `&mut self`, so the borrow checker enforces the one-logical-thread rule.
//! Hosts that need to record from several tasks wrap the recorder in
//! [`SharedRecorder`](crate::integrations::SharedRecorder) instead.
//!
//! # Spans
//!
//! [`Recorder::span`] returns a [`Span`] guard that marks a named region of the
//! timeline. Events recorded through the guard (it derefs to the recorder)
//! carry the span's start event id as their `parent_id`. Dropping the guard,
//! including during a panic, closes the span with a matching end event, so the
//! span stack can never underflow or leak into later events.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use agent_replay::Recorder;
//! use serde_json::json;
//!
//! let mut recorder = Recorder::new();
//! recorder.record_input("user", "What is the weather?", None);
//! {
//!     let mut span = recorder.span("plan", None);
//!     span.record_llm_call("qwen3:32b", "...", "...", None, Some(120.0), None);
//! }
//! recorder.record_output("assistant", "Sunny, 22C", None);
//! recorder.save("session.json")?;
//! ```

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::session::{
    ErrorData, Event, EventData, LlmCallData, LogData, MessageData, Session, StateChangeData,
    TokenUsage, ToolCallData,
};

/// Records agent sessions for later replay and debugging.
///
/// A recorder is created once per agent run. It hands out strictly increasing
/// event ids starting at 1, tracks a live key/value state mapping, and keeps a
/// span stack for parent attribution. The finished session is obtained with
/// [`Recorder::save`], [`Recorder::to_json`], or [`Recorder::into_session`].
#[derive(Debug)]
pub struct Recorder {
    session: Session,
    event_counter: u64,
    state: HashMap<String, Value>,
    span_stack: Vec<u64>,
    recording: bool,
}

impl Recorder {
    /// Create a recorder with a generated session id and no metadata.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for a recorder with a chosen session id or metadata.
    pub fn builder() -> RecorderBuilder {
        RecorderBuilder::new()
    }

    /// Mark recording active for a scope and stamp the session end on exit.
    ///
    /// The returned guard derefs to the recorder, so recording calls go through
    /// it unchanged. When the guard drops, even during a panic, `ended_at` is
    /// set to the current instant. The flag itself is advisory bookkeeping; it
    /// does not gate whether recording calls succeed.
    pub fn capture(&mut self) -> Capture<'_> {
        self.recording = true;
        Capture { recorder: self }
    }

    /// Whether a [`Capture`] scope is currently open.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Record an input event.
    ///
    /// # Arguments
    ///
    /// * `role` - Role of the speaker (user, system, ...)
    /// * `content` - Input content
    /// * `metadata` - Additional metadata
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_input(
        &mut self,
        role: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> &Event {
        let data = MessageData {
            role: role.into(),
            content: content.into(),
            metadata,
        };
        self.create_event(EventData::Input(data), None, None)
    }

    /// Record an output event.
    ///
    /// # Arguments
    ///
    /// * `role` - Role of the producer (assistant, agent, ...)
    /// * `content` - Output content
    /// * `metadata` - Additional metadata
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_output(
        &mut self,
        role: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> &Event {
        let data = MessageData {
            role: role.into(),
            content: content.into(),
            metadata,
        };
        self.create_event(EventData::Output(data), None, None)
    }

    /// Record an LLM API call.
    ///
    /// # Arguments
    ///
    /// * `model` - Model identifier
    /// * `prompt` - Prompt sent to the model (string or message list)
    /// * `response` - Model response
    /// * `tokens` - Token counts, zero when not supplied
    /// * `duration_ms` - Call duration
    /// * `metadata` - Additional metadata
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_llm_call(
        &mut self,
        model: impl Into<String>,
        prompt: impl Into<Value>,
        response: impl Into<Value>,
        tokens: Option<TokenUsage>,
        duration_ms: Option<f64>,
        metadata: Option<HashMap<String, Value>>,
    ) -> &Event {
        let data = LlmCallData {
            model: model.into(),
            prompt: prompt.into(),
            response: response.into(),
            tokens: tokens.unwrap_or_default(),
            metadata,
        };
        self.create_event(EventData::LlmCall(data), duration_ms, None)
    }

    /// Record a tool call.
    ///
    /// # Arguments
    ///
    /// * `tool` - Tool name
    /// * `args` - Tool arguments
    /// * `result` - Tool result
    /// * `duration_ms` - Call duration
    /// * `success` - Whether the call succeeded
    /// * `error` - Error message if it failed
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_tool_call(
        &mut self,
        tool: impl Into<String>,
        args: HashMap<String, Value>,
        result: impl Into<Value>,
        duration_ms: Option<f64>,
        success: bool,
        error: Option<String>,
    ) -> &Event {
        let data = ToolCallData {
            tool: tool.into(),
            args,
            result: result.into(),
            success,
            error,
        };
        self.create_event(EventData::ToolCall(data), duration_ms, None)
    }

    /// Record a state change and update the tracked state.
    ///
    /// This is the only recording call that mutates the live state mapping:
    /// `key` is set to `new_value` before the event's snapshot is taken, so the
    /// snapshot stored under the new event's id already reflects the change.
    ///
    /// # Arguments
    ///
    /// * `key` - State key
    /// * `old_value` - Previous value
    /// * `new_value` - New value
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_state_change(
        &mut self,
        key: impl Into<String>,
        old_value: impl Into<Value>,
        new_value: impl Into<Value>,
    ) -> &Event {
        let key = key.into();
        let new_value = new_value.into();
        self.state.insert(key.clone(), new_value.clone());
        let data = StateChangeData {
            key,
            old_value: old_value.into(),
            new_value,
        };
        self.create_event(EventData::StateChange(data), None, None)
    }

    /// Record an error. The event is automatically tagged `error`.
    ///
    /// # Arguments
    ///
    /// * `error` - Error message
    /// * `error_type` - Error class or kind
    /// * `stack_trace` - Captured stack trace
    /// * `context` - Additional context at the point of failure
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_error(
        &mut self,
        error: impl Into<String>,
        error_type: Option<String>,
        stack_trace: Option<String>,
        context: Option<HashMap<String, Value>>,
    ) -> &Event {
        let data = ErrorData {
            error: error.into(),
            error_type,
            stack_trace,
            context,
        };
        self.create_event(EventData::Error(data), None, Some(vec!["error".to_string()]))
    }

    /// Record a log message.
    ///
    /// # Arguments
    ///
    /// * `level` - Log level (debug, info, warn, error)
    /// * `message` - Log message
    /// * `data` - Structured data attached to the line
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_log(
        &mut self,
        level: impl Into<String>,
        message: impl Into<String>,
        data: Option<HashMap<String, Value>>,
    ) -> &Event {
        let log = LogData {
            level: level.into(),
            message: message.into(),
            data,
        };
        self.create_event(EventData::Log(log), None, None)
    }

    /// Record a custom event with an open payload.
    ///
    /// # Arguments
    ///
    /// * `data` - Free-form payload document
    /// * `duration_ms` - Optional duration
    /// * `tags` - Optional tags
    ///
    /// # Returns
    ///
    /// The created event.
    pub fn record_custom(
        &mut self,
        data: Map<String, Value>,
        duration_ms: Option<f64>,
        tags: Option<Vec<String>>,
    ) -> &Event {
        self.create_event(EventData::Custom(data), duration_ms, tags)
    }

    /// Open a span to group subsequent events.
    ///
    /// Appends a `custom` start marker `{span: name, status: "started"}` and
    /// pushes its id on the span stack. Events recorded through the returned
    /// guard carry that id as `parent_id`. Dropping the guard pops the stack
    /// and appends the matching end marker with the measured duration and the
    /// same tags. Spans nest; an inner span's markers are attributed to the
    /// outer span.
    ///
    /// # Arguments
    ///
    /// * `name` - Span name
    /// * `tags` - Tags applied to both the start and end markers
    pub fn span(&mut self, name: impl Into<String>, tags: Option<Vec<String>>) -> Span<'_> {
        let name = name.into();
        let tags = tags.unwrap_or_default();
        let started = Instant::now();

        let mut payload = Map::new();
        payload.insert("span".to_string(), Value::String(name.clone()));
        payload.insert("status".to_string(), Value::String("started".to_string()));
        let start_id = self
            .create_event(EventData::Custom(payload), None, Some(tags.clone()))
            .id;
        self.span_stack.push(start_id);

        Span {
            recorder: self,
            name,
            tags,
            start_id,
            started,
        }
    }

    /// Set a tracked state value without recording an event.
    ///
    /// The next recorded event's snapshot will include the value. Use
    /// [`Recorder::record_state_change`] when the change itself should appear
    /// in the timeline.
    pub fn set_state(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.insert(key.into(), value.into());
    }

    /// The live tracked state.
    pub fn get_state(&self) -> &HashMap<String, Value> {
        &self.state
    }

    /// All events recorded so far, in order.
    pub fn timeline(&self) -> &[Event] {
        self.session.events()
    }

    /// The session being recorded.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Finish recording and take the session out of the recorder.
    ///
    /// Stamps `ended_at` if it is still unset.
    pub fn into_session(mut self) -> Session {
        if self.session.ended_at().is_none() {
            self.session.set_ended_at(Utc::now());
        }
        self.session
    }

    /// Serialize the session to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        self.session.to_json()
    }

    /// Save the session to a file as JSON.
    ///
    /// Stamps `ended_at` first if it is still unset. Write failures are
    /// surfaced to the caller; nothing is retried.
    ///
    /// # Arguments
    ///
    /// * `path` - Output path
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.session.ended_at().is_none() {
            self.session.set_ended_at(Utc::now());
        }
        self.session.save(&path)?;
        info!(
            "Saved session {} to {}",
            self.session.session_id(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Create and append an event.
    ///
    /// Assigns the next id, stamps the timestamp, sets `parent_id` from the top
    /// of the span stack, and snapshots the tracked state when it is non-empty.
    fn create_event(
        &mut self,
        data: EventData,
        duration_ms: Option<f64>,
        tags: Option<Vec<String>>,
    ) -> &Event {
        self.event_counter += 1;
        let id = self.event_counter;
        let event = Event {
            id,
            timestamp: Utc::now(),
            data,
            duration_ms,
            parent_id: self.span_stack.last().copied(),
            tags: tags.unwrap_or_default(),
        };

        debug!("Recorded event {} ({})", id, event.event_type());
        self.session.push_event(event);
        if !self.state.is_empty() {
            self.session.snapshot_state(id, self.state.clone());
        }

        let index = self.session.event_count() - 1;
        &self.session.events()[index]
    }

    fn pop_span(&mut self) {
        self.span_stack.pop();
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a `Recorder` with custom configuration.
pub struct RecorderBuilder {
    session_id: Option<String>,
    metadata: HashMap<String, Value>,
}

impl RecorderBuilder {
    /// Create a new builder
    fn new() -> Self {
        Self {
            session_id: None,
            metadata: HashMap::new(),
        }
    }

    /// Set the session id (default: a generated 8-character id)
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the session metadata (default: empty)
    pub fn metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Add a single session metadata entry
    pub fn metadata_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the recorder
    pub fn build(self) -> Recorder {
        let session_id = self.session_id.unwrap_or_else(generate_session_id);
        Recorder {
            session: Session::new(session_id, self.metadata),
            event_counter: 0,
            state: HashMap::new(),
            span_stack: Vec::new(),
            recording: false,
        }
    }
}

impl Default for RecorderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a short random session id.
fn generate_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Guard for an open span. Derefs to the recorder.
///
/// Created by [`Recorder::span`]. Dropping the guard pops the span stack and
/// records the end marker, including when the scope unwinds from a panic.
pub struct Span<'a> {
    recorder: &'a mut Recorder,
    name: String,
    tags: Vec<String>,
    start_id: u64,
    started: Instant,
}

impl Span<'_> {
    /// Id of the span's start event.
    pub fn id(&self) -> u64 {
        self.start_id
    }

    /// Name of the span.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Deref for Span<'_> {
    type Target = Recorder;

    fn deref(&self) -> &Recorder {
        self.recorder
    }
}

impl DerefMut for Span<'_> {
    fn deref_mut(&mut self) -> &mut Recorder {
        self.recorder
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        // Pop before recording so the end marker is attributed to the outer
        // span, as a sibling of the start marker.
        self.recorder.pop_span();
        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;

        let mut payload = Map::new();
        payload.insert("span".to_string(), Value::String(self.name.clone()));
        payload.insert("status".to_string(), Value::String("completed".to_string()));
        payload.insert("span_start_id".to_string(), Value::from(self.start_id));
        self.recorder.create_event(
            EventData::Custom(payload),
            Some(duration_ms),
            Some(self.tags.clone()),
        );
    }
}

/// Guard for a capture scope. Derefs to the recorder.
///
/// Created by [`Recorder::capture`]. Dropping the guard clears the recording
/// flag and stamps the session's `ended_at`.
pub struct Capture<'a> {
    recorder: &'a mut Recorder,
}

impl Deref for Capture<'_> {
    type Target = Recorder;

    fn deref(&self) -> &Recorder {
        self.recorder
    }
}

impl DerefMut for Capture<'_> {
    fn deref_mut(&mut self) -> &mut Recorder {
        self.recorder
    }
}

impl Drop for Capture<'_> {
    fn drop(&mut self) {
        self.recorder.recording = false;
        self.recorder.session.set_ended_at(Utc::now());
    }
}
