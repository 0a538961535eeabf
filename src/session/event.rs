//! Event types for the session timeline.
//!
//! This module defines the core event model used by the recorder and replayer.
//! Every recorded fact is an [`Event`]: a common envelope (id, timestamp, duration,
//! parent back-reference, tags) around a payload whose shape is fixed per event
//! type by the [`EventData`] tagged union.
//!
//! On the wire each event serializes as `{id, timestamp, type, data, duration_ms,
//! parent_id, tags}` where `type` is one of the closed tag set
//! `{input, output, llm_call, tool_call, state_change, error, log, custom}` and
//! `data` is the payload document for that type. Unknown type tags are rejected at
//! deserialization rather than coerced to `custom`, so schema drift surfaces
//! immediately.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Types of events that can be recorded.
///
/// This is a closed set: the recorder only produces these tags, and the loader
/// rejects documents carrying anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Input,
    Output,
    LlmCall,
    ToolCall,
    StateChange,
    Error,
    Log,
    Custom,
}

impl EventType {
    /// String form of the tag as it appears in persisted documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Input => "input",
            EventType::Output => "output",
            EventType::LlmCall => "llm_call",
            EventType::ToolCall => "tool_call",
            EventType::StateChange => "state_change",
            EventType::Error => "error",
            EventType::Log => "log",
            EventType::Custom => "custom",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token counts for a single LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    #[serde(default)]
    pub input: u64,
    /// Tokens produced in the response.
    #[serde(default)]
    pub output: u64,
}

impl TokenUsage {
    /// Create a usage record from input/output counts.
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }
}

/// Payload for `input` and `output` events: one message crossing the agent boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    /// Role of the speaker (user, system, assistant, agent, ...).
    pub role: String,
    /// Message content.
    pub content: String,
    /// Additional caller-supplied metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Payload for `llm_call` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmCallData {
    /// Model identifier.
    pub model: String,
    /// Prompt sent to the model: a plain string or a message list, caller's choice.
    pub prompt: Value,
    /// Model response in the same open form.
    pub response: Value,
    /// Token counts; zero when the caller did not supply any.
    #[serde(default)]
    pub tokens: TokenUsage,
    /// Additional caller-supplied metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Payload for `tool_call` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallData {
    /// Name of the tool that was invoked.
    pub tool: String,
    /// Arguments passed to the tool.
    pub args: HashMap<String, Value>,
    /// Result returned by the tool.
    pub result: Value,
    /// Whether the call succeeded.
    pub success: bool,
    /// Error message when the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload for `state_change` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeData {
    /// Key in the tracked state mapping.
    pub key: String,
    /// Value before the change.
    pub old_value: Value,
    /// Value after the change.
    pub new_value: Value,
}

/// Payload for `error` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Error message.
    pub error: String,
    /// Error class or kind, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Captured stack trace, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// Additional context at the point of failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, Value>>,
}

/// Payload for `log` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogData {
    /// Log level (debug, info, warn, error).
    pub level: String,
    /// Log message.
    pub message: String,
    /// Structured data attached to the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, Value>>,
}

/// Typed payload union, one variant per event type.
///
/// Serialization is adjacently tagged so the variant name becomes the event
/// document's `type` field and the payload becomes its `data` field. The
/// `custom` variant keeps an open object payload; span start/end markers are
/// recorded through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventData {
    Input(MessageData),
    Output(MessageData),
    LlmCall(LlmCallData),
    ToolCall(ToolCallData),
    StateChange(StateChangeData),
    Error(ErrorData),
    Log(LogData),
    Custom(Map<String, Value>),
}

impl EventData {
    /// The tag for this payload.
    pub fn event_type(&self) -> EventType {
        match self {
            EventData::Input(_) => EventType::Input,
            EventData::Output(_) => EventType::Output,
            EventData::LlmCall(_) => EventType::LlmCall,
            EventData::ToolCall(_) => EventType::ToolCall,
            EventData::StateChange(_) => EventType::StateChange,
            EventData::Error(_) => EventType::Error,
            EventData::Log(_) => EventType::Log,
            EventData::Custom(_) => EventType::Custom,
        }
    }

    /// The payload as a JSON document, without the type tag.
    ///
    /// This is the `data` field of the persisted form, used by text search and
    /// diff reporting.
    pub fn payload(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut tagged)) => tagged.remove("data").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// A single recorded event.
///
/// Events are immutable once created: the recorder assigns `id` and `timestamp`
/// at creation time and nothing rewrites them afterwards. `parent_id` points at
/// the enclosing span's start event, forming a forest over the flat event list.
/// A parent can only be an earlier (numerically smaller) id, so cycles cannot
/// occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique, strictly increasing id within the session, starting at 1.
    pub id: u64,
    /// Capture-time instant (UTC).
    pub timestamp: DateTime<Utc>,
    /// Typed payload; carries the `type` tag and `data` document.
    #[serde(flatten)]
    pub data: EventData,
    /// Wall-clock duration for timed operations.
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Id of the enclosing span's start event, when recorded inside a span.
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Free-form tags in insertion order; duplicates allowed.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Event {
    /// The event's type tag.
    pub fn event_type(&self) -> EventType {
        self.data.event_type()
    }

    /// Whether any of the event's tags equals `tag` (existence-based matching).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Get a short summary of the event.
    pub fn summary(&self) -> String {
        match &self.data {
            EventData::Input(msg) => format!("Input: {}", preview(&msg.content, 50)),
            EventData::Output(msg) => format!("Output: {}", preview(&msg.content, 50)),
            EventData::LlmCall(call) => format!(
                "LLM ({}): {} in / {} out",
                call.model, call.tokens.input, call.tokens.output
            ),
            EventData::ToolCall(call) => format!("Tool: {}", call.tool),
            EventData::Error(err) => format!("Error: {}", err.error),
            EventData::StateChange(change) => format!("State: {} changed", change.key),
            EventData::Log(_) | EventData::Custom(_) => self.event_type().as_str().to_string(),
        }
    }
}

/// Truncate `text` to at most `max` characters, appending an ellipsis when cut.
///
/// Counts characters rather than bytes so multi-byte content never splits.
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
