//! The session aggregate: an append-only event log plus its bookkeeping.
//!
//! A [`Session`] owns everything recorded for one agent run: identity, start and
//! end instants, the ordered event list, caller metadata, and sparse state
//! snapshots keyed by event id. Fields are private; the recorder appends through
//! crate-internal methods and everything else reads through accessors, so a
//! session taken out of a recorder (or loaded from disk) cannot be edited into
//! an inconsistent shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{ReplayError, Result};
use crate::session::event::{Event, EventData, EventType};

/// Session-wide token totals, aggregated over all `llm_call` events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    /// Sum of input tokens.
    pub input: u64,
    /// Sum of output tokens.
    pub output: u64,
    /// Input plus output.
    pub total: u64,
}

/// A complete recording of one agent session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    session_id: String,
    started_at: DateTime<Utc>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    events: Vec<Event>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
    #[serde(default)]
    state_snapshots: BTreeMap<u64, HashMap<String, Value>>,
}

impl Session {
    /// Create an empty session starting now.
    pub(crate) fn new(session_id: String, metadata: HashMap<String, Value>) -> Self {
        Self {
            session_id,
            started_at: Utc::now(),
            ended_at: None,
            events: Vec::new(),
            metadata,
            state_snapshots: BTreeMap::new(),
        }
    }

    /// Append an event to the log.
    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Store a state snapshot keyed by the event that produced it.
    pub(crate) fn snapshot_state(&mut self, event_id: u64, state: HashMap<String, Value>) {
        self.state_snapshots.insert(event_id, state);
    }

    /// Stamp the session end instant.
    pub(crate) fn set_ended_at(&mut self, at: DateTime<Utc>) {
        self.ended_at = Some(at);
    }

    /// Unique identifier of this session.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// When recording started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the session ended, if it has.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// All recorded events in id order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of recorded events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Caller-supplied session metadata.
    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Sparse state snapshots keyed by event id.
    pub fn state_snapshots(&self) -> &BTreeMap<u64, HashMap<String, Value>> {
        &self.state_snapshots
    }

    /// Look up an event by id.
    ///
    /// Events are stored in strictly increasing id order, so this is a binary
    /// search rather than a scan.
    pub fn find_event(&self, event_id: u64) -> Option<&Event> {
        self.events
            .binary_search_by_key(&event_id, |e| e.id)
            .ok()
            .map(|index| &self.events[index])
    }

    /// All events of a given type, in order.
    pub fn events_of_type(&self, event_type: EventType) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// All `llm_call` events.
    pub fn llm_calls(&self) -> Vec<&Event> {
        self.events_of_type(EventType::LlmCall)
    }

    /// All `tool_call` events.
    pub fn tool_calls(&self) -> Vec<&Event> {
        self.events_of_type(EventType::ToolCall)
    }

    /// All `error` events.
    pub fn errors(&self) -> Vec<&Event> {
        self.events_of_type(EventType::Error)
    }

    /// Aggregate token usage across all LLM calls.
    pub fn total_tokens(&self) -> TokenTotals {
        let mut totals = TokenTotals::default();
        for event in &self.events {
            if let EventData::LlmCall(call) = &event.data {
                totals.input += call.tokens.input;
                totals.output += call.tokens.output;
            }
        }
        totals.total = totals.input + totals.output;
        totals
    }

    /// Wall-clock span of the session in milliseconds, once ended.
    pub fn duration_ms(&self) -> Option<f64> {
        self.ended_at.map(|ended| duration_to_ms(ended - self.started_at))
    }

    /// Check the structural invariants of the event log.
    ///
    /// Ids must be strictly increasing (duplicates and reordering are rejected;
    /// gaps are tolerated so hand-trimmed files still load), every `parent_id`
    /// must reference an earlier event, and every state snapshot must be keyed
    /// by a recorded event.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<u64> = HashSet::with_capacity(self.events.len());
        let mut last_id = 0u64;

        for event in &self.events {
            if event.id == 0 {
                return Err(ReplayError::Validation(
                    "event id 0 is invalid, ids start at 1".to_string(),
                ));
            }
            if event.id <= last_id {
                return Err(ReplayError::Validation(format!(
                    "event ids must be strictly increasing, got {} after {}",
                    event.id, last_id
                )));
            }
            if let Some(parent_id) = event.parent_id {
                if parent_id >= event.id {
                    return Err(ReplayError::Validation(format!(
                        "event {} references parent {} which does not precede it",
                        event.id, parent_id
                    )));
                }
                if !seen.contains(&parent_id) {
                    return Err(ReplayError::Validation(format!(
                        "event {} references missing parent {}",
                        event.id, parent_id
                    )));
                }
            }
            seen.insert(event.id);
            last_id = event.id;
        }

        for snapshot_id in self.state_snapshots.keys() {
            if !seen.contains(snapshot_id) {
                return Err(ReplayError::Validation(format!(
                    "state snapshot references missing event {}",
                    snapshot_id
                )));
            }
        }

        Ok(())
    }

    /// Serialize the session to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a session from JSON and check its invariants.
    ///
    /// Malformed documents are rejected as [`ReplayError::Validation`],
    /// whether the JSON fails to parse, a required field is missing, an event
    /// carries an unknown type tag, or a structural invariant does not hold.
    pub fn from_json(json: &str) -> Result<Self> {
        let session: Session =
            serde_json::from_str(json).map_err(|e| ReplayError::Validation(e.to_string()))?;
        session.validate()?;
        Ok(session)
    }

    /// Write the session to a file as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a session from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Convert a chrono duration to fractional milliseconds.
fn duration_to_ms(duration: chrono::Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1000.0,
        None => duration.num_milliseconds() as f64,
    }
}
