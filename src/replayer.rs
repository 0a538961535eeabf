//! Session replay and inspection
//!
//! The [`Replayer`] loads a finished [`Session`] and provides read-only
//! navigation over its timeline: a movable cursor, breakpoints, state
//! reconstruction at any event, filtered queries, and session-to-session
//! diffing. It never mutates the session; only its own cursor and breakpoint
//! set change.
//!
//! # Cursor Model
//!
//! The cursor is a position in `[0, total_events]` where 0 means "before the
//! first event". [`Replayer::step`] returns the event at the cursor and
//! advances; [`Replayer::step_back`] retreats and returns the event it landed
//! on. [`Replayer::current`] is the last event consumed, [`Replayer::peek`]
//! the next one without advancing. Out-of-range navigation returns `None`
//! rather than an error, since running off either end is a normal part of
//! interactive debugging.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use agent_replay::Replayer;
//!
//! let mut replayer = Replayer::from_file("session.json")?;
//! replayer.add_breakpoint(12);
//! while let Some(event) = replayer.continue_to_breakpoint() {
//!     println!("hit {}: {}", event.id, event.summary());
//!     println!("state: {:?}", replayer.get_state(None)?);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use crate::error::{ReplayError, Result};
use crate::session::{Event, EventData, EventType, Session, TokenTotals};

/// Session-level aggregates reported by [`Replayer::get_summary`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: String,
    /// When recording started.
    pub started_at: DateTime<Utc>,
    /// When the session ended, if stamped.
    pub ended_at: Option<DateTime<Utc>>,
    /// Wall-clock session length in milliseconds, when ended.
    pub duration_ms: Option<f64>,
    /// Total number of events.
    pub total_events: usize,
    /// Number of `llm_call` events.
    pub llm_calls: usize,
    /// Number of `tool_call` events.
    pub tool_calls: usize,
    /// Number of `error` events.
    pub errors: usize,
    /// Token totals across all LLM calls.
    pub total_tokens: TokenTotals,
    /// Session metadata passthrough.
    pub metadata: HashMap<String, Value>,
}

/// One differing output pair found by [`Replayer::diff`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDiff {
    /// Position of the pair within each session's output sequence.
    pub index: usize,
    /// This session's output payload.
    pub self_data: Value,
    /// The other session's output payload.
    pub other_data: Value,
}

/// Result of comparing two sessions with [`Replayer::diff`].
///
/// Outputs are paired positionally: the nth output of one session against the
/// nth output of the other. When the two sessions produced different numbers
/// of outputs, comparison stops at the shorter sequence and
/// `output_count_mismatch` is set so the truncation is visible rather than
/// silently masked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffResult {
    /// Event count of this session.
    pub self_events: usize,
    /// Event count of the other session.
    pub other_events: usize,
    /// Token totals of this session.
    pub self_tokens: TokenTotals,
    /// Token totals of the other session.
    pub other_tokens: TokenTotals,
    /// Differing output pairs, in output order.
    pub output_diffs: Vec<OutputDiff>,
    /// True when no compared pair differed.
    pub same_outputs: bool,
    /// True when the sessions produced different numbers of outputs.
    pub output_count_mismatch: bool,
}

/// Replays and inspects a recorded session.
pub struct Replayer {
    session: Session,
    position: usize,
    breakpoints: BTreeSet<u64>,
}

impl Replayer {
    /// Create a replayer over a session.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            position: 0,
            breakpoints: BTreeSet::new(),
        }
    }

    /// Load a session from a JSON file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the session file
    ///
    /// # Returns
    ///
    /// A replayer positioned before the first event.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let session = Session::load(&path)?;
        info!(
            "Loaded session {} ({} events) from {}",
            session.session_id(),
            session.event_count(),
            path.as_ref().display()
        );
        Ok(Self::new(session))
    }

    /// Parse a session from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(Session::from_json(json)?))
    }

    /// The session under replay.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current cursor position in `[0, total_events]`.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total number of events in the session.
    pub fn total_events(&self) -> usize {
        self.session.event_count()
    }

    /// Whether events remain ahead of the cursor.
    pub fn has_next(&self) -> bool {
        self.position < self.session.event_count()
    }

    /// Whether events lie behind the cursor.
    pub fn has_prev(&self) -> bool {
        self.position > 0
    }

    /// Consume and return the next event, advancing the cursor.
    ///
    /// Returns `None` at the end of the timeline.
    pub fn step(&mut self) -> Option<Event> {
        if !self.has_next() {
            return None;
        }
        let event = self.session.events()[self.position].clone();
        self.position += 1;
        Some(event)
    }

    /// Move the cursor back one event and return the event it now sits after.
    ///
    /// Returns `None` at the start of the timeline.
    pub fn step_back(&mut self) -> Option<Event> {
        if !self.has_prev() {
            return None;
        }
        self.position -= 1;
        Some(self.session.events()[self.position].clone())
    }

    /// The last event consumed by [`Replayer::step`], `None` at position 0.
    pub fn current(&self) -> Option<Event> {
        if self.position == 0 {
            return None;
        }
        Some(self.session.events()[self.position - 1].clone())
    }

    /// The next event without advancing the cursor.
    pub fn peek(&self) -> Option<Event> {
        if !self.has_next() {
            return None;
        }
        Some(self.session.events()[self.position].clone())
    }

    /// Jump to the event with the given id.
    ///
    /// Scans the timeline in order for the first matching id and leaves the
    /// cursor immediately after it, as if [`Replayer::step`] had just returned
    /// it. Returns `None` without moving when the id is absent.
    pub fn goto_event(&mut self, event_id: u64) -> Option<Event> {
        let index = self.session.events().iter().position(|e| e.id == event_id)?;
        self.position = index + 1;
        Some(self.session.events()[index].clone())
    }

    /// Jump to a 0-based position index.
    ///
    /// Leaves the cursor immediately after the event at `index` and returns
    /// that event. Returns `None` without moving when out of bounds.
    pub fn goto_position(&mut self, index: usize) -> Option<Event> {
        if index >= self.session.event_count() {
            return None;
        }
        self.position = index + 1;
        Some(self.session.events()[index].clone())
    }

    /// Move the cursor back to before the first event.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Reconstruct the tracked state as it was just after an event.
    ///
    /// With `event_id` omitted, the event at the cursor is used; at position 0
    /// the state is empty. Resolution tries the O(1) snapshot stored for the
    /// event first, then falls back to replaying every `state_change` from the
    /// start of the timeline through the target event inclusive.
    ///
    /// # Arguments
    ///
    /// * `event_id` - Event to reconstruct at (default: current event)
    ///
    /// # Returns
    ///
    /// The reconstructed state mapping, or
    /// [`ReplayError::StateReconstruction`] if the id is not in the session.
    pub fn get_state(&self, event_id: Option<u64>) -> Result<HashMap<String, Value>> {
        let target = match event_id {
            Some(id) => id,
            None => match self.current() {
                Some(event) => event.id,
                None => return Ok(HashMap::new()),
            },
        };

        if self.session.find_event(target).is_none() {
            return Err(ReplayError::StateReconstruction(target));
        }

        if let Some(snapshot) = self.session.state_snapshots().get(&target) {
            return Ok(snapshot.clone());
        }

        // No snapshot: replay state changes from the start through the target.
        let mut state = HashMap::new();
        for event in self.session.events() {
            if let EventData::StateChange(change) = &event.data {
                state.insert(change.key.clone(), change.new_value.clone());
            }
            if event.id == target {
                break;
            }
        }
        Ok(state)
    }

    /// Filter events by type, tags, and payload text.
    ///
    /// Filters intersect: each one narrows the candidate set, omitted filters
    /// are no-ops (an empty tag list counts as omitted). The tags filter keeps
    /// events carrying ANY of the requested tags; the search filter keeps
    /// events whose serialized payload contains `search` case-insensitively.
    /// The cursor does not move.
    ///
    /// # Arguments
    ///
    /// * `event_type` - Keep only events of this type
    /// * `tags` - Keep events carrying any of these tags
    /// * `search` - Keep events whose payload text contains this string
    ///
    /// # Returns
    ///
    /// Matching events in timeline order.
    pub fn filter(
        &self,
        event_type: Option<EventType>,
        tags: Option<Vec<String>>,
        search: Option<&str>,
    ) -> Vec<Event> {
        let mut events: Vec<&Event> = self.session.events().iter().collect();

        if let Some(wanted) = event_type {
            events.retain(|e| e.event_type() == wanted);
        }

        if let Some(tags) = tags.as_ref().filter(|t| !t.is_empty()) {
            events.retain(|e| tags.iter().any(|t| e.has_tag(t)));
        }

        if let Some(needle) = search {
            let needle = needle.to_lowercase();
            events.retain(|e| {
                e.data
                    .payload()
                    .to_string()
                    .to_lowercase()
                    .contains(&needle)
            });
        }

        events.into_iter().cloned().collect()
    }

    /// All `llm_call` events.
    pub fn get_llm_calls(&self) -> Vec<Event> {
        self.filter(Some(EventType::LlmCall), None, None)
    }

    /// All `tool_call` events.
    pub fn get_tool_calls(&self) -> Vec<Event> {
        self.filter(Some(EventType::ToolCall), None, None)
    }

    /// All `error` events.
    pub fn get_errors(&self) -> Vec<Event> {
        self.filter(Some(EventType::Error), None, None)
    }

    /// Iterate over the full timeline in order, independent of the cursor.
    ///
    /// Each call starts a fresh pass from the first event.
    pub fn iter_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.session.events().iter()
    }

    /// Direct children of an event, reconstructed from `parent_id` links.
    ///
    /// For a span's start event this returns the events recorded while that
    /// span was innermost, including nested span markers.
    pub fn children_of(&self, event_id: u64) -> Vec<Event> {
        self.session
            .events()
            .iter()
            .filter(|e| e.parent_id == Some(event_id))
            .cloned()
            .collect()
    }

    /// Set a breakpoint on an event id. Adding an existing id is a no-op.
    pub fn add_breakpoint(&mut self, event_id: u64) {
        self.breakpoints.insert(event_id);
    }

    /// Remove a breakpoint. Removing an absent id is a no-op.
    pub fn remove_breakpoint(&mut self, event_id: u64) {
        self.breakpoints.remove(&event_id);
    }

    /// Remove all breakpoints.
    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    /// The breakpointed event ids, in ascending order.
    pub fn breakpoints(&self) -> impl Iterator<Item = u64> + '_ {
        self.breakpoints.iter().copied()
    }

    /// Step until a breakpointed event is consumed or the timeline ends.
    ///
    /// On a hit the cursor sits just past the breakpointed event, so repeated
    /// calls visit successive breakpoints. Returns `None` once the end is
    /// reached with no hit; the cursor is then at the end.
    pub fn continue_to_breakpoint(&mut self) -> Option<Event> {
        while self.has_next() {
            if let Some(event) = self.step() {
                if self.breakpoints.contains(&event.id) {
                    return Some(event);
                }
            }
        }
        None
    }

    /// Aggregate session-level counters.
    pub fn get_summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session.session_id().to_string(),
            started_at: self.session.started_at(),
            ended_at: self.session.ended_at(),
            duration_ms: self.session.duration_ms(),
            total_events: self.session.event_count(),
            llm_calls: self.session.llm_calls().len(),
            tool_calls: self.session.tool_calls().len(),
            errors: self.session.errors().len(),
            total_tokens: self.session.total_tokens(),
            metadata: self.session.metadata().clone(),
        }
    }

    /// Compare this session's outputs against another session's.
    ///
    /// Pairs `output` events positionally (nth against nth, not by id, since
    /// two runs assign ids independently) and records a diff entry for every
    /// pair whose payloads differ structurally.
    pub fn diff(&self, other: &Replayer) -> DiffResult {
        let self_outputs = self.session.events_of_type(EventType::Output);
        let other_outputs = other.session.events_of_type(EventType::Output);

        let mut output_diffs = Vec::new();
        for (index, (ours, theirs)) in self_outputs.iter().zip(other_outputs.iter()).enumerate() {
            if ours.data != theirs.data {
                output_diffs.push(OutputDiff {
                    index,
                    self_data: ours.data.payload(),
                    other_data: theirs.data.payload(),
                });
            }
        }

        let same_outputs = output_diffs.is_empty();
        DiffResult {
            self_events: self.session.event_count(),
            other_events: other.session.event_count(),
            self_tokens: self.session.total_tokens(),
            other_tokens: other.session.total_tokens(),
            output_diffs,
            same_outputs,
            output_count_mismatch: self_outputs.len() != other_outputs.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Recorder;
    use crate::session::TokenUsage;
    use serde_json::json;

    fn recorded_session() -> Session {
        let mut recorder = Recorder::builder()
            .session_id("replay-test")
            .metadata_entry("agent", "navigator")
            .build();
        recorder.record_input("user", "find the answer", None); // 1
        recorder.record_llm_call(
            "qwen3:32b",
            "find the answer",
            "I will search",
            Some(TokenUsage::new(10, 5)),
            Some(80.0),
            None,
        ); // 2
        recorder.record_tool_call("search", HashMap::new(), json!(["result"]), None, true, None); // 3
        recorder.record_state_change("phase", json!(null), json!("answering")); // 4
        recorder.record_output("assistant", "the answer is 42", None); // 5
        recorder.into_session()
    }

    fn replayer() -> Replayer {
        Replayer::new(recorded_session())
    }

    #[test]
    fn test_step_walks_the_timeline() {
        let mut replayer = replayer();
        assert_eq!(replayer.position(), 0);
        assert!(replayer.current().is_none());
        assert!(replayer.has_next());
        assert!(!replayer.has_prev());

        let first = replayer.step().unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(replayer.position(), 1);

        let second = replayer.step().unwrap();
        assert_eq!(second.id, 2);
        assert_eq!(replayer.current().unwrap().id, 2);
    }

    #[test]
    fn test_step_past_end_returns_none() {
        let mut replayer = replayer();
        for _ in 0..5 {
            assert!(replayer.step().is_some());
        }
        assert!(replayer.step().is_none());
        assert_eq!(replayer.position(), 5);
        assert!(!replayer.has_next());
    }

    #[test]
    fn test_step_back() {
        let mut replayer = replayer();
        assert!(replayer.step_back().is_none());

        replayer.step();
        replayer.step();
        let back = replayer.step_back().unwrap();
        assert_eq!(back.id, 2);
        assert_eq!(replayer.position(), 1);
        assert_eq!(replayer.current().unwrap().id, 1);
    }

    #[test]
    fn test_peek_does_not_advance() {
        let mut replayer = replayer();
        let peeked = replayer.peek().unwrap();
        assert_eq!(peeked.id, 1);
        assert_eq!(replayer.position(), 0);

        replayer.goto_position(4);
        assert!(replayer.peek().is_none());
    }

    #[test]
    fn test_goto_event_sets_cursor_after_target() {
        let mut replayer = replayer();
        let event = replayer.goto_event(3).unwrap();
        assert_eq!(event.id, 3);
        assert_eq!(replayer.position(), 3);
        assert_eq!(replayer.current().unwrap().id, 3);
        assert_eq!(replayer.peek().unwrap().id, 4);
    }

    #[test]
    fn test_goto_missing_event_leaves_cursor() {
        let mut replayer = replayer();
        replayer.step();
        assert!(replayer.goto_event(99).is_none());
        assert_eq!(replayer.position(), 1);
    }

    #[test]
    fn test_goto_position_bounds() {
        let mut replayer = replayer();
        let event = replayer.goto_position(0).unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(replayer.position(), 1);

        assert!(replayer.goto_position(5).is_none());
        assert_eq!(replayer.position(), 1);
    }

    #[test]
    fn test_reset() {
        let mut replayer = replayer();
        replayer.goto_position(3);
        replayer.reset();
        assert_eq!(replayer.position(), 0);
        assert!(replayer.current().is_none());
    }

    #[test]
    fn test_get_state_uses_snapshot() {
        let replayer = replayer();
        // Event 4 changed "phase"; the recorder snapshotted it.
        let state = replayer.get_state(Some(4)).unwrap();
        assert_eq!(state["phase"], json!("answering"));
        // Event 5 recorded after the change carries the same state.
        let state = replayer.get_state(Some(5)).unwrap();
        assert_eq!(state["phase"], json!("answering"));
    }

    #[test]
    fn test_get_state_at_cursor() {
        let mut replayer = replayer();
        assert!(replayer.get_state(None).unwrap().is_empty());

        replayer.goto_event(4);
        let state = replayer.get_state(None).unwrap();
        assert_eq!(state["phase"], json!("answering"));
    }

    #[test]
    fn test_get_state_unknown_event_is_an_error() {
        let replayer = replayer();
        let result = replayer.get_state(Some(42));
        assert!(matches!(result, Err(ReplayError::StateReconstruction(42))));
    }

    fn gapped_session_without_snapshots() -> Session {
        // Nine events, state changes at ids 3 and 7, no snapshots stored.
        let mut events = Vec::new();
        for id in 1..=9u64 {
            let event = match id {
                3 => json!({
                    "id": id, "timestamp": "2026-01-05T10:00:03Z", "type": "state_change",
                    "data": {"key": "k", "old_value": null, "new_value": 1}
                }),
                7 => json!({
                    "id": id, "timestamp": "2026-01-05T10:00:07Z", "type": "state_change",
                    "data": {"key": "k", "old_value": 1, "new_value": 2}
                }),
                _ => json!({
                    "id": id, "timestamp": "2026-01-05T10:00:00Z", "type": "log",
                    "data": {"level": "info", "message": format!("event {}", id)}
                }),
            };
            events.push(event);
        }
        let doc = json!({
            "session_id": "fallback-test",
            "started_at": "2026-01-05T10:00:00Z",
            "ended_at": null,
            "events": events,
            "metadata": {},
            "state_snapshots": {}
        });
        Session::from_json(&doc.to_string()).unwrap()
    }

    #[test]
    fn test_get_state_replays_history_without_snapshots() {
        let replayer = Replayer::new(gapped_session_without_snapshots());

        let state = replayer.get_state(Some(5)).unwrap();
        assert_eq!(state, HashMap::from([("k".to_string(), json!(1))]));

        let state = replayer.get_state(Some(9)).unwrap();
        assert_eq!(state, HashMap::from([("k".to_string(), json!(2))]));

        // Before the first change there is nothing.
        assert!(replayer.get_state(Some(2)).unwrap().is_empty());

        // The change event itself is included.
        let state = replayer.get_state(Some(3)).unwrap();
        assert_eq!(state["k"], json!(1));
    }

    #[test]
    fn test_snapshot_and_replay_reconstruction_agree() {
        let session = recorded_session();
        let with_snapshots = Replayer::new(session.clone());

        // Strip the snapshots so the same lookups take the replay path.
        let mut doc = serde_json::to_value(&session).unwrap();
        doc["state_snapshots"] = json!({});
        let without_snapshots =
            Replayer::new(Session::from_json(&doc.to_string()).unwrap());

        for id in session.state_snapshots().keys() {
            assert_eq!(
                with_snapshots.get_state(Some(*id)).unwrap(),
                without_snapshots.get_state(Some(*id)).unwrap(),
                "state mismatch at event {}",
                id
            );
        }
    }

    #[test]
    fn test_filter_by_type_preserves_order() {
        let mut recorder = Recorder::new();
        recorder.record_tool_call("a", HashMap::new(), json!(1), None, true, None);
        recorder.record_llm_call("m", "p", "r", None, None, None);
        recorder.record_tool_call("b", HashMap::new(), json!(2), None, true, None);
        recorder.record_llm_call("m", "p", "r", None, None, None);
        recorder.record_tool_call("c", HashMap::new(), json!(3), None, true, None);
        let replayer = Replayer::new(recorder.into_session());

        let tools = replayer.filter(Some(EventType::ToolCall), None, None);
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0].id, 1);
        assert_eq!(tools[1].id, 3);
        assert_eq!(tools[2].id, 5);
    }

    #[test]
    fn test_filter_by_tags_any_match() {
        let mut recorder = Recorder::new();
        recorder.record_error("first", None, None, None);
        recorder.record_log("info", "plain", None);
        recorder.record_error("second", None, None, None);
        let replayer = Replayer::new(recorder.into_session());

        let tagged = replayer.filter(None, Some(vec!["error".to_string()]), None);
        assert_eq!(tagged.len(), 2);

        // An empty tag list is no filter at all.
        let all = replayer.filter(None, Some(vec![]), None);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let mut recorder = Recorder::new();
        recorder.record_input("user", "Find the Weather in Toronto", None);
        recorder.record_output("assistant", "sunny", None);
        let replayer = Replayer::new(recorder.into_session());

        let hits = replayer.filter(None, None, Some("toronto"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        assert!(replayer.filter(None, None, Some("montreal")).is_empty());
    }

    #[test]
    fn test_filters_intersect() {
        let mut recorder = Recorder::new();
        recorder.record_error("disk full", None, None, None);
        recorder.record_error("network down", None, None, None);
        recorder.record_log("error", "network chatter", None);
        let replayer = Replayer::new(recorder.into_session());

        let hits = replayer.filter(
            Some(EventType::Error),
            Some(vec!["error".to_string()]),
            Some("network"),
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_convenience_filters() {
        let replayer = replayer();
        assert_eq!(replayer.get_llm_calls().len(), 1);
        assert_eq!(replayer.get_tool_calls().len(), 1);
        assert!(replayer.get_errors().is_empty());
    }

    #[test]
    fn test_iter_events_is_restartable_and_cursor_independent() {
        let mut replayer = replayer();
        // Consuming index 3 parks the cursor just past it.
        replayer.goto_position(3);
        assert_eq!(replayer.position(), 4);
        assert_eq!(replayer.current().unwrap().id, 4);

        let ids: Vec<u64> = replayer.iter_events().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        // A second pass starts over; the cursor has not moved.
        let again: Vec<u64> = replayer.iter_events().map(|e| e.id).collect();
        assert_eq!(again, ids);
        assert_eq!(replayer.position(), 4);
    }

    #[test]
    fn test_children_of_span() {
        let mut recorder = Recorder::new();
        let span_id = {
            let mut span = recorder.span("work", None);
            span.record_log("info", "inside", None);
            span.record_tool_call("search", HashMap::new(), json!(null), None, true, None);
            span.id()
        };
        let replayer = Replayer::new(recorder.into_session());

        let children = replayer.children_of(span_id);
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|e| e.parent_id == Some(span_id)));
        assert!(replayer.children_of(999).is_empty());
    }

    #[test]
    fn test_breakpoint_stop_and_exhaustion() {
        let mut replayer = replayer();
        replayer.add_breakpoint(3);

        let hit = replayer.continue_to_breakpoint().unwrap();
        assert_eq!(hit.id, 3);
        assert_eq!(replayer.position(), 3);

        // No further breakpoints: runs to the end.
        assert!(replayer.continue_to_breakpoint().is_none());
        assert_eq!(replayer.position(), 5);
    }

    #[test]
    fn test_breakpoint_management() {
        let mut replayer = replayer();
        replayer.add_breakpoint(2);
        replayer.add_breakpoint(4);
        replayer.add_breakpoint(2); // duplicate is a no-op
        assert_eq!(replayer.breakpoints().collect::<Vec<_>>(), vec![2, 4]);

        replayer.remove_breakpoint(2);
        assert_eq!(replayer.breakpoints().collect::<Vec<_>>(), vec![4]);

        replayer.clear_breakpoints();
        assert_eq!(replayer.breakpoints().count(), 0);
    }

    #[test]
    fn test_successive_breakpoints() {
        let mut replayer = replayer();
        replayer.add_breakpoint(2);
        replayer.add_breakpoint(4);

        assert_eq!(replayer.continue_to_breakpoint().unwrap().id, 2);
        assert_eq!(replayer.continue_to_breakpoint().unwrap().id, 4);
        assert!(replayer.continue_to_breakpoint().is_none());
    }

    #[test]
    fn test_summary_counters() {
        let replayer = replayer();
        let summary = replayer.get_summary();

        assert_eq!(summary.session_id, "replay-test");
        assert_eq!(summary.total_events, 5);
        assert_eq!(summary.llm_calls, 1);
        assert_eq!(summary.tool_calls, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.total_tokens.input, 10);
        assert_eq!(summary.total_tokens.output, 5);
        assert_eq!(summary.total_tokens.total, 15);
        assert!(summary.duration_ms.is_some());
        assert_eq!(summary.metadata["agent"], json!("navigator"));
    }

    #[test]
    fn test_token_aggregation() {
        let mut recorder = Recorder::new();
        recorder.record_llm_call("m", "p", "r", Some(TokenUsage::new(10, 5)), None, None);
        recorder.record_llm_call("m", "p", "r", Some(TokenUsage::new(0, 0)), None, None);
        recorder.record_llm_call("m", "p", "r", Some(TokenUsage::new(7, 3)), None, None);
        let replayer = Replayer::new(recorder.into_session());

        let totals = replayer.get_summary().total_tokens;
        assert_eq!(totals, TokenTotals { input: 17, output: 8, total: 25 });
    }

    fn session_with_outputs(outputs: &[&str]) -> Session {
        let mut recorder = Recorder::new();
        recorder.record_input("user", "go", None);
        for content in outputs {
            recorder.record_output("assistant", *content, None);
        }
        recorder.into_session()
    }

    #[test]
    fn test_diff_reports_differing_pair() {
        let left = Replayer::new(session_with_outputs(&["alpha", "beta"]));
        let right = Replayer::new(session_with_outputs(&["alpha", "gamma"]));

        let diff = left.diff(&right);
        assert!(!diff.same_outputs);
        assert!(!diff.output_count_mismatch);
        assert_eq!(diff.output_diffs.len(), 1);

        let entry = &diff.output_diffs[0];
        assert_eq!(entry.index, 1);
        assert_eq!(entry.self_data["content"], json!("beta"));
        assert_eq!(entry.other_data["content"], json!("gamma"));
    }

    #[test]
    fn test_diff_identical_outputs() {
        let left = Replayer::new(session_with_outputs(&["same", "twice"]));
        let right = Replayer::new(session_with_outputs(&["same", "twice"]));

        let diff = left.diff(&right);
        assert!(diff.same_outputs);
        assert!(diff.output_diffs.is_empty());
        assert_eq!(diff.self_events, 3);
        assert_eq!(diff.other_events, 3);
    }

    #[test]
    fn test_diff_flags_output_count_mismatch() {
        let left = Replayer::new(session_with_outputs(&["a", "b", "c"]));
        let right = Replayer::new(session_with_outputs(&["a"]));

        let diff = left.diff(&right);
        // Comparison stops at the shorter sequence but the mismatch is flagged.
        assert!(diff.same_outputs);
        assert!(diff.output_count_mismatch);
    }

    #[test]
    fn test_diff_reports_tokens_per_side() {
        let mut left_rec = Recorder::new();
        left_rec.record_llm_call("m", "p", "r", Some(TokenUsage::new(5, 5)), None, None);
        let mut right_rec = Recorder::new();
        right_rec.record_llm_call("m", "p", "r", Some(TokenUsage::new(2, 1)), None, None);

        let left = Replayer::new(left_rec.into_session());
        let right = Replayer::new(right_rec.into_session());

        let diff = left.diff(&right);
        assert_eq!(diff.self_tokens.total, 10);
        assert_eq!(diff.other_tokens.total, 3);
    }

    #[test]
    fn test_from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        recorded_session().save(&path).unwrap();

        let mut replayer = Replayer::from_file(&path).unwrap();
        assert_eq!(replayer.total_events(), 5);
        assert_eq!(replayer.step().unwrap().id, 1);
    }

    #[test]
    fn test_from_json() {
        let json = recorded_session().to_json().unwrap();
        let replayer = Replayer::from_json(&json).unwrap();
        assert_eq!(replayer.session().session_id(), "replay-test");
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Replayer::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ReplayError::Io(_))));
    }
}
