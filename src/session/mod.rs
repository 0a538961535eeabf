//! Session data model for recording and replay
//!
//! A session is the unit of capture: one agent run, stored as an append-only
//! list of typed events plus sparse state snapshots. The recorder produces
//! sessions, the replayer consumes them, and the JSON form on disk is stable
//! across both.
//!
//! # Architecture
//!
//! - **Event**: One recorded fact, an envelope (id, timestamp, duration, parent
//!   back-reference, tags) around a typed payload
//! - **EventData**: Tagged payload union, one variant per event type; serializes
//!   as the `type`/`data` pair of the persisted document
//! - **EventType**: The closed set of type tags
//! - **Session**: The aggregate owning events, metadata, and state snapshots,
//!   with invariant checks and JSON persistence
//!
//! # Event Ordering
//!
//! Event ids are assigned by the recorder: strictly increasing integers starting
//! at 1. Loading tolerates gaps (a hand-trimmed file still replays) but rejects
//! duplicate or reordered ids, parent references that do not point at an earlier
//! event, and state snapshots keyed by unknown events.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use agent_replay::session::Session;
//!
//! let session = Session::load("session.json")?;
//! println!("{} events", session.event_count());
//! for event in session.events() {
//!     println!("[{}] {}", event.id, event.summary());
//! }
//! ```

pub mod event;
pub mod session;

// Re-export main types
pub use event::{
    ErrorData, Event, EventData, EventType, LlmCallData, LogData, MessageData, StateChangeData,
    TokenUsage, ToolCallData,
};
pub use session::{Session, TokenTotals};
