pub mod error;
pub mod integrations;
pub mod recorder;
pub mod replayer;
pub mod session;

pub use error::{ReplayError, Result};
pub use integrations::{RecordingGateway, SharedRecorder};
pub use recorder::Recorder;
pub use replayer::Replayer;
pub use session::Session;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{ReplayError, Result};
    pub use crate::integrations::{
        LlmGateway, LlmRequest, LlmResponse, RecordingGateway, SharedRecorder,
    };
    pub use crate::recorder::{Recorder, RecorderBuilder};
    pub use crate::replayer::{DiffResult, Replayer, SessionSummary};
    pub use crate::session::{Event, EventData, EventType, Session, TokenTotals, TokenUsage};
}
