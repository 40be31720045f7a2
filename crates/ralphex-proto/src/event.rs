//! Serialized event form delivered to dashboard clients.

use crate::Phase;
use serde::{Deserialize, Serialize};

/// One event in a session's stream.
///
/// The tag doubles as the SSE record name, so browser clients can attach
/// per-kind listeners (`line`, `section`, `phase`, `task_end`, `signal`,
/// `question`, `answer`, `done`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A line of output, as displayed.
    Line { text: String },
    /// A section banner.
    Section { label: String },
    /// Phase transition.
    Phase { phase: Phase },
    /// Synthetic boundary emitted when the task phase ends; carries the last
    /// observed task-iteration index.
    TaskEnd { iteration: u32 },
    /// A signal detected in the stream, republished as a distinct event so
    /// clients can render banners without re-scanning text.
    Signal { name: String },
    /// Pending user question.
    Question { question: String, options: Vec<String> },
    /// The user's answer.
    Answer { answer: String },
    /// Session finished (progress footer written).
    Done,
}

impl StreamEvent {
    /// Returns the event kind, used as the SSE record name.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Line { .. } => "line",
            StreamEvent::Section { .. } => "section",
            StreamEvent::Phase { .. } => "phase",
            StreamEvent::TaskEnd { .. } => "task_end",
            StreamEvent::Signal { .. } => "signal",
            StreamEvent::Question { .. } => "question",
            StreamEvent::Answer { .. } => "answer",
            StreamEvent::Done => "done",
        }
    }
}
