//! Messages flowing from the rest of the system into the UI event loop.

use ralphex_proto::{Phase, Section};
use std::path::PathBuf;
use tokio::sync::oneshot;

/// Result of the plan-selection screen.
#[derive(Debug, PartialEq, Eq)]
pub enum PlanSelection {
    /// An existing plan file was chosen.
    Selected(PathBuf),
    /// A new plan description was typed in.
    Created(String),
    /// The user backed out.
    Canceled,
    /// The plans directory held no plans and the user quit.
    NoPlans,
}

/// One message into the UI.
#[derive(Debug)]
pub enum UiMsg {
    /// Text to append to the viewport; may contain embedded newlines.
    Output(String),
    /// Section banner.
    Section(Section),
    /// Phase transition, for header styling.
    Phase(Phase),
    /// Present a question; the answer comes back over `answer_tx`. Dropping
    /// the sender (user quit during the prompt) cancels the question.
    Question {
        question: String,
        options: Vec<String>,
        answer_tx: oneshot::Sender<String>,
    },
    /// Header info once the run is set up.
    StartupInfo { plan: String, branch: String },
    /// Execution finished; switches to the final screen.
    ExecutionDone { error: Option<String> },
    /// Registers the channel the plan-selection result is delivered on.
    PlanSelectionRequest {
        result_tx: oneshot::Sender<PlanSelection>,
    },
}
