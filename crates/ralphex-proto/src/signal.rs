//! Signal markers embedded in subprocess output.
//!
//! The subprocess is a language model; its output is prose. The contract
//! between model and driver is confined to literal markers of the form
//! `<<<RALPHEX:NAME>>>`. Nothing else in the output is interpreted.

use serde::{Deserialize, Serialize};

const ALL_TASKS_DONE: &str = "<<<RALPHEX:ALL_TASKS_DONE>>>";
const TASK_FAILED: &str = "<<<RALPHEX:TASK_FAILED>>>";
const REVIEW_DONE: &str = "<<<RALPHEX:REVIEW_DONE>>>";
const CODEX_REVIEW_DONE: &str = "<<<RALPHEX:CODEX_REVIEW_DONE>>>";
const PLAN_READY: &str = "<<<RALPHEX:PLAN_READY>>>";
const QUESTION_START: &str = "<<<RALPHEX:QUESTION>>>";
const QUESTION_END: &str = "<<<RALPHEX:QUESTION_END>>>";

/// Payload of a `QUESTION` signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question: String,
    pub options: Vec<String>,
}

/// A recognized marker in a line of subprocess output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Task phase complete.
    AllTasksDone,
    /// Retryable task failure.
    TaskFailed,
    /// Review phase complete.
    ReviewDone,
    /// Codex phase complete.
    CodexReviewDone,
    /// Plan mode complete.
    PlanReady,
    /// Pause for user input.
    Question(QuestionPayload),
}

impl Signal {
    /// Returns the marker name (the NAME part of `<<<RALPHEX:NAME>>>`).
    pub fn name(&self) -> &'static str {
        match self {
            Signal::AllTasksDone => "ALL_TASKS_DONE",
            Signal::TaskFailed => "TASK_FAILED",
            Signal::ReviewDone => "REVIEW_DONE",
            Signal::CodexReviewDone => "CODEX_REVIEW_DONE",
            Signal::PlanReady => "PLAN_READY",
            Signal::Question(_) => "QUESTION",
        }
    }

    /// Scans a line for the first recognized signal.
    ///
    /// Markers are case-sensitive and may appear anywhere in the line. When a
    /// line carries several markers the earliest by byte position wins. A
    /// `QUESTION` marker with a missing terminator or malformed JSON payload
    /// is not a signal; scanning falls through to later markers on the line.
    pub fn scan(line: &str) -> Option<Signal> {
        let mut candidates: Vec<(usize, &str)> = [
            ALL_TASKS_DONE,
            TASK_FAILED,
            REVIEW_DONE,
            CODEX_REVIEW_DONE,
            PLAN_READY,
            QUESTION_START,
        ]
        .iter()
        .filter_map(|marker| line.find(marker).map(|pos| (pos, *marker)))
        .collect();
        candidates.sort_by_key(|(pos, _)| *pos);

        for (pos, marker) in candidates {
            match marker {
                ALL_TASKS_DONE => return Some(Signal::AllTasksDone),
                TASK_FAILED => return Some(Signal::TaskFailed),
                REVIEW_DONE => return Some(Signal::ReviewDone),
                CODEX_REVIEW_DONE => return Some(Signal::CodexReviewDone),
                PLAN_READY => return Some(Signal::PlanReady),
                QUESTION_START => {
                    if let Some(payload) = parse_question(&line[pos..]) {
                        return Some(Signal::Question(payload));
                    }
                    // malformed question: keep trying later markers
                }
                _ => unreachable!(),
            }
        }
        None
    }
}

/// Parses `<<<RALPHEX:QUESTION>>>{json}<<<RALPHEX:QUESTION_END>>>` starting at
/// the question marker.
fn parse_question(rest: &str) -> Option<QuestionPayload> {
    let body = rest.strip_prefix(QUESTION_START)?;
    let end = body.find(QUESTION_END)?;
    serde_json::from_str(&body[..end]).ok()
}
