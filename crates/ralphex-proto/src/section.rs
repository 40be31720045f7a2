//! Section headers punctuating the output stream.
//!
//! Sections are emitted at iteration boundaries and written to the progress
//! file as `--- <label> ---` lines. The watcher parses the stored label form
//! back when replaying a file's history.

/// A structured header event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    /// One task-phase iteration.
    TaskIteration(u32),
    /// One claude review iteration; the suffix distinguishes passes
    /// (e.g. " (post-codex)" on the second full-mode review).
    ClaudeReview { iteration: u32, suffix: String },
    /// One codex review iteration.
    CodexIteration(u32),
    /// Any other banner.
    Generic(String),
}

impl Section {
    pub fn task_iteration(n: u32) -> Self {
        Section::TaskIteration(n)
    }

    pub fn claude_review(iteration: u32, suffix: impl Into<String>) -> Self {
        Section::ClaudeReview {
            iteration,
            suffix: suffix.into(),
        }
    }

    pub fn codex_iteration(n: u32) -> Self {
        Section::CodexIteration(n)
    }

    pub fn generic(label: impl Into<String>) -> Self {
        Section::Generic(label.into())
    }

    /// Renders the label written between the `---` markers.
    pub fn label(&self) -> String {
        match self {
            Section::TaskIteration(n) => format!("task iteration {n}"),
            Section::ClaudeReview { iteration, suffix } => {
                format!("claude review {iteration}{suffix}")
            }
            Section::CodexIteration(n) => format!("codex iteration {n}"),
            Section::Generic(label) => label.clone(),
        }
    }

    /// Parses a stored label back into a structured section.
    ///
    /// Unrecognized labels come back as `Generic`, so parsing never fails.
    pub fn from_label(label: &str) -> Self {
        if let Some(rest) = label.strip_prefix("task iteration ") {
            if let Ok(n) = rest.trim().parse() {
                return Section::TaskIteration(n);
            }
        }
        if let Some(rest) = label.strip_prefix("claude review ") {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            if let Ok(n) = digits.parse() {
                return Section::ClaudeReview {
                    iteration: n,
                    suffix: rest[digits.len()..].to_string(),
                };
            }
        }
        if let Some(rest) = label.strip_prefix("codex iteration ") {
            if let Ok(n) = rest.trim().parse() {
                return Section::CodexIteration(n);
            }
        }
        Section::Generic(label.to_string())
    }

    /// Returns the iteration number when this is a task-iteration header.
    pub fn task_index(&self) -> Option<u32> {
        match self {
            Section::TaskIteration(n) => Some(*n),
            _ => None,
        }
    }
}
