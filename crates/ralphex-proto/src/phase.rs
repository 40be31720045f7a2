//! Execution modes and phases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution mode selected on the command line.
///
/// The mode determines which phases the orchestrator runs and whether a plan
/// file is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Task iterations, then the full review pipeline.
    Full,
    /// Review pipeline only, no task execution.
    Review,
    /// Codex loop followed by a single claude review pass.
    CodexOnly,
    /// Interactive plan creation.
    Plan,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Full
    }
}

impl Mode {
    /// Returns the mode name as written to the progress-file header.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Full => "full",
            Mode::Review => "review",
            Mode::CodexOnly => "codex-only",
            Mode::Plan => "plan",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Mode::Full),
            "review" => Ok(Mode::Review),
            "codex-only" => Ok(Mode::CodexOnly),
            "plan" => Ok(Mode::Plan),
            other => Err(format!("unknown mode: {other}")),
        }
    }
}

/// Pipeline phase currently executing.
///
/// Carried by the orchestrator and broadcast to the UI and log for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Task,
    Review,
    Codex,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Task => "task",
            Phase::Review => "review",
            Phase::Codex => "codex",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip() {
        for mode in [Mode::Full, Mode::Review, Mode::CodexOnly, Mode::Plan] {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_unknown() {
        assert!("watch".parse::<Mode>().is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Task.to_string(), "task");
        assert_eq!(Phase::Codex.to_string(), "codex");
    }
}
