//! Prompt templates for the assistant and reviewer subprocesses.
//!
//! Templates are embedded in the binary; a file of the same name under the
//! user's `prompts/` directory overrides its embedded counterpart
//! individually, so customizing one prompt never forks the others.

use std::fs;
use std::path::Path;
use tracing::debug;

const EMBEDDED_TASK: &str = include_str!("../prompts/task.md");
const EMBEDDED_REVIEW: &str = include_str!("../prompts/review.md");
const EMBEDDED_CODEX: &str = include_str!("../prompts/codex.md");
const EMBEDDED_PLAN: &str = include_str!("../prompts/plan.md");

/// Placeholder values substituted into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptVars<'a> {
    pub plan_path: &'a str,
    pub branch: &'a str,
    pub plan_request: &'a str,
    pub transcript: &'a str,
}

/// The loaded prompt set.
#[derive(Debug, Clone)]
pub struct Prompts {
    task: String,
    review: String,
    codex: String,
    plan: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            task: EMBEDDED_TASK.to_string(),
            review: EMBEDDED_REVIEW.to_string(),
            codex: EMBEDDED_CODEX.to_string(),
            plan: EMBEDDED_PLAN.to_string(),
        }
    }
}

impl Prompts {
    /// Loads prompts with per-file fallback from `<dir>/prompts`.
    pub fn load(config_dir: &Path) -> Self {
        let dir = config_dir.join("prompts");
        Self {
            task: load_or(&dir, "task.md", EMBEDDED_TASK),
            review: load_or(&dir, "review.md", EMBEDDED_REVIEW),
            codex: load_or(&dir, "codex.md", EMBEDDED_CODEX),
            plan: load_or(&dir, "plan.md", EMBEDDED_PLAN),
        }
    }

    pub fn task(&self, vars: PromptVars<'_>) -> String {
        render(&self.task, vars)
    }

    pub fn review(&self, vars: PromptVars<'_>) -> String {
        render(&self.review, vars)
    }

    pub fn codex(&self, vars: PromptVars<'_>) -> String {
        render(&self.codex, vars)
    }

    pub fn plan(&self, vars: PromptVars<'_>) -> String {
        render(&self.plan, vars)
    }
}

fn load_or(dir: &Path, name: &str, embedded: &str) -> String {
    let path = dir.join(name);
    match fs::read_to_string(&path) {
        Ok(content) => {
            debug!(path = %path.display(), "using prompt override");
            content
        }
        Err(_) => embedded.to_string(),
    }
}

fn render(template: &str, vars: PromptVars<'_>) -> String {
    template
        .replace("{plan_path}", vars.plan_path)
        .replace("{branch}", vars.branch)
        .replace("{plan_request}", vars.plan_request)
        .replace("{transcript}", vars.transcript)
}
