//! Plan-file helpers: branch-name derivation and plan discovery.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

/// Date-like prefixes in plan filenames (e.g. `2024-01-15-`).
static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d-]+").unwrap());

/// Derives a branch name from a plan file path: strip the directory, the
/// `.md` extension, any leading date prefix and leading dashes. Falls back to
/// the bare stem when nothing survives.
pub fn branch_name(plan_file: &Path) -> String {
    let stem = plan_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_suffix(".md").unwrap_or(&stem).to_string();

    let branch = DATE_PREFIX
        .replace(&stem, "")
        .trim_start_matches('-')
        .to_string();
    if branch.is_empty() {
        stem
    } else {
        branch
    }
}

/// Lists plan files (`*.md`) in the plans directory, excluding `completed/`.
/// Sorted by name for stable display.
pub fn list_plans(plans_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut plans: Vec<PathBuf> = fs::read_dir(plans_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    plans.sort();
    Ok(plans)
}

/// Finds the most recently modified plan in `plans_dir` whose mtime is at or
/// after `since`. Returns `None` when nothing qualifies (or the directory is
/// missing).
pub fn find_recent_plan(plans_dir: &Path, since: SystemTime) -> Option<PathBuf> {
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for plan in list_plans(plans_dir).ok()? {
        let Ok(modified) = fs::metadata(&plan).and_then(|m| m.modified()) else {
            continue;
        };
        if modified < since {
            continue;
        }
        if best.as_ref().is_none_or(|(t, _)| modified > *t) {
            best = Some((modified, plan));
        }
    }
    best.map(|(_, path)| path)
}
