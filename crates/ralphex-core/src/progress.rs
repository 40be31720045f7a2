//! Progress-file sink: timestamped logging to a locked progress file.
//!
//! The progress file is the durable record of a run. While a run is live its
//! file is held under an exclusive advisory lock; lock presence is the
//! canonical "session active" indicator for the dashboard watcher.

use crate::logger::Logger;
use chrono::Local;
use fs2::FileExt;
use ralphex_proto::{Mode, Phase, Section};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use std::time::Instant;

/// Timestamp format for log lines: `[yy-mm-dd HH:MM:SS]`.
const LINE_STAMP: &str = "%y-%m-%d %H:%M:%S";
/// Timestamp format for the header/footer.
const HEADER_STAMP: &str = "%Y-%m-%d %H:%M:%S";
/// Horizontal rule width in the header and footer.
const RULE_WIDTH: usize = 60;

// ─────────────────────────────────────────────────────────────────────────
// Lock registry
//
// Tracks which progress files THIS process holds locks on, so the watcher
// can tell its own live file from one locked by a foreign ralphex.
// ─────────────────────────────────────────────────────────────────────────

static ACTIVE_LOCKS: LazyLock<Mutex<HashSet<PathBuf>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Marks a progress file as locked by this process.
pub fn register_active_lock(path: &Path) {
    ACTIVE_LOCKS.lock().unwrap().insert(canonical(path));
}

/// Removes a progress-file lock entry for this process.
pub fn unregister_active_lock(path: &Path) {
    ACTIVE_LOCKS.lock().unwrap().remove(&canonical(path));
}

/// Reports whether this process holds the active lock for `path`.
pub fn is_locked_by_current_process(path: &Path) -> bool {
    ACTIVE_LOCKS.lock().unwrap().contains(&canonical(path))
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────
// Filename derivation
// ─────────────────────────────────────────────────────────────────────────

/// Returns the progress-file path for a plan and mode.
///
/// Pure function of its inputs: `progress-plan-<slug>.txt` for plan mode with
/// a description, `progress-<stem>[-review|-codex].txt` with a plan file, and
/// stem-less fallbacks otherwise.
pub fn progress_filename(plan_file: Option<&Path>, plan_description: &str, mode: Mode) -> PathBuf {
    if mode == Mode::Plan && !plan_description.is_empty() {
        return PathBuf::from(format!(
            "progress-plan-{}.txt",
            sanitize_plan_name(plan_description)
        ));
    }

    if let Some(plan) = plan_file {
        let stem = plan
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = stem.strip_suffix(".md").unwrap_or(&stem).to_string();
        return PathBuf::from(match mode {
            Mode::CodexOnly => format!("progress-{stem}-codex.txt"),
            Mode::Review => format!("progress-{stem}-review.txt"),
            _ => format!("progress-{stem}.txt"),
        });
    }

    PathBuf::from(match mode {
        Mode::CodexOnly => "progress-codex.txt",
        Mode::Review => "progress-review.txt",
        Mode::Plan => "progress-plan.txt",
        Mode::Full => "progress.txt",
    })
}

/// Converts a plan description to a safe filename component: lowercased,
/// non-alphanumeric stripped to dashes, double dashes collapsed, trimmed to
/// 50 characters, `unnamed` if nothing survives.
pub fn sanitize_plan_name(desc: &str) -> String {
    let mut result: String = desc
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '-' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    while result.contains("--") {
        result = result.replace("--", "-");
    }
    result = result.trim_matches('-').to_string();

    if result.len() > 50 {
        result.truncate(50);
        result = result.trim_end_matches('-').to_string();
    }

    if result.is_empty() {
        "unnamed".to_string()
    } else {
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Line rendering
// ─────────────────────────────────────────────────────────────────────────

fn stamp(msg: &str) -> String {
    format!("[{}] {}", Local::now().format(LINE_STAMP), msg)
}

/// Adds a 2-space indent for list items (numbered or bulleted) that start at
/// column zero.
fn format_list_item(line: &str) -> String {
    let trimmed = line.trim_start_matches([' ', '\t']);
    if trimmed.len() == line.len() && is_list_item(trimmed) {
        format!("  {line}")
    } else {
        line.to_string()
    }
}

fn is_list_item(line: &str) -> bool {
    if line.starts_with("- ") || line.starts_with("* ") {
        return true;
    }
    // numbered lists: one or more digits, then ". "
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

// ─────────────────────────────────────────────────────────────────────────
// ProgressFile
// ─────────────────────────────────────────────────────────────────────────

/// Inputs for creating a progress file.
#[derive(Debug, Clone, Default)]
pub struct ProgressConfig {
    /// Plan file, used for the header and to derive the filename.
    pub plan_file: Option<PathBuf>,
    /// Plan description (plan mode), used to derive the filename.
    pub plan_description: String,
    /// Execution mode, written to the header.
    pub mode: Mode,
    /// Current git branch, written to the header.
    pub branch: String,
}

/// Owns the progress file: writes the header on creation, timestamps each
/// line, and writes the footer on close. Holds an exclusive advisory lock for
/// its lifetime.
///
/// Writer methods return the rendered text so decorating loggers (TUI mirror,
/// broadcast) can forward exactly what was written without re-rendering.
pub struct ProgressFile {
    file: Mutex<Option<File>>,
    path: PathBuf,
    started: Instant,
}

impl ProgressFile {
    /// Creates the progress file in the current directory, deriving the name
    /// from the plan and mode.
    pub fn create(cfg: &ProgressConfig) -> io::Result<Self> {
        let path = progress_filename(cfg.plan_file.as_deref(), &cfg.plan_description, cfg.mode);
        Self::create_at(path, cfg)
    }

    /// Creates the progress file at an explicit path.
    pub fn create_at(path: impl Into<PathBuf>, cfg: &ProgressConfig) -> io::Result<Self> {
        let path = path.into();

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let file = File::create(&path)?;

        // exclusive lock signals an active session; tolerate filesystems
        // without advisory locks
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::Unsupported => {}
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("acquire file lock on {}: {err}", path.display()),
                ))
            }
        }
        register_active_lock(&path);

        let progress = Self {
            file: Mutex::new(Some(file)),
            path,
            started: Instant::now(),
        };

        let plan_str = cfg
            .plan_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(no plan - review only)".to_string());
        progress.write(&format!(
            "# Ralphex Progress Log\nPlan: {plan_str}\nBranch: {}\nMode: {}\nStarted: {}\n{}\n\n",
            cfg.branch,
            cfg.mode,
            Local::now().format(HEADER_STAMP),
            "-".repeat(RULE_WIDTH),
        ));

        Ok(progress)
    }

    /// Returns the progress-file path.
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    fn write(&self, text: &str) {
        if let Some(file) = self.file.lock().unwrap().as_mut() {
            let _ = file.write_all(text.as_bytes());
            let _ = file.flush();
        }
    }

    /// Writes a timestamped line; returns the rendered line.
    pub fn write_print(&self, msg: &str) -> String {
        let line = stamp(msg);
        self.write(&format!("{line}\n"));
        line
    }

    /// Writes an untimestamped chunk as-is.
    pub fn write_raw(&self, chunk: &str) -> String {
        self.write(chunk);
        chunk.to_string()
    }

    /// Writes a section banner; returns the label.
    pub fn write_section(&self, section: &Section) -> String {
        let label = section.label();
        self.write(&format!("\n--- {label} ---\n"));
        label
    }

    /// Writes text with one timestamp per line, suppressing empty lines and
    /// indenting list items. Returns the rendered lines (possibly empty).
    pub fn write_aligned(&self, text: &str) -> Vec<String> {
        let text = text.trim_end_matches('\n');
        if text.is_empty() {
            return Vec::new();
        }

        let mut rendered = Vec::new();
        for line in text.split('\n') {
            if line.is_empty() {
                continue;
            }
            let line = stamp(&format_list_item(line));
            self.write(&format!("{line}\n"));
            rendered.push(line);
        }
        rendered
    }

    /// Writes a question and its options; returns both rendered lines.
    pub fn write_question(&self, question: &str, options: &[String]) -> Vec<String> {
        let q = stamp(&format!("QUESTION: {question}"));
        let o = stamp(&format!("OPTIONS: {}", options.join(", ")));
        self.write(&format!("{q}\n{o}\n"));
        vec![q, o]
    }

    /// Writes the user's answer; returns the rendered line.
    pub fn write_answer(&self, answer: &str) -> String {
        let line = stamp(&format!("ANSWER: {answer}"));
        self.write(&format!("{line}\n"));
        line
    }

    /// Writes an `ERROR:` line; returns the rendered line.
    pub fn write_error(&self, msg: &str) -> String {
        let line = stamp(&format!("ERROR: {msg}"));
        self.write(&format!("{line}\n"));
        line
    }

    /// Writes a `WARN:` line; returns the rendered line.
    pub fn write_warn(&self, msg: &str) -> String {
        let line = stamp(&format!("WARN: {msg}"));
        self.write(&format!("{line}\n"));
        line
    }

    /// Elapsed time since creation, as `1h2m3s`.
    pub fn elapsed_str(&self) -> String {
        let secs = self.started.elapsed().as_secs();
        let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if h > 0 {
            format!("{h}h{m}m{s}s")
        } else if m > 0 {
            format!("{m}m{s}s")
        } else {
            format!("{s}s")
        }
    }

    /// Writes the footer, releases the lock and closes the file. Idempotent.
    pub fn close_file(&self) -> io::Result<()> {
        let mut guard = self.file.lock().unwrap();
        let Some(mut file) = guard.take() else {
            return Ok(());
        };

        write!(
            file,
            "\n{}\nCompleted: {}\n",
            "-".repeat(RULE_WIDTH),
            Local::now().format(HEADER_STAMP),
        )?;
        file.flush()?;

        let _ = fs2::FileExt::unlock(&file);
        unregister_active_lock(&self.path);
        Ok(())
    }
}

impl Drop for ProgressFile {
    fn drop(&mut self) {
        // footer must land on every outcome, including unwinds
        let _ = self.close_file();
    }
}

impl Logger for ProgressFile {
    fn set_phase(&self, _phase: Phase) {}

    fn print(&self, msg: &str) {
        self.write_print(msg);
    }

    fn print_raw(&self, chunk: &str) {
        self.write_raw(chunk);
    }

    fn print_section(&self, section: &Section) {
        self.write_section(section);
    }

    fn print_aligned(&self, text: &str) {
        self.write_aligned(text);
    }

    fn log_question(&self, question: &str, options: &[String]) {
        self.write_question(question, options);
    }

    fn log_answer(&self, answer: &str) {
        self.write_answer(answer);
    }

    fn error(&self, msg: &str) {
        self.write_error(msg);
    }

    fn warn(&self, msg: &str) {
        self.write_warn(msg);
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn elapsed(&self) -> String {
        self.elapsed_str()
    }

    fn close(&self) -> io::Result<()> {
        self.close_file()
    }
}
