//! Logger seam the orchestrator writes through.

use ralphex_proto::{Phase, Section};
use std::io;
use std::path::PathBuf;

/// Sink for everything the run produces.
///
/// Implemented by the progress-file sink, by the TUI logger (file plus
/// terminal mirror), and by the broadcast logger that additionally publishes
/// each event to a dashboard session. Methods take `&self`; implementations
/// serialize internally so concurrent callers never interleave partial lines.
pub trait Logger: Send + Sync {
    /// Updates the current phase for styling and boundary detection.
    fn set_phase(&self, phase: Phase);

    /// Writes a timestamped message line.
    fn print(&self, msg: &str);

    /// Writes an untimestamped chunk (streamed subprocess bytes).
    fn print_raw(&self, chunk: &str);

    /// Writes a `--- <label> ---` section banner.
    fn print_section(&self, section: &Section);

    /// Writes text with a timestamp per line, suppressing empty lines and
    /// indenting list items.
    fn print_aligned(&self, text: &str);

    /// Writes a structured question/options pair.
    fn log_question(&self, question: &str, options: &[String]);

    /// Writes the user's answer.
    fn log_answer(&self, answer: &str);

    /// Writes a timestamped `ERROR:` line.
    fn error(&self, msg: &str);

    /// Writes a timestamped `WARN:` line.
    fn warn(&self, msg: &str);

    /// Returns the progress-file path.
    fn path(&self) -> PathBuf;

    /// Returns elapsed time since the log was opened, as `1h2m3s`.
    fn elapsed(&self) -> String;

    /// Writes the footer, releases the lock and closes the file.
    fn close(&self) -> io::Result<()>;
}
