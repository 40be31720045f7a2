//! Logger writing to the progress file and mirroring into the UI.

use crate::messages::UiMsg;
use crate::sender::SafeSender;
use ralphex_core::progress::{ProgressConfig, ProgressFile};
use ralphex_core::Logger;
use ralphex_proto::{Phase, Section};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes every event to the progress file and sends the rendered text to
/// the UI through a `SafeSender`, so the terminal shows exactly what the
/// file records.
pub struct TuiLogger {
    progress: ProgressFile,
    sender: Arc<SafeSender>,
}

impl TuiLogger {
    /// Creates the progress file (deriving its name from plan and mode) and
    /// wires the UI mirror.
    pub fn new(cfg: &ProgressConfig, sender: Arc<SafeSender>) -> io::Result<Self> {
        Ok(Self {
            progress: ProgressFile::create(cfg)?,
            sender,
        })
    }

    /// Like `new` with an explicit progress-file path.
    pub fn create_at(
        path: impl AsRef<Path>,
        cfg: &ProgressConfig,
        sender: Arc<SafeSender>,
    ) -> io::Result<Self> {
        Ok(Self {
            progress: ProgressFile::create_at(path.as_ref(), cfg)?,
            sender,
        })
    }
}

impl Logger for TuiLogger {
    fn set_phase(&self, phase: Phase) {
        self.progress.set_phase(phase);
        self.sender.send(UiMsg::Phase(phase));
    }

    fn print(&self, msg: &str) {
        let line = self.progress.write_print(msg);
        self.sender.send(UiMsg::Output(line));
    }

    fn print_raw(&self, chunk: &str) {
        self.progress.write_raw(chunk);
        self.sender.send(UiMsg::Output(chunk.to_string()));
    }

    fn print_section(&self, section: &Section) {
        self.progress.write_section(section);
        self.sender.send(UiMsg::Section(section.clone()));
    }

    fn print_aligned(&self, text: &str) {
        let lines = self.progress.write_aligned(text);
        if !lines.is_empty() {
            self.sender.send(UiMsg::Output(lines.join("\n")));
        }
    }

    fn log_question(&self, question: &str, options: &[String]) {
        let lines = self.progress.write_question(question, options);
        self.sender.send(UiMsg::Output(lines.join("\n")));
    }

    fn log_answer(&self, answer: &str) {
        let line = self.progress.write_answer(answer);
        self.sender.send(UiMsg::Output(line));
    }

    fn error(&self, msg: &str) {
        let line = self.progress.write_error(msg);
        self.sender.send(UiMsg::Output(line));
    }

    fn warn(&self, msg: &str) {
        let line = self.progress.write_warn(msg);
        self.sender.send(UiMsg::Output(line));
    }

    fn path(&self) -> PathBuf {
        self.progress.file_path().to_path_buf()
    }

    fn elapsed(&self) -> String {
        self.progress.elapsed_str()
    }

    fn close(&self) -> io::Result<()> {
        self.progress.close_file()
    }
}
