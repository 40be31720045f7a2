//! Logger decorator that mirrors every event into a session.
//!
//! Wraps the real logger (file sink or TUI logger): each call is forwarded
//! to the inner logger and published to the session so dashboard subscribers
//! see the same stream the file receives, in the same order.

use crate::session::Session;
use ralphex_core::Logger;
use ralphex_proto::{Phase, Section, Signal, StreamEvent};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

struct BroadcastState {
    phase: Phase,
    /// Last observed task-iteration index, reported in the `task_end` event.
    current_task: u32,
}

/// Decorator delivering each log event to the file sink and one session.
pub struct BroadcastLogger {
    inner: Arc<dyn Logger>,
    session: Arc<Session>,
    state: Mutex<BroadcastState>,
}

impl BroadcastLogger {
    pub fn new(inner: Arc<dyn Logger>, session: Arc<Session>) -> Self {
        Self {
            inner,
            session,
            state: Mutex::new(BroadcastState {
                phase: Phase::Task,
                current_task: 0,
            }),
        }
    }

    /// Republishes any signal found in an outbound line as a distinct event,
    /// leaving the raw text stream untouched.
    fn scan_for_signal(&self, line: &str) {
        match Signal::scan(line) {
            // questions get their own event via log_question
            None | Some(Signal::Question(_)) => {}
            Some(signal) => self.session.publish(StreamEvent::Signal {
                name: signal_display_name(&signal).to_string(),
            }),
        }
    }
}

/// Dashboard banner name for a signal.
pub(crate) fn signal_display_name(signal: &Signal) -> &'static str {
    match signal {
        Signal::AllTasksDone => "COMPLETED",
        Signal::TaskFailed => "FAILED",
        Signal::ReviewDone => "REVIEW_DONE",
        Signal::CodexReviewDone => "CODEX_REVIEW_DONE",
        Signal::PlanReady => "PLAN_READY",
        Signal::Question(_) => "QUESTION",
    }
}

impl Logger for BroadcastLogger {
    fn set_phase(&self, phase: Phase) {
        self.inner.set_phase(phase);

        let task_end = {
            let mut state = self.state.lock().unwrap();
            let leaving_task = state.phase == Phase::Task && phase != Phase::Task;
            let last = state.current_task;
            state.phase = phase;
            if leaving_task {
                state.current_task = 0;
            }
            leaving_task.then_some(last)
        };

        if let Some(iteration) = task_end {
            self.session.publish(StreamEvent::TaskEnd { iteration });
        }
        self.session.publish(StreamEvent::Phase { phase });
    }

    fn print(&self, msg: &str) {
        self.inner.print(msg);
        self.session.publish(StreamEvent::Line { text: msg.to_string() });
    }

    fn print_raw(&self, chunk: &str) {
        self.inner.print_raw(chunk);
        self.session.publish(StreamEvent::Line { text: chunk.to_string() });
        self.scan_for_signal(chunk);
    }

    fn print_section(&self, section: &Section) {
        self.inner.print_section(section);
        if let Some(n) = section.task_index() {
            self.state.lock().unwrap().current_task = n;
        }
        self.session.publish(StreamEvent::Section { label: section.label() });
    }

    fn print_aligned(&self, text: &str) {
        self.inner.print_aligned(text);
        for line in text.trim_end_matches('\n').split('\n') {
            if line.is_empty() {
                continue;
            }
            self.session.publish(StreamEvent::Line { text: line.to_string() });
            self.scan_for_signal(line);
        }
    }

    fn log_question(&self, question: &str, options: &[String]) {
        self.inner.log_question(question, options);
        self.session.publish(StreamEvent::Question {
            question: question.to_string(),
            options: options.to_vec(),
        });
    }

    fn log_answer(&self, answer: &str) {
        self.inner.log_answer(answer);
        self.session.publish(StreamEvent::Answer { answer: answer.to_string() });
    }

    fn error(&self, msg: &str) {
        self.inner.error(msg);
        self.session.publish(StreamEvent::Line { text: format!("ERROR: {msg}") });
    }

    fn warn(&self, msg: &str) {
        self.inner.warn(msg);
        self.session.publish(StreamEvent::Line { text: format!("WARN: {msg}") });
    }

    fn path(&self) -> PathBuf {
        self.inner.path()
    }

    fn elapsed(&self) -> String {
        self.inner.elapsed()
    }

    fn close(&self) -> io::Result<()> {
        self.session.publish(StreamEvent::Done);
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inner-logger fake recording call names.
    #[derive(Default)]
    struct NullLogger {
        calls: Mutex<Vec<String>>,
    }

    impl NullLogger {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Logger for NullLogger {
        fn set_phase(&self, phase: Phase) {
            self.calls.lock().unwrap().push(format!("set_phase {phase}"));
        }
        fn print(&self, msg: &str) {
            self.calls.lock().unwrap().push(format!("print {msg}"));
        }
        fn print_raw(&self, chunk: &str) {
            self.calls.lock().unwrap().push(format!("print_raw {chunk}"));
        }
        fn print_section(&self, section: &Section) {
            self.calls.lock().unwrap().push(format!("print_section {}", section.label()));
        }
        fn print_aligned(&self, text: &str) {
            self.calls.lock().unwrap().push(format!("print_aligned {text}"));
        }
        fn log_question(&self, question: &str, _options: &[String]) {
            self.calls.lock().unwrap().push(format!("log_question {question}"));
        }
        fn log_answer(&self, answer: &str) {
            self.calls.lock().unwrap().push(format!("log_answer {answer}"));
        }
        fn error(&self, msg: &str) {
            self.calls.lock().unwrap().push(format!("error {msg}"));
        }
        fn warn(&self, msg: &str) {
            self.calls.lock().unwrap().push(format!("warn {msg}"));
        }
        fn path(&self) -> PathBuf {
            PathBuf::from("/test/progress.txt")
        }
        fn elapsed(&self) -> String {
            "0s".to_string()
        }
        fn close(&self) -> io::Result<()> {
            self.calls.lock().unwrap().push("close".to_string());
            Ok(())
        }
    }

    fn setup() -> (Arc<NullLogger>, Arc<Session>, BroadcastLogger) {
        let inner = Arc::new(NullLogger::default());
        let session = Arc::new(Session::new("test", "/tmp/progress-test.txt"));
        let broadcast = BroadcastLogger::new(inner.clone(), session.clone());
        (inner, session, broadcast)
    }

    fn drain(session: &Session) -> Vec<StreamEvent> {
        let mut rx = session.subscribe();
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_forwards_to_inner_and_session() {
        let (inner, session, broadcast) = setup();
        broadcast.print("hello");
        broadcast.print_raw("raw chunk");

        assert_eq!(inner.calls(), vec!["print hello", "print_raw raw chunk"]);
        assert_eq!(
            drain(&session),
            vec![
                StreamEvent::Line { text: "hello".into() },
                StreamEvent::Line { text: "raw chunk".into() },
            ]
        );
    }

    #[test]
    fn test_leaving_task_phase_emits_task_end() {
        let (_, session, broadcast) = setup();
        broadcast.set_phase(Phase::Task);
        broadcast.print_section(&Section::task_iteration(1));
        broadcast.print_section(&Section::task_iteration(2));
        broadcast.set_phase(Phase::Review);

        let events = drain(&session);
        assert!(events.contains(&StreamEvent::TaskEnd { iteration: 2 }));

        // the boundary fires once; review -> codex must not repeat it
        broadcast.set_phase(Phase::Codex);
        let events = drain(&session);
        assert_eq!(
            events.iter().filter(|e| matches!(e, StreamEvent::TaskEnd { .. })).count(),
            1
        );
    }

    #[test]
    fn test_task_end_precedes_new_phase_event() {
        let (_, session, broadcast) = setup();
        broadcast.print_section(&Section::task_iteration(3));
        broadcast.set_phase(Phase::Review);

        let events = drain(&session);
        let end_pos = events
            .iter()
            .position(|e| matches!(e, StreamEvent::TaskEnd { .. }))
            .unwrap();
        let phase_pos = events
            .iter()
            .position(|e| matches!(e, StreamEvent::Phase { phase: Phase::Review }))
            .unwrap();
        assert!(end_pos < phase_pos);
    }

    #[test]
    fn test_aligned_lines_republish_signals() {
        let (_, session, broadcast) = setup();
        broadcast.print_aligned("work done <<<RALPHEX:ALL_TASKS_DONE>>>\nplain line");

        let events = drain(&session);
        assert_eq!(
            events,
            vec![
                StreamEvent::Line { text: "work done <<<RALPHEX:ALL_TASKS_DONE>>>".into() },
                StreamEvent::Signal { name: "COMPLETED".into() },
                StreamEvent::Line { text: "plain line".into() },
            ]
        );
    }

    #[test]
    fn test_signal_display_names() {
        assert_eq!(signal_display_name(&Signal::AllTasksDone), "COMPLETED");
        assert_eq!(signal_display_name(&Signal::TaskFailed), "FAILED");
        assert_eq!(signal_display_name(&Signal::ReviewDone), "REVIEW_DONE");
        assert_eq!(signal_display_name(&Signal::CodexReviewDone), "CODEX_REVIEW_DONE");
        assert_eq!(signal_display_name(&Signal::PlanReady), "PLAN_READY");
    }

    #[test]
    fn test_question_and_answer_events() {
        let (inner, session, broadcast) = setup();
        broadcast.log_question("pick one", &["A".to_string(), "B".to_string()]);
        broadcast.log_answer("A");

        assert_eq!(inner.calls(), vec!["log_question pick one", "log_answer A"]);
        assert_eq!(
            drain(&session),
            vec![
                StreamEvent::Question {
                    question: "pick one".into(),
                    options: vec!["A".into(), "B".into()],
                },
                StreamEvent::Answer { answer: "A".into() },
            ]
        );
    }

    #[test]
    fn test_close_publishes_done() {
        let (inner, session, broadcast) = setup();
        broadcast.close().unwrap();
        assert!(inner.calls().contains(&"close".to_string()));
        assert!(session.completed());
    }

    #[test]
    fn test_path_delegates() {
        let (_, _, broadcast) = setup();
        assert_eq!(broadcast.path(), PathBuf::from("/test/progress.txt"));
    }
}
