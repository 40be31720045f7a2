//! UI state machine.
//!
//! All mutation happens inside the event loop via `apply` (messages) and
//! `handle_key` (keyboard); rendering is pure over the current model.

use crate::messages::{PlanSelection, UiMsg};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ralphex_proto::Phase;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::oneshot;

/// Viewport buffer cap; the oldest lines are discarded past it.
pub const MAX_OUTPUT_LINES: usize = 10_000;

/// Lines moved by PageUp/PageDown.
const PAGE: usize = 20;

/// Current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    SelectPlan,
    CreatePlan,
    Executing,
    Question,
    Done,
}

/// What a key press asks the event loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
}

/// The whole UI model.
pub struct UiModel {
    pub state: UiState,
    prev_state: UiState,
    pub phase: Phase,
    pub plan_name: String,
    pub branch: String,
    pub error: Option<String>,
    pub started: Instant,

    // executing viewport
    pub output: Vec<String>,
    pub auto_scroll: bool,
    pub scroll: usize,
    /// Body height in rows, refreshed by the event loop before each draw.
    pub viewport_height: usize,

    // plan selection
    pub plans: Vec<PathBuf>,
    pub plan_cursor: usize,
    pub filter: String,
    pub filtering: bool,

    // plan creation
    pub draft: String,

    // question overlay
    pub question: String,
    pub options: Vec<String>,
    pub question_cursor: usize,
    answer_tx: Option<oneshot::Sender<String>>,

    plan_result_tx: Option<oneshot::Sender<PlanSelection>>,
}

impl UiModel {
    pub fn new(initial_state: UiState, plans: Vec<PathBuf>) -> Self {
        Self {
            state: initial_state,
            prev_state: initial_state,
            phase: Phase::Task,
            plan_name: String::new(),
            branch: String::new(),
            error: None,
            started: Instant::now(),
            output: Vec::new(),
            auto_scroll: true,
            scroll: 0,
            viewport_height: 20,
            plans,
            plan_cursor: 0,
            filter: String::new(),
            filtering: false,
            draft: String::new(),
            question: String::new(),
            options: Vec::new(),
            question_cursor: 0,
            answer_tx: None,
            plan_result_tx: None,
        }
    }

    /// Applies an incoming message.
    pub fn apply(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::Output(text) => {
                for line in text.split('\n') {
                    self.push_line(line.to_string());
                }
            }
            UiMsg::Section(section) => {
                self.push_line(format!("=== {} ===", section.label()));
            }
            UiMsg::Phase(phase) => self.phase = phase,
            UiMsg::Question {
                question,
                options,
                answer_tx,
            } => {
                if self.state != UiState::Question {
                    self.prev_state = self.state;
                }
                self.state = UiState::Question;
                self.question = question;
                self.options = options;
                self.question_cursor = 0;
                self.answer_tx = Some(answer_tx);
            }
            UiMsg::StartupInfo { plan, branch } => {
                self.plan_name = plan;
                self.branch = branch;
            }
            UiMsg::ExecutionDone { error } => {
                self.state = UiState::Done;
                self.error = error;
            }
            UiMsg::PlanSelectionRequest { result_tx } => {
                self.plan_result_tx = Some(result_tx);
            }
        }
    }

    /// Handles a key press; `Some(Action::Quit)` ends the event loop.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        match self.state {
            UiState::Question => self.key_question(key),
            UiState::SelectPlan => self.key_select_plan(key),
            UiState::CreatePlan => self.key_create_plan(key),
            UiState::Executing => self.key_viewport(key),
            UiState::Done => Some(Action::Quit),
        }
    }

    fn key_question(&mut self, key: KeyEvent) -> Option<Action> {
        if is_ctrl_c(&key) {
            // dropping the answer channel cancels the pending question
            self.answer_tx = None;
            return Some(Action::Quit);
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.question_cursor = self.question_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.question_cursor + 1 < self.options.len() {
                    self.question_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(tx) = self.answer_tx.take() {
                    if let Some(answer) = self.options.get(self.question_cursor) {
                        let _ = tx.send(answer.clone());
                    }
                }
                self.state = self.prev_state;
                self.question.clear();
                self.options.clear();
            }
            _ => {}
        }
        None
    }

    fn key_select_plan(&mut self, key: KeyEvent) -> Option<Action> {
        if self.plans.is_empty() {
            return match key.code {
                KeyCode::Char('n') => {
                    self.state = UiState::CreatePlan;
                    None
                }
                KeyCode::Char('q') => {
                    self.deliver_plan(PlanSelection::NoPlans);
                    Some(Action::Quit)
                }
                _ if is_ctrl_c(&key) => {
                    self.deliver_plan(PlanSelection::NoPlans);
                    Some(Action::Quit)
                }
                _ => None,
            };
        }

        if is_ctrl_c(&key) {
            self.deliver_plan(PlanSelection::Canceled);
            return Some(Action::Quit);
        }

        if self.filtering {
            match key.code {
                KeyCode::Esc => {
                    self.filtering = false;
                    self.filter.clear();
                }
                KeyCode::Enter => self.filtering = false,
                KeyCode::Backspace => {
                    self.filter.pop();
                }
                KeyCode::Char(c) => {
                    self.filter.push(c);
                    self.plan_cursor = 0;
                }
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') => {
                self.deliver_plan(PlanSelection::Canceled);
                return Some(Action::Quit);
            }
            KeyCode::Char('n') => self.state = UiState::CreatePlan,
            KeyCode::Char('/') => self.filtering = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.plan_cursor = self.plan_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.plan_cursor + 1 < self.filtered_plans().len() {
                    self.plan_cursor += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(plan) = self.filtered_plans().get(self.plan_cursor).cloned() {
                    self.deliver_plan(PlanSelection::Selected(plan));
                    self.state = UiState::Executing;
                }
            }
            _ => {}
        }
        None
    }

    fn key_create_plan(&mut self, key: KeyEvent) -> Option<Action> {
        if is_ctrl_c(&key) {
            self.deliver_plan(PlanSelection::Canceled);
            return Some(Action::Quit);
        }
        match key.code {
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.submit_draft()
            }
            KeyCode::Esc => {
                if self.draft.trim().is_empty() {
                    self.deliver_plan(PlanSelection::Canceled);
                    Some(Action::Quit)
                } else {
                    self.submit_draft()
                }
            }
            KeyCode::Enter => {
                self.draft.push('\n');
                None
            }
            KeyCode::Backspace => {
                self.draft.pop();
                None
            }
            KeyCode::Char(c) => {
                self.draft.push(c);
                None
            }
            _ => None,
        }
    }

    fn submit_draft(&mut self) -> Option<Action> {
        if self.draft.trim().is_empty() {
            self.deliver_plan(PlanSelection::Canceled);
            return Some(Action::Quit);
        }
        let description = self.draft.trim().to_string();
        self.deliver_plan(PlanSelection::Created(description));
        self.state = UiState::Executing;
        None
    }

    fn key_viewport(&mut self, key: KeyEvent) -> Option<Action> {
        if is_ctrl_c(&key) {
            return Some(Action::Quit);
        }
        match key.code {
            KeyCode::Char('q') => return Some(Action::Quit),
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                self.auto_scroll = false;
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(PAGE);
                self.auto_scroll = false;
            }
            KeyCode::PageDown => self.scroll_down(PAGE),
            KeyCode::Home => {
                self.scroll = 0;
                self.auto_scroll = false;
            }
            KeyCode::End => {
                self.scroll = self.max_scroll();
                self.auto_scroll = true;
            }
            _ => {}
        }
        None
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll = (self.scroll + lines).min(self.max_scroll());
        if self.scroll == self.max_scroll() {
            // reaching the bottom re-enables auto-scroll
            self.auto_scroll = true;
        }
    }

    /// Topmost visible line when scrolled all the way down.
    pub fn max_scroll(&self) -> usize {
        self.output.len().saturating_sub(self.viewport_height)
    }

    fn push_line(&mut self, line: String) {
        self.output.push(line);
        if self.output.len() > MAX_OUTPUT_LINES {
            let excess = self.output.len() - MAX_OUTPUT_LINES;
            self.output.drain(..excess);
        }
        if self.auto_scroll {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    /// Plans matching the current filter (case-insensitive on the filename).
    pub fn filtered_plans(&self) -> Vec<PathBuf> {
        if self.filter.is_empty() {
            return self.plans.clone();
        }
        let needle = self.filter.to_lowercase();
        self.plans
            .iter()
            .filter(|plan| {
                plan.file_name()
                    .map(|name| name.to_string_lossy().to_lowercase())
                    .is_some_and(|name| name.contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Seconds since the UI started, for the status bar.
    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    fn deliver_plan(&mut self, selection: PlanSelection) {
        if let Some(tx) = self.plan_result_tx.take() {
            let _ = tx.send(selection);
        }
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralphex_proto::Section;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_output_buffer_caps_and_keeps_order() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        for i in 0..(MAX_OUTPUT_LINES + 1) {
            model.apply(UiMsg::Output(i.to_string()));
        }
        assert_eq!(model.output.len(), MAX_OUTPUT_LINES);
        assert_eq!(model.output.first().unwrap(), "1", "oldest line dropped");
        assert_eq!(model.output.last().unwrap(), &MAX_OUTPUT_LINES.to_string());
    }

    #[test]
    fn test_scroll_disables_then_bottom_reenables_auto_scroll() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        model.viewport_height = 5;
        for i in 0..20 {
            model.apply(UiMsg::Output(i.to_string()));
        }
        assert!(model.auto_scroll);

        model.handle_key(key(KeyCode::Up));
        assert!(!model.auto_scroll);

        model.handle_key(key(KeyCode::End));
        assert!(model.auto_scroll);
        assert_eq!(model.scroll, model.max_scroll());
    }

    #[test]
    fn test_section_renders_as_banner_line() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        model.apply(UiMsg::Section(Section::task_iteration(2)));
        assert_eq!(model.output.last().unwrap(), "=== task iteration 2 ===");
    }

    #[test]
    fn test_question_overlays_and_restores_previous_state() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        let (tx, mut rx) = oneshot::channel();
        model.apply(UiMsg::Question {
            question: "pick".into(),
            options: vec!["A".into(), "B".into()],
            answer_tx: tx,
        });
        assert_eq!(model.state, UiState::Question);

        model.handle_key(key(KeyCode::Down));
        model.handle_key(key(KeyCode::Enter));
        assert_eq!(model.state, UiState::Executing);
        assert_eq!(rx.try_recv().unwrap(), "B");
    }

    #[test]
    fn test_question_ctrl_c_closes_answer_channel() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        let (tx, mut rx) = oneshot::channel();
        model.apply(UiMsg::Question {
            question: "pick".into(),
            options: vec!["A".into()],
            answer_tx: tx,
        });

        assert_eq!(model.handle_key(ctrl('c')), Some(Action::Quit));
        assert!(rx.try_recv().is_err(), "channel closed without an answer");
    }

    #[test]
    fn test_question_cursor_stays_in_bounds() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        let (tx, _rx) = oneshot::channel();
        model.apply(UiMsg::Question {
            question: "pick".into(),
            options: vec!["A".into(), "B".into()],
            answer_tx: tx,
        });

        model.handle_key(key(KeyCode::Up));
        assert_eq!(model.question_cursor, 0);
        model.handle_key(key(KeyCode::Down));
        model.handle_key(key(KeyCode::Down));
        assert_eq!(model.question_cursor, 1);
    }

    #[test]
    fn test_plan_selection_enter_delivers_path() {
        let plans = vec![PathBuf::from("a.md"), PathBuf::from("b.md")];
        let mut model = UiModel::new(UiState::SelectPlan, plans);
        let (tx, mut rx) = oneshot::channel();
        model.apply(UiMsg::PlanSelectionRequest { result_tx: tx });

        model.handle_key(key(KeyCode::Down));
        model.handle_key(key(KeyCode::Enter));
        assert_eq!(
            rx.try_recv().unwrap(),
            PlanSelection::Selected(PathBuf::from("b.md"))
        );
        assert_eq!(model.state, UiState::Executing);
    }

    #[test]
    fn test_plan_filter_narrows_list() {
        let plans = vec![PathBuf::from("add-cache.md"), PathBuf::from("fix-auth.md")];
        let mut model = UiModel::new(UiState::SelectPlan, plans);

        model.handle_key(key(KeyCode::Char('/')));
        assert!(model.filtering);
        model.handle_key(key(KeyCode::Char('a')));
        model.handle_key(key(KeyCode::Char('u')));
        assert_eq!(model.filtered_plans(), vec![PathBuf::from("fix-auth.md")]);

        model.handle_key(key(KeyCode::Esc));
        assert!(!model.filtering);
        assert_eq!(model.filtered_plans().len(), 2);
    }

    #[test]
    fn test_empty_plan_list_n_creates_q_quits() {
        let mut model = UiModel::new(UiState::SelectPlan, Vec::new());
        let (tx, mut rx) = oneshot::channel();
        model.apply(UiMsg::PlanSelectionRequest { result_tx: tx });

        model.handle_key(key(KeyCode::Char('n')));
        assert_eq!(model.state, UiState::CreatePlan);

        // back in an empty select screen, q quits with NoPlans
        let mut model = UiModel::new(UiState::SelectPlan, Vec::new());
        let (tx2, mut rx2) = oneshot::channel();
        model.apply(UiMsg::PlanSelectionRequest { result_tx: tx2 });
        assert_eq!(model.handle_key(key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(rx2.try_recv().unwrap(), PlanSelection::NoPlans);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_create_plan_submit_and_cancel() {
        let mut model = UiModel::new(UiState::CreatePlan, Vec::new());
        let (tx, mut rx) = oneshot::channel();
        model.apply(UiMsg::PlanSelectionRequest { result_tx: tx });

        for c in "add cache".chars() {
            model.handle_key(key(KeyCode::Char(c)));
        }
        model.handle_key(ctrl('d'));
        assert_eq!(
            rx.try_recv().unwrap(),
            PlanSelection::Created("add cache".into())
        );
        assert_eq!(model.state, UiState::Executing);

        // esc with empty content cancels
        let mut model = UiModel::new(UiState::CreatePlan, Vec::new());
        let (tx2, mut rx2) = oneshot::channel();
        model.apply(UiMsg::PlanSelectionRequest { result_tx: tx2 });
        assert_eq!(model.handle_key(key(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(rx2.try_recv().unwrap(), PlanSelection::Canceled);
    }

    #[test]
    fn test_create_plan_esc_with_content_submits() {
        let mut model = UiModel::new(UiState::CreatePlan, Vec::new());
        let (tx, mut rx) = oneshot::channel();
        model.apply(UiMsg::PlanSelectionRequest { result_tx: tx });

        model.handle_key(key(KeyCode::Char('x')));
        assert_eq!(model.handle_key(key(KeyCode::Esc)), None);
        assert_eq!(rx.try_recv().unwrap(), PlanSelection::Created("x".into()));
    }

    #[test]
    fn test_done_any_key_quits() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        model.apply(UiMsg::ExecutionDone { error: Some("boom".into()) });
        assert_eq!(model.state, UiState::Done);
        assert_eq!(model.error.as_deref(), Some("boom"));
        assert_eq!(model.handle_key(key(KeyCode::Char('x'))), Some(Action::Quit));
    }

    #[test]
    fn test_executing_q_quits() {
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        assert_eq!(model.handle_key(key(KeyCode::Char('q'))), Some(Action::Quit));
        let mut model = UiModel::new(UiState::Executing, Vec::new());
        assert_eq!(model.handle_key(ctrl('c')), Some(Action::Quit));
    }
}
