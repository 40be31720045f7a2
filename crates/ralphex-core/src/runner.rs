//! The phase pipeline driving the external assistant.
//!
//! The runner is the only component that advances phases. It launches the
//! subprocess once per iteration, streams every output line through the
//! logger, and reacts to the signal markers embedded in the stream. Loggers,
//! the UI and the dashboard never decide to terminate a run.

use crate::collector::{AskError, InputCollector};
use crate::executor::{ExecError, Executor};
use crate::logger::Logger;
use crate::prompts::{Prompts, PromptVars};
use ralphex_proto::{Mode, Phase, QuestionPayload, Section, Signal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runner inputs, already merged from config and CLI flags.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Plan file (absolute), when the mode requires one.
    pub plan_file: Option<PathBuf>,
    /// Plan description (plan mode).
    pub plan_description: String,
    pub mode: Mode,
    /// Current branch, substituted into prompts.
    pub branch: String,
    /// Inclusive iteration cap per phase.
    pub max_iterations: u32,
    /// Relaunches allowed after `TASK_FAILED`.
    pub task_retry_count: u32,
    /// Pause between iterations.
    pub iteration_delay_ms: u64,
    /// Whether the codex phase (and its follow-up review) runs in full mode.
    pub codex_enabled: bool,
}

/// Why a run failed.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("{phase} phase: iteration cap exhausted after {iterations} iterations")]
    IterationCap {
        phase: &'static str,
        iterations: u32,
    },
    #[error("task phase: retry cap exhausted after {attempts} failed attempts")]
    RetryCap { attempts: u32 },
    #[error(transparent)]
    Launch(#[from] ExecError),
    #[error("subprocess: {0}")]
    Subprocess(#[from] io::Error),
    #[error(transparent)]
    Ask(#[from] AskError),
    #[error("question received but no input collector configured")]
    NoCollector,
    #[error("canceled")]
    Canceled,
}

/// Static shape of one phase; every phase runs the same loop.
struct PhaseSpec {
    /// Name used in error messages.
    name: &'static str,
    /// Broadcast phase for styling.
    phase: Phase,
    /// Signal name that completes the phase.
    terminal: &'static str,
    /// Whether `TASK_FAILED` triggers the retry counter.
    retryable: bool,
    /// Whether `QUESTION` signals suspend for user input.
    interactive: bool,
}

/// What one subprocess launch produced.
enum Outcome {
    /// The phase's terminal signal was seen; advance.
    Terminal,
    /// `TASK_FAILED` was seen; retry or fail.
    Failed,
    /// The subprocess exited without a signal; relaunch or fail.
    NoSignal,
}

/// The phase pipeline.
pub struct Runner {
    cfg: RunnerConfig,
    log: Arc<dyn Logger>,
    prompts: Prompts,
    assistant: Arc<dyn Executor>,
    reviewer: Arc<dyn Executor>,
    collector: Option<Arc<dyn InputCollector>>,
}

impl Runner {
    /// Creates a runner. The assistant executor drives the task, review and
    /// plan phases; the reviewer executor drives the codex phase.
    pub fn new(
        cfg: RunnerConfig,
        log: Arc<dyn Logger>,
        prompts: Prompts,
        assistant: Arc<dyn Executor>,
        reviewer: Arc<dyn Executor>,
    ) -> Self {
        Self {
            cfg,
            log,
            prompts,
            assistant,
            reviewer,
            collector: None,
        }
    }

    /// Attaches the input collector used for `QUESTION` signals.
    pub fn set_input_collector(&mut self, collector: Arc<dyn InputCollector>) {
        self.collector = Some(collector);
    }

    /// Runs the pipeline for the configured mode to completion or failure.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        match self.cfg.mode {
            Mode::Full => {
                self.task_phase(cancel).await?;
                self.review_phase(cancel, "").await?;
                if self.cfg.codex_enabled {
                    self.codex_phase(cancel).await?;
                    self.review_phase(cancel, " (post-codex)").await?;
                }
                Ok(())
            }
            Mode::Review => self.review_phase(cancel, "").await,
            Mode::CodexOnly => {
                self.codex_phase(cancel).await?;
                self.review_phase(cancel, " (post-codex)").await
            }
            Mode::Plan => self.plan_phase(cancel).await,
        }
    }

    async fn task_phase(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        let plan_path = self
            .cfg
            .plan_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let prompt = self.prompts.task(PromptVars {
            plan_path: &plan_path,
            branch: &self.cfg.branch,
            ..Default::default()
        });
        let spec = PhaseSpec {
            name: "task",
            phase: Phase::Task,
            terminal: "ALL_TASKS_DONE",
            retryable: true,
            interactive: false,
        };
        self.drive(cancel, spec, &self.assistant, Section::task_iteration, |_| {
            prompt.clone()
        })
        .await
    }

    async fn review_phase(
        &self,
        cancel: &CancellationToken,
        suffix: &str,
    ) -> Result<(), RunnerError> {
        let prompt = self.prompts.review(PromptVars {
            branch: &self.cfg.branch,
            ..Default::default()
        });
        let spec = PhaseSpec {
            name: "review",
            phase: Phase::Review,
            terminal: "REVIEW_DONE",
            retryable: false,
            interactive: false,
        };
        self.drive(
            cancel,
            spec,
            &self.assistant,
            |n| Section::claude_review(n, suffix),
            |_| prompt.clone(),
        )
        .await
    }

    async fn codex_phase(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        let prompt = self.prompts.codex(PromptVars {
            branch: &self.cfg.branch,
            ..Default::default()
        });
        let spec = PhaseSpec {
            name: "codex",
            phase: Phase::Codex,
            terminal: "CODEX_REVIEW_DONE",
            retryable: false,
            interactive: false,
        };
        self.drive(cancel, spec, &self.reviewer, Section::codex_iteration, |_| {
            prompt.clone()
        })
        .await
    }

    async fn plan_phase(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        let spec = PhaseSpec {
            name: "plan",
            phase: Phase::Task,
            terminal: "PLAN_READY",
            retryable: false,
            interactive: true,
        };
        self.drive(
            cancel,
            spec,
            &self.assistant,
            |n| Section::generic(format!("plan iteration {n}")),
            |transcript| {
                self.prompts.plan(PromptVars {
                    plan_request: &self.cfg.plan_description,
                    transcript,
                    ..Default::default()
                })
            },
        )
        .await
    }

    /// The per-phase loop, identical in shape for every phase: section
    /// header, launch, stream and scan, then advance, retry or fail.
    async fn drive(
        &self,
        cancel: &CancellationToken,
        spec: PhaseSpec,
        executor: &Arc<dyn Executor>,
        section: impl Fn(u32) -> Section,
        prompt: impl Fn(&str) -> String,
    ) -> Result<(), RunnerError> {
        // phase changes before the first section so the broadcast layer can
        // observe the transition
        self.log.set_phase(spec.phase);

        let mut iteration = 1u32;
        let mut retries = 0u32;
        let mut transcript = String::new();

        loop {
            if cancel.is_cancelled() {
                return Err(RunnerError::Canceled);
            }

            self.log.print_section(&section(iteration));
            let outcome = self
                .run_iteration(cancel, &spec, executor, &prompt(&transcript), &mut transcript)
                .await?;

            match outcome {
                Outcome::Terminal => {
                    info!(phase = spec.name, iterations = iteration, "phase complete");
                    self.log
                        .print(&format!("{} phase complete ({iteration} iterations)", spec.name));
                    return Ok(());
                }
                Outcome::Failed => {
                    retries += 1;
                    if retries > self.cfg.task_retry_count {
                        self.log.error(&format!(
                            "task failed {retries} times, giving up"
                        ));
                        return Err(RunnerError::RetryCap { attempts: retries });
                    }
                    self.log.print(&format!(
                        "task failed, retrying ({retries}/{})",
                        self.cfg.task_retry_count
                    ));
                }
                Outcome::NoSignal => {
                    debug!(phase = spec.name, iteration, "no terminal signal, relaunching");
                }
            }

            if iteration >= self.cfg.max_iterations {
                return Err(RunnerError::IterationCap {
                    phase: spec.name,
                    iterations: iteration,
                });
            }
            iteration += 1;
            self.pause(cancel).await?;
        }
    }

    /// Launches the subprocess once, streaming and scanning every line.
    async fn run_iteration(
        &self,
        cancel: &CancellationToken,
        spec: &PhaseSpec,
        executor: &Arc<dyn Executor>,
        prompt: &str,
        transcript: &mut String,
    ) -> Result<Outcome, RunnerError> {
        debug!(phase = spec.name, "launching subprocess");
        let mut process = executor.spawn(prompt, cancel.child_token()).await?;

        let mut terminal = false;
        let mut failed = false;

        while let Some(line) = process.next_line().await {
            self.log.print_aligned(&line);
            match Signal::scan(&line) {
                Some(signal) if signal.name() == spec.terminal => terminal = true,
                Some(Signal::TaskFailed) if spec.retryable => failed = true,
                Some(Signal::Question(question)) if spec.interactive => {
                    let answer = self.ask(&question).await?;
                    transcript.push_str(&format!("Q: {}\nA: {answer}\n", question.question));
                }
                Some(signal) => {
                    debug!(signal = signal.name(), phase = spec.name, "out-of-phase signal ignored");
                }
                None => {}
            }
            if cancel.is_cancelled() {
                // abort at the line boundary; the executor kills the child
                break;
            }
        }

        let status = process.wait().await?;
        if cancel.is_cancelled() {
            return Err(RunnerError::Canceled);
        }

        if terminal {
            return Ok(Outcome::Terminal);
        }
        if failed {
            return Ok(Outcome::Failed);
        }
        if !status.success {
            warn!(code = ?status.code, phase = spec.name, "subprocess exited non-zero without a signal");
            self.log.warn(&format!(
                "subprocess exited with code {} without a signal",
                status.code.map_or_else(|| "?".to_string(), |c| c.to_string())
            ));
        }
        Ok(Outcome::NoSignal)
    }

    /// Suspends the pipeline while the user answers.
    async fn ask(&self, question: &QuestionPayload) -> Result<String, RunnerError> {
        let collector = self.collector.as_ref().ok_or(RunnerError::NoCollector)?;
        self.log.log_question(&question.question, &question.options);
        let answer = collector
            .ask_question(&question.question, &question.options)
            .await?;
        self.log.log_answer(&answer);
        Ok(answer)
    }

    /// Sleeps the configured delay between iterations, waking early on
    /// cancellation.
    async fn pause(&self, cancel: &CancellationToken) -> Result<(), RunnerError> {
        if self.cfg.iteration_delay_ms == 0 {
            if cancel.is_cancelled() {
                return Err(RunnerError::Canceled);
            }
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(RunnerError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(self.cfg.iteration_delay_ms)) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExitInfo, RunningProcess};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::{mpsc, oneshot};

    /// Executor fake that replays scripted line batches, one per launch.
    struct ScriptedExecutor {
        runs: Mutex<VecDeque<Vec<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        fn new(runs: Vec<Vec<&str>>) -> Arc<Self> {
            Arc::new(Self {
                runs: Mutex::new(
                    runs.into_iter()
                        .map(|lines| lines.into_iter().map(String::from).collect())
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        fn remaining(&self) -> usize {
            self.runs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Executor for ScriptedExecutor {
        async fn spawn(
            &self,
            prompt: &str,
            _cancel: CancellationToken,
        ) -> Result<RunningProcess, ExecError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let lines = self.runs.lock().unwrap().pop_front().unwrap_or_default();

            let (line_tx, line_rx) = mpsc::channel(64);
            let (status_tx, status_rx) = oneshot::channel();
            tokio::spawn(async move {
                for line in lines {
                    if line_tx.send(line).await.is_err() {
                        break;
                    }
                }
                let _ = status_tx.send(Ok(ExitInfo {
                    success: true,
                    code: Some(0),
                }));
            });
            Ok(RunningProcess::new(line_rx, status_rx))
        }
    }

    /// Logger fake recording every call as a readable string.
    #[derive(Default)]
    struct RecordingLogger {
        events: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Logger for RecordingLogger {
        fn set_phase(&self, phase: Phase) {
            self.push(format!("phase: {phase}"));
        }
        fn print(&self, msg: &str) {
            self.push(format!("print: {msg}"));
        }
        fn print_raw(&self, chunk: &str) {
            self.push(format!("raw: {chunk}"));
        }
        fn print_section(&self, section: &Section) {
            self.push(format!("section: {}", section.label()));
        }
        fn print_aligned(&self, text: &str) {
            self.push(format!("aligned: {text}"));
        }
        fn log_question(&self, question: &str, _options: &[String]) {
            self.push(format!("question: {question}"));
        }
        fn log_answer(&self, answer: &str) {
            self.push(format!("answer: {answer}"));
        }
        fn error(&self, msg: &str) {
            self.push(format!("error: {msg}"));
        }
        fn warn(&self, msg: &str) {
            self.push(format!("warn: {msg}"));
        }
        fn path(&self) -> PathBuf {
            PathBuf::from("progress-test.txt")
        }
        fn elapsed(&self) -> String {
            "0s".to_string()
        }
        fn close(&self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Collector fake replaying scripted answers.
    struct ScriptedCollector {
        answers: Mutex<VecDeque<String>>,
    }

    impl ScriptedCollector {
        fn new(answers: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().map(String::from).collect()),
            })
        }
    }

    #[async_trait]
    impl InputCollector for ScriptedCollector {
        async fn ask_question(
            &self,
            _question: &str,
            _options: &[String],
        ) -> Result<String, AskError> {
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(AskError::Closed)
        }
    }

    fn config(mode: Mode) -> RunnerConfig {
        RunnerConfig {
            plan_file: Some(PathBuf::from("docs/plans/add-cache.md")),
            plan_description: String::new(),
            mode,
            branch: "add-cache".to_string(),
            max_iterations: 50,
            task_retry_count: 3,
            iteration_delay_ms: 0,
            codex_enabled: true,
        }
    }

    fn sections(events: &[String]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| e.strip_prefix("section: "))
            .map(String::from)
            .collect()
    }

    #[tokio::test]
    async fn test_full_mode_happy_path() {
        let assistant = ScriptedExecutor::new(vec![
            vec!["building feature"],
            vec!["more work"],
            vec!["all done <<<RALPHEX:ALL_TASKS_DONE>>>"],
            vec!["looks good <<<RALPHEX:REVIEW_DONE>>>"],
            vec!["clean <<<RALPHEX:REVIEW_DONE>>>"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![vec!["no issues <<<RALPHEX:CODEX_REVIEW_DONE>>>"]]);
        let log = Arc::new(RecordingLogger::default());

        let runner = Runner::new(
            config(Mode::Full),
            log.clone(),
            Prompts::default(),
            assistant.clone(),
            reviewer.clone(),
        );
        runner.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            sections(&log.events()),
            vec![
                "task iteration 1",
                "task iteration 2",
                "task iteration 3",
                "claude review 1",
                "codex iteration 1",
                "claude review 1 (post-codex)",
            ]
        );
        assert_eq!(assistant.remaining(), 0);
        assert_eq!(reviewer.remaining(), 0);
    }

    #[tokio::test]
    async fn test_phase_order_in_log() {
        let assistant = ScriptedExecutor::new(vec![
            vec!["<<<RALPHEX:ALL_TASKS_DONE>>>"],
            vec!["<<<RALPHEX:REVIEW_DONE>>>"],
            vec!["<<<RALPHEX:REVIEW_DONE>>>"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![vec!["<<<RALPHEX:CODEX_REVIEW_DONE>>>"]]);
        let log = Arc::new(RecordingLogger::default());

        let runner = Runner::new(
            config(Mode::Full),
            log.clone(),
            Prompts::default(),
            assistant,
            reviewer,
        );
        runner.run(&CancellationToken::new()).await.unwrap();

        let phases: Vec<String> = log
            .events()
            .iter()
            .filter(|e| e.starts_with("phase: "))
            .cloned()
            .collect();
        assert_eq!(
            phases,
            vec!["phase: task", "phase: review", "phase: codex", "phase: review"]
        );

        // each phase change precedes the first section of that phase
        let events = log.events();
        let phase_pos = events.iter().position(|e| e == "phase: review").unwrap();
        let section_pos = events
            .iter()
            .position(|e| e == "section: claude review 1")
            .unwrap();
        assert!(phase_pos < section_pos);
    }

    #[tokio::test]
    async fn test_task_retry_then_success() {
        let assistant = ScriptedExecutor::new(vec![
            vec!["broken <<<RALPHEX:TASK_FAILED>>>"],
            vec!["still broken <<<RALPHEX:TASK_FAILED>>>"],
            vec!["fixed <<<RALPHEX:ALL_TASKS_DONE>>>"],
            vec!["<<<RALPHEX:REVIEW_DONE>>>"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let mut cfg = config(Mode::Full);
        cfg.codex_enabled = false;
        let runner = Runner::new(cfg, log.clone(), Prompts::default(), assistant, reviewer);
        runner.run(&CancellationToken::new()).await.unwrap();

        let task_sections: Vec<_> = sections(&log.events())
            .into_iter()
            .filter(|s| s.starts_with("task iteration"))
            .collect();
        assert_eq!(
            task_sections,
            vec!["task iteration 1", "task iteration 2", "task iteration 3"]
        );
    }

    #[tokio::test]
    async fn test_retry_cap_allows_n_plus_one_attempts() {
        // retry count 2 means up to 3 total attempts; a third failure is fatal
        let assistant = ScriptedExecutor::new(vec![
            vec!["<<<RALPHEX:TASK_FAILED>>>"],
            vec!["<<<RALPHEX:TASK_FAILED>>>"],
            vec!["<<<RALPHEX:TASK_FAILED>>>"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let mut cfg = config(Mode::Full);
        cfg.task_retry_count = 2;
        let runner = Runner::new(cfg, log.clone(), Prompts::default(), assistant.clone(), reviewer);
        let err = runner.run(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, RunnerError::RetryCap { attempts: 3 }));
        assert_eq!(assistant.remaining(), 0, "all three attempts should run");
    }

    #[tokio::test]
    async fn test_iteration_cap_is_inclusive() {
        let assistant = ScriptedExecutor::new(vec![
            vec!["no signal here"],
            vec!["none here either"],
            vec!["never reached"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let mut cfg = config(Mode::Full);
        cfg.max_iterations = 2;
        let runner = Runner::new(cfg, log.clone(), Prompts::default(), assistant.clone(), reviewer);
        let err = runner.run(&CancellationToken::new()).await.unwrap_err();

        assert!(err.to_string().contains("task phase: iteration cap exhausted"));
        assert_eq!(
            sections(&log.events()),
            vec!["task iteration 1", "task iteration 2"],
            "the second iteration runs, the third does not"
        );
        assert_eq!(assistant.remaining(), 1);
    }

    #[tokio::test]
    async fn test_review_mode_runs_single_phase() {
        let assistant = ScriptedExecutor::new(vec![vec!["fine <<<RALPHEX:REVIEW_DONE>>>"]]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let runner = Runner::new(
            config(Mode::Review),
            log.clone(),
            Prompts::default(),
            assistant,
            reviewer.clone(),
        );
        runner.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(sections(&log.events()), vec!["claude review 1"]);
        assert_eq!(reviewer.remaining(), 0);
    }

    #[tokio::test]
    async fn test_codex_only_pipeline() {
        let assistant = ScriptedExecutor::new(vec![vec!["<<<RALPHEX:REVIEW_DONE>>>"]]);
        let reviewer = ScriptedExecutor::new(vec![vec!["<<<RALPHEX:CODEX_REVIEW_DONE>>>"]]);
        let log = Arc::new(RecordingLogger::default());

        let runner = Runner::new(
            config(Mode::CodexOnly),
            log.clone(),
            Prompts::default(),
            assistant,
            reviewer,
        );
        runner.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            sections(&log.events()),
            vec!["codex iteration 1", "claude review 1 (post-codex)"]
        );
    }

    #[tokio::test]
    async fn test_codex_skipped_when_disabled() {
        let assistant = ScriptedExecutor::new(vec![
            vec!["<<<RALPHEX:ALL_TASKS_DONE>>>"],
            vec!["<<<RALPHEX:REVIEW_DONE>>>"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let mut cfg = config(Mode::Full);
        cfg.codex_enabled = false;
        let runner = Runner::new(cfg, log.clone(), Prompts::default(), assistant, reviewer.clone());
        runner.run(&CancellationToken::new()).await.unwrap();

        assert_eq!(
            sections(&log.events()),
            vec!["task iteration 1", "claude review 1"]
        );
        assert_eq!(reviewer.remaining(), 0);
    }

    #[tokio::test]
    async fn test_out_of_phase_signal_ignored() {
        let assistant = ScriptedExecutor::new(vec![vec![
            "stray <<<RALPHEX:ALL_TASKS_DONE>>>",
            "actual <<<RALPHEX:REVIEW_DONE>>>",
        ]]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let runner = Runner::new(
            config(Mode::Review),
            log.clone(),
            Prompts::default(),
            assistant,
            reviewer,
        );
        runner.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(sections(&log.events()), vec!["claude review 1"]);
    }

    #[tokio::test]
    async fn test_plan_mode_question_flow() {
        let question = r#"<<<RALPHEX:QUESTION>>>{"question":"Which backend?","options":["Redis","Memcached"]}<<<RALPHEX:QUESTION_END>>>"#;
        let assistant = ScriptedExecutor::new(vec![
            vec![question],
            vec!["plan written <<<RALPHEX:PLAN_READY>>>"],
        ]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let mut cfg = config(Mode::Plan);
        cfg.plan_description = "add LRU cache".to_string();
        let mut runner = Runner::new(
            cfg,
            log.clone(),
            Prompts::default(),
            assistant.clone(),
            reviewer,
        );
        runner.set_input_collector(ScriptedCollector::new(vec!["Redis"]));
        runner.run(&CancellationToken::new()).await.unwrap();

        // answer recorded in the log
        let events = log.events();
        assert!(events.contains(&"question: Which backend?".to_string()));
        assert!(events.contains(&"answer: Redis".to_string()));

        // transcript reaches the relaunched subprocess
        let prompts = assistant.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("A: Redis"));
        assert!(prompts[1].contains("Q: Which backend?"));
        assert!(prompts[1].contains("A: Redis"));
    }

    #[tokio::test]
    async fn test_question_without_collector_fails() {
        let question = r#"<<<RALPHEX:QUESTION>>>{"question":"q","options":["a"]}<<<RALPHEX:QUESTION_END>>>"#;
        let assistant = ScriptedExecutor::new(vec![vec![question]]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let mut cfg = config(Mode::Plan);
        cfg.plan_description = "x".to_string();
        let runner = Runner::new(cfg, log, Prompts::default(), assistant, reviewer);
        let err = runner.run(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RunnerError::NoCollector));
    }

    #[tokio::test]
    async fn test_pre_canceled_run_returns_canceled() {
        let assistant = ScriptedExecutor::new(vec![vec!["anything"]]);
        let reviewer = ScriptedExecutor::new(vec![]);
        let log = Arc::new(RecordingLogger::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let runner = Runner::new(config(Mode::Full), log, Prompts::default(), assistant, reviewer);
        let err = runner.run(&cancel).await.unwrap_err();
        assert!(matches!(err, RunnerError::Canceled));
    }
}
