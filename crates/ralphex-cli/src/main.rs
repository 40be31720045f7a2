//! ralphex - autonomous plan execution with Claude Code.
//!
//! The binary wires the pieces together: clap parsing, configuration, git
//! setup, the TUI event loop on the main task, the orchestrator on a
//! background task, and optionally the web dashboard.

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use ralphex_adapters::{CommandExecutor, Repo};
use ralphex_core::progress::ProgressConfig;
use ralphex_core::{config, plan, Config, InputCollector, Logger, Prompts, Runner, RunnerConfig};
use ralphex_proto::Mode;
use ralphex_tui::{App, PlanSelection, SafeSender, Styles, TuiCollector, TuiLogger, UiModel, UiMsg, UiState};
use ralphex_web::{
    resolve_watch_dirs, serve, BroadcastLogger, Session, SessionRegistry, Watcher,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Time to wait for server startup errors before assuming success.
const SERVER_STARTUP: Duration = Duration::from_millis(100);

#[derive(Parser, Debug, Clone)]
#[command(name = "ralphex", about = "autonomous plan execution with Claude Code")]
#[command(disable_version_flag = true, override_usage = "ralphex [OPTIONS] [plan-file]")]
struct Opts {
    /// maximum task iterations
    #[arg(short = 'm', long, default_value_t = 50)]
    max_iterations: u32,

    /// skip task execution, run full review pipeline
    #[arg(short = 'r', long)]
    review: bool,

    /// skip tasks and first review, run only codex loop
    #[arg(short = 'c', long)]
    codex_only: bool,

    /// create plan interactively (enter plan description)
    #[arg(long = "plan", value_name = "DESCRIPTION", conflicts_with = "plan_file")]
    plan: Option<String>,

    /// enable debug logging
    #[arg(short = 'd', long)]
    debug: bool,

    /// disable color output
    #[arg(long)]
    no_color: bool,

    /// print version and exit
    #[arg(short = 'v', long)]
    version: bool,

    /// start web dashboard for real-time streaming
    #[arg(short = 's', long)]
    serve: bool,

    /// web dashboard port
    #[arg(short = 'p', long, default_value_t = 8080)]
    port: u16,

    /// directories to watch for progress files (repeatable)
    #[arg(short = 'w', long = "watch", value_name = "DIR")]
    watch: Vec<PathBuf>,

    /// reset global config to embedded defaults
    #[arg(long)]
    reset: bool,

    /// path to plan file (optional, interactive selection if omitted)
    #[arg(value_name = "plan-file")]
    plan_file: Option<PathBuf>,
}

/// Everything the background business logic needs.
struct AppCtx {
    opts: Opts,
    cfg: Config,
    repo: Repo,
    sender: Arc<SafeSender>,
    cancel: CancellationToken,
}

#[tokio::main]
async fn main() -> ExitCode {
    println!("ralphex {}", env!("CARGO_PKG_VERSION"));

    let opts = Opts::parse();
    if opts.version {
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::fmt()
        .with_env_filter(if opts.debug { "debug" } else { "warn" })
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    match run(opts, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let interrupted = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        #[cfg(unix)]
        {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("install SIGTERM handler");
            tokio::select! {
                _ = interrupted => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        interrupted.await;

        cancel.cancel();
    });
}

async fn run(opts: Opts, cancel: CancellationToken) -> Result<()> {
    if opts.reset {
        let path = config::reset(&config::default_config_dir()).context("reset config")?;
        println!("config reset to defaults: {}", path.display());
        if is_reset_only(&opts) {
            return Ok(());
        }
    }

    let cfg = Config::load().context("load config")?;

    // watch-only mode runs the dashboard without plan execution and can run
    // from any directory
    if is_watch_only(&opts, &cfg.watch_dirs) {
        return run_watch_only(&opts, &cfg, cancel).await;
    }

    which::which(&cfg.claude_command)
        .map_err(|_| anyhow!("{} not found in PATH", cfg.claude_command))?;

    if !Path::new(".git").exists() {
        bail!("must run from repository root (no .git directory found)");
    }
    let repo = Repo::open(".").context("open git repo")?;

    let mode = determine_mode(&opts);

    // a positional plan that does not exist is fatal before anything runs
    let plan_file = match &opts.plan_file {
        Some(path) => {
            if !path.exists() {
                bail!("plan file not found: {}", path.display());
            }
            Some(std::fs::canonicalize(path).context("resolve plan path")?)
        }
        None => None,
    };

    let initial_state = determine_initial_state(&opts, mode);
    let plans = if initial_state == UiState::SelectPlan {
        plan::list_plans(&cfg.plans_dir).unwrap_or_default()
    } else {
        Vec::new()
    };
    let model = UiModel::new(initial_state, plans);
    let styles = Styles::new(&cfg.colors, opts.no_color);

    let (tx, rx) = mpsc::unbounded_channel();
    let sender = Arc::new(SafeSender::new(tx));

    let ctx = Arc::new(AppCtx {
        opts: Opts {
            plan_file: plan_file.clone(),
            ..opts
        },
        cfg,
        repo,
        sender: sender.clone(),
        cancel: cancel.clone(),
    });

    let logic = tokio::spawn(run_business_logic(ctx, mode));

    // the TUI owns the terminal until the user quits or the run is canceled
    let final_model = App::new(model, styles, rx, cancel.clone())
        .run()
        .await
        .context("TUI")?;

    let interrupted = cancel.is_cancelled();

    // late sends from the background task become no-ops, never blocks
    sender.stop();
    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(3), logic).await;

    if let Some(err) = final_model.error {
        bail!("execution: {err}");
    }
    if interrupted {
        bail!("interrupted");
    }
    Ok(())
}

/// Runs the main flow on a background task, reporting the outcome to the UI.
async fn run_business_logic(ctx: Arc<AppCtx>, mode: Mode) {
    let result = business_inner(&ctx, mode).await;
    let error = match result {
        Ok(()) => None,
        Err(err) => Some(format!("{err:#}")),
    };
    ctx.sender.send(UiMsg::ExecutionDone { error });
}

async fn business_inner(ctx: &AppCtx, mode: Mode) -> Result<()> {
    let collector = Arc::new(TuiCollector::new(ctx.sender.clone(), ctx.cancel.clone()));

    ensure_repo_has_commits(ctx, collector.as_ref()).await?;

    if mode == Mode::Plan {
        let description = ctx.opts.plan.clone().unwrap_or_default();
        return run_plan_mode(ctx, description, collector).await;
    }

    let plan_file = match &ctx.opts.plan_file {
        Some(path) => Some(path.clone()),
        None if ctx.opts.review || ctx.opts.codex_only => None,
        None => match wait_for_plan_selection(ctx).await? {
            PlanSelection::Selected(path) => {
                Some(std::fs::canonicalize(&path).context("resolve plan path")?)
            }
            PlanSelection::Created(description) => {
                return run_plan_mode(ctx, description, collector).await;
            }
            PlanSelection::Canceled => bail!("user canceled"),
            PlanSelection::NoPlans => bail!("no plans found"),
        },
    };

    if let Some(plan_file) = &plan_file {
        if mode == Mode::Full {
            create_branch_if_needed(ctx, plan_file)?;
        }
        ensure_gitignore(ctx)?;
    }

    execute_plan(ctx, plan_file, mode, collector).await
}

/// Blocks until the user picks a plan in the TUI.
async fn wait_for_plan_selection(ctx: &AppCtx) -> Result<PlanSelection> {
    let (result_tx, result_rx) = oneshot::channel();
    ctx.sender.send(UiMsg::PlanSelectionRequest { result_tx });

    tokio::select! {
        _ = ctx.cancel.cancelled() => bail!("wait for plan selection: canceled"),
        result = result_rx => result.map_err(|_| anyhow!("plan selection canceled")),
    }
}

/// Checks that the repo has commits, prompting to create an initial one.
async fn ensure_repo_has_commits(ctx: &AppCtx, asker: &dyn InputCollector) -> Result<()> {
    if ctx.repo.has_commits().context("check commits")? {
        return Ok(());
    }

    ctx.sender.send(UiMsg::Output("repository has no commits".into()));
    ctx.sender.send(UiMsg::Output(
        "ralphex needs at least one commit to create feature branches.".into(),
    ));

    let yes = asker
        .ask_yes_no("create initial commit?")
        .await
        .context("create initial commit")?;
    if !yes {
        bail!("no commits - please create initial commit manually");
    }

    ctx.repo
        .create_initial_commit("initial commit")
        .context("create initial commit")?;
    ctx.sender.send(UiMsg::Output("created initial commit".into()));
    Ok(())
}

/// Runs the main execution loop, logging through the TUI (and the dashboard
/// when `--serve` is on).
async fn execute_plan(
    ctx: &AppCtx,
    plan_file: Option<PathBuf>,
    mode: Mode,
    collector: Arc<TuiCollector>,
) -> Result<()> {
    let branch = current_branch_or_unknown(&ctx.repo);

    let tui_log = Arc::new(
        TuiLogger::new(
            &ProgressConfig {
                plan_file: plan_file.clone(),
                plan_description: String::new(),
                mode,
                branch: branch.clone(),
            },
            ctx.sender.clone(),
        )
        .context("create progress log")?,
    );

    ctx.sender.send(UiMsg::StartupInfo {
        plan: plan_display(plan_file.as_deref()),
        branch: branch.clone(),
    });

    let log: Arc<dyn Logger> = if ctx.opts.serve {
        start_dashboard(ctx, tui_log.clone()).await?
    } else {
        tui_log.clone()
    };

    log.print(&format!(
        "starting ralphex loop: {} (max {} iterations)",
        plan_display(plan_file.as_deref()),
        ctx.opts.max_iterations
    ));
    log.print(&format!("branch: {branch}"));
    log.print(&format!("progress log: {}", log.path().display()));

    let result = build_runner(ctx, plan_file.clone(), mode, branch, log.clone(), &collector)
        .run(&ctx.cancel)
        .await;

    if result.is_ok() {
        if mode == Mode::Full {
            if let Some(plan_file) = &plan_file {
                if let Err(err) = move_plan_to_completed(ctx, plan_file) {
                    ctx.sender.send(UiMsg::Output(format!(
                        "warning: failed to move plan to completed: {err:#}"
                    )));
                }
            }
        }
        log.print(&format!("completed in {}", log.elapsed()));
    }

    if let Err(err) = log.close() {
        ctx.sender
            .send(UiMsg::Output(format!("warning: failed to close progress log: {err}")));
    }

    result.context("runner")?;

    // keep the dashboard up after execution completes
    if ctx.opts.serve {
        ctx.sender.send(UiMsg::Output(format!(
            "web dashboard still running at http://localhost:{} (press Ctrl+C to exit)",
            ctx.opts.port
        )));
        ctx.cancel.cancelled().await;
    }
    Ok(())
}

fn build_runner(
    ctx: &AppCtx,
    plan_file: Option<PathBuf>,
    mode: Mode,
    branch: String,
    log: Arc<dyn Logger>,
    collector: &Arc<TuiCollector>,
) -> Runner {
    // --codex-only forces the codex phase regardless of config
    let codex_enabled = ctx.cfg.codex_enabled || mode == Mode::CodexOnly;
    let runner_cfg = RunnerConfig {
        plan_file,
        plan_description: ctx.opts.plan.clone().unwrap_or_default(),
        mode,
        branch,
        max_iterations: ctx.opts.max_iterations,
        task_retry_count: ctx.cfg.task_retry_count,
        iteration_delay_ms: ctx.cfg.iteration_delay_ms,
        codex_enabled,
    };

    let prompts = Prompts::load(&config::default_config_dir());
    let assistant = Arc::new(CommandExecutor::new(&ctx.cfg.claude_command));
    let reviewer = Arc::new(CommandExecutor::new(&ctx.cfg.codex_command));

    let mut runner = Runner::new(runner_cfg, log, prompts, assistant, reviewer);
    runner.set_input_collector(collector.clone());
    runner
}

/// Interactive plan creation, optionally flowing into full-mode execution of
/// the plan it produced.
async fn run_plan_mode(
    ctx: &AppCtx,
    description: String,
    collector: Arc<TuiCollector>,
) -> Result<()> {
    ensure_gitignore(ctx)?;
    let branch = current_branch_or_unknown(&ctx.repo);

    let tui_log = Arc::new(
        TuiLogger::new(
            &ProgressConfig {
                plan_file: None,
                plan_description: description.clone(),
                mode: Mode::Plan,
                branch: branch.clone(),
            },
            ctx.sender.clone(),
        )
        .context("create progress log")?,
    );

    ctx.sender.send(UiMsg::StartupInfo {
        plan: String::new(),
        branch: branch.clone(),
    });

    tui_log.print("starting interactive plan creation");
    tui_log.print(&format!("request: {description}"));
    tui_log.print(&format!(
        "branch: {branch} (max {} iterations)",
        ctx.opts.max_iterations
    ));
    tui_log.print(&format!("progress log: {}", tui_log.path().display()));

    let started = SystemTime::now();

    let plan_ctx = ctx_with_description(ctx, &description);
    let runner = build_runner(
        &plan_ctx,
        None,
        Mode::Plan,
        branch,
        tui_log.clone() as Arc<dyn Logger>,
        &collector,
    );
    let result = runner.run(&ctx.cancel).await;

    if let Err(err) = result {
        let _ = tui_log.close();
        return Err(err).context("plan creation");
    }

    let plan_file = plan::find_recent_plan(&ctx.cfg.plans_dir, started);
    let elapsed = tui_log.elapsed();
    match &plan_file {
        Some(path) => tui_log.print(&format!(
            "plan creation completed in {elapsed}, created {}",
            path.display()
        )),
        None => tui_log.print(&format!("plan creation completed in {elapsed}")),
    }

    let Some(plan_file) = plan_file else {
        let _ = tui_log.close();
        return Ok(());
    };

    let answer = collector
        .ask_question(
            "Continue with plan implementation?",
            &["Yes, execute plan".to_string(), "No, exit".to_string()],
        )
        .await;
    let proceed = match answer {
        Ok(answer) => answer.starts_with("Yes"),
        Err(err) => {
            if !ctx.cancel.is_cancelled() {
                ctx.sender
                    .send(UiMsg::Output(format!("warning: input error: {err}")));
            }
            false
        }
    };
    if !proceed {
        let _ = tui_log.close();
        return Ok(());
    }

    tui_log.print("continuing with plan implementation...");
    if let Err(err) = tui_log.close() {
        ctx.sender
            .send(UiMsg::Output(format!("warning: failed to close progress log: {err}")));
    }

    let plan_file = std::fs::canonicalize(&plan_file).context("resolve plan path")?;
    create_branch_if_needed(ctx, &plan_file)?;
    execute_plan(ctx, Some(plan_file), Mode::Full, collector).await
}

/// Clone of the context with the plan description set (plan mode prompts
/// substitute it).
fn ctx_with_description(ctx: &AppCtx, description: &str) -> AppCtx {
    AppCtx {
        opts: Opts {
            plan: Some(description.to_string()),
            ..ctx.opts.clone()
        },
        cfg: ctx.cfg.clone(),
        repo: ctx.repo.clone(),
        sender: ctx.sender.clone(),
        cancel: ctx.cancel.clone(),
    }
}

/// Wires the broadcast logger, session registry, optional watcher and the
/// HTTP server for `--serve` during execution.
async fn start_dashboard(ctx: &AppCtx, tui_log: Arc<TuiLogger>) -> Result<Arc<dyn Logger>> {
    let session = Arc::new(Session::new("main", tui_log.path()));
    let registry = Arc::new(SessionRegistry::new());
    registry.register(session.clone());

    let broadcast = Arc::new(BroadcastLogger::new(
        tui_log as Arc<dyn Logger>,
        session,
    ));

    let dirs = resolve_watch_dirs(&ctx.opts.watch, &ctx.cfg.watch_dirs);
    if !dirs.is_empty() {
        let watcher = Watcher::new(dirs, registry.clone());
        let sender = ctx.sender.clone();
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = watcher.start(cancel).await {
                sender.send(UiMsg::Output(format!("warning: watcher error: {err}")));
            }
        });
    }

    let err_rx = start_server_async(registry, ctx.opts.port, ctx.cancel.clone()).await?;

    // late server errors are warnings, not fatal; the dashboard is
    // supplementary to the run
    let sender = ctx.sender.clone();
    tokio::spawn(async move {
        if let Ok(Err(err)) = err_rx.await {
            sender.send(UiMsg::Output(format!(
                "warning: web server error during execution: {err}"
            )));
        }
    });

    ctx.sender.send(UiMsg::Output(format!(
        "web dashboard: http://localhost:{}",
        ctx.opts.port
    )));
    Ok(broadcast)
}

type ServeResult = Result<(), ralphex_web::server::ServerError>;

/// Starts the server in the background and waits briefly for startup errors;
/// silence within the window means the server is up.
async fn start_server_async(
    registry: Arc<SessionRegistry>,
    port: u16,
    cancel: CancellationToken,
) -> Result<oneshot::Receiver<ServeResult>> {
    let (err_tx, mut err_rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = err_tx.send(serve(registry, port, cancel).await);
    });

    match tokio::time::timeout(SERVER_STARTUP, &mut err_rx).await {
        Ok(Ok(Err(err))) => bail!("web server failed to start on port {port}: {err}"),
        Ok(_) => {}
        Err(_) => debug!(port, "server startup window passed without error"),
    }
    Ok(err_rx)
}

/// Watch-only mode: dashboard plus watcher, no plan execution, no TUI.
async fn run_watch_only(opts: &Opts, cfg: &Config, cancel: CancellationToken) -> Result<()> {
    let dirs = resolve_watch_dirs(&opts.watch, &cfg.watch_dirs);
    if dirs.is_empty() {
        bail!("no watch directories configured");
    }

    let registry = Arc::new(SessionRegistry::new());
    let watcher = Watcher::new(dirs.clone(), registry.clone());
    let watch_cancel = cancel.clone();
    let mut watch_task = tokio::spawn(async move { watcher.start(watch_cancel).await });

    let mut err_rx = start_server_async(registry, opts.port, cancel.clone()).await?;

    println!("watch-only mode: monitoring {} directories", dirs.len());
    for dir in &dirs {
        println!("  {}", dir.display());
    }
    println!("web dashboard: http://localhost:{}", opts.port);
    println!("press Ctrl+C to exit");

    tokio::select! {
        _ = cancel.cancelled() => {}
        result = &mut err_rx => {
            if let Ok(Err(err)) = result {
                if !cancel.is_cancelled() {
                    eprintln!("web server error: {err}");
                }
            }
        }
        result = &mut watch_task => {
            if let Ok(Err(err)) = result {
                if !cancel.is_cancelled() {
                    eprintln!("file watcher error: {err}");
                }
            }
        }
    }
    Ok(())
}

/// Creates or switches to the plan's branch when starting from main/master.
fn create_branch_if_needed(ctx: &AppCtx, plan_file: &Path) -> Result<()> {
    let current = ctx.repo.current_branch().context("get current branch")?;
    if current != "main" && current != "master" {
        return Ok(()); // already on a feature branch
    }

    let branch = plan::branch_name(plan_file);

    if ctx
        .repo
        .has_changes_other_than(plan_file)
        .context("check uncommitted files")?
    {
        bail!(
            "cannot create branch {branch:?}: worktree has uncommitted changes\n\n\
             ralphex needs to create a feature branch from {current} to isolate plan work.\n\n\
             options:\n\
             \x20 git stash && ralphex {plan} && git stash pop   # stash changes temporarily\n\
             \x20 git commit -am \"wip\"                       # commit changes first\n\
             \x20 ralphex --review                           # skip branch creation (review-only mode)",
            plan = plan_file.display()
        );
    }

    let plan_dirty = ctx
        .repo
        .file_has_changes(plan_file)
        .context("check plan file status")?;

    if ctx.repo.branch_exists(&branch) {
        ctx.sender
            .send(UiMsg::Output(format!("switching to existing branch: {branch}")));
        ctx.repo
            .checkout_branch(&branch)
            .with_context(|| format!("checkout branch {branch}"))?;
    } else {
        ctx.sender.send(UiMsg::Output(format!("creating branch: {branch}")));
        ctx.repo
            .create_branch(&branch)
            .with_context(|| format!("create branch {branch}"))?;
    }

    // the plan file alone being dirty is fine: commit it on the new branch
    if plan_dirty {
        ctx.sender.send(UiMsg::Output(format!(
            "committing plan file: {}",
            plan_file.file_name().unwrap_or_default().to_string_lossy()
        )));
        ctx.repo.add(plan_file).context("stage plan file")?;
        ctx.repo
            .commit(&format!("add plan: {branch}"))
            .context("commit plan file")?;
    }

    Ok(())
}

/// Archives a completed plan under `completed/` and commits the move.
fn move_plan_to_completed(ctx: &AppCtx, plan_file: &Path) -> Result<()> {
    let completed_dir = plan_file
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("completed");
    std::fs::create_dir_all(&completed_dir).context("create completed dir")?;

    let dest = completed_dir.join(plan_file.file_name().unwrap_or_default());

    if ctx.repo.move_file(plan_file, &dest).is_err() {
        // untracked plan: plain rename, then stage the new location
        std::fs::rename(plan_file, &dest).context("move plan")?;
        if let Err(err) = ctx.repo.add(&dest) {
            ctx.sender
                .send(UiMsg::Output(format!("warning: failed to stage moved plan: {err}")));
        }
    }

    let name = plan_file.file_name().unwrap_or_default().to_string_lossy();
    ctx.repo
        .commit(&format!("move completed plan: {name}"))
        .context("commit plan move")?;

    ctx.sender
        .send(UiMsg::Output(format!("moved plan to {}", dest.display())));
    Ok(())
}

/// Appends the progress-file pattern to `.gitignore` once.
fn ensure_gitignore(ctx: &AppCtx) -> Result<()> {
    if ctx.repo.is_ignored("progress-test.txt").unwrap_or(false) {
        return Ok(());
    }

    let path = ctx.repo.root().join(".gitignore");
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .context("open .gitignore")?;
    file.write_all(b"\n# ralphex progress logs\nprogress*.txt\n")
        .context("write .gitignore")?;

    ctx.sender
        .send(UiMsg::Output("added progress*.txt to .gitignore".into()));
    Ok(())
}

fn current_branch_or_unknown(repo: &Repo) -> String {
    match repo.current_branch() {
        Ok(branch) if !branch.is_empty() => branch,
        _ => "unknown".to_string(),
    }
}

fn plan_display(plan_file: Option<&Path>) -> String {
    match plan_file {
        Some(path) => path.display().to_string(),
        None => "(no plan - review only)".to_string(),
    }
}

/// Mode precedence: --plan > --codex-only > --review > full.
fn determine_mode(opts: &Opts) -> Mode {
    if opts.plan.is_some() {
        Mode::Plan
    } else if opts.codex_only {
        Mode::CodexOnly
    } else if opts.review {
        Mode::Review
    } else {
        Mode::Full
    }
}

/// Watch-only: --serve, no plan to execute, and watch dirs from CLI or
/// config.
fn is_watch_only(opts: &Opts, config_watch_dirs: &[PathBuf]) -> bool {
    opts.serve
        && opts.plan_file.is_none()
        && opts.plan.is_none()
        && (!opts.watch.is_empty() || !config_watch_dirs.is_empty())
}

/// Whether --reset was the only meaningful flag, so reset-then-exit applies.
fn is_reset_only(opts: &Opts) -> bool {
    opts.plan_file.is_none()
        && !opts.review
        && !opts.codex_only
        && !opts.serve
        && opts.plan.is_none()
        && opts.watch.is_empty()
}

fn determine_initial_state(opts: &Opts, mode: Mode) -> UiState {
    if mode == Mode::Plan || opts.plan_file.is_some() || opts.review || opts.codex_only {
        // the run starts immediately; no plan selection needed
        UiState::Executing
    } else {
        UiState::SelectPlan
    }
}
