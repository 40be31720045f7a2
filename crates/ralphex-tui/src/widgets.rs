//! Rendering: pure functions over the model.

use crate::model::{UiModel, UiState};
use ralphex_core::config::ColorConfig;
use ralphex_proto::Phase;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

/// Terminal palette, resolved from the color config once at startup.
#[derive(Debug, Clone)]
pub struct Styles {
    pub task: Style,
    pub review: Style,
    pub codex: Style,
    pub warn: Style,
    pub error: Style,
    pub info: Style,
    pub timestamp: Style,
    pub hotkey: Style,
}

impl Styles {
    /// Builds styles from validated color config; `no_color` keeps terminal
    /// defaults everywhere.
    pub fn new(colors: &ColorConfig, no_color: bool) -> Self {
        if no_color {
            return Self {
                task: Style::default(),
                review: Style::default(),
                codex: Style::default(),
                warn: Style::default(),
                error: Style::default(),
                info: Style::default(),
                timestamp: Style::default(),
                hotkey: Style::default().add_modifier(Modifier::BOLD),
            };
        }
        Self {
            task: rgb_style(&colors.task),
            review: rgb_style(&colors.review),
            codex: rgb_style(&colors.codex),
            warn: rgb_style(&colors.warn),
            error: rgb_style(&colors.error),
            info: rgb_style(&colors.info),
            timestamp: rgb_style(&colors.timestamp),
            hotkey: Style::default().add_modifier(Modifier::BOLD),
        }
    }

    fn phase(&self, phase: Phase) -> Style {
        match phase {
            Phase::Task => self.task,
            Phase::Review => self.review,
            Phase::Codex => self.codex,
        }
    }
}

fn rgb_style(value: &str) -> Style {
    // colors were validated at startup; fall back to default on the off chance
    match ColorConfig::parse_rgb(value) {
        Some((r, g, b)) => Style::default().fg(Color::Rgb(r, g, b)),
        None => Style::default(),
    }
}

/// Renders the whole frame.
pub fn render(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, model, styles, chunks[0]);
    match model.state {
        UiState::Executing | UiState::Done => render_viewport(frame, model, chunks[1]),
        UiState::SelectPlan => render_plan_select(frame, model, styles, chunks[1]),
        UiState::CreatePlan => render_plan_create(frame, model, styles, chunks[1]),
        UiState::Question => {
            render_viewport(frame, model, chunks[1]);
            render_question_overlay(frame, model, styles, chunks[1]);
        }
    }
    render_status(frame, model, styles, chunks[2]);
    render_hotkeys(frame, model, styles, chunks[3]);
}

fn render_header(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles, area: Rect) {
    let mut spans = vec![Span::styled("ralphex", styles.info.add_modifier(Modifier::BOLD))];
    if !model.plan_name.is_empty() {
        spans.push(Span::raw(format!("  {}", model.plan_name)));
    }
    if !model.branch.is_empty() {
        spans.push(Span::styled(format!("  [{}]", model.branch), styles.timestamp));
    }
    spans.push(Span::styled(
        format!("  {}", model.phase),
        styles.phase(model.phase),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_viewport(frame: &mut Frame<'_>, model: &UiModel, area: Rect) {
    let height = area.height as usize;
    let start = model.scroll.min(model.output.len());
    let end = (start + height).min(model.output.len());
    let text: Vec<Line<'_>> = model.output[start..end]
        .iter()
        .map(|line| Line::raw(line.as_str()))
        .collect();
    frame.render_widget(Paragraph::new(text), area);
}

fn render_plan_select(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles, area: Rect) {
    if model.plans.is_empty() {
        let lines = vec![
            Line::styled("Plan Selection", styles.info.add_modifier(Modifier::BOLD)),
            Line::styled("No plans found", styles.warn),
            Line::raw(""),
            Line::raw("press n to create a new plan, or q to quit"),
        ];
        let block = Block::default().borders(Borders::ALL).title("ralphex");
        frame.render_widget(Paragraph::new(lines).block(block), area);
        return;
    }

    let mut lines = Vec::new();
    if model.filtering || !model.filter.is_empty() {
        lines.push(Line::styled(format!("filter: {}", model.filter), styles.info));
    }
    for (idx, plan) in model.filtered_plans().iter().enumerate() {
        let name = plan
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if idx == model.plan_cursor {
            lines.push(Line::styled(format!("> {name}"), styles.task));
        } else {
            lines.push(Line::raw(format!("  {name}")));
        }
    }
    let block = Block::default().borders(Borders::ALL).title("select a plan");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_plan_create(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles, area: Rect) {
    let mut lines: Vec<Line<'_>> = vec![Line::styled(
        "Describe the plan to create:",
        styles.info.add_modifier(Modifier::BOLD),
    )];
    for line in model.draft.split('\n') {
        lines.push(Line::raw(line));
    }
    let block = Block::default().borders(Borders::ALL).title("new plan");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_question_overlay(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles, area: Rect) {
    let height = (model.options.len() as u16 + 4).min(area.height);
    let width = area.width.saturating_sub(6).max(20);
    let overlay = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let mut lines = vec![Line::styled(model.question.as_str(), styles.info)];
    lines.push(Line::raw(""));
    for (idx, option) in model.options.iter().enumerate() {
        let text = format!(
            "{} {}) {option}",
            if idx == model.question_cursor { ">" } else { " " },
            idx + 1
        );
        if idx == model.question_cursor {
            lines.push(Line::styled(text, styles.task));
        } else {
            lines.push(Line::raw(text));
        }
    }

    frame.render_widget(Clear, overlay);
    let block = Block::default().borders(Borders::ALL).title("Question");
    frame.render_widget(Paragraph::new(lines).block(block), overlay);
}

fn render_status(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles, area: Rect) {
    let elapsed = model.elapsed_secs();
    let mut spans = vec![Span::styled(
        format!("{}m{:02}s", elapsed / 60, elapsed % 60),
        styles.timestamp,
    )];
    if matches!(model.state, UiState::Executing | UiState::Question) {
        spans.push(Span::raw(if model.auto_scroll {
            "  following"
        } else {
            "  scrolling (End to follow)"
        }));
    }
    if let Some(error) = &model.error {
        spans.push(Span::styled(format!("  error: {error}"), styles.error));
    } else if matches!(model.state, UiState::Done) {
        spans.push(Span::raw("  completed"));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_hotkeys(frame: &mut Frame<'_>, model: &UiModel, styles: &Styles, area: Rect) {
    let hint = match model.state {
        UiState::SelectPlan => "enter select · / filter · n new plan · q quit",
        UiState::CreatePlan => "ctrl-d submit · esc cancel",
        UiState::Executing => "j/k scroll · q quit",
        UiState::Question => "j/k move · enter answer · ctrl-c quit",
        UiState::Done => "any key to exit",
    };
    frame.render_widget(Paragraph::new(Span::styled(hint, styles.hotkey)), area);
}
