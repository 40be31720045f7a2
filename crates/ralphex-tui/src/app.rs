//! The UI event loop.

use crate::model::{Action, UiModel};
use crate::messages::UiMsg;
use crate::widgets::{render, Styles};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use scopeguard::defer;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Single-threaded cooperative event loop: drains messages, polls the
/// keyboard, renders on a 100 ms tick. All model mutation happens here.
pub struct App {
    model: UiModel,
    styles: Styles,
    rx: mpsc::UnboundedReceiver<UiMsg>,
    cancel: CancellationToken,
}

impl App {
    pub fn new(
        model: UiModel,
        styles: Styles,
        rx: mpsc::UnboundedReceiver<UiMsg>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            model,
            styles,
            rx,
            cancel,
        }
    }

    /// Runs until the user quits or the run is canceled. Returns the final
    /// model so the caller can read the execution error.
    pub async fn run(mut self) -> Result<UiModel> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // terminal restoration must run on every exit path, panics included
        defer! {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }

        let mut tick = interval(Duration::from_millis(100));

        'outer: loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break 'outer,
                msg = self.rx.recv() => {
                    if let Some(msg) = msg {
                        self.model.apply(msg);
                        // drain whatever else is queued before redrawing
                        while let Ok(msg) = self.rx.try_recv() {
                            self.model.apply(msg);
                        }
                    }
                }
                _ = tick.tick() => {
                    let size = terminal.size()?;
                    // header, status and hotkey rows flank the body
                    self.model.viewport_height = size.height.saturating_sub(3) as usize;

                    terminal.draw(|frame| render(frame, &self.model, &self.styles))?;

                    while event::poll(Duration::ZERO)? {
                        if let Event::Key(key) = event::read()? {
                            if key.kind != KeyEventKind::Press {
                                continue;
                            }
                            if let Some(Action::Quit) = self.model.handle_key(key) {
                                break 'outer;
                            }
                        }
                    }
                }
            }
        }

        debug!("ui event loop exited");
        Ok(self.model)
    }
}
