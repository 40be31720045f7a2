//! # ralphex-tui
//!
//! Terminal user interface for the ralphex driver.
//!
//! Built with `ratatui` and `crossterm`. The UI runs a single cooperative
//! event loop: all state mutation happens there, fed by keyboard events and
//! by `UiMsg` messages from the rest of the system. Producers send through a
//! `SafeSender`, which turns into a no-op once the event loop exits so a late
//! send can never block a background task.

pub mod app;
pub mod collector;
pub mod logger;
pub mod messages;
pub mod model;
pub mod sender;
pub mod widgets;

pub use app::App;
pub use collector::TuiCollector;
pub use logger::TuiLogger;
pub use messages::{PlanSelection, UiMsg};
pub use model::{UiModel, UiState};
pub use sender::SafeSender;
pub use widgets::Styles;
