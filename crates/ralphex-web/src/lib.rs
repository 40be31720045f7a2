//! # ralphex-web
//!
//! Live-session mirror of a ralphex run:
//! - `Session`: single-publisher fan-out with bounded history replay
//! - `SessionRegistry`: one session per observed progress file
//! - `BroadcastLogger`: logger decorator publishing every event to a session
//! - `Watcher`: discovers and tails sibling progress files
//! - the axum HTTP/SSE server feeding browser clients

pub mod broadcast;
pub mod registry;
pub mod replay;
pub mod server;
pub mod session;
pub mod watcher;

pub use broadcast::BroadcastLogger;
pub use registry::{SessionInfo, SessionRegistry};
pub use server::serve;
pub use session::Session;
pub use watcher::{resolve_watch_dirs, Watcher};
