//! Session registry: one session per observed progress file.

use crate::session::Session;
use fs2::FileExt;
use ralphex_core::progress::is_locked_by_current_process;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Snapshot of one session for the dashboard listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub source_path: String,
    /// Timestamp of the most recent event, `YYYY-MM-DD HH:MM:SS`.
    pub last_event_at: Option<String>,
    /// Whether a `done` event was observed.
    pub completed: bool,
    /// Whether an advisory lock indicates a live writer.
    pub active: bool,
}

/// Maps session IDs to sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session. Idempotent per ID: when a session with the same
    /// ID already exists, the existing one wins and is returned, so late
    /// registrations rebind to it instead of splitting subscribers.
    pub fn register(&self, session: Arc<Session>) -> Arc<Session> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions
            .entry(session.id().to_string())
            .or_insert(session)
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(id).cloned()
    }

    /// Returns sorted snapshots of all sessions.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .map(|session| SessionInfo {
                id: session.id().to_string(),
                source_path: session.source_path().display().to_string(),
                last_event_at: session
                    .last_event_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
                completed: session.completed(),
                active: probe_locked(session.source_path()),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Closes every session and empties the registry.
    pub fn close_all(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        for session in sessions.values() {
            session.close();
        }
        sessions.clear();
    }
}

/// Derives a session ID from a progress-file path: `progress-x.txt` maps to
/// `x`, the bare `progress.txt` to `main`.
pub fn session_id_for_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = stem
        .strip_prefix("progress")
        .unwrap_or(&stem)
        .trim_matches('-');
    if id.is_empty() {
        "main".to_string()
    } else {
        id.to_string()
    }
}

/// Reports whether any process (this one included) holds the advisory lock.
///
/// An exclusive-lock probe that fails means a live writer exists. Platforms
/// without advisory locks report inactive rather than erroring.
pub fn probe_locked(path: &Path) -> bool {
    if is_locked_by_current_process(path) {
        return true;
    }
    let Ok(file) = File::open(path) else {
        return false;
    };
    match file.try_lock_exclusive() {
        Ok(()) => {
            let _ = fs2::FileExt::unlock(&file);
            false
        }
        Err(err) if err.kind() == ErrorKind::Unsupported => false,
        Err(_) => true,
    }
}
