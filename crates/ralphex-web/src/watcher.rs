//! Filesystem watcher: discovers and tails progress files.
//!
//! The watcher scans its directories for `progress*.txt` files, registers one
//! session per file, replays existing history and republishes appended lines
//! as they arrive. It never opens a writer: a file locked by a foreign
//! process is tailed read-only, and a file locked by this process is skipped
//! entirely (the live broadcast logger already feeds that session).

use crate::registry::{session_id_for_path, SessionRegistry};
use crate::replay::parse_line;
use crate::session::Session;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use ralphex_core::progress::is_locked_by_current_process;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Modification-coalescing window.
const DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("watcher init: {0}")]
    Init(#[from] notify::Error),
}

/// Resolution order for the watch directory set: CLI-provided directories
/// override configured directories, which override an empty default.
pub fn resolve_watch_dirs(cli: &[PathBuf], config: &[PathBuf]) -> Vec<PathBuf> {
    if !cli.is_empty() {
        cli.to_vec()
    } else {
        config.to_vec()
    }
}

/// Watches directories for progress files and feeds a session registry.
pub struct Watcher {
    dirs: Vec<PathBuf>,
    registry: Arc<SessionRegistry>,
    /// Per-file read offset, always at a line boundary.
    offsets: Mutex<HashMap<PathBuf, u64>>,
}

impl Watcher {
    pub fn new(dirs: Vec<PathBuf>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            dirs,
            registry,
            offsets: Mutex::new(HashMap::new()),
        }
    }

    /// Runs the watcher until cancellation: initial scan, then tailing on
    /// create/modify notifications, coalesced per path within a short window.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), WatchError> {
        for dir in &self.dirs {
            self.scan_dir(dir);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        for dir in &self.dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::Watch {
                    path: dir.clone(),
                    source,
                })?;
        }

        loop {
            let first = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => return Ok(()),
                },
            };

            let mut pending = HashSet::new();
            collect_paths(first, &mut pending);

            // coalesce further notifications for the same burst of writes
            let window = tokio::time::sleep(DEBOUNCE);
            tokio::pin!(window);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = &mut window => break,
                    event = rx.recv() => match event {
                        Some(event) => collect_paths(event, &mut pending),
                        None => break,
                    },
                }
            }

            for path in pending {
                self.tail(&path);
            }
        }
    }

    /// Registers and replays every matching file already in a directory.
    fn scan_dir(&self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "cannot scan watch directory");
                return;
            }
        };
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if is_progress_file(&path) {
                self.tail(&path);
            }
        }
    }

    /// Reads new complete lines from the per-path offset and publishes them
    /// to the file's session.
    fn tail(&self, path: &Path) {
        if is_locked_by_current_process(path) {
            // our own live run publishes through the broadcast logger
            return;
        }

        let session = self.registry.register(Arc::new(Session::new(
            session_id_for_path(path),
            path.to_path_buf(),
        )));

        let mut offsets = self.offsets.lock().unwrap();
        let offset = offsets.get(path).copied().unwrap_or(0);

        let Ok(mut file) = File::open(path) else {
            return;
        };
        let len = file.metadata().map(|m| m.len()).unwrap_or(0);
        // truncation: start over
        let offset = if len < offset { 0 } else { offset };

        if file.seek(SeekFrom::Start(offset)).is_err() {
            return;
        }
        let mut buf = String::new();
        if file.read_to_string(&mut buf).is_err() {
            return;
        }

        // only consume complete lines; a partial tail waits for its newline
        let consumed = buf.rfind('\n').map_or(0, |i| i + 1);
        for line in buf[..consumed].lines() {
            for event in parse_line(line) {
                session.publish(event);
            }
        }

        debug!(path = %path.display(), offset, consumed, "tailed progress file");
        offsets.insert(path.to_path_buf(), offset + consumed as u64);
    }
}

fn is_progress_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .is_some_and(|name| name.starts_with("progress") && name.ends_with(".txt"))
}

fn collect_paths(event: notify::Result<Event>, pending: &mut HashSet<PathBuf>) {
    match event {
        Ok(event) => {
            for path in event.paths {
                if is_progress_file(&path) {
                    pending.insert(path);
                }
            }
        }
        Err(err) => warn!(%err, "watch notification error"),
    }
}
