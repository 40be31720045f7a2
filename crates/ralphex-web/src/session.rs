//! In-memory broadcast of events tied to one progress file.

use chrono::{DateTime, Local};
use ralphex_proto::StreamEvent;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Maximum events retained for history replay.
pub const HISTORY_CAP: usize = 10_000;

/// Per-subscriber channel capacity. Must exceed the history cap so a fresh
/// subscriber can absorb a full replay without being dropped as slow.
const SUBSCRIBER_BUFFER: usize = HISTORY_CAP + 2048;

#[derive(Default)]
struct SessionInner {
    history: VecDeque<StreamEvent>,
    subscribers: Vec<mpsc::Sender<StreamEvent>>,
    last_event_at: Option<DateTime<Local>>,
    completed: bool,
    closed: bool,
}

/// Single-publisher, multi-subscriber fan-out with bounded history.
///
/// Delivery is non-blocking: a subscriber whose channel fills up is dropped
/// (its channel closes) rather than stalling the publisher.
pub struct Session {
    id: String,
    source_path: PathBuf,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(id: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source_path: source_path.into(),
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Appends the event to history (evicting the oldest past the cap) and
    /// delivers it to every live subscriber.
    pub fn publish(&self, event: StreamEvent) {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return;
        }

        if matches!(event, StreamEvent::Done) {
            inner.completed = true;
        }
        inner.last_event_at = Some(Local::now());

        inner.history.push_back(event.clone());
        if inner.history.len() > HISTORY_CAP {
            inner.history.pop_front();
        }

        inner.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            // full: the subscriber cannot keep up, drop it
            Err(TrySendError::Full(_) | TrySendError::Closed(_)) => false,
        });
    }

    /// Returns a channel that first receives the entire current history, then
    /// every subsequent event until unsubscribed or the session closes.
    pub fn subscribe(&self) -> mpsc::Receiver<StreamEvent> {
        let mut inner = self.inner.lock().unwrap();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        for event in &inner.history {
            // capacity exceeds history, so replay cannot fill the channel
            let _ = tx.try_send(event.clone());
        }
        if !inner.closed {
            inner.subscribers.push(tx);
        }
        rx
    }

    /// Closes all subscriber channels; later publishes are discarded.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.subscribers.clear();
    }

    /// Timestamp of the most recent event.
    pub fn last_event_at(&self) -> Option<DateTime<Local>> {
        self.inner.lock().unwrap().last_event_at
    }

    /// Whether a `done` event was observed.
    pub fn completed(&self) -> bool {
        self.inner.lock().unwrap().completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> StreamEvent {
        StreamEvent::Line { text: text.to_string() }
    }

    #[tokio::test]
    async fn test_subscribe_replays_history_then_live() {
        let session = Session::new("test", "/tmp/progress-test.txt");
        session.publish(line("first"));
        session.publish(line("second"));

        let mut rx = session.subscribe();
        assert_eq!(rx.recv().await, Some(line("first")));
        assert_eq!(rx.recv().await, Some(line("second")));

        session.publish(line("third"));
        assert_eq!(rx.recv().await, Some(line("third")));
    }

    #[tokio::test]
    async fn test_publish_then_subscribe_sees_event_in_history() {
        let session = Session::new("test", "/tmp/p.txt");
        session.publish(line("early"));
        let mut rx = session.subscribe();
        assert_eq!(rx.recv().await, Some(line("early")));
    }

    #[tokio::test]
    async fn test_history_evicts_oldest_beyond_cap() {
        let session = Session::new("test", "/tmp/p.txt");
        for i in 0..(HISTORY_CAP + 1) {
            session.publish(line(&i.to_string()));
        }

        let mut rx = session.subscribe();
        // line "0" was evicted; replay starts at "1"
        assert_eq!(rx.recv().await, Some(line("1")));
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last, Some(line(&HISTORY_CAP.to_string())));
    }

    #[tokio::test]
    async fn test_close_ends_subscriber_streams() {
        let session = Session::new("test", "/tmp/p.txt");
        let mut rx = session.subscribe();
        session.close();
        assert_eq!(rx.recv().await, None);

        // publish after close is discarded
        session.publish(line("late"));
        assert!(session.last_event_at().is_none());
    }

    #[tokio::test]
    async fn test_subscribe_after_close_gets_history_then_end() {
        let session = Session::new("test", "/tmp/p.txt");
        session.publish(line("kept"));
        session.close();

        let mut rx = session.subscribe();
        assert_eq!(rx.recv().await, Some(line("kept")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_done_marks_completed() {
        let session = Session::new("test", "/tmp/p.txt");
        assert!(!session.completed());
        session.publish(StreamEvent::Done);
        assert!(session.completed());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let session = Session::new("test", "/tmp/p.txt");
        let rx = session.subscribe();
        drop(rx);
        session.publish(line("one"));

        // a fresh subscriber still works
        let mut rx = session.subscribe();
        assert_eq!(rx.recv().await, Some(line("one")));
    }
}
