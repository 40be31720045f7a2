//! Guarded message-send endpoint for the UI channel.

use crate::messages::UiMsg;
use std::sync::RwLock;
use tokio::sync::mpsc;

/// Wraps the UI channel sender and becomes a no-op after `stop`.
///
/// Background producers keep logging after the user quits the UI; without
/// the guard those sends would land in a channel nobody drains (or, with a
/// blocking sender, deadlock). Sends hold the read lock, so `stop` waits for
/// in-flight sends to complete before flipping the flag: a send concurrent
/// with stop either completes fully or is fully dropped.
pub struct SafeSender {
    tx: mpsc::UnboundedSender<UiMsg>,
    stopped: RwLock<bool>,
}

impl SafeSender {
    pub fn new(tx: mpsc::UnboundedSender<UiMsg>) -> Self {
        Self {
            tx,
            stopped: RwLock::new(false),
        }
    }

    /// Sends a message unless the sender has been stopped.
    pub fn send(&self, msg: UiMsg) {
        let stopped = self.stopped.read().unwrap();
        if *stopped {
            return;
        }
        let _ = self.tx.send(msg);
    }

    /// Marks the sender stopped. Safe to call multiple times.
    pub fn stop(&self) {
        *self.stopped.write().unwrap() = true;
    }
}
