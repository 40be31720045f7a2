//! Input collector bridging the runner to the UI question overlay.

use crate::messages::UiMsg;
use crate::sender::SafeSender;
use async_trait::async_trait;
use ralphex_core::{AskError, InputCollector};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Sends questions to the UI and blocks until the user selects an answer or
/// the run is canceled.
///
/// Each question carries its own one-shot answer channel, so an answer to an
/// earlier, canceled question can never satisfy a later one. If the UI quits
/// during the prompt (or has already exited, making the send a no-op) the
/// channel closes and the call fails with "question canceled".
pub struct TuiCollector {
    sender: Arc<SafeSender>,
    cancel: CancellationToken,
}

impl TuiCollector {
    pub fn new(sender: Arc<SafeSender>, cancel: CancellationToken) -> Self {
        Self { sender, cancel }
    }
}

#[async_trait]
impl InputCollector for TuiCollector {
    async fn ask_question(&self, question: &str, options: &[String]) -> Result<String, AskError> {
        if options.is_empty() {
            return Err(AskError::NoOptions);
        }

        let (answer_tx, answer_rx) = oneshot::channel();
        self.sender.send(UiMsg::Question {
            question: question.to_string(),
            options: options.to_vec(),
            answer_tx,
        });

        tokio::select! {
            _ = self.cancel.cancelled() => Err(AskError::Canceled),
            answer = answer_rx => answer.map_err(|_| AskError::Closed),
        }
    }
}
