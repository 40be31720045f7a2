//! Input-collector seam for interactive question/answer flow.

use async_trait::async_trait;

/// Failure modes when asking the user a question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AskError {
    #[error("no options provided")]
    NoOptions,
    /// The run was canceled while waiting for an answer.
    #[error("ask question: canceled")]
    Canceled,
    /// The UI closed the answer channel (user quit during the prompt).
    #[error("question canceled")]
    Closed,
}

/// Suspends the caller while the user answers a prompt.
#[async_trait]
pub trait InputCollector: Send + Sync {
    /// Presents a question with selectable options and blocks until the user
    /// picks one or the run is canceled. Returns the chosen option string.
    async fn ask_question(&self, question: &str, options: &[String]) -> Result<String, AskError>;

    /// Presents a yes/no question; true means "Yes".
    async fn ask_yes_no(&self, question: &str) -> Result<bool, AskError> {
        let answer = self
            .ask_question(question, &["Yes".to_string(), "No".to_string()])
            .await?;
        Ok(answer == "Yes")
    }
}
