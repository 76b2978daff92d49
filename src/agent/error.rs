use thiserror::Error;

/// Failures that end a user turn.
///
/// Tool problems never show up here: the executor folds them into error
/// results that the model sees on the next round.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    /// The completion endpoint failed, closed early, or missed its deadline.
    #[error("completion stream failed: {0}")]
    StreamFailure(String),

    #[error("no provider configured: {0}")]
    ConfigurationMissing(String),

    #[error("gave up after {0} model requests without a final answer")]
    MaxIterationsExceeded(usize),

    /// A turn is already running on this session.
    #[error("still working on the previous message")]
    Busy,

    #[error("message is empty")]
    EmptyMessage,
}
