use std::fmt;

use crate::tools::ToolCall;

/// Where a running turn is. `AwaitingUser` is implicit: it is any time the
/// session's `processing` flag is clear.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    /// Asking the model; the counter is the 1-based round number.
    Requesting(usize),
    ToolDispatch(Vec<ToolCall>),
    Done,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Requesting(round) => write!(f, "requesting (round {round})"),
            LoopState::ToolDispatch(calls) => write!(f, "dispatching {} tool call(s)", calls.len()),
            LoopState::Done => f.write_str("done"),
        }
    }
}
