//! Result delivery for asynchronous stack tasks
//!
//! Every asynchronous task reports exactly one terminal value on a result
//! channel. The channel is unbounded so a producer never waits on a consumer,
//! and a consumer that went away only makes the send a no-op.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ManagerError;

/// Terminal value of one task
pub type TaskResult = Result<(), ManagerError>;

/// Producer side; cloned into every task sharing the channel
pub type ResultSender = mpsc::UnboundedSender<TaskResult>;

/// Consumer side
pub type ResultReceiver = mpsc::UnboundedReceiver<TaskResult>;

/// Creates a result channel
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    mpsc::unbounded_channel()
}

/// Writes a task's terminal value
pub(crate) fn deliver(results: &ResultSender, result: TaskResult) {
    if results.send(result).is_err() {
        debug!("result receiver dropped, discarding task outcome");
    }
}

/// Drains up to `expected` results, returning the errors among them
///
/// Stops early once every sender is gone, so a task that died without
/// reporting cannot hang the caller. Each missing result is returned as a
/// [`ManagerError::Task`]. The caller must drop its own sender before
/// draining.
pub async fn collect_errors(results: &mut ResultReceiver, expected: usize) -> Vec<ManagerError> {
    let mut errors = Vec::new();
    let mut received = 0;

    while received < expected {
        match results.recv().await {
            Some(Ok(())) => {}
            Some(Err(e)) => errors.push(e),
            None => break,
        }
        received += 1;
    }

    if received < expected {
        warn!(
            "result channel closed after {} of {} result(s)",
            received, expected
        );
        errors.extend((received..expected).map(|_| ManagerError::Task {
            name: "<unreported>".to_string(),
            message: "task ended without reporting".to_string(),
        }));
    }
    errors
}
