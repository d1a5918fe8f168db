//! Status waiter
//!
//! Polls a describe operation until the resource reaches a terminal state,
//! the wait times out, or the cancellation token fires. The delay between
//! polls doubles up to a cap.

use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ManagerConfig;
use crate::error::{ManagerError, Result};

/// Outcome of one status poll
#[derive(Debug)]
pub enum Poll<T> {
    /// Terminal state reached
    Done(T),
    /// Terminal state other than the expected one
    Failed { status: String, reason: String },
    /// Still converging; carries the current status for logging
    Pending(String),
}

/// What is being waited on, and for how long
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Human readable resource, e.g. `stack "eksctl-demo-cluster"`
    pub resource: String,
    /// Expected terminal status
    pub target: &'static str,
    pub delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl WaitOptions {
    pub fn new(
        resource: impl Into<String>,
        target: &'static str,
        config: &ManagerConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            resource: resource.into(),
            target,
            delay: config.waiter_delay,
            max_delay: config.waiter_max_delay,
            timeout,
        }
    }
}

/// Calls `describe` until it reports a terminal state
pub async fn poll_until<T, F, Fut>(
    options: &WaitOptions,
    cancel: &CancellationToken,
    mut describe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    let started = Instant::now();
    let mut delay = options.delay;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ManagerError::Cancelled {
                resource: options.resource.clone(),
            });
        }

        attempt += 1;
        match describe().await? {
            Poll::Done(value) => {
                debug!(
                    "{} reached {} after {} poll(s)",
                    options.resource, options.target, attempt
                );
                return Ok(value);
            }
            Poll::Failed { status, reason } => {
                return Err(ManagerError::WaitFailed {
                    resource: options.resource.clone(),
                    target: options.target,
                    status,
                    reason,
                });
            }
            Poll::Pending(status) => {
                debug!(
                    "waiting for {} to reach {} (current: {}, attempt {})",
                    options.resource, options.target, status, attempt
                );
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= options.timeout {
            return Err(ManagerError::WaitTimeout {
                resource: options.resource.clone(),
                target: options.target,
                elapsed,
            });
        }

        let sleep_for = delay.min(options.timeout - elapsed);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ManagerError::Cancelled {
                    resource: options.resource.clone(),
                });
            }
            _ = time::sleep(sleep_for) => {}
        }

        delay = delay.saturating_mul(2).min(options.max_delay);
    }
}
