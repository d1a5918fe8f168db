//! Manager configuration
//!
//! Polling cadence and bounded waits for the stack and change set waiters,
//! plus the concurrency bound used when fanning out node group tasks.

use std::time::Duration;

/// Stack manager configuration
///
/// Waits are bounded so a stuck stack never blocks a task forever; the
/// defaults follow how long the service usually takes for each operation.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Delay before the second status poll
    pub waiter_delay: Duration,

    /// Upper bound of the poll delay once it has backed off
    pub waiter_max_delay: Duration,

    /// Maximum time to wait for a stack to be created
    pub create_timeout: Duration,

    /// Maximum time to wait for a stack update to settle
    pub update_timeout: Duration,

    /// Maximum time to wait for a change set to be computed
    pub change_set_timeout: Duration,

    /// Max node group tasks building and submitting stacks at once
    pub max_parallel_tasks: usize,
}

impl ManagerConfig {
    /// Creates a new configuration with defaults
    pub fn new() -> Self {
        Self {
            waiter_delay: Duration::from_secs(20),
            waiter_max_delay: Duration::from_secs(120),
            create_timeout: Duration::from_secs(60 * 60),
            update_timeout: Duration::from_secs(60 * 60),
            change_set_timeout: Duration::from_secs(10 * 60),
            max_parallel_tasks: 8,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// All variables are optional:
    /// - NODESTACK_WAITER_DELAY (seconds, default: 20)
    /// - NODESTACK_WAITER_MAX_DELAY (seconds, default: 120)
    /// - NODESTACK_CREATE_TIMEOUT (seconds, default: 3600)
    /// - NODESTACK_UPDATE_TIMEOUT (seconds, default: 3600)
    /// - NODESTACK_CHANGE_SET_TIMEOUT (seconds, default: 600)
    /// - NODESTACK_MAX_PARALLEL_TASKS (default: 8)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let config = Self {
            waiter_delay: env_secs("NODESTACK_WAITER_DELAY", defaults.waiter_delay)?,
            waiter_max_delay: env_secs("NODESTACK_WAITER_MAX_DELAY", defaults.waiter_max_delay)?,
            create_timeout: env_secs("NODESTACK_CREATE_TIMEOUT", defaults.create_timeout)?,
            update_timeout: env_secs("NODESTACK_UPDATE_TIMEOUT", defaults.update_timeout)?,
            change_set_timeout: env_secs(
                "NODESTACK_CHANGE_SET_TIMEOUT",
                defaults.change_set_timeout,
            )?,
            max_parallel_tasks: parse_number(
                "NODESTACK_MAX_PARALLEL_TASKS",
                std::env::var("NODESTACK_MAX_PARALLEL_TASKS").ok(),
                defaults.max_parallel_tasks,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.waiter_delay.is_zero() {
            anyhow::bail!("waiter_delay must be greater than 0");
        }

        if self.waiter_max_delay < self.waiter_delay {
            anyhow::bail!("waiter_max_delay must not be shorter than waiter_delay");
        }

        if self.create_timeout.is_zero()
            || self.update_timeout.is_zero()
            || self.change_set_timeout.is_zero()
        {
            anyhow::bail!("wait timeouts must be greater than 0");
        }

        if self.max_parallel_tasks == 0 {
            anyhow::bail!("max_parallel_tasks must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_secs(name: &str, default: Duration) -> anyhow::Result<Duration> {
    let secs = parse_number(name, std::env::var(name).ok(), default.as_secs())?;
    Ok(Duration::from_secs(secs))
}

fn parse_number<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> anyhow::Result<T> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative integer, got {:?}", name, raw)),
    }
}
