//! Error types for the stack manager

use nodestack_client::ClientError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for manager operations
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Errors produced while managing stacks
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The named stack does not exist
    #[error("no CloudFormation stack found for {0}")]
    StackNotFound(String),

    /// The change set would not modify the stack
    #[error("change set {change_set} of stack {stack} didn't contain changes")]
    NoChanges { stack: String, change_set: String },

    /// More tags than an autoscaling group can hold
    #[error("number of tags is exceeding the maximum amount for asg {max}, was: {actual}")]
    QuotaExceeded { max: usize, actual: usize },

    /// The request contradicts how the cluster is set up
    #[error("{0}")]
    ConfigurationConflict(String),

    /// A service call failed
    #[error("{operation} {resource:?}: {source}")]
    Service {
        operation: &'static str,
        resource: String,
        #[source]
        source: ClientError,
    },

    /// A builder collaborator failed before anything was submitted
    #[error("building resources for {stack:?}: {message}")]
    ResourceSet { stack: String, message: String },

    /// None of the node group name tags is present
    #[error("failed to find the nodegroup name tag")]
    MissingIdentityTag,

    /// The version tag is not a semantic version
    #[error("unexpected error parsing eksctl version {value:?}: {source}")]
    VersionParse {
        value: String,
        #[source]
        source: semver::Error,
    },

    /// A waiter reached a terminal state other than the expected one
    #[error("waiting for {resource} to reach {target}: got {status} ({reason})")]
    WaitFailed {
        resource: String,
        target: &'static str,
        status: String,
        reason: String,
    },

    /// A waiter ran out of time
    #[error("timed out after {elapsed:?} waiting for {resource} to reach {target}")]
    WaitTimeout {
        resource: String,
        target: &'static str,
        elapsed: Duration,
    },

    /// A waiter observed the cancellation signal
    #[error("waiting for {resource} was cancelled")]
    Cancelled { resource: String },

    /// The autoscaling group could not be resolved
    #[error("couldn't find ASG: {0}")]
    AutoScalingGroupNotFound(String),

    /// A spawned task ended without reporting
    #[error("task for {name:?} did not complete: {message}")]
    Task { name: String, message: String },

    /// The stack name pattern could not be compiled
    #[error("invalid stack name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl ManagerError {
    /// Wraps a service error with the operation and resource it concerns
    pub fn service(operation: &'static str, resource: impl Into<String>, source: ClientError) -> Self {
        Self::Service {
            operation,
            resource: resource.into(),
            source,
        }
    }

    /// Wraps a collaborator failure, keeping its whole context chain
    pub fn resource_set(stack: impl Into<String>, err: anyhow::Error) -> Self {
        Self::ResourceSet {
            stack: stack.into(),
            message: format!("{:#}", err),
        }
    }

    /// Check if this error means the stack or resource does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::StackNotFound(_) | Self::AutoScalingGroupNotFound(_) => true,
            Self::Service { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}
