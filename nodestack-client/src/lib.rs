//! Nodestack service clients
//!
//! The interfaces the stack manager consumes from the infrastructure service:
//! - [`CloudFormationApi`]: stacks, change sets and stack resources
//! - [`AutoScalingApi`]: autoscaling group tags and sizing
//! - [`EksApi`]: managed node group discovery
//!
//! Implementations wrap a concrete SDK or a test double. All of them report
//! failures as [`ClientError`] so callers can tell a missing resource from
//! any other service failure.

pub mod autoscaling;
pub mod cloudformation;
pub mod eks;
pub mod error;

// Re-export commonly used types
pub use autoscaling::AutoScalingApi;
pub use cloudformation::{
    CloudFormationApi, CreateChangeSetInput, CreateStackInput, DEFAULT_CAPABILITIES,
    ListStacksPage,
};
pub use eks::EksApi;
pub use error::{ClientError, Result};

use std::sync::Arc;

/// The three service clients a stack collection talks to
#[derive(Clone)]
pub struct ServiceClients {
    pub cloudformation: Arc<dyn CloudFormationApi>,
    pub autoscaling: Arc<dyn AutoScalingApi>,
    pub eks: Arc<dyn EksApi>,
}

impl ServiceClients {
    pub fn new(
        cloudformation: Arc<dyn CloudFormationApi>,
        autoscaling: Arc<dyn AutoScalingApi>,
        eks: Arc<dyn EksApi>,
    ) -> Self {
        Self {
            cloudformation,
            autoscaling,
            eks,
        }
    }
}
