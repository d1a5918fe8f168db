//! Nodestack Manager
//!
//! Lifecycle orchestration for the stacks of a cluster and its node groups.
//!
//! This crate contains:
//! - The stack collection: create, change set based update, describe and list
//! - Node group tasks and the concurrent fan-out driving them
//! - Node group identity, type and version resolution from stack tags
//! - Tag propagation to autoscaling groups within the service quotas
//!
//! Template rendering, bootstrap data, networking lookups and launch templates
//! are provided by the caller through the traits in [`builder`].

pub mod batch;
pub mod builder;
pub mod config;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod stack;
pub mod task;
pub mod waiter;

#[cfg(test)]
mod testing;

pub use config::ManagerConfig;
pub use error::{ManagerError, Result};
pub use orchestrator::NodeGroupOrchestrator;
pub use stack::{StackCollection, UpdateStackOptions};
