//! Core domain types
//!
//! These types mirror the entities the infrastructure service tracks (stacks,
//! change sets, autoscaling groups) and the cluster description that drives
//! which node group stacks exist. They carry structure only: every read of a
//! stack goes back to the service.

pub mod autoscaling;
pub mod cluster;
pub mod nodegroup;
pub mod stack;
