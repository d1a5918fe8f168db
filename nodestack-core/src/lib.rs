//! Nodestack Core
//!
//! Core types shared by the nodestack crates.
//!
//! This crate contains:
//! - Domain types: stacks, change sets, node groups, cluster description
//! - Reserved tag keys and the autoscaling tag quotas

pub mod domain;
pub mod tags;
