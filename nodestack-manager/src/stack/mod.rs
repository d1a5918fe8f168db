//! Stack collection
//!
//! All stacks of one cluster, driven against the infrastructure service:
//! - `lifecycle`: create and change set based update, describe and list
//! - `nodegroup`: node group stack tasks and node group stack queries
//! - `asg`: autoscaling group lookups and tag propagation
//!
//! The collection holds no stack state. Clones share the same clients and
//! are cheap, which is how background watchers get their own handle.

mod asg;
mod lifecycle;
mod nodegroup;

pub use lifecycle::UpdateStackOptions;
pub use nodegroup::{GetNodegroupOption, StackInfo};

use std::collections::BTreeMap;
use std::sync::Arc;

use nodestack_client::{AutoScalingApi, CloudFormationApi, EksApi, ServiceClients};
use nodestack_core::domain::cluster::ClusterConfig;
use nodestack_core::domain::stack::Tag;
use nodestack_core::tags::{
    CLUSTER_NAME_TAG, EKSCTL_VERSION_TAG, OLD_CLUSTER_NAME_TAG, STACK_NAME_PREFIX,
};

use crate::builder::ResourceSetFactory;
use crate::config::ManagerConfig;

/// Tool version written into the version tag
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Manages the stacks of one cluster
#[derive(Clone)]
pub struct StackCollection {
    cloudformation: Arc<dyn CloudFormationApi>,
    autoscaling: Arc<dyn AutoScalingApi>,
    eks: Arc<dyn EksApi>,
    resource_sets: Arc<dyn ResourceSetFactory>,
    cluster: Arc<ClusterConfig>,
    config: ManagerConfig,
    shared_tags: Vec<Tag>,
}

impl StackCollection {
    /// Creates a stack collection for the given cluster
    pub fn new(
        clients: ServiceClients,
        resource_sets: Arc<dyn ResourceSetFactory>,
        cluster: ClusterConfig,
        config: ManagerConfig,
    ) -> Self {
        let shared_tags = shared_tags(&cluster);
        Self {
            cloudformation: clients.cloudformation,
            autoscaling: clients.autoscaling,
            eks: clients.eks,
            resource_sets,
            cluster: Arc::new(cluster),
            config,
            shared_tags,
        }
    }

    /// The cluster this collection manages
    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Tags added to every stack of the cluster
    pub fn shared_tags(&self) -> &[Tag] {
        &self.shared_tags
    }

    /// Name of the stack of a node group of this cluster
    pub fn make_nodegroup_stack_name(&self, nodegroup_name: &str) -> String {
        format!(
            "{}-{}-nodegroup-{}",
            STACK_NAME_PREFIX, self.cluster.metadata.name, nodegroup_name
        )
    }

    /// Name of the cluster stack of this cluster
    pub fn make_cluster_stack_name(&self) -> String {
        make_cluster_stack_name_from_name(&self.cluster.metadata.name)
    }

    /// Change set name for the given action, unique per second
    pub fn make_change_set_name(&self, action: &str) -> String {
        format!(
            "{}-{}-{}",
            STACK_NAME_PREFIX,
            action,
            chrono::Utc::now().format("%Y%m%d%H%M%S")
        )
    }
}

/// Name of the cluster stack of the named cluster
pub fn make_cluster_stack_name_from_name(cluster_name: &str) -> String {
    format!("{}-{}-cluster", STACK_NAME_PREFIX, cluster_name)
}

fn shared_tags(cluster: &ClusterConfig) -> Vec<Tag> {
    let name = &cluster.metadata.name;
    let mut tags = vec![
        Tag::new(CLUSTER_NAME_TAG, name),
        Tag::new(OLD_CLUSTER_NAME_TAG, name),
        Tag::new(EKSCTL_VERSION_TAG, VERSION),
    ];
    for (key, value) in &cluster.metadata.tags {
        if !tags.iter().any(|tag| &tag.key == key) {
            tags.push(Tag::new(key, value));
        }
    }
    tags
}

/// Merges tags for a stack submission
///
/// `base` is kept, `overrides` replace values of colliding keys, and `fill`
/// only adds keys that are still missing. Order is first appearance.
pub(crate) fn merge_tags(
    base: &[Tag],
    overrides: &BTreeMap<String, String>,
    fill: &[Tag],
) -> Vec<Tag> {
    let mut merged: Vec<Tag> = Vec::with_capacity(base.len() + overrides.len() + fill.len());

    for tag in base {
        if !merged.iter().any(|t| t.key == tag.key) {
            merged.push(tag.clone());
        }
    }

    for (key, value) in overrides {
        match merged.iter_mut().find(|t| &t.key == key) {
            Some(existing) => existing.value = value.clone(),
            None => merged.push(Tag::new(key, value)),
        }
    }

    for tag in fill {
        if !merged.iter().any(|t| t.key == tag.key) {
            merged.push(tag.clone());
        }
    }

    merged
}
