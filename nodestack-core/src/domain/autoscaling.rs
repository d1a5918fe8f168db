//! Autoscaling domain types

use serde::{Deserialize, Serialize};

/// Resource type of autoscaling group tags
pub const AUTO_SCALING_GROUP_RESOURCE_TYPE: &str = "auto-scaling-group";

/// A tag on an autoscaling group
///
/// Also used as the propagation record sent to the tagging API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsgTag {
    pub resource_id: String,
    pub resource_type: String,
    pub key: String,
    pub value: String,
    pub propagate_at_launch: bool,
}

impl AsgTag {
    /// Tag for the named autoscaling group, not propagated to instances
    pub fn for_auto_scaling_group(
        asg_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: asg_name.into(),
            resource_type: AUTO_SCALING_GROUP_RESOURCE_TYPE.to_string(),
            key: key.into(),
            value: value.into(),
            propagate_at_launch: false,
        }
    }
}

/// Autoscaling group sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoScalingGroup {
    pub name: String,
    pub desired_capacity: i32,
    pub min_size: i32,
    pub max_size: i32,
}

/// Managed node group as described by the cluster control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedNodegroupInfo {
    pub cluster_name: String,
    pub nodegroup_name: String,
    pub status: String,
    /// Names of the autoscaling groups backing the node group
    pub auto_scaling_groups: Vec<String>,
}
