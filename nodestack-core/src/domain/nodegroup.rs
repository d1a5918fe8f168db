//! Node group domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::stack::Stack;

/// Node group flavour
///
/// Stacks created before the type tag existed are unmanaged, hence the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeGroupType {
    Managed,
    #[default]
    Unmanaged,
}

impl NodeGroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeGroupType::Managed => "managed",
            NodeGroupType::Unmanaged => "unmanaged",
        }
    }

    /// Parses the value of the node group type tag
    pub fn from_tag_value(value: &str) -> Option<Self> {
        match value {
            "managed" => Some(NodeGroupType::Managed),
            "unmanaged" => Some(NodeGroupType::Unmanaged),
            _ => None,
        }
    }
}

impl fmt::Display for NodeGroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stack resolved as a node group stack
///
/// A view over the stack: it has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGroupStack {
    pub nodegroup_name: String,
    pub nodegroup_type: NodeGroupType,
    pub stack: Stack,
}

/// Unmanaged node group description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGroup {
    pub name: String,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub desired_capacity: Option<u32>,
    #[serde(default)]
    pub min_size: Option<u32>,
    #[serde(default)]
    pub max_size: Option<u32>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl NodeGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Launch template reference for a managed node group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchTemplateRef {
    pub id: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Managed node group description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedNodeGroup {
    pub name: String,
    #[serde(default)]
    pub instance_types: Vec<String>,
    #[serde(default)]
    pub desired_capacity: Option<u32>,
    #[serde(default)]
    pub min_size: Option<u32>,
    #[serde(default)]
    pub max_size: Option<u32>,
    #[serde(default)]
    pub launch_template: Option<LaunchTemplateRef>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Skip copying `tags` onto the node group's autoscaling groups
    #[serde(default, rename = "disableASGTagPropagation")]
    pub disable_asg_tag_propagation: bool,
}

impl ManagedNodeGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
