//! Cluster description

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::nodegroup::{ManagedNodeGroup, NodeGroup};

/// IP family of the cluster network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpFamily {
    #[default]
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
}

/// Cluster identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMeta {
    pub name: String,
    #[serde(default)]
    pub region: String,
    /// Tags added to every stack of the cluster
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Cluster network settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub ip_family: IpFamily,
}

/// Cluster description driving the node group stacks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub metadata: ClusterMeta,
    #[serde(default)]
    pub kubernetes_network_config: Option<NetworkConfig>,
    #[serde(default)]
    pub node_groups: Vec<NodeGroup>,
    #[serde(default)]
    pub managed_node_groups: Vec<ManagedNodeGroup>,
}

impl ClusterConfig {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            metadata: ClusterMeta {
                name: name.into(),
                region: region.into(),
                tags: BTreeMap::new(),
            },
            ..Default::default()
        }
    }

    pub fn ipv6_enabled(&self) -> bool {
        self.kubernetes_network_config
            .as_ref()
            .is_some_and(|network| network.ip_family == IpFamily::Ipv6)
    }
}
