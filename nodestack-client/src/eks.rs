//! Cluster control plane API

use async_trait::async_trait;
use nodestack_core::domain::autoscaling::ManagedNodegroupInfo;

use crate::error::Result;

/// Managed node group operations
#[async_trait]
pub trait EksApi: Send + Sync {
    /// Describes a managed node group, including its autoscaling groups
    async fn describe_nodegroup(
        &self,
        cluster_name: &str,
        nodegroup_name: &str,
    ) -> Result<ManagedNodegroupInfo>;
}
