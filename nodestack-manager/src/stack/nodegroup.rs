//! Node group stacks

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use nodestack_core::domain::nodegroup::{
    ManagedNodeGroup, NodeGroup, NodeGroupStack, NodeGroupType,
};
use nodestack_core::domain::stack::{Stack, StackResource};
use nodestack_core::tags::{NODEGROUP_NAME_TAG, NODEGROUP_TYPE_TAG, OLD_NODEGROUP_NAME_TAG};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::StackCollection;
use crate::builder::VpcImporter;
use crate::error::{ManagerError, Result};
use crate::metadata::{
    filter_nodegroup_stacks, get_nodegroup_name, get_nodegroup_type, resolve_nodegroup_stack,
};
use crate::task::ResultSender;

/// A node group stack together with its realized resources
#[derive(Debug, Clone)]
pub struct StackInfo {
    pub stack: Stack,
    pub resources: Vec<StackResource>,
}

/// How to find the node group whose type is wanted
#[derive(Debug, Clone)]
pub enum GetNodegroupOption {
    /// Already resolved, no call needed
    Stack(NodeGroupStack),
    /// Look the stack up by node group name
    NodeGroupName(String),
}

impl StackCollection {
    /// Builds and submits the stack of an unmanaged node group
    ///
    /// Building the resources is done before returning, so a build failure
    /// is the returned error. The outcome of the creation itself is written
    /// to `results`.
    pub async fn create_nodegroup_task(
        &self,
        nodegroup: &NodeGroup,
        force_add_cni_policy: bool,
        vpc_importer: Arc<dyn VpcImporter>,
        cancel: &CancellationToken,
        results: ResultSender,
    ) -> Result<()> {
        let name = self.make_nodegroup_stack_name(&nodegroup.name);
        info!("building nodegroup stack {:?}", name);

        let bootstrapper = self
            .resource_sets
            .new_bootstrapper(&self.cluster, nodegroup)
            .context("error creating bootstrapper")
            .map_err(|e| ManagerError::resource_set(&name, e))?;

        let mut stack = self.resource_sets.new_nodegroup_resource_set(
            &self.cluster,
            nodegroup,
            bootstrapper,
            force_add_cni_policy,
            vpc_importer,
        );
        stack
            .add_all_resources(cancel)
            .await
            .map_err(|e| ManagerError::resource_set(&name, e))?;

        let mut tags = nodegroup.tags.clone();
        tags.insert(NODEGROUP_NAME_TAG.to_string(), nodegroup.name.clone());
        tags.insert(OLD_NODEGROUP_NAME_TAG.to_string(), nodegroup.name.clone());
        tags.insert(
            NODEGROUP_TYPE_TAG.to_string(),
            NodeGroupType::Unmanaged.as_str().to_string(),
        );

        self.create_stack(&name, stack, &tags, cancel, results).await
    }

    /// Builds and submits the stack of a managed node group
    ///
    /// Managed node groups need the networking the cluster stack sets up for
    /// IPv6, so on a cluster this tool does not own, IPv6 is refused before
    /// anything is built.
    pub async fn create_managed_nodegroup_task(
        &self,
        nodegroup: &ManagedNodeGroup,
        force_add_cni_policy: bool,
        vpc_importer: Arc<dyn VpcImporter>,
        cancel: &CancellationToken,
        results: ResultSender,
    ) -> Result<()> {
        let cluster_stack = self.get_cluster_stack_if_exists().await?;
        if cluster_stack.is_none() && self.cluster.ipv6_enabled() {
            return Err(ManagerError::ConfigurationConflict(
                "managed nodegroups cannot be created on IPv6 unowned clusters".to_string(),
            ));
        }

        let name = self.make_nodegroup_stack_name(&nodegroup.name);
        info!("building managed nodegroup stack {:?}", name);

        let fetcher = self.resource_sets.new_launch_template_fetcher();
        let bootstrapper = self
            .resource_sets
            .new_managed_bootstrapper(&self.cluster, nodegroup);
        let mut stack = self.resource_sets.new_managed_nodegroup_resource_set(
            &self.cluster,
            nodegroup,
            fetcher,
            bootstrapper,
            force_add_cni_policy,
            vpc_importer,
        );
        stack
            .add_all_resources(cancel)
            .await
            .map_err(|e| ManagerError::resource_set(&name, e))?;

        let mut tags = nodegroup.tags.clone();
        tags.insert(NODEGROUP_NAME_TAG.to_string(), nodegroup.name.clone());
        tags.insert(
            NODEGROUP_TYPE_TAG.to_string(),
            NodeGroupType::Managed.as_str().to_string(),
        );

        self.create_stack(&name, stack, &tags, cancel, results).await
    }

    /// Describes the live node group stacks of this cluster
    pub async fn describe_nodegroup_stacks(&self) -> Result<Vec<Stack>> {
        Ok(filter_nodegroup_stacks(self.describe_stacks().await?))
    }

    /// Lists the node group stacks with their name and type
    pub async fn list_nodegroup_stacks(&self) -> Result<Vec<NodeGroupStack>> {
        self.describe_nodegroup_stacks()
            .await?
            .into_iter()
            .map(resolve_nodegroup_stack)
            .collect()
    }

    /// Describes every node group stack and its resources, keyed by node group
    pub async fn describe_nodegroup_stacks_and_resources(
        &self,
    ) -> Result<BTreeMap<String, StackInfo>> {
        let stacks = self.describe_nodegroup_stacks().await?;

        let mut all = BTreeMap::new();
        for stack in stacks {
            let resources = self
                .cloudformation
                .describe_stack_resources(&stack.stack_name)
                .await
                .map_err(|e| {
                    ManagerError::service("describing stack resources", &stack.stack_name, e)
                })?;
            debug!(
                "stack {:?} has {} resource(s)",
                stack.stack_name,
                resources.len()
            );
            all.insert(get_nodegroup_name(&stack), StackInfo { stack, resources });
        }
        Ok(all)
    }

    /// Describes the stack of the named node group
    pub async fn describe_nodegroup_stack(&self, nodegroup_name: &str) -> Result<Stack> {
        self.describe_stack(&self.make_nodegroup_stack_name(nodegroup_name))
            .await
    }

    /// Type of a node group, read from the tags of its stack
    ///
    /// A stack without node group identity tags is an error in both forms.
    pub async fn get_nodegroup_stack_type(
        &self,
        option: GetNodegroupOption,
    ) -> Result<NodeGroupType> {
        match option {
            GetNodegroupOption::Stack(stack) => get_nodegroup_type(&stack.stack.tags),
            GetNodegroupOption::NodeGroupName(name) => {
                let stack = self.describe_nodegroup_stack(&name).await?;
                get_nodegroup_type(&stack.tags)
            }
        }
    }
}
