//! Template construction collaborators
//!
//! Rendering resources, generating instance bootstrap data, resolving
//! networking references and looking up launch templates all happen outside
//! this crate. The stack collection only drives them through these traits.

use async_trait::async_trait;
use nodestack_core::domain::cluster::ClusterConfig;
use nodestack_core::domain::nodegroup::{LaunchTemplateRef, ManagedNodeGroup, NodeGroup};
use nodestack_core::domain::stack::Stack;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A stack template under construction
#[async_trait]
pub trait ResourceSet: Send + Sync {
    /// Adds every resource of the stack to the template
    async fn add_all_resources(&mut self, cancel: &CancellationToken) -> anyhow::Result<()>;

    /// Renders the template body
    fn render_json(&self) -> anyhow::Result<String>;

    /// Reads the outputs of the created stack back into the resource set
    fn get_all_outputs(&mut self, stack: &Stack) -> anyhow::Result<()> {
        let _ = stack;
        Ok(())
    }
}

/// Produces instance bootstrap data for an unmanaged node group
pub trait Bootstrapper: Send + Sync {
    fn user_data(&self) -> anyhow::Result<String>;
}

/// Produces instance bootstrap data for a managed node group
pub trait ManagedBootstrapper: Send + Sync {
    fn user_data(&self) -> anyhow::Result<String>;
}

/// Resolves networking references of the cluster
pub trait VpcImporter: Send + Sync {
    fn vpc(&self) -> String;
    fn subnets(&self) -> Vec<String>;
    fn shared_node_security_group(&self) -> String;
    fn control_plane_security_group(&self) -> String;
}

/// Looks up launch templates referenced by managed node groups
#[async_trait]
pub trait LaunchTemplateFetcher: Send + Sync {
    /// Launch template data, as returned by the compute API
    async fn fetch(&self, template: &LaunchTemplateRef) -> anyhow::Result<serde_json::Value>;
}

/// Builds the resource sets of node group stacks
pub trait ResourceSetFactory: Send + Sync {
    fn new_bootstrapper(
        &self,
        cluster: &ClusterConfig,
        nodegroup: &NodeGroup,
    ) -> anyhow::Result<Box<dyn Bootstrapper>>;

    fn new_managed_bootstrapper(
        &self,
        cluster: &ClusterConfig,
        nodegroup: &ManagedNodeGroup,
    ) -> Box<dyn ManagedBootstrapper>;

    fn new_launch_template_fetcher(&self) -> Arc<dyn LaunchTemplateFetcher>;

    fn new_nodegroup_resource_set(
        &self,
        cluster: &ClusterConfig,
        nodegroup: &NodeGroup,
        bootstrapper: Box<dyn Bootstrapper>,
        force_add_cni_policy: bool,
        vpc_importer: Arc<dyn VpcImporter>,
    ) -> Box<dyn ResourceSet>;

    fn new_managed_nodegroup_resource_set(
        &self,
        cluster: &ClusterConfig,
        nodegroup: &ManagedNodeGroup,
        launch_template_fetcher: Arc<dyn LaunchTemplateFetcher>,
        bootstrapper: Box<dyn ManagedBootstrapper>,
        force_add_cni_policy: bool,
        vpc_importer: Arc<dyn VpcImporter>,
    ) -> Box<dyn ResourceSet>;
}
