//! In-memory service fakes for unit tests
//!
//! [`FakeCloud`] implements every service trait over shared state, records
//! each call in order and plays back scripted stack and change set statuses.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use nodestack_client::{
    AutoScalingApi, ClientError, CloudFormationApi, CreateChangeSetInput, CreateStackInput,
    EksApi, ListStacksPage, Result, ServiceClients,
};
use nodestack_core::domain::autoscaling::{AsgTag, AutoScalingGroup, ManagedNodegroupInfo};
use nodestack_core::domain::cluster::ClusterConfig;
use nodestack_core::domain::nodegroup::{LaunchTemplateRef, ManagedNodeGroup, NodeGroup};
use nodestack_core::domain::stack::{
    ChangeSet, ChangeSetStatus, Stack, StackResource, StackStatus, StackSummary,
};
use tokio_util::sync::CancellationToken;

use crate::builder::{
    Bootstrapper, LaunchTemplateFetcher, ManagedBootstrapper, ResourceSet, ResourceSetFactory,
    VpcImporter,
};
use crate::config::ManagerConfig;
use crate::stack::StackCollection;

/// A recorded service call
#[derive(Debug, Clone)]
pub enum Call {
    CreateStack(CreateStackInput),
    DescribeStacks(String),
    ListStacks(Option<String>),
    DescribeStackResources(String),
    DescribeStackResource(String, String),
    CreateChangeSet(CreateChangeSetInput),
    DescribeChangeSet(String, String),
    ExecuteChangeSet(String, String),
    DescribeTags(Vec<String>),
    CreateOrUpdateTags(Vec<AsgTag>),
    DescribeAutoScalingGroups(Vec<String>),
    DescribeNodegroup(String, String),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    stacks: BTreeMap<String, Stack>,
    stack_scripts: HashMap<String, VecDeque<StackStatus>>,
    change_sets: HashMap<(String, String), ChangeSet>,
    change_set_script: VecDeque<ChangeSetStatus>,
    change_set_reason: Option<String>,
    page_size: Option<usize>,
    resources: Vec<StackResource>,
    asg_tags: Vec<AsgTag>,
    auto_scaling_groups: Vec<AutoScalingGroup>,
    nodegroups: Vec<ManagedNodegroupInfo>,
    create_stack_error: Option<ClientError>,
    tagging_error: Option<ClientError>,
}

/// Recording fake of the stack, autoscaling and control plane services
#[derive(Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<State>>,
}

fn does_not_exist(operation: &str, what: &str) -> ClientError {
    ClientError::service_error(
        operation,
        "ValidationError",
        format!("{} does not exist", what),
    )
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn stack(&self, name: &str) -> Option<Stack> {
        self.state().stacks.get(name).cloned()
    }

    pub fn add_stack(&self, stack: Stack) {
        self.state().stacks.insert(stack.stack_name.clone(), stack);
    }

    /// Statuses the named stack reports on successive describe calls
    ///
    /// The last status sticks once the script is played out.
    pub fn script_stack(&self, name: &str, statuses: Vec<StackStatus>) {
        self.state()
            .stack_scripts
            .insert(name.to_string(), statuses.into());
    }

    /// Statuses every change set reports on successive describe calls
    pub fn script_change_set(&self, statuses: Vec<ChangeSetStatus>) {
        self.state().change_set_script = statuses.into();
    }

    /// Status reason of failed change sets
    pub fn set_change_set_reason(&self, reason: &str) {
        self.state().change_set_reason = Some(reason.to_string());
    }

    pub fn set_page_size(&self, size: usize) {
        self.state().page_size = Some(size);
    }

    pub fn add_resource(&self, resource: StackResource) {
        self.state().resources.push(resource);
    }

    pub fn add_asg_tag(&self, tag: AsgTag) {
        self.state().asg_tags.push(tag);
    }

    pub fn add_auto_scaling_group(&self, group: AutoScalingGroup) {
        self.state().auto_scaling_groups.push(group);
    }

    pub fn add_nodegroup(&self, nodegroup: ManagedNodegroupInfo) {
        self.state().nodegroups.push(nodegroup);
    }

    /// Makes the next stack creation fail
    pub fn fail_create_stack(&self, err: ClientError) {
        self.state().create_stack_error = Some(err);
    }

    /// Makes the next tagging call fail
    pub fn fail_create_or_update_tags(&self, err: ClientError) {
        self.state().tagging_error = Some(err);
    }

    pub fn clients(&self) -> ServiceClients {
        ServiceClients::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }
}

#[async_trait]
impl CloudFormationApi for FakeCloud {
    async fn create_stack(&self, input: CreateStackInput) -> Result<String> {
        let mut state = self.state();
        state.calls.push(Call::CreateStack(input.clone()));
        if let Some(err) = state.create_stack_error.take() {
            return Err(err);
        }

        let mut stack = Stack::new(input.stack_name.as_str(), StackStatus::CreateInProgress);
        let stack_id = format!("arn:aws:cloudformation:eu-west-1:000000000000:stack/{}", input.stack_name);
        stack.stack_id = Some(stack_id.clone());
        stack.tags = input.tags;
        stack.capabilities = input.capabilities;
        state.stacks.insert(input.stack_name, stack);
        Ok(stack_id)
    }

    async fn describe_stacks(&self, stack_name: &str) -> Result<Vec<Stack>> {
        let mut state = self.state();
        state.calls.push(Call::DescribeStacks(stack_name.to_string()));

        let next = state
            .stack_scripts
            .get_mut(stack_name)
            .and_then(VecDeque::pop_front);
        let stack = state
            .stacks
            .get_mut(stack_name)
            .ok_or_else(|| does_not_exist("DescribeStacks", &format!("Stack with id {}", stack_name)))?;
        if let Some(status) = next {
            stack.stack_status = status;
        }
        Ok(vec![stack.clone()])
    }

    async fn list_stacks(
        &self,
        status_filter: &[StackStatus],
        next_token: Option<String>,
    ) -> Result<ListStacksPage> {
        let mut state = self.state();
        state.calls.push(Call::ListStacks(next_token.clone()));

        let matching: Vec<StackSummary> = state
            .stacks
            .values()
            .filter(|stack| status_filter.contains(&stack.stack_status))
            .map(|stack| StackSummary {
                stack_id: stack.stack_id.clone(),
                stack_name: stack.stack_name.clone(),
                stack_status: stack.stack_status,
            })
            .collect();

        let start = next_token
            .map(|token| token.parse::<usize>())
            .transpose()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?
            .unwrap_or(0);
        let end = state
            .page_size
            .map_or(matching.len(), |size| (start + size).min(matching.len()));

        Ok(ListStacksPage {
            stack_summaries: matching[start..end].to_vec(),
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DescribeStackResources(stack_name.to_string()));
        Ok(state
            .resources
            .iter()
            .filter(|r| r.stack_name == stack_name)
            .cloned()
            .collect())
    }

    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_resource_id: &str,
    ) -> Result<StackResource> {
        let mut state = self.state();
        state.calls.push(Call::DescribeStackResource(
            stack_name.to_string(),
            logical_resource_id.to_string(),
        ));
        state
            .resources
            .iter()
            .find(|r| r.stack_name == stack_name && r.logical_resource_id == logical_resource_id)
            .cloned()
            .ok_or_else(|| {
                does_not_exist(
                    "DescribeStackResource",
                    &format!("Resource {} for stack {}", logical_resource_id, stack_name),
                )
            })
    }

    async fn create_change_set(&self, input: CreateChangeSetInput) -> Result<String> {
        let mut state = self.state();
        state.calls.push(Call::CreateChangeSet(input.clone()));

        let change_set = ChangeSet::new(
            input.stack_name.as_str(),
            input.change_set_name.as_str(),
            ChangeSetStatus::CreatePending,
        );
        state
            .change_sets
            .insert((input.stack_name, input.change_set_name.clone()), change_set);
        Ok(input.change_set_name)
    }

    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSet> {
        let mut state = self.state();
        state.calls.push(Call::DescribeChangeSet(
            stack_name.to_string(),
            change_set_name.to_string(),
        ));

        let next = state.change_set_script.pop_front();
        let reason = state.change_set_reason.clone();
        let change_set = state
            .change_sets
            .get_mut(&(stack_name.to_string(), change_set_name.to_string()))
            .ok_or_else(|| ClientError::NotFound(change_set_name.to_string()))?;
        if let Some(status) = next {
            change_set.status = status;
        }
        if change_set.status == ChangeSetStatus::Failed {
            change_set.status_reason = reason;
        }
        Ok(change_set.clone())
    }

    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()> {
        self.state().calls.push(Call::ExecuteChangeSet(
            stack_name.to_string(),
            change_set_name.to_string(),
        ));
        Ok(())
    }
}

#[async_trait]
impl AutoScalingApi for FakeCloud {
    async fn describe_tags(&self, auto_scaling_group_names: &[String]) -> Result<Vec<AsgTag>> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DescribeTags(auto_scaling_group_names.to_vec()));
        Ok(state
            .asg_tags
            .iter()
            .filter(|tag| auto_scaling_group_names.contains(&tag.resource_id))
            .cloned()
            .collect())
    }

    async fn create_or_update_tags(&self, tags: Vec<AsgTag>) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::CreateOrUpdateTags(tags.clone()));
        if let Some(err) = state.tagging_error.take() {
            return Err(err);
        }

        for tag in tags {
            state
                .asg_tags
                .retain(|t| !(t.resource_id == tag.resource_id && t.key == tag.key));
            state.asg_tags.push(tag);
        }
        Ok(())
    }

    async fn describe_auto_scaling_groups(
        &self,
        auto_scaling_group_names: &[String],
    ) -> Result<Vec<AutoScalingGroup>> {
        let mut state = self.state();
        state
            .calls
            .push(Call::DescribeAutoScalingGroups(auto_scaling_group_names.to_vec()));
        Ok(state
            .auto_scaling_groups
            .iter()
            .filter(|group| auto_scaling_group_names.contains(&group.name))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EksApi for FakeCloud {
    async fn describe_nodegroup(
        &self,
        cluster_name: &str,
        nodegroup_name: &str,
    ) -> Result<ManagedNodegroupInfo> {
        let mut state = self.state();
        state.calls.push(Call::DescribeNodegroup(
            cluster_name.to_string(),
            nodegroup_name.to_string(),
        ));
        state
            .nodegroups
            .iter()
            .find(|ng| ng.cluster_name == cluster_name && ng.nodegroup_name == nodegroup_name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("nodegroup {}", nodegroup_name)))
    }
}

/// Resource set rendering an empty template
///
/// Stacks handed to `get_all_outputs` are recorded in `outputs_read`, which
/// stays readable after the set was boxed away.
#[derive(Debug, Default)]
pub struct FakeResourceSet {
    fail_render: bool,
    panic_on_outputs: bool,
    pub outputs_read: Arc<Mutex<Vec<Stack>>>,
}

impl FakeResourceSet {
    pub fn failing_render() -> Self {
        Self {
            fail_render: true,
            ..Self::default()
        }
    }

    pub fn panicking_outputs() -> Self {
        Self {
            panic_on_outputs: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ResourceSet for FakeResourceSet {
    async fn add_all_resources(&mut self, _cancel: &CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }

    fn render_json(&self) -> anyhow::Result<String> {
        if self.fail_render {
            anyhow::bail!("template has no resources");
        }
        Ok(r#"{"Resources":{}}"#.to_string())
    }

    fn get_all_outputs(&mut self, stack: &Stack) -> anyhow::Result<()> {
        if self.panic_on_outputs {
            panic!("outputs of {} are malformed", stack.stack_name);
        }
        self.outputs_read.lock().unwrap().push(stack.clone());
        Ok(())
    }
}

struct FakeBootstrapper;

impl Bootstrapper for FakeBootstrapper {
    fn user_data(&self) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

impl ManagedBootstrapper for FakeBootstrapper {
    fn user_data(&self) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

struct FakeFetcher;

#[async_trait]
impl LaunchTemplateFetcher for FakeFetcher {
    async fn fetch(&self, template: &LaunchTemplateRef) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({ "LaunchTemplateId": template.id }))
    }
}

/// Networking of a cluster with a single subnet
pub struct FakeVpc;

impl VpcImporter for FakeVpc {
    fn vpc(&self) -> String {
        "vpc-1".to_string()
    }

    fn subnets(&self) -> Vec<String> {
        vec!["subnet-1".to_string()]
    }

    fn shared_node_security_group(&self) -> String {
        "sg-shared".to_string()
    }

    fn control_plane_security_group(&self) -> String {
        "sg-control-plane".to_string()
    }
}

/// Builds fake resource sets, optionally failing one node group's bootstrapper
#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    pub fail_bootstrapper_for: Option<String>,
}

impl ResourceSetFactory for FakeFactory {
    fn new_bootstrapper(
        &self,
        _cluster: &ClusterConfig,
        nodegroup: &NodeGroup,
    ) -> anyhow::Result<Box<dyn Bootstrapper>> {
        if self.fail_bootstrapper_for.as_deref() == Some(nodegroup.name.as_str()) {
            anyhow::bail!("no AMI found for nodegroup {}", nodegroup.name);
        }
        Ok(Box::new(FakeBootstrapper))
    }

    fn new_managed_bootstrapper(
        &self,
        _cluster: &ClusterConfig,
        _nodegroup: &ManagedNodeGroup,
    ) -> Box<dyn ManagedBootstrapper> {
        Box::new(FakeBootstrapper)
    }

    fn new_launch_template_fetcher(&self) -> Arc<dyn LaunchTemplateFetcher> {
        Arc::new(FakeFetcher)
    }

    fn new_nodegroup_resource_set(
        &self,
        _cluster: &ClusterConfig,
        _nodegroup: &NodeGroup,
        _bootstrapper: Box<dyn Bootstrapper>,
        _force_add_cni_policy: bool,
        _vpc_importer: Arc<dyn VpcImporter>,
    ) -> Box<dyn ResourceSet> {
        Box::new(FakeResourceSet::default())
    }

    fn new_managed_nodegroup_resource_set(
        &self,
        _cluster: &ClusterConfig,
        _nodegroup: &ManagedNodeGroup,
        _launch_template_fetcher: Arc<dyn LaunchTemplateFetcher>,
        _bootstrapper: Box<dyn ManagedBootstrapper>,
        _force_add_cni_policy: bool,
        _vpc_importer: Arc<dyn VpcImporter>,
    ) -> Box<dyn ResourceSet> {
        Box::new(FakeResourceSet::default())
    }
}

/// Fast waiters for tests
pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        waiter_delay: Duration::from_millis(1),
        waiter_max_delay: Duration::from_millis(4),
        create_timeout: Duration::from_secs(5),
        update_timeout: Duration::from_secs(5),
        change_set_timeout: Duration::from_secs(5),
        max_parallel_tasks: 2,
    }
}

pub fn collection_with_factory(
    cloud: &FakeCloud,
    cluster: ClusterConfig,
    factory: FakeFactory,
) -> StackCollection {
    StackCollection::new(cloud.clients(), Arc::new(factory), cluster, test_config())
}

pub fn collection_for(cloud: &FakeCloud, cluster: ClusterConfig) -> StackCollection {
    collection_with_factory(cloud, cluster, FakeFactory::default())
}

/// Collection for a plain cluster with the default fake factory
pub fn test_collection(cloud: &FakeCloud, cluster_name: &str) -> StackCollection {
    collection_for(cloud, ClusterConfig::new(cluster_name, "eu-west-1"))
}
