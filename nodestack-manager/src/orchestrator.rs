//! Node group fan-out
//!
//! Creates every node group stack of a cluster concurrently, then propagates
//! managed node group tags to their autoscaling groups. Each node group runs
//! in its own task; a failing node group never cancels its siblings and all
//! failures are returned together.

use std::sync::Arc;

use nodestack_core::domain::nodegroup::{ManagedNodeGroup, NodeGroup};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::builder::VpcImporter;
use crate::error::{ManagerError, Result};
use crate::stack::StackCollection;
use crate::task::{ResultSender, collect_errors, result_channel};

/// One node group stack to create
#[derive(Debug, Clone)]
enum NodeGroupTask {
    Unmanaged(NodeGroup),
    Managed(ManagedNodeGroup),
}

impl NodeGroupTask {
    fn name(&self) -> &str {
        match self {
            NodeGroupTask::Unmanaged(ng) => &ng.name,
            NodeGroupTask::Managed(ng) => &ng.name,
        }
    }
}

/// Drives the node group stacks of one cluster
pub struct NodeGroupOrchestrator {
    stacks: StackCollection,
    semaphore: Arc<Semaphore>,
}

impl NodeGroupOrchestrator {
    /// Creates an orchestrator bounded by the collection's `max_parallel_tasks`
    pub fn new(stacks: StackCollection) -> Self {
        let semaphore = Arc::new(Semaphore::new(stacks.config().max_parallel_tasks));
        Self { stacks, semaphore }
    }

    /// Creates every node group of the cluster
    ///
    /// Tag propagation only starts once every stack was created. Returns all
    /// errors that occurred; empty means every node group is ready.
    pub async fn create_nodegroups(
        &self,
        force_add_cni_policy: bool,
        vpc_importer: Arc<dyn VpcImporter>,
        cancel: &CancellationToken,
    ) -> Vec<ManagerError> {
        let cluster = self.stacks.cluster();
        let tasks: Vec<NodeGroupTask> = cluster
            .node_groups
            .iter()
            .cloned()
            .map(NodeGroupTask::Unmanaged)
            .chain(
                cluster.managed_node_groups
                    .iter()
                    .cloned()
                    .map(NodeGroupTask::Managed),
            )
            .collect();

        if tasks.is_empty() {
            debug!("no nodegroups to create");
            return Vec::new();
        }

        info!(
            "creating {} nodegroup stack(s) for cluster {:?}",
            tasks.len(),
            cluster.metadata.name
        );

        let (results, mut receiver) = result_channel();
        let handles: Vec<(String, JoinHandle<Result<()>>)> = tasks
            .into_iter()
            .map(|task| {
                let name = task.name().to_string();
                let handle = self.spawn_task(
                    task,
                    force_add_cni_policy,
                    Arc::clone(&vpc_importer),
                    cancel.clone(),
                    results.clone(),
                );
                (name, handle)
            })
            .collect();
        drop(results);

        let mut errors = Vec::new();
        let mut submitted = 0;
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(())) => submitted += 1,
                Ok(Err(e)) => {
                    error!("failed to create nodegroup {:?}: {}", name, e);
                    errors.push(e);
                }
                Err(e) => {
                    warn!("nodegroup task panicked: {}", e);
                    errors.push(ManagerError::Task {
                        name,
                        message: e.to_string(),
                    });
                }
            }
        }
        errors.extend(collect_errors(&mut receiver, submitted).await);

        if !errors.is_empty() {
            error!("{} nodegroup task(s) failed", errors.len());
            return errors;
        }

        self.propagate_managed_tags().await
    }

    /// Spawns a task building and submitting one node group stack
    fn spawn_task(
        &self,
        task: NodeGroupTask,
        force_add_cni_policy: bool,
        vpc_importer: Arc<dyn VpcImporter>,
        cancel: CancellationToken,
        results: ResultSender,
    ) -> JoinHandle<Result<()>> {
        let stacks = self.stacks.clone();
        let semaphore = Arc::clone(&self.semaphore);

        tokio::spawn(async move {
            // Only building and submitting count against the bound; the
            // creation watcher outlives the permit.
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| ManagerError::Task {
                    name: task.name().to_string(),
                    message: e.to_string(),
                })?;

            match &task {
                NodeGroupTask::Unmanaged(ng) => {
                    stacks
                        .create_nodegroup_task(ng, force_add_cni_policy, vpc_importer, &cancel, results)
                        .await
                }
                NodeGroupTask::Managed(ng) => {
                    stacks
                        .create_managed_nodegroup_task(
                            ng,
                            force_add_cni_policy,
                            vpc_importer,
                            &cancel,
                            results,
                        )
                        .await
                }
            }
        })
    }

    async fn propagate_managed_tags(&self) -> Vec<ManagerError> {
        let managed = &self.stacks.cluster().managed_node_groups;
        if managed.is_empty() {
            return Vec::new();
        }

        let (results, mut receiver) = result_channel();
        let mut errors = Vec::new();
        let mut started = 0;
        for nodegroup in managed {
            match self
                .stacks
                .propagate_managed_nodegroup_tags_task(nodegroup, results.clone())
                .await
            {
                Ok(()) => started += 1,
                Err(e) => {
                    error!(
                        "failed to propagate tags of nodegroup {:?}: {}",
                        nodegroup.name, e
                    );
                    errors.push(e);
                }
            }
        }
        drop(results);

        errors.extend(collect_errors(&mut receiver, started).await);
        errors
    }
}
