//! Autoscaling groups behind node group stacks

use std::collections::{BTreeMap, BTreeSet};

use nodestack_core::domain::autoscaling::AutoScalingGroup;
use nodestack_core::domain::nodegroup::{ManagedNodeGroup, NodeGroupType};
use nodestack_core::domain::stack::Stack;
use nodestack_core::tags::{MAXIMUM_CREATED_TAG_NUMBER_PER_CALL, MAXIMUM_TAG_NUMBER};
use tracing::{debug, info, warn};

use super::StackCollection;
use crate::batch::{asg_tag_records, chunk};
use crate::error::{ManagerError, Result};
use crate::metadata::{get_nodegroup_name, get_nodegroup_type};
use crate::task::{ResultSender, deliver};

/// Logical id of the autoscaling group in unmanaged node group templates
const NODEGROUP_RESOURCE: &str = "NodeGroup";

impl StackCollection {
    /// Copies node group tags onto its autoscaling groups
    ///
    /// Returns right away; the outcome is written to `results`. More tags than
    /// a group can hold is reported without calling the service.
    pub fn propagate_managed_nodegroup_tags_to_asg(
        &self,
        nodegroup_name: &str,
        tags: BTreeMap<String, String>,
        asg_names: Vec<String>,
        results: ResultSender,
    ) {
        if tags.len() > MAXIMUM_TAG_NUMBER {
            deliver(
                &results,
                Err(ManagerError::QuotaExceeded {
                    max: MAXIMUM_TAG_NUMBER,
                    actual: tags.len(),
                }),
            );
            return;
        }

        let collection = self.clone();
        let nodegroup_name = nodegroup_name.to_string();
        tokio::spawn(async move {
            let result = collection
                .propagate_tags(&nodegroup_name, &tags, &asg_names)
                .await;
            deliver(&results, result);
        });
    }

    async fn propagate_tags(
        &self,
        nodegroup_name: &str,
        tags: &BTreeMap<String, String>,
        asg_names: &[String],
    ) -> Result<()> {
        if asg_names.is_empty() || tags.is_empty() {
            debug!("no tags to propagate for nodegroup {:?}", nodegroup_name);
            return Ok(());
        }

        let joined = asg_names.join(",");
        let existing = self
            .autoscaling
            .describe_tags(asg_names)
            .await
            .map_err(|e| ManagerError::service("describing asg tags", &joined, e))?;

        for asg in asg_names {
            let keys: BTreeSet<&str> = existing
                .iter()
                .filter(|tag| &tag.resource_id == asg)
                .map(|tag| tag.key.as_str())
                .chain(tags.keys().map(String::as_str))
                .collect();
            if keys.len() > MAXIMUM_TAG_NUMBER {
                return Err(ManagerError::QuotaExceeded {
                    max: MAXIMUM_TAG_NUMBER,
                    actual: keys.len(),
                });
            }
        }

        let records: Vec<_> = asg_tag_records(asg_names, tags)
            .into_iter()
            .filter(|record| {
                !existing.iter().any(|tag| {
                    tag.resource_id == record.resource_id
                        && tag.key == record.key
                        && tag.value == record.value
                })
            })
            .collect();

        if records.is_empty() {
            info!(
                "tags of nodegroup {:?} are already set on asg {}",
                nodegroup_name, joined
            );
            return Ok(());
        }

        info!(
            "propagating {} tag(s) of nodegroup {:?} to asg {}",
            records.len(),
            nodegroup_name,
            joined
        );
        for batch in chunk(records, MAXIMUM_CREATED_TAG_NUMBER_PER_CALL) {
            debug!("creating or updating {} asg tag(s)", batch.len());
            self.autoscaling
                .create_or_update_tags(batch)
                .await
                .map_err(|e| ManagerError::service("creating or updating asg tags", &joined, e))?;
        }
        Ok(())
    }

    /// Propagates the tags of a managed node group to its autoscaling groups
    ///
    /// Finds the groups through the control plane, then hands over to
    /// [`propagate_managed_nodegroup_tags_to_asg`](Self::propagate_managed_nodegroup_tags_to_asg).
    pub async fn propagate_managed_nodegroup_tags_task(
        &self,
        nodegroup: &ManagedNodeGroup,
        results: ResultSender,
    ) -> Result<()> {
        if nodegroup.disable_asg_tag_propagation {
            debug!(
                "asg tag propagation disabled for nodegroup {:?}",
                nodegroup.name
            );
            deliver(&results, Ok(()));
            return Ok(());
        }

        let info = self
            .eks
            .describe_nodegroup(&self.cluster.metadata.name, &nodegroup.name)
            .await
            .map_err(|e| ManagerError::service("describing nodegroup", &nodegroup.name, e))?;

        self.propagate_managed_nodegroup_tags_to_asg(
            &nodegroup.name,
            nodegroup.tags.clone(),
            info.auto_scaling_groups,
            results,
        );
        Ok(())
    }

    /// Name of the autoscaling group behind a node group stack
    ///
    /// Managed node groups may have several, joined with `,`. When the managed
    /// node group cannot be described the name is empty.
    pub async fn get_auto_scaling_group_name(&self, stack: &Stack) -> Result<String> {
        match get_nodegroup_type(&stack.tags)? {
            NodeGroupType::Managed => {
                let nodegroup_name = get_nodegroup_name(stack);
                match self
                    .eks
                    .describe_nodegroup(&self.cluster.metadata.name, &nodegroup_name)
                    .await
                {
                    Ok(info) => Ok(info.auto_scaling_groups.join(",")),
                    Err(e) => {
                        warn!(
                            "couldn't get managed nodegroup details for nodegroup {:?}: {}",
                            nodegroup_name, e
                        );
                        Ok(String::new())
                    }
                }
            }
            NodeGroupType::Unmanaged => {
                let resource = self
                    .cloudformation
                    .describe_stack_resource(&stack.stack_name, NODEGROUP_RESOURCE)
                    .await
                    .map_err(|e| {
                        ManagerError::service("describing stack resource", &stack.stack_name, e)
                    })?;
                resource
                    .physical_resource_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| ManagerError::AutoScalingGroupNotFound(stack.stack_name.clone()))
            }
        }
    }

    /// Current sizing of the named autoscaling group
    pub async fn get_auto_scaling_group_desired_capacity(
        &self,
        asg_name: &str,
    ) -> Result<AutoScalingGroup> {
        let groups = self
            .autoscaling
            .describe_auto_scaling_groups(&[asg_name.to_string()])
            .await
            .map_err(|e| ManagerError::service("describing asg", asg_name, e))?;

        match <[AutoScalingGroup; 1]>::try_from(groups) {
            Ok([group]) => Ok(group),
            Err(groups) => {
                debug!("found {} asg(s) named {:?}", groups.len(), asg_name);
                Err(ManagerError::AutoScalingGroupNotFound(asg_name.to_string()))
            }
        }
    }
}
