//! Stack lifecycle
//!
//! Creation with a background watcher, change set based updates, and the
//! describe/list calls every other part of the collection builds on.

use std::collections::BTreeMap;

use nodestack_client::{CreateChangeSetInput, CreateStackInput, DEFAULT_CAPABILITIES};
use nodestack_core::domain::stack::{
    ChangeSet, ChangeSetStatus, Stack, StackStatus, StackSummary, TemplateData,
};
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{StackCollection, make_cluster_stack_name_from_name, merge_tags};
use crate::builder::ResourceSet;
use crate::error::{ManagerError, Result};
use crate::metadata::get_cluster_name_tag;
use crate::task::{ResultSender, deliver};
use crate::waiter::{Poll, WaitOptions, poll_until};

/// Reasons the service gives for a change set that would not modify the stack
const NO_CHANGES_REASONS: [&str; 2] = ["didn't contain changes", "No updates are to be performed"];

/// Options for [`StackCollection::update_stack`]
#[derive(Debug, Clone)]
pub struct UpdateStackOptions {
    /// Stack to update, looked up by this name unless `stack` is set
    pub stack_name: String,
    /// Already described stack, saves a describe call
    pub stack: Option<Stack>,
    pub change_set_name: String,
    pub description: String,
    pub template_data: TemplateData,
    /// Tags overriding the stack's current tags
    pub tags: BTreeMap<String, String>,
    /// Wait for the stack update to settle after executing the change set
    pub wait: bool,
}

impl StackCollection {
    /// Submits a stack creation
    ///
    /// Returns once the creation request was handled. A template that cannot
    /// be rendered is returned as an error before anything is submitted.
    /// Everything after that, including a rejected submission, is reported as
    /// the single value written to `results`.
    pub async fn create_stack(
        &self,
        stack_name: &str,
        mut resource_set: Box<dyn ResourceSet>,
        tags: &BTreeMap<String, String>,
        cancel: &CancellationToken,
        results: ResultSender,
    ) -> Result<()> {
        let template_body = resource_set
            .render_json()
            .map_err(|e| ManagerError::resource_set(stack_name, e))?;

        let input = CreateStackInput {
            stack_name: stack_name.to_string(),
            template: TemplateData::Body(template_body),
            tags: merge_tags(&[], tags, &self.shared_tags),
            capabilities: default_capabilities(),
            disable_rollback: false,
            client_request_token: Some(format!("eksctl-create-{}", Uuid::new_v4())),
        };

        info!("deploying stack {:?}", stack_name);
        let stack_id = match self.cloudformation.create_stack(input).await {
            Ok(stack_id) => stack_id,
            Err(e) => {
                deliver(
                    &results,
                    Err(ManagerError::service("creating stack", stack_name, e)),
                );
                return Ok(());
            }
        };
        debug!("stack {:?} submitted as {}", stack_name, stack_id);

        let collection = self.clone();
        let stack_name = stack_name.to_string();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = collection
                .wait_until_stack_is_created(&stack_name, resource_set.as_mut(), &cancel)
                .await;
            deliver(&results, result);
        });

        Ok(())
    }

    async fn wait_until_stack_is_created(
        &self,
        stack_name: &str,
        resource_set: &mut dyn ResourceSet,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let wait = WaitOptions::new(
            format!("stack {:?}", stack_name),
            StackStatus::CreateComplete.as_str(),
            &self.config,
            self.config.create_timeout,
        );
        let stack = poll_until(&wait, cancel, || self.poll_stack_created(stack_name)).await?;

        resource_set
            .get_all_outputs(&stack)
            .map_err(|e| ManagerError::resource_set(stack_name, e))?;

        info!("created stack {:?}", stack_name);
        Ok(())
    }

    async fn poll_stack_created(&self, stack_name: &str) -> Result<Poll<Stack>> {
        Ok(classify_create(self.describe_stack(stack_name).await?))
    }

    /// Updates a stack through a change set
    ///
    /// A change set the service rejects for not containing any change is not
    /// an error: the stack is left as it is and nothing is executed.
    pub async fn update_stack(
        &self,
        options: UpdateStackOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let stack = match options.stack {
            Some(stack) => stack,
            None => self.describe_stack(&options.stack_name).await?,
        };
        let stack_name = stack.stack_name.clone();
        let change_set_name = options.change_set_name;

        let input = CreateChangeSetInput {
            stack_name: stack_name.clone(),
            change_set_name: change_set_name.clone(),
            description: options.description,
            template: options.template_data,
            tags: merge_tags(&stack.tags, &options.tags, &self.shared_tags),
            capabilities: default_capabilities(),
            client_token: None,
        };

        info!(
            "creating changeset {:?} for stack {:?}",
            change_set_name, stack_name
        );
        self.cloudformation
            .create_change_set(input)
            .await
            .map_err(|e| ManagerError::service("creating change set", &stack_name, e))?;

        match self
            .wait_until_change_set_created(&stack_name, &change_set_name, cancel)
            .await
        {
            Ok(change_set) => {
                debug!(
                    "changes for stack {:?}: {:?}",
                    stack_name, change_set.changes
                );
            }
            Err(ManagerError::NoChanges { .. }) => {
                info!("nothing to update in stack {:?}", stack_name);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = self
            .cloudformation
            .execute_change_set(&stack_name, &change_set_name)
            .await
        {
            warn!(
                "error executing changeset {:?} of stack {:?}: {}",
                change_set_name, stack_name, e
            );
            return Err(ManagerError::service(
                "executing change set",
                &stack_name,
                e,
            ));
        }

        if options.wait {
            self.wait_until_stack_is_updated(&stack_name, cancel).await?;
        }
        Ok(())
    }

    async fn wait_until_change_set_created(
        &self,
        stack_name: &str,
        change_set_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ChangeSet> {
        let wait = WaitOptions::new(
            format!("changeset {:?} of stack {:?}", change_set_name, stack_name),
            ChangeSetStatus::CreateComplete.as_str(),
            &self.config,
            self.config.change_set_timeout,
        );
        let change_set = poll_until(&wait, cancel, || {
            self.poll_change_set(stack_name, change_set_name)
        })
        .await?;

        check_change_set(change_set)
    }

    async fn poll_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<Poll<ChangeSet>> {
        let change_set = self
            .cloudformation
            .describe_change_set(stack_name, change_set_name)
            .await
            .map_err(|e| ManagerError::service("describing change set", stack_name, e))?;
        Ok(classify_change_set(change_set))
    }

    async fn wait_until_stack_is_updated(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let wait = WaitOptions::new(
            format!("stack {:?}", stack_name),
            StackStatus::UpdateComplete.as_str(),
            &self.config,
            self.config.update_timeout,
        );
        poll_until(&wait, cancel, || self.poll_stack_updated(stack_name)).await?;

        info!("updated stack {:?}", stack_name);
        Ok(())
    }

    async fn poll_stack_updated(&self, stack_name: &str) -> Result<Poll<()>> {
        Ok(classify_update(self.describe_stack(stack_name).await?))
    }

    /// Describes the named stack
    pub async fn describe_stack(&self, stack_name: &str) -> Result<Stack> {
        let stacks = self
            .cloudformation
            .describe_stacks(stack_name)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ManagerError::StackNotFound(stack_name.to_string())
                } else {
                    ManagerError::service("describing stack", stack_name, e)
                }
            })?;

        stacks
            .into_iter()
            .find(|stack| stack.stack_name == stack_name)
            .ok_or_else(|| ManagerError::StackNotFound(stack_name.to_string()))
    }

    /// Lists the summaries of every stack that is not deleted
    pub async fn list_stack_summaries(&self) -> Result<Vec<StackSummary>> {
        let status_filter: Vec<StackStatus> = StackStatus::ALL
            .into_iter()
            .filter(|status| *status != StackStatus::DeleteComplete)
            .collect();

        let mut summaries = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .cloudformation
                .list_stacks(&status_filter, next_token)
                .await
                .map_err(|e| ManagerError::service("listing stacks", "*", e))?;
            summaries.extend(page.stack_summaries);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(summaries)
    }

    /// Describes every listed stack whose name matches `pattern`
    ///
    /// Stacks that disappear between the listing and the describe call are
    /// skipped.
    pub async fn list_stacks_matching(&self, pattern: &str) -> Result<Vec<Stack>> {
        let re = Regex::new(pattern)?;

        let mut stacks = Vec::new();
        for summary in self.list_stack_summaries().await? {
            if !re.is_match(&summary.stack_name) {
                continue;
            }
            match self.describe_stack(&summary.stack_name).await {
                Ok(stack) => stacks.push(stack),
                Err(e) if e.is_not_found() => {
                    debug!("stack {:?} is gone, skipping it", summary.stack_name);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(stacks)
    }

    /// Describes every stack belonging to this cluster
    pub async fn describe_stacks(&self) -> Result<Vec<Stack>> {
        let stacks = self
            .list_stacks_matching(&cluster_stacks_pattern(&self.cluster.metadata.name))
            .await?;
        debug!(
            "found {} stack(s) for cluster {:?}",
            stacks.len(),
            self.cluster.metadata.name
        );
        Ok(stacks)
    }

    /// Describes the cluster stack, or `None` when it was never created here
    pub async fn get_cluster_stack_if_exists(&self) -> Result<Option<Stack>> {
        let cluster_stack_name = self.make_cluster_stack_name();
        let listed = self
            .list_stack_summaries()
            .await?
            .iter()
            .any(|summary| summary.stack_name == cluster_stack_name);

        if !listed {
            return Ok(None);
        }
        self.describe_stack(&cluster_stack_name).await.map(Some)
    }

    /// Checks whether `stack_names` holds the stack of the named cluster
    ///
    /// A listed stack only counts when its cluster name tag matches.
    pub async fn has_cluster_stack_from_list(
        &self,
        stack_names: &[String],
        cluster_name: &str,
    ) -> Result<bool> {
        let cluster_stack_name = make_cluster_stack_name_from_name(cluster_name);
        if !stack_names.contains(&cluster_stack_name) {
            return Ok(false);
        }

        let stack = self.describe_stack(&cluster_stack_name).await?;
        Ok(get_cluster_name_tag(&stack) == Some(cluster_name))
    }
}

fn default_capabilities() -> Vec<String> {
    DEFAULT_CAPABILITIES.iter().map(ToString::to_string).collect()
}

fn cluster_stacks_pattern(cluster_name: &str) -> String {
    format!(
        "^(eksctl|EKS)-{}-((cluster|nodegroup-.+|addon-.+|fargate|karpenter)|(VPC|ServiceRole|ControlPlane|DefaultNodeGroup))$",
        regex::escape(cluster_name)
    )
}

fn stack_failure<T>(stack: Stack) -> Poll<T> {
    Poll::Failed {
        status: stack.stack_status.to_string(),
        reason: stack.stack_status_reason.unwrap_or_default(),
    }
}

fn classify_create(stack: Stack) -> Poll<Stack> {
    match stack.stack_status {
        StackStatus::CreateComplete => Poll::Done(stack),
        StackStatus::CreateInProgress | StackStatus::ReviewInProgress => {
            Poll::Pending(stack.stack_status.to_string())
        }
        _ => stack_failure(stack),
    }
}

fn classify_update(stack: Stack) -> Poll<()> {
    match stack.stack_status {
        StackStatus::UpdateComplete => Poll::Done(()),
        StackStatus::UpdateInProgress | StackStatus::UpdateCompleteCleanupInProgress => {
            Poll::Pending(stack.stack_status.to_string())
        }
        _ => stack_failure(stack),
    }
}

/// Any settled change set is done; whether it can be executed is decided by
/// [`check_change_set`]
fn classify_change_set(change_set: ChangeSet) -> Poll<ChangeSet> {
    match change_set.status {
        ChangeSetStatus::CreateComplete | ChangeSetStatus::Failed => Poll::Done(change_set),
        ChangeSetStatus::CreatePending | ChangeSetStatus::CreateInProgress => {
            Poll::Pending(change_set.status.to_string())
        }
        status => Poll::Failed {
            status: status.to_string(),
            reason: change_set.status_reason.unwrap_or_default(),
        },
    }
}

fn check_change_set(change_set: ChangeSet) -> Result<ChangeSet> {
    if change_set.status == ChangeSetStatus::CreateComplete {
        return Ok(change_set);
    }

    let reason = change_set.status_reason.unwrap_or_default();
    if NO_CHANGES_REASONS.iter().any(|r| reason.contains(r)) {
        return Err(ManagerError::NoChanges {
            stack: change_set.stack_name,
            change_set: change_set.change_set_name,
        });
    }

    Err(ManagerError::WaitFailed {
        resource: format!(
            "changeset {:?} of stack {:?}",
            change_set.change_set_name, change_set.stack_name
        ),
        target: ChangeSetStatus::CreateComplete.as_str(),
        status: change_set.status.to_string(),
        reason,
    })
}
