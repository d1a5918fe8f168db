//! Stack service API
//!
//! Stacks, change sets and stack resources. Every call goes to the service;
//! nothing is cached on this side.

use async_trait::async_trait;
use nodestack_core::domain::stack::{
    ChangeSet, Stack, StackResource, StackStatus, StackSummary, Tag, TemplateData,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Capabilities acknowledged on every stack this tool submits
pub const DEFAULT_CAPABILITIES: [&str; 2] = ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// Request to create a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStackInput {
    pub stack_name: String,
    pub template: TemplateData,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<String>,
    pub disable_rollback: bool,
    /// Idempotency token for retried submissions
    pub client_request_token: Option<String>,
}

/// Request to create a change set against an existing stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateChangeSetInput {
    pub stack_name: String,
    pub change_set_name: String,
    pub description: String,
    pub template: TemplateData,
    pub tags: Vec<Tag>,
    pub capabilities: Vec<String>,
    pub client_token: Option<String>,
}

/// One page of a stack listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListStacksPage {
    pub stack_summaries: Vec<StackSummary>,
    pub next_token: Option<String>,
}

/// Stack service operations
#[async_trait]
pub trait CloudFormationApi: Send + Sync {
    /// Submits a stack creation, returning the stack id
    async fn create_stack(&self, input: CreateStackInput) -> Result<String>;

    /// Describes the named stack
    ///
    /// An unknown stack is either an empty list or a not-found error,
    /// depending on the backend.
    async fn describe_stacks(&self, stack_name: &str) -> Result<Vec<Stack>>;

    /// Lists stack summaries with one of the given statuses
    async fn list_stacks(
        &self,
        status_filter: &[StackStatus],
        next_token: Option<String>,
    ) -> Result<ListStacksPage>;

    /// Describes every resource of a stack
    async fn describe_stack_resources(&self, stack_name: &str) -> Result<Vec<StackResource>>;

    /// Describes one resource of a stack by logical id
    async fn describe_stack_resource(
        &self,
        stack_name: &str,
        logical_resource_id: &str,
    ) -> Result<StackResource>;

    /// Requests a change set, returning its id
    async fn create_change_set(&self, input: CreateChangeSetInput) -> Result<String>;

    /// Describes a change set
    async fn describe_change_set(&self, stack_name: &str, change_set_name: &str)
    -> Result<ChangeSet>;

    /// Starts applying a change set
    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()>;
}
