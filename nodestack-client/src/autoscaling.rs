//! Autoscaling API

use async_trait::async_trait;
use nodestack_core::domain::autoscaling::{AsgTag, AutoScalingGroup};

use crate::error::Result;

/// Autoscaling group operations
#[async_trait]
pub trait AutoScalingApi: Send + Sync {
    /// Lists the tags currently set on the named autoscaling groups
    async fn describe_tags(&self, auto_scaling_group_names: &[String]) -> Result<Vec<AsgTag>>;

    /// Creates or overwrites tags
    ///
    /// The service accepts at most
    /// [`MAXIMUM_CREATED_TAG_NUMBER_PER_CALL`](nodestack_core::tags::MAXIMUM_CREATED_TAG_NUMBER_PER_CALL)
    /// tags per call.
    async fn create_or_update_tags(&self, tags: Vec<AsgTag>) -> Result<()>;

    /// Describes the named autoscaling groups
    async fn describe_auto_scaling_groups(
        &self,
        auto_scaling_group_names: &[String],
    ) -> Result<Vec<AutoScalingGroup>>;
}
