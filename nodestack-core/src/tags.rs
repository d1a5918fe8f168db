//! Reserved tag keys and tag quotas
//!
//! Stacks carry their identity in tags. Node group stacks created by older
//! releases used different keys, so lookups check the legacy variants too.

/// Cluster name tag
pub const CLUSTER_NAME_TAG: &str = "alpha.eksctl.io/cluster-name";

/// Cluster name tag written by the first releases
pub const OLD_CLUSTER_NAME_TAG: &str = "eksctl.cluster.k8s.io/v1alpha1/cluster-name";

/// Node group name tag
pub const NODEGROUP_NAME_TAG: &str = "alpha.eksctl.io/nodegroup-name";

/// Node group name tag used before the `alpha.eksctl.io` prefix
pub const OLD_NODEGROUP_NAME_TAG: &str = "eksctl.io/v1alpha2/nodegroup-name";

/// Node group id tag used by the first releases
pub const OLD_NODEGROUP_ID_TAG: &str = "eksctl.cluster.k8s.io/v1alpha1/nodegroup-id";

/// Node group type tag (`managed` or `unmanaged`)
pub const NODEGROUP_TYPE_TAG: &str = "alpha.eksctl.io/nodegroup-type";

/// Version of the tool that created or last updated the stack
pub const EKSCTL_VERSION_TAG: &str = "alpha.eksctl.io/eksctl-version";

/// Keys that identify a stack as a node group stack, in lookup precedence
pub const NODEGROUP_IDENTITY_TAGS: [&str; 3] =
    [NODEGROUP_NAME_TAG, OLD_NODEGROUP_NAME_TAG, OLD_NODEGROUP_ID_TAG];

/// Maximum number of tags an autoscaling group can hold
pub const MAXIMUM_TAG_NUMBER: usize = 50;

/// Maximum number of tags accepted by a single create-or-update tags call
pub const MAXIMUM_CREATED_TAG_NUMBER_PER_CALL: usize = 25;

/// Prefix of every stack name this tool creates
pub const STACK_NAME_PREFIX: &str = "eksctl";
