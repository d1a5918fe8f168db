//! Stack metadata resolution
//!
//! Node group identity, type and tool version are derived from a stack's tags
//! only. Stacks that predate the tags are recognized by their name suffix.

use nodestack_core::domain::nodegroup::{NodeGroupStack, NodeGroupType};
use nodestack_core::domain::stack::{Stack, StackStatus, Tag};
use nodestack_core::tags::{
    CLUSTER_NAME_TAG, EKSCTL_VERSION_TAG, NODEGROUP_IDENTITY_TAGS, NODEGROUP_TYPE_TAG,
    OLD_CLUSTER_NAME_TAG,
};
use semver::{BuildMetadata, Prerelease, Version};
use tracing::{debug, warn};

use crate::error::{ManagerError, Result};

const LEGACY_NODEGROUP_0_SUFFIX: &str = "-nodegroup-0";
const LEGACY_DEFAULT_SUFFIX: &str = "-DefaultNodeGroup";

/// Name given to legacy `-nodegroup-0` stacks
pub const LEGACY_NODEGROUP_0_NAME: &str = "legacy-nodegroup-0";

/// Name given to legacy `-DefaultNodeGroup` stacks
pub const LEGACY_DEFAULT_NAME: &str = "legacy-default";

fn tag_value<'a>(tags: &'a [Tag], key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|tag| tag.key == key)
        .map(|tag| tag.value.as_str())
}

/// Node group name carried by the tags, checking the legacy keys too
pub fn get_nodegroup_tag_name(tags: &[Tag]) -> Option<&str> {
    NODEGROUP_IDENTITY_TAGS
        .iter()
        .find_map(|key| tag_value(tags, key))
        .filter(|name| !name.is_empty())
}

/// Node group type of a stack
///
/// Errors when the stack has no node group name tag. A missing type tag means
/// the stack was created before the tag existed, which makes it unmanaged.
pub fn get_nodegroup_type(tags: &[Tag]) -> Result<NodeGroupType> {
    if get_nodegroup_tag_name(tags).is_none() {
        return Err(ManagerError::MissingIdentityTag);
    }

    let nodegroup_type = match tag_value(tags, NODEGROUP_TYPE_TAG) {
        None => NodeGroupType::Unmanaged,
        Some(value) => NodeGroupType::from_tag_value(value).unwrap_or_else(|| {
            warn!(
                "unexpected nodegroup type {:?}, treating it as {}",
                value,
                NodeGroupType::Unmanaged
            );
            NodeGroupType::Unmanaged
        }),
    };

    Ok(nodegroup_type)
}

/// Node group name of a stack, or an empty string for other stacks
pub fn get_nodegroup_name(stack: &Stack) -> String {
    if let Some(name) = get_nodegroup_tag_name(&stack.tags) {
        return name.to_string();
    }
    if stack.stack_name.ends_with(LEGACY_NODEGROUP_0_SUFFIX) {
        return LEGACY_NODEGROUP_0_NAME.to_string();
    }
    if stack.stack_name.ends_with(LEGACY_DEFAULT_SUFFIX) {
        return LEGACY_DEFAULT_NAME.to_string();
    }
    String::new()
}

/// Cluster name carried by the stack tags
pub fn get_cluster_name_tag(stack: &Stack) -> Option<&str> {
    stack
        .tag(CLUSTER_NAME_TAG)
        .or_else(|| stack.tag(OLD_CLUSTER_NAME_TAG))
}

/// Parses a tool version, ignoring pre-release and build metadata
pub fn parse_eksctl_version(value: &str) -> std::result::Result<Version, semver::Error> {
    let mut version = Version::parse(value.trim().trim_start_matches('v'))?;
    version.pre = Prerelease::EMPTY;
    version.build = BuildMetadata::EMPTY;
    Ok(version)
}

/// Version of the tool that created or last updated the stack
///
/// `Ok(None)` when the stack has no version tag. A tag that is not a version
/// is an error, never skipped.
pub fn get_eksctl_version_from_tags(tags: &[Tag]) -> Result<Option<Version>> {
    let Some(value) = tag_value(tags, EKSCTL_VERSION_TAG) else {
        return Ok(None);
    };

    parse_eksctl_version(value)
        .map(Some)
        .map_err(|source| ManagerError::VersionParse {
            value: value.to_string(),
            source,
        })
}

/// Keeps the stacks that are live node group stacks
///
/// Deleted stacks are skipped. Stacks that failed to delete are reported and
/// skipped; cleaning them up is left to the operator.
pub fn filter_nodegroup_stacks(stacks: Vec<Stack>) -> Vec<Stack> {
    let nodegroup_stacks: Vec<Stack> = stacks
        .into_iter()
        .filter(|stack| match stack.stack_status {
            StackStatus::DeleteComplete => false,
            StackStatus::DeleteFailed => {
                warn!(
                    "stack's status of nodegroup named {} is {}",
                    stack.stack_name, stack.stack_status
                );
                false
            }
            _ => !get_nodegroup_name(stack).is_empty(),
        })
        .collect();

    debug!(
        "nodegroups = {:?}",
        nodegroup_stacks
            .iter()
            .map(|stack| stack.stack_name.as_str())
            .collect::<Vec<_>>()
    );
    nodegroup_stacks
}

/// Resolves a node group stack into its name/type view
///
/// Legacy stacks recognized by name only predate managed node groups, so they
/// resolve as unmanaged.
pub fn resolve_nodegroup_stack(stack: Stack) -> Result<NodeGroupStack> {
    let nodegroup_name = get_nodegroup_name(&stack);
    let nodegroup_type = match get_nodegroup_type(&stack.tags) {
        Ok(nodegroup_type) => nodegroup_type,
        Err(ManagerError::MissingIdentityTag) if !nodegroup_name.is_empty() => {
            NodeGroupType::Unmanaged
        }
        Err(e) => return Err(e),
    };

    Ok(NodeGroupStack {
        nodegroup_name,
        nodegroup_type,
        stack,
    })
}
