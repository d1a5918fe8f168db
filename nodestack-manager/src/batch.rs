//! Tag batching
//!
//! Splits tag records into call-sized batches for APIs that cap how many tags
//! a single request may carry.

use std::collections::BTreeMap;

use nodestack_core::domain::autoscaling::AsgTag;

/// Splits `records` into consecutive batches of at most `max_size` items
///
/// Only the last batch may be shorter. Concatenating the batches gives back
/// `records` in the original order.
///
/// # Panics
/// If `max_size` is 0.
pub fn chunk<T>(records: Vec<T>, max_size: usize) -> Vec<Vec<T>> {
    assert!(max_size > 0, "batch size must be greater than 0");

    let mut batches = Vec::with_capacity(records.len().div_ceil(max_size));
    let mut records = records.into_iter().peekable();
    while records.peek().is_some() {
        batches.push(records.by_ref().take(max_size).collect());
    }
    batches
}

/// One propagation record per autoscaling group and tag
///
/// Groups keep the given order and tags are sorted by key, so the same input
/// always yields the same batches.
pub fn asg_tag_records(asg_names: &[String], tags: &BTreeMap<String, String>) -> Vec<AsgTag> {
    asg_names
        .iter()
        .flat_map(|asg| {
            tags.iter()
                .map(move |(key, value)| AsgTag::for_auto_scaling_group(asg.as_str(), key, value))
        })
        .collect()
}
