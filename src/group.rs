//! Per-bucket grouping into sorted key runs.

use crate::types::{Bucket, KeyGroup, TableTag};
use std::collections::BTreeMap;

/// Collapse one bucket into key groups ordered by key value. Records
/// within a group keep arrival order, which makes per-bucket output
/// deterministic. Keys present in only one table yield a group with one
/// empty side; whether such a group produces output is the joiner's call.
///
/// Grouping is in-memory. Spilling an over-budget bucket to an external
/// sort is an extension point this core does not implement.
pub fn group_bucket(bucket: Bucket) -> Vec<KeyGroup> {
    let mut groups: BTreeMap<String, KeyGroup> = BTreeMap::new();

    for record in bucket.records {
        let group = groups
            .entry(record.join_key.clone())
            .or_insert_with(|| KeyGroup {
                key: record.join_key.clone(),
                left: Vec::new(),
                right: Vec::new(),
            });
        match record.tag {
            TableTag::Left => group.left.push(record),
            TableTag::Right => group.right.push(record),
        }
    }

    groups.into_values().collect()
}
