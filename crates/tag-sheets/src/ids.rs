//! Identifier scheme for grouped tags
//!
//! A group with offset `n` owns the identifiers `n+100, n+200, ..., n+900`,
//! one per level. Groups of a collection take consecutive offsets.

use crate::constants::{GROUP_SIZE, GROUP_STEP, MAX_GROUP_OFFSET};
use crate::types::*;
use std::collections::HashSet;

/// Identifiers of the group with the given offset, in increasing order
pub fn generate_group_ids(offset: i64) -> Result<Vec<TagId>> {
    if !(0..=MAX_GROUP_OFFSET).contains(&offset) {
        return Err(TagSheetError::InvalidRange { offset });
    }

    (1..=GROUP_SIZE)
        .map(|level| TagId::new(offset as u64 + u64::from(level * GROUP_STEP)))
        .collect()
}

/// Groups of a collection, in the order their names were given
///
/// Fails without producing any group when a name repeats or when the last
/// offset would leave the valid range.
pub fn generate_collection_groups(
    group_names: &[impl AsRef<str>],
    start_offset: i64,
) -> Result<Vec<Group>> {
    generate_named_collection_groups("", group_names, start_offset)
}

pub(crate) fn generate_named_collection_groups(
    collection: &str,
    group_names: &[impl AsRef<str>],
    start_offset: i64,
) -> Result<Vec<Group>> {
    let mut seen = HashSet::new();
    for name in group_names {
        if !seen.insert(name.as_ref()) {
            return Err(TagSheetError::DuplicateGroupName {
                collection: collection.to_string(),
                name: name.as_ref().to_string(),
            });
        }
    }

    group_names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let offset = start_offset + position as i64;
            let ids = generate_group_ids(offset)?;
            Ok(Group {
                name: name.as_ref().to_string(),
                offset: offset as u8,
                ids,
            })
        })
        .collect()
}
