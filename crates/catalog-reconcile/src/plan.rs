//! Diffing desired entries against observed entries.

use std::collections::{BTreeMap, HashMap, HashSet};

use catalog_core::{AttributeBinding, DesiredEntry, ObservedEntry};
use tracing::warn;

/// An observed entry that needs updating to match a desired entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpdate {
    pub entry_id: String,
    pub desired: DesiredEntry,
}

/// The operations needed to converge one catalog type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_delete: Vec<ObservedEntry>,
    pub to_create: Vec<DesiredEntry>,
    pub to_update: Vec<PlannedUpdate>,
    /// Matched entries that are already up to date.
    pub unchanged: usize,
}

impl ReconciliationPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_create.is_empty() && self.to_update.is_empty()
    }
}

/// Compute the operations that converge `observed` to `desired`.
///
/// Entries join on external id. Observed entries without an external id, or
/// with one no desired entry has, are deleted when `prune` is set. Desired
/// entries sharing an external id are all kept.
#[must_use]
pub fn plan(
    observed: &[ObservedEntry],
    desired: &[DesiredEntry],
    writable_attribute_ids: &[String],
    prune: bool,
) -> ReconciliationPlan {
    let mut desired_ids = HashSet::with_capacity(desired.len());
    for entry in desired {
        if !desired_ids.insert(entry.external_id.as_str()) {
            warn!(
                external_id = %entry.external_id,
                "Multiple desired entries share an external id, each will be created"
            );
        }
    }

    let observed_by_external_id: HashMap<&str, &ObservedEntry> = observed
        .iter()
        .filter_map(|entry| entry.external_id.as_deref().map(|id| (id, entry)))
        .collect();

    let to_delete = if prune {
        observed
            .iter()
            .filter(|entry| {
                entry
                    .external_id
                    .as_deref()
                    .map_or(true, |id| !desired_ids.contains(id))
            })
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    let mut to_create = Vec::new();
    let mut to_update = Vec::new();
    let mut unchanged = 0;
    for entry in desired {
        match observed_by_external_id.get(entry.external_id.as_str()) {
            None => to_create.push(entry.clone()),
            Some(current) if entry_matches(current, entry, writable_attribute_ids) => unchanged += 1,
            Some(current) => to_update.push(PlannedUpdate {
                entry_id: current.id.clone(),
                desired: entry.clone(),
            }),
        }
    }

    ReconciliationPlan {
        to_delete,
        to_create,
        to_update,
        unchanged,
    }
}

/// Whether an observed entry already matches a desired entry.
///
/// Compares name, rank (absent counts as 0), aliases in order and the
/// bindings of api-writable attributes. An absent binding equals an empty
/// list.
#[must_use]
pub fn entry_matches(
    observed: &ObservedEntry,
    desired: &DesiredEntry,
    writable_attribute_ids: &[String],
) -> bool {
    observed.name == desired.name
        && observed.rank.unwrap_or(0) == desired.rank.unwrap_or(0)
        && observed.aliases == desired.aliases
        && comparable_bindings(&observed.attribute_values, writable_attribute_ids)
            == comparable_bindings(&desired.attribute_values, writable_attribute_ids)
}

fn comparable_bindings<'a>(
    values: &'a BTreeMap<String, AttributeBinding>,
    writable_attribute_ids: &[String],
) -> BTreeMap<&'a str, &'a AttributeBinding> {
    values
        .iter()
        .filter(|(id, binding)| writable_attribute_ids.contains(id) && !binding.is_empty())
        .map(|(id, binding)| (id.as_str(), binding))
        .collect()
}
