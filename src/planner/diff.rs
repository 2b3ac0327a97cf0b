//! Diff engine for comparing declared vs live state.
//!
//! Items are keyed on display name within each kind. The result is a total
//! partition of the union of declared and live names, per kind.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{PlanError, Result};
use crate::items::{Item, ItemKind, DEFAULT_LAKEHOUSE};

/// Engine for computing diffs between declared and live items.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffEngine;

/// Lakehouse partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LakehouseDiff {
    /// Declared but not live: to be created.
    pub new: BTreeSet<String>,
    /// Declared and live: left as is.
    pub ignore: BTreeSet<String>,
    /// Live but not declared: to be deleted.
    pub dangling: BTreeSet<String>,
}

/// Notebook partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotebookDiff {
    /// Declared but not live: to be created.
    pub new: BTreeSet<String>,
    /// Declared and live: an update would be needed (not supported).
    pub update: BTreeSet<String>,
    /// Live but not declared: a delete would be needed (not supported).
    pub dangling: BTreeSet<String>,
}

/// Complete diff result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Lakehouse partitions.
    pub lakehouse: LakehouseDiff,
    /// Notebook partitions.
    pub notebook: NotebookDiff,
}

/// The three-way split of two name sets.
struct Partition {
    only_declared: BTreeSet<String>,
    both: BTreeSet<String>,
    only_live: BTreeSet<String>,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between declared and live items.
    ///
    /// Items of unmanaged types are ignored.
    #[must_use]
    pub fn diff(&self, declared: &[Item], live: &[Item]) -> DiffResult {
        let lakehouses = Self::partition(declared, live, ItemKind::Lakehouse);
        let notebooks = Self::partition(declared, live, ItemKind::Notebook);

        let result = DiffResult {
            lakehouse: LakehouseDiff {
                new: lakehouses.only_declared,
                ignore: lakehouses.both,
                dangling: lakehouses.only_live,
            },
            notebook: NotebookDiff {
                new: notebooks.only_declared,
                update: notebooks.both,
                dangling: notebooks.only_live,
            },
        };

        debug!(
            "Diff: lakehouses +{} ={} -{}, notebooks +{} ~{} -{}",
            result.lakehouse.new.len(),
            result.lakehouse.ignore.len(),
            result.lakehouse.dangling.len(),
            result.notebook.new.len(),
            result.notebook.update.len(),
            result.notebook.dangling.len()
        );

        result
    }

    /// Checks preconditions on the declared state.
    ///
    /// # Errors
    ///
    /// Returns an error if the default lakehouse is not declared.
    pub fn run_source_checks(&self, declared: &[Item]) -> Result<()> {
        let has_default = declared
            .iter()
            .any(|i| i.is(ItemKind::Lakehouse) && i.display_name == DEFAULT_LAKEHOUSE);

        if !has_default {
            return Err(PlanError::MissingDefaultLakehouse {
                name: String::from(DEFAULT_LAKEHOUSE),
            }
            .into());
        }

        Ok(())
    }

    /// Splits declared and live names of one kind.
    fn partition(declared: &[Item], live: &[Item], kind: ItemKind) -> Partition {
        let names = |items: &[Item]| -> BTreeSet<String> {
            items
                .iter()
                .filter(|i| i.is(kind))
                .map(|i| i.display_name.clone())
                .collect()
        };

        let d = names(declared);
        let l = names(live);

        Partition {
            only_declared: d.difference(&l).cloned().collect(),
            both: d.intersection(&l).cloned().collect(),
            only_live: l.difference(&d).cloned().collect(),
        }
    }
}

impl DiffResult {
    /// Returns true if nothing would be created or deleted.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.lakehouse.new.is_empty() && self.lakehouse.dangling.is_empty() && self.notebook.new.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lakehouse(name: &str) -> Item {
        Item::declared(ItemKind::Lakehouse, name)
    }

    fn notebook(name: &str) -> Item {
        Item::declared(ItemKind::Notebook, name)
    }

    fn live(item_type: &str, name: &str) -> Item {
        Item::observed(format!("id-{name}"), item_type, name)
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_lakehouse_partitions() {
        let declared = vec![lakehouse("A"), lakehouse(DEFAULT_LAKEHOUSE), notebook("N")];
        let remote = vec![live("Lakehouse", DEFAULT_LAKEHOUSE), live("Lakehouse", "B")];

        let diff = DiffEngine::new().diff(&declared, &remote);

        assert_eq!(diff.lakehouse.new, set(&["A"]));
        assert_eq!(diff.lakehouse.ignore, set(&[DEFAULT_LAKEHOUSE]));
        assert_eq!(diff.lakehouse.dangling, set(&["B"]));
        assert_eq!(diff.notebook.new, set(&["N"]));
        assert!(diff.notebook.update.is_empty());
        assert!(diff.notebook.dangling.is_empty());
    }

    #[test]
    fn test_partitions_are_total_and_disjoint() {
        let declared = vec![lakehouse("A"), lakehouse("C"), notebook("N1"), notebook("N2")];
        let remote = vec![
            live("Lakehouse", "C"),
            live("Lakehouse", "D"),
            live("Notebook", "N2"),
            live("Notebook", "N3"),
        ];

        let diff = DiffEngine::new().diff(&declared, &remote);

        let lh = &diff.lakehouse;
        assert!(lh.new.is_disjoint(&lh.ignore));
        assert!(lh.new.is_disjoint(&lh.dangling));
        assert!(lh.ignore.is_disjoint(&lh.dangling));
        let lh_union: BTreeSet<String> = lh.new.iter().chain(&lh.ignore).chain(&lh.dangling).cloned().collect();
        assert_eq!(lh_union, set(&["A", "C", "D"]));

        let nb = &diff.notebook;
        assert_eq!(nb.new, set(&["N1"]));
        assert_eq!(nb.update, set(&["N2"]));
        assert_eq!(nb.dangling, set(&["N3"]));
    }

    fn assert_partition(
        parts: [&BTreeSet<String>; 3],
        declared: &BTreeSet<String>,
        live: &BTreeSet<String>,
    ) {
        let [new, both, dangling] = parts;
        assert!(new.is_disjoint(both));
        assert!(new.is_disjoint(dangling));
        assert!(both.is_disjoint(dangling));

        let union: BTreeSet<String> = new.iter().chain(both).chain(dangling).cloned().collect();
        let expected: BTreeSet<String> = declared.union(live).cloned().collect();
        assert_eq!(union, expected);

        assert_eq!(*new, declared.difference(live).cloned().collect::<BTreeSet<_>>());
        assert_eq!(*both, declared.intersection(live).cloned().collect::<BTreeSet<_>>());
        assert_eq!(*dangling, live.difference(declared).cloned().collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_partitions_hold_for_every_subset_pair() {
        const NAMES: [&str; 4] = ["A", "B", "C", "D"];
        let subset = |mask: usize| -> BTreeSet<String> {
            NAMES
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| (*n).to_string())
                .collect()
        };

        for declared_mask in 0..16 {
            for live_mask in 0..16 {
                let declared_names = subset(declared_mask);
                let live_names = subset(live_mask);
                // Notebooks use a shifted pair so the two kinds differ.
                let nb_declared = subset(live_mask ^ 0b0101);
                let nb_live = subset(declared_mask ^ 0b1010);

                let declared: Vec<Item> = declared_names
                    .iter()
                    .map(|n| lakehouse(n))
                    .chain(nb_declared.iter().map(|n| notebook(n)))
                    .collect();
                let remote: Vec<Item> = live_names
                    .iter()
                    .map(|n| live("Lakehouse", n))
                    .chain(nb_live.iter().map(|n| live("Notebook", n)))
                    .collect();

                let diff = DiffEngine::new().diff(&declared, &remote);

                let lh = &diff.lakehouse;
                assert_partition([&lh.new, &lh.ignore, &lh.dangling], &declared_names, &live_names);
                let nb = &diff.notebook;
                assert_partition([&nb.new, &nb.update, &nb.dangling], &nb_declared, &nb_live);
            }
        }
    }

    #[test]
    fn test_diff_is_idempotent() {
        let declared = vec![lakehouse("A"), notebook("N")];
        let remote = vec![live("Lakehouse", "B")];
        let engine = DiffEngine::new();

        assert_eq!(engine.diff(&declared, &remote), engine.diff(&declared, &remote));
    }

    #[test]
    fn test_kinds_are_independent() {
        let declared = vec![lakehouse("shared")];
        let remote = vec![live("Notebook", "shared")];

        let diff = DiffEngine::new().diff(&declared, &remote);

        assert_eq!(diff.lakehouse.new, set(&["shared"]));
        assert_eq!(diff.notebook.dangling, set(&["shared"]));
    }

    #[test]
    fn test_unmanaged_types_are_ignored() {
        let remote = vec![live("SemanticModel", "sales"), live("Report", "sales")];

        let diff = DiffEngine::new().diff(&[], &remote);

        assert_eq!(diff, DiffResult::default());
        assert!(diff.is_converged());
    }

    #[test]
    fn test_source_checks() {
        let engine = DiffEngine::new();

        assert!(engine.run_source_checks(&[lakehouse(DEFAULT_LAKEHOUSE)]).is_ok());

        let result = engine.run_source_checks(&[lakehouse("A"), notebook(DEFAULT_LAKEHOUSE)]);
        assert!(matches!(
            result,
            Err(crate::error::FabricDeployError::Plan(PlanError::MissingDefaultLakehouse { .. }))
        ));
    }
}
