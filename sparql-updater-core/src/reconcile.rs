//! Source/target reconciliation
//!
//! A full outer join on dataset id: every source dataset is classified
//! against its target entry, every target entry left over is marked
//! [`DatasetState::ToRemove`].

use crate::dataset::{Dataset, DatasetState, SourceEntry, TargetEntry};
use std::collections::{HashMap, HashSet};

/// Restricts a run to a subset of dataset ids.
///
/// An empty selection means "all datasets".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSelection {
    ids: Option<HashSet<String>>,
}

impl DatasetSelection {
    /// Select every dataset.
    pub fn all() -> Self {
        Self::default()
    }

    /// Select only the given ids. An empty iterator selects everything.
    pub fn only<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: HashSet<String> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id| !id.is_empty())
            .collect();
        Self {
            ids: (!ids.is_empty()).then_some(ids),
        }
    }

    pub fn is_all(&self) -> bool {
        self.ids.is_none()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.as_ref().map_or(true, |ids| ids.contains(id))
    }
}

/// Diff the two inventories into an ordered action list.
///
/// Order: source datasets in source listing order, then target-only datasets
/// in target listing order. A repeated id keeps its first occurrence.
pub fn reconcile(
    source: Vec<SourceEntry>,
    target: Vec<TargetEntry>,
    selection: &DatasetSelection,
) -> Vec<Dataset> {
    let mut target_order: Vec<String> = Vec::with_capacity(target.len());
    let mut remaining: HashMap<String, TargetEntry> = HashMap::with_capacity(target.len());
    for entry in target {
        if !selection.contains(&entry.id) || remaining.contains_key(&entry.id) {
            continue;
        }
        target_order.push(entry.id.clone());
        remaining.insert(entry.id.clone(), entry);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut actions = Vec::with_capacity(source.len() + remaining.len());
    for entry in source {
        if !selection.contains(&entry.id) || !seen.insert(entry.id.clone()) {
            continue;
        }
        let matched = remaining.remove(&entry.id);
        let dataset = Dataset::from_source(entry, matched.as_ref());
        tracing::trace!(dataset = %dataset, state = %dataset.state(), "classified");
        actions.push(dataset);
    }

    for id in target_order {
        if let Some(entry) = remaining.remove(&id) {
            let dataset = Dataset::target_only(entry);
            debug_assert_eq!(dataset.state(), DatasetState::ToRemove);
            actions.push(dataset);
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn states(actions: &[Dataset]) -> Vec<(String, DatasetState)> {
        actions
            .iter()
            .map(|d| (d.id().to_string(), d.state()))
            .collect()
    }

    #[test]
    fn test_outdated_and_missing() {
        let source = vec![SourceEntry::new("A", ts(100)), SourceEntry::new("B", ts(50))];
        let target = vec![TargetEntry::new("A", ts(90))];

        let actions = reconcile(source, target, &DatasetSelection::all());
        assert_eq!(
            states(&actions),
            vec![
                ("A".to_string(), DatasetState::Outdated),
                ("B".to_string(), DatasetState::Missing),
            ]
        );
    }

    #[test]
    fn test_up_to_date_and_to_remove() {
        let source = vec![SourceEntry::new("A", ts(100))];
        let target = vec![TargetEntry::new("A", ts(100)), TargetEntry::new("C", ts(10))];

        let actions = reconcile(source, target, &DatasetSelection::all());
        assert_eq!(
            states(&actions),
            vec![
                ("A".to_string(), DatasetState::UpToDate),
                ("C".to_string(), DatasetState::ToRemove),
            ]
        );
    }

    #[test]
    fn test_target_only_keeps_listing_order() {
        let target = vec![
            TargetEntry::new("z", ts(1)),
            TargetEntry::corrupt("a"),
            TargetEntry::new("m", ts(1)),
        ];
        let actions = reconcile(vec![], target, &DatasetSelection::all());
        let ids: Vec<&str> = actions.iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        assert!(actions.iter().all(|d| d.state() == DatasetState::ToRemove));
    }

    #[test]
    fn test_selection_restricts_both_sides() {
        let source = vec![SourceEntry::new("A", ts(100)), SourceEntry::new("B", ts(100))];
        let target = vec![TargetEntry::new("B", ts(10)), TargetEntry::new("C", ts(10))];

        let actions = reconcile(source, target, &DatasetSelection::only(["B"]));
        assert_eq!(
            states(&actions),
            vec![("B".to_string(), DatasetState::Outdated)]
        );
    }

    #[test]
    fn test_empty_selection_means_all() {
        let selection = DatasetSelection::only(Vec::<String>::new());
        assert!(selection.is_all());
        assert!(selection.contains("anything"));
    }

    #[test]
    fn test_unlisted_ids_never_appear() {
        let source = vec![SourceEntry::new("A", ts(1))];
        let target = vec![TargetEntry::new("B", ts(1))];
        let actions = reconcile(source, target, &DatasetSelection::all());
        assert!(actions.iter().all(|d| d.id() == "A" || d.id() == "B"));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let source = vec![
            SourceEntry::new("3", ts(5)),
            SourceEntry::new("1", ts(5)),
            SourceEntry::new("2", ts(5)),
        ];
        let target = vec![
            TargetEntry::new("9", ts(1)),
            TargetEntry::corrupt("1"),
            TargetEntry::new("8", ts(1)),
            TargetEntry::new("2", ts(9)),
        ];

        let first = states(&reconcile(
            source.clone(),
            target.clone(),
            &DatasetSelection::all(),
        ));
        let second = states(&reconcile(source, target, &DatasetSelection::all()));
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                ("3".to_string(), DatasetState::Missing),
                ("1".to_string(), DatasetState::Corrupt),
                ("2".to_string(), DatasetState::UpToDate),
                ("9".to_string(), DatasetState::ToRemove),
                ("8".to_string(), DatasetState::ToRemove),
            ]
        );
    }

    #[test]
    fn test_duplicate_source_ids_keep_first() {
        let source = vec![SourceEntry::new("A", ts(100)), SourceEntry::new("A", ts(1))];
        let target = vec![TargetEntry::new("A", ts(50))];
        let actions = reconcile(source, target, &DatasetSelection::all());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].state(), DatasetState::Outdated);
    }
}
