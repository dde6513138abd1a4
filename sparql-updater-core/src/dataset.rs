//! Dataset entity and state model
//!
//! A [`Dataset`] is built fresh for every run: the source pass gives it an id
//! and a source timestamp, the target pass enriches it, and [`classify`]
//! assigns the [`DatasetState`] that tells the updater what to do with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// What the updater has to do with a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetState {
    /// Target graph carries the same (or a newer) timestamp as the source
    UpToDate,
    /// Source archive is newer than the target graph
    Outdated,
    /// Target graph has no trustworthy provenance timestamp
    Corrupt,
    /// Dataset exists at the source only
    Missing,
    /// Dataset exists at the target only
    ToRemove,
}

impl fmt::Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatasetState::UpToDate => "up-to-date",
            DatasetState::Outdated => "outdated",
            DatasetState::Corrupt => "corrupt",
            DatasetState::Missing => "missing",
            DatasetState::ToRemove => "to-remove",
        };
        f.write_str(s)
    }
}

/// One dataset as listed by the source mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub id: String,
    /// Last-modified time of the dataset archive
    pub modified: DateTime<Utc>,
}

impl SourceEntry {
    pub fn new(id: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            modified,
        }
    }
}

/// One dataset as listed by the target store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub id: String,
    /// Provenance timestamp read from the final graph, if any
    pub modified: Option<DateTime<Utc>>,
    /// Set by the target lister when the graph is ambiguous or mid-load
    pub corrupt: bool,
}

impl TargetEntry {
    /// A consistent target graph with a readable timestamp.
    pub fn new(id: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            modified: Some(modified),
            corrupt: false,
        }
    }

    /// A target graph flagged corrupt by the lister.
    pub fn corrupt(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            modified: None,
            corrupt: true,
        }
    }
}

/// Pure, total state transition.
///
/// | target | corrupt flag | target timestamp | source newer | state |
/// |---|---|---|---|---|
/// | absent | - | - | - | `Missing` |
/// | present | yes | - | - | `Corrupt` |
/// | present | no | absent | - | `Corrupt` |
/// | present | no | present | yes | `Outdated` |
/// | present | no | present | no | `UpToDate` |
///
/// `ToRemove` is never produced here; it is assigned by the reconciler to
/// datasets the source does not list.
pub fn classify(source_modified: DateTime<Utc>, target: Option<&TargetEntry>) -> DatasetState {
    let Some(target) = target else {
        return DatasetState::Missing;
    };
    if target.corrupt {
        return DatasetState::Corrupt;
    }
    match target.modified {
        None => DatasetState::Corrupt,
        Some(target_modified) if source_modified > target_modified => DatasetState::Outdated,
        Some(_) => DatasetState::UpToDate,
    }
}

/// A dataset and the action assigned to it for the current run.
///
/// Identity is the id alone; timestamps are observations that may differ
/// between two values describing the same dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    id: String,
    source_timestamp: Option<DateTime<Utc>>,
    target_timestamp: Option<DateTime<Utc>>,
    state: DatasetState,
}

impl Dataset {
    /// Dataset listed by the source, classified against its target entry.
    pub fn from_source(source: SourceEntry, target: Option<&TargetEntry>) -> Self {
        let state = classify(source.modified, target);
        Self {
            id: source.id,
            source_timestamp: Some(source.modified),
            target_timestamp: target.and_then(|t| if t.corrupt { None } else { t.modified }),
            state,
        }
    }

    /// Dataset that only exists at the target.
    pub fn target_only(target: TargetEntry) -> Self {
        Self {
            id: target.id,
            source_timestamp: None,
            target_timestamp: if target.corrupt { None } else { target.modified },
            state: DatasetState::ToRemove,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_timestamp(&self) -> Option<DateTime<Utc>> {
        self.source_timestamp
    }

    pub fn target_timestamp(&self) -> Option<DateTime<Utc>> {
        self.target_timestamp
    }

    pub fn state(&self) -> DatasetState {
        self.state
    }

    /// Whether the updater has any I/O to do for this dataset.
    pub fn needs_action(&self) -> bool {
        self.state != DatasetState::UpToDate
    }
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Dataset {}

impl Hash for Dataset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_classify_table() {
        // (target present, corrupt flag, target timestamp, source secs, expected)
        let cases: &[(bool, bool, Option<i64>, i64, DatasetState)] = &[
            (false, false, None, 100, DatasetState::Missing),
            (false, true, Some(50), 100, DatasetState::Missing),
            (true, true, Some(50), 100, DatasetState::Corrupt),
            (true, true, Some(150), 100, DatasetState::Corrupt),
            (true, true, None, 100, DatasetState::Corrupt),
            (true, false, None, 100, DatasetState::Corrupt),
            (true, false, Some(90), 100, DatasetState::Outdated),
            (true, false, Some(100), 100, DatasetState::UpToDate),
            (true, false, Some(110), 100, DatasetState::UpToDate),
        ];

        for &(present, corrupt, target_ts, source_ts, expected) in cases {
            let target = TargetEntry {
                id: "1".to_string(),
                modified: target_ts.map(ts),
                corrupt,
            };
            let target = present.then_some(&target);
            assert_eq!(
                classify(ts(source_ts), target),
                expected,
                "present={present} corrupt={corrupt} target={target_ts:?} source={source_ts}"
            );
        }
    }

    #[test]
    fn test_identity_is_id_only() {
        let a = Dataset::from_source(SourceEntry::new("7", ts(10)), None);
        let b = Dataset::target_only(TargetEntry::new("7", ts(99)));
        assert_eq!(a, b);
        assert_ne!(a.state(), b.state());
    }

    #[test]
    fn test_corrupt_target_timestamp_is_dropped() {
        let mut target = TargetEntry::new("7", ts(10));
        target.corrupt = true;
        let ds = Dataset::from_source(SourceEntry::new("7", ts(20)), Some(&target));
        assert_eq!(ds.state(), DatasetState::Corrupt);
        assert_eq!(ds.target_timestamp(), None);
        assert_eq!(ds.source_timestamp(), Some(ts(20)));
    }

    #[test]
    fn test_state_serde_names() {
        let json = serde_json::to_string(&DatasetState::ToRemove).unwrap();
        assert_eq!(json, "\"to_remove\"");
    }
}
