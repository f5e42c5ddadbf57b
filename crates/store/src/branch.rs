//! Isolated edit branches over a shared baseline
//!
//! Every process edits in its own branch: a full copy of the baseline
//! taken at branch creation. Closing the process merges the branch back.
//! A conflict is a row changed in both the baseline and the branch since
//! the branch was created; under `ConflictPolicy::FavorEdit` the branch
//! value wins and the conflict is reported, never silently dropped.
//!
//! Branches are never deleted: a posted branch stays registered for
//! audit, and a failed post leaves the branch open for another attempt.
//! The baseline is not locked during editing; writers block each other
//! only for the duration of a post.

use std::collections::BTreeMap;

use cadastre_core::{BranchId, Error, FeatureId, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::tables::{Table, Versioned};

/// Strategy for resolving rows changed on both sides of a branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// The branch (edit) value overwrites the baseline value
    FavorEdit,
}

/// One row changed in both baseline and branch since branch creation
#[derive(Debug, Clone)]
pub struct ConflictEntry {
    /// Collection the row belongs to
    pub table: &'static str,
    /// Row identifier
    pub id: FeatureId,
}

/// Result of reconciling a branch against the baseline
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Branch that was reconciled
    pub branch: String,
    /// Rows changed on both sides; resolved per the conflict policy
    pub conflicts: Vec<ConflictEntry>,
    /// Rows written to the baseline (0 for a dry run)
    pub posted: usize,
    /// Human-readable merge log
    pub log: Vec<String>,
}

/// An isolated editing branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    id: BranchId,
    name: String,
    dataset: Dataset,
    snapshot: Dataset,
    posted: bool,
}

impl Branch {
    /// Branch identifier
    pub fn id(&self) -> BranchId {
        self.id
    }

    /// Branch name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this branch has already been posted
    pub fn is_posted(&self) -> bool {
        self.posted
    }

    /// The branch's working dataset
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Mutable access to the branch's working dataset
    pub fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }
}

/// The branch engine: shared baseline plus named branches
#[derive(Debug, Default)]
pub struct BranchEngine {
    baseline: RwLock<Dataset>,
    branches: RwLock<BTreeMap<String, Branch>>,
}

impl BranchEngine {
    /// Create an engine over an initial baseline
    pub fn new(baseline: Dataset) -> Self {
        Self {
            baseline: RwLock::new(baseline),
            branches: RwLock::new(BTreeMap::new()),
        }
    }

    /// Run a closure against the current baseline
    pub fn with_baseline<R>(&self, f: impl FnOnce(&Dataset) -> R) -> R {
        f(&self.baseline.read())
    }

    /// Run a closure against the baseline with write access
    ///
    /// Intended for seeding data; normal edits go through a branch.
    pub fn with_baseline_mut<R>(&self, f: impl FnOnce(&mut Dataset) -> R) -> R {
        f(&mut self.baseline.write())
    }

    /// Names of all branches ever created, in name order
    pub fn branch_names(&self) -> Vec<String> {
        self.branches.read().keys().cloned().collect()
    }

    /// Create a branch as a copy of the current baseline
    pub fn create_branch(&self, name: &str) -> Result<BranchId> {
        let mut branches = self.branches.write();
        if branches.contains_key(name) {
            return Err(Error::Branch(format!("branch {name:?} already exists")));
        }
        let snapshot = self.baseline.read().clone();
        let id = BranchId::new();
        branches.insert(
            name.to_string(),
            Branch {
                id,
                name: name.to_string(),
                dataset: snapshot.clone(),
                snapshot,
                posted: false,
            },
        );
        info!(branch = name, "created branch");
        Ok(id)
    }

    /// Run a closure against a branch
    pub fn with_branch<R>(&self, name: &str, f: impl FnOnce(&Branch) -> R) -> Result<R> {
        let branches = self.branches.read();
        let branch = branches
            .get(name)
            .ok_or_else(|| Error::Branch(format!("no branch named {name:?}")))?;
        Ok(f(branch))
    }

    /// Run a closure against a branch's working dataset with write access
    pub fn with_branch_mut<R>(&self, name: &str, f: impl FnOnce(&mut Dataset) -> R) -> Result<R> {
        let mut branches = self.branches.write();
        let branch = branches
            .get_mut(name)
            .ok_or_else(|| Error::Branch(format!("no branch named {name:?}")))?;
        if branch.posted {
            return Err(Error::Branch(format!("branch {name:?} is already posted")));
        }
        Ok(f(&mut branch.dataset))
    }

    /// Dry-run reconcile: report conflicts and pending rows without
    /// touching the baseline
    pub fn reconcile(&self, name: &str, policy: ConflictPolicy) -> Result<ReconcileReport> {
        let branches = self.branches.read();
        let branch = branches
            .get(name)
            .ok_or_else(|| Error::Branch(format!("no branch named {name:?}")))?;
        let baseline = self.baseline.read();
        let mut scratch = baseline.clone();
        let report = merge_datasets(branch, &mut scratch, policy);
        Ok(report)
    }

    /// Merge a branch into the baseline and mark it posted
    ///
    /// The merge and the baseline write happen under one lock, so the
    /// reported conflicts are exactly the ones resolved. A branch that
    /// was already posted cannot post again.
    pub fn post(&self, name: &str, policy: ConflictPolicy) -> Result<ReconcileReport> {
        let mut branches = self.branches.write();
        let branch = branches
            .get_mut(name)
            .ok_or_else(|| Error::Branch(format!("no branch named {name:?}")))?;
        if branch.posted {
            return Err(Error::Branch(format!("branch {name:?} is already posted")));
        }
        let mut baseline = self.baseline.write();
        let report = merge_datasets(branch, &mut baseline, policy);
        branch.posted = true;
        info!(
            branch = name,
            posted = report.posted,
            conflicts = report.conflicts.len(),
            "posted branch"
        );
        Ok(report)
    }
}

/// Serializable snapshot of the whole engine, for durable storage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineState {
    /// The shared baseline
    pub baseline: Dataset,
    /// Every branch ever created, posted ones included
    pub branches: Vec<Branch>,
}

impl BranchEngine {
    /// Snapshot the engine for serialization
    pub fn to_state(&self) -> EngineState {
        EngineState {
            baseline: self.baseline.read().clone(),
            branches: self.branches.read().values().cloned().collect(),
        }
    }

    /// Rebuild an engine from a snapshot
    pub fn from_state(state: EngineState) -> Self {
        let branches = state
            .branches
            .into_iter()
            .map(|b| (b.name.clone(), b))
            .collect();
        Self {
            baseline: RwLock::new(state.baseline),
            branches: RwLock::new(branches),
        }
    }
}

/// Merge every collection of `branch` into `target`
fn merge_datasets(branch: &Branch, target: &mut Dataset, policy: ConflictPolicy) -> ReconcileReport {
    let ConflictPolicy::FavorEdit = policy;
    let mut report = ReconcileReport {
        branch: branch.name.clone(),
        ..Default::default()
    };
    let b = &branch.dataset;
    let s = &branch.snapshot;
    merge_table("processes", &b.processes, &s.processes, &mut target.processes, &mut report);
    merge_table("records", &b.records, &s.records, &mut target.records, &mut report);
    merge_table("parcels", &b.parcels, &s.parcels, &mut target.parcels, &mut report);
    merge_table("parcels_3d", &b.parcels_3d, &s.parcels_3d, &mut target.parcels_3d, &mut report);
    merge_table(
        "subtractions",
        &b.subtractions,
        &s.subtractions,
        &mut target.subtractions,
        &mut report,
    );
    merge_table("fronts", &b.fronts, &s.fronts, &mut target.fronts, &mut report);
    merge_table("points", &b.points, &s.points, &mut target.points, &mut report);
    merge_table("blocks", &b.blocks, &s.blocks, &mut target.blocks, &mut report);
    merge_table("in_parcels", &b.in_parcels, &s.in_parcels, &mut target.in_parcels, &mut report);
    merge_table("in_fronts", &b.in_fronts, &s.in_fronts, &mut target.in_fronts, &mut report);
    merge_table("in_points", &b.in_points, &s.in_points, &mut target.in_points, &mut report);

    // The action log is append-only; everything past the snapshot length
    // is new in the branch.
    let new_actions = &b.actions[s.actions.len()..];
    if !new_actions.is_empty() {
        target.actions.extend_from_slice(new_actions);
        report.posted += new_actions.len();
        report
            .log
            .push(format!("appended {} sequence actions", new_actions.len()));
    }
    report
}

/// Merge one table; rows changed in the branch overwrite the target,
/// conflicts are recorded when the target also moved
fn merge_table<T: Clone + PartialEq>(
    table: &'static str,
    branch: &Table<T>,
    snapshot: &Table<T>,
    target: &mut Table<T>,
    report: &mut ReconcileReport,
) {
    let mut written = 0usize;
    for id in branch.ids().copied().collect::<Vec<_>>() {
        let branch_row = match branch.row(&id) {
            Some(row) => row,
            None => continue,
        };
        let snap_version = snapshot.version(&id);
        let changed_in_branch = snap_version != Some(branch_row.version);
        if !changed_in_branch {
            continue;
        }
        let target_row = target.row(&id);
        let changed_in_target = target_row.map(|r| r.version) != snap_version;
        if changed_in_target {
            let identical = target_row.map(|r| &r.value) == Some(&branch_row.value);
            if !identical {
                warn!(table, id = %id, "merge conflict, keeping edit value");
                report.conflicts.push(ConflictEntry { table, id });
            }
        }
        let next_version = target_row
            .map(|r| r.version.max(branch_row.version) + 1)
            .unwrap_or(branch_row.version);
        target.put_row(
            id,
            Versioned {
                value: branch_row.value.clone(),
                version: next_version,
            },
        );
        written += 1;
    }
    if written > 0 {
        report.posted += written;
        report.log.push(format!("{table}: {written} rows"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_core::{
        CreateType, LandType, Parcel, ParcelKey, Polygon, Provenance, RecordId,
    };

    fn parcel(number: u32) -> Parcel {
        Parcel {
            id: FeatureId::new(),
            key: ParcelKey::new(number, 2069, 0),
            geometry: Polygon::empty(),
            stated_area: Some(10.0),
            land_type: LandType::Settled,
            is_tax: false,
            land_designation: None,
            provenance: Provenance::created(RecordId::new(), CreateType::Ordinary),
        }
    }

    fn seeded_engine() -> (BranchEngine, FeatureId) {
        let mut ds = Dataset::new();
        let p = parcel(1);
        let id = p.id;
        ds.parcels.insert(id, p);
        (BranchEngine::new(ds), id)
    }

    #[test]
    fn test_create_branch_rejects_duplicate() {
        let (engine, _) = seeded_engine();
        engine.create_branch("a").unwrap();
        assert!(engine.create_branch("a").is_err());
    }

    #[test]
    fn test_branch_edit_isolated_until_post() {
        let (engine, id) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine
            .with_branch_mut("edit", |ds| {
                ds.parcels.update(&id, |p| p.stated_area = Some(99.0));
            })
            .unwrap();
        let baseline_area = engine.with_baseline(|ds| ds.parcels.get(&id).unwrap().stated_area);
        assert_eq!(baseline_area, Some(10.0));
        engine.post("edit", ConflictPolicy::FavorEdit).unwrap();
        let baseline_area = engine.with_baseline(|ds| ds.parcels.get(&id).unwrap().stated_area);
        assert_eq!(baseline_area, Some(99.0));
    }

    #[test]
    fn test_post_reports_row_count() {
        let (engine, id) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine
            .with_branch_mut("edit", |ds| {
                ds.parcels.update(&id, |p| p.stated_area = Some(99.0));
                let extra = parcel(2);
                ds.parcels.insert(extra.id, extra);
            })
            .unwrap();
        let report = engine.post("edit", ConflictPolicy::FavorEdit).unwrap();
        assert_eq!(report.posted, 2);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_favor_edit_keeps_branch_value_on_conflict() {
        let (engine, id) = seeded_engine();
        engine.create_branch("edit").unwrap();
        // Both sides touch the same row after branch creation.
        engine.with_baseline_mut(|ds| {
            ds.parcels.update(&id, |p| p.stated_area = Some(50.0));
        });
        engine
            .with_branch_mut("edit", |ds| {
                ds.parcels.update(&id, |p| p.stated_area = Some(99.0));
            })
            .unwrap();
        let report = engine.post("edit", ConflictPolicy::FavorEdit).unwrap();
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].table, "parcels");
        let area = engine.with_baseline(|ds| ds.parcels.get(&id).unwrap().stated_area);
        assert_eq!(area, Some(99.0));
    }

    #[test]
    fn test_baseline_only_change_is_not_conflict() {
        let (engine, id) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine.with_baseline_mut(|ds| {
            ds.parcels.update(&id, |p| p.stated_area = Some(50.0));
        });
        let report = engine.post("edit", ConflictPolicy::FavorEdit).unwrap();
        assert!(report.conflicts.is_empty());
        // The untouched branch row does not clobber the baseline edit.
        let area = engine.with_baseline(|ds| ds.parcels.get(&id).unwrap().stated_area);
        assert_eq!(area, Some(50.0));
    }

    #[test]
    fn test_branch_never_deleted_after_post() {
        let (engine, _) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine.post("edit", ConflictPolicy::FavorEdit).unwrap();
        assert_eq!(engine.branch_names(), vec!["edit".to_string()]);
        assert!(engine.with_branch("edit", |b| b.is_posted()).unwrap());
        // A posted branch rejects further edits and a second post.
        assert!(engine.with_branch_mut("edit", |_| ()).is_err());
        assert!(engine.post("edit", ConflictPolicy::FavorEdit).is_err());
    }

    #[test]
    fn test_actions_appended_on_post() {
        use cadastre_core::{ActionType, ProcessName, SequenceAction};
        let (engine, _) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine
            .with_branch_mut("edit", |ds| {
                ds.push_action(SequenceAction {
                    process: ProcessName::from_parts(15, 2024),
                    action_type: ActionType::Create,
                    temp_number: 1,
                    final_number: Some(40),
                    block: 2069,
                    sub_block: 0,
                    to_block: None,
                    to_sub_block: None,
                });
            })
            .unwrap();
        engine.post("edit", ConflictPolicy::FavorEdit).unwrap();
        assert_eq!(engine.with_baseline(|ds| ds.actions.len()), 1);
    }

    #[test]
    fn test_state_roundtrip_keeps_open_branch() {
        let (engine, id) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine
            .with_branch_mut("edit", |ds| {
                ds.parcels.update(&id, |p| p.stated_area = Some(99.0));
            })
            .unwrap();
        let json = serde_json::to_string(&engine.to_state()).unwrap();
        let restored = BranchEngine::from_state(serde_json::from_str(&json).unwrap());
        // The branch edit survives and can still post.
        restored.post("edit", ConflictPolicy::FavorEdit).unwrap();
        let area = restored.with_baseline(|ds| ds.parcels.get(&id).unwrap().stated_area);
        assert_eq!(area, Some(99.0));
    }

    #[test]
    fn test_reconcile_is_dry_run() {
        let (engine, id) = seeded_engine();
        engine.create_branch("edit").unwrap();
        engine
            .with_branch_mut("edit", |ds| {
                ds.parcels.update(&id, |p| p.stated_area = Some(99.0));
            })
            .unwrap();
        let report = engine.reconcile("edit", ConflictPolicy::FavorEdit).unwrap();
        assert_eq!(report.posted, 1);
        let area = engine.with_baseline(|ds| ds.parcels.get(&id).unwrap().stated_area);
        assert_eq!(area, Some(10.0));
    }
}
