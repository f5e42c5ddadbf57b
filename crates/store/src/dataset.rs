//! The full set of registry collections
//!
//! A `Dataset` is one coherent view of the registry: the baseline holds
//! the recorded truth, and every branch holds a diverging copy. Query
//! helpers live here; mutation goes through the public tables so the
//! version counters stay honest.

use cadastre_core::{
    Block, BlockKey, BorderPoint, Front, InProcessFront, InProcessParcel, InProcessPoint, Parcel,
    Parcel3d, ParcelKey, Process, ProcessName, Record, SequenceAction, Subtraction,
};
use serde::{Deserialize, Serialize};

use crate::tables::Table;

/// All registry collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Dataset {
    /// Cadastral processes (process borders)
    pub processes: Table<Process>,
    /// Transactional records, 1:1 with processes
    pub records: Table<Record>,
    /// 2D parcels
    pub parcels: Table<Parcel>,
    /// 3D (volumetric) parcels
    pub parcels_3d: Table<Parcel3d>,
    /// Subtractions tying 3D parcels to the 2D parcels they occupy
    pub subtractions: Table<Subtraction>,
    /// Parcel fronts
    pub fronts: Table<Front>,
    /// Border points
    pub points: Table<BorderPoint>,
    /// Blocks
    pub blocks: Table<Block>,
    /// Staged in-process parcels
    pub in_parcels: Table<InProcessParcel>,
    /// Staged in-process fronts
    pub in_fronts: Table<InProcessFront>,
    /// Staged in-process points
    pub in_points: Table<InProcessPoint>,
    /// Append-only sequence-action log
    pub actions: Vec<SequenceAction>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Processes and records =====

    /// All processes with the given name
    ///
    /// The name is supposed to be unique; callers that require
    /// uniqueness inspect the length (0 and >1 are both invalid).
    pub fn processes_named(&self, name: &ProcessName) -> Vec<&Process> {
        self.processes.find(|p| &p.name == name).collect()
    }

    /// The record belonging to a process, if one was already created
    pub fn record_named(&self, name: &ProcessName) -> Option<&Record> {
        self.records.find_one(|r| &r.name == name)
    }

    // ===== Parcels =====

    /// The single active parcel for a logical key, if any
    pub fn active_parcel(&self, key: &ParcelKey) -> Option<&Parcel> {
        self.parcels.find_one(|p| &p.key == key && p.is_active())
    }

    /// All active parcels in a block
    pub fn active_parcels_in_block(&self, block: &BlockKey) -> Vec<&Parcel> {
        self.parcels
            .find(|p| p.is_active() && p.block_key() == *block)
            .collect()
    }

    /// Number of active parcels in a block
    pub fn active_parcel_count(&self, block: &BlockKey) -> usize {
        self.parcels
            .count(|p| p.is_active() && p.block_key() == *block)
    }

    // ===== Blocks =====

    /// The block row for a key (active or retired)
    pub fn block_by_key(&self, key: &BlockKey) -> Option<&Block> {
        self.blocks.find_one(|b| &b.key == key)
    }

    // ===== Sequence actions =====

    /// Sequence-action rows of one process
    pub fn actions_for(&self, process: &ProcessName) -> Vec<&SequenceAction> {
        self.actions.iter().filter(|a| &a.process == process).collect()
    }

    /// Append a sequence-action row
    pub fn push_action(&mut self, action: SequenceAction) {
        self.actions.push(action);
    }

    // ===== Staging rows =====

    /// Staged parcels of one process
    pub fn staged_parcels(&self, process: &ProcessName) -> Vec<&InProcessParcel> {
        self.in_parcels.find(|p| &p.process == process).collect()
    }

    /// Staged fronts of one process
    pub fn staged_fronts(&self, process: &ProcessName) -> Vec<&InProcessFront> {
        self.in_fronts.find(|f| &f.process == process).collect()
    }

    /// Staged points of one process
    pub fn staged_points(&self, process: &ProcessName) -> Vec<&InProcessPoint> {
        self.in_points.find(|p| &p.process == process).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_core::{
        CreateType, FeatureId, LandType, Polygon, ProcessStatus, ProcessType, Provenance, RecordId,
    };

    fn parcel(key: ParcelKey, active: bool) -> Parcel {
        let mut provenance = Provenance::created(RecordId::new(), CreateType::Ordinary);
        if !active {
            provenance.retired_by = Some(RecordId::new());
        }
        Parcel {
            id: FeatureId::new(),
            key,
            geometry: Polygon::empty(),
            stated_area: Some(50.0),
            land_type: LandType::Settled,
            is_tax: false,
            land_designation: None,
            provenance,
        }
    }

    #[test]
    fn test_active_parcel_skips_retired() {
        let mut ds = Dataset::new();
        let key = ParcelKey::new(5, 2069, 0);
        let retired = parcel(key, false);
        let active = parcel(key, true);
        let active_id = active.id;
        ds.parcels.insert(retired.id, retired);
        ds.parcels.insert(active.id, active);
        assert_eq!(ds.active_parcel(&key).map(|p| p.id), Some(active_id));
    }

    #[test]
    fn test_active_parcels_in_block() {
        let mut ds = Dataset::new();
        for n in 1..=3 {
            let p = parcel(ParcelKey::new(n, 2069, 0), true);
            ds.parcels.insert(p.id, p);
        }
        let other = parcel(ParcelKey::new(1, 2070, 0), true);
        ds.parcels.insert(other.id, other);
        let gone = parcel(ParcelKey::new(9, 2069, 0), false);
        ds.parcels.insert(gone.id, gone);
        assert_eq!(ds.active_parcel_count(&BlockKey::new(2069, 0)), 3);
    }

    #[test]
    fn test_processes_named_detects_duplicates() {
        let mut ds = Dataset::new();
        let name = ProcessName::from_parts(15, 2024);
        for _ in 0..2 {
            let p = Process {
                id: FeatureId::new(),
                name: name.clone(),
                process_type: ProcessType::Ordinary,
                status: ProcessStatus::Submitted,
                border: Polygon::empty(),
                block: BlockKey::new(2069, 0),
            };
            ds.processes.insert(p.id, p);
        }
        assert_eq!(ds.processes_named(&name).len(), 2);
    }

    #[test]
    fn test_actions_scoped_by_process() {
        use cadastre_core::{ActionType, SequenceAction};
        let mut ds = Dataset::new();
        let mine = ProcessName::from_parts(15, 2024);
        let theirs = ProcessName::from_parts(16, 2024);
        for (process, temp) in [(&mine, 1), (&theirs, 1), (&mine, 2)] {
            ds.push_action(SequenceAction {
                process: process.clone(),
                action_type: ActionType::Create,
                temp_number: temp,
                final_number: Some(temp + 100),
                block: 2069,
                sub_block: 0,
                to_block: None,
                to_sub_block: None,
            });
        }
        assert_eq!(ds.actions_for(&mine).len(), 2);
    }
}
