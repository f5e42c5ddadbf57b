//! Block geometry reconciler
//!
//! Block geometry is derived state: the dissolve of the block's active
//! parcels. This module restores that invariant for one block at a time
//! and keeps the derived `stated_area` attribute (sum of active parcels'
//! stated areas) in step.

use cadastre_core::{BlockKey, CancelType, Polygon, RecordId};
use cadastre_store::Dataset;
use tracing::{info, warn};

/// Outcome of reconciling one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Geometry and stated area replaced from active parcels
    Updated,
    /// No active parcels remain; the block was retired
    RetiredNoActiveParcels,
    /// The block is retired yet active parcels reference it
    AlreadyRetiredButHasActiveParcels,
    /// No block row exists for the key
    NotFound,
}

/// Reconcile one block's derived geometry and stated area
///
/// - Active parcels present, block active: full geometry replace with
///   the dissolve of the parcels; stated area recomputed.
/// - No active parcels, block active: the block retires, stamped with
///   `record` and `cancel_type`.
/// - Block retired but active parcels remain: integrity warning, the
///   block is left untouched.
pub fn reconcile_block(
    ds: &mut Dataset,
    key: &BlockKey,
    record: RecordId,
    cancel_type: CancelType,
) -> BlockOutcome {
    let block = match ds.block_by_key(key) {
        Some(b) => b.clone(),
        None => {
            warn!(block = %key, "block not found during reconcile");
            return BlockOutcome::NotFound;
        }
    };
    let active = ds.active_parcels_in_block(key);

    if active.is_empty() {
        if block.is_active() {
            ds.blocks.update(&block.id, |b| {
                b.provenance.retire(record, cancel_type);
            });
            info!(block = %key, "block retired, no active parcels remain");
        }
        return BlockOutcome::RetiredNoActiveParcels;
    }

    if !block.is_active() {
        warn!(
            block = %key,
            parcels = active.len(),
            "retired block still referenced by active parcels"
        );
        return BlockOutcome::AlreadyRetiredButHasActiveParcels;
    }

    let active_len = active.len();
    let geometry = Polygon::dissolve_all(active.iter().map(|p| &p.geometry));
    let stated_area: f64 = active.iter().filter_map(|p| p.stated_area).sum();
    let stated_area = (stated_area > 0.0).then_some(stated_area);
    drop(active);
    ds.blocks.update(&block.id, |b| {
        b.geometry = geometry.clone();
        b.stated_area = stated_area;
    });
    info!(block = %key, parcels = active_len, "block geometry reconciled");
    BlockOutcome::Updated
}

/// Recompute only the derived stated area of one block
///
/// The attribute-maintenance path: geometry is left alone.
pub fn refresh_stated_area(ds: &mut Dataset, key: &BlockKey) -> Option<f64> {
    let block_id = ds.block_by_key(key).map(|b| b.id)?;
    let total: f64 = ds
        .active_parcels_in_block(key)
        .iter()
        .filter_map(|p| p.stated_area)
        .sum();
    let stated_area = (total > 0.0).then_some(total);
    ds.blocks.update(&block_id, |b| {
        b.stated_area = stated_area;
    });
    stated_area
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadastre_core::{
        Block, BlockStatus, Coord, CreateType, FeatureId, LandType, Parcel, ParcelKey, Provenance,
        Ring,
    };

    fn square(x0: f64, side: f64) -> Polygon {
        Polygon::from_ring(
            Ring::new(vec![
                Coord::from_meters(x0, 0.0),
                Coord::from_meters(x0 + side, 0.0),
                Coord::from_meters(x0 + side, side),
                Coord::from_meters(x0, side),
            ])
            .unwrap(),
        )
    }

    fn seed_block(ds: &mut Dataset, key: BlockKey, active: bool) -> FeatureId {
        let mut provenance = Provenance::created(RecordId::new(), CreateType::Ordinary);
        if !active {
            provenance.retired_by = Some(RecordId::new());
        }
        let block = Block {
            id: FeatureId::new(),
            key,
            geometry: Polygon::empty(),
            status: BlockStatus::Registered,
            stated_area: None,
            is_tax: false,
            land_type: LandType::Settled,
            provenance,
        };
        let id = block.id;
        ds.blocks.insert(id, block);
        id
    }

    fn seed_parcel(ds: &mut Dataset, key: ParcelKey, geometry: Polygon, area: f64) -> FeatureId {
        let parcel = Parcel {
            id: FeatureId::new(),
            key,
            geometry,
            stated_area: Some(area),
            land_type: LandType::Settled,
            is_tax: false,
            land_designation: None,
            provenance: Provenance::created(RecordId::new(), CreateType::Ordinary),
        };
        let id = parcel.id;
        ds.parcels.insert(id, parcel);
        id
    }

    #[test]
    fn test_update_replaces_geometry_and_area() {
        let mut ds = Dataset::new();
        let key = BlockKey::new(2069, 0);
        let block_id = seed_block(&mut ds, key, true);
        seed_parcel(&mut ds, ParcelKey::new(1, 2069, 0), square(0.0, 10.0), 100.0);
        seed_parcel(&mut ds, ParcelKey::new(2, 2069, 0), square(10.0, 10.0), 100.0);

        let outcome = reconcile_block(&mut ds, &key, RecordId::new(), CancelType::Ordinary);
        assert_eq!(outcome, BlockOutcome::Updated);
        let block = ds.blocks.get(&block_id).unwrap();
        assert!((block.geometry.area_m2() - 200.0).abs() < 1e-6);
        assert_eq!(block.stated_area, Some(200.0));
    }

    #[test]
    fn test_depleted_block_retires() {
        let mut ds = Dataset::new();
        let key = BlockKey::new(2069, 0);
        let block_id = seed_block(&mut ds, key, true);
        let record = RecordId::new();
        let outcome = reconcile_block(&mut ds, &key, record, CancelType::Ordinary);
        assert_eq!(outcome, BlockOutcome::RetiredNoActiveParcels);
        let block = ds.blocks.get(&block_id).unwrap();
        assert!(!block.is_active());
        assert_eq!(block.provenance.retired_by, Some(record));
        assert_eq!(block.provenance.cancel_type, Some(CancelType::Ordinary));
    }

    #[test]
    fn test_retired_block_with_active_parcels_is_integrity_warning() {
        let mut ds = Dataset::new();
        let key = BlockKey::new(2069, 0);
        let block_id = seed_block(&mut ds, key, false);
        seed_parcel(&mut ds, ParcelKey::new(1, 2069, 0), square(0.0, 10.0), 100.0);
        let outcome = reconcile_block(&mut ds, &key, RecordId::new(), CancelType::Ordinary);
        assert_eq!(outcome, BlockOutcome::AlreadyRetiredButHasActiveParcels);
        // The block must be left untouched.
        let block = ds.blocks.get(&block_id).unwrap();
        assert!(block.geometry.is_empty());
    }

    #[test]
    fn test_missing_block() {
        let mut ds = Dataset::new();
        let outcome = reconcile_block(
            &mut ds,
            &BlockKey::new(1, 0),
            RecordId::new(),
            CancelType::Ordinary,
        );
        assert_eq!(outcome, BlockOutcome::NotFound);
    }

    #[test]
    fn test_stated_area_ignores_retired_parcels() {
        let mut ds = Dataset::new();
        let key = BlockKey::new(2069, 0);
        let block_id = seed_block(&mut ds, key, true);
        seed_parcel(&mut ds, ParcelKey::new(1, 2069, 0), square(0.0, 10.0), 100.0);
        let gone = seed_parcel(&mut ds, ParcelKey::new(2, 2069, 0), square(10.0, 10.0), 77.0);
        ds.parcels.update(&gone, |p| {
            p.provenance.retire(RecordId::new(), CancelType::Ordinary);
        });
        reconcile_block(&mut ds, &key, RecordId::new(), CancelType::Ordinary);
        assert_eq!(ds.blocks.get(&block_id).unwrap().stated_area, Some(100.0));
    }

    #[test]
    fn test_refresh_stated_area_leaves_geometry() {
        let mut ds = Dataset::new();
        let key = BlockKey::new(2069, 0);
        let block_id = seed_block(&mut ds, key, true);
        seed_parcel(&mut ds, ParcelKey::new(1, 2069, 0), square(0.0, 10.0), 60.0);
        seed_parcel(&mut ds, ParcelKey::new(2, 2069, 0), square(10.0, 10.0), 40.0);
        assert_eq!(refresh_stated_area(&mut ds, &key), Some(100.0));
        let block = ds.blocks.get(&block_id).unwrap();
        assert_eq!(block.stated_area, Some(100.0));
        // Geometry untouched by the attribute path.
        assert!(block.geometry.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut ds = Dataset::new();
        let key = BlockKey::new(2069, 0);
        seed_block(&mut ds, key, true);
        seed_parcel(&mut ds, ParcelKey::new(1, 2069, 0), square(0.0, 10.0), 100.0);
        let first = reconcile_block(&mut ds, &key, RecordId::new(), CancelType::Ordinary);
        let before = ds.blocks.find_one(|b| b.key == key).unwrap().clone();
        let second = reconcile_block(&mut ds, &key, RecordId::new(), CancelType::Ordinary);
        let after = ds.blocks.find_one(|b| b.key == key).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(before.geometry, after.geometry);
        assert_eq!(before.stated_area, after.stated_area);
    }
}
