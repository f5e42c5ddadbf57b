//! The retire/create transaction pipeline
//!
//! One run takes every staged feature of a process and propagates it
//! into the registry collections, in a fixed phase order chosen so each
//! phase only depends on the phases before it:
//!
//! 1. retire parcels
//! 2. retire fronts
//! 3. retire subtractions
//! 4. conditional sender-block retirement
//! 5. create parcels, fronts and points
//! 6. block geometry repair for every block touched by a transfer
//!
//! Every phase is idempotent: a rerun after a partial failure skips
//! what already happened. Data oddities become warnings in the report;
//! a fatal outcome stops the run at that phase.
//!
//! All state flows through an explicit `RecordContext` — there is no
//! ambient "active record".

use cadastre_core::{
    ActionType, BlockKey, BlockStatus, BorderPoint, FeatureId, Front, LineStatus, Parcel,
    ParcelKey, ParcelRole, PointStatus, Polygon, Process, ProcessType, Provenance, RecordId,
    SequenceAction,
};
use cadastre_store::Dataset;
use tracing::{info, warn};

use crate::config::{Config, RetirementPolicy};
use crate::matching::match_points;
use crate::reconciler::{reconcile_block, BlockOutcome};
use crate::report::{PhaseOutcome, PipelineReport};
use crate::resolver::{resolve_final, Resolution};

/// Explicit context of one pipeline run
#[derive(Debug, Clone)]
pub struct RecordContext {
    /// The record every provenance stamp will reference
    pub record_id: RecordId,
    /// The process being recorded
    pub process: Process,
    /// Branch the run mutates (informational)
    pub branch: String,
}

/// Run all phases against a branch dataset
pub fn execute(ds: &mut Dataset, ctx: &RecordContext, config: &Config) -> PipelineReport {
    let mut report = PipelineReport::begin();
    info!(process = %ctx.process.name, record = %ctx.record_id, branch = %ctx.branch, "pipeline start");

    let phases: [(&'static str, fn(&mut Dataset, &RecordContext, &Config) -> PhaseOutcome); 6] = [
        ("retire_parcels", retire_parcels),
        ("retire_fronts", retire_fronts),
        ("retire_subtractions", retire_subtractions),
        ("retire_sender_block", retire_sender_block),
        ("create_features", create_features),
        ("repair_blocks", repair_blocks),
    ];
    for (name, phase) in phases {
        let outcome = phase(ds, ctx, config);
        let fatal = outcome.is_fatal();
        report.record(name, outcome);
        if fatal {
            warn!(process = %ctx.process.name, phase = name, "pipeline stopped at fatal phase");
            break;
        }
    }
    report
}

// ===== Phase 1: retire parcels =====

/// Retire every parcel a staged `Retire` row points at, plus the
/// unsettled parcels the configured policy makes eligible.
fn retire_parcels(ds: &mut Dataset, ctx: &RecordContext, config: &Config) -> PhaseOutcome {
    let cancel = ctx.process.process_type.cancel_type();
    let mut warnings = Vec::new();

    let targets: Vec<ParcelKey> = ds
        .staged_parcels(&ctx.process.name)
        .iter()
        .filter(|p| p.role == ParcelRole::Retire)
        .map(|p| ParcelKey::new(p.temp_number, p.block, p.sub_block))
        .collect();
    for key in targets {
        match ds.active_parcel(&key).map(|p| p.id) {
            Some(id) => {
                ds.parcels.update(&id, |p| {
                    p.provenance.retire(ctx.record_id, cancel);
                });
            }
            None => {
                let already = ds
                    .parcels
                    .find_one(|p| p.key == key && !p.is_active())
                    .is_some();
                if !already {
                    warnings.push(format!("no parcel to retire for key {key}"));
                }
                // Already retired: a rerun, nothing to do.
            }
        }
    }

    // First registrations sweep up unsettled parcels inside the border.
    if ctx.process.process_type == ProcessType::FirstRegistration {
        sweep_unsettled(ds, ctx, config.retirement_policy);
    }

    if warnings.is_empty() {
        PhaseOutcome::Success
    } else {
        PhaseOutcome::Warning(warnings)
    }
}

/// Retire the unsettled parcels in the process block that the policy
/// makes eligible; returns how many retired
///
/// Also run standalone by the `retire` maintenance command.
pub fn sweep_unsettled(
    ds: &mut Dataset,
    ctx: &RecordContext,
    policy: RetirementPolicy,
) -> usize {
    let cancel = ctx.process.process_type.cancel_type();
    let eligible: Vec<FeatureId> = ds
        .active_parcels_in_block(&ctx.process.block)
        .iter()
        .filter(|p| p.land_type == cadastre_core::LandType::Unsettled)
        .filter(|p| match policy {
            RetirementPolicy::TaxOnly => p.is_tax,
            RetirementPolicy::AllUnsettled => true,
        })
        .map(|p| p.id)
        .collect();
    let count = eligible.len();
    for id in eligible {
        ds.parcels.update(&id, |p| {
            p.provenance.retire(ctx.record_id, cancel);
        });
    }
    if count > 0 {
        info!(process = %ctx.process.name, count, "unsettled parcels retired");
    }
    count
}

// ===== Phase 2: retire fronts =====

/// Retire fronts by exact geometric identity with staged `Retire` rows
///
/// An unmatched staged front is a warning; the phase never retires a
/// "close enough" line.
fn retire_fronts(ds: &mut Dataset, ctx: &RecordContext, _config: &Config) -> PhaseOutcome {
    let cancel = ctx.process.process_type.cancel_type();
    let mut warnings = Vec::new();
    let staged: Vec<_> = ds
        .staged_fronts(&ctx.process.name)
        .iter()
        .filter(|f| f.status == LineStatus::Retire)
        .map(|f| f.segment)
        .collect();
    for segment in staged {
        match ds
            .fronts
            .find_one(|f| f.is_active() && f.segment == segment)
            .map(|f| f.id)
        {
            Some(id) => {
                ds.fronts.update(&id, |f| {
                    f.provenance.retire(ctx.record_id, cancel);
                });
            }
            None => {
                let already = ds
                    .fronts
                    .find_one(|f| !f.is_active() && f.segment == segment)
                    .is_some();
                if !already {
                    warnings.push(format!(
                        "no identical front to retire between {} and {}",
                        segment.start(),
                        segment.end()
                    ));
                }
            }
        }
    }
    if warnings.is_empty() {
        PhaseOutcome::Success
    } else {
        PhaseOutcome::Warning(warnings)
    }
}

// ===== Phase 3: retire subtractions =====

/// Retire subtractions referencing 2D parcels this record retired
fn retire_subtractions(ds: &mut Dataset, ctx: &RecordContext, _config: &Config) -> PhaseOutcome {
    let cancel = ctx.process.process_type.cancel_type();
    let retired_2d: Vec<FeatureId> = ds
        .parcels
        .find(|p| p.provenance.retired_by == Some(ctx.record_id))
        .map(|p| p.id)
        .collect();
    let record = ctx.record_id;
    let count = ds.subtractions.update_where(
        |s| s.is_active() && retired_2d.contains(&s.parcel_2d),
        |s| s.provenance.retire(record, cancel),
    );
    if count > 0 {
        info!(process = %ctx.process.name, count, "subtractions retired");
    }
    PhaseOutcome::Success
}

// ===== Phase 4: conditional sender-block retirement =====

/// A transfer that drains the sender block retires the block itself
fn retire_sender_block(ds: &mut Dataset, ctx: &RecordContext, _config: &Config) -> PhaseOutcome {
    let has_transfer = ds
        .actions_for(&ctx.process.name)
        .iter()
        .any(|a| a.action_type == ActionType::Transfer);
    if !has_transfer {
        return PhaseOutcome::Success;
    }
    let sender = ctx.process.block;
    if ds.active_parcel_count(&sender) > 0 {
        return PhaseOutcome::Success;
    }
    match reconcile_block(
        ds,
        &sender,
        ctx.record_id,
        ctx.process.process_type.cancel_type(),
    ) {
        BlockOutcome::NotFound => {
            PhaseOutcome::Warning(vec![format!("sender block {sender} not found")])
        }
        _ => PhaseOutcome::Success,
    }
}

// ===== Phase 5: create features =====

/// Create parcels, fronts and points from the staged rows
fn create_features(ds: &mut Dataset, ctx: &RecordContext, config: &Config) -> PhaseOutcome {
    let create = ctx.process.process_type.create_type();
    let cancel = ctx.process.process_type.cancel_type();
    let mut warnings = Vec::new();
    let actions: Vec<SequenceAction> = ds
        .actions_for(&ctx.process.name)
        .into_iter()
        .cloned()
        .collect();
    let action_refs: Vec<&SequenceAction> = actions.iter().collect();

    // Parcels.
    let staged_parcels: Vec<_> = ds
        .staged_parcels(&ctx.process.name)
        .into_iter()
        .filter(|p| matches!(p.role, ParcelRole::New | ParcelRole::Intermediate))
        .cloned()
        .collect();
    for staged in staged_parcels {
        let final_number =
            match resolve_final(staged.temp_number, staged.block, staged.sub_block, &action_refs) {
                Resolution::Final(n) => n,
                Resolution::Pending => {
                    warnings.push(format!(
                        "temp parcel {} has no final number yet",
                        staged.temp_number
                    ));
                    continue;
                }
            };
        let key = ParcelKey::new(final_number, staged.block, staged.sub_block);
        if let Some(existing) = ds.active_parcel(&key) {
            if existing.provenance.created_by == Some(ctx.record_id) {
                continue; // rerun
            }
            return PhaseOutcome::Fatal(format!(
                "parcel {key} already exists and belongs to another record"
            ));
        }
        // An intermediate parcel retired on a rerun also counts as done.
        if ds
            .parcels
            .find_one(|p| p.key == key && p.provenance.created_by == Some(ctx.record_id))
            .is_some()
        {
            continue;
        }
        let mut provenance = Provenance::created(ctx.record_id, create);
        if staged.role == ParcelRole::Intermediate {
            provenance.retire(ctx.record_id, cancel);
        }
        let parcel = Parcel {
            id: FeatureId::new(),
            key,
            geometry: staged.geometry.clone(),
            stated_area: staged.stated_area,
            land_type: staged.land_type,
            is_tax: staged.is_tax,
            land_designation: staged.land_designation.clone(),
            provenance,
        };
        ds.parcels.insert(parcel.id, parcel);
    }

    // Points go in before fronts so endpoints can wire up.
    let staged_points: Vec<_> = ds
        .staged_points(&ctx.process.name)
        .into_iter()
        .filter(|p| p.status == PointStatus::New)
        .cloned()
        .collect();
    for staged in staged_points {
        let exists = ds
            .points
            .find_one(|p| p.is_active() && p.geometry == staged.geometry)
            .is_some();
        if exists {
            continue;
        }
        let point = BorderPoint {
            id: FeatureId::new(),
            geometry: staged.geometry,
            name: staged.name.clone(),
            class: staged.class,
            provenance: Provenance::created(ctx.record_id, create),
        };
        ds.points.insert(point.id, point);
    }

    // Fronts.
    let staged_fronts: Vec<_> = ds
        .staged_fronts(&ctx.process.name)
        .into_iter()
        .filter(|f| f.status == LineStatus::New)
        .cloned()
        .collect();
    let active_points: Vec<(FeatureId, cadastre_core::PointGeom)> = ds
        .points
        .iter()
        .filter(|(_, p)| p.is_active())
        .map(|(id, p)| (*id, p.geometry))
        .collect();
    for staged in staged_fronts {
        let exists = ds
            .fronts
            .find_one(|f| f.is_active() && f.segment == staged.segment)
            .is_some();
        if exists {
            continue;
        }
        let mut endpoints = [None, None];
        for (slot, coord) in [(0, staged.segment.start()), (1, staged.segment.end())] {
            let probe = FeatureId::new();
            let matching = match_points(
                &[(probe, cadastre_core::PointGeom::new(coord))],
                &active_points,
                config.point_tolerance_m,
            );
            if let Some(m) = matching.matched.first() {
                endpoints[slot] = Some(m.target);
            } else if matching.conflicts.is_empty() {
                warnings.push(format!("front endpoint {coord} has no border point"));
            } else {
                warnings.push(format!("front endpoint {coord} matches several border points"));
            }
        }
        let front = Front {
            id: FeatureId::new(),
            segment: staged.segment,
            distance: staged.distance,
            radius: staged.radius,
            line_type: staged.line_type,
            start_point: endpoints[0],
            end_point: endpoints[1],
            provenance: Provenance::created(ctx.record_id, create),
        };
        ds.fronts.insert(front.id, front);
    }

    if warnings.is_empty() {
        PhaseOutcome::Success
    } else {
        PhaseOutcome::Warning(warnings)
    }
}

// ===== Phase 6: block geometry repair =====

/// Reshape the sender block and every absorbing block of a transfer
///
/// A `Preplanned` absorbing block has no geometry yet: it is
/// constructed from the parcels this record moved in, stamped with the
/// record, and established.
fn repair_blocks(ds: &mut Dataset, ctx: &RecordContext, _config: &Config) -> PhaseOutcome {
    let cancel = ctx.process.process_type.cancel_type();
    let create = ctx.process.process_type.create_type();
    let mut warnings = Vec::new();

    let mut touched: Vec<BlockKey> = vec![ctx.process.block];
    for action in ds.actions_for(&ctx.process.name) {
        if action.is_cross_block() {
            let key = BlockKey::new(action.effective_block(), action.effective_sub_block());
            if !touched.contains(&key) {
                touched.push(key);
            }
        }
    }

    for key in touched {
        let preplanned = ds
            .block_by_key(&key)
            .map(|b| b.status == BlockStatus::Preplanned)
            .unwrap_or(false);
        if preplanned {
            let incoming: Vec<&Parcel> = ds
                .active_parcels_in_block(&key)
                .into_iter()
                .filter(|p| p.provenance.created_by == Some(ctx.record_id))
                .collect();
            if incoming.is_empty() {
                warnings.push(format!("preplanned block {key} received no parcels"));
                continue;
            }
            let geometry = Polygon::dissolve_all(incoming.iter().map(|p| &p.geometry));
            let stated_area: f64 = incoming.iter().filter_map(|p| p.stated_area).sum();
            let block_id = ds.block_by_key(&key).map(|b| b.id);
            if let Some(id) = block_id {
                let record = ctx.record_id;
                ds.blocks.update(&id, |b| {
                    b.geometry = geometry.clone();
                    b.stated_area = (stated_area > 0.0).then_some(stated_area);
                    b.status = BlockStatus::Established;
                    b.provenance.created_by = Some(record);
                    b.provenance.create_type = Some(create);
                });
                info!(block = %key, "preplanned block established");
            }
            continue;
        }
        match reconcile_block(ds, &key, ctx.record_id, cancel) {
            BlockOutcome::NotFound => warnings.push(format!("block {key} not found")),
            BlockOutcome::AlreadyRetiredButHasActiveParcels => warnings.push(format!(
                "block {key} is retired but still has active parcels"
            )),
            BlockOutcome::Updated | BlockOutcome::RetiredNoActiveParcels => {}
        }
    }

    if warnings.is_empty() {
        PhaseOutcome::Success
    } else {
        PhaseOutcome::Warning(warnings)
    }
}
