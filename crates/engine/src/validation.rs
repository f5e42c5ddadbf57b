//! Pre-flight validation checklists
//!
//! Every task validates before touching anything: all checks run, the
//! report lists each one by name, and any invalid check aborts the task
//! with no partial state. Not-found and duplicate process names are
//! both invalid — a duplicate name means the registry itself is
//! inconsistent and nothing should proceed on top of it.

use cadastre_core::{ParcelRole, ProcessStatus, ProcessName, BlockKey};
use cadastre_store::Dataset;
use tracing::warn;

use crate::resolver::{resolve_final, Resolution};

/// One named validation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Check name
    pub check: &'static str,
    /// Whether the check passed
    pub valid: bool,
    /// Human-readable detail on failure
    pub detail: Option<String>,
}

impl CheckOutcome {
    fn pass(check: &'static str) -> Self {
        Self {
            check,
            valid: true,
            detail: None,
        }
    }

    fn fail(check: &'static str, detail: String) -> Self {
        warn!(check, detail = %detail, "validation check failed");
        Self {
            check,
            valid: false,
            detail: Some(detail),
        }
    }
}

/// The full checklist result for one task
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    /// All checks that ran, in order
    pub checks: Vec<CheckOutcome>,
}

impl ValidationReport {
    /// Whether every check passed
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(|c| c.valid)
    }

    /// The failed checks
    pub fn failures(&self) -> Vec<&CheckOutcome> {
        self.checks.iter().filter(|c| !c.valid).collect()
    }

    fn push(&mut self, outcome: CheckOutcome) {
        self.checks.push(outcome);
    }
}

/// Check that exactly one process carries the name
pub fn check_process_exists(ds: &Dataset, name: &ProcessName) -> CheckOutcome {
    match ds.processes_named(name).len() {
        1 => CheckOutcome::pass("process_exists"),
        0 => CheckOutcome::fail("process_exists", format!("process {name} not found")),
        n => CheckOutcome::fail(
            "process_exists",
            format!("process name {name} is ambiguous: {n} rows"),
        ),
    }
}

/// Check the process status against an allowed set
pub fn check_status(
    ds: &Dataset,
    name: &ProcessName,
    allowed: &[ProcessStatus],
) -> CheckOutcome {
    match ds.processes_named(name).first() {
        Some(p) if allowed.contains(&p.status) => CheckOutcome::pass("status"),
        Some(p) => CheckOutcome::fail(
            "status",
            format!("process {name} has status {}, expected one of {allowed:?}", p.status),
        ),
        None => CheckOutcome::fail("status", format!("process {name} not found")),
    }
}

/// Check that every staged parcel that will be created resolves to a
/// final number
pub fn check_final_numbers(ds: &Dataset, name: &ProcessName) -> CheckOutcome {
    let actions = ds.actions_for(name);
    let pending: Vec<String> = ds
        .staged_parcels(name)
        .iter()
        .filter(|p| matches!(p.role, ParcelRole::New | ParcelRole::Intermediate))
        .filter(|p| {
            resolve_final(p.temp_number, p.block, p.sub_block, &actions) == Resolution::Pending
        })
        .map(|p| format!("temp {} in block {}/{}", p.temp_number, p.block, p.sub_block))
        .collect();
    if pending.is_empty() {
        CheckOutcome::pass("final_numbers")
    } else {
        CheckOutcome::fail(
            "final_numbers",
            format!("unresolved temp parcels: {}", pending.join(", ")),
        )
    }
}

/// Check that every transfer destination block exists
pub fn check_absorbing_blocks(ds: &Dataset, name: &ProcessName) -> CheckOutcome {
    let missing: Vec<String> = ds
        .actions_for(name)
        .iter()
        .filter(|a| a.is_cross_block())
        .map(|a| BlockKey::new(a.effective_block(), a.effective_sub_block()))
        .filter(|key| ds.block_by_key(key).is_none())
        .map(|key| key.to_string())
        .collect();
    if missing.is_empty() {
        CheckOutcome::pass("absorbing_blocks")
    } else {
        CheckOutcome::fail(
            "absorbing_blocks",
            format!("absorbing blocks do not exist: {}", missing.join(", ")),
        )
    }
}

/// Check that every staged parcel to create carries a stated area
pub fn check_stated_areas(ds: &Dataset, name: &ProcessName) -> CheckOutcome {
    let missing: Vec<String> = ds
        .staged_parcels(name)
        .iter()
        .filter(|p| p.role == ParcelRole::New && p.stated_area.is_none())
        .map(|p| format!("temp {}", p.temp_number))
        .collect();
    if missing.is_empty() {
        CheckOutcome::pass("stated_areas")
    } else {
        CheckOutcome::fail(
            "stated_areas",
            format!("staged parcels without stated area: {}", missing.join(", ")),
        )
    }
}

/// Checklist for opening a process
pub fn validate_open(ds: &Dataset, name: &ProcessName) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push(check_process_exists(ds, name));
    report.push(check_status(
        ds,
        name,
        &[ProcessStatus::Submitted, ProcessStatus::InEditing],
    ));
    report
}

/// Checklist for running the retire/create pipeline
pub fn validate_pipeline(ds: &Dataset, name: &ProcessName) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push(check_process_exists(ds, name));
    report.push(check_status(
        ds,
        name,
        &[ProcessStatus::Submitted, ProcessStatus::InEditing],
    ));
    report.push(check_final_numbers(ds, name));
    report.push(check_absorbing_blocks(ds, name));
    report.push(check_stated_areas(ds, name));
    report
}

/// Checklist for closing a process
pub fn validate_close(ds: &Dataset, name: &ProcessName) -> ValidationReport {
    let mut report = ValidationReport::default();
    report.push(check_process_exists(ds, name));
    report.push(check_status(
        ds,
        name,
        &[ProcessStatus::InEditing, ProcessStatus::ReadyToFinalize],
    ));
    report
}
