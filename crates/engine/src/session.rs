//! Edit-session manager
//!
//! One session per process: open validates, finds or creates the
//! process's branch and record, and caches both in the shelf so a rerun
//! resumes instead of duplicating. Close walks the status chain,
//! reconciles with favor-edit and posts; a failed post leaves the
//! session in `Reconciling` with the branch still open for another
//! attempt. Branches are never deleted and never recreated.

use cadastre_core::{
    Error, FeatureId, ProcessName, ProcessStatus, Record, RecordId, Result,
};
use cadastre_store::{BranchEngine, ConflictPolicy, ReconcileReport, ShelfCache};
use chrono::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::pipeline::{self, RecordContext};
use crate::report::PipelineReport;
use crate::validation;

/// Lifecycle of an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No branch open for the process
    NoSession,
    /// Editing in an open branch
    Open,
    /// Post attempted and failed; the branch is still open
    Reconciling,
    /// Posted; the session is finished
    Closed,
}

/// An edit session for one process
#[derive(Debug, Clone)]
pub struct EditSession {
    process: ProcessName,
    user: String,
    state: SessionState,
    branch: String,
    record_id: RecordId,
}

impl EditSession {
    /// Process this session edits
    pub fn process(&self) -> &ProcessName {
        &self.process
    }

    /// Session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Branch the session edits in
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Record id of the process
    pub fn record_id(&self) -> RecordId {
        self.record_id
    }

    /// Open (or resume) the session for a process
    ///
    /// Validates first; an invalid checklist aborts before any branch or
    /// record exists. A valid shelf entry whose branch is still open
    /// resumes that session instead of creating a new branch.
    pub fn open(
        engine: &BranchEngine,
        config: &Config,
        process: &ProcessName,
        user: &str,
    ) -> Result<Self> {
        let report = engine.with_baseline(|ds| validation::validate_open(ds, process));
        if !report.is_valid() {
            let details: Vec<String> = report
                .failures()
                .iter()
                .filter_map(|c| c.detail.clone())
                .collect();
            return Err(Error::InvalidOperation(details.join("; ")));
        }

        let shelf = ShelfCache::open(
            &config.library_dir,
            process,
            Duration::hours(config.shelf_ttl_hours),
        )?;
        if let Some(entry) = shelf.load() {
            let resumable = engine
                .with_branch(&entry.branch, |b| !b.is_posted())
                .unwrap_or(false);
            if resumable {
                info!(process = %process, branch = %entry.branch, "resuming session from shelf");
                shelf.log_session(&entry.branch, user, "resume")?;
                return Ok(Self {
                    process: process.clone(),
                    user: user.to_string(),
                    state: SessionState::Open,
                    branch: entry.branch,
                    record_id: entry.record_id,
                });
            }
            warn!(process = %process, branch = %entry.branch, "shelf entry points at unusable branch");
        }

        let branch = next_branch_name(engine, process, user);
        engine.create_branch(&branch)?;
        let record_id = engine.with_branch_mut(&branch, |ds| load_record(ds, process))??;
        shelf.store(record_id, &branch)?;
        shelf.log_session(&branch, user, "open")?;
        info!(process = %process, branch = %branch, record = %record_id, "session opened");
        Ok(Self {
            process: process.clone(),
            user: user.to_string(),
            state: SessionState::Open,
            branch,
            record_id,
        })
    }

    /// Run the retire/create pipeline inside the session's branch
    pub fn run_pipeline(&self, engine: &BranchEngine, config: &Config) -> Result<PipelineReport> {
        if self.state != SessionState::Open {
            return Err(Error::InvalidOperation(format!(
                "session for {} is not open",
                self.process
            )));
        }
        let record_id = self.record_id;
        let process_name = self.process.clone();
        let branch = self.branch.clone();
        engine.with_branch_mut(&self.branch, move |ds| {
            let checklist = validation::validate_pipeline(ds, &process_name);
            if !checklist.is_valid() {
                let details: Vec<String> = checklist
                    .failures()
                    .iter()
                    .filter_map(|c| c.detail.clone())
                    .collect();
                return Err(Error::InvalidOperation(details.join("; ")));
            }
            let process = ds
                .processes_named(&process_name)
                .first()
                .map(|p| (*p).clone())
                .ok_or_else(|| Error::ProcessNotFound(process_name.clone()))?;
            let ctx = RecordContext {
                record_id,
                process,
                branch,
            };
            Ok(pipeline::execute(ds, &ctx, config))
        })?
    }

    /// Close the session: finalize statuses, reconcile and post
    ///
    /// On a failed post the session moves to `Reconciling`, the branch
    /// stays open, and close may be called again.
    pub fn close(&mut self, engine: &BranchEngine, config: &Config) -> Result<ReconcileReport> {
        if !matches!(self.state, SessionState::Open | SessionState::Reconciling) {
            return Err(Error::InvalidOperation(format!(
                "session for {} cannot close from {:?}",
                self.process, self.state
            )));
        }
        if self.state == SessionState::Open {
            let process_name = self.process.clone();
            if let Err(e) = engine.with_branch_mut(&self.branch, |ds| {
                finalize_statuses(ds, &process_name);
            }) {
                self.state = SessionState::Reconciling;
                return Err(Error::ReconcileFailed {
                    branch: self.branch.clone(),
                    log: e.to_string(),
                });
            }
        }
        self.state = SessionState::Reconciling;
        let report = match engine.post(&self.branch, ConflictPolicy::FavorEdit) {
            Ok(report) => report,
            Err(e) => {
                warn!(process = %self.process, branch = %self.branch, error = %e, "post failed, branch left open");
                return Err(Error::ReconcileFailed {
                    branch: self.branch.clone(),
                    log: e.to_string(),
                });
            }
        };
        self.state = SessionState::Closed;
        let shelf = ShelfCache::open(
            &config.library_dir,
            &self.process,
            Duration::hours(config.shelf_ttl_hours),
        )?;
        shelf.log_session(&self.branch, &self.user, "close")?;
        info!(process = %self.process, branch = %self.branch, posted = report.posted, "session closed");
        Ok(report)
    }
}

/// Next branch name for (process, user): `{process}_{user}_{n}`
///
/// `n` is one past the highest counter any existing branch of this
/// pair carries, so retries after a stuck post get a fresh name.
fn next_branch_name(engine: &BranchEngine, process: &ProcessName, user: &str) -> String {
    let prefix = format!("{}_{}_", process.sanitized(), user);
    let max = engine
        .branch_names()
        .iter()
        .filter_map(|name| name.strip_prefix(&prefix))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", max + 1)
}

/// Find or create the record of a process, idempotently
///
/// A duplicate open finds the existing record and refreshes its status
/// instead of inserting a second row.
fn load_record(ds: &mut cadastre_store::Dataset, process: &ProcessName) -> Result<RecordId> {
    let found = ds.record_named(process).map(|r| r.id);
    let process_row = ds
        .processes_named(process)
        .first()
        .map(|p| (*p).clone())
        .ok_or_else(|| Error::ProcessNotFound(process.clone()))?;

    // The process moves to InEditing the moment a record exists.
    if process_row.status == ProcessStatus::Submitted {
        ds.processes.update(&process_row.id, |p| {
            p.status = ProcessStatus::InEditing;
        });
    }

    if let Some(record_id) = found {
        ds.records.update_where(
            |r| r.id == record_id,
            |r| r.status = ProcessStatus::InEditing,
        );
        return Ok(record_id);
    }

    let record = Record {
        id: RecordId::new(),
        name: process.clone(),
        process_type: process_row.process_type,
        status: ProcessStatus::InEditing,
    };
    let record_id = record.id;
    ds.records.insert(FeatureId::new(), record);
    Ok(record_id)
}

/// Walk process and record to `Recorded` and flag staging rows
fn finalize_statuses(ds: &mut cadastre_store::Dataset, process: &ProcessName) {
    let chain = [ProcessStatus::ReadyToFinalize, ProcessStatus::Recorded];
    for status in chain {
        ds.processes
            .update_where(|p| &p.name == process && p.status.can_advance_to(status), |p| {
                p.status = status;
            });
        ds.records
            .update_where(|r| &r.name == process && r.status.can_advance_to(status), |r| {
                r.status = status;
            });
    }
    ds.in_parcels
        .update_where(|p| &p.process == process && !p.recorded, |p| p.recorded = true);
    ds.in_fronts
        .update_where(|f| &f.process == process && !f.recorded, |f| f.recorded = true);
    ds.in_points
        .update_where(|p| &p.process == process && !p.recorded, |p| p.recorded = true);
}
