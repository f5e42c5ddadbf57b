//! The cadastre engine
//!
//! Everything that turns a surveyor's staged edits into recorded
//! registry state:
//! - `resolver`: temp-number → final-number translation
//! - `pipeline`: the ordered retire/create transaction
//! - `reconciler`: derived block geometry and stated area
//! - `session`: open/close lifecycle over the branch engine
//! - `matching`: tolerance-based point matching and import
//! - `validation`: pre-flight checklists
//! - `notify`: case-management status notifications
//! - `config`: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod matching;
pub mod notify;
pub mod pipeline;
pub mod reconciler;
pub mod report;
pub mod resolver;
pub mod session;
pub mod validation;

pub use config::{Config, RetirementPolicy};
pub use matching::{
    import_points, match_points, ImportMode, ImportReport, MatchConflict, MatchReport, PointMatch,
};
pub use notify::{notify_path, Notifier, NotifyOutcome, NotifyTransport, RecordingTransport};
pub use pipeline::{execute, sweep_unsettled, RecordContext};
pub use reconciler::{reconcile_block, refresh_stated_area, BlockOutcome};
pub use report::{PhaseOutcome, PhaseResult, PipelineReport};
pub use resolver::{resolve_final, Resolution};
pub use session::{EditSession, SessionState};
pub use validation::{
    validate_close, validate_open, validate_pipeline, CheckOutcome, ValidationReport,
};
