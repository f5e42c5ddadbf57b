//! Cadastral record-lifecycle engine
//!
//! Facade crate re-exporting the public API of the workspace:
//! - [`cadastre_core`]: identifiers, domain enums, features, geometry
//! - [`cadastre_store`]: versioned collections, branch engine, shelf
//! - [`cadastre_engine`]: resolver, pipeline, sessions, matching,
//!   validation, notification
//!
//! ## Example
//!
//! ```
//! use cadastre::{BranchEngine, Dataset, ProcessName};
//!
//! let engine = BranchEngine::new(Dataset::new());
//! let name = ProcessName::parse("15/2024").unwrap();
//! assert!(engine.with_baseline(|ds| ds.processes_named(&name).is_empty()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use cadastre_core::{
    ActionType, Block, BlockKey, BlockStatus, BorderPoint, BranchId, CancelType, Coord,
    CreateType, Error, FeatureId, Front, InProcessFront, InProcessParcel, InProcessPoint,
    LandType, LineStatus, Parcel, Parcel3d, ParcelKey, ParcelRole, PointGeom, PointStatus,
    Polygon, Process, ProcessName, ProcessStatus, ProcessType, Provenance, Record, RecordId,
    Result, Ring, Segment, SequenceAction, Subtraction,
};
pub use cadastre_engine::{
    execute, import_points, match_points, reconcile_block, resolve_final, validate_close,
    validate_open, validate_pipeline, BlockOutcome, CheckOutcome, Config, EditSession,
    ImportMode, ImportReport, MatchReport, Notifier, NotifyOutcome, NotifyTransport,
    PhaseOutcome, PipelineReport, RecordContext, RecordingTransport, Resolution,
    RetirementPolicy, SessionState, ValidationReport,
};
pub use cadastre_store::{
    BranchEngine, ConflictPolicy, Dataset, EngineState, ReconcileReport, ShelfCache, ShelfEntry,
    Table, Versioned,
};
