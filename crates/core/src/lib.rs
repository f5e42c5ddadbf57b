//! Core types for the cadastre engine
//!
//! This crate defines the foundational types used throughout the system:
//! - Identifiers: RecordId, FeatureId, BranchId, ProcessName
//! - Keys: ParcelKey, BlockKey
//! - Domain enums: ProcessType, ProcessStatus, ActionType, CancelType, CreateType
//! - Geometry value types: Coord, PointGeom, Segment, Polygon
//! - Feature records: Process, Record, Parcel, Front, BorderPoint, Block, Subtraction
//! - SequenceAction: the append-only editing-action log row
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod domain;
pub mod error;
pub mod features;
pub mod geometry;
pub mod types;

pub use action::{ActionType, SequenceAction};
pub use domain::{
    BlockStatus, CancelType, CreateType, LandType, LineStatus, ParcelRole, PointStatus,
    ProcessStatus, ProcessType,
};
pub use error::{Error, Result};
pub use features::{
    Block, BorderPoint, Front, InProcessFront, InProcessParcel, InProcessPoint, Parcel, Parcel3d,
    Process, Provenance, Record, Subtraction,
};
pub use geometry::{Coord, PointGeom, Polygon, Ring, Segment};
pub use types::{BlockKey, BranchId, FeatureId, ParcelKey, ProcessName, RecordId};
