//! Feature records stored in the registry collections
//!
//! Every long-lived feature (parcel, front, border point, block,
//! subtraction) carries a `Provenance`: which record created it, which
//! record retired it, and the type codes stamped at each event. A
//! feature is *active* while `retired_by` is unset; retirement is
//! terminal and at most one active feature exists per logical identity.
//!
//! The `InProcess*` rows are the surveyor's staging area: they carry
//! temporary numbers and a role/status telling the pipeline what to do
//! with them, and are never part of the registry baseline themselves.

use crate::domain::{
    BlockStatus, CancelType, CreateType, LandType, LineStatus, ParcelRole, PointStatus,
    ProcessStatus, ProcessType,
};
use crate::geometry::{PointGeom, Polygon, Segment};
use crate::types::{BlockKey, FeatureId, ParcelKey, ProcessName, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle stamps shared by all registry features
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Provenance {
    /// Record that created this feature
    pub created_by: Option<RecordId>,
    /// Creation type stamped at creation
    pub create_type: Option<CreateType>,
    /// When the feature was created
    pub created_at: Option<DateTime<Utc>>,
    /// Record that retired this feature; `None` while active
    pub retired_by: Option<RecordId>,
    /// Cancellation type stamped at retirement
    pub cancel_type: Option<CancelType>,
    /// When the feature was retired
    pub retired_at: Option<DateTime<Utc>>,
}

impl Provenance {
    /// Provenance for a feature created by `record` with `create_type`
    pub fn created(record: RecordId, create_type: CreateType) -> Self {
        Self {
            created_by: Some(record),
            create_type: Some(create_type),
            created_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Whether the feature is still active (not retired)
    pub fn is_active(&self) -> bool {
        self.retired_by.is_none()
    }

    /// Stamp retirement; no-op if already retired
    pub fn retire(&mut self, record: RecordId, cancel_type: CancelType) {
        if self.retired_by.is_none() {
            self.retired_by = Some(record);
            self.cancel_type = Some(cancel_type);
            self.retired_at = Some(Utc::now());
        }
    }
}

/// A cadastral process: one registration plan, judgement, or regulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Row identifier
    pub id: FeatureId,
    /// Unique human-assigned name
    pub name: ProcessName,
    /// Kind of process
    pub process_type: ProcessType,
    /// Lifecycle status
    pub status: ProcessStatus,
    /// Border polygon of the area the process covers
    pub border: Polygon,
    /// Block the process chiefly concerns
    pub block: BlockKey,
}

/// The transactional record of a process
///
/// Created lazily the first time the process is opened for editing and
/// reused afterwards (1:1 with `Process`). All provenance stamps point
/// at the record, not the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Permanent record identifier referenced by provenance stamps
    pub id: RecordId,
    /// Name of the owning process
    pub name: ProcessName,
    /// Kind of the owning process
    pub process_type: ProcessType,
    /// Lifecycle status, kept in step with the process
    pub status: ProcessStatus,
}

/// A registered 2D land parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    /// Row identifier
    pub id: FeatureId,
    /// Logical identity (number within block and sub-block)
    pub key: ParcelKey,
    /// Parcel polygon
    pub geometry: Polygon,
    /// Legally stated area in square meters
    pub stated_area: Option<f64>,
    /// Registration state of the land
    pub land_type: LandType,
    /// Whether the parcel exists for taxation only
    pub is_tax: bool,
    /// Planning designation of the land
    pub land_designation: Option<String>,
    /// Lifecycle stamps
    pub provenance: Provenance,
}

impl Parcel {
    /// Whether the parcel is active
    pub fn is_active(&self) -> bool {
        self.provenance.is_active()
    }

    /// The block this parcel belongs to
    pub fn block_key(&self) -> BlockKey {
        self.key.block_key()
    }
}

/// A registered 3D (volumetric) parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel3d {
    /// Row identifier
    pub id: FeatureId,
    /// Logical identity
    pub key: ParcelKey,
    /// Footprint polygon
    pub geometry: Polygon,
    /// Legally stated area in square meters
    pub stated_area: Option<f64>,
    /// Registered volume in cubic meters
    pub volume: Option<f64>,
    /// Lifecycle stamps
    pub provenance: Provenance,
}

impl Parcel3d {
    /// Whether the 3D parcel is active
    pub fn is_active(&self) -> bool {
        self.provenance.is_active()
    }
}

/// A subtraction: the part of a 2D parcel occupied by a 3D parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtraction {
    /// Row identifier
    pub id: FeatureId,
    /// The occupying 3D parcel
    pub parcel_3d: FeatureId,
    /// The occupied 2D parcel
    pub parcel_2d: FeatureId,
    /// Subtracted region
    pub geometry: Polygon,
    /// Lifecycle stamps
    pub provenance: Provenance,
}

impl Subtraction {
    /// Whether the subtraction is active
    pub fn is_active(&self) -> bool {
        self.provenance.is_active()
    }
}

/// A parcel front: one legal boundary line of a parcel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Front {
    /// Row identifier
    pub id: FeatureId,
    /// Line geometry
    pub segment: Segment,
    /// Legal length in meters (may differ from the geometric length)
    pub distance: Option<f64>,
    /// Arc radius for curved fronts
    pub radius: Option<f64>,
    /// Line type code
    pub line_type: Option<i32>,
    /// Border point at the start of the line
    pub start_point: Option<FeatureId>,
    /// Border point at the end of the line
    pub end_point: Option<FeatureId>,
    /// Lifecycle stamps
    pub provenance: Provenance,
}

impl Front {
    /// Whether the front is active
    pub fn is_active(&self) -> bool {
        self.provenance.is_active()
    }
}

/// A surveyed border point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderPoint {
    /// Row identifier
    pub id: FeatureId,
    /// Point geometry
    pub geometry: PointGeom,
    /// Point name / field number
    pub name: Option<String>,
    /// Survey accuracy class
    pub class: Option<i32>,
    /// Lifecycle stamps
    pub provenance: Provenance,
}

impl BorderPoint {
    /// Whether the point is active
    pub fn is_active(&self) -> bool {
        self.provenance.is_active()
    }
}

/// A cadastral block
///
/// Block geometry is derived: it is always the dissolve of the block's
/// active parcels, recomputed by the reconciler after every change.
/// `stated_area` is likewise derived as the sum of active parcels'
/// stated areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Row identifier
    pub id: FeatureId,
    /// Logical identity
    pub key: BlockKey,
    /// Derived polygon (empty for `Preplanned` blocks)
    pub geometry: Polygon,
    /// Lifecycle status
    pub status: BlockStatus,
    /// Derived sum of active parcels' stated areas
    pub stated_area: Option<f64>,
    /// Whether the block exists for taxation only
    pub is_tax: bool,
    /// Registration state of the land
    pub land_type: LandType,
    /// Lifecycle stamps
    pub provenance: Provenance,
}

impl Block {
    /// Whether the block is active
    pub fn is_active(&self) -> bool {
        self.provenance.is_active()
    }
}

// ===== In-process staging rows =====

/// A staged parcel inside an open process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProcessParcel {
    /// Row identifier
    pub id: FeatureId,
    /// Owning process
    pub process: ProcessName,
    /// Temporary number within the process
    pub temp_number: u32,
    /// Home block
    pub block: u32,
    /// Home sub-block
    pub sub_block: u32,
    /// What the pipeline should do with this row
    pub role: ParcelRole,
    /// Staged polygon
    pub geometry: Polygon,
    /// Stated area to carry onto the created parcel
    pub stated_area: Option<f64>,
    /// Land type to carry onto the created parcel
    pub land_type: LandType,
    /// Tax-only flag to carry onto the created parcel
    pub is_tax: bool,
    /// Planning designation to carry onto the created parcel
    pub land_designation: Option<String>,
    /// Set when the owning process has been recorded
    pub recorded: bool,
}

impl InProcessParcel {
    /// Home block key of the staged parcel
    pub fn block_key(&self) -> BlockKey {
        BlockKey::new(self.block, self.sub_block)
    }
}

/// A staged front inside an open process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProcessFront {
    /// Row identifier
    pub id: FeatureId,
    /// Owning process
    pub process: ProcessName,
    /// Staged line geometry
    pub segment: Segment,
    /// Legal length in meters
    pub distance: Option<f64>,
    /// Arc radius for curved fronts
    pub radius: Option<f64>,
    /// Line type code
    pub line_type: Option<i32>,
    /// What the pipeline should do with this row
    pub status: LineStatus,
    /// Set when the owning process has been recorded
    pub recorded: bool,
}

/// A staged border point inside an open process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProcessPoint {
    /// Row identifier
    pub id: FeatureId,
    /// Owning process
    pub process: ProcessName,
    /// Staged point geometry
    pub geometry: PointGeom,
    /// Point name / field number
    pub name: Option<String>,
    /// Survey accuracy class
    pub class: Option<i32>,
    /// What the pipeline should do with this row
    pub status: PointStatus,
    /// Set when the owning process has been recorded
    pub recorded: bool,
}
