//! Domain enums and their registry code mappings
//!
//! The registry stores lifecycle and type fields as small integer codes
//! backed by coded-value domains. This module replaces those side lookup
//! tables with proper tagged enums and exhaustive, compile-time-checked
//! mapping tables (`as_code` / `from_code`), so an unmapped code is a
//! typed error instead of a runtime dictionary miss.
//!
//! ## Code values
//!
//! These values mirror the registry's domains and MUST NOT change:
//! the branch engine and the case-management endpoint both interpret
//! them.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of a cadastral process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ProcessType {
    /// Ordinary registration plan
    Ordinary = 1,
    /// Volumetric (3D) plan
    ThreeDimensional = 2,
    /// Court judgement
    Judgement = 3,
    /// Block regulation (block-named process)
    BlockRegulation = 9,
    /// First registration of previously unregistered land
    FirstRegistration = 11,
    /// Settlement plan over a whole block (block-named process)
    Settlement = 15,
    /// Free-form editing session
    FreeEdit = 16,
}

impl ProcessType {
    /// Registry code of this process type
    pub fn as_code(&self) -> i32 {
        *self as i32
    }

    /// Map a registry code to a process type
    pub fn from_code(code: i32) -> Result<Self, Error> {
        match code {
            1 => Ok(ProcessType::Ordinary),
            2 => Ok(ProcessType::ThreeDimensional),
            3 => Ok(ProcessType::Judgement),
            9 => Ok(ProcessType::BlockRegulation),
            11 => Ok(ProcessType::FirstRegistration),
            15 => Ok(ProcessType::Settlement),
            16 => Ok(ProcessType::FreeEdit),
            _ => Err(Error::UnknownCode {
                domain: "ProcessType",
                code,
            }),
        }
    }

    /// Cancellation type stamped on features retired by this process type
    pub fn cancel_type(&self) -> CancelType {
        match self {
            ProcessType::Ordinary => CancelType::Ordinary,
            ProcessType::ThreeDimensional => CancelType::ThreeDimensional,
            ProcessType::Judgement => CancelType::Judgement,
            ProcessType::BlockRegulation => CancelType::BlockRegulation,
            ProcessType::FirstRegistration => CancelType::FirstRegistration,
            ProcessType::Settlement => CancelType::Settlement,
            ProcessType::FreeEdit => CancelType::FreeEdit,
        }
    }

    /// Creation type stamped on features created by this process type
    pub fn create_type(&self) -> CreateType {
        match self {
            ProcessType::Ordinary => CreateType::Ordinary,
            ProcessType::ThreeDimensional => CreateType::ThreeDimensional,
            ProcessType::Judgement => CreateType::Judgement,
            ProcessType::BlockRegulation => CreateType::BlockRegulation,
            ProcessType::FirstRegistration => CreateType::FirstRegistration,
            ProcessType::Settlement => CreateType::Settlement,
            ProcessType::FreeEdit => CreateType::FreeEdit,
        }
    }

    /// Whether the process name encodes a block (`<block>/<subblock>`)
    /// rather than a plan number and year
    ///
    /// Block-named processes have no rows in the sequence-action log and
    /// use the block encoding when notifying the case-management system.
    pub fn is_block_named(&self) -> bool {
        matches!(self, ProcessType::BlockRegulation | ProcessType::Settlement)
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessType::Ordinary => "Ordinary",
            ProcessType::ThreeDimensional => "3D",
            ProcessType::Judgement => "Judgement",
            ProcessType::BlockRegulation => "BlockRegulation",
            ProcessType::FirstRegistration => "FirstRegistration",
            ProcessType::Settlement => "Settlement",
            ProcessType::FreeEdit => "FreeEdit",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle status of a process / record
///
/// Status progresses monotonically:
/// `Submitted → InEditing → ReadyToFinalize → Recorded`.
/// `Recorded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ProcessStatus {
    /// Submitted by the surveyor, not yet under editing
    Submitted = 4,
    /// A record exists and an edit session may be open
    InEditing = 5,
    /// Editing done, awaiting reconcile/post
    ReadyToFinalize = 6,
    /// Posted to the baseline (terminal)
    Recorded = 10,
}

impl ProcessStatus {
    /// Registry code of this status
    pub fn as_code(&self) -> i32 {
        *self as i32
    }

    /// Map a registry code to a status
    pub fn from_code(code: i32) -> Result<Self, Error> {
        match code {
            4 => Ok(ProcessStatus::Submitted),
            5 => Ok(ProcessStatus::InEditing),
            6 => Ok(ProcessStatus::ReadyToFinalize),
            10 => Ok(ProcessStatus::Recorded),
            _ => Err(Error::UnknownCode {
                domain: "ProcessStatus",
                code,
            }),
        }
    }

    /// Whether `next` is a legal forward transition from this status
    pub fn can_advance_to(&self, next: ProcessStatus) -> bool {
        matches!(
            (self, next),
            (ProcessStatus::Submitted, ProcessStatus::InEditing)
                | (ProcessStatus::InEditing, ProcessStatus::ReadyToFinalize)
                | (ProcessStatus::ReadyToFinalize, ProcessStatus::Recorded)
        )
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::Submitted => "Submitted",
            ProcessStatus::InEditing => "InEditing",
            ProcessStatus::ReadyToFinalize => "ReadyToFinalize",
            ProcessStatus::Recorded => "Recorded",
        };
        write!(f, "{}", s)
    }
}

/// Cancellation type stamped on retired features
///
/// Note the codes are NOT the process-type codes; the registry assigns
/// the cancellation domain its own numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CancelType {
    /// Retired by an ordinary plan
    Ordinary = 1,
    /// Retired by a court judgement
    Judgement = 2,
    /// Retired by a first registration
    FirstRegistration = 3,
    /// Retired by a 3D plan
    ThreeDimensional = 4,
    /// Retired by a block regulation
    BlockRegulation = 5,
    /// Retired by a settlement plan
    Settlement = 6,
    /// Retired in a free-edit session
    FreeEdit = 16,
}

impl CancelType {
    /// Registry code of this cancellation type
    pub fn as_code(&self) -> i32 {
        *self as i32
    }
}

/// Creation type stamped on created features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CreateType {
    /// Created by an ordinary plan
    Ordinary = 1,
    /// Created by a court judgement
    Judgement = 2,
    /// Created by a block regulation
    BlockRegulation = 3,
    /// Created by a first registration
    FirstRegistration = 4,
    /// Created by a 3D plan
    ThreeDimensional = 5,
    /// Created by a settlement plan
    Settlement = 6,
    /// Created in a free-edit session
    FreeEdit = 16,
}

impl CreateType {
    /// Registry code of this creation type
    pub fn as_code(&self) -> i32 {
        *self as i32
    }
}

/// Role of a staged in-process parcel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ParcelRole {
    /// Supersedes an active parcel; the active instance retires
    Retire = 1,
    /// A new parcel to create
    New = 2,
    /// Unchanged parcel kept for reference
    Preserve = 3,
    /// Created and immediately retired by the same record
    Intermediate = 4,
}

/// Status of a staged in-process front
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum LineStatus {
    /// Supersedes an active front
    Retire = 1,
    /// A new front to create
    New = 2,
    /// Unchanged front kept for reference
    Preserve = 3,
}

/// Status of a staged in-process border point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum PointStatus {
    /// Supersedes an active point
    Retire = 1,
    /// A new point to create
    New = 2,
    /// Unchanged point kept for reference
    Preserve = 3,
}

/// Registration state of the land a feature sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum LandType {
    /// Title-settled land
    Settled = 1,
    /// Land not yet settled
    Unsettled = 2,
}

/// Lifecycle status of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum BlockStatus {
    /// Registered, geometry derived from active parcels
    Registered = 1,
    /// Established by a plan (absorbing block after construction)
    Established = 12,
    /// Pre-planned: exists with empty geometry, awaiting its plan
    Preplanned = 13,
}

impl BlockStatus {
    /// Registry code of this block status
    pub fn as_code(&self) -> i32 {
        *self as i32
    }

    /// Map a registry code to a block status
    pub fn from_code(code: i32) -> Result<Self, Error> {
        match code {
            1 => Ok(BlockStatus::Registered),
            12 => Ok(BlockStatus::Established),
            13 => Ok(BlockStatus::Preplanned),
            _ => Err(Error::UnknownCode {
                domain: "BlockStatus",
                code,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_type_code_roundtrip() {
        for ty in [
            ProcessType::Ordinary,
            ProcessType::ThreeDimensional,
            ProcessType::Judgement,
            ProcessType::BlockRegulation,
            ProcessType::FirstRegistration,
            ProcessType::Settlement,
            ProcessType::FreeEdit,
        ] {
            assert_eq!(ProcessType::from_code(ty.as_code()).unwrap(), ty);
        }
    }

    #[test]
    fn test_process_type_unknown_code() {
        let err = ProcessType::from_code(99).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownCode {
                domain: "ProcessType",
                code: 99
            }
        ));
    }

    #[test]
    fn test_cancel_type_mapping() {
        // The cancellation domain has its own numbering.
        assert_eq!(ProcessType::Ordinary.cancel_type().as_code(), 1);
        assert_eq!(ProcessType::Judgement.cancel_type().as_code(), 2);
        assert_eq!(ProcessType::FirstRegistration.cancel_type().as_code(), 3);
        assert_eq!(ProcessType::ThreeDimensional.cancel_type().as_code(), 4);
        assert_eq!(ProcessType::BlockRegulation.cancel_type().as_code(), 5);
        assert_eq!(ProcessType::FreeEdit.cancel_type().as_code(), 16);
    }

    #[test]
    fn test_create_type_mapping() {
        assert_eq!(ProcessType::Ordinary.create_type().as_code(), 1);
        assert_eq!(ProcessType::Judgement.create_type().as_code(), 2);
        assert_eq!(ProcessType::BlockRegulation.create_type().as_code(), 3);
        assert_eq!(ProcessType::FirstRegistration.create_type().as_code(), 4);
        assert_eq!(ProcessType::ThreeDimensional.create_type().as_code(), 5);
        assert_eq!(ProcessType::FreeEdit.create_type().as_code(), 16);
    }

    #[test]
    fn test_block_named_types() {
        assert!(ProcessType::BlockRegulation.is_block_named());
        assert!(ProcessType::Settlement.is_block_named());
        assert!(!ProcessType::Ordinary.is_block_named());
        assert!(!ProcessType::ThreeDimensional.is_block_named());
    }

    #[test]
    fn test_status_progression() {
        assert!(ProcessStatus::Submitted.can_advance_to(ProcessStatus::InEditing));
        assert!(ProcessStatus::InEditing.can_advance_to(ProcessStatus::ReadyToFinalize));
        assert!(ProcessStatus::ReadyToFinalize.can_advance_to(ProcessStatus::Recorded));
        // No skipping, no going back.
        assert!(!ProcessStatus::Submitted.can_advance_to(ProcessStatus::Recorded));
        assert!(!ProcessStatus::Recorded.can_advance_to(ProcessStatus::Submitted));
        assert!(!ProcessStatus::InEditing.can_advance_to(ProcessStatus::Submitted));
    }

    #[test]
    fn test_status_code_roundtrip() {
        for st in [
            ProcessStatus::Submitted,
            ProcessStatus::InEditing,
            ProcessStatus::ReadyToFinalize,
            ProcessStatus::Recorded,
        ] {
            assert_eq!(ProcessStatus::from_code(st.as_code()).unwrap(), st);
        }
        assert!(ProcessStatus::from_code(0).is_err());
    }

    #[test]
    fn test_block_status_codes() {
        assert_eq!(BlockStatus::from_code(13).unwrap(), BlockStatus::Preplanned);
        assert_eq!(BlockStatus::from_code(12).unwrap(), BlockStatus::Established);
        assert!(BlockStatus::from_code(7).is_err());
    }

    #[test]
    fn test_domain_serde_roundtrip() {
        let ty = ProcessType::BlockRegulation;
        let json = serde_json::to_string(&ty).unwrap();
        let restored: ProcessType = serde_json::from_str(&json).unwrap();
        assert_eq!(ty, restored);
    }
}
