//! Sequence actions: the append-only editing-action log
//!
//! Every numbering decision a surveyor makes while editing a process is
//! appended here as a `SequenceAction` row: "temp parcel 5 becomes final
//! parcel 103", "temps 3 and 4 merge into final 88", "final 12 transfers
//! to block 2070". The resolver reads these rows to translate staged
//! temporary numbers into permanent registry numbers.

use crate::error::Error;
use crate::types::ProcessName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of numbering action recorded in the sequence log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum ActionType {
    /// One parcel divided into several
    Divide = 1,
    /// Several parcels merged into one
    Merge = 2,
    /// A parcel transferred to another block
    Transfer = 3,
    /// Renumbering ordered by a court judgement
    Judgement = 4,
    /// A brand-new parcel
    Create = 5,
}

impl ActionType {
    /// Registry code of this action type
    pub fn as_code(&self) -> i32 {
        *self as i32
    }

    /// Map a registry code to an action type
    pub fn from_code(code: i32) -> Result<Self, Error> {
        match code {
            1 => Ok(ActionType::Divide),
            2 => Ok(ActionType::Merge),
            3 => Ok(ActionType::Transfer),
            4 => Ok(ActionType::Judgement),
            5 => Ok(ActionType::Create),
            _ => Err(Error::UnknownCode {
                domain: "ActionType",
                code,
            }),
        }
    }

    /// Resolution precedence when distinct rows disagree on a final
    /// number for the same temp parcel (lower wins)
    pub fn precedence(&self) -> u8 {
        match self {
            ActionType::Merge => 0,
            ActionType::Divide => 1,
            ActionType::Transfer => 2,
            ActionType::Judgement => 3,
            ActionType::Create => 4,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::Divide => "Divide",
            ActionType::Merge => "Merge",
            ActionType::Transfer => "Transfer",
            ActionType::Judgement => "Judgement",
            ActionType::Create => "Create",
        };
        write!(f, "{}", s)
    }
}

/// One row of the sequence-action log
///
/// A merge of N parcels produces N rows sharing the same
/// `final_number`. A transfer carries the destination block in
/// `to_block` / `to_sub_block`; for all other actions those are `None`
/// and the parcel stays in its home block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceAction {
    /// Process this row belongs to
    pub process: ProcessName,
    /// The numbering action kind
    pub action_type: ActionType,
    /// Temporary number of the staged parcel this row applies to
    pub temp_number: u32,
    /// Permanent registry number assigned by this row; `None` while the
    /// surveyor has not finished numbering
    pub final_number: Option<u32>,
    /// Home block of the staged parcel
    pub block: u32,
    /// Home sub-block of the staged parcel
    pub sub_block: u32,
    /// Destination block for transfers
    pub to_block: Option<u32>,
    /// Destination sub-block for transfers
    pub to_sub_block: Option<u32>,
}

impl SequenceAction {
    /// Block the final parcel will live in: destination when set,
    /// otherwise the home block
    pub fn effective_block(&self) -> u32 {
        self.to_block.unwrap_or(self.block)
    }

    /// Sub-block the final parcel will live in
    pub fn effective_sub_block(&self) -> u32 {
        self.to_sub_block.unwrap_or(self.sub_block)
    }

    /// Whether this row moves the parcel out of its home block
    pub fn is_cross_block(&self) -> bool {
        self.effective_block() != self.block || self.effective_sub_block() != self.sub_block
    }
}
