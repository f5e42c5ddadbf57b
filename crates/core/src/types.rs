//! Identifier and key types for the cadastre engine
//!
//! This module defines the foundational identity types:
//! - RecordId / FeatureId / BranchId: UUID newtypes
//! - ProcessName: validated `<number>/<year>` or `<block>/<subblock>` name
//! - ParcelKey / BlockKey: logical feature identities

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Permanent identifier of a Record
///
/// Every retired or created feature references the Record that caused
/// the change through this identifier (`created_by` / `retired_by`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new random RecordId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a RecordId from a string representation
    ///
    /// Accepts standard UUID format (with or without hyphens).
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Row identifier for any stored feature (parcel, front, point, block, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(Uuid);

impl FeatureId {
    /// Create a new random FeatureId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a FeatureId from a string representation
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an isolation branch in the branch engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchId(Uuid);

impl BranchId {
    /// Create a new random BranchId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BranchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-assigned unique name of a cadastral process
///
/// Format is either `<number>/<year>` (plan-numbered processes) or
/// `<block>/<subblock>` (block-named processes such as block regulation).
/// Both parts must be non-empty decimal integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessName {
    first: u32,
    second: u32,
}

impl ProcessName {
    /// Parse a process name of the form `a/b`
    pub fn parse(s: &str) -> Result<Self, Error> {
        let mut parts = s.split('/');
        let (a, b) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => (a, b),
            _ => return Err(Error::InvalidProcessName(s.to_string())),
        };
        let first = a
            .parse::<u32>()
            .map_err(|_| Error::InvalidProcessName(s.to_string()))?;
        let second = b
            .parse::<u32>()
            .map_err(|_| Error::InvalidProcessName(s.to_string()))?;
        Ok(Self { first, second })
    }

    /// Construct from already-validated parts
    pub fn from_parts(first: u32, second: u32) -> Self {
        Self { first, second }
    }

    /// First component (plan number, or block number for block-named processes)
    pub fn first(&self) -> u32 {
        self.first
    }

    /// Second component (plan year, or sub-block number)
    pub fn second(&self) -> u32 {
        self.second
    }

    /// Filesystem-safe form of the name (`/` replaced with `_`)
    ///
    /// Used for the per-process shelf directory and report file names.
    pub fn sanitized(&self) -> String {
        format!("{}_{}", self.first, self.second)
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// Logical identity of a parcel: number within a block and sub-block
///
/// At most one active (non-retired) parcel exists per key at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParcelKey {
    /// Parcel number within the block
    pub number: u32,
    /// Block number
    pub block: u32,
    /// Sub-block number (0 when the block is not subdivided)
    pub sub_block: u32,
}

impl ParcelKey {
    /// Create a new parcel key
    pub fn new(number: u32, block: u32, sub_block: u32) -> Self {
        Self {
            number,
            block,
            sub_block,
        }
    }

    /// The block this parcel belongs to
    pub fn block_key(&self) -> BlockKey {
        BlockKey::new(self.block, self.sub_block)
    }
}

impl fmt::Display for ParcelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.number, self.block, self.sub_block)
    }
}

/// Logical identity of a block: block number and sub-block number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockKey {
    /// Block number
    pub block: u32,
    /// Sub-block number
    pub sub_block: u32,
}

impl BlockKey {
    /// Create a new block key
    pub fn new(block: u32, sub_block: u32) -> Self {
        Self { block, sub_block }
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.block, self.sub_block)
    }
}
