//! Error types for the cadastre engine
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Note the taxonomy split: hard errors live here, while validation
//! failures and data-integrity warnings are *data* (see the engine's
//! `ValidationReport` and `PipelineReport`) and never surface as `Err`.

use crate::types::{BlockKey, ParcelKey, ProcessName};
use std::io;
use thiserror::Error;

/// Result type alias for cadastre operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the cadastre engine
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (shelf files, session logs, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A process name did not parse as `<number>/<year>` or `<block>/<subblock>`
    #[error("Invalid process name: {0:?}")]
    InvalidProcessName(String),

    /// A domain code had no mapping to its enum
    #[error("Unknown {domain} code: {code}")]
    UnknownCode {
        /// Domain the code belongs to (e.g. "ProcessType")
        domain: &'static str,
        /// The unmapped code value
        code: i32,
    },

    /// Process not found in the process-borders collection
    #[error("Process {0} not found")]
    ProcessNotFound(ProcessName),

    /// More than one feature matched a query that requires a unique answer
    #[error("Expected one {entity} named {name}, found {count}")]
    Duplicate {
        /// Entity kind ("process", "record", "parcel", ...)
        entity: &'static str,
        /// The queried name
        name: String,
        /// Number of matches found
        count: usize,
    },

    /// No active parcel exists for the given key
    #[error("Parcel {0} does not exist or is not active")]
    ParcelNotActive(ParcelKey),

    /// No block exists for the given key
    #[error("Block {0} not found")]
    BlockNotFound(BlockKey),

    /// Branch engine error (create/reconcile/post)
    #[error("Branch error: {0}")]
    Branch(String),

    /// A reconcile/post run reported errors in its log; the branch stays open
    #[error("Reconcile of branch {branch} failed, branch left open: {log}")]
    ReconcileFailed {
        /// Branch that failed to post
        branch: String,
        /// The reconcile log excerpt
        log: String,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
