//! In-memory versioned feature store for the cadastre engine
//!
//! This crate provides the storage substrate the engine runs on:
//! - `Table` / `Versioned`: typed collections with per-row versions
//! - `Dataset`: the full set of registry collections plus query helpers
//! - `BranchEngine`: isolated edit branches over a shared baseline,
//!   with reconcile (favor-edit) and post
//! - `ShelfCache`: the durable per-process side-files that carry record
//!   and branch identity across tool invocations
//!
//! The store is a reference implementation of the registry interfaces:
//! everything lives in memory behind `parking_lot` locks, except the
//! shelf, which is deliberately durable.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch;
pub mod dataset;
pub mod shelf;
pub mod tables;

pub use branch::{
    Branch, BranchEngine, ConflictEntry, ConflictPolicy, EngineState, ReconcileReport,
};
pub use dataset::Dataset;
pub use shelf::{ShelfCache, ShelfEntry};
pub use tables::{Table, Versioned};
