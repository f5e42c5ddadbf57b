//! Typed row collections with per-row versions
//!
//! `Table<T>` is an ordered map from `FeatureId` to a `Versioned<T>`.
//! Every write bumps the row version; the branch engine compares row
//! versions against its creation-time snapshot to decide which rows
//! changed on which side of a branch.

use cadastre_core::FeatureId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored row together with its write counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The row value
    pub value: T,
    /// Incremented on every write to this row
    pub version: u64,
}

/// An ordered collection of versioned rows keyed by `FeatureId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table<T> {
    rows: BTreeMap<FeatureId, Versioned<T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Clone> Table<T> {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a new row at version 1; replaces any existing row
    pub fn insert(&mut self, id: FeatureId, value: T) {
        let version = self.rows.get(&id).map(|r| r.version + 1).unwrap_or(1);
        self.rows.insert(id, Versioned { value, version });
    }

    /// Look up a row by id
    pub fn get(&self, id: &FeatureId) -> Option<&T> {
        self.rows.get(id).map(|r| &r.value)
    }

    /// Version of a row, if present
    pub fn version(&self, id: &FeatureId) -> Option<u64> {
        self.rows.get(id).map(|r| r.version)
    }

    /// Mutate a row in place, bumping its version
    ///
    /// Returns false when the row does not exist.
    pub fn update(&mut self, id: &FeatureId, f: impl FnOnce(&mut T)) -> bool {
        match self.rows.get_mut(id) {
            Some(row) => {
                f(&mut row.value);
                row.version += 1;
                true
            }
            None => false,
        }
    }

    /// Mutate every row matching a predicate, bumping versions
    ///
    /// Returns the number of rows changed.
    pub fn update_where(&mut self, pred: impl Fn(&T) -> bool, mut f: impl FnMut(&mut T)) -> usize {
        let mut changed = 0;
        for row in self.rows.values_mut() {
            if pred(&row.value) {
                f(&mut row.value);
                row.version += 1;
                changed += 1;
            }
        }
        changed
    }

    /// Iterate over `(id, value)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&FeatureId, &T)> {
        self.rows.iter().map(|(id, row)| (id, &row.value))
    }

    /// Iterate over values matching a predicate
    pub fn find<'a>(&'a self, pred: impl Fn(&T) -> bool) -> impl Iterator<Item = &'a T> {
        self.rows.values().map(|r| &r.value).filter(move |v| pred(v))
    }

    /// First value matching a predicate
    pub fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<&T> {
        self.rows.values().map(|r| &r.value).find(|v| pred(v))
    }

    /// Count values matching a predicate
    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.rows.values().filter(|r| pred(&r.value)).count()
    }

    /// Row ids present in this table
    pub fn ids(&self) -> impl Iterator<Item = &FeatureId> {
        self.rows.keys()
    }

    /// Access the raw versioned row
    pub fn row(&self, id: &FeatureId) -> Option<&Versioned<T>> {
        self.rows.get(id)
    }

    /// Overwrite a row with an exact versioned value (branch post)
    pub fn put_row(&mut self, id: FeatureId, row: Versioned<T>) {
        self.rows.insert(id, row);
    }
}
