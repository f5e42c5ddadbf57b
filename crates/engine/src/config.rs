//! Engine configuration
//!
//! Loaded from a TOML file; every field has an in-code default so the
//! engine runs without a config file at all.

use std::fs;
use std::path::{Path, PathBuf};

use cadastre_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Eligibility rule for auto-retiring unsettled parcels
///
/// The source rules diverge on whether all unsettled parcels inside a
/// first-registration border retire, or only tax-created ones. The rule
/// is configuration, not a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetirementPolicy {
    /// Only tax-created unsettled parcels retire automatically
    TaxOnly,
    /// Every unsettled parcel inside the border retires
    AllUnsettled,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory for per-process shelf files
    pub library_dir: PathBuf,
    /// Base URL of the case-management endpoint
    pub cms_base_url: String,
    /// Tolerance for matching staged endpoints to border points, meters
    pub point_tolerance_m: f64,
    /// Shelf-cache time to live, hours
    pub shelf_ttl_hours: i64,
    /// Unsettled-parcel retirement rule
    pub retirement_policy: RetirementPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_dir: PathBuf::from("library"),
            cms_base_url: "http://localhost:8080/processes".to_string(),
            point_tolerance_m: 0.05,
            shelf_ttl_hours: 12,
            retirement_policy: RetirementPolicy::TaxOnly,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load from a file if it exists, otherwise the defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
