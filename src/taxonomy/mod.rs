//! Control and Asset Taxonomy
//!
//! The static definitions everything else is derived from:
//!
//! ```text
//! ControlGroup ──► Control ──► Safeguard ──(applicable ids)──┐
//!                                                            ▼
//!                                    AssetClass ──► AssetSubclass
//! ```
//!
//! plus the default measurement attributes and the example data used to seed
//! new workspaces. The taxonomy is loaded once and never mutated afterwards.

mod loader;
mod validate;

pub use loader::{TaxonomyLoader, TaxonomySource, TAXONOMY_ENV_VAR};
pub use validate::{ensure_valid, validate, TaxonomyIssue, TaxonomyReport};

use parfait_types::{AssetClass, Attribute, ControlGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TaxonomyError;

/// Shipped CIS Controls taxonomy
pub(crate) const CIS_CONTROLS_YAML: &str = include_str!("../../config/cis-controls.yaml");

/// Enforcement point used when the taxonomy has no default for a safeguard+subclass
pub const FALLBACK_ENFORCEMENT_POINT: &str = "Manual Process";

/// Complete taxonomy definition as stored in YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub control_groups: Vec<ControlGroup>,

    #[serde(default)]
    pub asset_classes: Vec<AssetClass>,

    /// Attributes every new workspace starts with
    #[serde(default)]
    pub default_attributes: Vec<Attribute>,

    /// Attribute id → sample measurement methods (seed data)
    #[serde(default)]
    pub example_methods: BTreeMap<String, Vec<String>>,

    /// Safeguard id → subclass id → enforcement point (seed data)
    #[serde(default)]
    pub default_enforcement_points: BTreeMap<String, BTreeMap<String, String>>,
}

impl Taxonomy {
    /// Load and validate the embedded CIS Controls taxonomy
    pub fn cis_default() -> Result<Self, TaxonomyError> {
        TaxonomyLoader::embedded().load()
    }

    /// Parse a taxonomy from YAML without validating it
    pub fn from_yaml_str(yaml: &str, origin: &str) -> Result<Self, TaxonomyError> {
        serde_yaml::from_str(yaml).map_err(|source| TaxonomyError::Parse {
            origin: origin.to_string(),
            source,
        })
    }

    /// Default enforcement point for a safeguard applied to a subclass
    pub fn default_enforcement_point(&self, safeguard_id: &str, subclass_id: &str) -> &str {
        self.default_enforcement_points
            .get(safeguard_id)
            .and_then(|by_subclass| by_subclass.get(subclass_id))
            .map(|s| s.as_str())
            .unwrap_or(FALLBACK_ENFORCEMENT_POINT)
    }

    /// Total number of controls across all groups
    pub fn control_count(&self) -> usize {
        self.control_groups.iter().map(|g| g.controls.len()).sum()
    }

    /// Total number of safeguards across all controls
    pub fn safeguard_count(&self) -> usize {
        self.control_groups
            .iter()
            .flat_map(|g| &g.controls)
            .map(|c| c.safeguards.len())
            .sum()
    }

    /// Total number of asset subclasses across all classes
    pub fn subclass_count(&self) -> usize {
        self.asset_classes.iter().map(|c| c.subclasses.len()).sum()
    }
}
