//! Asset Option Generator
//!
//! Computes, per safeguard, the ordered list of asset targets a user may pick:
//!
//! ```text
//! 1. class-level options     in the safeguard's applicable_asset_classes order
//! 2. subclass-level options  in taxonomy order (class order, then subclass order),
//!                            restricted to applicable classes and applicable subclass ids
//! ```
//!
//! Class-only choices always precede drill-down choices. Ids that do not
//! resolve in the taxonomy are skipped. Generation is pure, so the per-safeguard
//! table is memoized on the [`HierarchyFingerprint`] of its inputs and only
//! rebuilt when that changes.

use parfait_types::{AssetClass, AssetOption, AssetSelection, Safeguard};
use std::collections::HashMap;
use tracing::debug;

use crate::hierarchy::{HierarchyFingerprint, HierarchyIndex};

/// Selectable asset options for one safeguard
pub fn generate_asset_options(safeguard: &Safeguard, asset_classes: &[AssetClass]) -> Vec<AssetOption> {
    let class_options = safeguard
        .applicable_asset_classes
        .iter()
        .filter_map(|class_id| asset_classes.iter().find(|c| &c.id == class_id))
        .map(AssetOption::for_class);

    let subclass_options = asset_classes
        .iter()
        .filter(|class| safeguard.applies_to_class(&class.id))
        .flat_map(|class| {
            class
                .subclasses
                .iter()
                .filter(|subclass| safeguard.applies_to_subclass(&subclass.id))
                .map(move |subclass| AssetOption::for_subclass(class, subclass))
        });

    class_options.chain(subclass_options).collect()
}

/// Options for every safeguard, keyed by safeguard id (first definition wins)
pub fn generate_all_asset_options(
    safeguards: &[Safeguard],
    asset_classes: &[AssetClass],
) -> HashMap<String, Vec<AssetOption>> {
    let mut options = HashMap::with_capacity(safeguards.len());
    for safeguard in safeguards {
        options
            .entry(safeguard.id.clone())
            .or_insert_with(|| generate_asset_options(safeguard, asset_classes));
    }
    options
}

/// Decode a composite option key into the selection it encodes
pub fn decode_asset_option(combined: &str) -> AssetSelection {
    AssetSelection::decode(combined)
}

/// Memoized per-safeguard option table
#[derive(Debug, Clone, Default)]
pub struct AssetOptionTable {
    fingerprint: Option<HierarchyFingerprint>,
    options: HashMap<String, Vec<AssetOption>>,
}

impl AssetOptionTable {
    /// Build the table for an index
    pub fn build(index: &HierarchyIndex) -> Self {
        let mut table = Self::default();
        table.refresh(index);
        table
    }

    /// Rebuild if the index's inputs changed since the last build.
    ///
    /// Returns true when the table was rebuilt.
    pub fn refresh(&mut self, index: &HierarchyIndex) -> bool {
        if self.fingerprint.as_ref() == Some(index.fingerprint()) {
            return false;
        }

        self.options = generate_all_asset_options(index.safeguards(), index.asset_classes());
        self.fingerprint = Some(index.fingerprint().clone());
        debug!(
            "Rebuilt asset options for {} safeguards ({})",
            self.options.len(),
            index.fingerprint().short()
        );
        true
    }

    /// Options for a safeguard; empty for unknown safeguards
    pub fn options_for(&self, safeguard_id: &str) -> &[AssetOption] {
        self.options
            .get(safeguard_id)
            .map(|o| o.as_slice())
            .unwrap_or(&[])
    }

    pub fn fingerprint(&self) -> Option<&HierarchyFingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}
