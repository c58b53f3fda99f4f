//! Hierarchy Index
//!
//! Flattens the nested `ControlGroup → Control → Safeguard` and
//! `AssetClass → AssetSubclass` trees into order-stable sequences with id
//! lookups. Lookups return the first definition of an id and report misses as
//! `None`: rows routinely carry ids that no longer resolve.

use parfait_types::{AssetClass, AssetSubclass, Control, ControlGroup, Safeguard};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Every safeguard of every control of every group, in source order
pub fn flatten_safeguards(control_groups: &[ControlGroup]) -> Vec<Safeguard> {
    control_groups
        .iter()
        .flat_map(|group| &group.controls)
        .flat_map(|control| &control.safeguards)
        .cloned()
        .collect()
}

/// Every control of every group, in source order
pub fn flatten_controls(control_groups: &[ControlGroup]) -> Vec<Control> {
    control_groups
        .iter()
        .flat_map(|group| &group.controls)
        .cloned()
        .collect()
}

/// Every subclass of every asset class, in source order
pub fn flatten_subclasses(asset_classes: &[AssetClass]) -> Vec<AssetSubclass> {
    asset_classes
        .iter()
        .flat_map(|class| &class.subclasses)
        .cloned()
        .collect()
}

/// Content fingerprint of the inputs asset options are derived from.
///
/// Two indices with equal fingerprints generate identical option tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HierarchyFingerprint {
    /// SHA-256 of the safeguard set (ids and applicability)
    pub safeguards: String,
    /// SHA-256 of the asset class set (ids, names, subclasses)
    pub asset_classes: String,
}

impl HierarchyFingerprint {
    pub fn compute(safeguards: &[Safeguard], asset_classes: &[AssetClass]) -> Self {
        let mut hasher = Sha256::new();
        for safeguard in safeguards {
            hash_field(&mut hasher, &safeguard.id);
            hash_list(&mut hasher, &safeguard.applicable_asset_classes);
            hash_list(&mut hasher, &safeguard.applicable_asset_subclasses);
        }
        let safeguards = hex::encode(hasher.finalize());

        let mut hasher = Sha256::new();
        for class in asset_classes {
            hash_field(&mut hasher, &class.id);
            hash_field(&mut hasher, &class.name);
            hasher.update((class.subclasses.len() as u32).to_le_bytes());
            for subclass in &class.subclasses {
                hash_field(&mut hasher, &subclass.id);
                hash_field(&mut hasher, &subclass.name);
            }
        }
        let asset_classes = hex::encode(hasher.finalize());

        Self {
            safeguards,
            asset_classes,
        }
    }

    /// Short form for logs (first 16 chars of each hash)
    pub fn short(&self) -> String {
        format!(
            "{}/{}",
            &self.safeguards[..16.min(self.safeguards.len())],
            &self.asset_classes[..16.min(self.asset_classes.len())]
        )
    }
}

// Length-prefixed so ("ab","c") and ("a","bc") hash differently
fn hash_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u32).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_list(hasher: &mut Sha256, values: &[String]) {
    hasher.update((values.len() as u32).to_le_bytes());
    for value in values {
        hash_field(hasher, value);
    }
}

/// Id-keyed lookup tables over a loaded taxonomy
#[derive(Debug, Clone)]
pub struct HierarchyIndex {
    controls: Vec<Control>,
    safeguards: Vec<Safeguard>,
    /// Position in `controls` of the control containing each safeguard
    safeguard_owner: Vec<usize>,
    asset_classes: Vec<AssetClass>,
    subclasses: Vec<AssetSubclass>,

    control_pos: HashMap<String, usize>,
    safeguard_pos: HashMap<String, usize>,
    class_pos: HashMap<String, usize>,
    subclass_pos: HashMap<String, usize>,

    fingerprint: HierarchyFingerprint,
}

impl HierarchyIndex {
    pub fn new(control_groups: &[ControlGroup], asset_classes: &[AssetClass]) -> Self {
        let controls = flatten_controls(control_groups);
        let safeguards = flatten_safeguards(control_groups);
        let subclasses = flatten_subclasses(asset_classes);

        let safeguard_owner = controls
            .iter()
            .enumerate()
            .flat_map(|(pos, control)| std::iter::repeat(pos).take(control.safeguards.len()))
            .collect();

        let fingerprint = HierarchyFingerprint::compute(&safeguards, asset_classes);

        Self {
            control_pos: first_positions(controls.iter().map(|c| c.id.as_str())),
            safeguard_pos: first_positions(safeguards.iter().map(|s| s.id.as_str())),
            class_pos: first_positions(asset_classes.iter().map(|c| c.id.as_str())),
            subclass_pos: first_positions(subclasses.iter().map(|s| s.id.as_str())),
            controls,
            safeguards,
            safeguard_owner,
            asset_classes: asset_classes.to_vec(),
            subclasses,
            fingerprint,
        }
    }

    /// Build the index for a loaded taxonomy
    pub fn from_taxonomy(taxonomy: &crate::taxonomy::Taxonomy) -> Self {
        Self::new(&taxonomy.control_groups, &taxonomy.asset_classes)
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub fn find_control(&self, id: &str) -> Option<&Control> {
        self.control_pos.get(id).map(|&pos| &self.controls[pos])
    }

    pub fn find_safeguard(&self, id: &str) -> Option<&Safeguard> {
        self.safeguard_pos.get(id).map(|&pos| &self.safeguards[pos])
    }

    pub fn find_asset_class(&self, id: &str) -> Option<&AssetClass> {
        self.class_pos.get(id).map(|&pos| &self.asset_classes[pos])
    }

    /// First subclass with this id in taxonomy order, regardless of class
    pub fn find_asset_subclass(&self, id: &str) -> Option<&AssetSubclass> {
        self.subclass_pos.get(id).map(|&pos| &self.subclasses[pos])
    }

    /// Subclass lookup scoped to one class.
    ///
    /// Subclass ids are only unique within a class (`cloud` exists under both
    /// Data and Applications), so row data must be resolved through this.
    pub fn find_subclass_in(&self, class_id: &str, subclass_id: &str) -> Option<&AssetSubclass> {
        self.find_asset_class(class_id)
            .and_then(|class| class.subclass(subclass_id))
    }

    /// The control whose safeguard list contains this safeguard
    pub fn owning_control(&self, safeguard_id: &str) -> Option<&Control> {
        self.safeguard_pos
            .get(safeguard_id)
            .map(|&pos| &self.controls[self.safeguard_owner[pos]])
    }

    /// Safeguards selectable once a control is chosen (empty for unknown controls)
    pub fn safeguards_for_control(&self, control_id: &str) -> &[Safeguard] {
        self.find_control(control_id)
            .map(|c| c.safeguards.as_slice())
            .unwrap_or(&[])
    }

    // =========================================================================
    // FLATTENED SEQUENCES
    // =========================================================================

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn safeguards(&self) -> &[Safeguard] {
        &self.safeguards
    }

    pub fn asset_classes(&self) -> &[AssetClass] {
        &self.asset_classes
    }

    pub fn subclasses(&self) -> &[AssetSubclass] {
        &self.subclasses
    }

    pub fn fingerprint(&self) -> &HierarchyFingerprint {
        &self.fingerprint
    }
}

fn first_positions<'a>(ids: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    let mut positions = HashMap::new();
    for (pos, id) in ids.enumerate() {
        positions.entry(id.to_string()).or_insert(pos);
    }
    positions
}
