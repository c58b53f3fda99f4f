//! Denormalised tabular view of a row collection
//!
//! Resolves each row's ids against the snapshot's hierarchy into the columns
//! spreadsheet-style encoders render:
//!
//! ```text
//! Control Number | Control | Safeguard Number | Safeguard | Asset Class |
//! Asset Subclass | Enforcement Point | <attribute name> ...
//! ```

use serde::Serialize;

use super::ExportSnapshot;
use crate::hierarchy::HierarchyIndex;

/// Name shown for an asset class or subclass that does not resolve
pub const UNKNOWN_ASSET: &str = "Unknown";

/// Fixed leading columns, before the attribute columns
pub const BASE_HEADERS: [&str; 7] = [
    "Control Number",
    "Control",
    "Safeguard Number",
    "Safeguard",
    "Asset Class",
    "Asset Subclass",
    "Enforcement Point",
];

/// One resolved row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularRecord {
    pub control_number: String,
    pub control: String,
    pub safeguard_number: String,
    pub safeguard: String,
    pub asset_class: String,
    pub asset_subclass: String,
    pub enforcement_point: String,
    /// One value per attribute, in registry order
    pub attribute_values: Vec<String>,
}

impl TabularRecord {
    /// Cells in header order
    pub fn cells(&self) -> Vec<&str> {
        [
            &self.control_number,
            &self.control,
            &self.safeguard_number,
            &self.safeguard,
            &self.asset_class,
            &self.asset_subclass,
            &self.enforcement_point,
        ]
        .into_iter()
        .chain(&self.attribute_values)
        .map(|s| s.as_str())
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabularExport {
    pub headers: Vec<String>,
    pub records: Vec<TabularRecord>,
}

/// Resolve a snapshot into tabular records.
///
/// Control columns come from the control that owns the row's safeguard, so a
/// stale `control_id` on the row does not leak into the export. Subclasses
/// resolve within the row's class.
pub fn tabulate(snapshot: &ExportSnapshot) -> TabularExport {
    let index = HierarchyIndex::new(&snapshot.control_groups, &snapshot.asset_classes);

    let headers = BASE_HEADERS
        .iter()
        .map(|h| h.to_string())
        .chain(snapshot.attributes.iter().map(|a| a.name.clone()))
        .collect();

    let records = snapshot
        .rows
        .iter()
        .map(|row| {
            let safeguard = index.find_safeguard(&row.safeguard_id);
            let control = index.owning_control(&row.safeguard_id);

            TabularRecord {
                control_number: control.map(|c| c.number.clone()).unwrap_or_default(),
                control: control.map(|c| c.name.clone()).unwrap_or_default(),
                safeguard_number: safeguard.map(|s| s.number.clone()).unwrap_or_default(),
                safeguard: safeguard.map(|s| s.name.clone()).unwrap_or_default(),
                asset_class: index
                    .find_asset_class(&row.asset_class_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| UNKNOWN_ASSET.to_string()),
                asset_subclass: index
                    .find_subclass_in(&row.asset_class_id, &row.asset_subclass_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| UNKNOWN_ASSET.to_string()),
                enforcement_point: row.enforcement_point.clone(),
                attribute_values: snapshot
                    .attributes
                    .iter()
                    .map(|a| row.attribute(&a.id).unwrap_or_default().to_string())
                    .collect(),
            }
        })
        .collect();

    TabularExport { headers, records }
}
