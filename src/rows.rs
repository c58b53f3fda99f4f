//! Row Consistency Engine
//!
//! The only mutation surface for row collections. Every operation takes the
//! current collection and returns a fresh one; the input is never touched.
//!
//! ```text
//! set_control(C) ──► set_safeguard(first safeguard of C)
//!                         │
//!                         ├─ safeguard_id = S
//!                         ├─ control_id   = S.control_id
//!                         └─ asset_class_id = asset_subclass_id = ""
//!
//! set_asset_option(key) ──► decode(key) ──► offered for S? ──► (asset_class_id, asset_subclass_id)
//!                                               └─ no ──► both cleared
//! ```
//!
//! Each operation either applies its full cascade or is a no-op. Unknown row
//! ids and unknown safeguards leave the collection unchanged.

use parfait_types::{AssetSelection, Row};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::asset_options::generate_asset_options;
use crate::hierarchy::HierarchyIndex;

const ATTRIBUTE_FIELD_PREFIX: &str = "attribute.";

// ============================================================================
// FIELDS
// ============================================================================

/// An addressable cell of a row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowField {
    ControlId,
    SafeguardId,
    AssetClassId,
    AssetSubclassId,
    EnforcementPoint,
    /// Entry in the row's attribute map
    Attribute(String),
}

impl RowField {
    /// Fields whose value constrains other fields.
    ///
    /// These may only change through the cascading operations.
    pub fn has_dependents(&self) -> bool {
        matches!(
            self,
            RowField::ControlId
                | RowField::SafeguardId
                | RowField::AssetClassId
                | RowField::AssetSubclassId
        )
    }
}

impl fmt::Display for RowField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowField::ControlId => f.write_str("controlId"),
            RowField::SafeguardId => f.write_str("safeguardId"),
            RowField::AssetClassId => f.write_str("assetClassId"),
            RowField::AssetSubclassId => f.write_str("assetSubclassId"),
            RowField::EnforcementPoint => f.write_str("enforcementPoint"),
            RowField::Attribute(id) => write!(f, "{}{}", ATTRIBUTE_FIELD_PREFIX, id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown row field '{0}'")]
pub struct UnknownRowField(pub String);

impl FromStr for RowField {
    type Err = UnknownRowField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "controlId" => Ok(RowField::ControlId),
            "safeguardId" => Ok(RowField::SafeguardId),
            "assetClassId" => Ok(RowField::AssetClassId),
            "assetSubclassId" => Ok(RowField::AssetSubclassId),
            "enforcementPoint" => Ok(RowField::EnforcementPoint),
            other => match other.strip_prefix(ATTRIBUTE_FIELD_PREFIX) {
                Some(id) if !id.is_empty() => Ok(RowField::Attribute(id.to_string())),
                _ => Err(UnknownRowField(other.to_string())),
            },
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Cascading row operations over one hierarchy
#[derive(Debug, Clone, Copy)]
pub struct RowEngine<'a> {
    index: &'a HierarchyIndex,
}

impl<'a> RowEngine<'a> {
    pub fn new(index: &'a HierarchyIndex) -> Self {
        Self { index }
    }

    /// Plain field update with no cascade.
    ///
    /// Fields with dependents are refused; use the specialised operations.
    pub fn set_cell(&self, rows: &[Row], row_id: &str, field: &RowField, value: &str) -> Vec<Row> {
        if field.has_dependents() {
            warn!(
                "Refusing plain write to {} on row {}; it has dependent fields",
                field, row_id
            );
            return rows.to_vec();
        }
        write_cell(rows, row_id, field, value)
    }

    /// Select a safeguard, deriving its control and clearing the asset selection
    pub fn set_safeguard(&self, rows: &[Row], row_id: &str, safeguard_id: &str) -> Vec<Row> {
        let Some(safeguard) = self.index.find_safeguard(safeguard_id) else {
            debug!("Unknown safeguard '{}'; row {} unchanged", safeguard_id, row_id);
            return rows.to_vec();
        };

        update_row(rows, row_id, |row| {
            debug!(
                "Row {}: safeguard {} -> {}, asset selection cleared",
                row.id, row.safeguard_id, safeguard.id
            );
            row.safeguard_id = safeguard.id.clone();
            row.control_id = safeguard.control_id.clone();
            row.asset_class_id.clear();
            row.asset_subclass_id.clear();
        })
    }

    /// Select a control, which selects its first safeguard.
    ///
    /// A control with no safeguards (or an id that does not resolve) only
    /// updates `control_id`; safeguard and asset fields keep their values.
    pub fn set_control(&self, rows: &[Row], row_id: &str, control_id: &str) -> Vec<Row> {
        match self.index.safeguards_for_control(control_id).first() {
            Some(first) => self.set_safeguard(rows, row_id, &first.id),
            None => {
                warn!(
                    "Control '{}' has no safeguards; row {} keeps its safeguard and assets",
                    control_id, row_id
                );
                write_cell(rows, row_id, &RowField::ControlId, control_id)
            }
        }
    }

    /// Apply a composite asset option key (`class-…` / `subclass-…-…`).
    ///
    /// Only keys offered for the row's current safeguard are applied. Malformed
    /// keys, keys the safeguard does not offer, and rows without a resolvable
    /// safeguard all clear the selection.
    pub fn set_asset_option(&self, rows: &[Row], row_id: &str, combined: &str) -> Vec<Row> {
        update_row(rows, row_id, |row| {
            let AssetSelection {
                asset_class_id,
                asset_subclass_id,
            } = self.offered_selection(&row.safeguard_id, combined);
            row.asset_class_id = asset_class_id;
            row.asset_subclass_id = asset_subclass_id;
        })
    }

    fn offered_selection(&self, safeguard_id: &str, combined: &str) -> AssetSelection {
        let selection = AssetSelection::decode(combined);
        if selection.is_empty() {
            return selection;
        }

        let offered = self.index.find_safeguard(safeguard_id).is_some_and(|safeguard| {
            generate_asset_options(safeguard, self.index.asset_classes())
                .iter()
                .any(|option| {
                    option.asset_class_id == selection.asset_class_id
                        && option.asset_subclass_id.as_deref().unwrap_or("")
                            == selection.asset_subclass_id
                })
        });
        if offered {
            selection
        } else {
            warn!(
                "Asset option '{}' is not offered for safeguard '{}'; selection cleared",
                combined, safeguard_id
            );
            AssetSelection::empty()
        }
    }

    /// Append an empty row with an entry for every given attribute
    pub fn add_row<I>(rows: &[Row], attribute_ids: I) -> Vec<Row>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut row = Row::new(format!("row-{}", Uuid::new_v4()));
        row.attributes = attribute_ids
            .into_iter()
            .map(|id| (id.as_ref().to_string(), String::new()))
            .collect();

        debug!("Adding row {}", row.id);
        let mut next = rows.to_vec();
        next.push(row);
        next
    }

    pub fn delete_row(rows: &[Row], row_id: &str) -> Vec<Row> {
        rows.iter().filter(|r| r.id != row_id).cloned().collect()
    }
}

// Unchecked write, shared by `set_cell` and the zero-safeguard fallback
fn write_cell(rows: &[Row], row_id: &str, field: &RowField, value: &str) -> Vec<Row> {
    update_row(rows, row_id, |row| {
        let value = value.to_string();
        match field {
            RowField::ControlId => row.control_id = value,
            RowField::SafeguardId => row.safeguard_id = value,
            RowField::AssetClassId => row.asset_class_id = value,
            RowField::AssetSubclassId => row.asset_subclass_id = value,
            RowField::EnforcementPoint => row.enforcement_point = value,
            RowField::Attribute(id) => {
                row.attributes.insert(id.clone(), value);
            }
        }
    })
}

fn update_row(rows: &[Row], row_id: &str, apply: impl FnOnce(&mut Row)) -> Vec<Row> {
    let mut next = rows.to_vec();
    match next.iter_mut().find(|r| r.id == row_id) {
        Some(row) => apply(row),
        None => debug!("Row {} not found; collection unchanged", row_id),
    }
    next
}

// ============================================================================
// CONSISTENCY AUDIT
// ============================================================================

/// A broken cross-field invariant on a row
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowViolation {
    #[error("Row '{row_id}' has subclass '{subclass_id}' without an asset class")]
    SubclassWithoutClass { row_id: String, subclass_id: String },

    #[error("Row '{row_id}' has subclass '{subclass_id}' which is not part of class '{class_id}'")]
    SubclassNotInClass {
        row_id: String,
        class_id: String,
        subclass_id: String,
    },

    #[error("Row '{row_id}' has control '{actual}' but safeguard '{safeguard_id}' belongs to '{expected}'")]
    ControlMismatch {
        row_id: String,
        safeguard_id: String,
        expected: String,
        actual: String,
    },

    #[error("Row '{row_id}' has an asset selection but no safeguard")]
    AssetWithoutSafeguard { row_id: String },
}

impl RowViolation {
    pub fn code(&self) -> &'static str {
        match self {
            Self::SubclassWithoutClass { .. } => "SUBCLASS_WITHOUT_CLASS",
            Self::SubclassNotInClass { .. } => "SUBCLASS_NOT_IN_CLASS",
            Self::ControlMismatch { .. } => "CONTROL_MISMATCH",
            Self::AssetWithoutSafeguard { .. } => "ASSET_WITHOUT_SAFEGUARD",
        }
    }
}

/// Audit one row against the hierarchy.
///
/// Ids that no longer resolve are not violations on their own.
pub fn check_row(index: &HierarchyIndex, row: &Row) -> Vec<RowViolation> {
    let mut violations = Vec::new();

    if !row.asset_subclass_id.is_empty() {
        if row.asset_class_id.is_empty() {
            violations.push(RowViolation::SubclassWithoutClass {
                row_id: row.id.clone(),
                subclass_id: row.asset_subclass_id.clone(),
            });
        } else if let Some(class) = index.find_asset_class(&row.asset_class_id) {
            if class.subclass(&row.asset_subclass_id).is_none() {
                violations.push(RowViolation::SubclassNotInClass {
                    row_id: row.id.clone(),
                    class_id: row.asset_class_id.clone(),
                    subclass_id: row.asset_subclass_id.clone(),
                });
            }
        }
    }

    if row.has_safeguard() {
        if let Some(safeguard) = index.find_safeguard(&row.safeguard_id) {
            if safeguard.control_id != row.control_id {
                violations.push(RowViolation::ControlMismatch {
                    row_id: row.id.clone(),
                    safeguard_id: safeguard.id.clone(),
                    expected: safeguard.control_id.clone(),
                    actual: row.control_id.clone(),
                });
            }
        }
    } else if !row.asset_selection().is_empty() {
        violations.push(RowViolation::AssetWithoutSafeguard {
            row_id: row.id.clone(),
        });
    }

    violations
}

/// Audit a whole collection
pub fn check_rows(index: &HierarchyIndex, rows: &[Row]) -> Vec<RowViolation> {
    rows.iter().flat_map(|row| check_row(index, row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::Taxonomy;
    use parfait_types::{Control, ControlGroup, Safeguard};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn cis_index() -> HierarchyIndex {
        HierarchyIndex::from_taxonomy(&Taxonomy::cis_default().unwrap())
    }

    fn one_row(id: &str) -> Vec<Row> {
        vec![Row::new(id)]
    }

    #[test]
    fn test_add_row_to_empty_collection() {
        let rows = RowEngine::add_row(&[], ["effectiveness", "coverage"]);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert!(row.id.starts_with("row-"));
        let expected: BTreeMap<String, String> = [
            ("coverage".to_string(), String::new()),
            ("effectiveness".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        assert_eq!(row.attributes, expected);
        assert_eq!(row.control_id, "");
        assert_eq!(row.safeguard_id, "");
        assert_eq!(row.asset_class_id, "");
        assert_eq!(row.asset_subclass_id, "");
        assert_eq!(row.enforcement_point, "");
    }

    #[test]
    fn test_add_row_generates_unique_ids() {
        let rows = RowEngine::add_row(&[], Vec::<String>::new());
        let rows = RowEngine::add_row(&rows, Vec::<String>::new());
        assert_ne!(rows[0].id, rows[1].id);
    }

    #[test]
    fn test_set_control_selects_first_safeguard() {
        let index = cis_index();
        let engine = RowEngine::new(&index);
        let mut rows = one_row("r1");
        rows[0].asset_class_id = "devices".to_string();
        rows[0].asset_subclass_id = "servers".to_string();

        let rows = engine.set_control(&rows, "r1", "cis1");
        assert_eq!(rows[0].safeguard_id, "1.1");
        assert_eq!(rows[0].control_id, "cis1");
        assert_eq!(rows[0].asset_class_id, "");
        assert_eq!(rows[0].asset_subclass_id, "");
    }

    #[test]
    fn test_set_safeguard_cascades() {
        let index = cis_index();
        let engine = RowEngine::new(&index);

        let rows = engine.set_safeguard(&one_row("r1"), "r1", "1.1");
        let rows = engine.set_asset_option(&rows, "r1", "subclass-devices-endpoints");
        assert_eq!(rows[0].asset_subclass_id, "endpoints");

        let rows = engine.set_safeguard(&rows, "r1", "5.2");
        assert_eq!(rows[0].control_id, "cis5");
        assert_eq!(rows[0].asset_selection(), AssetSelection::empty());
    }

    #[test]
    fn test_set_safeguard_unknown_is_noop() {
        let index = cis_index();
        let engine = RowEngine::new(&index);
        let rows = engine.set_safeguard(&one_row("r1"), "r1", "1.1");
        let rows = engine.set_asset_option(&rows, "r1", "class-devices");

        assert_eq!(engine.set_safeguard(&rows, "r1", "99.9"), rows);
    }

    #[test]
    fn test_set_control_without_safeguards_only_writes_control() {
        let groups = vec![ControlGroup::new("ig1", "IG1")
            .with_control(
                Control::new("cis1", "1", "Inventory")
                    .with_safeguard(Safeguard::new("1.1", "cis1", "1.1", "Inventory")),
            )
            .with_control(Control::new("cis7", "7", "Empty"))];
        let index = HierarchyIndex::new(&groups, &[]);
        let engine = RowEngine::new(&index);

        let mut rows = engine.set_safeguard(&one_row("r1"), "r1", "1.1");
        rows[0].asset_class_id = "devices".to_string();

        let rows = engine.set_control(&rows, "r1", "cis7");
        assert_eq!(rows[0].control_id, "cis7");
        // Previous safeguard and asset survive: the row now fails the audit
        assert_eq!(rows[0].safeguard_id, "1.1");
        assert_eq!(rows[0].asset_class_id, "devices");
        assert_eq!(check_row(&index, &rows[0])[0].code(), "CONTROL_MISMATCH");

        let rows = engine.set_control(&rows, "r1", "cis404");
        assert_eq!(rows[0].control_id, "cis404");
        assert_eq!(rows[0].safeguard_id, "1.1");
    }

    #[test]
    fn test_set_asset_option_decodes() {
        let index = cis_index();
        let engine = RowEngine::new(&index);
        let rows = engine.set_safeguard(&one_row("r1"), "r1", "1.1");

        let rows = engine.set_asset_option(&rows, "r1", "subclass-devices-endpoints");
        assert_eq!(rows[0].asset_class_id, "devices");
        assert_eq!(rows[0].asset_subclass_id, "endpoints");

        let rows = engine.set_asset_option(&rows, "r1", "class-networks");
        assert_eq!(rows[0].asset_class_id, "networks");
        assert_eq!(rows[0].asset_subclass_id, "");

        for malformed in ["", "garbage", "class-", "subclass-devices", "subclass--x"] {
            let cleared = engine.set_asset_option(&rows, "r1", malformed);
            assert_eq!(cleared[0].asset_selection(), AssetSelection::empty(), "{}", malformed);
        }
    }

    #[test]
    fn test_set_asset_option_rejects_keys_not_offered() {
        let index = cis_index();
        let engine = RowEngine::new(&index);

        // No safeguard yet: a well-formed key must not produce an orphan selection
        let rows = engine.set_asset_option(&one_row("r1"), "r1", "subclass-devices-lan");
        assert_eq!(rows[0].asset_selection(), AssetSelection::empty());
        assert!(check_rows(&index, &rows).is_empty());

        let rows = engine.set_safeguard(&rows, "r1", "1.1");
        let rows = engine.set_asset_option(&rows, "r1", "subclass-devices-servers");
        for forged in [
            "subclass-devices-lan",
            "subclass-networks-wan-x",
            "class-data",
            "class-printers",
            "subclass-data-cloud",
        ] {
            let next = engine.set_asset_option(&rows, "r1", forged);
            assert_eq!(next[0].asset_selection(), AssetSelection::empty(), "{}", forged);
            assert!(check_rows(&index, &next).is_empty(), "{}", forged);
        }

        // 1.2 does not list wan
        let rows = engine.set_safeguard(&rows, "r1", "1.2");
        let rows = engine.set_asset_option(&rows, "r1", "subclass-networks-wan");
        assert_eq!(rows[0].asset_selection(), AssetSelection::empty());
    }

    #[test]
    fn test_set_cell_attribute_and_enforcement_point() {
        let index = cis_index();
        let engine = RowEngine::new(&index);
        let rows = RowEngine::add_row(&[], ["coverage"]);
        let id = rows[0].id.clone();

        let rows = engine.set_cell(&rows, &id, &"attribute.coverage".parse::<RowField>().unwrap(), "85%");
        let rows = engine.set_cell(&rows, &id, &RowField::EnforcementPoint, "EDR");
        let rows = engine.set_cell(&rows, &id, &RowField::Attribute("friction".into()), "Low");

        assert_eq!(rows[0].attribute("coverage"), Some("85%"));
        assert_eq!(rows[0].attribute("friction"), Some("Low"));
        assert_eq!(rows[0].enforcement_point, "EDR");
    }

    #[test]
    fn test_set_cell_refuses_relational_fields() {
        let index = cis_index();
        let engine = RowEngine::new(&index);
        let rows = one_row("r1");

        for field in [
            RowField::ControlId,
            RowField::SafeguardId,
            RowField::AssetClassId,
            RowField::AssetSubclassId,
        ] {
            assert_eq!(engine.set_cell(&rows, "r1", &field, "x"), rows);
        }
    }

    #[test]
    fn test_unknown_row_is_noop() {
        let index = cis_index();
        let engine = RowEngine::new(&index);
        let rows = one_row("r1");

        assert_eq!(engine.set_safeguard(&rows, "nope", "1.1"), rows);
        assert_eq!(engine.set_control(&rows, "nope", "cis1"), rows);
        assert_eq!(engine.set_asset_option(&rows, "nope", "class-devices"), rows);
        assert_eq!(engine.set_cell(&rows, "nope", &RowField::EnforcementPoint, "x"), rows);
        assert_eq!(RowEngine::delete_row(&rows, "nope"), rows);
    }

    #[test]
    fn test_delete_row() {
        let rows = vec![Row::new("a"), Row::new("b"), Row::new("c")];
        let ids: Vec<_> = RowEngine::delete_row(&rows, "b")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_row_field_parse() {
        assert_eq!("safeguardId".parse::<RowField>().unwrap(), RowField::SafeguardId);
        assert_eq!(
            "attribute.effectiveness".parse::<RowField>().unwrap(),
            RowField::Attribute("effectiveness".to_string())
        );
        assert!("attribute.".parse::<RowField>().is_err());
        assert!("colour".parse::<RowField>().is_err());
        assert_eq!(RowField::Attribute("x".into()).to_string(), "attribute.x");
    }

    #[test]
    fn test_check_row_findings() {
        let index = cis_index();
        let mut row = Row::new("r1");
        row.asset_subclass_id = "lan".to_string();
        let codes: Vec<_> = check_row(&index, &row).iter().map(|v| v.code()).collect();
        assert_eq!(codes, vec!["SUBCLASS_WITHOUT_CLASS", "ASSET_WITHOUT_SAFEGUARD"]);

        row.safeguard_id = "1.1".to_string();
        row.control_id = "cis1".to_string();
        row.asset_class_id = "devices".to_string();
        let codes: Vec<_> = check_row(&index, &row).iter().map(|v| v.code()).collect();
        assert_eq!(codes, vec!["SUBCLASS_NOT_IN_CLASS"]);

        row.asset_class_id = "networks".to_string();
        assert!(check_row(&index, &row).is_empty());
    }

    #[test]
    fn test_stale_ids_are_not_violations() {
        let index = cis_index();
        let mut row = Row::new("r1");
        row.safeguard_id = "42.1".to_string();
        row.control_id = "cis42".to_string();
        row.asset_class_id = "printers".to_string();
        row.asset_subclass_id = "laser".to_string();
        assert!(check_rows(&index, &[row]).is_empty());
    }
}
