//! Referential integrity checks for taxonomy definitions.
//!
//! Implements the load-time checks:
//! 1. Back-references (safeguard → control, subclass → class) match the tree
//! 2. Ids are unique where lookups rely on them
//! 3. Asset class ids survive the composite option key round trip
//! 4. Safeguard applicability references resolve
//!
//! Broken back-references and class ids containing `-` block a load.
//! Duplicate ids are tolerated (lookups return the first definition) and so are
//! unresolvable applicability ids (option generation skips them); both are
//! reported as warnings.

use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

use super::Taxonomy;
use crate::error::TaxonomyError;

/// A single taxonomy integrity finding
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyIssue {
    /// Safeguard's `control_id` differs from the control that contains it.
    #[error("Safeguard '{safeguard_id}' declares control '{declared}' but belongs to '{owner}'")]
    ControlMismatch {
        safeguard_id: String,
        declared: String,
        owner: String,
    },

    /// Subclass's `classId` differs from the class that contains it.
    #[error("Subclass '{subclass_id}' declares class '{declared}' but belongs to '{owner}'")]
    SubclassOwnerMismatch {
        subclass_id: String,
        declared: String,
        owner: String,
    },

    /// Same id used twice where lookups return the first match.
    #[error("Duplicate {kind} id '{id}' (lookups return the first definition)")]
    DuplicateId { kind: &'static str, id: String },

    /// Class id containing `-`: `subclass-<class>-<subclass>` keys split at the
    /// first `-`, so such a class can never be selected at subclass level.
    #[error("Asset class id '{class_id}' contains '-' and cannot be decoded from option keys")]
    AmbiguousClassId { class_id: String },

    /// Safeguard references an asset class that does not exist.
    #[error("Safeguard '{safeguard_id}' references unknown asset class '{class_id}'")]
    UnknownApplicableClass {
        safeguard_id: String,
        class_id: String,
    },

    /// Safeguard references a subclass that no applicable class contains.
    #[error("Safeguard '{safeguard_id}' references subclass '{subclass_id}' outside its applicable classes")]
    OrphanApplicableSubclass {
        safeguard_id: String,
        subclass_id: String,
    },
}

impl TaxonomyIssue {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ControlMismatch { .. } => "CONTROL_MISMATCH",
            Self::SubclassOwnerMismatch { .. } => "SUBCLASS_OWNER_MISMATCH",
            Self::DuplicateId { .. } => "DUPLICATE_ID",
            Self::AmbiguousClassId { .. } => "AMBIGUOUS_CLASS_ID",
            Self::UnknownApplicableClass { .. } => "UNKNOWN_APPLICABLE_CLASS",
            Self::OrphanApplicableSubclass { .. } => "ORPHAN_APPLICABLE_SUBCLASS",
        }
    }

    /// Blocking issues make the taxonomy unusable
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::ControlMismatch { .. }
                | Self::SubclassOwnerMismatch { .. }
                | Self::AmbiguousClassId { .. }
        )
    }
}

/// Result of validating a taxonomy
#[derive(Debug, Default)]
pub struct TaxonomyReport {
    pub errors: Vec<TaxonomyIssue>,
    pub warnings: Vec<TaxonomyIssue>,
}

impl TaxonomyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error or warning based on severity
    pub fn add(&mut self, issue: TaxonomyIssue) {
        if issue.is_blocking() {
            self.errors.push(issue);
        } else {
            self.warnings.push(issue);
        }
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }
}

/// Validate a taxonomy definition
pub fn validate(taxonomy: &Taxonomy) -> TaxonomyReport {
    let mut report = TaxonomyReport::new();

    validate_back_references(taxonomy, &mut report);
    validate_unique_ids(taxonomy, &mut report);
    validate_class_ids(taxonomy, &mut report);
    validate_applicability(taxonomy, &mut report);

    report
}

/// Validate, log warnings, and reject a taxonomy with blocking issues
pub fn ensure_valid(taxonomy: &Taxonomy, origin: &str) -> Result<(), TaxonomyError> {
    let report = validate(taxonomy);
    for warning in &report.warnings {
        warn!("Taxonomy {}: {}", origin, warning);
    }
    if report.is_valid() {
        return Ok(());
    }

    Err(TaxonomyError::Invalid {
        origin: origin.to_string(),
        issues: report.errors.iter().map(|e| e.to_string()).collect(),
    })
}

fn validate_back_references(taxonomy: &Taxonomy, report: &mut TaxonomyReport) {
    for control in taxonomy.control_groups.iter().flat_map(|g| &g.controls) {
        for safeguard in &control.safeguards {
            if safeguard.control_id != control.id {
                report.add(TaxonomyIssue::ControlMismatch {
                    safeguard_id: safeguard.id.clone(),
                    declared: safeguard.control_id.clone(),
                    owner: control.id.clone(),
                });
            }
        }
    }

    for class in &taxonomy.asset_classes {
        for subclass in &class.subclasses {
            if subclass.class_id != class.id {
                report.add(TaxonomyIssue::SubclassOwnerMismatch {
                    subclass_id: subclass.id.clone(),
                    declared: subclass.class_id.clone(),
                    owner: class.id.clone(),
                });
            }
        }
    }
}

fn validate_unique_ids(taxonomy: &Taxonomy, report: &mut TaxonomyReport) {
    let controls = taxonomy.control_groups.iter().flat_map(|g| &g.controls);
    let safeguards = controls.clone().flat_map(|c| &c.safeguards);

    check_unique("control", controls.map(|c| c.id.as_str()), report);
    check_unique("safeguard", safeguards.map(|s| s.id.as_str()), report);
    check_unique(
        "asset class",
        taxonomy.asset_classes.iter().map(|c| c.id.as_str()),
        report,
    );

    // Subclass ids may repeat across classes; only a repeat within one class
    // makes the class-scoped lookup ambiguous.
    for class in &taxonomy.asset_classes {
        check_unique(
            "asset subclass",
            class.subclasses.iter().map(|s| s.id.as_str()),
            report,
        );
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    report: &mut TaxonomyReport,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            report.add(TaxonomyIssue::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}

fn validate_class_ids(taxonomy: &Taxonomy, report: &mut TaxonomyReport) {
    for class in taxonomy.asset_classes.iter().filter(|c| c.id.contains('-')) {
        report.add(TaxonomyIssue::AmbiguousClassId {
            class_id: class.id.clone(),
        });
    }
}

fn validate_applicability(taxonomy: &Taxonomy, report: &mut TaxonomyReport) {
    let safeguards = taxonomy
        .control_groups
        .iter()
        .flat_map(|g| &g.controls)
        .flat_map(|c| &c.safeguards);

    for safeguard in safeguards {
        for class_id in &safeguard.applicable_asset_classes {
            if !taxonomy.asset_classes.iter().any(|c| &c.id == class_id) {
                report.add(TaxonomyIssue::UnknownApplicableClass {
                    safeguard_id: safeguard.id.clone(),
                    class_id: class_id.clone(),
                });
            }
        }

        for subclass_id in &safeguard.applicable_asset_subclasses {
            let reachable = taxonomy
                .asset_classes
                .iter()
                .filter(|c| safeguard.applies_to_class(&c.id))
                .any(|c| c.subclass(subclass_id).is_some());
            if !reachable {
                report.add(TaxonomyIssue::OrphanApplicableSubclass {
                    safeguard_id: safeguard.id.clone(),
                    subclass_id: subclass_id.clone(),
                });
            }
        }
    }
}
