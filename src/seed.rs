//! Example rows for a fresh workspace
//!
//! One framework row per (safeguard, applicable subclass) pair, filled with a
//! random sample method per default attribute. Assessment rows mirror the
//! framework rows with random outcome values.

use parfait_types::{AssetSubclass, Row, Safeguard};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::taxonomy::Taxonomy;

/// Attribute whose assessed value is a percentage rather than a rating
pub const COVERAGE_ATTRIBUTE: &str = "coverage";

/// Ratings used for every other assessed attribute
pub const RATINGS: [&str; 3] = ["High", "Medium", "Low"];

/// Framework rows for every safeguard and applicable subclass.
///
/// Rows follow taxonomy safeguard order, then each safeguard's own subclass
/// order. Subclass ids that do not resolve within an applicable class are
/// skipped. Ids are `row-1`, `row-2`, ...
pub fn initial_framework_rows<R: Rng + ?Sized>(taxonomy: &Taxonomy, rng: &mut R) -> Vec<Row> {
    let mut rows = Vec::new();

    for control in taxonomy.control_groups.iter().flat_map(|g| &g.controls) {
        for safeguard in &control.safeguards {
            for subclass_id in &safeguard.applicable_asset_subclasses {
                let Some(subclass) = resolve_subclass(taxonomy, safeguard, subclass_id) else {
                    continue;
                };

                let mut row = Row::new(format!("row-{}", rows.len() + 1));
                row.control_id = control.id.clone();
                row.safeguard_id = safeguard.id.clone();
                row.asset_class_id = subclass.class_id.clone();
                row.asset_subclass_id = subclass.id.clone();
                row.enforcement_point = taxonomy
                    .default_enforcement_point(&safeguard.id, &subclass.id)
                    .to_string();
                row.attributes = taxonomy
                    .default_attributes
                    .iter()
                    .map(|attribute| {
                        let method = taxonomy
                            .example_methods
                            .get(&attribute.id)
                            .and_then(|methods| methods.choose(rng))
                            .cloned()
                            .unwrap_or_default();
                        (attribute.id.clone(), method)
                    })
                    .collect();

                rows.push(row);
            }
        }
    }

    rows
}

/// Assessment rows mirroring `framework_rows` with random outcomes
pub fn initial_assessment_rows<R: Rng + ?Sized>(
    framework_rows: &[Row],
    taxonomy: &Taxonomy,
    rng: &mut R,
) -> Vec<Row> {
    framework_rows
        .iter()
        .map(|framework_row| {
            let mut row = framework_row.clone();
            row.attributes = taxonomy
                .default_attributes
                .iter()
                .map(|attribute| {
                    let value = if attribute.id == COVERAGE_ATTRIBUTE {
                        format!("{}%", rng.gen_range(0..100))
                    } else {
                        RATINGS[rng.gen_range(0..RATINGS.len())].to_string()
                    };
                    (attribute.id.clone(), value)
                })
                .collect();
            row
        })
        .collect()
}

// Shared subclass ids (e.g. `cloud`) resolve within the safeguard's classes
fn resolve_subclass<'t>(
    taxonomy: &'t Taxonomy,
    safeguard: &Safeguard,
    subclass_id: &str,
) -> Option<&'t AssetSubclass> {
    taxonomy
        .asset_classes
        .iter()
        .filter(|class| safeguard.applies_to_class(&class.id))
        .find_map(|class| class.subclass(subclass_id))
}
