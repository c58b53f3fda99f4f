//! Attribute Registry
//!
//! Ordered, id-unique set of measurement attributes. Every row collection
//! carries one entry per registered attribute; [`propagate`] back-fills rows
//! created before an attribute existed.

use parfait_types::{Attribute, Row};
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::taxonomy::Taxonomy;

/// Derive an attribute id from its display name.
///
/// Lower-cases and replaces each run of whitespace with a single `-`.
/// Leading or trailing whitespace therefore yields a leading or trailing `-`.
pub fn attribute_id_from_name(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                id.push('-');
            }
            in_whitespace = true;
        } else {
            id.extend(ch.to_lowercase());
            in_whitespace = false;
        }
    }
    id
}

/// Build an attribute from the add-attribute form fields.
///
/// The name is trimmed before the id is derived. A blank tooltip falls back to
/// the description.
pub fn attribute_from_form(
    name: &str,
    description: &str,
    tooltip: &str,
) -> Result<Attribute, RegistryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistryError::EmptyName);
    }

    let tooltip = if tooltip.trim().is_empty() {
        description
    } else {
        tooltip
    };

    Ok(Attribute::new(attribute_id_from_name(name), name)
        .with_description(description)
        .with_tooltip(tooltip))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeRegistry {
    attributes: Vec<Attribute>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the taxonomy's default attributes.
    ///
    /// Later duplicates in the taxonomy are skipped.
    pub fn with_defaults(taxonomy: &Taxonomy) -> Self {
        let mut registry = Self::new();
        for attribute in &taxonomy.default_attributes {
            if let Err(e) = registry.add_attribute(attribute.clone()) {
                debug!("Skipping default attribute: {}", e);
            }
        }
        registry
    }

    /// Append an attribute; a taken id is rejected and the registry left as is
    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<(), RegistryError> {
        if self.get(&attribute.id).is_some() {
            return Err(RegistryError::DuplicateAttribute { id: attribute.id });
        }

        info!("Registered attribute '{}' ({})", attribute.name, attribute.id);
        self.attributes.push(attribute);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }

    /// Attribute ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.id.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn as_slice(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// `(row id, attribute id)` pairs for registered attributes a row lacks
    pub fn missing_in<'r>(&self, rows: &'r [Row]) -> Vec<(&'r str, String)> {
        rows.iter()
            .flat_map(|row| {
                self.attributes
                    .iter()
                    .filter(|a| !row.attributes.contains_key(&a.id))
                    .map(move |a| (row.id.as_str(), a.id.clone()))
            })
            .collect()
    }
}

/// Give every row an empty entry for an attribute; existing values are kept
pub fn propagate(rows: &[Row], attribute_id: &str) -> Vec<Row> {
    rows.iter()
        .cloned()
        .map(|mut row| {
            row.attributes
                .entry(attribute_id.to_string())
                .or_default();
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id_from_name() {
        assert_eq!(attribute_id_from_name("Effectiveness"), "effectiveness");
        assert_eq!(attribute_id_from_name("Time To Detect"), "time-to-detect");
        assert_eq!(attribute_id_from_name("Mean  \t Time"), "mean-time");
        assert_eq!(attribute_id_from_name(" Cost "), "-cost-");
    }

    #[test]
    fn test_from_form() {
        let attribute = attribute_from_form("  Time to Detect ", "Detection latency", "").unwrap();
        assert_eq!(attribute.id, "time-to-detect");
        assert_eq!(attribute.name, "Time to Detect");
        assert_eq!(attribute.tooltip, "Detection latency");

        let attribute = attribute_from_form("Cost", "Unit cost", "Per asset").unwrap();
        assert_eq!(attribute.tooltip, "Per asset");

        assert_eq!(attribute_from_form("   ", "", ""), Err(RegistryError::EmptyName));
    }

    #[test]
    fn test_with_defaults() {
        let registry = AttributeRegistry::with_defaults(&Taxonomy::cis_default().unwrap());
        assert_eq!(
            registry.ids(),
            vec!["effectiveness", "efficiency", "coverage", "friction"]
        );
        assert_eq!(registry.get("coverage").unwrap().name, "Coverage");
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = AttributeRegistry::new();
        registry
            .add_attribute(attribute_from_form("Time to Detect", "", "").unwrap())
            .unwrap();

        // Different name, same slug
        let clash = attribute_from_form("time  to detect", "other", "").unwrap();
        let err = registry.add_attribute(clash).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateAttribute {
                id: "time-to-detect".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("time-to-detect").unwrap().name, "Time to Detect");
    }

    #[test]
    fn test_propagate_backfills_without_overwriting() {
        let mut filled = Row::new("a");
        filled.attributes.insert("cost".to_string(), "High".to_string());
        let rows = vec![filled, Row::new("b")];

        let rows = propagate(&rows, "cost");
        assert_eq!(rows[0].attribute("cost"), Some("High"));
        assert_eq!(rows[1].attribute("cost"), Some(""));

        assert_eq!(propagate(&rows, "cost"), rows);
    }

    #[test]
    fn test_missing_in() {
        let mut registry = AttributeRegistry::new();
        registry.add_attribute(Attribute::new("cost", "Cost")).unwrap();

        let rows = vec![Row::new("a")];
        assert_eq!(registry.missing_in(&rows), vec![("a", "cost".to_string())]);
        assert!(registry.missing_in(&propagate(&rows, "cost")).is_empty());
    }
}
