//! Application state
//!
//! A [`Workspace`] owns everything a session edits: the loaded taxonomy and
//! its derived index, the attribute registry, and the framework and assessment
//! row collections. Mutations go through the [`RowEngine`]; the workspace only
//! swaps in the collection the engine returns.

use chrono::Utc;
use parfait_types::{AssetOption, Attribute, Row, TabType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::asset_options::AssetOptionTable;
use crate::attributes::{propagate, AttributeRegistry};
use crate::config::ParfaitConfig;
use crate::error::{RegistryError, Result, TaxonomyError};
use crate::export::ExportSnapshot;
use crate::hierarchy::HierarchyIndex;
use crate::rows::{check_rows, RowEngine};
use crate::seed::{initial_assessment_rows, initial_framework_rows};
use crate::taxonomy::{ensure_valid, Taxonomy};

#[derive(Debug, Clone)]
pub struct Workspace {
    taxonomy: Taxonomy,
    index: HierarchyIndex,
    options: AssetOptionTable,
    attributes: AttributeRegistry,
    framework: Vec<Row>,
    assessment: Vec<Row>,
}

impl Workspace {
    /// Empty workspace with the taxonomy's default attributes
    pub fn new(taxonomy: Taxonomy) -> Self {
        let index = HierarchyIndex::from_taxonomy(&taxonomy);
        let options = AssetOptionTable::build(&index);
        let attributes = AttributeRegistry::with_defaults(&taxonomy);

        Self {
            taxonomy,
            index,
            options,
            attributes,
            framework: Vec::new(),
            assessment: Vec::new(),
        }
    }

    /// Workspace pre-filled with example framework and assessment rows
    pub fn with_examples<R: Rng + ?Sized>(taxonomy: Taxonomy, rng: &mut R) -> Self {
        let mut workspace = Self::new(taxonomy);
        workspace.framework = initial_framework_rows(&workspace.taxonomy, rng);
        workspace.assessment = initial_assessment_rows(&workspace.framework, &workspace.taxonomy, rng);
        info!("Seeded {} example rows per tab", workspace.framework.len());
        workspace
    }

    /// Load the configured taxonomy and build a workspace from it
    pub fn from_config(config: &ParfaitConfig) -> Result<Self> {
        let taxonomy = config.taxonomy_loader().load()?;
        if !config.seed_examples {
            return Ok(Self::new(taxonomy));
        }

        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self::with_examples(taxonomy, &mut rng))
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn index(&self) -> &HierarchyIndex {
        &self.index
    }

    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    /// Swap in a new taxonomy; asset options are rebuilt only if they changed.
    ///
    /// A taxonomy with blocking integrity issues is rejected and the current
    /// one stays in place.
    pub fn replace_taxonomy(&mut self, taxonomy: Taxonomy) -> std::result::Result<(), TaxonomyError> {
        ensure_valid(&taxonomy, "replacement taxonomy")?;

        self.index = HierarchyIndex::from_taxonomy(&taxonomy);
        self.taxonomy = taxonomy;
        if !self.options.refresh(&self.index) {
            debug!("Taxonomy replaced; asset options unchanged");
        }
        Ok(())
    }

    // =========================================================================
    // ROWS
    // =========================================================================

    pub fn rows(&self, tab: TabType) -> &[Row] {
        match tab {
            TabType::Framework => &self.framework,
            TabType::Assessment => &self.assessment,
        }
    }

    /// Replace a tab's collection with the result of an engine operation
    pub fn replace_rows(&mut self, tab: TabType, rows: Vec<Row>) {
        for violation in check_rows(&self.index, &rows) {
            warn!("{} tab: {}", tab, violation);
        }
        match tab {
            TabType::Framework => self.framework = rows,
            TabType::Assessment => self.assessment = rows,
        }
    }

    /// Run an engine operation against a tab and keep its result
    pub fn update_rows<F>(&mut self, tab: TabType, operation: F)
    where
        F: FnOnce(&RowEngine<'_>, &[Row]) -> Vec<Row>,
    {
        let next = operation(&RowEngine::new(&self.index), self.rows(tab));
        self.replace_rows(tab, next);
    }

    pub fn engine(&self) -> RowEngine<'_> {
        RowEngine::new(&self.index)
    }

    /// Append an empty row to a tab, returning its id
    pub fn add_row(&mut self, tab: TabType) -> String {
        let rows = RowEngine::add_row(self.rows(tab), self.attributes.ids());
        let id = rows.last().map(|r| r.id.clone()).unwrap_or_default();
        self.replace_rows(tab, rows);
        id
    }

    pub fn delete_row(&mut self, tab: TabType, row_id: &str) {
        let rows = RowEngine::delete_row(self.rows(tab), row_id);
        self.replace_rows(tab, rows);
    }

    /// Selectable asset options for a safeguard
    pub fn asset_options_for(&self, safeguard_id: &str) -> &[AssetOption] {
        self.options.options_for(safeguard_id)
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    /// Register an attribute and back-fill both tabs with empty values
    pub fn add_attribute(&mut self, attribute: Attribute) -> std::result::Result<(), RegistryError> {
        let id = attribute.id.clone();
        self.attributes.add_attribute(attribute)?;
        self.framework = propagate(&self.framework, &id);
        self.assessment = propagate(&self.assessment, &id);
        Ok(())
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Read-only copy of one tab for the exporter
    pub fn snapshot(&self, tab: TabType) -> ExportSnapshot {
        ExportSnapshot {
            tab,
            taken_at: Utc::now(),
            rows: self.rows(tab).to_vec(),
            attributes: self.attributes.as_slice().to_vec(),
            control_groups: self.taxonomy.control_groups.clone(),
            asset_classes: self.taxonomy.asset_classes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attribute_from_form;
    use pretty_assertions::assert_eq;

    fn cis() -> Taxonomy {
        Taxonomy::cis_default().unwrap()
    }

    #[test]
    fn test_new_workspace_is_empty() {
        let workspace = Workspace::new(cis());
        assert!(workspace.rows(TabType::Framework).is_empty());
        assert!(workspace.rows(TabType::Assessment).is_empty());
        assert_eq!(workspace.attributes().len(), 4);
        assert_eq!(workspace.asset_options_for("1.1").len(), 9);
    }

    #[test]
    fn test_add_attribute_propagates_to_both_tabs() {
        let mut workspace = Workspace::with_examples(cis(), &mut StdRng::seed_from_u64(1));
        let attribute = attribute_from_form("Time to Detect", "Detection latency", "").unwrap();

        workspace.add_attribute(attribute).unwrap();
        for tab in [TabType::Framework, TabType::Assessment] {
            assert!(workspace
                .rows(tab)
                .iter()
                .all(|r| r.attribute("time-to-detect") == Some("")));
            assert!(workspace.attributes().missing_in(workspace.rows(tab)).is_empty());
        }
    }

    #[test]
    fn test_rejected_attribute_leaves_rows_alone() {
        let mut workspace = Workspace::with_examples(cis(), &mut StdRng::seed_from_u64(1));
        let before = workspace.rows(TabType::Framework).to_vec();

        let err = workspace
            .add_attribute(Attribute::new("coverage", "Coverage again"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAttribute { .. }));
        assert_eq!(workspace.rows(TabType::Framework), before.as_slice());
    }

    #[test]
    fn test_tabs_are_independent() {
        let mut workspace = Workspace::new(cis());
        let id = workspace.add_row(TabType::Framework);

        workspace.update_rows(TabType::Framework, |engine, rows| engine.set_control(rows, &id, "cis3"));
        assert_eq!(workspace.rows(TabType::Framework)[0].safeguard_id, "3.1");
        assert!(workspace.rows(TabType::Assessment).is_empty());

        workspace.delete_row(TabType::Framework, &id);
        assert!(workspace.rows(TabType::Framework).is_empty());
    }

    #[test]
    fn test_new_row_has_registry_attributes() {
        let mut workspace = Workspace::new(cis());
        workspace.add_row(TabType::Assessment);
        let row = &workspace.rows(TabType::Assessment)[0];
        let ids: Vec<_> = row.attributes.keys().cloned().collect();
        assert_eq!(ids, vec!["coverage", "effectiveness", "efficiency", "friction"]);
    }

    #[test]
    fn test_snapshot_copies_tab() {
        let workspace = Workspace::with_examples(cis(), &mut StdRng::seed_from_u64(3));
        let snapshot = workspace.snapshot(TabType::Assessment);
        assert_eq!(snapshot.tab, TabType::Assessment);
        assert_eq!(snapshot.rows, workspace.rows(TabType::Assessment));
        assert_eq!(snapshot.attributes.len(), 4);
        assert_eq!(snapshot.control_groups.len(), 3);
    }

    #[test]
    fn test_replace_taxonomy_refreshes_options() {
        let mut workspace = Workspace::new(cis());
        let mut smaller = cis();
        smaller.asset_classes.retain(|c| c.id != "networks");

        workspace.replace_taxonomy(smaller).unwrap();
        let ids: Vec<_> = workspace
            .asset_options_for("4.2")
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert!(ids.is_empty());
        assert_eq!(workspace.asset_options_for("1.1").len(), 5);
    }

    #[test]
    fn test_replace_taxonomy_rejects_broken_back_reference() {
        let mut workspace = Workspace::new(cis());
        let mut broken = cis();
        broken.control_groups[0].controls[0].safeguards[0].control_id = "cis9".to_string();
        broken.asset_classes.retain(|c| c.id != "networks");

        let err = workspace.replace_taxonomy(broken).unwrap_err();
        assert!(matches!(err, TaxonomyError::Invalid { .. }));
        // Previous taxonomy and options still in place
        assert_eq!(workspace.taxonomy(), &cis());
        assert_eq!(workspace.asset_options_for("1.1").len(), 9);
        assert_eq!(workspace.index().find_safeguard("1.1").unwrap().control_id, "cis1");
    }

    #[test]
    fn test_from_config_without_examples() {
        let config = ParfaitConfig::default().seed_examples(false);
        let workspace = Workspace::from_config(&config).unwrap();
        assert!(workspace.rows(TabType::Framework).is_empty());

        let seeded = Workspace::from_config(&ParfaitConfig::default().rng_seed(9)).unwrap();
        let again = Workspace::from_config(&ParfaitConfig::default().rng_seed(9)).unwrap();
        assert_eq!(
            seeded.rows(TabType::Assessment),
            again.rows(TabType::Assessment)
        );
    }
}
