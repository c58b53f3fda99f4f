//! Taxonomy loader
//!
//! Loads a taxonomy from the embedded CIS definition or a YAML file, then runs
//! the referential-integrity pass before handing it out.

use std::path::{Path, PathBuf};
use tracing::info;

use super::validate::ensure_valid;
use super::{Taxonomy, CIS_CONTROLS_YAML};
use crate::error::TaxonomyError;

/// Environment variable naming a taxonomy YAML file, read by `ParfaitConfig`
pub const TAXONOMY_ENV_VAR: &str = "PARFAIT_TAXONOMY";

/// Where a taxonomy definition comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomySource {
    /// The CIS Controls definition compiled into the crate
    Embedded,
    /// A YAML file on disk
    File(PathBuf),
}

pub struct TaxonomyLoader {
    source: TaxonomySource,
}

impl TaxonomyLoader {
    /// Load from a YAML file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TaxonomySource::File(path.into()),
        }
    }

    /// Load the embedded CIS Controls taxonomy
    pub fn embedded() -> Self {
        Self {
            source: TaxonomySource::Embedded,
        }
    }

    pub fn source(&self) -> &TaxonomySource {
        &self.source
    }

    /// Human-readable origin used in logs and errors
    pub fn origin(&self) -> String {
        match &self.source {
            TaxonomySource::Embedded => "embedded cis-controls.yaml".to_string(),
            TaxonomySource::File(path) => path.display().to_string(),
        }
    }

    /// Load, parse and validate the taxonomy
    pub fn load(&self) -> Result<Taxonomy, TaxonomyError> {
        let origin = self.origin();
        info!("Loading taxonomy from {}", origin);

        let taxonomy = match &self.source {
            TaxonomySource::Embedded => Taxonomy::from_yaml_str(CIS_CONTROLS_YAML, &origin)?,
            TaxonomySource::File(path) => Self::load_file(path, &origin)?,
        };

        ensure_valid(&taxonomy, &origin)?;

        info!(
            "Loaded {} control groups with {} safeguards and {} asset classes",
            taxonomy.control_groups.len(),
            taxonomy.safeguard_count(),
            taxonomy.asset_classes.len()
        );

        Ok(taxonomy)
    }

    fn load_file(path: &Path, origin: &str) -> Result<Taxonomy, TaxonomyError> {
        let content = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Taxonomy::from_yaml_str(&content, origin)
    }
}
