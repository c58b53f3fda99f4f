//! Runtime configuration.
//!
//! Where the taxonomy comes from, where exports are written, and how a new
//! workspace is seeded.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::taxonomy::{TaxonomyLoader, TAXONOMY_ENV_VAR};

pub const EXPORT_DIR_ENV_VAR: &str = "PARFAIT_EXPORT_DIR";
pub const SEED_EXAMPLES_ENV_VAR: &str = "PARFAIT_SEED_EXAMPLES";
pub const RNG_SEED_ENV_VAR: &str = "PARFAIT_RNG_SEED";

/// Configuration for a ctrl-parfait session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParfaitConfig {
    /// Taxonomy YAML file; `None` uses the embedded CIS Controls.
    pub taxonomy_path: Option<PathBuf>,

    /// Directory export files are written to.
    pub export_dir: PathBuf,

    /// Whether a new workspace starts with example rows.
    pub seed_examples: bool,

    /// Seed for example data. `None` draws from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for ParfaitConfig {
    fn default() -> Self {
        Self {
            taxonomy_path: None,
            export_dir: PathBuf::from("."),
            seed_examples: true,
            rng_seed: None,
        }
    }
}

impl ParfaitConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Unparseable values are logged and the default kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = value(TAXONOMY_ENV_VAR) {
            config.taxonomy_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = value(EXPORT_DIR_ENV_VAR) {
            config.export_dir = PathBuf::from(dir);
        }
        if let Some(raw) = value(SEED_EXAMPLES_ENV_VAR) {
            match parse_flag(&raw) {
                Some(flag) => config.seed_examples = flag,
                None => warn!("Ignoring {}={:?}: expected true/false", SEED_EXAMPLES_ENV_VAR, raw),
            }
        }
        if let Some(raw) = value(RNG_SEED_ENV_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.rng_seed = Some(seed),
                Err(e) => warn!("Ignoring {}={:?}: {}", RNG_SEED_ENV_VAR, raw, e),
            }
        }

        info!(
            "Config: taxonomy={}, export_dir={}, seed_examples={}",
            config
                .taxonomy_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "embedded".to_string()),
            config.export_dir.display(),
            config.seed_examples
        );
        config
    }

    /// Set the taxonomy file.
    pub fn taxonomy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.taxonomy_path = Some(path.into());
        self
    }

    /// Set the export directory.
    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Enable or disable example rows.
    pub fn seed_examples(mut self, enabled: bool) -> Self {
        self.seed_examples = enabled;
        self
    }

    /// Fix the example data seed.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Loader for the configured taxonomy
    pub fn taxonomy_loader(&self) -> TaxonomyLoader {
        match &self.taxonomy_path {
            Some(path) => TaxonomyLoader::new(path),
            None => TaxonomyLoader::embedded(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
