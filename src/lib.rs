//! ctrl-parfait - Control Performance and Reliability Framework
//!
//! Measurement tables for CIS Controls safeguards. Each row binds a safeguard
//! and an asset target to an enforcement point and a set of measurement
//! attributes, in two tabs: framework (how each attribute is measured) and
//! assessment (the measured outcome).
//!
//! ## Architecture
//! Taxonomy YAML -> HierarchyIndex -> AssetOptionTable
//!                               \-> RowEngine (cascading row edits)
//! Workspace owns rows + AttributeRegistry -> ExportSnapshot -> Exporter
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ctrl_parfait::{TabType, Taxonomy, Workspace};
//!
//! let mut workspace = Workspace::new(Taxonomy::cis_default()?);
//! let row_id = workspace.add_row(TabType::Framework);
//! workspace.update_rows(TabType::Framework, |engine, rows| engine.set_control(rows, &row_id, "cis1"));
//!
//! let options = workspace.asset_options_for("1.1");
//! let key = options[0].id.clone();
//! workspace.update_rows(TabType::Framework, |engine, rows| engine.set_asset_option(rows, &row_id, &key));
//! # Ok::<(), ctrl_parfait::ParfaitError>(())
//! ```

// Core error handling
pub mod error;

// Runtime configuration
pub mod config;

// Static control and asset definitions
pub mod taxonomy;

// Derived lookups and option tables
pub mod asset_options;
pub mod hierarchy;

// Row and attribute state
pub mod attributes;
pub mod rows;
pub mod seed;
pub mod workspace;

// Export boundary
pub mod export;

// Foundation types
pub use parfait_types::{
    AssetClass, AssetLevel, AssetOption, AssetSelection, AssetSubclass, Attribute, Control,
    ControlGroup, ExportFormat, Row, Safeguard, TabType, TypeParseError,
};

pub use asset_options::{
    decode_asset_option, generate_all_asset_options, generate_asset_options, AssetOptionTable,
};
pub use attributes::{attribute_from_form, attribute_id_from_name, propagate, AttributeRegistry};
pub use config::ParfaitConfig;
pub use error::{ExportError, ParfaitError, RegistryError, Result, TaxonomyError};
pub use export::{
    export_file_name, tabulate, ExportEncoder, ExportSnapshot, Exporter, JsonEncoder,
    TabularExport, TabularRecord, XlsxEncoder,
};
pub use hierarchy::{
    flatten_controls, flatten_safeguards, flatten_subclasses, HierarchyFingerprint,
    HierarchyIndex,
};
pub use rows::{check_row, check_rows, RowEngine, RowField, RowViolation};
pub use taxonomy::{Taxonomy, TaxonomyLoader};
pub use workspace::Workspace;
