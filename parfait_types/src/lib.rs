//! Parfait Types - Foundation Data Structures
//!
//! Pure data structures for the Control Performance and Reliability Framework:
//! the CIS control taxonomy (groups, controls, safeguards), the asset taxonomy
//! (classes and subclasses), measurement attributes, and the rows users edit.
//!
//! ## Architecture Level: Foundation
//!
//! Every other part of ctrl-parfait depends on this crate; this crate depends
//! on nothing in the workspace.
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - Cascades, lookups and option generation live in `ctrl_parfait`
//! 2. **SERIALIZABLE** - Field names on the wire match the taxonomy files and exports
//! 3. **EMPTY MEANS UNSET** - Relational row fields use `""` as the absence marker
//!
//! ## Composite asset keys
//!
//! An asset selection travels through selectors as a single string:
//!
//! ```text
//! class-<classId>                  → { assetClassId: classId, assetSubclassId: "" }
//! subclass-<classId>-<subclassId>  → { assetClassId: classId, assetSubclassId: subclassId }
//! anything else                    → { assetClassId: "",      assetSubclassId: "" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ASSET TAXONOMY
// ============================================================================

/// A subclass of protected assets (e.g. Devices → Servers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSubclass {
    pub id: String,
    pub name: String,
    /// Owning asset class (back-reference, not ownership)
    #[serde(rename = "classId")]
    pub class_id: String,
}

impl AssetSubclass {
    pub fn new(id: impl Into<String>, name: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            class_id: class_id.into(),
        }
    }
}

/// A top-level asset class owning an ordered list of subclasses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetClass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subclasses: Vec<AssetSubclass>,
}

impl AssetClass {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            subclasses: Vec::new(),
        }
    }

    /// Append a subclass, filling in the back-reference to this class
    pub fn with_subclass(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let class_id = self.id.clone();
        self.subclasses.push(AssetSubclass::new(id, name, class_id));
        self
    }

    /// Find a subclass of this class by id
    pub fn subclass(&self, subclass_id: &str) -> Option<&AssetSubclass> {
        self.subclasses.iter().find(|s| s.id == subclass_id)
    }
}

// ============================================================================
// CONTROL TAXONOMY
// ============================================================================

/// A numbered security practice within a control.
///
/// `applicable_asset_subclasses` is a flat set; whether a subclass id is valid
/// for a class is only known by checking which applicable classes contain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safeguard {
    pub id: String,
    /// Owning control (must equal the id of the control that contains this safeguard)
    pub control_id: String,
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub applicable_asset_classes: Vec<String>,
    #[serde(default)]
    pub applicable_asset_subclasses: Vec<String>,
}

impl Safeguard {
    pub fn new(
        id: impl Into<String>,
        control_id: impl Into<String>,
        number: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            control_id: control_id.into(),
            number: number.into(),
            name: name.into(),
            description: String::new(),
            applicable_asset_classes: Vec::new(),
            applicable_asset_subclasses: Vec::new(),
        }
    }

    /// Set the applicable asset classes and subclasses
    pub fn applicable_to<C, S>(mut self, classes: C, subclasses: S) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        self.applicable_asset_classes = classes.into_iter().map(Into::into).collect();
        self.applicable_asset_subclasses = subclasses.into_iter().map(Into::into).collect();
        self
    }

    pub fn applies_to_class(&self, class_id: &str) -> bool {
        self.applicable_asset_classes.iter().any(|c| c == class_id)
    }

    pub fn applies_to_subclass(&self, subclass_id: &str) -> bool {
        self.applicable_asset_subclasses.iter().any(|s| s == subclass_id)
    }
}

/// A CIS control owning an ordered list of safeguards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub safeguards: Vec<Safeguard>,
}

impl Control {
    pub fn new(id: impl Into<String>, number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            name: name.into(),
            safeguards: Vec::new(),
        }
    }

    pub fn with_safeguard(mut self, safeguard: Safeguard) -> Self {
        self.safeguards.push(safeguard);
        self
    }

    /// Label used by control pickers ("1: Inventory and Control ...")
    pub fn label(&self) -> String {
        format!("{}: {}", self.number, self.name)
    }
}

/// Implementation-group tier of controls (IG1/IG2/IG3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub controls: Vec<Control>,
}

impl ControlGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            controls: Vec::new(),
        }
    }

    pub fn with_control(mut self, control: Control) -> Self {
        self.controls.push(control);
        self
    }
}

// ============================================================================
// MEASUREMENT ATTRIBUTES
// ============================================================================

/// A user-defined measurement dimension (e.g. Effectiveness)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Derived from the name at creation time, unique within a registry
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tooltip: String,
}

impl Attribute {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tooltip: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// Which table a row collection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabType {
    /// Measurement-method definitions
    Framework,
    /// Assessment outcome values
    Assessment,
}

impl TabType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabType::Framework => "framework",
            TabType::Assessment => "assessment",
        }
    }

    /// Table title shown to users
    pub fn title(&self) -> &'static str {
        match self {
            TabType::Framework => "Measurement Methods",
            TabType::Assessment => "Assessment Outcomes",
        }
    }
}

impl fmt::Display for TabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabType {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "framework" => Ok(TabType::Framework),
            "assessment" => Ok(TabType::Assessment),
            other => Err(TypeParseError::UnknownTab(other.to_string())),
        }
    }
}

/// One framework or assessment record.
///
/// Framework and assessment rows share this type; the collection a row lives in
/// decides which table it belongs to. Relational fields use `""` for "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: String,
    pub control_id: String,
    pub safeguard_id: String,
    pub asset_class_id: String,
    pub asset_subclass_id: String,
    pub enforcement_point: String,
    /// Attribute id → measurement method (framework) or assessed value (assessment)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Row {
    /// Create an empty row with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn has_safeguard(&self) -> bool {
        !self.safeguard_id.is_empty()
    }

    /// Current asset selection of this row
    pub fn asset_selection(&self) -> AssetSelection {
        AssetSelection {
            asset_class_id: self.asset_class_id.clone(),
            asset_subclass_id: self.asset_subclass_id.clone(),
        }
    }

    /// Value recorded for an attribute, if the row carries an entry for it
    pub fn attribute(&self, attribute_id: &str) -> Option<&str> {
        self.attributes.get(attribute_id).map(|s| s.as_str())
    }
}

// ============================================================================
// ASSET OPTIONS
// ============================================================================

const CLASS_KEY_PREFIX: &str = "class-";
const SUBCLASS_KEY_PREFIX: &str = "subclass-";

/// Granularity of an asset option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetLevel {
    AssetClass,
    AssetSubclass,
}

/// One selectable entry in a safeguard's asset picker.
///
/// Derived on demand, never persisted. `id` is the composite key that decodes
/// back into the referenced ids (see [`AssetSelection::decode`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetOption {
    pub id: String,
    pub display_name: String,
    pub level: AssetLevel,
    pub asset_class_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_subclass_id: Option<String>,
}

impl AssetOption {
    /// Class-level option (`class-<classId>`)
    pub fn for_class(class: &AssetClass) -> Self {
        Self {
            id: Self::class_key(&class.id),
            display_name: class.name.clone(),
            level: AssetLevel::AssetClass,
            asset_class_id: class.id.clone(),
            asset_subclass_id: None,
        }
    }

    /// Class+subclass option (`subclass-<classId>-<subclassId>`)
    pub fn for_subclass(class: &AssetClass, subclass: &AssetSubclass) -> Self {
        Self {
            id: Self::subclass_key(&class.id, &subclass.id),
            display_name: format!("{} > {}", class.name, subclass.name),
            level: AssetLevel::AssetSubclass,
            asset_class_id: class.id.clone(),
            asset_subclass_id: Some(subclass.id.clone()),
        }
    }

    pub fn class_key(class_id: &str) -> String {
        format!("{}{}", CLASS_KEY_PREFIX, class_id)
    }

    pub fn subclass_key(class_id: &str, subclass_id: &str) -> String {
        format!("{}{}-{}", SUBCLASS_KEY_PREFIX, class_id, subclass_id)
    }

    /// The selection this option stands for
    pub fn selection(&self) -> AssetSelection {
        AssetSelection {
            asset_class_id: self.asset_class_id.clone(),
            asset_subclass_id: self.asset_subclass_id.clone().unwrap_or_default(),
        }
    }
}

/// Decoded asset selection: a class alone, a class+subclass pair, or nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSelection {
    pub asset_class_id: String,
    pub asset_subclass_id: String,
}

impl AssetSelection {
    /// Both fields unset
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.asset_class_id.is_empty() && self.asset_subclass_id.is_empty()
    }

    /// Decode a composite option key.
    ///
    /// Empty, malformed, or unrecognised keys decode to the empty selection.
    /// The class id of a subclass key ends at the first `-` after the prefix;
    /// everything after it is the subclass id.
    pub fn decode(combined: &str) -> Self {
        if let Some(class_id) = combined.strip_prefix(CLASS_KEY_PREFIX) {
            if class_id.is_empty() {
                return Self::empty();
            }
            return Self {
                asset_class_id: class_id.to_string(),
                asset_subclass_id: String::new(),
            };
        }

        if let Some(rest) = combined.strip_prefix(SUBCLASS_KEY_PREFIX) {
            return match rest.split_once('-') {
                Some((class_id, subclass_id)) if !class_id.is_empty() && !subclass_id.is_empty() => {
                    Self {
                        asset_class_id: class_id.to_string(),
                        asset_subclass_id: subclass_id.to_string(),
                    }
                }
                _ => Self::empty(),
            };
        }

        Self::empty()
    }

    /// Composite key of this selection, `""` when nothing is selected
    pub fn option_key(&self) -> String {
        match (self.asset_class_id.is_empty(), self.asset_subclass_id.is_empty()) {
            (false, false) => AssetOption::subclass_key(&self.asset_class_id, &self.asset_subclass_id),
            (false, true) => AssetOption::class_key(&self.asset_class_id),
            _ => String::new(),
        }
    }
}

// ============================================================================
// EXPORT FORMATS
// ============================================================================

/// The closed set of export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Xlsx,
    Pdf,
    Pptx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Json,
        ExportFormat::Xlsx,
        ExportFormat::Pdf,
        ExportFormat::Pptx,
    ];

    /// File extension (also the format tag)
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Pptx => "pptx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            "pptx" => Ok(ExportFormat::Pptx),
            other => Err(TypeParseError::UnsupportedFormat(other.to_string())),
        }
    }
}

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// Errors from parsing the string forms of foundation types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    #[error("Unknown tab type '{0}' (expected 'framework' or 'assessment')")]
    UnknownTab(String),

    #[error("Unsupported export format '{0}'")]
    UnsupportedFormat(String),
}
