//! Export
//!
//! Writes a read-only snapshot of one tab to a file in a requested format:
//!
//! ```text
//! Workspace::snapshot(tab) ──► Exporter::export("xlsx", &snapshot)
//!                                  │ parse tag        UnsupportedFormat
//!                                  │ find encoder     EncoderUnavailable
//!                                  │ encode           Encoder
//!                                  ▼ write file       Io
//!                   <dir>/ctrl-parfait-<tab>-<timestamp>.<ext>
//! ```
//!
//! Encoding finishes before anything touches the filesystem, so a failed
//! export leaves no file behind. Exports never modify workspace state.

mod encoder;
mod tabular;
mod xlsx;

pub use encoder::{ExportEncoder, JsonEncoder};
pub use tabular::{tabulate, TabularExport, TabularRecord, BASE_HEADERS, UNKNOWN_ASSET};
pub use xlsx::XlsxEncoder;

use chrono::{DateTime, SecondsFormat, Utc};
use parfait_types::{AssetClass, Attribute, ControlGroup, ExportFormat, Row, TabType};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::ExportError;

/// Everything an encoder may read, copied at export time
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSnapshot {
    pub tab: TabType,
    pub taken_at: DateTime<Utc>,
    pub rows: Vec<Row>,
    pub attributes: Vec<Attribute>,
    pub control_groups: Vec<ControlGroup>,
    pub asset_classes: Vec<AssetClass>,
}

/// `ctrl-parfait-<tab>-<timestamp>.<ext>` with `:` and `.` in the timestamp
/// replaced by `-`
pub fn export_file_name(tab: TabType, timestamp: DateTime<Utc>, format: ExportFormat) -> String {
    let stamp = timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("ctrl-parfait-{}-{}.{}", tab, stamp, format.extension())
}

/// Encoder registry plus output directory
#[derive(Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    encoders: HashMap<ExportFormat, Arc<dyn ExportEncoder>>,
}

impl Exporter {
    /// Exporter writing to `output_dir` with the built-in JSON and xlsx encoders
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            encoders: HashMap::new(),
        }
        .with_encoder(JsonEncoder)
        .with_encoder(XlsxEncoder)
    }

    /// Register an encoder, replacing any previous one for its format
    pub fn with_encoder(mut self, encoder: impl ExportEncoder + 'static) -> Self {
        self.register(Arc::new(encoder));
        self
    }

    pub fn register(&mut self, encoder: Arc<dyn ExportEncoder>) {
        self.encoders.insert(encoder.format(), encoder);
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        self.encoders.contains_key(&format)
    }

    /// Export a snapshot in the format named by `tag` (`json`, `xlsx`, `pdf`, `pptx`)
    pub async fn export(&self, tag: &str, snapshot: &ExportSnapshot) -> Result<PathBuf, ExportError> {
        let result = match tag.parse::<ExportFormat>() {
            Ok(format) => self.write(format, snapshot).await,
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(path) => info!("Exported {} rows to {}", snapshot.rows.len(), path.display()),
            Err(e) => error!("Export of {} tab failed: {}", snapshot.tab, e),
        }
        result
    }

    async fn write(&self, format: ExportFormat, snapshot: &ExportSnapshot) -> Result<PathBuf, ExportError> {
        let encoder = self
            .encoders
            .get(&format)
            .ok_or(ExportError::EncoderUnavailable(format))?;

        let bytes = encoder.encode(snapshot).await?;

        let path = self
            .output_dir
            .join(export_file_name(snapshot.tab, snapshot.taken_at, format));
        let io_error = |source: std::io::Error| ExportError::Io {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(io_error)?;
        debug!("Writing {} bytes of {}", bytes.len(), format.mime_type());
        tokio::fs::write(&path, bytes).await.map_err(io_error)?;

        Ok(path)
    }
}

impl std::fmt::Debug for Exporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formats: Vec<_> = self.encoders.keys().map(|f| f.extension()).collect();
        formats.sort_unstable();
        f.debug_struct("Exporter")
            .field("output_dir", &self.output_dir)
            .field("formats", &formats)
            .finish()
    }
}
