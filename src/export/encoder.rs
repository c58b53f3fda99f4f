//! Format encoders
//!
//! An encoder turns a snapshot into the bytes of one export format. JSON and
//! xlsx are built in; document and slide encoders are supplied by the host
//! application and registered with the [`Exporter`](super::Exporter).

use async_trait::async_trait;
use chrono::SecondsFormat;
use parfait_types::{AssetClass, Attribute, ControlGroup, ExportFormat, Row};
use serde::Serialize;

use super::ExportSnapshot;
use crate::error::ExportError;

/// Produces the bytes of one export format
#[async_trait]
pub trait ExportEncoder: Send + Sync {
    fn format(&self) -> ExportFormat;

    async fn encode(&self, snapshot: &ExportSnapshot) -> Result<Vec<u8>, ExportError>;
}

/// Pretty-printed JSON of the raw snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    exported_at: String,
    attributes: &'a [Attribute],
    control_groups: &'a [ControlGroup],
    asset_classes: &'a [AssetClass],
    rows: &'a [Row],
}

#[async_trait]
impl ExportEncoder for JsonEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    async fn encode(&self, snapshot: &ExportSnapshot) -> Result<Vec<u8>, ExportError> {
        let document = JsonDocument {
            exported_at: snapshot
                .taken_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            attributes: &snapshot.attributes,
            control_groups: &snapshot.control_groups,
            asset_classes: &snapshot.asset_classes,
            rows: &snapshot.rows,
        };

        serde_json::to_vec_pretty(&document)
            .map_err(|e| ExportError::encoder(ExportFormat::Json, e.to_string()))
    }
}
