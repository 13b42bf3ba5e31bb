//! Manifest documents left behind by a completed export
//!
//! Two levels: a summary manifest (single JSON object, one of two shapes keyed
//! by `exportType`) and a per-file manifest (JSON Lines, one object per data
//! file). Field names are the service-native camelCase names and are never
//! renamed; decoding then re-encoding a summary reproduces the original
//! document value-for-value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TransferError};
use crate::export::ExportFormat;

/// Parse a manifest timestamp (`2020-11-04T07:28:34.028Z`) into UTC.
pub fn parse_manifest_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Summary manifest of one completed full export.
///
/// Timestamps are kept as the verbatim strings the service wrote so that
/// re-encoding is lossless; use the parsed accessors for time arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullExportSummary {
    pub version: String,
    pub export_arn: String,
    pub start_time: String,
    pub end_time: String,
    pub table_arn: String,
    pub table_id: String,
    pub export_time: String,
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_sse_algorithm: String,
    pub s3_sse_kms_key_id: Option<String>,
    pub manifest_files_s3_key: String,
    pub billed_size_bytes: u64,
    pub item_count: u64,
    pub output_format: String,
}

impl FullExportSummary {
    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.start_time)
    }

    pub fn end_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.end_time)
    }

    /// Point-in-time the table state was captured at.
    pub fn export_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.export_time)
    }
}

/// Summary manifest of one completed incremental export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalExportSummary {
    pub version: String,
    pub export_arn: String,
    pub start_time: String,
    pub end_time: String,
    pub table_arn: String,
    pub table_id: String,
    pub export_from_time: String,
    pub export_to_time: String,
    pub s3_bucket: String,
    pub s3_prefix: String,
    pub s3_sse_algorithm: String,
    pub s3_sse_kms_key_id: Option<String>,
    pub manifest_files_s3_key: String,
    pub billed_size_bytes: u64,
    pub item_count: u64,
    pub output_format: String,
    pub output_view: String,
}

impl IncrementalExportSummary {
    pub fn start_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.start_time)
    }

    pub fn end_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.end_time)
    }

    /// Start of the incremental change window.
    pub fn export_from_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.export_from_time)
    }

    /// End of the incremental change window.
    pub fn export_to_time(&self) -> Result<DateTime<Utc>> {
        parse_manifest_time(&self.export_to_time)
    }
}

/// The `manifest-summary.json` document, one of two shapes selected by the
/// explicit `exportType` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "exportType")]
pub enum ManifestSummary {
    #[serde(rename = "FULL_EXPORT")]
    Full(FullExportSummary),
    #[serde(rename = "INCREMENTAL_EXPORT")]
    Incremental(IncrementalExportSummary),
}

impl ManifestSummary {
    /// Decode a summary document.
    ///
    /// Variant selection is driven by the `exportType` tag alone: a missing or
    /// unrecognized tag is [`TransferError::UnsupportedExportType`], never a
    /// silent default.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        let tag = value
            .get("exportType")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        match tag.as_str() {
            "FULL_EXPORT" | "INCREMENTAL_EXPORT" => Ok(serde_json::from_value(value)?),
            _ => Err(TransferError::UnsupportedExportType(tag)),
        }
    }

    /// Re-encode the summary as a JSON value carrying the same keys and values
    /// the decoded document had.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn export_arn(&self) -> &str {
        match self {
            ManifestSummary::Full(s) => &s.export_arn,
            ManifestSummary::Incremental(s) => &s.export_arn,
        }
    }

    pub fn item_count(&self) -> u64 {
        match self {
            ManifestSummary::Full(s) => s.item_count,
            ManifestSummary::Incremental(s) => s.item_count,
        }
    }

    pub fn billed_size_bytes(&self) -> u64 {
        match self {
            ManifestSummary::Full(s) => s.billed_size_bytes,
            ManifestSummary::Incremental(s) => s.billed_size_bytes,
        }
    }

    pub fn output_format(&self) -> &str {
        match self {
            ManifestSummary::Full(s) => &s.output_format,
            ManifestSummary::Incremental(s) => &s.output_format,
        }
    }

    pub fn manifest_files_s3_key(&self) -> &str {
        match self {
            ManifestSummary::Full(s) => &s.manifest_files_s3_key,
            ManifestSummary::Incremental(s) => &s.manifest_files_s3_key,
        }
    }
}

/// One line of the `manifest-files.json` per-file manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFileEntry {
    pub item_count: u64,
    pub md5_checksum: String,
    pub etag: String,
    pub data_file_s3_key: String,
}

/// A resolved reference to one physical data file backing an export.
///
/// References are generated fresh from the per-file manifest on every
/// resolution; they are never cached across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFileRef {
    pub item_count: u64,
    pub md5_checksum: String,
    pub etag: String,
    pub bucket: String,
    pub key: String,
    /// Encoding tag inherited from the owning job.
    pub format: ExportFormat,
}

/// Parse the per-file manifest (JSON Lines, not a JSON array) into data file
/// references, in file order as listed.
///
/// Any malformed line fails the whole resolution with
/// [`TransferError::CorruptManifest`] naming the offending 1-based line index.
pub fn parse_file_manifest(bytes: &[u8], bucket: &str, format: ExportFormat) -> Result<Vec<DataFileRef>> {
    let text = std::str::from_utf8(bytes).map_err(|e| TransferError::CorruptManifest {
        line: 0,
        reason: format!("per-file manifest is not valid UTF-8: {}", e),
    })?;

    let mut files = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: DataFileEntry =
            serde_json::from_str(line).map_err(|e| TransferError::CorruptManifest {
                line: idx + 1,
                reason: e.to_string(),
            })?;
        files.push(DataFileRef {
            item_count: entry.item_count,
            md5_checksum: entry.md5_checksum,
            etag: entry.etag,
            bucket: bucket.to_string(),
            key: entry.data_file_s3_key,
            format,
        });
    }
    Ok(files)
}
