//! Pure S3 location derivation for export artifacts
//!
//! A completed export leaves its artifacts under a fixed layout:
//!
//! ```text
//! s3://<bucket>/<prefix>/AWSDynamoDB/<short-id>/
//!     data/                       <- gzip JSON-Lines data files
//!     manifest-files.json         <- one JSON object per data file
//!     manifest-summary.json       <- single JSON object describing the export
//! ```
//!
//! Everything in this module is a pure function over strings; no I/O.

use crate::error::{Result, TransferError};

/// Root directory name the service writes under the caller-supplied prefix.
pub const EXPORT_ROOT_DIR: &str = "AWSDynamoDB";

/// File name of the per-file manifest (JSON Lines).
pub const FILES_MANIFEST_NAME: &str = "manifest-files.json";

/// File name of the summary manifest (single JSON object).
pub const SUMMARY_MANIFEST_NAME: &str = "manifest-summary.json";

/// Normalize a key prefix so that it always ends with `/`.
///
/// Idempotent: normalizing an already-normalized prefix is a no-op. The empty
/// prefix stays empty (objects land at the bucket root without a leading `/`).
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}

/// Extract the short id from a job handle: the trailing path segment of the ARN.
///
/// Example: `arn:aws:dynamodb:...:table/t/export/01672531200000-a1b2c3d4`
/// yields `01672531200000-a1b2c3d4`.
pub fn short_id(handle: &str) -> &str {
    handle.rsplit('/').next().unwrap_or(handle)
}

/// Parse an `s3://bucket/key` URI into its bucket and key parts.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let rest = uri
        .strip_prefix("s3://")
        .ok_or_else(|| TransferError::InvalidS3Uri(uri.to_string()))?;
    let (bucket, key) = rest
        .split_once('/')
        .ok_or_else(|| TransferError::InvalidS3Uri(uri.to_string()))?;
    if bucket.is_empty() || key.is_empty() {
        return Err(TransferError::InvalidS3Uri(uri.to_string()));
    }
    Ok((bucket.to_string(), key.to_string()))
}

/// Canonical object-store locations for one export job.
///
/// Deterministic: the same bucket/prefix/short-id always produce identical
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    bucket: String,
    prefix: String,
    short_id: String,
}

impl ExportPaths {
    /// Build the path set. The prefix is normalized on construction.
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        short_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: normalize_prefix(&prefix.into()),
            short_id: short_id.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key of the export root directory: `<prefix>AWSDynamoDB/<short-id>/`.
    pub fn root_key(&self) -> String {
        format!("{}{}/{}/", self.prefix, EXPORT_ROOT_DIR, self.short_id)
    }

    /// Key of the data file directory: `<root>data/`.
    pub fn data_dir_key(&self) -> String {
        format!("{}data/", self.root_key())
    }

    /// Key of the per-file manifest: `<root>manifest-files.json`.
    pub fn files_manifest_key(&self) -> String {
        format!("{}{}", self.root_key(), FILES_MANIFEST_NAME)
    }

    /// Key of the summary manifest: `<root>manifest-summary.json`.
    pub fn summary_manifest_key(&self) -> String {
        format!("{}{}", self.root_key(), SUMMARY_MANIFEST_NAME)
    }

    pub fn root_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.root_key())
    }

    pub fn data_dir_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.data_dir_key())
    }

    pub fn files_manifest_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.files_manifest_key())
    }

    pub fn summary_manifest_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.summary_manifest_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("exports"), "exports/");
        assert_eq!(normalize_prefix("exports/"), "exports/");
        assert_eq!(normalize_prefix("a/b"), "a/b/");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn test_normalize_prefix_idempotent() {
        let once = normalize_prefix("2020-Nov");
        assert_eq!(normalize_prefix(&once), once);
    }

    #[test]
    fn test_short_id() {
        let arn = "arn:aws:dynamodb:us-east-1:123456789012:table/ProductCatalog/export/01672531200000-a1b2c3d4";
        assert_eq!(short_id(arn), "01672531200000-a1b2c3d4");
        assert_eq!(short_id("no-slashes"), "no-slashes");
    }

    #[test]
    fn test_parse_s3_uri() {
        let (bucket, key) = parse_s3_uri("s3://my-bucket/folder/file.txt").unwrap();
        assert_eq!(bucket, "my-bucket");
        assert_eq!(key, "folder/file.txt");

        assert!(parse_s3_uri("http://my-bucket/key").is_err());
        assert!(parse_s3_uri("s3://bucket-only").is_err());
        assert!(parse_s3_uri("s3:///key").is_err());
    }

    #[test]
    fn test_export_paths() {
        let paths = ExportPaths::new("ddb-exports", "2020-Nov", "01672531200000-a1b2c3d4");
        assert_eq!(
            paths.root_key(),
            "2020-Nov/AWSDynamoDB/01672531200000-a1b2c3d4/"
        );
        assert_eq!(
            paths.data_dir_key(),
            "2020-Nov/AWSDynamoDB/01672531200000-a1b2c3d4/data/"
        );
        assert_eq!(
            paths.files_manifest_key(),
            "2020-Nov/AWSDynamoDB/01672531200000-a1b2c3d4/manifest-files.json"
        );
        assert_eq!(
            paths.summary_manifest_key(),
            "2020-Nov/AWSDynamoDB/01672531200000-a1b2c3d4/manifest-summary.json"
        );
        assert_eq!(
            paths.summary_manifest_uri(),
            "s3://ddb-exports/2020-Nov/AWSDynamoDB/01672531200000-a1b2c3d4/manifest-summary.json"
        );
    }

    #[test]
    fn test_export_paths_deterministic() {
        let a = ExportPaths::new("b", "p", "id");
        let b = ExportPaths::new("b", "p/", "id");
        assert_eq!(a.root_key(), b.root_key());
        assert_eq!(a.data_dir_uri(), b.data_dir_uri());
    }

    #[test]
    fn test_export_paths_empty_prefix() {
        let paths = ExportPaths::new("bucket", "", "abc");
        assert_eq!(paths.root_key(), "AWSDynamoDB/abc/");
    }
}
