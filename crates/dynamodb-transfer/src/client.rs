//! External service interfaces
//!
//! The job-control service and the object store are external collaborators;
//! the core only ever talks to them through these traits. The AWS-backed
//! implementations live in [`crate::aws`]; tests substitute stubs.

use async_trait::async_trait;

use crate::error::Result;
use crate::export::{ExportJob, ExportStatus, SubmitExportArgs};
use crate::import::{ImportJob, ImportStatus, SubmitImportArgs};

/// Thin list entry for an export job: handle and status, nothing else.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub arn: String,
    pub status: ExportStatus,
}

/// One page of export list results plus the continuation token, if any.
#[derive(Debug, Clone)]
pub struct ExportListPage {
    pub exports: Vec<ExportSummary>,
    pub next_token: Option<String>,
}

/// Thin list entry for an import job.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub arn: String,
    pub status: ImportStatus,
}

/// One page of import list results plus the continuation token, if any.
#[derive(Debug, Clone)]
pub struct ImportListPage {
    pub imports: Vec<ImportSummary>,
    pub next_token: Option<String>,
}

/// Receipt returned by the object store for a successful write.
#[derive(Debug, Clone, Default)]
pub struct PutReceipt {
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

/// Client interface of the job-control service.
///
/// `describe_*` models an unknown handle as `Ok(None)` — a normal outcome for
/// expired handles, never an error. Every other service failure propagates
/// unchanged; no method retries anything.
#[async_trait]
pub trait JobControlClient: Send + Sync {
    /// Submit a new export job. The returned record is detailed.
    async fn submit_export(&self, args: SubmitExportArgs) -> Result<ExportJob>;

    /// Fetch the current detailed state of one export job.
    async fn describe_export(&self, arn: &str) -> Result<Option<ExportJob>>;

    /// Fetch one page of export jobs for a table.
    async fn list_exports(
        &self,
        table_arn: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> Result<ExportListPage>;

    /// Submit a new import job. The returned record is detailed.
    async fn submit_import(&self, args: SubmitImportArgs) -> Result<ImportJob>;

    /// Fetch the current detailed state of one import job.
    async fn describe_import(&self, arn: &str) -> Result<Option<ImportJob>>;

    /// Fetch one page of import jobs for a table.
    async fn list_imports(
        &self,
        table_arn: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> Result<ImportListPage>;
}

/// Client interface of the object store holding manifests and data files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a whole object. A missing object is a service error and propagates
    /// unchanged; this layer never swallows not-found on reads.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write a whole object with the given content type and encoding markers.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        content_encoding: &str,
    ) -> Result<PutReceipt>;

    /// Existence probe. Returns `false` on not-found, errors otherwise.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool>;
}
