//! Export job records: submission, status tracking, and manifest-driven
//! access to the exported data files
//!
//! An [`ExportJob`] is a snapshot value, never the authoritative record: the
//! service keeps mutating the real job after a snapshot is taken, and a fresh
//! state is only ever obtained by describing the handle again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

use crate::addressing::{short_id, ExportPaths};
use crate::client::{JobControlClient, ObjectStore};
use crate::codec::ItemReader;
use crate::error::{Result, TransferError};
use crate::manifest::{parse_file_manifest, DataFileRef, ManifestSummary};
use crate::waiter::{wait_for_job, PolledJob, Waiter};

/// Export job status as reported by the service.
///
/// `InProgress` is the sole initial state of a freshly submitted job;
/// `Completed` and `Failed` are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    InProgress,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::InProgress => "IN_PROGRESS",
            ExportStatus::Completed => "COMPLETED",
            ExportStatus::Failed => "FAILED",
        }
    }

    /// Whether the service guarantees no further transition from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStatus::Completed | ExportStatus::Failed)
    }
}

impl FromStr for ExportStatus {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IN_PROGRESS" => Ok(ExportStatus::InProgress),
            "COMPLETED" => Ok(ExportStatus::Completed),
            "FAILED" => Ok(ExportStatus::Failed),
            other => Err(TransferError::Service(anyhow::anyhow!(
                "unknown export status '{}'",
                other
            ))),
        }
    }
}

/// The closed union of data file encodings.
///
/// The codec branches on this exactly twice (decode and encode); everything
/// else carries the tag opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportFormat {
    /// Self-describing wire-tagged items.
    DynamodbJson,
    /// Native-mapping items (the alternate text serialization).
    Ion,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::DynamodbJson => "DYNAMODB_JSON",
            ExportFormat::Ion => "ION",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DYNAMODB_JSON" => Ok(ExportFormat::DynamodbJson),
            "ION" => Ok(ExportFormat::Ion),
            other => Err(TransferError::Service(anyhow::anyhow!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

/// Arguments for submitting a point-in-time export.
#[derive(Debug, Clone)]
pub struct SubmitExportArgs {
    pub table_arn: String,
    pub s3_bucket: String,
    pub s3_prefix: Option<String>,
    /// Point in time to export; the service defaults to the current time.
    pub export_time: Option<DateTime<Utc>>,
    pub export_format: ExportFormat,
    pub s3_bucket_owner: Option<String>,
    pub s3_sse_algorithm: Option<String>,
    pub s3_sse_kms_key_id: Option<String>,
    pub client_token: Option<String>,
}

impl SubmitExportArgs {
    pub fn new(table_arn: impl Into<String>, s3_bucket: impl Into<String>) -> Self {
        Self {
            table_arn: table_arn.into(),
            s3_bucket: s3_bucket.into(),
            s3_prefix: None,
            export_time: None,
            export_format: ExportFormat::DynamodbJson,
            s3_bucket_owner: None,
            s3_sse_algorithm: None,
            s3_sse_kms_key_id: None,
            client_token: None,
        }
    }
}

/// Pagination options for [`ExportJob::list`] and [`crate::import::ImportJob::list`].
#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    /// Page size requested from the service per call.
    pub page_size: i32,
    /// Hard cap on the number of records returned.
    pub max_results: usize,
    /// When true, each listed entry is described individually — one extra
    /// service round trip per entry (O(n) additional calls).
    pub detailed: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: 25,
            max_results: 1000,
            detailed: false,
        }
    }
}

/// Snapshot of one export job.
///
/// A record is "thin" (handle + status only, as produced by listing) or
/// "detailed" (all optional fields populated, as produced by describing).
/// Detail is fetched on demand via [`ExportJob::detailed`], never implicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    /// Opaque job handle issued by the service.
    pub arn: String,
    pub status: ExportStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub export_time: Option<DateTime<Utc>>,
    pub table_arn: Option<String>,
    pub table_id: Option<String>,
    pub s3_bucket: Option<String>,
    /// Always ends with `/` once set; normalized by [`ExportJob::normalized`].
    pub s3_prefix: Option<String>,
    pub item_count: Option<i64>,
    pub billed_size_bytes: Option<i64>,
    pub export_format: Option<ExportFormat>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    /// Key of the per-file manifest, as reported by the service.
    pub export_manifest: Option<String>,
}

impl ExportJob {
    /// Create a thin record carrying only identity and status.
    pub fn new(arn: impl Into<String>, status: ExportStatus) -> Self {
        Self {
            arn: arn.into(),
            status,
            start_time: None,
            end_time: None,
            export_time: None,
            table_arn: None,
            table_id: None,
            s3_bucket: None,
            s3_prefix: None,
            item_count: None,
            billed_size_bytes: None,
            export_format: None,
            failure_code: None,
            failure_message: None,
            export_manifest: None,
        }
    }

    /// Apply construction invariants: the location prefix, once set, always
    /// carries a trailing separator. Idempotent.
    pub fn normalized(mut self) -> Self {
        if let Some(prefix) = self.s3_prefix.take() {
            self.s3_prefix = Some(crate::addressing::normalize_prefix(&prefix));
        }
        self
    }

    /// Submit a new point-in-time export and return its (detailed) record.
    pub async fn submit(client: &dyn JobControlClient, args: SubmitExportArgs) -> Result<Self> {
        let job = client.submit_export(args).await?;
        info!(arn = %job.arn, "submitted export job");
        Ok(job)
    }

    /// Fetch the current detailed state of an export job.
    ///
    /// Returns `Ok(None)` when the handle is unknown to the service — a
    /// normal outcome for expired handles. Any other service error
    /// propagates unchanged.
    pub async fn describe(client: &dyn JobControlClient, arn: &str) -> Result<Option<Self>> {
        client.describe_export(arn).await
    }

    /// List export jobs for a table, following the continuation token until
    /// exhaustion or `max_results`.
    ///
    /// With `detailed: false` the entries are thin (no extra round trips);
    /// with `detailed: true` every entry costs one additional describe call.
    /// An entry that expires between the list and its describe degrades to
    /// the thin record rather than failing the listing.
    pub async fn list(
        client: &dyn JobControlClient,
        table_arn: &str,
        options: ListOptions,
    ) -> Result<Vec<Self>> {
        let mut jobs: Vec<Self> = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = client
                .list_exports(table_arn, next_token.take(), options.page_size)
                .await?;
            for summary in page.exports {
                let job = if options.detailed {
                    match Self::describe(client, &summary.arn).await? {
                        Some(detailed) => detailed,
                        None => Self::new(summary.arn, summary.status),
                    }
                } else {
                    Self::new(summary.arn, summary.status)
                };
                jobs.push(job);
                if jobs.len() >= options.max_results {
                    return Ok(jobs);
                }
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(jobs)
    }

    /// Poll the job until it completes, fails, or the waiter times out.
    ///
    /// Occupies the calling task for the duration; callers needing concurrent
    /// waits run separate tasks themselves.
    pub async fn wait_until_complete(
        client: &dyn JobControlClient,
        arn: &str,
        waiter: &Waiter,
    ) -> Result<Self> {
        wait_for_job(waiter, arn, || Self::describe(client, arn)).await
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == ExportStatus::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExportStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExportStatus::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Trailing path segment of the handle, used for addressing.
    pub fn short_id(&self) -> &str {
        short_id(&self.arn)
    }

    /// Canonical object-store locations of this export's artifacts.
    /// `None` while the record is thin (no bucket known yet).
    pub fn paths(&self) -> Option<ExportPaths> {
        let bucket = self.s3_bucket.as_deref()?;
        let prefix = self.s3_prefix.as_deref().unwrap_or("");
        Some(ExportPaths::new(bucket, prefix, self.short_id()))
    }

    /// Return a new, fully populated record for this handle.
    ///
    /// This never mutates `self`; callers replace their reference with the
    /// returned record. A record that is already detailed is cloned as-is.
    pub async fn detailed(&self, client: &dyn JobControlClient) -> Result<Self> {
        if self.s3_bucket.is_some() {
            return Ok(self.clone());
        }
        Self::describe(client, &self.arn)
            .await?
            .ok_or_else(|| TransferError::UnknownJob {
                handle: self.arn.clone(),
            })
    }

    fn resolved_paths(job: &ExportJob) -> Result<ExportPaths> {
        job.paths().ok_or_else(|| {
            TransferError::Service(anyhow::anyhow!(
                "export '{}' has no output location in its description",
                job.arn
            ))
        })
    }

    /// Fetch and parse the summary manifest of this export.
    ///
    /// Detail is resolved lazily first; a missing summary object propagates
    /// the store's not-found error unchanged.
    pub async fn manifest_summary(
        &self,
        client: &dyn JobControlClient,
        store: &dyn ObjectStore,
    ) -> Result<ManifestSummary> {
        let job = self.detailed(client).await?;
        let paths = Self::resolved_paths(&job)?;
        let key = paths.summary_manifest_key();
        debug!(bucket = paths.bucket(), key = %key, "fetching summary manifest");
        let bytes = store.get_object(paths.bucket(), &key).await?;
        ManifestSummary::from_slice(&bytes)
    }

    /// Fetch and parse the per-file manifest into data file references,
    /// freshly resolved on every call, in listed file order.
    pub async fn data_files(
        &self,
        client: &dyn JobControlClient,
        store: &dyn ObjectStore,
    ) -> Result<Vec<DataFileRef>> {
        let job = self.detailed(client).await?;
        let paths = Self::resolved_paths(&job)?;
        let format = job.export_format.ok_or_else(|| {
            TransferError::Service(anyhow::anyhow!(
                "export '{}' has no declared data format",
                job.arn
            ))
        })?;
        let key = paths.files_manifest_key();
        debug!(bucket = paths.bucket(), key = %key, "fetching per-file manifest");
        let bytes = store.get_object(paths.bucket(), &key).await?;
        parse_file_manifest(&bytes, paths.bucket(), format)
    }

    /// Lazily iterate every item of the export as a flat, single-pass
    /// sequence across all data files.
    pub async fn read_items<'a>(
        &self,
        client: &dyn JobControlClient,
        store: &'a dyn ObjectStore,
    ) -> Result<ItemReader<'a>> {
        let files = self.data_files(client, store).await?;
        Ok(ItemReader::new(store, files))
    }

    /// Probe whether the summary manifest has been written yet.
    pub async fn manifest_exists(
        &self,
        client: &dyn JobControlClient,
        store: &dyn ObjectStore,
    ) -> Result<bool> {
        let job = self.detailed(client).await?;
        let paths = Self::resolved_paths(&job)?;
        store
            .head_object(paths.bucket(), &paths.summary_manifest_key())
            .await
    }
}

impl PolledJob for ExportJob {
    fn handle(&self) -> &str {
        &self.arn
    }

    fn status_str(&self) -> &str {
        self.status.as_str()
    }

    fn is_successful(&self) -> bool {
        self.is_completed()
    }

    fn has_failed(&self) -> bool {
        self.is_failed()
    }

    fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }
}
