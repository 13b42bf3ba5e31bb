//! Import job records and import payload preparation
//!
//! Imports mirror exports for tracking, with a wider status machine
//! (`CANCELLING -> CANCELLED`). Payload preparation writes gzip JSON-Lines
//! files the service accepts as import input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::info;

use crate::addressing::parse_s3_uri;
use crate::client::{JobControlClient, ObjectStore, PutReceipt};
use crate::codec::encode_wire_tagged;
use crate::error::{Result, TransferError};
use crate::export::ListOptions;
use crate::waiter::{wait_for_job, PolledJob, Waiter};

/// Content type of wire-tagged import data files.
pub const IMPORT_CONTENT_TYPE: &str = "application/json";

/// Content encoding marker of import data files.
pub const IMPORT_CONTENT_ENCODING: &str = "gzip";

/// Import job status as reported by the service.
///
/// `Completed`, `Failed` and `Cancelled` are terminal and absorbing;
/// `Cancelling` is a transient state on the way to `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    InProgress,
    Completed,
    Cancelling,
    Cancelled,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::InProgress => "IN_PROGRESS",
            ImportStatus::Completed => "COMPLETED",
            ImportStatus::Cancelling => "CANCELLING",
            ImportStatus::Cancelled => "CANCELLED",
            ImportStatus::Failed => "FAILED",
        }
    }

    /// Whether the service guarantees no further transition from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ImportStatus::Completed | ImportStatus::Failed | ImportStatus::Cancelled
        )
    }
}

impl FromStr for ImportStatus {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IN_PROGRESS" => Ok(ImportStatus::InProgress),
            "COMPLETED" => Ok(ImportStatus::Completed),
            "CANCELLING" => Ok(ImportStatus::Cancelling),
            "CANCELLED" => Ok(ImportStatus::Cancelled),
            "FAILED" => Ok(ImportStatus::Failed),
            other => Err(TransferError::Service(anyhow::anyhow!(
                "unknown import status '{}'",
                other
            ))),
        }
    }
}

/// Input data format accepted by the import service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportFormat {
    DynamodbJson,
    Ion,
    Csv,
}

impl ImportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportFormat::DynamodbJson => "DYNAMODB_JSON",
            ImportFormat::Ion => "ION",
            ImportFormat::Csv => "CSV",
        }
    }
}

impl FromStr for ImportFormat {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DYNAMODB_JSON" => Ok(ImportFormat::DynamodbJson),
            "ION" => Ok(ImportFormat::Ion),
            "CSV" => Ok(ImportFormat::Csv),
            other => Err(TransferError::Service(anyhow::anyhow!(
                "unknown import format '{}'",
                other
            ))),
        }
    }
}

/// Compression of the import input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportCompression {
    #[default]
    Gzip,
    Zstd,
    None,
}

/// Attribute scalar type for table creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    S,
    N,
    B,
}

/// One attribute definition of the table to create.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub attr_type: ScalarType,
}

/// One key schema element of the table to create.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub name: String,
    pub is_range: bool,
}

/// Billing mode of the table to create.
#[derive(Debug, Clone, Copy)]
pub enum BillingSpec {
    PayPerRequest,
    Provisioned { read_units: i64, write_units: i64 },
}

/// Parameters of the table the import creates.
#[derive(Debug, Clone)]
pub struct TableCreationSpec {
    pub table_name: String,
    pub attributes: Vec<AttributeSpec>,
    pub key_schema: Vec<KeySpec>,
    pub billing: BillingSpec,
}

/// Arguments for submitting an import from an object-store location.
#[derive(Debug, Clone)]
pub struct SubmitImportArgs {
    pub s3_bucket: String,
    pub s3_prefix: Option<String>,
    pub s3_bucket_owner: Option<String>,
    pub input_format: ImportFormat,
    pub input_compression: ImportCompression,
    pub table_creation: TableCreationSpec,
    pub client_token: Option<String>,
}

/// Snapshot of one import job; thin (handle + status) or detailed.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportJob {
    /// Opaque job handle issued by the service.
    pub arn: String,
    pub status: ImportStatus,
    pub table_arn: Option<String>,
    pub table_id: Option<String>,
    pub s3_bucket_owner: Option<String>,
    pub s3_bucket: Option<String>,
    /// Always ends with `/` once set; normalized by [`ImportJob::normalized`].
    pub s3_prefix: Option<String>,
    pub error_count: Option<i64>,
    pub cloudwatch_log_group_arn: Option<String>,
    pub input_format: Option<ImportFormat>,
    pub input_compression: Option<ImportCompression>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub processed_size_bytes: Option<i64>,
    pub processed_item_count: Option<i64>,
    pub imported_item_count: Option<i64>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
}

impl ImportJob {
    /// Create a thin record carrying only identity and status.
    pub fn new(arn: impl Into<String>, status: ImportStatus) -> Self {
        Self {
            arn: arn.into(),
            status,
            table_arn: None,
            table_id: None,
            s3_bucket_owner: None,
            s3_bucket: None,
            s3_prefix: None,
            error_count: None,
            cloudwatch_log_group_arn: None,
            input_format: None,
            input_compression: None,
            start_time: None,
            end_time: None,
            processed_size_bytes: None,
            processed_item_count: None,
            imported_item_count: None,
            failure_code: None,
            failure_message: None,
        }
    }

    /// Apply construction invariants: the source prefix, once set, always
    /// carries a trailing separator. Idempotent.
    pub fn normalized(mut self) -> Self {
        if let Some(prefix) = self.s3_prefix.take() {
            self.s3_prefix = Some(crate::addressing::normalize_prefix(&prefix));
        }
        self
    }

    /// Submit a new import job and return its (detailed) record.
    pub async fn submit(client: &dyn JobControlClient, args: SubmitImportArgs) -> Result<Self> {
        let job = client.submit_import(args).await?;
        info!(arn = %job.arn, "submitted import job");
        Ok(job)
    }

    /// Fetch the current detailed state of an import job; `Ok(None)` for a
    /// handle unknown to the service.
    pub async fn describe(client: &dyn JobControlClient, arn: &str) -> Result<Option<Self>> {
        client.describe_import(arn).await
    }

    /// List import jobs for a table, following the continuation token until
    /// exhaustion or `max_results`; same contract as [`crate::export::ExportJob::list`].
    pub async fn list(
        client: &dyn JobControlClient,
        table_arn: &str,
        options: ListOptions,
    ) -> Result<Vec<Self>> {
        let mut jobs: Vec<Self> = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let page = client
                .list_imports(table_arn, next_token.take(), options.page_size)
                .await?;
            for summary in page.imports {
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

    /// Poll the job until it completes, fails, is cancelled, or the waiter
    /// times out. Cancellation in progress fails the wait immediately.
    pub async fn wait_until_complete(
        client: &dyn JobControlClient,
        arn: &str,
        waiter: &Waiter,
    ) -> Result<Self> {
        wait_for_job(waiter, arn, || Self::describe(client, arn)).await
    }

    /// Return a new, fully populated record for this handle; never mutates
    /// `self`.
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

    pub fn is_in_progress(&self) -> bool {
        self.status == ImportStatus::InProgress
    }

    pub fn is_completed(&self) -> bool {
        self.status == ImportStatus::Completed
    }

    pub fn is_cancelling(&self) -> bool {
        self.status == ImportStatus::Cancelling
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ImportStatus::Cancelled
    }

    pub fn is_failed(&self) -> bool {
        self.status == ImportStatus::Failed
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl PolledJob for ImportJob {
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
        matches!(
            self.status,
            ImportStatus::Failed | ImportStatus::Cancelling | ImportStatus::Cancelled
        )
    }

    fn failure_message(&self) -> Option<&str> {
        self.failure_message.as_deref()
    }
}

/// Write native records as a wire-tagged import data file at `s3uri`:
/// gzip-compressed JSON Lines, one `{"Item": <tagged>}` per record, written
/// with the content type and encoding markers the import service expects.
pub async fn write_wire_tagged(
    store: &dyn ObjectStore,
    s3uri: &str,
    records: &[Value],
) -> Result<PutReceipt> {
    let (bucket, key) = parse_s3_uri(s3uri)?;
    let body = encode_wire_tagged(records)?;
    info!(%s3uri, records = records.len(), bytes = body.len(), "writing import data file");
    store
        .put_object(
            &bucket,
            &key,
            body,
            IMPORT_CONTENT_TYPE,
            IMPORT_CONTENT_ENCODING,
        )
        .await
}

/// Write records in the native text serialization.
///
/// Unsupported by design: that serialization cannot render the trailing-marker
/// integer literals the import service requires, and silently emitting data
/// the service misreads is worse than refusing. Fails before any store call.
/// Write wire-tagged data instead.
pub async fn write_native(
    _store: &dyn ObjectStore,
    _s3uri: &str,
    _records: &[Value],
) -> Result<PutReceipt> {
    Err(TransferError::UnsupportedOperation(
        "the native text serialization cannot represent the integer literal \
         format the import service requires; write wire-tagged data instead",
    ))
}
