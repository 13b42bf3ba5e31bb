//! AWS-backed implementations of the service traits
//!
//! [`DynamoDbJobClient`] adapts the table service SDK to [`JobControlClient`];
//! [`S3ObjectStore`] adapts the S3 SDK to [`ObjectStore`]. All mapping between
//! SDK shapes and this crate's records happens here; nothing outside this
//! module touches SDK types.

use async_trait::async_trait;
use aws_sdk_dynamodb::types as ddb;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::client::{
    ExportListPage, ExportSummary, ImportListPage, ImportSummary, JobControlClient, ObjectStore,
    PutReceipt,
};
use crate::error::{Result, TransferError};
use crate::export::{ExportFormat, ExportJob, SubmitExportArgs};
use crate::import::{
    BillingSpec, ImportCompression, ImportFormat, ImportJob, ScalarType, SubmitImportArgs,
};

/// Job-control client backed by the DynamoDB SDK.
#[derive(Clone)]
pub struct DynamoDbJobClient {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbJobClient {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

/// Object store backed by the S3 SDK.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

fn timestamp(dt: &aws_sdk_dynamodb::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn export_from_description(desc: &ddb::ExportDescription) -> Result<ExportJob> {
    let arn = desc.export_arn().ok_or_else(|| {
        TransferError::Service(anyhow::anyhow!("export description carries no handle"))
    })?;
    let status = desc
        .export_status()
        .map(|s| s.as_str())
        .unwrap_or("IN_PROGRESS")
        .parse()?;

    let mut job = ExportJob::new(arn, status);
    job.start_time = desc.start_time().and_then(timestamp);
    job.end_time = desc.end_time().and_then(timestamp);
    job.export_time = desc.export_time().and_then(timestamp);
    job.table_arn = desc.table_arn().map(str::to_string);
    job.table_id = desc.table_id().map(str::to_string);
    job.s3_bucket = desc.s3_bucket().map(str::to_string);
    job.s3_prefix = desc.s3_prefix().map(str::to_string);
    job.item_count = desc.item_count();
    job.billed_size_bytes = desc.billed_size_bytes();
    job.export_format = match desc.export_format() {
        Some(f) => Some(f.as_str().parse()?),
        None => None,
    };
    job.failure_code = desc.failure_code().map(str::to_string);
    job.failure_message = desc.failure_message().map(str::to_string);
    job.export_manifest = desc.export_manifest().map(str::to_string);
    Ok(job.normalized())
}

fn import_from_description(desc: &ddb::ImportTableDescription) -> Result<ImportJob> {
    let arn = desc.import_arn().ok_or_else(|| {
        TransferError::Service(anyhow::anyhow!("import description carries no handle"))
    })?;
    let status = desc
        .import_status()
        .map(|s| s.as_str())
        .unwrap_or("IN_PROGRESS")
        .parse()?;

    let mut job = ImportJob::new(arn, status);
    job.table_arn = desc.table_arn().map(str::to_string);
    job.table_id = desc.table_id().map(str::to_string);
    if let Some(source) = desc.s3_bucket_source() {
        job.s3_bucket_owner = source.s3_bucket_owner().map(str::to_string);
        job.s3_bucket = Some(source.s3_bucket().to_string());
        job.s3_prefix = source.s3_key_prefix().map(str::to_string);
    }
    job.error_count = Some(desc.error_count());
    job.cloudwatch_log_group_arn = desc.cloud_watch_log_group_arn().map(str::to_string);
    job.input_format = match desc.input_format() {
        Some(ddb::InputFormat::DynamodbJson) => Some(ImportFormat::DynamodbJson),
        Some(ddb::InputFormat::Ion) => Some(ImportFormat::Ion),
        Some(ddb::InputFormat::Csv) => Some(ImportFormat::Csv),
        _ => None,
    };
    job.input_compression = match desc.input_compression_type() {
        Some(ddb::InputCompressionType::Gzip) => Some(ImportCompression::Gzip),
        Some(ddb::InputCompressionType::Zstd) => Some(ImportCompression::Zstd),
        Some(ddb::InputCompressionType::None) => Some(ImportCompression::None),
        _ => None,
    };
    job.start_time = desc.start_time().and_then(timestamp);
    job.end_time = desc.end_time().and_then(timestamp);
    job.processed_size_bytes = desc.processed_size_bytes();
    job.processed_item_count = Some(desc.processed_item_count());
    job.imported_item_count = Some(desc.imported_item_count());
    job.failure_code = desc.failure_code().map(str::to_string);
    job.failure_message = desc.failure_message().map(str::to_string);
    Ok(job.normalized())
}

fn export_format_to_sdk(format: ExportFormat) -> ddb::ExportFormat {
    match format {
        ExportFormat::DynamodbJson => ddb::ExportFormat::DynamodbJson,
        ExportFormat::Ion => ddb::ExportFormat::Ion,
    }
}

fn table_creation_to_sdk(
    spec: &crate::import::TableCreationSpec,
) -> Result<ddb::TableCreationParameters> {
    let mut builder = ddb::TableCreationParameters::builder().table_name(&spec.table_name);

    for attr in &spec.attributes {
        let attr_type = match attr.attr_type {
            ScalarType::S => ddb::ScalarAttributeType::S,
            ScalarType::N => ddb::ScalarAttributeType::N,
            ScalarType::B => ddb::ScalarAttributeType::B,
        };
        builder = builder.attribute_definitions(
            ddb::AttributeDefinition::builder()
                .attribute_name(&attr.name)
                .attribute_type(attr_type)
                .build()
                .map_err(TransferError::service)?,
        );
    }

    for key in &spec.key_schema {
        let key_type = if key.is_range {
            ddb::KeyType::Range
        } else {
            ddb::KeyType::Hash
        };
        builder = builder.key_schema(
            ddb::KeySchemaElement::builder()
                .attribute_name(&key.name)
                .key_type(key_type)
                .build()
                .map_err(TransferError::service)?,
        );
    }

    builder = match spec.billing {
        BillingSpec::PayPerRequest => builder.billing_mode(ddb::BillingMode::PayPerRequest),
        BillingSpec::Provisioned {
            read_units,
            write_units,
        } => builder
            .billing_mode(ddb::BillingMode::Provisioned)
            .provisioned_throughput(
                ddb::ProvisionedThroughput::builder()
                    .read_capacity_units(read_units)
                    .write_capacity_units(write_units)
                    .build()
                    .map_err(TransferError::service)?,
            ),
    };

    builder.build().map_err(TransferError::service)
}

#[async_trait]
impl JobControlClient for DynamoDbJobClient {
    async fn submit_export(&self, args: SubmitExportArgs) -> Result<ExportJob> {
        let mut request = self
            .client
            .export_table_to_point_in_time()
            .table_arn(&args.table_arn)
            .s3_bucket(&args.s3_bucket)
            .export_format(export_format_to_sdk(args.export_format));

        if let Some(prefix) = &args.s3_prefix {
            request = request.s3_prefix(prefix);
        }
        if let Some(export_time) = args.export_time {
            request = request.export_time(aws_sdk_dynamodb::primitives::DateTime::from_millis(
                export_time.timestamp_millis(),
            ));
        }
        if let Some(owner) = &args.s3_bucket_owner {
            request = request.s3_bucket_owner(owner);
        }
        if let Some(algorithm) = &args.s3_sse_algorithm {
            request = request.s3_sse_algorithm(ddb::S3SseAlgorithm::from(algorithm.as_str()));
        }
        if let Some(key_id) = &args.s3_sse_kms_key_id {
            request = request.s3_sse_kms_key_id(key_id);
        }
        if let Some(token) = &args.client_token {
            request = request.client_token(token);
        }

        info!(table_arn = %args.table_arn, bucket = %args.s3_bucket, "submitting export");
        let output = request.send().await.map_err(TransferError::service)?;
        let desc = output.export_description().ok_or_else(|| {
            TransferError::Service(anyhow::anyhow!("export submission returned no description"))
        })?;
        export_from_description(desc)
    }

    async fn describe_export(&self, arn: &str) -> Result<Option<ExportJob>> {
        debug!(%arn, "describing export");
        match self.client.describe_export().export_arn(arn).send().await {
            Ok(output) => {
                let desc = output.export_description().ok_or_else(|| {
                    TransferError::Service(anyhow::anyhow!(
                        "describe export returned no description"
                    ))
                })?;
                Ok(Some(export_from_description(desc)?))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_export_not_found_exception() {
                    return Ok(None);
                }
                Err(TransferError::service(service_err))
            }
        }
    }

    async fn list_exports(
        &self,
        table_arn: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> Result<ExportListPage> {
        let mut request = self
            .client
            .list_exports()
            .table_arn(table_arn)
            .max_results(page_size);
        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let output = request.send().await.map_err(TransferError::service)?;
        let mut exports = Vec::new();
        for summary in output.export_summaries() {
            let arn = summary.export_arn().ok_or_else(|| {
                TransferError::Service(anyhow::anyhow!("export list entry carries no handle"))
            })?;
            let status = summary
                .export_status()
                .map(|s| s.as_str())
                .unwrap_or("IN_PROGRESS")
                .parse()?;
            exports.push(ExportSummary {
                arn: arn.to_string(),
                status,
            });
        }
        Ok(ExportListPage {
            exports,
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn submit_import(&self, args: SubmitImportArgs) -> Result<ImportJob> {
        let mut source = ddb::S3BucketSource::builder().s3_bucket(&args.s3_bucket);
        if let Some(prefix) = &args.s3_prefix {
            source = source.s3_key_prefix(prefix);
        }
        if let Some(owner) = &args.s3_bucket_owner {
            source = source.s3_bucket_owner(owner);
        }

        let input_format = match args.input_format {
            ImportFormat::DynamodbJson => ddb::InputFormat::DynamodbJson,
            ImportFormat::Ion => ddb::InputFormat::Ion,
            ImportFormat::Csv => ddb::InputFormat::Csv,
        };
        let input_compression = match args.input_compression {
            ImportCompression::Gzip => ddb::InputCompressionType::Gzip,
            ImportCompression::Zstd => ddb::InputCompressionType::Zstd,
            ImportCompression::None => ddb::InputCompressionType::None,
        };

        let mut request = self
            .client
            .import_table()
            .s3_bucket_source(source.build().map_err(TransferError::service)?)
            .input_format(input_format)
            .input_compression_type(input_compression)
            .table_creation_parameters(table_creation_to_sdk(&args.table_creation)?);

        if let Some(token) = &args.client_token {
            request = request.client_token(token);
        }

        info!(
            bucket = %args.s3_bucket,
            table = %args.table_creation.table_name,
            "submitting import"
        );
        let output = request.send().await.map_err(TransferError::service)?;
        let desc = output.import_table_description().ok_or_else(|| {
            TransferError::Service(anyhow::anyhow!("import submission returned no description"))
        })?;
        import_from_description(desc)
    }

    async fn describe_import(&self, arn: &str) -> Result<Option<ImportJob>> {
        debug!(%arn, "describing import");
        match self.client.describe_import().import_arn(arn).send().await {
            Ok(output) => {
                let desc = output.import_table_description().ok_or_else(|| {
                    TransferError::Service(anyhow::anyhow!(
                        "describe import returned no description"
                    ))
                })?;
                Ok(Some(import_from_description(desc)?))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_import_not_found_exception() {
                    return Ok(None);
                }
                Err(TransferError::service(service_err))
            }
        }
    }

    async fn list_imports(
        &self,
        table_arn: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> Result<ImportListPage> {
        let mut request = self
            .client
            .list_imports()
            .table_arn(table_arn)
            .page_size(page_size);
        if let Some(token) = next_token {
            request = request.next_token(token);
        }

        let output = request.send().await.map_err(TransferError::service)?;
        let mut imports = Vec::new();
        for summary in output.import_summary_list() {
            let arn = summary.import_arn().ok_or_else(|| {
                TransferError::Service(anyhow::anyhow!("import list entry carries no handle"))
            })?;
            let status = summary
                .import_status()
                .map(|s| s.as_str())
                .unwrap_or("IN_PROGRESS")
                .parse()?;
            imports.push(ImportSummary {
                arn: arn.to_string(),
                status,
            });
        }
        Ok(ImportListPage {
            imports,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        debug!("Downloading s3://{}/{}", bucket, key);
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(TransferError::service)?;
        let data = response
            .body
            .collect()
            .await
            .map_err(TransferError::service)?
            .into_bytes()
            .to_vec();
        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), bucket, key);
        Ok(data)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        content_encoding: &str,
    ) -> Result<PutReceipt> {
        debug!("Uploading {} bytes to s3://{}/{}", body.len(), bucket, key);
        let response = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .content_type(content_type)
            .content_encoding(content_encoding)
            .send()
            .await
            .map_err(TransferError::service)?;
        info!("Uploaded s3://{}/{}", bucket, key);
        Ok(PutReceipt {
            etag: response.e_tag().map(str::to_string),
            version_id: response.version_id().map(str::to_string),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    return Ok(false);
                }
                Err(TransferError::service(service_err))
            }
        }
    }
}
