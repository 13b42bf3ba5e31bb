//! Tracking and data access for DynamoDB table export and import jobs
//!
//! This crate models long-running export and import jobs as snapshot records,
//! polls them to completion with a bounded [`waiter::Waiter`], resolves the
//! manifests an export leaves behind in S3, and streams the exported items
//! out of gzip JSON-Lines data files. For imports it prepares wire-tagged
//! data files the import service accepts.
//!
//! The service and the object store sit behind the [`client::JobControlClient`]
//! and [`client::ObjectStore`] traits; production code wires in the AWS-backed
//! implementations from [`aws`], tests substitute stubs.

pub mod addressing;
pub mod aws;
pub mod client;
pub mod codec;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod import;
pub mod manifest;
pub mod waiter;

pub use client::{JobControlClient, ObjectStore};
pub use error::{Result, TransferError};
pub use export::{ExportFormat, ExportJob, ExportStatus, ListOptions, SubmitExportArgs};
pub use import::{ImportFormat, ImportJob, ImportStatus, SubmitImportArgs};
pub use manifest::ManifestSummary;
pub use waiter::Waiter;
