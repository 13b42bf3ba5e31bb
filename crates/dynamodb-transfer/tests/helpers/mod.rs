//! Scripted stand-ins for the job-control service and the object store.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use dynamodb_transfer::client::{
    ExportListPage, ExportSummary, ImportListPage, ImportSummary, JobControlClient, ObjectStore,
    PutReceipt,
};
use dynamodb_transfer::error::{Result, TransferError};
use dynamodb_transfer::export::{ExportJob, SubmitExportArgs};
use dynamodb_transfer::import::{ImportJob, SubmitImportArgs};

/// Job-control stub. Listing pages through `export_summaries` /
/// `import_summaries`; describes pop scripted responses in order.
#[derive(Default)]
pub struct StubJobClient {
    pub export_summaries: Vec<ExportSummary>,
    pub import_summaries: Vec<ImportSummary>,
    pub export_describe_script: Mutex<VecDeque<Option<ExportJob>>>,
    pub import_describe_script: Mutex<VecDeque<Option<ImportJob>>>,
    pub list_calls: AtomicUsize,
    pub describe_calls: AtomicUsize,
}

impl StubJobClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_export_describes(responses: Vec<Option<ExportJob>>) -> Self {
        Self {
            export_describe_script: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn with_import_describes(responses: Vec<Option<ImportJob>>) -> Self {
        Self {
            import_describe_script: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }
}

fn page<T: Clone>(
    all: &[T],
    next_token: Option<String>,
    page_size: i32,
) -> (Vec<T>, Option<String>) {
    let offset: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let end = (offset + page_size as usize).min(all.len());
    let token = (end < all.len()).then(|| end.to_string());
    (all[offset..end].to_vec(), token)
}

#[async_trait]
impl JobControlClient for StubJobClient {
    async fn submit_export(&self, _args: SubmitExportArgs) -> Result<ExportJob> {
        panic!("submit_export not scripted for this test");
    }

    async fn describe_export(&self, arn: &str) -> Result<Option<ExportJob>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.export_describe_script.lock().unwrap();
        match script.pop_front() {
            Some(response) => Ok(response),
            None => panic!("unexpected describe_export call for {arn}"),
        }
    }

    async fn list_exports(
        &self,
        _table_arn: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> Result<ExportListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (exports, next_token) = page(&self.export_summaries, next_token, page_size);
        Ok(ExportListPage {
            exports,
            next_token,
        })
    }

    async fn submit_import(&self, _args: SubmitImportArgs) -> Result<ImportJob> {
        panic!("submit_import not scripted for this test");
    }

    async fn describe_import(&self, arn: &str) -> Result<Option<ImportJob>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.import_describe_script.lock().unwrap();
        match script.pop_front() {
            Some(response) => Ok(response),
            None => panic!("unexpected describe_import call for {arn}"),
        }
    }

    async fn list_imports(
        &self,
        _table_arn: &str,
        next_token: Option<String>,
        page_size: i32,
    ) -> Result<ImportListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (imports, next_token) = page(&self.import_summaries, next_token, page_size);
        Ok(ImportListPage {
            imports,
            next_token,
        })
    }
}

/// In-memory object store keyed by (bucket, key).
#[derive(Default)]
pub struct StubStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub get_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.get(bucket, key).ok_or_else(|| {
            TransferError::Service(anyhow::anyhow!("NoSuchKey: s3://{bucket}/{key}"))
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
        _content_encoding: &str,
    ) -> Result<PutReceipt> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.insert(bucket, key, body);
        Ok(PutReceipt {
            etag: Some("\"stub-etag\"".to_string()),
            version_id: None,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.get(bucket, key).is_some())
    }
}
