use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

use crate::error::{AppError, BackendError};
use crate::models::{to_canonical, ExportResponse};

/// How long a download link stays valid.
pub const SIGNED_URL_TTL_SECS: u64 = 600;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

const FALLBACK_MESSAGE: &str = "File export operation failed";

/// Object storage for finished exports.
#[async_trait]
pub trait ExportStorage: Send + Sync {
    /// Write `content` under `key` as a CSV attachment.
    async fn put_csv(&self, key: &str, content: String) -> Result<(), AppError>;

    /// A read-only link to `key`, valid for `ttl` starting at `issued_at`.
    async fn presign_download(
        &self,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AppError>;
}

/// `todo-export-2025-01-15T10-30-00-000Z.csv` for an export started at
/// `2025-01-15T10:30:00.000Z`.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("todo-export-{}.csv", to_canonical(at).replace([':', '.'], "-"))
}

pub fn content_disposition(file_name: &str) -> String {
    format!("attachment; filename=\"{file_name}\"")
}

/// Uploads a CSV export and returns a signed link to it.
///
/// The link is signed from the same instant `expires_at` is computed from,
/// so the reported expiry matches the one embedded in the URL.
pub async fn upload_and_sign(
    storage: &dyn ExportStorage,
    content: String,
) -> Result<ExportResponse, AppError> {
    let issued_at = Utc::now();
    let file_name = export_file_name(issued_at);
    let ttl = Duration::from_secs(SIGNED_URL_TTL_SECS);

    storage.put_csv(&file_name, content).await?;
    let download_url = storage.presign_download(&file_name, issued_at, ttl).await?;

    let expires_at = issued_at + chrono::Duration::seconds(SIGNED_URL_TTL_SECS as i64);

    Ok(ExportResponse {
        download_url,
        file_name,
        expires_at: to_canonical(expires_at),
    })
}

/// Export storage backed by an S3 bucket.
#[derive(Clone)]
pub struct S3ExportStorage {
    client: Client,
    bucket: String,
}

impl S3ExportStorage {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn backend_error<E>(&self, operation: &str, err: &E) -> AppError
    where
        E: aws_sdk_s3::error::ProvideErrorMetadata + std::error::Error,
    {
        let normalized = BackendError::from_aws(err, FALLBACK_MESSAGE);
        tracing::error!(
            bucket = %self.bucket,
            operation,
            code = %normalized.code,
            "S3 error: {}",
            normalized.message
        );
        AppError::ObjectStore(normalized)
    }
}

#[async_trait]
impl ExportStorage for S3ExportStorage {
    async fn put_csv(&self, key: &str, content: String) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(content.into_bytes()))
            .content_type(CSV_CONTENT_TYPE)
            .content_disposition(content_disposition(key))
            .send()
            .await
            .map_err(|e| self.backend_error("put_object", &e))?;

        tracing::debug!(bucket = %self.bucket, key, "Uploaded export");
        Ok(())
    }

    async fn presign_download(
        &self,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let config = PresigningConfig::builder()
            .start_time(SystemTime::from(issued_at))
            .expires_in(ttl)
            .build()
            .map_err(|e| {
                AppError::ObjectStore(BackendError::new("PRESIGNING_CONFIG_ERROR", e.to_string()))
            })?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| self.backend_error("presign_get_object", &e))?;

        Ok(request.uri().to_string())
    }
}

/// An object held by [`MemoryExportStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content: String,
    pub content_type: String,
    pub content_disposition: String,
}

/// In-process export storage. Links use a `memory://` scheme.
#[derive(Clone, Default)]
pub struct MemoryExportStorage {
    bucket: String,
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl MemoryExportStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::default(),
        }
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        let objects = self.objects.lock().expect("export storage lock poisoned");
        objects.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("export storage lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExportStorage for MemoryExportStorage {
    async fn put_csv(&self, key: &str, content: String) -> Result<(), AppError> {
        let mut objects = self.objects.lock().expect("export storage lock poisoned");
        objects.insert(
            key.to_string(),
            StoredObject {
                content,
                content_type: CSV_CONTENT_TYPE.to_string(),
                content_disposition: content_disposition(key),
            },
        );
        Ok(())
    }

    async fn presign_download(
        &self,
        key: &str,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AppError> {
        if self.object(key).is_none() {
            return Err(AppError::ObjectStore(BackendError::new(
                "NoSuchKey",
                "The specified key does not exist.",
            )));
        }
        Ok(format!(
            "memory://{}/{}?issued={}&expires-in={}",
            self.bucket,
            key,
            issued_at.timestamp(),
            ttl.as_secs()
        ))
    }
}
