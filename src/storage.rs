use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// How long a presigned document link stays valid.
pub const DOCUMENT_LINK_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid presigning configuration: {0}")]
    Presigning(String),
    #[error("storage request failed: {0}")]
    Request(String),
}

// 1. DocumentStorage Contract
/// DocumentStorage
///
/// Abstract access to the object store holding problem statements. Handlers only ever
/// hand out time-limited links; document bytes never pass through this service.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Ensures the configured bucket exists. Only called for `Env::Local` (MinIO).
    async fn ensure_bucket_exists(&self);

    /// Generates a presigned GET URL for `key`, valid for `expires_in`.
    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}

/// Object key of the statement document for a problem short name.
pub fn document_key(sname: &str) -> String {
    format!("docs/{}.pdf", sanitize_key(sname))
}

// 2. The Real Implementation (S3/MinIO)
/// S3DocumentStorage
///
/// The concrete implementation using the AWS SDK for S3. `force_path_style(true)` keeps
/// it compatible with MinIO in local development.
#[derive(Clone)]
pub struct S3DocumentStorage {
    client: s3::Client,
    bucket_name: String,
}

impl S3DocumentStorage {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl DocumentStorage for S3DocumentStorage {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-existing buckets also land here.
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket did not succeed");
        }
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Presigning(e.to_string()))?;

        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments from a key
/// so a stored short name can never point outside the documents prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockDocumentStorage
///
/// Returns deterministic local-style URLs without any network access.
#[derive(Clone, Default)]
pub struct MockDocumentStorage {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockDocumentStorage {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl DocumentStorage for MockDocumentStorage {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Request(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?expires={}&signature=fake",
            sanitize_key(key),
            expires_in.as_secs()
        ))
    }
}

/// StorageState
///
/// The concrete type used to share document storage across the application state.
pub type StorageState = Arc<dyn DocumentStorage>;
