use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;

/// How long a presigned upload URL stays valid.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Contract for the object-storage layer holding record media. Clients upload
/// images and videos directly to the bucket through presigned URLs; the API
/// server never proxies media bytes. The trait exists so handlers can be
/// tested against [`MockMediaStorage`] without network access.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Provisions the media bucket if missing. Used at startup in local
    /// development; a no-op against production storage.
    async fn ensure_bucket_exists(&self);

    /// Generates a time-limited URL allowing a single PUT of `content_type`
    /// data at `key`.
    async fn presign_media_upload(&self, key: &str, content_type: &str) -> Result<String, String>;
}

/// Shared handle to the storage layer.
pub type StorageState = Arc<dyn StorageService>;

/// S3-compatible client for record media. Path-style addressing is forced so
/// the same code talks to MinIO locally and a gateway-fronted bucket in
/// production.
#[derive(Clone)]
pub struct S3MediaStorage {
    client: s3::Client,
    bucket_name: String,
}

impl S3MediaStorage {
    pub async fn new(config: &AppConfig) -> Self {
        let credentials =
            s3::config::Credentials::new(&config.s3_key, &config.s3_secret, None, None, "static");

        let s3_config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(&config.s3_endpoint)
            .region(s3::config::Region::new(config.s3_region.clone()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(s3_config),
            bucket_name: config.s3_bucket.clone(),
        }
    }
}

#[async_trait]
impl StorageService for S3MediaStorage {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket is idempotent; safe to call on every startup.
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn presign_media_upload(&self, key: &str, content_type: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The signature pins the content type, so a signed image URL
            // cannot be reused to upload something else.
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// Strips directory-navigation segments from a user-influenced key.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Mock storage for tests: deterministic URLs, optional simulated failure.
#[derive(Clone)]
pub struct MockMediaStorage {
    pub should_fail: bool,
}

impl MockMediaStorage {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockMediaStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockMediaStorage {
    async fn ensure_bucket_exists(&self) {}

    async fn presign_media_upload(&self, key: &str, _content_type: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("mock storage failure requested".to_string());
        }

        Ok(format!(
            "http://localhost:9000/mock-media/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}
