//! S3-compatible object storage provider.
//!
//! Works against AWS S3 and self-hosted stores (MinIO, R2) through a
//! custom endpoint with path-style addressing.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Builder, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use mediahub_core::config::S3StorageConfig;
use mediahub_core::error::{AppError, ErrorKind};
use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::{
    ByteStream, ObjectStream, ReadHandle, StorageObjectMeta, StorageProvider,
};

/// S3-compatible storage provider.
#[derive(Debug, Clone)]
pub struct S3StorageProvider {
    client: Client,
    bucket: String,
    page_size: i32,
}

impl S3StorageProvider {
    /// Build a client from configuration.
    ///
    /// Static credentials are used when both keys are set; otherwise the
    /// default AWS credential chain applies.
    pub async fn new(config: &S3StorageConfig, page_size: i32) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("S3 bucket name is required"));
        }

        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = Builder::from(&shared).region(Region::new(config.region.clone()));
        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(&config.endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        if !config.access_key.is_empty() && !config.secret_key.is_empty() {
            builder = builder.credentials_provider(Credentials::new(
                &config.access_key,
                &config.secret_key,
                None,
                None,
                "mediahub-config",
            ));
        }

        info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint,
            region = %config.region,
            "Initialized S3 storage provider"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            page_size: page_size.max(1),
        })
    }

    /// Bucket this provider operates on.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn s3_error(message: impl Into<String>, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::Storage, message, e)
}

/// URL-encode a key for `x-amz-copy-source`, keeping separators.
fn encode_copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{bucket}/{}", encoded.join("/"))
}

struct ListState {
    token: Option<String>,
    started: bool,
}

#[async_trait]
impl StorageProvider for S3StorageProvider {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map(|_| true)
            .map_err(|e| s3_error(format!("Bucket '{}' is not reachable", self.bucket), e))
    }

    fn list_objects(&self) -> ObjectStream {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let page_size = self.page_size;
        let initial = ListState {
            token: None,
            started: false,
        };

        let pages = stream::try_unfold(initial, move |state| {
            let client = client.clone();
            let bucket = bucket.clone();
            async move {
                if state.started && state.token.is_none() {
                    return Ok::<_, AppError>(None);
                }
                let resp = client
                    .list_objects_v2()
                    .bucket(&bucket)
                    .max_keys(page_size)
                    .set_continuation_token(state.token)
                    .send()
                    .await
                    .map_err(|e| s3_error(format!("Listing bucket '{bucket}' failed"), e))?;

                let objects: Vec<AppResult<StorageObjectMeta>> = resp
                    .contents()
                    .iter()
                    .filter_map(|obj| {
                        let key = obj.key()?.to_string();
                        Some(Ok(StorageObjectMeta {
                            key,
                            size_bytes: obj.size().unwrap_or(0).max(0) as u64,
                            last_modified: obj.last_modified().and_then(to_chrono),
                            content_type: None,
                        }))
                    })
                    .collect();
                debug!(bucket = %bucket, objects = objects.len(), "Fetched listing page");

                let next = ListState {
                    token: resp.next_continuation_token().map(str::to_string),
                    started: true,
                };
                Ok(Some((stream::iter(objects), next)))
            }
        });

        Box::pin(pages.try_flatten())
    }

    async fn read_handle(&self, key: &str, ttl: Duration) -> AppResult<ReadHandle> {
        let presigning = PresigningConfig::expires_in(ttl)
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, "Invalid presign TTL", e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| s3_error(format!("Failed to presign '{key}'"), e))?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(0));
        Ok(ReadHandle::Url {
            url: request.uri().to_string(),
            expires_at,
        })
    }

    async fn read(&self, key: &str) -> AppResult<ByteStream> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    s3_error(format!("Failed to read '{key}'"), service)
                }
            })?;

        let reader = resp.body.into_async_read();
        Ok(Box::pin(ReaderStream::new(reader).map(|chunk| chunk.map(Bytes::from))))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> AppResult<()> {
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(S3ByteStream::from(data))
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to write '{key}'"), e))?;
        debug!(key, bytes = len, "Wrote object");
        Ok(())
    }

    async fn head(&self, key: &str) -> AppResult<Option<StorageObjectMeta>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(resp) => Ok(Some(StorageObjectMeta {
                key: key.to_string(),
                size_bytes: resp.content_length().unwrap_or(0).max(0) as u64,
                last_modified: resp.last_modified().and_then(to_chrono),
                content_type: resp.content_type().map(str::to_string),
            })),
            Err(e) => {
                let service = e.into_service_error();
                if service.is_not_found() {
                    Ok(None)
                } else {
                    Err(s3_error(format!("Failed to stat '{key}'"), service))
                }
            }
        }
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(encode_copy_source(&self.bucket, from))
            .key(to)
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to copy '{from}' to '{to}'"), e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| s3_error(format!("Failed to delete '{key}'"), e))?;
        Ok(())
    }
}
