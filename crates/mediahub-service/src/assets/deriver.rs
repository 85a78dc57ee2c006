//! Thumbnail and subtitle derivation.
//!
//! An artifact lives at a derived key in the same blob store as its
//! source. Existence of that key is proof of validity unless staleness
//! checks are enabled and the artifact is older than its source. Missing
//! or stale artifacts are rendered by the transcoder from a time-limited
//! read reference and written back.

use tracing::{debug, info, warn};

use mediahub_core::result::AppResult;
use mediahub_core::traits::storage::StorageObjectMeta;
use mediahub_core::traits::transcoder::{DerivedKind, TranscodeOutcome};
use mediahub_core::types::CanonicalPath;
use mediahub_entity::file::{AssetUpdate, File};

use crate::assets::keys::derived_key;
use crate::context::CatalogContext;

/// Result of asking for a derived artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// The artifact exists at this URL.
    Ready(String),
    /// The artifact could not be produced. Not an error.
    Unavailable(String),
    /// The source is not a video container.
    NotApplicable,
}

impl Derivation {
    /// The artifact URL, when ready.
    pub fn url(self) -> Option<String> {
        match self {
            Self::Ready(url) => Some(url),
            _ => None,
        }
    }

    /// Whether the artifact is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Produces thumbnails and subtitle tracks on demand.
#[derive(Debug, Clone)]
pub struct AssetDeriver {
    ctx: CatalogContext,
}

impl AssetDeriver {
    /// Creates a deriver over the given context.
    pub fn new(ctx: CatalogContext) -> Self {
        Self { ctx }
    }

    /// Ensure a thumbnail exists for the object at `key`.
    pub async fn ensure_thumbnail(&self, key: &CanonicalPath) -> AppResult<Derivation> {
        self.ensure(DerivedKind::Thumbnail, key).await
    }

    /// Ensure a subtitle track exists for the object at `key`.
    pub async fn ensure_subtitle(&self, key: &CanonicalPath) -> AppResult<Derivation> {
        self.ensure(DerivedKind::Subtitle, key).await
    }

    /// Ensure the `kind` artifact exists for the object at `key`.
    ///
    /// Blob store and transcoder failures yield
    /// [`Derivation::Unavailable`]; nothing is retried beyond a fresh read
    /// reference when the previous one expired mid-run.
    pub async fn ensure(&self, kind: DerivedKind, key: &CanonicalPath) -> AppResult<Derivation> {
        if !key.extension().is_some_and(|ext| self.ctx.is_video_extension(ext)) {
            return Ok(Derivation::NotApplicable);
        }

        let artifact_key = derived_key(kind, key);
        let artifact_url = self.ctx.public_url(&artifact_key);

        match self.is_cached(key, &artifact_key).await {
            Ok(true) => return Ok(Derivation::Ready(artifact_url)),
            Ok(false) => {}
            Err(e) => return Ok(unavailable(kind, key, e.to_string())),
        }

        let attempts = self.ctx.config.transcoder.max_attempts.max(1);
        for attempt in 1..=attempts {
            let handle = match self
                .ctx
                .storage
                .read_handle(key.as_str(), self.ctx.presign_ttl())
                .await
            {
                Ok(handle) => handle,
                Err(e) => return Ok(unavailable(kind, key, e.to_string())),
            };

            let outcome = match self.ctx.transcoder.render(&handle, kind).await {
                Ok(outcome) => outcome,
                Err(e) => return Ok(unavailable(kind, key, e.to_string())),
            };

            match outcome {
                TranscodeOutcome::Produced(bytes) => {
                    let size = bytes.len();
                    if let Err(e) = self
                        .ctx
                        .storage
                        .put(&artifact_key, bytes, kind.content_type())
                        .await
                    {
                        return Ok(unavailable(kind, key, e.to_string()));
                    }
                    info!(%kind, key = %key, artifact = %artifact_key, bytes = size, "Derived artifact stored");
                    return Ok(Derivation::Ready(artifact_url));
                }
                TranscodeOutcome::Unavailable(reason) => {
                    return Ok(unavailable(kind, key, reason));
                }
                TranscodeOutcome::Expired => {
                    debug!(%kind, key = %key, attempt, "Read reference expired during transcode");
                }
            }
        }

        Ok(unavailable(
            kind,
            key,
            format!("read reference expired on all {attempts} attempts"),
        ))
    }

    /// Derive whichever pointers `file` is missing, both kinds concurrently.
    ///
    /// The returned update carries only newly available URLs.
    pub async fn derive_missing(&self, file: &File) -> AppResult<AssetUpdate> {
        let key = CanonicalPath::object(&file.path)?;
        let thumbnail = async {
            if file.thumbnail_url.is_some() {
                return Ok(Derivation::NotApplicable);
            }
            self.ensure_thumbnail(&key).await
        };
        let subtitle = async {
            if file.subtitle_url.is_some() {
                return Ok(Derivation::NotApplicable);
            }
            self.ensure_subtitle(&key).await
        };
        let (thumbnail, subtitle) = tokio::join!(thumbnail, subtitle);

        Ok(AssetUpdate {
            thumbnail_url: thumbnail?.url(),
            subtitle_url: subtitle?.url(),
        })
    }

    async fn is_cached(&self, key: &CanonicalPath, artifact_key: &str) -> AppResult<bool> {
        let Some(artifact) = self.ctx.storage.head(artifact_key).await? else {
            return Ok(false);
        };
        if !self.ctx.config.transcoder.regenerate_stale {
            return Ok(true);
        }
        let source = self.ctx.storage.head(key.as_str()).await?;
        if is_stale(&artifact, source.as_ref()) {
            debug!(key = %key, artifact = %artifact_key, "Artifact older than source, regenerating");
            return Ok(false);
        }
        Ok(true)
    }
}

/// An artifact is stale only when both timestamps are known and the
/// artifact predates its source.
fn is_stale(artifact: &StorageObjectMeta, source: Option<&StorageObjectMeta>) -> bool {
    match (artifact.last_modified, source.and_then(|s| s.last_modified)) {
        (Some(artifact), Some(source)) => artifact < source,
        _ => false,
    }
}

fn unavailable(kind: DerivedKind, key: &CanonicalPath, reason: String) -> Derivation {
    warn!(%kind, key = %key, reason = %reason, "Derived artifact unavailable");
    Derivation::Unavailable(reason)
}
