//! Object store construction from configured URLs

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{FileDisposition, ObjectRef, StoreConfig};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore, PutPayload};
use tracing::info;
use url::Url;

use crate::error::{PipelineError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Open the store addressed by `config.url`
///
/// - `s3://bucket`: credentials and region from the standard AWS environment
/// - `file:///path`: local directory (created if missing)
/// - `memory://`: process-local, empty
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    let url = Url::parse(&config.url).map_err(|e| PipelineError::store_url(&config.url, e.to_string()))?;
    let open_err = |source| PipelineError::StoreOpen {
        url: config.url.clone(),
        source,
    };

    let store: Arc<dyn ObjectStore> = match url.scheme() {
        "memory" => Arc::new(InMemory::new()),
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| PipelineError::store_url(&config.url, "not a local path"))?;
            std::fs::create_dir_all(&path)
                .map_err(|e| PipelineError::store_url(&config.url, e.to_string()))?;
            Arc::new(LocalFileSystem::new_with_prefix(&path).map_err(open_err)?)
        }
        "s3" => {
            let bucket = url
                .host_str()
                .ok_or_else(|| PipelineError::store_url(&config.url, "missing bucket"))?;
            let client_options = ClientOptions::new().with_timeout(REQUEST_TIMEOUT);
            Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_client_options(client_options)
                    .build()
                    .map_err(open_err)?,
            )
        }
        other => {
            return Err(PipelineError::store_url(
                &config.url,
                format!("unsupported scheme '{other}'"),
            ))
        }
    };

    info!(url = %config.url, bucket = %config.bucket, "store opened");
    Ok(store)
}

/// Per-file outcome for a candidate whose object is gone
pub(crate) fn not_found(location: &ObjectRef) -> FileDisposition {
    FileDisposition::Failed {
        reason: format!("object '{}' not found", location.key),
    }
}

/// Read a whole object; `None` when it does not exist
///
/// Any other failure means the store itself is unusable.
pub(crate) async fn fetch(
    store: &dyn ObjectStore,
    role: &'static str,
    path: &Path,
) -> Result<Option<Bytes>> {
    let unavailable = |source| PipelineError::store_unavailable(role, path, source);
    let result = match store.get(path).await {
        Ok(result) => result,
        Err(object_store::Error::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(unavailable(e)),
    };
    result.bytes().await.map(Some).map_err(unavailable)
}

pub(crate) async fn put(
    store: &dyn ObjectStore,
    role: &'static str,
    path: &Path,
    content: Bytes,
) -> Result<()> {
    store
        .put(path, PutPayload::from(content))
        .await
        .map(|_| ())
        .map_err(|e| PipelineError::store_unavailable(role, path, e))
}
