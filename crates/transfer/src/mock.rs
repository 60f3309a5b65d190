//! In-memory uploader
//!
//! Models each destination as a map of path to content with the same
//! replace-on-write semantics as the SFTP uploader. Failures can be
//! scripted per destination.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use contracts::{DestinationId, DestinationProfile, UploadError, UploadErrorKind, Uploader};

/// Remote state: (destination, path) to content
pub type RemoteFiles = BTreeMap<(DestinationId, String), Bytes>;

#[derive(Debug, Default)]
pub struct MemoryUploader {
    files: Mutex<RemoteFiles>,
    failures: Mutex<HashMap<DestinationId, VecDeque<UploadErrorKind>>>,
    calls: Mutex<HashMap<DestinationId, usize>>,
    delay: Duration,
}

impl MemoryUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every upload
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next `times` uploads to `destination` with `kind`
    pub fn fail_next(&self, destination: &str, kind: UploadErrorKind, times: usize) {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        failures
            .entry(DestinationId::from(destination))
            .or_default()
            .extend(std::iter::repeat(kind).take(times));
    }

    /// Upload calls made to `destination`
    pub fn calls(&self, destination: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(destination)
            .copied()
            .unwrap_or(0)
    }

    /// Content at `path` on `destination`
    pub fn file(&self, destination: &str, path: &str) -> Option<Bytes> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(DestinationId::from(destination), path.to_string()))
            .cloned()
    }

    /// Copy of every stored file
    pub fn snapshot(&self) -> RemoteFiles {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_failure(&self, destination: &DestinationId) -> Option<UploadErrorKind> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(destination)
            .and_then(VecDeque::pop_front)
    }
}

impl Uploader for MemoryUploader {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(
        &self,
        destination: &DestinationProfile,
        remote_path: &str,
        content: Bytes,
    ) -> Result<(), UploadError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(destination.id.clone())
            .or_default() += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(kind) = self.next_failure(&destination.id) {
            return Err(UploadError::new(kind, "injected failure"));
        }

        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((destination.id.clone(), remote_path.to_string()), content);
        Ok(())
    }
}
