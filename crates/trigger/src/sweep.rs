//! Reconciliation sweep over hourly partitions

use chrono::{DateTime, Utc};
use contracts::{recent_hour_prefixes, CandidateFile, ObjectRef};
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use tracing::{debug, instrument};

use crate::error::{Result, TriggerError};

/// List every object in the current partition and `lookback_hours` before it
///
/// Yields a candidate per object regardless of prior processing, sorted by key.
#[instrument(name = "trigger_sweep", skip(store, now), fields(bucket = %bucket))]
pub async fn sweep(
    store: &dyn ObjectStore,
    bucket: &str,
    now: DateTime<Utc>,
    lookback_hours: u32,
) -> Result<Vec<CandidateFile>> {
    let mut candidates = Vec::new();

    for prefix in recent_hour_prefixes(now, lookback_hours) {
        let location = Path::from(prefix.as_str());
        let objects: Vec<ObjectMeta> = store
            .list(Some(&location))
            .try_collect()
            .await
            .map_err(|source| TriggerError::List {
                bucket: bucket.to_string(),
                prefix: prefix.clone(),
                source,
            })?;

        debug!(prefix = %prefix, objects = objects.len(), "partition listed");
        candidates.extend(objects.into_iter().map(|meta| {
            CandidateFile::from_sweep(
                ObjectRef::new(bucket, meta.location.to_string()),
                meta.size,
                now,
            )
        }));
    }

    candidates.sort_by(|a, b| a.location.key.cmp(&b.location.key));
    Ok(candidates)
}
