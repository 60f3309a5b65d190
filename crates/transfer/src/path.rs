//! Remote path construction

use chrono::{DateTime, Utc};
use contracts::{hour_prefix, partition_of_key, ObjectRef};

/// Path relative to a destination's remote root: `{partition}/{file_name}`
///
/// The partition comes from the key when it is time-partitioned, so the
/// same object always maps to the same remote path.
pub fn relative_path(location: &ObjectRef, discovered_at: DateTime<Utc>) -> String {
    let partition = partition_of_key(&location.key).unwrap_or_else(|| hour_prefix(discovered_at));
    format!("{partition}/{}", location.file_name())
}

/// Join a destination root and a relative path
pub fn join_remote(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    format!("{root}/{relative}")
}
