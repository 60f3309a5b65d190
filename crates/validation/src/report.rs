//! Error report stored next to a rejected file (`<key>.errors.json`)

use contracts::{ObjectRef, ValidationError, ValidationStatus, ValidationOutcome};
use serde::Serialize;

/// Suffix appended to the rejected object's key
pub const ERROR_REPORT_SUFFIX: &str = ".errors.json";

/// Serialized form of one rejection
///
/// Contains only content-derived fields so re-validating the same file
/// produces byte-identical reports.
#[derive(Debug, Serialize)]
pub struct ErrorReport<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub status: ValidationStatus,
    pub byte_size: u64,
    pub rows_checked: u64,
    pub error_count: usize,
    pub errors: &'a [ValidationError],
}

impl<'a> ErrorReport<'a> {
    pub fn new(location: &'a ObjectRef, outcome: &'a ValidationOutcome) -> Self {
        Self {
            bucket: &location.bucket,
            key: &location.key,
            status: outcome.status(),
            byte_size: outcome.byte_size,
            rows_checked: outcome.rows_checked,
            error_count: outcome.errors().len(),
            errors: outcome.errors(),
        }
    }

    /// Pretty JSON bytes
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Key of the report stored alongside `key`
pub fn report_key(key: &str) -> String {
    format!("{key}{ERROR_REPORT_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Validator;

    #[test]
    fn test_report_is_deterministic() {
        let location = ObjectRef::new("falcon-project-bucket1", "2025/01/02/03/obs.csv");
        let data = b"station_id\nA\n";
        let validator = Validator::default();

        let first = validator.validate(data);
        let second = validator.validate(data);
        let a = ErrorReport::new(&location, &first).to_json().unwrap();
        let b = ErrorReport::new(&location, &second).to_json().unwrap();
        assert_eq!(a, b);

        let value: serde_json::Value = serde_json::from_slice(&a).unwrap();
        assert_eq!(value["status"], "rejected");
        assert_eq!(value["error_count"], 1);
        assert_eq!(value["errors"][0]["kind"], "structural");
        assert_eq!(value["errors"][0]["rule"], "header_mismatch");
    }

    #[test]
    fn test_report_key() {
        assert_eq!(report_key("a/b.csv"), "a/b.csv.errors.json");
    }
}
