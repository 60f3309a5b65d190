//! ValidationOutcome - Validation Engine output

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Binary outcome of schema/range validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Accepted,
    Rejected,
}

/// File-level failures that stop row processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralRule {
    /// No header, or a header with no data rows
    EmptyFile,
    /// Header does not list the required columns in the required order
    HeaderMismatch,
    /// Bytes could not be decoded as CSV text
    Unparseable,
}

/// Row-level rule that a single field (or the row shape) violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRule {
    ColumnCount,
    MissingValue,
    NotNumeric,
    OutOfRange,
}

impl fmt::Display for RowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ColumnCount => "column_count",
            Self::MissingValue => "missing_value",
            Self::NotNumeric => "not_numeric",
            Self::OutOfRange => "out_of_range",
        };
        f.write_str(name)
    }
}

/// One violated rule inside a data row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Column name; `None` for row-shape violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub rule: RowRule,
    /// Offending value as it appeared in the file (trimmed)
    pub value: String,
    /// Human-readable constraint, e.g. `[-90, 90]`
    pub expected: String,
}

/// Structured validation error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// Malformed file; no row-level detail possible
    Structural {
        rule: StructuralRule,
        message: String,
    },
    /// Every violation found in one data row
    Row {
        /// 1-based line number in the file (header is line 1)
        line: u64,
        violations: Vec<FieldViolation>,
    },
}

impl ValidationError {
    pub fn structural(rule: StructuralRule, message: impl Into<String>) -> Self {
        Self::Structural {
            rule,
            message: message.into(),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }
}

/// Result of running the Validation Engine on one file
///
/// Invariant: `Rejected` carries at least one error, `Accepted` carries none.
/// The constructor derives the status from the error list so the invariant
/// cannot be broken from outside. Deserialization goes through the same
/// constructor and refuses a status that contradicts the errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValidationOutcome")]
pub struct ValidationOutcome {
    status: ValidationStatus,
    errors: Vec<ValidationError>,
    /// Size of the validated payload
    pub byte_size: u64,
    /// Data rows examined (blank lines excluded)
    pub rows_checked: u64,
    /// Wall time spent validating; not part of the serialized report
    #[serde(skip)]
    pub elapsed: Duration,
}

#[derive(Deserialize)]
struct RawValidationOutcome {
    status: ValidationStatus,
    errors: Vec<ValidationError>,
    byte_size: u64,
    rows_checked: u64,
}

impl TryFrom<RawValidationOutcome> for ValidationOutcome {
    type Error = String;

    fn try_from(raw: RawValidationOutcome) -> Result<Self, Self::Error> {
        let outcome = Self::new(raw.errors, raw.byte_size, raw.rows_checked);
        if outcome.status != raw.status {
            return Err(format!(
                "status {:?} contradicts {} validation error(s)",
                raw.status,
                outcome.errors.len()
            ));
        }
        Ok(outcome)
    }
}

impl ValidationOutcome {
    pub fn new(errors: Vec<ValidationError>, byte_size: u64, rows_checked: u64) -> Self {
        let status = if errors.is_empty() {
            ValidationStatus::Accepted
        } else {
            ValidationStatus::Rejected
        };
        Self {
            status,
            errors,
            byte_size,
            rows_checked,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ValidationStatus::Accepted
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn structural_error_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_structural()).count()
    }

    pub fn row_error_count(&self) -> usize {
        self.errors.len() - self.structural_error_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derived_from_errors() {
        let ok = ValidationOutcome::new(Vec::new(), 10, 1);
        assert!(ok.is_accepted());

        let bad = ValidationOutcome::new(
            vec![ValidationError::structural(StructuralRule::EmptyFile, "no rows")],
            0,
            0,
        );
        assert_eq!(bad.status(), ValidationStatus::Rejected);
        assert_eq!(bad.structural_error_count(), 1);
        assert_eq!(bad.row_error_count(), 0);
    }

    #[test]
    fn test_deserialize_enforces_status() {
        let rejected = ValidationOutcome::new(
            vec![ValidationError::structural(StructuralRule::EmptyFile, "no rows")],
            0,
            0,
        );
        let json = serde_json::to_value(&rejected).unwrap();
        let back: ValidationOutcome = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, rejected);

        let mut forged = json.clone();
        forged["status"] = serde_json::to_value(ValidationStatus::Accepted).unwrap();
        assert!(serde_json::from_value::<ValidationOutcome>(forged).is_err());

        let mut emptied = json;
        emptied["errors"] = serde_json::json!([]);
        assert!(serde_json::from_value::<ValidationOutcome>(emptied).is_err());
    }

    #[test]
    fn test_elapsed_not_serialized() {
        let outcome = ValidationOutcome::new(Vec::new(), 10, 1)
            .with_elapsed(Duration::from_millis(25));
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("elapsed"), "got: {json}");
        assert!(json.contains("\"status\":\"accepted\""));
    }
}
