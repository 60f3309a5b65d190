//! Validation Engine
//!
//! Pure function from CSV bytes to `ValidationOutcome`:
//! 1. header must list the schema columns exactly, in order
//! 2. every data row is checked independently; one error per offending row
//! 3. zero errors means accepted

use std::time::Instant;

use contracts::{
    ColumnSpec, FieldViolation, RowRule, SchemaConfig, StructuralRule, ValidationError,
    ValidationOutcome,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Schema-bound CSV validator
#[derive(Debug, Clone)]
pub struct Validator {
    schema: SchemaConfig,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(SchemaConfig::default())
    }
}

impl Validator {
    pub fn new(schema: SchemaConfig) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &SchemaConfig {
        &self.schema
    }

    /// Validate one payload
    ///
    /// Never fails: malformed input becomes a structural error.
    pub fn validate(&self, raw: &[u8]) -> ValidationOutcome {
        let start = Instant::now();
        let (errors, rows_checked) = self.check(raw);
        let outcome = ValidationOutcome::new(errors, raw.len() as u64, rows_checked)
            .with_elapsed(start.elapsed());

        debug!(
            bytes = outcome.byte_size,
            rows = outcome.rows_checked,
            errors = outcome.errors().len(),
            status = ?outcome.status(),
            "validation finished"
        );
        outcome
    }

    fn check(&self, raw: &[u8]) -> (Vec<ValidationError>, u64) {
        let body = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
        if body.iter().all(u8::is_ascii_whitespace) {
            return (
                vec![ValidationError::structural(
                    StructuralRule::EmptyFile,
                    "file is empty",
                )],
                0,
            );
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(body);
        let mut records = reader.records().filter(|r| match r {
            Ok(record) => !is_blank(record),
            Err(_) => true,
        });

        let header = match records.next() {
            Some(Ok(header)) => header,
            Some(Err(e)) => {
                return (
                    vec![ValidationError::structural(
                        StructuralRule::Unparseable,
                        format!("header is not readable CSV: {e}"),
                    )],
                    0,
                )
            }
            None => {
                return (
                    vec![ValidationError::structural(
                        StructuralRule::EmptyFile,
                        "file has no header row",
                    )],
                    0,
                )
            }
        };

        if let Some(message) = self.header_mismatch(&header) {
            return (
                vec![ValidationError::structural(
                    StructuralRule::HeaderMismatch,
                    message,
                )],
                0,
            );
        }

        let mut errors = Vec::new();
        let mut rows_checked = 0u64;
        for result in records {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    // Keep what was collected so far
                    errors.push(ValidationError::structural(
                        StructuralRule::Unparseable,
                        format!("data is not readable CSV: {e}"),
                    ));
                    break;
                }
            };

            rows_checked += 1;
            let violations = self.check_row(&record);
            if !violations.is_empty() {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                errors.push(ValidationError::Row { line, violations });
            }
        }

        if rows_checked == 0 && errors.is_empty() {
            errors.push(ValidationError::structural(
                StructuralRule::EmptyFile,
                "header present but no data rows",
            ));
        }

        (errors, rows_checked)
    }

    /// Describe how the header differs from the schema, or `None` if it matches
    fn header_mismatch(&self, header: &StringRecord) -> Option<String> {
        let expected: Vec<&str> = self.schema.column_names().collect();
        let actual: Vec<&str> = header.iter().collect();
        if actual == expected {
            return None;
        }

        let missing: Vec<&str> = expected
            .iter()
            .filter(|name| !actual.contains(*name))
            .copied()
            .collect();
        let unexpected: Vec<&str> = actual
            .iter()
            .filter(|name| !expected.contains(*name))
            .copied()
            .collect();

        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing columns [{}]", missing.join(", ")));
        }
        if !unexpected.is_empty() {
            parts.push(format!("unexpected columns [{}]", unexpected.join(", ")));
        }
        if parts.is_empty() {
            parts.push("columns misordered or duplicated".to_string());
        }

        Some(format!(
            "header mismatch: {}; expected [{}]",
            parts.join("; "),
            expected.join(", ")
        ))
    }

    fn check_row(&self, record: &StringRecord) -> Vec<FieldViolation> {
        let columns = &self.schema.columns;
        if record.len() != columns.len() {
            return vec![FieldViolation {
                field: None,
                rule: RowRule::ColumnCount,
                value: record.len().to_string(),
                expected: columns.len().to_string(),
            }];
        }

        columns
            .iter()
            .zip(record.iter())
            .filter_map(|(column, value)| check_field(column, value))
            .collect()
    }
}

fn check_field(column: &ColumnSpec, value: &str) -> Option<FieldViolation> {
    let violation = |rule, expected: String| FieldViolation {
        field: Some(column.name.clone()),
        rule,
        value: value.to_string(),
        expected,
    };

    if value.is_empty() {
        return column
            .required
            .then(|| violation(RowRule::MissingValue, "non-empty value".to_string()));
    }

    let (min, max) = column.bounds()?;
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => {
            (v < min || v > max).then(|| violation(RowRule::OutOfRange, format!("[{min}, {max}]")))
        }
        _ => Some(violation(RowRule::NotNumeric, "finite number".to_string())),
    }
}

/// Whitespace-only lines come back as a single empty field
fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty) && record.len() <= 1
}
