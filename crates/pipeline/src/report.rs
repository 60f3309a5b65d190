//! Invocation report printed at the end of every stage run

use contracts::{BatchOutcome, FileOutcome, Stage};
use serde::Serialize;

/// Queue message to redeliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    pub item_identifier: String,
}

/// Result of one stage invocation
///
/// `batchItemFailures` lists every queue message whose file did not settle,
/// was skipped at the deadline, or could not be decoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationReport {
    pub stage: Stage,
    pub trigger: String,
    pub batch: BatchOutcome,
    pub files: Vec<FileOutcome>,
    pub duplicates: usize,
    pub ignored: usize,
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl InvocationReport {
    /// Message ids only
    pub fn failed_message_ids(&self) -> Vec<&str> {
        self.batch_item_failures
            .iter()
            .map(|f| f.item_identifier.as_str())
            .collect()
    }

    pub fn file(&self, key: &str) -> Option<&FileOutcome> {
        self.files.iter().find(|f| f.location.key == key)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let report = InvocationReport {
            stage: Stage::Deliver,
            trigger: "event".into(),
            batch: BatchOutcome::new(Stage::Deliver),
            files: vec![],
            duplicates: 0,
            ignored: 0,
            batch_item_failures: vec![BatchItemFailure {
                item_identifier: "m1".into(),
            }],
        };
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["batchItemFailures"][0]["itemIdentifier"], "m1");
        assert_eq!(value["stage"], "deliver");
        assert_eq!(report.failed_message_ids(), vec!["m1"]);
    }
}
