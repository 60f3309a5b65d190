//! TriggerCoordinator - one candidate stream from events and sweeps

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use contracts::CandidateFile;
use object_store::ObjectStore;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::event::parse_event;
use crate::sweep::sweep;

/// What started this invocation
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Notification batch document
    Event(String),
    /// Scheduled reconciliation
    Sweep { lookback_hours: u32 },
}

impl Trigger {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Sweep { .. } => "sweep",
        }
    }
}

/// De-duplicated candidates for one invocation
#[derive(Debug, Default)]
pub struct CandidateBatch {
    pub candidates: Vec<CandidateFile>,
    /// Queue messages that must be redelivered without processing
    pub malformed_messages: Vec<String>,
    /// Records dropped by filtering
    pub ignored: usize,
    /// Repeat (bucket, key) pairs collapsed into their first occurrence
    pub duplicates: usize,
}

/// Normalizes triggers for a stage reading from one bucket
#[derive(Debug, Clone)]
pub struct TriggerCoordinator {
    bucket: String,
}

impl TriggerCoordinator {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Resolve a trigger into candidates
    ///
    /// # Errors
    /// Unrecognizable notification documents and listing failures; both
    /// abort the invocation.
    #[instrument(
        name = "trigger_collect",
        skip(self, trigger, store, now),
        fields(bucket = %self.bucket, trigger = trigger.kind())
    )]
    pub async fn collect(
        &self,
        trigger: &Trigger,
        store: &dyn ObjectStore,
        now: DateTime<Utc>,
    ) -> Result<CandidateBatch> {
        let mut batch = match trigger {
            Trigger::Event(input) => {
                let events = parse_event(input, &self.bucket, now)?;
                CandidateBatch {
                    candidates: events.candidates,
                    malformed_messages: events.malformed_messages,
                    ignored: events.ignored,
                    duplicates: 0,
                }
            }
            Trigger::Sweep { lookback_hours } => CandidateBatch {
                candidates: sweep(store, &self.bucket, now, *lookback_hours).await?,
                ..Default::default()
            },
        };

        let (unique, duplicates) = dedup(std::mem::take(&mut batch.candidates));
        batch.candidates = unique;
        batch.duplicates = duplicates;

        info!(
            candidates = batch.candidates.len(),
            duplicates = batch.duplicates,
            ignored = batch.ignored,
            malformed = batch.malformed_messages.len(),
            "candidates collected"
        );
        Ok(batch)
    }
}

/// Keep the first candidate per (bucket, key); returns the number dropped
pub fn dedup(candidates: Vec<CandidateFile>) -> (Vec<CandidateFile>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(candidates.len());
    let mut duplicates = 0;

    for candidate in candidates {
        if seen.insert(candidate.location.clone()) {
            unique.push(candidate);
        } else {
            debug!(location = %candidate.location, "duplicate candidate collapsed");
            duplicates += 1;
        }
    }
    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::ObjectRef;
    use object_store::memory::InMemory;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn event_body(key: &str) -> String {
        json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": { "bucket": { "name": "trusted" }, "object": { "key": key } }
            }]
        })
        .to_string()
    }

    #[test]
    fn test_dedup_keeps_first() {
        let a1 = CandidateFile::from_event(
            ObjectRef::new("b", "k"),
            None,
            now(),
            Some("m1".into()),
        );
        let a2 = CandidateFile::from_event(
            ObjectRef::new("b", "k"),
            None,
            now(),
            Some("m2".into()),
        );
        let other = CandidateFile::from_sweep(ObjectRef::new("b", "j"), 1, now());

        let (unique, dropped) = dedup(vec![a1, other, a2]);
        assert_eq!(unique.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(unique[0].message_id.as_deref(), Some("m1"));
    }

    #[tokio::test]
    async fn test_collect_event_with_duplicate_messages() {
        let input = json!({
            "Records": [
                { "messageId": "m1", "body": event_body("2025/01/02/03/a.csv") },
                { "messageId": "m2", "body": event_body("2025/01/02/03/a.csv") },
                { "messageId": "m3", "body": event_body("2025/01/02/03/b.csv") }
            ]
        })
        .to_string();

        let coordinator = TriggerCoordinator::new("trusted");
        let store = InMemory::new();
        let batch = coordinator
            .collect(&Trigger::Event(input), &store, now())
            .await
            .unwrap();

        assert_eq!(batch.candidates.len(), 2);
        assert_eq!(batch.duplicates, 1);
    }
}
