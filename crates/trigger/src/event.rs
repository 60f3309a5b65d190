//! Object-created notifications
//!
//! Accepted inputs:
//! - queue batch: `{"Records": [{"messageId", "body": "<S3 notification JSON>"}]}`
//! - bare S3 notification: `{"Records": [{"eventSource": "aws:s3", "s3": {...}}]}`

use chrono::{DateTime, Utc};
use contracts::{CandidateFile, ObjectRef};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, TriggerError};

const S3_EVENT_SOURCE: &str = "aws:s3";
const OBJECT_CREATED_PREFIX: &str = "ObjectCreated";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Records", default)]
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueueMessage {
    #[serde(rename = "messageId", default)]
    message_id: Option<String>,
    body: String,
}

#[derive(Debug, Deserialize)]
struct S3Record {
    #[serde(rename = "eventSource", default)]
    event_source: Option<String>,
    #[serde(rename = "eventName", default)]
    event_name: Option<String>,
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Candidates extracted from one notification batch
#[derive(Debug, Default)]
pub struct EventBatch {
    pub candidates: Vec<CandidateFile>,
    /// Queue messages whose body could not be decoded
    pub malformed_messages: Vec<String>,
    /// Records skipped (other event types, other buckets, undecodable keys)
    pub ignored: usize,
}

/// Parse a notification batch for a stage reading from `bucket`
///
/// # Errors
/// `InvalidEvent` when the document itself is not a recognizable batch.
pub fn parse_event(input: &str, bucket: &str, now: DateTime<Utc>) -> Result<EventBatch> {
    let envelope: Envelope = serde_json::from_str(input)
        .map_err(|e| TriggerError::InvalidEvent(format!("not a notification document: {e}")))?;

    let mut batch = EventBatch::default();
    for record in envelope.records {
        if record.get("body").is_some() {
            parse_queue_message(record, bucket, now, &mut batch);
        } else {
            let records = vec![record];
            collect_s3_records(records, None, bucket, now, &mut batch);
        }
    }

    debug!(
        candidates = batch.candidates.len(),
        ignored = batch.ignored,
        malformed = batch.malformed_messages.len(),
        "notification batch parsed"
    );
    Ok(batch)
}

fn parse_queue_message(record: Value, bucket: &str, now: DateTime<Utc>, batch: &mut EventBatch) {
    let message: QueueMessage = match serde_json::from_value(record) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "queue record has no usable body");
            batch.ignored += 1;
            return;
        }
    };
    let message_id = message.message_id.clone();

    let envelope: Envelope = match serde_json::from_str(&message.body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(message_id = ?message_id, error = %e, "queue message body is not JSON");
            match message_id {
                Some(id) => batch.malformed_messages.push(id),
                None => batch.ignored += 1,
            }
            return;
        }
    };

    // S3 test events and other notices carry no records
    if envelope.records.is_empty() {
        debug!(message_id = ?message_id, "queue message without records");
        batch.ignored += 1;
        return;
    }

    collect_s3_records(envelope.records, message_id, bucket, now, batch);
}

fn collect_s3_records(
    records: Vec<Value>,
    message_id: Option<String>,
    bucket: &str,
    now: DateTime<Utc>,
    batch: &mut EventBatch,
) {
    for value in records {
        let record: S3Record = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!(message_id = ?message_id, error = %e, "malformed S3 record");
                batch.ignored += 1;
                continue;
            }
        };

        let is_created = record.event_source.as_deref() == Some(S3_EVENT_SOURCE)
            && record
                .event_name
                .as_deref()
                .is_some_and(|name| name.starts_with(OBJECT_CREATED_PREFIX));
        let Some(entity) = record.s3.filter(|_| is_created) else {
            batch.ignored += 1;
            continue;
        };

        if entity.bucket.name != bucket {
            warn!(
                bucket = %entity.bucket.name,
                expected = bucket,
                "notification for unexpected bucket ignored"
            );
            batch.ignored += 1;
            continue;
        }

        let Some(key) = decode_key(&entity.object.key) else {
            warn!(raw_key = %entity.object.key, "object key is not valid UTF-8 after decoding");
            batch.ignored += 1;
            continue;
        };

        batch.candidates.push(CandidateFile::from_event(
            ObjectRef::new(entity.bucket.name, key),
            entity.object.size,
            now,
            message_id.clone(),
        ));
    }
}

/// Form-URL decoding as used by S3 notifications (`+` is a space)
pub fn decode_key(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|key| key.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::DiscoveryMethod;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn s3_record(bucket: &str, key: &str, event: &str) -> Value {
        json!({
            "eventSource": "aws:s3",
            "eventName": event,
            "s3": {
                "bucket": { "name": bucket },
                "object": { "key": key, "size": 42 }
            }
        })
    }

    fn queue_batch(messages: &[(&str, Value)]) -> String {
        let records: Vec<Value> = messages
            .iter()
            .map(|(id, body)| json!({ "messageId": id, "body": body.to_string() }))
            .collect();
        json!({ "Records": records }).to_string()
    }

    #[test]
    fn test_queue_batch() {
        let input = queue_batch(&[
            ("m1", json!({ "Records": [s3_record("trusted", "2025/01/02/03/a+b%2B.csv", "ObjectCreated:Put")] })),
            ("m2", json!({ "Records": [s3_record("trusted", "2025/01/02/03/c.csv", "ObjectRemoved:Delete")] })),
        ]);

        let batch = parse_event(&input, "trusted", now()).unwrap();
        assert_eq!(batch.candidates.len(), 1);
        let candidate = &batch.candidates[0];
        assert_eq!(candidate.location.key, "2025/01/02/03/a b+.csv");
        assert_eq!(candidate.size, Some(42));
        assert_eq!(candidate.method, DiscoveryMethod::Event);
        assert_eq!(candidate.message_id.as_deref(), Some("m1"));
        assert_eq!(candidate.discovered_at, now());
        assert_eq!(batch.ignored, 1);
    }

    #[test]
    fn test_bare_notification() {
        let input = json!({
            "Records": [
                s3_record("trusted", "x.csv", "ObjectCreated:CompleteMultipartUpload"),
                s3_record("other", "y.csv", "ObjectCreated:Put"),
            ]
        })
        .to_string();

        let batch = parse_event(&input, "trusted", now()).unwrap();
        assert_eq!(batch.candidates.len(), 1);
        assert_eq!(batch.candidates[0].message_id, None);
        assert_eq!(batch.ignored, 1);
    }

    #[test]
    fn test_malformed_body_reported() {
        let input = json!({
            "Records": [
                { "messageId": "bad", "body": "not json" },
                { "messageId": "test", "body": "{\"Event\":\"s3:TestEvent\"}" }
            ]
        })
        .to_string();

        let batch = parse_event(&input, "trusted", now()).unwrap();
        assert!(batch.candidates.is_empty());
        assert_eq!(batch.malformed_messages, vec!["bad".to_string()]);
        assert_eq!(batch.ignored, 1);
    }

    #[test]
    fn test_not_a_document() {
        for input in ["not json", "42"] {
            assert!(matches!(
                parse_event(input, "trusted", now()),
                Err(TriggerError::InvalidEvent(_))
            ));
        }
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("a%20b+c").as_deref(), Some("a b c"));
        assert_eq!(decode_key("%FF"), None);
    }
}
