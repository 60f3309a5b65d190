//! # Integration Tests
//!
//! End-to-end runs of both stages over in-memory stores and a scripted
//! uploader:
//! - configuration loading
//! - validate then deliver, sharing the intermediate store
//! - partial destination failure and redelivery

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{MetricsSinkKind, SecretStoreConfig};

    const EXAMPLE: &str = include_str!("../../../config/relay.example.toml");

    #[test]
    fn test_example_config_loads() {
        let blueprint = ConfigLoader::load_from_str(EXAMPLE, ConfigFormat::Toml).unwrap();

        let untrusted = blueprint.untrusted.as_ref().unwrap();
        assert_eq!(untrusted.source.bucket, "falcon-project-bucket1");
        assert_eq!(untrusted.accepted.bucket, "falcon-project-bucket2");

        let trusted = blueprint.trusted.as_ref().unwrap();
        assert_eq!(trusted.input.bucket, untrusted.accepted.bucket);
        assert_eq!(trusted.remote_root, "/From_AWS");

        let ids: Vec<_> = blueprint.destinations.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["op1", "op2"]);
        assert!(matches!(
            blueprint.secrets,
            SecretStoreConfig::Directory { .. }
        ));
        assert_eq!(blueprint.retry.max_attempts, 3);
        assert_eq!(blueprint.metrics.sink, MetricsSinkKind::Recorder);
        assert_eq!(blueprint.schema.columns.len(), 8);
    }

    #[test]
    fn test_trusted_stage_without_destinations_is_invalid() {
        let content = r#"
[trusted]
input = { url = "memory://", bucket = "accepted" }
"#;
        assert!(ConfigLoader::load_from_str(content, ConfigFormat::Toml).is_err());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use chrono::{DateTime, TimeZone, Utc};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{FileDisposition, RelayBlueprint, UploadErrorKind};
    use credentials::StaticSecretStore;
    use futures::TryStreamExt;
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::{ObjectMeta, ObjectStore, PutPayload};
    use observability::reporter::{BATCH_FILES_PROCESSED, BATCH_SUCCESS_RATE};
    use observability::{MemorySink, OutcomeReporter};
    use pipeline::{DeliverStage, InvocationReport, ValidateStage, ValidateStores};
    use serde_json::{json, Value};
    use transfer::{MemoryUploader, RetryPolicy, TransferEngine};
    use trigger::Trigger;

    const CONFIG: &str = r#"
[untrusted]
source = { url = "memory://", bucket = "incoming" }
accepted = { url = "memory://", bucket = "accepted" }
rejected = { url = "memory://", bucket = "rejected" }

[trusted]
input = { url = "memory://", bucket = "accepted" }
remote_root = "/From_AWS"

[[destinations]]
id = "op1"
secret_name = "relay/onprem"

[[destinations]]
id = "op2"
secret_name = "relay/onprem"

[retry]
max_attempts = 3

[invocation]
timeout_secs = 30
"#;

    const KEY: &str = "2025/01/02/03/obs.csv";
    const REMOTE_PATH: &str = "/From_AWS/2025/01/02/03/obs.csv";

    const HEADER: &str = "station_id,observed_at,latitude,longitude,temperature_c,relative_humidity,pressure_hpa,wind_speed_ms";

    /// Stores and sinks shared by both stages of one relay
    struct Relay {
        blueprint: RelayBlueprint,
        source: Arc<dyn ObjectStore>,
        accepted: Arc<dyn ObjectStore>,
        rejected: Arc<dyn ObjectStore>,
        uploader: Arc<MemoryUploader>,
        sink: Arc<MemorySink>,
    }

    impl Relay {
        fn new() -> Self {
            Self {
                blueprint: ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap(),
                source: Arc::new(InMemory::new()),
                accepted: Arc::new(InMemory::new()),
                rejected: Arc::new(InMemory::new()),
                uploader: Arc::new(MemoryUploader::new()),
                sink: Arc::new(MemorySink::new()),
            }
        }

        fn reporter(&self) -> OutcomeReporter {
            OutcomeReporter::new(self.sink.clone(), self.blueprint.metrics.namespace.clone())
        }

        fn validate_stage(&self) -> ValidateStage {
            let stores = ValidateStores {
                source: self.source.clone(),
                accepted: self.accepted.clone(),
                rejected: self.rejected.clone(),
            };
            ValidateStage::from_blueprint(&self.blueprint, stores, self.reporter()).unwrap()
        }

        fn deliver_stage(&self) -> DeliverStage<MemoryUploader, StaticSecretStore> {
            let engine = TransferEngine::with_shared(
                self.uploader.clone(),
                RetryPolicy::immediate(self.blueprint.retry.max_attempts),
            );
            DeliverStage::from_blueprint(
                &self.blueprint,
                self.accepted.clone(),
                secrets(),
                engine,
                self.reporter(),
            )
            .unwrap()
        }

        async fn upload(&self, key: &str, content: String) {
            self.source
                .put(&Path::from(key), PutPayload::from(Bytes::from(content)))
                .await
                .unwrap();
        }

        async fn validate(&self, message_id: &str) -> InvocationReport {
            self.validate_stage()
                .run(&Trigger::Event(event("incoming", KEY, message_id)), now())
                .await
                .unwrap()
        }

        async fn deliver(&self, message_id: &str) -> InvocationReport {
            self.deliver_stage()
                .run(&Trigger::Event(event("accepted", KEY, message_id)), now())
                .await
                .unwrap()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 30, 0).unwrap()
    }

    fn secrets() -> StaticSecretStore {
        let payload = json!({
            "op1_host": "10.0.0.1", "op1_port": 22, "op1_username": "relay", "op1_password": "pw1",
            "op2_host": "10.0.0.2", "op2_port": 22, "op2_username": "relay", "op2_password": "pw2"
        });
        StaticSecretStore::new().with_secret("relay/onprem", payload.to_string())
    }

    /// Queue batch carrying one storage notification
    fn event(bucket: &str, key: &str, message_id: &str) -> String {
        let body = json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": { "bucket": { "name": bucket }, "object": { "key": key, "size": 1 } }
            }]
        });
        json!({ "Records": [{ "messageId": message_id, "body": body.to_string() }] }).to_string()
    }

    fn observations(rows: usize) -> String {
        let mut csv = format!("{HEADER}\n");
        for i in 0..rows {
            csv.push_str(&format!(
                "ST{i:03},2025-01-02T03:{:02}:00Z,{:.2},{:.2},{:.1},{},{:.1},{:.1}\n",
                i % 60,
                30.0 + (i as f64) * 0.1,
                -97.0 + (i as f64) * 0.05,
                15.0 + (i % 10) as f64,
                40 + i % 50,
                1000.0 + (i % 20) as f64,
                (i % 15) as f64,
            ));
        }
        csv
    }

    async fn read(store: &dyn ObjectStore, key: &str) -> Option<Bytes> {
        match store.get(&Path::from(key)).await {
            Ok(result) => Some(result.bytes().await.unwrap()),
            Err(object_store::Error::NotFound { .. }) => None,
            Err(e) => panic!("unexpected store error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_accepted_file_reaches_every_destination() {
        let relay = Relay::new();
        let content = observations(100);
        relay.upload(KEY, content.clone()).await;

        let validated = relay.validate("m-validate").await;
        assert_eq!(validated.batch.processed, 1);
        assert_eq!(validated.batch.accepted, 1);
        assert!(validated.batch_item_failures.is_empty());
        assert_eq!(
            read(relay.accepted.as_ref(), KEY).await,
            Some(Bytes::from(content.clone()))
        );
        assert_eq!(read(relay.rejected.as_ref(), KEY).await, None);

        let delivered = relay.deliver("m-deliver").await;
        assert_eq!(delivered.batch.processed, 1);
        assert_eq!(delivered.batch.delivered, 1);
        assert!(delivered.batch_item_failures.is_empty());

        for dest in ["op1", "op2"] {
            assert_eq!(
                relay.uploader.file(dest, REMOTE_PATH),
                Some(Bytes::from(content.clone()))
            );
            assert_eq!(relay.uploader.calls(dest), 1);
        }
        assert_eq!(relay.sink.value(BATCH_FILES_PROCESSED), Some(1.0));
        assert_eq!(relay.sink.value(BATCH_SUCCESS_RATE), Some(100.0));
    }

    #[tokio::test]
    async fn test_missing_latitude_is_quarantined() {
        let relay = Relay::new();
        let header = HEADER.replace("latitude,", "");
        let content = format!("{header}\nST001,2025-01-02T03:00:00Z,-97.5,21.0,55,1012.0,3.5\n");
        relay.upload(KEY, content.clone()).await;

        let report = relay.validate("m1").await;
        assert_eq!(report.batch.processed, 1);
        assert_eq!(report.batch.rejected, 1);
        assert_eq!(
            report.file(KEY).unwrap().disposition,
            FileDisposition::Rejected { errors: 1 }
        );
        // Rejection is a terminal outcome; the message is acknowledged
        assert!(report.batch_item_failures.is_empty());

        assert_eq!(read(relay.accepted.as_ref(), KEY).await, None);
        assert_eq!(
            read(relay.rejected.as_ref(), KEY).await,
            Some(Bytes::from(content))
        );

        let stored = read(relay.rejected.as_ref(), &validation::report_key(KEY))
            .await
            .unwrap();
        let error_report: Value = serde_json::from_slice(&stored).unwrap();
        assert_eq!(error_report["status"], "rejected");
        assert_eq!(error_report["error_count"], 1);
        let message = error_report["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("latitude"), "got: {message}");
    }

    #[tokio::test]
    async fn test_destination_down_is_partial_failure() {
        let relay = Relay::new();
        relay.upload(KEY, observations(10)).await;
        relay.validate("m-validate").await;

        let attempts = relay.blueprint.retry.max_attempts as usize;
        relay
            .uploader
            .fail_next("op2", UploadErrorKind::Connect, attempts);

        let mut stage = relay.deliver_stage();
        let report = stage
            .run(&Trigger::Event(event("accepted", KEY, "m1")), now())
            .await
            .unwrap();

        assert_eq!(report.batch.partially_delivered, 1);
        assert_eq!(
            report.file(KEY).unwrap().disposition,
            FileDisposition::PartiallyDelivered {
                failed: vec!["op2".into()]
            }
        );
        assert_eq!(report.failed_message_ids(), vec!["m1"]);

        assert!(relay.uploader.file("op1", REMOTE_PATH).is_some());
        assert!(relay.uploader.file("op2", REMOTE_PATH).is_none());
        assert_eq!(relay.uploader.calls("op1"), 1);
        assert_eq!(relay.uploader.calls("op2"), attempts);

        let metrics = stage.engine().metrics();
        assert_eq!(metrics["op1"].success_count, 1);
        assert_eq!(metrics["op2"].attempts, attempts as u64);
        assert_eq!(metrics["op2"].failure_count, 1);
    }

    #[tokio::test]
    async fn test_redelivery_converges_to_same_remote_state() {
        let relay = Relay::new();
        relay.upload(KEY, observations(20)).await;
        relay.validate("m-validate").await;

        relay.deliver("m1").await;
        let first = relay.uploader.snapshot();

        // The same notification delivered twice
        let second_report = relay.deliver("m1").await;
        assert_eq!(second_report.batch.delivered, 1);
        assert_eq!(relay.uploader.snapshot(), first);
        assert_eq!(first.len(), 2);

        // Revalidation overwrites the intermediate object in place
        relay.validate("m-validate").await;
        let listed: Vec<ObjectMeta> = relay.accepted.list(None).try_collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].location.as_ref(), KEY);
    }

    #[tokio::test]
    async fn test_partial_failure_recovers_on_redelivery() {
        let relay = Relay::new();
        relay.upload(KEY, observations(5)).await;
        relay.validate("m-validate").await;

        let attempts = relay.blueprint.retry.max_attempts as usize;
        relay
            .uploader
            .fail_next("op2", UploadErrorKind::Connect, attempts);

        let failed = relay.deliver("m1").await;
        assert_eq!(failed.failed_message_ids(), vec!["m1"]);

        let retried = relay.deliver("m1").await;
        assert_eq!(retried.batch.delivered, 1);
        assert!(retried.batch_item_failures.is_empty());
        assert_eq!(
            relay.uploader.file("op1", REMOTE_PATH),
            relay.uploader.file("op2", REMOTE_PATH)
        );
    }

    #[tokio::test]
    async fn test_sweep_picks_up_missed_notifications() {
        let relay = Relay::new();
        relay.upload(KEY, observations(3)).await;
        relay
            .upload("2025/01/02/03/second.csv", observations(4))
            .await;

        let validated = relay
            .validate_stage()
            .run(&Trigger::Sweep { lookback_hours: 0 }, now())
            .await
            .unwrap();
        assert_eq!(validated.batch.accepted, 2);

        let delivered = relay
            .deliver_stage()
            .run(&Trigger::Sweep { lookback_hours: 0 }, now())
            .await
            .unwrap();
        assert_eq!(delivered.batch.delivered, 2);
        assert!(relay
            .uploader
            .file("op2", "/From_AWS/2025/01/02/03/second.csv")
            .is_some());
    }
}
