//! Sequential per-file loop under one invocation deadline

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Instant;

use contracts::{BatchOutcome, CandidateFile, FileDisposition, FileOutcome, Stage};
use observability::OutcomeReporter;
use tokio::time::{timeout_at, Instant as Deadline};
use tracing::{error, info_span, warn, Instrument};
use trigger::CandidateBatch;

use crate::error::Result;
use crate::report::{BatchItemFailure, InvocationReport};

pub(crate) const DEADLINE_REASON: &str = "invocation deadline exceeded";

/// Run `process` over every candidate, one at a time
///
/// A file still in flight at `deadline` is dropped (cancelling its work) and
/// recorded as failed; the remaining candidates are skipped. Every unsettled
/// event-sourced file contributes its message id to `batchItemFailures`.
///
/// An error from `process` aborts the invocation: the file and everything
/// after it are counted as skipped, the partial batch is still reported,
/// and the error is returned so the whole batch is redelivered.
pub(crate) async fn drive<F, Fut>(
    stage: Stage,
    trigger: &str,
    candidates: CandidateBatch,
    deadline: Deadline,
    reporter: &OutcomeReporter,
    mut process: F,
) -> Result<InvocationReport>
where
    F: FnMut(CandidateFile) -> Fut,
    Fut: Future<Output = Result<FileOutcome>>,
{
    let started = Instant::now();
    let mut batch = BatchOutcome::new(stage);
    let mut files = Vec::with_capacity(candidates.candidates.len());
    let mut failures: BTreeSet<String> = candidates.malformed_messages.into_iter().collect();

    let mut pending = candidates.candidates.into_iter();
    while let Some(candidate) = pending.next() {
        if Deadline::now() >= deadline {
            skip(candidate, pending, &mut batch, &mut failures);
            break;
        }

        let location = candidate.location.clone();
        let message_id = candidate.message_id.clone();
        let file_started = Instant::now();
        let span = info_span!("file", key = %location.key, stage = stage.as_str());

        let outcome = match timeout_at(deadline, process(candidate).instrument(span)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let skipped = 1 + pending.count() as u64;
                error!(key = %location.key, error = %e, skipped, "store unavailable, aborting invocation");
                batch.record_skipped(skipped);
                batch.finish(started.elapsed());
                reporter.record(&batch);
                return Err(e);
            }
            Err(_) => {
                warn!(key = %location.key, "deadline reached mid-file, aborting");
                FileOutcome {
                    location,
                    stage,
                    bytes: 0,
                    duration: file_started.elapsed(),
                    disposition: FileDisposition::Failed {
                        reason: DEADLINE_REASON.to_string(),
                    },
                }
            }
        };

        if !outcome.disposition.is_settled() {
            if let Some(id) = message_id {
                failures.insert(id);
            }
        }
        reporter.record_file(&outcome);
        batch.record(&outcome);
        files.push(outcome);
    }

    batch.finish(started.elapsed());
    reporter.record(&batch);

    Ok(InvocationReport {
        stage,
        trigger: trigger.to_string(),
        batch,
        files,
        duplicates: candidates.duplicates,
        ignored: candidates.ignored,
        batch_item_failures: failures
            .into_iter()
            .map(|item_identifier| BatchItemFailure { item_identifier })
            .collect(),
    })
}

fn skip(
    first: CandidateFile,
    rest: impl Iterator<Item = CandidateFile>,
    batch: &mut BatchOutcome,
    failures: &mut BTreeSet<String>,
) {
    let mut skipped = 0u64;
    for candidate in std::iter::once(first).chain(rest) {
        skipped += 1;
        if let Some(id) = candidate.message_id {
            failures.insert(id);
        }
    }
    warn!(skipped, "deadline reached, remaining files left for redelivery");
    batch.record_skipped(skipped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use chrono::Utc;
    use contracts::ObjectRef;
    use observability::MemorySink;
    use std::sync::Arc;
    use std::time::Duration;

    fn event(key: &str, id: &str) -> CandidateFile {
        CandidateFile::from_event(ObjectRef::new("b", key), Some(1), Utc::now(), Some(id.into()))
    }

    fn settled(candidate: CandidateFile, disposition: FileDisposition) -> FileOutcome {
        FileOutcome {
            location: candidate.location,
            stage: Stage::Deliver,
            bytes: 1,
            duration: Duration::ZERO,
            disposition,
        }
    }

    fn reporter() -> OutcomeReporter {
        OutcomeReporter::new(Arc::new(MemorySink::new()), "ns")
    }

    #[tokio::test]
    async fn test_failures_collected_per_message() {
        let batch = CandidateBatch {
            candidates: vec![event("a", "m1"), event("b", "m2")],
            malformed_messages: vec!["m0".into()],
            ..Default::default()
        };
        let deadline = Deadline::now() + Duration::from_secs(5);

        let report = drive(Stage::Deliver, "event", batch, deadline, &reporter(), |c| async move {
            if c.location.key == "a" {
                Ok(settled(c, FileDisposition::Delivered))
            } else {
                Ok(settled(c, FileDisposition::Failed { reason: "x".into() }))
            }
        })
        .await
        .unwrap();

        assert_eq!(report.failed_message_ids(), vec!["m0", "m2"]);
        assert_eq!(report.batch.processed, 2);
        assert_eq!(report.batch.delivered, 1);
        assert_eq!(report.batch.failed, 1);
    }

    #[tokio::test]
    async fn test_deadline_aborts_and_skips() {
        let batch = CandidateBatch {
            candidates: vec![event("slow", "m1"), event("never", "m2")],
            ..Default::default()
        };
        let deadline = Deadline::now() + Duration::from_millis(50);

        let report = drive(Stage::Deliver, "event", batch, deadline, &reporter(), |c| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(settled(c, FileDisposition::Delivered))
        })
        .await
        .unwrap();

        assert_eq!(report.batch.processed, 1);
        assert_eq!(report.batch.failed, 1);
        assert_eq!(report.batch.skipped, 1);
        assert_eq!(
            report.file("slow").unwrap().disposition,
            FileDisposition::Failed {
                reason: DEADLINE_REASON.into()
            }
        );
        assert_eq!(report.failed_message_ids(), vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_store_outage_aborts_invocation() {
        let batch = CandidateBatch {
            candidates: vec![event("a", "m1"), event("b", "m2"), event("c", "m3")],
            ..Default::default()
        };
        let deadline = Deadline::now() + Duration::from_secs(5);
        let sink = Arc::new(MemorySink::new());
        let reporter = OutcomeReporter::new(sink.clone(), "ns");

        let result = drive(Stage::Deliver, "event", batch, deadline, &reporter, |c| async move {
            if c.location.key == "a" {
                Ok(settled(c, FileDisposition::Delivered))
            } else {
                Err(PipelineError::store_unavailable(
                    "input",
                    &c.location.key,
                    object_store::Error::Generic {
                        store: "test",
                        source: "503".into(),
                    },
                ))
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(PipelineError::StoreUnavailable { store: "input", ref key, .. }) if key == "b"
        ));
        assert_eq!(sink.value("BatchFilesProcessed"), Some(1.0));
        assert_eq!(sink.value("BatchFilesSkipped"), Some(2.0));
    }
}
