//! Batch ingestion: course records → vector store.

use std::time::{Duration, Instant};

use coursepilot_shared::{CourseRecord, Result};
use coursepilot_store::VectorStore;
use tracing::{debug, info, instrument, warn};

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents an upsert was attempted for.
    pub attempted: usize,
    /// Newly stored documents.
    pub succeeded: usize,
    /// Documents whose content was already in the collection.
    pub skipped_duplicates: usize,
    /// Documents that failed for any other reason.
    pub failed: usize,
    pub elapsed: Duration,
}

/// What happened to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    Added,
    Duplicate,
    Failed,
}

/// Progress callback for ingestion.
pub trait IngestProgress: Send + Sync {
    /// Called once the collection is open and documents are built.
    fn started(&self, total: usize);
    /// Called after each upsert attempt.
    fn document(&self, current: usize, total: usize, outcome: DocumentOutcome);
    /// Called when the run completes.
    fn done(&self, report: &IngestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl IngestProgress for SilentProgress {
    fn started(&self, _total: usize) {}
    fn document(&self, _current: usize, _total: usize, _outcome: DocumentOutcome) {}
    fn done(&self, _report: &IngestReport) {}
}

/// Build documents from `records` and upsert each into `collection`.
///
/// Opening the collection is the only fatal step. After that every document
/// gets exactly one attempt: duplicates are counted as skipped, other
/// failures are logged and counted, and the batch moves on.
#[instrument(skip_all, fields(collection = %collection, records = records.len()))]
pub async fn ingest<S: VectorStore>(
    store: &S,
    collection: &str,
    records: &[CourseRecord],
    progress: &dyn IngestProgress,
) -> Result<IngestReport> {
    let start = Instant::now();
    let handle = store.open_collection(collection).await?;

    let documents = coursepilot_corpus::build(records);
    let total = documents.len();
    progress.started(total);
    info!(total, "ingesting course documents");

    let mut report = IngestReport::default();
    for (i, doc) in documents.iter().enumerate() {
        report.attempted += 1;
        let outcome = match store
            .upsert(&handle, &doc.document_id, &doc.document_text, &doc.metadata())
            .await
        {
            Ok(()) => {
                debug!(id = %doc.document_id, "stored");
                report.succeeded += 1;
                DocumentOutcome::Added
            }
            Err(e) if e.is_recoverable() => {
                info!(id = %doc.document_id, "already ingested, skipping");
                report.skipped_duplicates += 1;
                DocumentOutcome::Duplicate
            }
            Err(e) => {
                warn!(id = %doc.document_id, error = %e, class = %e.class(), "failed to ingest document");
                report.failed += 1;
                DocumentOutcome::Failed
            }
        };
        progress.document(i + 1, total, outcome);
    }

    report.elapsed = start.elapsed();
    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        skipped = report.skipped_duplicates,
        failed = report.failed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "ingestion complete"
    );
    progress.done(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use coursepilot_shared::CoursePilotError;
    use coursepilot_store::{
        CollectionHandle, HashingEmbedder, MemoryStore, Metadata, QueryMatch,
    };

    fn record(subject: &str, title: &str, catalog: &str) -> CourseRecord {
        CourseRecord {
            subject: Some(subject.into()),
            title: Some(title.into()),
            catalog_number: Some(catalog.into()),
            course_type: Some("Lecture".into()),
            description: Some("Covers the fundamentals.".into()),
            keywords: Some("core".into()),
            grading: Some("Graduate Letter Grade".into()),
            prerequisites: None,
        }
    }

    fn memory_store() -> MemoryStore<HashingEmbedder> {
        MemoryStore::new(HashingEmbedder::new(256))
    }

    #[derive(Default)]
    struct RecordingProgress {
        outcomes: Mutex<Vec<DocumentOutcome>>,
    }

    impl IngestProgress for RecordingProgress {
        fn started(&self, _total: usize) {}
        fn document(&self, _current: usize, _total: usize, outcome: DocumentOutcome) {
            self.outcomes.lock().expect("lock").push(outcome);
        }
        fn done(&self, _report: &IngestReport) {}
    }

    /// Opens collections but rejects every write.
    struct ReadOnlyStore;

    impl VectorStore for ReadOnlyStore {
        async fn heartbeat(&self) -> Result<()> {
            Ok(())
        }
        async fn open_collection(&self, name: &str) -> Result<CollectionHandle> {
            Ok(CollectionHandle {
                id: "ro".into(),
                name: name.into(),
            })
        }
        async fn upsert(
            &self,
            _handle: &CollectionHandle,
            _document_id: &str,
            _document_text: &str,
            _metadata: &Metadata,
        ) -> Result<()> {
            Err(CoursePilotError::StoreUnavailable("read-only".into()))
        }
        async fn similarity_query(
            &self,
            _handle: &CollectionHandle,
            _query_text: &str,
            _top_k: usize,
        ) -> Result<Vec<QueryMatch>> {
            Ok(Vec::new())
        }
        async fn count(&self, _handle: &CollectionHandle) -> Result<usize> {
            Ok(0)
        }
    }

    /// Refuses connections outright.
    struct DownStore;

    impl VectorStore for DownStore {
        async fn heartbeat(&self) -> Result<()> {
            Err(CoursePilotError::StoreUnavailable("connection refused".into()))
        }
        async fn open_collection(&self, _name: &str) -> Result<CollectionHandle> {
            Err(CoursePilotError::StoreUnavailable("connection refused".into()))
        }
        async fn upsert(
            &self,
            _handle: &CollectionHandle,
            _document_id: &str,
            _document_text: &str,
            _metadata: &Metadata,
        ) -> Result<()> {
            Err(CoursePilotError::StoreUnavailable("connection refused".into()))
        }
        async fn similarity_query(
            &self,
            _handle: &CollectionHandle,
            _query_text: &str,
            _top_k: usize,
        ) -> Result<Vec<QueryMatch>> {
            Err(CoursePilotError::StoreUnavailable("connection refused".into()))
        }
        async fn count(&self, _handle: &CollectionHandle) -> Result<usize> {
            Err(CoursePilotError::StoreUnavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn casing_duplicates_persist_once() {
        let store = memory_store();
        let records = vec![
            record("CS", "Network Security", "5700"),
            record("cs", "NETWORK SECURITY", "5700"),
        ];
        let progress = RecordingProgress::default();

        let report = ingest(&store, "courses", &records, &progress)
            .await
            .expect("ingest");

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped_duplicates, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(
            *progress.outcomes.lock().expect("lock"),
            vec![DocumentOutcome::Added, DocumentOutcome::Duplicate]
        );

        let handle = store.open_collection("courses").await.expect("open");
        assert_eq!(store.count(&handle).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn reingesting_is_a_no_op() {
        let store = memory_store();
        let records = vec![
            record("CS", "Compilers", "5400"),
            record("DS", "Data Mining", "5230"),
        ];
        ingest(&store, "courses", &records, &SilentProgress)
            .await
            .expect("first run");
        let again = ingest(&store, "courses", &records, &SilentProgress)
            .await
            .expect("second run");

        assert_eq!(again.succeeded, 0);
        assert_eq!(again.skipped_duplicates, 2);
    }

    #[tokio::test]
    async fn stored_metadata_carries_display_text() {
        let store = memory_store();
        let records = vec![record("CS", "Network Security", "5700")];
        ingest(&store, "courses", &records, &SilentProgress)
            .await
            .expect("ingest");

        let handle = store.open_collection("courses").await.expect("open");
        let hits = store
            .similarity_query(&handle, "network security", 1)
            .await
            .expect("query");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].metadata["display_text"].contains("Title: Network Security"));
        assert_eq!(hits[0].metadata["title"], "network security");
        assert_eq!(hits[0].metadata["prerequisites"], "None");
    }

    #[tokio::test]
    async fn per_document_failures_do_not_abort() {
        let records = vec![
            record("CS", "Compilers", "5400"),
            record("DS", "Data Mining", "5230"),
            record("CY", "Cryptography", "6740"),
        ];
        let report = ingest(&ReadOnlyStore, "courses", &records, &SilentProgress)
            .await
            .expect("batch completes");
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, 3);
        assert_eq!(report.succeeded, 0);
    }

    #[tokio::test]
    async fn unreachable_store_aborts_before_any_attempt() {
        let records = vec![record("CS", "Compilers", "5400")];
        let progress = RecordingProgress::default();
        let err = ingest(&DownStore, "courses", &records, &progress)
            .await
            .unwrap_err();
        assert!(matches!(err, CoursePilotError::StoreUnavailable(_)));
        assert!(progress.outcomes.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn empty_input_reports_zero() {
        let report = ingest(&memory_store(), "courses", &[], &SilentProgress)
            .await
            .expect("ingest");
        assert_eq!(report.attempted, 0);
        assert_eq!(report.succeeded, 0);
    }
}
