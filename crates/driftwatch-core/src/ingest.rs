// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! Single-consumer ingestion loop.
//!
//! Drains the ingest buffer, feeds each sample to the analyzer, and kicks
//! off best-effort persistence. Analysis is the hot path; persistence runs
//! on spawned tasks under a deadline so a slow or unreachable store can
//! never stall the drain.

use std::sync::Arc;
use std::time::Duration;

use crate::analyzer::StreamingAnalyzer;
use crate::buffer::SampleDrain;
use crate::metrics::ServiceMetrics;
use crate::store::SampleStore;

/// The single consumer of the ingest buffer.
///
/// Exactly one loop runs per buffer. It owns the [`SampleDrain`] for the
/// duration of [`run`](Self::run) and terminates when the buffer is closed
/// and fully drained.
pub struct IngestionLoop {
    analyzer: Arc<StreamingAnalyzer>,
    store: Arc<dyn SampleStore>,
    metrics: Arc<ServiceMetrics>,
    save_timeout: Duration,
    sample_ttl: Duration,
}

impl IngestionLoop {
    /// Create a loop wired to the given analyzer, store, and metrics.
    pub fn new(
        analyzer: Arc<StreamingAnalyzer>,
        store: Arc<dyn SampleStore>,
        metrics: Arc<ServiceMetrics>,
        save_timeout: Duration,
        sample_ttl: Duration,
    ) -> Self {
        Self {
            analyzer,
            store,
            metrics,
            save_timeout,
            sample_ttl,
        }
    }

    /// Consume the drain until the buffer closes and all queued samples
    /// have been processed.
    ///
    /// Every received sample is analyzed before the next is taken from the
    /// drain, so analyzer updates are strictly ordered. Persistence is
    /// fire-and-forget; `run` does not wait for in-flight saves before
    /// returning.
    pub async fn run(self, mut drain: SampleDrain) {
        tracing::info!("ingestion loop started");
        while let Some(sample) = drain.recv().await {
            let snapshot = self.analyzer.add_sample(sample.value);
            self.metrics.samples_ingested_total.inc();

            if snapshot.is_anomaly {
                self.metrics.anomalies_total.inc();
                tracing::warn!(
                    value = sample.value,
                    z_score = snapshot.z_score,
                    mean = snapshot.mean,
                    std_dev = snapshot.std_dev,
                    "anomaly detected"
                );
            }

            let store = Arc::clone(&self.store);
            let metrics = Arc::clone(&self.metrics);
            let save_timeout = self.save_timeout;
            let ttl = self.sample_ttl;
            tokio::spawn(async move {
                let key = sample.storage_key();
                match tokio::time::timeout(save_timeout, store.save(&key, &sample, ttl)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        metrics.persistence_failures_total.inc();
                        tracing::debug!(key = %key, error = %e, "sample persistence failed");
                    }
                    Err(_) => {
                        metrics.persistence_failures_total.inc();
                        tracing::debug!(key = %key, timeout_ms = save_timeout.as_millis() as u64, "sample persistence timed out");
                    }
                }
            });
        }
        tracing::info!("ingestion loop stopped, buffer closed and drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::IngestBuffer;
    use crate::error::{Error, Result};
    use crate::sample::Sample;
    use crate::store::NoopStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[allow(clippy::unwrap_used)]
    fn test_metrics() -> Arc<ServiceMetrics> {
        Arc::new(ServiceMetrics::new().unwrap())
    }

    /// Records the keys of every save it sees.
    struct RecordingStore {
        keys: Mutex<Vec<String>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                keys: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SampleStore for RecordingStore {
        async fn save(&self, key: &str, _sample: &Sample, _ttl: Duration) -> Result<()> {
            self.keys.lock().push(key.to_string());
            Ok(())
        }
    }

    /// Never completes within any reasonable deadline.
    struct StalledStore;

    #[async_trait]
    impl SampleStore for StalledStore {
        async fn save(&self, _key: &str, _sample: &Sample, _ttl: Duration) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    /// Fails every save.
    struct FailingStore;

    #[async_trait]
    impl SampleStore for FailingStore {
        async fn save(&self, _key: &str, _sample: &Sample, _ttl: Duration) -> Result<()> {
            Err(Error::Storage("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_loop_drains_and_analyzes_all_samples() {
        let (buffer, drain) = IngestBuffer::new(16);
        let analyzer = Arc::new(StreamingAnalyzer::new(10));
        let metrics = test_metrics();
        let store = Arc::new(RecordingStore::new());

        for v in [1.0, 2.0, 3.0, 4.0] {
            buffer.try_enqueue(Sample::new(v)).expect("enqueue");
        }
        buffer.close();

        let ingest = IngestionLoop::new(
            Arc::clone(&analyzer),
            Arc::clone(&store) as Arc<dyn SampleStore>,
            Arc::clone(&metrics),
            Duration::from_millis(100),
            Duration::from_secs(600),
        );
        ingest.run(drain).await;

        let snapshot = analyzer.snapshot();
        assert_eq!(snapshot.count, 4);
        assert_eq!(snapshot.last_value, 4.0);
        assert_eq!(metrics.samples_ingested_total.get(), 4);

        // Saves are spawned; give them a beat to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.keys.lock().len(), 4);
    }

    #[tokio::test]
    async fn test_anomaly_increments_counter() {
        let (buffer, drain) = IngestBuffer::new(16);
        let analyzer = Arc::new(StreamingAnalyzer::new(10));
        let metrics = test_metrics();

        for _ in 0..5 {
            buffer.try_enqueue(Sample::new(100.0)).expect("enqueue");
        }
        buffer.try_enqueue(Sample::new(200.0)).expect("enqueue");
        buffer.close();

        let ingest = IngestionLoop::new(
            Arc::clone(&analyzer),
            Arc::new(NoopStore),
            Arc::clone(&metrics),
            Duration::from_millis(100),
            Duration::from_secs(600),
        );
        ingest.run(drain).await;

        assert_eq!(metrics.anomalies_total.get(), 1);
        assert_eq!(metrics.samples_ingested_total.get(), 6);
    }

    #[tokio::test]
    async fn test_slow_store_does_not_stall_drain() {
        let (buffer, drain) = IngestBuffer::new(16);
        let analyzer = Arc::new(StreamingAnalyzer::new(10));
        let metrics = test_metrics();

        for v in [1.0, 2.0, 3.0] {
            buffer.try_enqueue(Sample::new(v)).expect("enqueue");
        }
        buffer.close();

        let ingest = IngestionLoop::new(
            Arc::clone(&analyzer),
            Arc::new(StalledStore),
            Arc::clone(&metrics),
            Duration::from_millis(10),
            Duration::from_secs(600),
        );

        // The store sleeps for a minute per save; the loop must still finish
        // promptly because persistence runs off the hot path.
        let result = tokio::time::timeout(Duration::from_secs(2), ingest.run(drain)).await;
        assert!(result.is_ok(), "loop stalled behind a slow store");
        assert_eq!(analyzer.snapshot().count, 3);

        // Each save hits the 10ms deadline and counts as a failure.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(metrics.persistence_failures_total.get(), 3);
    }

    #[tokio::test]
    async fn test_store_error_counted_but_ingestion_continues() {
        let (buffer, drain) = IngestBuffer::new(16);
        let analyzer = Arc::new(StreamingAnalyzer::new(10));
        let metrics = test_metrics();

        buffer.try_enqueue(Sample::new(5.0)).expect("enqueue");
        buffer.try_enqueue(Sample::new(6.0)).expect("enqueue");
        buffer.close();

        let ingest = IngestionLoop::new(
            Arc::clone(&analyzer),
            Arc::new(FailingStore),
            Arc::clone(&metrics),
            Duration::from_millis(100),
            Duration::from_secs(600),
        );
        ingest.run(drain).await;

        assert_eq!(analyzer.snapshot().count, 2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(metrics.persistence_failures_total.get(), 2);
    }
}
