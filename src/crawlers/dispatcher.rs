use crate::crawlers::detail::DetailEnricher;
use crate::crawlers::driver::PageDriver;
use crate::crawlers::pool::DriverPool;
use crate::results::{DetailOutcome, JobRecord};
use crate::sink::{JobSink, UpsertOutcome};
use crate::tracker::ProcessedUrls;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Counts from one dispatch round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub dispatched: usize,
    pub enriched: usize,
    pub stored: usize,
    pub failed: usize,
}

/// Fans job records out to pooled sessions for enrichment and storage
pub struct Dispatcher<D, S> {
    pool: Arc<DriverPool<D>>,
    enricher: Arc<DetailEnricher>,
    sink: Arc<S>,
    processed: Arc<ProcessedUrls>,
}

impl<D, S> Dispatcher<D, S>
where
    D: PageDriver,
    S: JobSink,
{
    pub fn new(
        pool: Arc<DriverPool<D>>,
        enricher: DetailEnricher,
        sink: Arc<S>,
        processed: Arc<ProcessedUrls>,
    ) -> Self {
        Self {
            pool,
            enricher: Arc::new(enricher),
            sink,
            processed,
        }
    }

    pub fn pool(&self) -> &Arc<DriverPool<D>> {
        &self.pool
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn processed(&self) -> &Arc<ProcessedUrls> {
        &self.processed
    }

    /// Enriches and stores every record, at most one per pooled session
    ///
    /// Returns once all records are finished. Results are handled in
    /// completion order; a failing record never affects the others. A URL
    /// joins the processed set only after its record was stored.
    pub async fn dispatch(&self, records: Vec<JobRecord>) -> DispatchSummary {
        let total = records.len();
        let mut summary = DispatchSummary {
            dispatched: total,
            ..DispatchSummary::default()
        };
        if total == 0 {
            return summary;
        }

        ::log::info!(
            "Processing {} jobs with {} browser sessions",
            total,
            self.pool.size()
        );

        let mut tasks = JoinSet::new();
        for record in records {
            let pool = Arc::clone(&self.pool);
            let enricher = Arc::clone(&self.enricher);
            let sink = Arc::clone(&self.sink);
            let processed = Arc::clone(&self.processed);

            tasks.spawn(async move {
                let mut record = record;

                let detail = match pool.checkout().await {
                    Ok(driver) => enricher.enrich(&*driver, &record.url).await,
                    Err(e) => DetailOutcome::Failed(format!("Error scraping job details: {}", e)),
                };
                record.detailed_info = Some(detail);

                let stored = sink.upsert(&record).await;
                if stored.is_stored() {
                    processed.insert(&record.url);
                }

                (record, stored)
            });
        }

        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            done += 1;
            match joined {
                Ok((record, stored)) => {
                    if record.detail().is_some() {
                        summary.enriched += 1;
                    }
                    match stored {
                        UpsertOutcome::Failed(reason) => {
                            summary.failed += 1;
                            ::log::warn!("Job {} was not stored: {}", record.url, reason);
                        }
                        _ => summary.stored += 1,
                    }
                    ::log::info!("Processed job {}/{}: {}", done, total, record.title);
                    ::log::debug!("{}", record);
                }
                Err(e) => {
                    summary.failed += 1;
                    ::log::error!("Job worker {}/{} crashed: {}", done, total, e);
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DetailCache;
    use crate::testing::{FakeBrowser, FakeSession, MemorySink, detail_page, job_url, scratch_dir};
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    fn record(slug: &str) -> JobRecord {
        let mut record = JobRecord::unavailable();
        record.title = format!("Job {slug}");
        record.url = job_url(slug);
        record
    }

    fn dispatcher(
        browser: &FakeBrowser,
        sessions: usize,
        sink: Arc<MemorySink>,
    ) -> (TempDir, Dispatcher<FakeSession, MemorySink>) {
        let dir = scratch_dir();
        let pool = DriverPool::new((0..sessions).map(|_| browser.session()).collect());
        let enricher = DetailEnricher::new(
            DetailCache::new(dir.path(), Duration::from_secs(21_600)),
            Url::parse("https://internshala.com/").unwrap(),
            Duration::ZERO,
        );
        let dispatcher = Dispatcher::new(pool, enricher, sink, Arc::new(ProcessedUrls::new()));
        (dir, dispatcher)
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_pool() {
        let browser = FakeBrowser::with_latency(Duration::from_millis(5));
        let slugs = (0..12).map(|i| format!("job-{i}")).collect::<Vec<_>>();
        for slug in &slugs {
            browser.add_page(&job_url(slug), &detail_page(slug));
        }
        let sink = Arc::new(MemorySink::new());
        let (_cache, dispatcher) = dispatcher(&browser, 3, Arc::clone(&sink));

        let summary = dispatcher
            .dispatch(slugs.iter().map(|s| record(s)).collect())
            .await;

        assert_eq!(summary.dispatched, 12);
        assert_eq!(summary.enriched, 12);
        assert_eq!(summary.stored, 12);
        assert!(browser.peak_concurrency() <= 3);
        assert_eq!(dispatcher.pool().idle(), 3);
        assert_eq!(dispatcher.processed().len(), 12);
    }

    #[tokio::test]
    async fn test_failed_detail_is_still_stored() {
        let browser = FakeBrowser::new();
        browser.add_page(&job_url("good"), &detail_page("Good"));
        browser.fail_navigation(&job_url("bad"));
        let sink = Arc::new(MemorySink::new());
        let (_cache, dispatcher) = dispatcher(&browser, 2, Arc::clone(&sink));

        let summary = dispatcher
            .dispatch(vec![record("good"), record("bad")])
            .await;

        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.stored, 2);

        let bad = sink.stored(&job_url("bad")).unwrap();
        assert!(bad.detailed_info.as_ref().is_some_and(DetailOutcome::is_failure));
        let good = sink.stored(&job_url("good")).unwrap();
        assert_eq!(good.detail().and_then(|d| d.field("Job Profile")), Some("Good"));
    }

    #[tokio::test]
    async fn test_unstored_record_is_not_marked_processed() {
        let browser = FakeBrowser::new();
        browser.add_page(&job_url("a"), &detail_page("A"));
        browser.add_page(&job_url("b"), &detail_page("B"));
        let sink = Arc::new(MemorySink::new());
        sink.reject(&job_url("b"));
        let (_cache, dispatcher) = dispatcher(&browser, 2, Arc::clone(&sink));

        let summary = dispatcher.dispatch(vec![record("a"), record("b")]).await;

        assert_eq!(summary.stored, 1);
        assert_eq!(summary.failed, 1);
        assert!(dispatcher.processed().contains(&job_url("a")));
        assert!(!dispatcher.processed().contains(&job_url("b")));
    }

    #[tokio::test]
    async fn test_empty_batch_does_nothing() {
        let browser = FakeBrowser::new();
        let sink = Arc::new(MemorySink::new());
        let (_cache, dispatcher) = dispatcher(&browser, 1, Arc::clone(&sink));

        assert_eq!(dispatcher.dispatch(Vec::new()).await, DispatchSummary::default());
        assert_eq!(sink.upsert_count(), 0);
    }
}
