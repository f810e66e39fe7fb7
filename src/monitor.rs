use crate::cache::DetailCache;
use crate::config::MonitorConfig;
use crate::crawlers::detail::DetailEnricher;
use crate::crawlers::dispatcher::Dispatcher;
use crate::crawlers::driver::{PageDriver, close_all};
use crate::crawlers::fetcher::{FetchError, PageFetcher};
use crate::crawlers::pool::DriverPool;
use crate::parsers::ListingParser;
use crate::results::JobRecord;
use crate::sink::JobSink;
use crate::tracker::{PageStateTracker, ProcessedUrls};
use chrono::{Local, TimeDelta};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Where the monitor is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InitialScan,
    Monitoring { cycle: u64 },
    ShutDown,
}

/// Watches the listing pages and feeds new jobs to the dispatcher
///
/// Listing pages are fetched one at a time with a dedicated session; only
/// detail enrichment runs in parallel, on the pooled sessions. The loop
/// stops between pages or during a pause once the shutdown signal is set.
pub struct Monitor<D, S> {
    config: MonitorConfig,
    driver: D,
    fetcher: PageFetcher,
    parser: ListingParser,
    tracker: PageStateTracker,
    dispatcher: Dispatcher<D, S>,
    shutdown: watch::Receiver<bool>,
    phase: Phase,
    max_pages: usize,
    dispatched: usize,
}

impl<D, S> Monitor<D, S>
where
    D: PageDriver,
    S: JobSink,
{
    /// `driver` loads listing pages; `pool` serves the job pages
    pub fn new(
        config: MonitorConfig,
        driver: D,
        pool: Arc<DriverPool<D>>,
        sink: Arc<S>,
        processed: Arc<ProcessedUrls>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, url::ParseError> {
        let fetcher = PageFetcher::new(&config.listing_url, config.page_wait())?;
        let origin = url::Url::parse(&config.listing_url)?;

        let enricher = DetailEnricher::new(
            DetailCache::new(config.cache_dir.clone(), config.cache_ttl()),
            origin.clone(),
            config.detail_wait(),
        );

        Ok(Self {
            fetcher,
            parser: ListingParser::new(origin),
            tracker: PageStateTracker::new(),
            dispatcher: Dispatcher::new(pool, enricher, sink, processed),
            driver,
            shutdown,
            phase: Phase::InitialScan,
            max_pages: 0,
            dispatched: 0,
            config,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last listing page known to exist
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Records dispatched since the monitor started
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn tracker(&self) -> &PageStateTracker {
        &self.tracker
    }

    /// Runs the initial scan, then monitoring cycles until shutdown
    pub async fn run(&mut self) {
        ::log::info!("=== INITIAL SCAN OF ALL PAGES ===");
        self.initial_scan().await;

        ::log::info!("=== STARTING REAL-TIME MONITORING ===");
        let mut cycle = 1;
        while !self.is_shutting_down() {
            self.phase = Phase::Monitoring { cycle };
            ::log::info!(
                "Monitoring cycle #{} at {}",
                cycle,
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );

            let found = self.monitor_cycle().await;
            if found > 0 {
                ::log::info!("Found {} new jobs in monitoring cycle #{}", found, cycle);
            } else {
                ::log::info!("No new jobs found in monitoring cycle #{}", cycle);
            }

            if self.is_shutting_down() {
                break;
            }

            if cycle % self.config.probe_every_cycles == 0 {
                ::log::info!("Checking for pages past page {}", self.max_pages);
                let added = self.probe_new_pages().await;
                if added > 0 {
                    ::log::info!(
                        "Found {} new pages, now watching {} pages",
                        added,
                        self.max_pages
                    );
                } else {
                    ::log::info!("No new pages found");
                }
            }

            let delay = self.config.cycle_delay();
            let next = Local::now() + TimeDelta::from_std(delay).unwrap_or(TimeDelta::zero());
            ::log::info!(
                "Waiting {}s before next cycle; next check at {}",
                delay.as_secs(),
                next.format("%Y-%m-%d %H:%M:%S")
            );

            if !self.pause(delay).await {
                break;
            }
            cycle += 1;
        }
    }

    /// Visits pages from 1 until one has no jobs, dispatching everything new
    ///
    /// Returns the number of pages found; that becomes the range watched by
    /// [`Monitor::monitor_cycle`].
    pub async fn initial_scan(&mut self) -> usize {
        self.phase = Phase::InitialScan;

        for page in 1..=self.config.max_scan_pages {
            if self.is_shutting_down() {
                break;
            }
            let started = Instant::now();

            let records = match self.scrape(page).await {
                Ok(records) if !records.is_empty() => records,
                Ok(_) => {
                    ::log::info!("No jobs on page {}, initial scan complete", page);
                    break;
                }
                Err(e) => {
                    ::log::info!("{}; initial scan complete", e);
                    break;
                }
            };

            let dispatched = self.process_page(page, records).await;
            self.max_pages = page;
            ::log::info!(
                "Scanned page {} in {:.2} seconds",
                page,
                started.elapsed().as_secs_f64()
            );

            let delay = if dispatched > 0 {
                self.config.busy_page_delay()
            } else {
                self.config.page_delay()
            };
            if !self.pause(delay).await {
                break;
            }
        }

        ::log::info!("Initial scan found {} pages", self.max_pages);
        self.max_pages
    }

    /// One pass over every known page; returns the number of jobs dispatched
    ///
    /// A page that fails to load or shows no jobs is skipped and keeps its
    /// previous snapshot.
    pub async fn monitor_cycle(&mut self) -> usize {
        let mut dispatched = 0;

        for page in 1..=self.max_pages {
            if self.is_shutting_down() {
                break;
            }
            let started = Instant::now();

            match self.scrape(page).await {
                Ok(records) if !records.is_empty() => {
                    dispatched += self.process_page(page, records).await;
                }
                Ok(_) => ::log::warn!("No job data found on page {}", page),
                Err(e) => ::log::warn!("{}", e),
            }
            ::log::debug!(
                "Checked page {} in {:.2} seconds",
                page,
                started.elapsed().as_secs_f64()
            );

            if page < self.max_pages && !self.pause(self.config.page_delay()).await {
                break;
            }
        }

        dispatched
    }

    /// Looks for listing pages past the last known one
    ///
    /// Stops at the first page that does not load, or after
    /// `max_probe_pages` new pages. Returns how many pages were added.
    pub async fn probe_new_pages(&mut self) -> usize {
        let mut added = 0;

        while added < self.config.max_probe_pages && !self.is_shutting_down() {
            let page = self.max_pages + 1;
            if let Err(e) = self.fetcher.load(&self.driver, page).await {
                ::log::debug!("Probe stopped: {}", e);
                break;
            }
            self.max_pages = page;
            added += 1;
        }

        added
    }

    /// Releases every browser session and the job store
    ///
    /// Errors while quitting sessions are logged and ignored. Returns the
    /// number of unique jobs processed.
    pub async fn shutdown(mut self) -> usize {
        self.phase = Phase::ShutDown;

        let sessions = self.dispatcher.pool().drain();
        close_all(sessions.iter().chain(std::iter::once(&self.driver))).await;
        ::log::info!("All browser sessions closed");

        self.dispatcher.sink().close().await;

        let total = self.dispatcher.processed().len();
        ::log::info!("Total unique jobs processed: {}", total);
        total
    }

    async fn scrape(&self, page: usize) -> Result<Vec<JobRecord>, FetchError> {
        self.fetcher.load(&self.driver, page).await?;
        let html = self
            .driver
            .source()
            .await
            .map_err(|source| FetchError { page, source })?;
        Ok(self.parser.parse(&html))
    }

    /// Diffs the page against its last snapshot and dispatches new jobs
    async fn process_page(&mut self, page: usize, records: Vec<JobRecord>) -> usize {
        let first_visit = !self.tracker.has_seen(page);
        let seen = records
            .iter()
            .filter_map(JobRecord::identity)
            .map(str::to_string)
            .collect::<HashSet<_>>();
        let new_urls = self.tracker.record_seen(page, seen);

        let processed = self.dispatcher.processed();
        let mut queued = HashSet::new();
        let candidates = records
            .into_iter()
            .filter(|record| match record.identity() {
                Some(url) if record.has_title() => {
                    new_urls.contains(url) && !processed.contains(url) && queued.insert(url.to_string())
                }
                _ => false,
            })
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            if !first_visit {
                ::log::info!("No new jobs found on page {}", page);
            }
            return 0;
        }

        ::log::info!(
            "Processing {} new jobs from page {}",
            candidates.len(),
            page
        );
        let summary = self.dispatcher.dispatch(candidates).await;
        if summary.failed > 0 {
            ::log::warn!(
                "{} of {} jobs from page {} were not stored",
                summary.failed,
                summary.dispatched,
                page
            );
        }

        self.dispatched += summary.dispatched;
        summary.dispatched
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Sleeps for `delay`; returns `false` if shutdown was requested
    async fn pause(&self, delay: Duration) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        if delay.is_zero() {
            return true;
        }

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_shutting_down(),
            _ = wait_for_shutdown(&mut shutdown) => false,
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender can never request shutdown
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
