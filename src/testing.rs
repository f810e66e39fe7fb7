//! In-process stand-ins for the browser and the job store

use crate::crawlers::driver::{DriverError, PageDriver};
use crate::results::JobRecord;
use crate::sink::{JobSink, SinkError, UpsertOutcome};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const BLANK_PAGE: &str = "<html><head></head><body></body></html>";

#[derive(Default)]
struct BrowserState {
    pages: Mutex<HashMap<String, String>>,
    broken: Mutex<HashSet<String>>,
    visits: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    closed: AtomicUsize,
    latency: Duration,
}

/// A fake web that any number of sessions browse
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<BrowserState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every navigation takes `latency`
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Arc::new(BrowserState {
                latency,
                ..BrowserState::default()
            }),
        }
    }

    pub fn add_page(&self, url: &str, html: &str) {
        self.state
            .pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub fn remove_page(&self, url: &str) {
        self.state.pages.lock().unwrap().remove(url);
    }

    /// Navigation to `url` fails with a command error
    pub fn fail_navigation(&self, url: &str) {
        self.state.broken.lock().unwrap().insert(url.to_string());
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            state: Arc::clone(&self.state),
            current: Mutex::new(None),
            quit: AtomicBool::new(false),
        }
    }

    /// Most sessions that were navigating at the same moment
    pub fn peak_concurrency(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn visit_count(&self) -> usize {
        self.state.visits.lock().unwrap().len()
    }

    /// How often `url` was navigated to
    pub fn visits(&self, url: &str) -> usize {
        self.state
            .visits
            .lock()
            .unwrap()
            .iter()
            .filter(|v| *v == url)
            .count()
    }

    pub fn closed_sessions(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

/// One browser session of a [`FakeBrowser`]
pub struct FakeSession {
    state: Arc<BrowserState>,
    current: Mutex<Option<String>>,
    quit: AtomicBool,
}

impl FakeSession {
    fn current_html(&self) -> Result<String, DriverError> {
        if self.quit.load(Ordering::SeqCst) {
            return Err(DriverError::SessionLost("session was closed".to_string()));
        }
        let current = self.current.lock().unwrap().clone();
        let pages = self.state.pages.lock().unwrap();
        Ok(current
            .and_then(|url| pages.get(&url).cloned())
            .unwrap_or_else(|| BLANK_PAGE.to_string()))
    }
}

#[async_trait]
impl PageDriver for FakeSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        if self.quit.load(Ordering::SeqCst) {
            return Err(DriverError::SessionLost("session was closed".to_string()));
        }

        let now = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(now, Ordering::SeqCst);
        self.state.visits.lock().unwrap().push(url.to_string());

        if !self.state.latency.is_zero() {
            tokio::time::sleep(self.state.latency).await;
        }
        self.state.active.fetch_sub(1, Ordering::SeqCst);

        if self.state.broken.lock().unwrap().contains(url) {
            return Err(DriverError::Command(format!("net::ERR_FAILED at {url}")));
        }

        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_css(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let html = self.current_html()?;
        let found = {
            let parsed = Selector::parse(selector).unwrap();
            Html::parse_document(&html).select(&parsed).next().is_some()
        };

        if found {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                selector: selector.to_string(),
                timeout,
            })
        }
    }

    async fn source(&self) -> Result<String, DriverError> {
        self.current_html()
    }

    async fn quit(&self) -> Result<(), DriverError> {
        if !self.quit.swap(true, Ordering::SeqCst) {
            self.state.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A listing page with one card per slug, linking to `/job/detail/{slug}`
pub fn listing_page(slugs: &[&str]) -> String {
    let cards = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<div class="individual_internship" id="individual_internship_{slug}">
  <div class="internship_meta">
    <a class="job-title-href" href="/job/detail/{slug}">Job {slug}</a>
    <div class="company_name">Company {slug}</div>
    <div class="detail-row-1">
      <p class="row-1-item locations"><span><a>Bangalore</a></span></p>
    </div>
  </div>
  <div class="color-labels">Today</div>
</div>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("<html><body>\n{cards}\n</body></html>")
}

/// A rendered job page for the profile `profile`
pub fn detail_page(profile: &str) -> String {
    format!(
        r#"<html><body>
<div class="individual_internship">
  <div class="profile">{profile}</div>
  <div class="company_name"><a href="/company/acme">Acme Labs</a></div>
</div>
<div class="buttons_container"><a href="/application/form/1">Apply now</a></div>
<div class="internship_details">
  <h2>About the job</h2>
  <div class="text-container">Write {profile} code.</div>
</div>
</body></html>"#
    )
}

/// Absolute URL of the job a [`listing_page`] card links to
pub fn job_url(slug: &str) -> String {
    format!("https://internshala.com/job/detail/{slug}")
}

/// A fresh, empty directory removed when the guard drops
pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("listing-monitor-")
        .tempdir()
        .unwrap()
}

/// Job store held in memory
#[derive(Default)]
pub struct MemorySink {
    jobs: Mutex<HashMap<String, JobRecord>>,
    rejected: Mutex<HashSet<String>>,
    upserts: AtomicUsize,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts of the job at `url` fail
    pub fn reject(&self, url: &str) {
        self.rejected.lock().unwrap().insert(url.to_string());
    }

    pub fn stored(&self, url: &str) -> Option<JobRecord> {
        self.jobs.lock().unwrap().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSink for MemorySink {
    async fn upsert(&self, record: &JobRecord) -> UpsertOutcome {
        self.upserts.fetch_add(1, Ordering::SeqCst);

        if self.rejected.lock().unwrap().contains(&record.url) {
            return UpsertOutcome::Failed("write rejected".to_string());
        }

        match self
            .jobs
            .lock()
            .unwrap()
            .insert(record.url.clone(), record.clone())
        {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        }
    }

    async fn known_identifiers(&self) -> Result<Vec<String>, SinkError> {
        Ok(self.jobs.lock().unwrap().keys().cloned().collect())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
