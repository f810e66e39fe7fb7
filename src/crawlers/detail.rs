use crate::cache::DetailCache;
use crate::crawlers::driver::PageDriver;
use crate::parsers::{self, CARD_SELECTOR};
use crate::results::DetailOutcome;
use std::time::Duration;
use url::Url;

/// Class name whose presence in the raw source means the job page rendered
const CONTAINER_MARKER: &str = "individual_internship";

/// Fetches and parses job pages, consulting the detail cache first
#[derive(Debug, Clone)]
pub struct DetailEnricher {
    cache: DetailCache,
    origin: Url,
    wait: Duration,
}

impl DetailEnricher {
    pub fn new(cache: DetailCache, origin: Url, wait: Duration) -> Self {
        Self {
            cache,
            origin,
            wait,
        }
    }

    pub fn cache(&self) -> &DetailCache {
        &self.cache
    }

    /// Detail for `job_url`, from cache when fresh, otherwise from the page
    ///
    /// Never fails outright: problems come back as [`DetailOutcome::Failed`].
    pub async fn enrich<D: PageDriver>(&self, driver: &D, job_url: &str) -> DetailOutcome {
        if let Some(cached) = self.cache.get(job_url).await {
            ::log::debug!("Using cached data for {}", job_url);
            return DetailOutcome::Detail(cached);
        }

        if let Err(e) = driver.goto(job_url).await {
            return DetailOutcome::Failed(format!("Error scraping job details: {}", e));
        }

        let waited = driver.wait_for_css(CARD_SELECTOR, self.wait).await;

        let html = match driver.source().await {
            Ok(html) => html,
            Err(e) => return DetailOutcome::Failed(format!("Error scraping job details: {}", e)),
        };

        if let Err(e) = waited {
            // The container can be present even when the wait gives up
            if !html.contains(CONTAINER_MARKER) {
                ::log::debug!("Job page {} did not render: {}", job_url, e);
                return DetailOutcome::Failed("Could not load job details page.".to_string());
            }
        }

        let Some(detail) = parsers::detail::parse(&html, &self.origin) else {
            return DetailOutcome::Failed("Could not find job details on the page.".to_string());
        };

        if let Err(e) = self.cache.put(job_url, &detail).await {
            ::log::warn!("Error saving {} to cache: {}", job_url, e);
        }

        DetailOutcome::Detail(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBrowser, detail_page, scratch_dir};
    use tempfile::TempDir;

    const JOB_URL: &str = "https://internshala.com/job/detail/rust-engineer-job-9";

    fn enricher() -> (TempDir, DetailEnricher) {
        let dir = scratch_dir();
        let enricher = DetailEnricher::new(
            DetailCache::new(dir.path(), Duration::from_secs(21_600)),
            Url::parse("https://internshala.com/").unwrap(),
            Duration::ZERO,
        );
        (dir, enricher)
    }

    #[tokio::test]
    async fn test_fetches_then_serves_from_cache() {
        let browser = FakeBrowser::new();
        browser.add_page(JOB_URL, &detail_page("Rust Engineer"));
        let driver = browser.session();
        let (_cache, enricher) = enricher();

        let first = enricher.enrich(&driver, JOB_URL).await;
        let detail = match &first {
            DetailOutcome::Detail(detail) => detail.clone(),
            DetailOutcome::Failed(reason) => panic!("unexpected failure: {reason}"),
        };
        assert_eq!(detail.field("Job Profile"), Some("Rust Engineer"));
        assert_eq!(browser.visits(JOB_URL), 1);

        let second = enricher.enrich(&driver, JOB_URL).await;
        assert_eq!(second, first);
        assert_eq!(browser.visits(JOB_URL), 1);
    }

    #[tokio::test]
    async fn test_missing_page_is_failure_string() {
        let browser = FakeBrowser::new();
        browser.add_page(JOB_URL, "<html><body><h1>Job closed</h1></body></html>");
        let (_cache, enricher) = enricher();

        let outcome = enricher.enrich(&browser.session(), JOB_URL).await;
        assert_eq!(
            outcome,
            DetailOutcome::Failed("Could not load job details page.".to_string())
        );
        assert!(enricher.cache().get(JOB_URL).await.is_none());
    }

    #[tokio::test]
    async fn test_marker_in_source_is_parsed_despite_timeout() {
        let browser = FakeBrowser::new();
        // Marker appears only as text, so the CSS wait times out
        browser.add_page(
            JOB_URL,
            "<html><body><p>individual_internship</p></body></html>",
        );
        let (_cache, enricher) = enricher();

        let outcome = enricher.enrich(&browser.session(), JOB_URL).await;
        assert_eq!(
            outcome,
            DetailOutcome::Failed("Could not find job details on the page.".to_string())
        );
    }

    #[tokio::test]
    async fn test_navigation_error_is_reported() {
        let browser = FakeBrowser::new();
        browser.fail_navigation(JOB_URL);
        let (_cache, enricher) = enricher();

        let outcome = enricher.enrich(&browser.session(), JOB_URL).await;
        match outcome {
            DetailOutcome::Failed(reason) => {
                assert!(reason.starts_with("Error scraping job details:"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
