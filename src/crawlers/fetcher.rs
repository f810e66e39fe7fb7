use crate::crawlers::driver::{DriverError, PageDriver};
use crate::parsers::listing::CARD_SELECTOR;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A listing page could not be loaded
#[derive(Debug, Error)]
#[error("failed to load listing page {page}: {source}")]
pub struct FetchError {
    pub page: usize,
    #[source]
    pub source: DriverError,
}

/// Loads numbered listing pages into a browser session
#[derive(Debug, Clone)]
pub struct PageFetcher {
    listing_url: Url,
    wait: Duration,
}

impl PageFetcher {
    pub fn new(listing_url: &str, wait: Duration) -> Result<Self, url::ParseError> {
        let mut listing_url = Url::parse(listing_url)?;

        // Page suffixes are joined relative to the listing directory
        if !listing_url.path().ends_with('/') {
            let path = format!("{}/", listing_url.path());
            listing_url.set_path(&path);
        }

        Ok(Self { listing_url, wait })
    }

    /// Address of the 1-based page `index`
    pub fn page_url(&self, index: usize) -> String {
        if index <= 1 {
            return self.listing_url.to_string();
        }

        let suffix = format!("page-{}/", index);
        match self.listing_url.join(&suffix) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.listing_url, suffix),
        }
    }

    /// Navigates `driver` to page `index` and waits for listing cards
    ///
    /// On success the caller reads the rendered page through
    /// [`PageDriver::source`]. A timeout means the page is empty or
    /// unavailable.
    pub async fn load<D: PageDriver>(&self, driver: &D, index: usize) -> Result<(), FetchError> {
        let url = self.page_url(index);
        ::log::debug!("Loading listing page {}: {}", index, url);

        let wrap = |source| FetchError {
            page: index,
            source,
        };

        driver.goto(&url).await.map_err(wrap)?;
        driver
            .wait_for_css(CARD_SELECTOR, self.wait)
            .await
            .map_err(wrap)
    }
}
