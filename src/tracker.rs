use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// Remembers which job URLs each listing page showed last time
///
/// Only the latest snapshot per page is kept. A URL that drops off a page
/// and later comes back is reported as new again.
#[derive(Debug, Default)]
pub struct PageStateTracker {
    snapshots: HashMap<usize, HashSet<String>>,
}

impl PageStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the URLs now on `page` and returns those absent from its
    /// previous snapshot
    ///
    /// The snapshot is replaced, never merged.
    pub fn record_seen(&mut self, page: usize, urls: HashSet<String>) -> HashSet<String> {
        let new_urls = match self.snapshots.get(&page) {
            Some(previous) => urls.difference(previous).cloned().collect(),
            None => urls.clone(),
        };

        self.snapshots.insert(page, urls);
        new_urls
    }

    /// Last snapshot for `page`
    pub fn snapshot(&self, page: usize) -> Option<&HashSet<String>> {
        self.snapshots.get(&page)
    }

    pub fn has_seen(&self, page: usize) -> bool {
        self.snapshots.contains_key(&page)
    }

    /// Number of pages with a snapshot
    pub fn pages(&self) -> usize {
        self.snapshots.len()
    }
}

/// Job URLs that have been enriched and stored at least once this run
///
/// Grows only. Safe to share between the dispatcher's workers.
#[derive(Debug, Default)]
pub struct ProcessedUrls {
    urls: Mutex<HashSet<String>>,
}

impl ProcessedUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the set with identifiers already in the store
    pub fn with_known<I>(known: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            urls: Mutex::new(known.into_iter().collect()),
        }
    }

    /// Adds `url`; returns `false` if it was already present
    pub fn insert(&self, url: &str) -> bool {
        self.lock().insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
