use crate::results::JobDetail;
use crate::utils::cache_key;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File-backed cache of job details, one JSON file per job
///
/// Entries are keyed by the last path segment of the job URL and expire
/// once their file is older than the configured TTL.
#[derive(Debug, Clone)]
pub struct DetailCache {
    dir: PathBuf,
    ttl: Duration,
}

impl DetailCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `job_url`
    pub fn entry_path(&self, job_url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", cache_key(job_url)))
    }

    /// Cached detail for `job_url`, if present and younger than the TTL
    ///
    /// Unreadable or corrupt entries count as misses.
    pub async fn get(&self, job_url: &str) -> Option<JobDetail> {
        let path = self.entry_path(job_url);

        let modified = tokio::fs::metadata(&path).await.ok()?.modified().ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            ::log::trace!("Cache entry {} expired ({:?} old)", path.display(), age);
            return None;
        }

        let contents = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&contents) {
            Ok(detail) => Some(detail),
            Err(e) => {
                ::log::debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Stores `detail` for `job_url`, replacing any previous entry
    pub async fn put(&self, job_url: &str, detail: &JobDetail) -> Result<(), CacheError> {
        let path = self.entry_path(job_url);
        let io_error = |source| CacheError::Io {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(io_error)?;

        let json = serde_json::to_vec_pretty(detail)?;
        tokio::fs::write(&path, json).await.map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scratch_dir;

    fn sample_detail() -> JobDetail {
        let mut detail = JobDetail::default();
        detail
            .fields
            .insert("Job Profile".to_string(), "Rust Developer".to_string());
        detail
            .fields
            .insert("Salary/CTC".to_string(), "₹ 6,00,000 - 9,00,000 /year".to_string());
        detail.sections.insert(
            "About the job".to_string(),
            "Key responsibilities:\n\n1. Ship code".to_string(),
        );
        detail
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let dir = scratch_dir();
        let cache = DetailCache::new(dir.path(), Duration::from_secs(21_600));
        let url = "https://internshala.com/job/detail/rust-developer-job-42";
        let detail = sample_detail();

        assert!(cache.get(url).await.is_none());
        cache.put(url, &detail).await.unwrap();
        assert_eq!(cache.get(url).await, Some(detail));
        assert!(cache.entry_path(url).ends_with("rust-developer-job-42.json"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let dir = scratch_dir();
        let cache = DetailCache::new(dir.path(), Duration::from_secs(21_600));
        let url = "https://internshala.com/job/detail/old-job-7";
        cache.put(url, &sample_detail()).await.unwrap();

        let seven_hours_ago = SystemTime::now() - Duration::from_secs(7 * 3600);
        std::fs::File::options()
            .write(true)
            .open(cache.entry_path(url))
            .unwrap()
            .set_modified(seven_hours_ago)
            .unwrap();

        assert!(cache.get(url).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = scratch_dir();
        let cache = DetailCache::new(dir.path(), Duration::from_secs(60));
        let url = "https://internshala.com/job/detail/broken";
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.entry_path(url), b"{not json").unwrap();

        assert!(cache.get(url).await.is_none());
    }

    #[tokio::test]
    async fn test_scratch_cache_is_removed_with_its_guard() {
        let dir = scratch_dir();
        let root = dir.path().to_path_buf();
        let cache = DetailCache::new(root.join("nested"), Duration::from_secs(60));
        let url = "https://internshala.com/job/detail/short-lived";
        cache.put(url, &sample_detail()).await.unwrap();
        assert!(cache.entry_path(url).exists());

        drop(dir);
        assert!(!root.exists());
    }
}
