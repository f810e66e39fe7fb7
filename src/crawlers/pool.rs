use std::ops::Deref;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("driver pool has been closed")]
    Closed,

    #[error("driver pool is empty despite a free slot")]
    Exhausted,
}

/// Fixed set of reusable browser sessions
///
/// At most `size` sessions are checked out at once, and a session is never
/// handed to two holders simultaneously. Checked-out sessions return to the
/// pool when their [`PooledDriver`] guard drops, whatever path the holder
/// took.
pub struct DriverPool<D> {
    drivers: Mutex<Vec<D>>,
    slots: Arc<Semaphore>,
    size: usize,
}

impl<D> DriverPool<D> {
    pub fn new(drivers: Vec<D>) -> Arc<Self> {
        let size = drivers.len();
        Arc::new(Self {
            drivers: Mutex::new(drivers),
            slots: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    /// Number of sessions the pool was created with
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of sessions currently idle in the pool
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    /// Waits for a free session and takes it out of the pool
    pub async fn checkout(self: &Arc<Self>) -> Result<PooledDriver<D>, PoolError> {
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let driver = self.lock().pop().ok_or(PoolError::Exhausted)?;

        Ok(PooledDriver {
            driver: Some(driver),
            pool: Arc::clone(self),
            _permit: permit,
        })
    }

    /// Closes the pool and hands back every idle session
    ///
    /// Waiting and future checkouts fail with [`PoolError::Closed`].
    pub fn drain(&self) -> Vec<D> {
        self.slots.close();
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<D>> {
        self.drivers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A session checked out of a [`DriverPool`]
pub struct PooledDriver<D> {
    driver: Option<D>,
    pool: Arc<DriverPool<D>>,
    _permit: OwnedSemaphorePermit,
}

impl<D> Deref for PooledDriver<D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.driver
            .as_ref()
            .expect("pooled driver is only taken on drop")
    }
}

impl<D> Drop for PooledDriver<D> {
    fn drop(&mut self) {
        // Return the session before the permit is released
        if let Some(driver) = self.driver.take() {
            self.pool.lock().push(driver);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBrowser;
    use crate::crawlers::PageDriver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_checkout_returns_driver_on_drop() {
        let pool = DriverPool::new(vec![1, 2]);
        assert_eq!(pool.idle(), 2);

        {
            let a = pool.checkout().await.unwrap();
            let b = pool.checkout().await.unwrap();
            assert_ne!(*a, *b);
            assert_eq!(pool.idle(), 0);
        }

        assert_eq!(pool.idle(), 2);
    }

    #[tokio::test]
    async fn test_driver_returned_when_holder_panics() {
        let pool = DriverPool::new(vec![7]);

        let worker_pool = Arc::clone(&pool);
        let handle = tokio::spawn(async move {
            let _driver = worker_pool.checkout().await.unwrap();
            panic!("worker failed");
        });
        assert!(handle.await.is_err());

        assert_eq!(pool.idle(), 1);
        assert_eq!(*pool.checkout().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_never_exceeds_pool_size() {
        let browser = FakeBrowser::with_latency(Duration::from_millis(5));
        let sessions = (0..3).map(|_| browser.session()).collect::<Vec<_>>();
        let pool = DriverPool::new(sessions);

        let holders = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..20 {
            let pool = Arc::clone(&pool);
            let holders = Arc::clone(&holders);
            let peak = Arc::clone(&peak);
            tasks.spawn(async move {
                let driver = pool.checkout().await.unwrap();
                let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                driver.goto(&format!("https://example.com/{i}")).await.unwrap();

                holders.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(browser.peak_concurrency() <= 3);
        assert_eq!(browser.visit_count(), 20);
        assert_eq!(pool.idle(), 3);
    }

    #[tokio::test]
    async fn test_drain_closes_pool() {
        let pool = DriverPool::new(vec!["a", "b"]);
        let drained = pool.drain();

        assert_eq!(drained.len(), 2);
        assert!(matches!(pool.checkout().await, Err(PoolError::Closed)));
    }
}
