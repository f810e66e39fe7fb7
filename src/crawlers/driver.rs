use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a browser session
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to connect to WebDriver at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    Timeout { selector: String, timeout: Duration },

    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("browser command failed: {0}")]
    Command(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// A single browser session the monitor can steer
///
/// Navigation mutates the session's current page; `source` always reads
/// whatever the session has rendered last.
#[async_trait]
pub trait PageDriver: Send + Sync + 'static {
    /// Navigate to `url`
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Block until an element matching the CSS `selector` exists, or fail
    /// with [`DriverError::Timeout`] after `timeout`
    async fn wait_for_css(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Rendered HTML of the current page
    async fn source(&self) -> Result<String, DriverError>;

    /// End the session
    async fn quit(&self) -> Result<(), DriverError>;
}

/// Quits every session in `sessions`, logging and ignoring errors
pub async fn close_all<'a, D, I>(sessions: I)
where
    D: PageDriver,
    I: IntoIterator<Item = &'a D>,
{
    for session in sessions {
        if let Err(e) = session.quit().await {
            ::log::debug!("Ignoring error while closing session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBrowser;

    #[tokio::test]
    async fn test_close_all_quits_each_session_once() {
        let browser = FakeBrowser::new();
        let sessions = (0..3).map(|_| browser.session()).collect::<Vec<_>>();

        close_all(&sessions).await;
        close_all(&sessions).await;

        assert_eq!(browser.closed_sessions(), 3);
        assert!(sessions[0].goto("https://internshala.com/jobs/").await.is_err());
    }
}
