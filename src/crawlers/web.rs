use crate::crawlers::driver::{DriverError, PageDriver};
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::time::Duration;

/// Common local WebDriver endpoints tried when the configured one is down
const FALLBACK_WEBDRIVER_URLS: [&str; 3] = [
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4444", // Selenium / geckodriver default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// Navigation timeout applied to every session
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Browser session backed by a WebDriver server
#[derive(Clone)]
pub struct WebDriverSession {
    id: usize,
    client: Client,
}

impl WebDriverSession {
    /// Connects a new headless session, trying common fallback endpoints
    /// when `webdriver_url` is unreachable
    pub async fn connect(id: usize, webdriver_url: &str) -> Result<Self, DriverError> {
        let client = connect_to_webdriver(id, webdriver_url).await?;

        let timeouts = TimeoutConfiguration::new(None, Some(PAGE_LOAD_TIMEOUT), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            ::log::warn!("Session {} could not set page load timeout: {}", id, e);
        }

        Ok(Self { id, client })
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl PageDriver for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        ::log::trace!("Session {} navigating to {}", self.id, url);
        self.client.goto(url).await.map_err(command_error)
    }

    async fn wait_for_css(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(DriverError::Timeout {
                selector: selector.to_string(),
                timeout,
            }),
            Err(e) => Err(command_error(e)),
        }
    }

    async fn source(&self) -> Result<String, DriverError> {
        self.client.source().await.map_err(command_error)
    }

    async fn quit(&self) -> Result<(), DriverError> {
        ::log::debug!("Closing session {}", self.id);
        self.client.clone().close().await.map_err(command_error)
    }
}

/// Opens `count` sessions; any failure aborts and closes the ones
/// already opened
pub async fn connect_sessions(
    first_id: usize,
    count: usize,
    webdriver_url: &str,
) -> Result<Vec<WebDriverSession>, DriverError> {
    let mut sessions = Vec::with_capacity(count);

    for id in first_id..first_id + count {
        match WebDriverSession::connect(id, webdriver_url).await {
            Ok(session) => sessions.push(session),
            Err(e) => {
                for session in sessions {
                    let _ = session.quit().await;
                }
                return Err(e);
            }
        }
    }

    Ok(sessions)
}

/// Capabilities for a headless Chrome that does not wait for images or
/// stylesheets
fn headless_capabilities() -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": [
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-infobars",
                "--log-level=3",
            ]
        }),
    );
    caps.insert("pageLoadStrategy".to_string(), json!("eager"));
    caps
}

/// Connects to the WebDriver instance
async fn connect_to_webdriver(id: usize, webdriver_url: &str) -> Result<Client, DriverError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(headless_capabilities());

    let first_error = match builder.connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Session {} connected to WebDriver at {}", id, webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!(
                "Session {} failed to connect to WebDriver at {}: {}",
                id,
                webdriver_url,
                e
            );
            e.to_string()
        }
    };

    for url in FALLBACK_WEBDRIVER_URLS.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Session {} trying fallback WebDriver URL: {}", id, url);
        if let Ok(client) = builder.connect(url).await {
            ::log::debug!("Session {} connected to fallback WebDriver at {}", id, url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(DriverError::Connect {
        url: webdriver_url.to_string(),
        reason: first_error,
    })
}

/// Maps a WebDriver command error onto [`DriverError`]
fn command_error(error: CmdError) -> DriverError {
    let message = error.to_string();
    if message.contains("Unable to find session") || message.contains("invalid session id") {
        DriverError::SessionLost(message)
    } else {
        DriverError::Command(message)
    }
}
