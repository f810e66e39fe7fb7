use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a JSON configuration file
pub const CONFIG_ENV: &str = "LISTING_MONITOR_CONFIG";

/// Configuration for the listing monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Address of the first listing page; later pages append `page-N/`
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Number of browser sessions used for detail pages
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// How long to wait for listing cards to render
    #[serde(default = "default_page_wait_secs")]
    pub page_wait_secs: u64,

    /// How long to wait for a job page to render
    #[serde(default = "default_detail_wait_secs")]
    pub detail_wait_secs: u64,

    /// Pause after an initial-scan page that produced new records
    #[serde(default = "default_busy_page_delay_secs")]
    pub busy_page_delay_secs: u64,

    /// Pause after an initial-scan page with nothing new, and between
    /// pages while monitoring
    #[serde(default = "default_page_delay_secs")]
    pub page_delay_secs: u64,

    /// Pause between monitoring cycles
    #[serde(default = "default_cycle_delay_secs")]
    pub cycle_delay_secs: u64,

    /// Probe for pages past the known last page every this many cycles
    #[serde(default = "default_probe_every_cycles")]
    pub probe_every_cycles: u64,

    /// Upper bound on extra pages discovered by one probe
    #[serde(default = "default_max_probe_pages")]
    pub max_probe_pages: usize,

    /// Upper bound on pages visited by the initial scan
    #[serde(default = "default_max_scan_pages")]
    pub max_scan_pages: usize,

    /// Directory holding cached job details
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Age after which a cached job detail is fetched again
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// sqlx connection string for the job store
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl MonitorConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration from the environment
    ///
    /// Starts from the file named by `LISTING_MONITOR_CONFIG` (or the
    /// defaults) and applies `WEBDRIVER_URL` / `DATABASE_URL` overrides.
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => {
                ::log::info!("Loading configuration from {}", path);
                Self::from_file(path)?
            }
            _ => Self::default(),
        };

        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            if !database_url.is_empty() {
                config.database_url = database_url;
            }
        }

        Ok(config)
    }

    /// Reject settings the monitor cannot run with
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.pool_size == 0 {
            return Err("pool_size must be at least 1".into());
        }
        if self.probe_every_cycles == 0 {
            return Err("probe_every_cycles must be at least 1".into());
        }
        url::Url::parse(&self.listing_url)
            .map_err(|e| format!("invalid listing_url {}: {}", self.listing_url, e))?;
        Ok(())
    }

    pub fn page_wait(&self) -> Duration {
        Duration::from_secs(self.page_wait_secs)
    }

    pub fn detail_wait(&self) -> Duration {
        Duration::from_secs(self.detail_wait_secs)
    }

    pub fn busy_page_delay(&self) -> Duration {
        Duration::from_secs(self.busy_page_delay_secs)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_secs(self.page_delay_secs)
    }

    pub fn cycle_delay(&self) -> Duration {
        Duration::from_secs(self.cycle_delay_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            webdriver_url: default_webdriver_url(),
            pool_size: default_pool_size(),
            page_wait_secs: default_page_wait_secs(),
            detail_wait_secs: default_detail_wait_secs(),
            busy_page_delay_secs: default_busy_page_delay_secs(),
            page_delay_secs: default_page_delay_secs(),
            cycle_delay_secs: default_cycle_delay_secs(),
            probe_every_cycles: default_probe_every_cycles(),
            max_probe_pages: default_max_probe_pages(),
            max_scan_pages: default_max_scan_pages(),
            cache_dir: default_cache_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            database_url: default_database_url(),
        }
    }
}

fn default_listing_url() -> String {
    "https://internshala.com/jobs/".to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_page_wait_secs() -> u64 {
    10
}

fn default_detail_wait_secs() -> u64 {
    5
}

fn default_busy_page_delay_secs() -> u64 {
    5
}

fn default_page_delay_secs() -> u64 {
    2
}

fn default_cycle_delay_secs() -> u64 {
    180
}

fn default_probe_every_cycles() -> u64 {
    5
}

fn default_max_probe_pages() -> usize {
    50
}

fn default_max_scan_pages() -> usize {
    1000
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("job_cache")
}

/// Six hours
fn default_cache_ttl_secs() -> u64 {
    21_600
}

fn default_database_url() -> String {
    "sqlite:listings.db?mode=rwc".to_string()
}
