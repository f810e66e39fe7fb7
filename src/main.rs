use clap::Parser;
use listing_monitor::crawlers::close_all;
use listing_monitor::crawlers::pool::DriverPool;
use listing_monitor::crawlers::web::connect_sessions;
use listing_monitor::sink::{JobSink, SqliteSink};
use listing_monitor::tracker::ProcessedUrls;
use listing_monitor::{Monitor, MonitorConfig};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::watch;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let _args = Args::parse();

    let config = MonitorConfig::from_env()?;
    config.validate()?;
    ::log::info!("Monitoring {}", config.listing_url);

    // One session for listing pages plus the detail pool
    let mut sessions = connect_sessions(0, config.pool_size + 1, &config.webdriver_url).await?;
    let main_session = sessions.remove(0);
    ::log::info!("Created {} browser sessions", config.pool_size + 1);

    let sink = match SqliteSink::connect(&config.database_url, config.pool_size as u32).await {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            close_all(sessions.iter().chain(std::iter::once(&main_session))).await;
            return Err(e.into());
        }
    };

    let processed = match sink.known_identifiers().await {
        Ok(known) => {
            ::log::info!("Loaded {} existing job URLs from the store", known.len());
            ProcessedUrls::with_known(known)
        }
        Err(e) => {
            ::log::error!("Error loading existing jobs: {}", e);
            ProcessedUrls::new()
        }
    };

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ::log::info!("Monitoring stopped by user");
            let _ = stop.send(true);
        }
    });

    let pool = DriverPool::new(sessions);
    let mut monitor = match Monitor::new(
        config,
        main_session.clone(),
        Arc::clone(&pool),
        Arc::clone(&sink),
        Arc::new(processed),
        shutdown,
    ) {
        Ok(monitor) => monitor,
        Err(e) => {
            close_all(pool.drain().iter().chain(std::iter::once(&main_session))).await;
            sink.close().await;
            return Err(e.into());
        }
    };

    monitor.run().await;
    monitor.shutdown().await;

    Ok(())
}
