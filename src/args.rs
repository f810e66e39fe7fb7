use clap::Parser;

/// Settings come from the environment: `LISTING_MONITOR_CONFIG` names a
/// JSON config file, `WEBDRIVER_URL` and `DATABASE_URL` override single
/// fields and `RUST_LOG` sets the log level.
#[derive(Parser, Debug)]
#[command(name = "listing-monitor")]
#[command(about = "Watches job listing pages and stores every new job with its details")]
#[command(version)]
pub struct Args {}
