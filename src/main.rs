//! GIF feed publisher: one incremental run per invocation.
//! Discover candidates, admit new ones under the daily quota, rebuild the feed.
//!
//! See `README.md` for configuration keys.

use std::process::ExitCode;

use gif_feed_publisher::metrics::Metrics;
use gif_feed_publisher::{FeedConfig, Publisher};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default, JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gif_feed_publisher=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env locally; no-op in CI where env is injected.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = match FeedConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let metrics = match config.metrics_path {
        Some(_) => match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = ?e, "metrics recorder not installed");
                None
            }
        },
        None => None,
    };

    let publisher = match Publisher::from_config(config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let result = publisher.run(chrono::Utc::now()).await;

    if let (Some(m), Some(path)) = (&metrics, &publisher.config().metrics_path) {
        if let Err(e) = m.write_snapshot(path) {
            tracing::warn!(error = ?e, "metrics snapshot not written");
        }
    }

    match result {
        Ok(report) => {
            tracing::info!(
                accepted = report.accepted,
                published_today = report.published_today,
                window = report.window_len,
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
