//! Tracing subscriber setup shared by the binaries.
//!
//! `SITEDB_LOG` takes precedence over `logging.level` and accepts any
//! `EnvFilter` directive; `SITEDB_LOG_JSON=1` forces JSON output.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber. Output goes to stderr so stdout stays
/// free for results. Calling it twice is harmless.
pub fn init_tracing(config: &LoggingConfig) {
    let json = env::var("SITEDB_LOG_JSON")
        .ok()
        .map_or_else(|| config.format == "json", |v| v != "0");
    let level = env::var("SITEDB_LOG").unwrap_or_else(|_| config.level.clone());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let base = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if json {
        Box::new(base.json().finish())
    } else {
        Box::new(base.compact().finish())
    };
    let _ = tracing::subscriber::set_global_default(subscriber);
}
