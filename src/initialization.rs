//! Process-level setup: logger, shared HTTP client, concurrency limiter.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::ClientBuilder;
use tokio::sync::Semaphore;

use crate::config::{Config, LogFormat, LogLevel};
use crate::error_handling::InitializationError;

/// Initializes the global logger at the requested level and format.
///
/// Callable once per process; embedding applications that install their own
/// logger should skip this and the crate logs through theirs.
pub fn init_logger_with(level: LogLevel, format: LogFormat) -> Result<(), InitializationError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.into());

    if matches!(format, LogFormat::Json) {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{{\"ts\":\"{}\",\"level\":\"{}\",\"target\":\"{}\",\"message\":{:?}}}",
                chrono::Utc::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args().to_string()
            )
        });
    }

    builder.try_init()?;
    Ok(())
}

/// Builds the shared HTTP client.
///
/// Automatic redirect following is disabled: the fetcher walks redirect hops
/// itself so every intermediate URL lands in the recorded chain. Per-request
/// timeouts are set at the call sites, so only the connect timeout lives here.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .redirect(Policy::none())
        .user_agent(config.user_agent.clone())
        .connect_timeout(Duration::from_secs(10))
        .build()?;
    Ok(Arc::new(client))
}

/// Creates the semaphore that caps concurrent in-flight fetches.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}
