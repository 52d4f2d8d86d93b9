//! Run configuration and tuning constants.

use std::time::Duration;

use clap::{Parser, ValueEnum};

// constants (used as defaults)
pub const LOGGING_INTERVAL_SECS: u64 = 5;

/// Maximum URL length (2048 characters). Longer URLs are never enqueued;
/// this matches common browser and server limits.
pub const MAX_URL_LENGTH: usize = 2048;

// Response and body size limits
/// Maximum response body size in bytes (2MB).
/// Bodies larger than this are truncated before HTML parsing.
pub const MAX_RESPONSE_BODY_SIZE: usize = 2 * 1024 * 1024;

// Redirect handling
/// Maximum number of redirect hops to follow.
/// Prevents infinite redirect loops and excessive request chains.
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Redirect chains at or above this many hops are reported at Critical severity.
pub const REDIRECT_CHAIN_CRITICAL_HOPS: usize = 3;

// URL structure thresholds
/// Paths with more than this many segments get a URL_STRUCTURE finding.
pub const URL_DEPTH_WARNING_SEGMENTS: usize = 5;

/// URLs longer than this many characters get a URL_STRUCTURE finding.
pub const URL_LENGTH_WARNING_CHARS: usize = 100;

/// Timeout for the robots.txt and sitemap fetches done during policy resolution.
pub const POLICY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent token. Sites match this against robots.txt groups, so it
/// identifies the auditor honestly rather than mimicking a browser.
pub const DEFAULT_USER_AGENT: &str = "seo_audit/0.1";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: human-readable format (default)
/// - `Json`: structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Audit configuration.
///
/// This struct is automatically generated by `clap` from the field attributes
/// and doubles as the library configuration type: the CLI parses it, library
/// callers construct it directly (or via `Default`).
///
/// # Examples
///
/// ```bash
/// # Basic usage
/// seo_audit https://example.com
///
/// # Shallow, fast audit
/// seo_audit https://example.com --max-depth 1 --max-pages 50
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "seo_audit",
    about = "Crawls a site and reports on-page and structural SEO findings."
)]
pub struct Config {
    /// Root URL to audit (http/https)
    #[arg(value_parser)]
    pub root_url: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Maximum crawl depth from the seed set (0 crawls only the seeds)
    #[arg(long, default_value_t = 3)]
    pub max_depth: u32,

    /// Maximum number of pages to fetch before ending the run as Partial
    #[arg(long, default_value_t = 200)]
    pub max_pages: usize,

    /// Maximum concurrent in-flight fetches
    ///
    /// Kept modest by default: the auditor hits a single host, and high
    /// concurrency mostly buys self-inflicted rate limiting.
    #[arg(long, default_value_t = 8)]
    pub max_concurrency: usize,

    /// Per-request timeout in seconds (the single retry doubles it)
    #[arg(long, default_value_t = 10)]
    pub timeout_seconds: u64,

    /// Wall-clock budget for the whole run in seconds
    #[arg(long, default_value_t = 120)]
    pub time_budget_seconds: u64,

    /// Minimum delay between requests to the same host, in milliseconds.
    /// When unset, the robots.txt Crawl-delay applies (or no delay).
    #[arg(long)]
    pub crawl_delay_ms: Option<u64>,

    /// HTTP User-Agent header value, also used as the robots.txt token
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Pages with a body smaller than this many bytes get a THIN_CONTENT finding
    #[arg(long, default_value_t = 2048)]
    pub thin_content_bytes: u64,

    /// Maximum number of sitemap documents to fetch during policy resolution
    #[arg(long, default_value_t = 5)]
    pub max_sitemaps: usize,

    /// Maximum total URLs taken from sitemaps
    #[arg(long, default_value_t = 500)]
    pub max_sitemap_urls: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            max_depth: 3,
            max_pages: 200,
            max_concurrency: 8,
            timeout_seconds: 10,
            time_budget_seconds: 120,
            crawl_delay_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            thin_content_bytes: 2048,
            max_sitemaps: 5,
            max_sitemap_urls: 500,
        }
    }
}

impl Config {
    /// Per-request timeout for the first attempt.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Escalated timeout used for the single retry.
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.saturating_mul(2))
    }

    /// Wall-clock budget for the whole run.
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_bounded() {
        let config = Config::default();
        assert!(config.max_concurrency > 0);
        assert!(config.max_pages > 0);
        assert!(config.time_budget() > Duration::ZERO);
    }

    #[test]
    fn test_retry_timeout_escalates() {
        let config = Config {
            timeout_seconds: 7,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(7));
        assert_eq!(config.retry_timeout(), Duration::from_secs(14));
    }

    #[test]
    fn test_cli_parsing_defaults() {
        let config = Config::parse_from(["seo_audit", "https://example.com"]);
        assert_eq!(config.root_url, "https://example.com");
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.max_concurrency, 8);
        assert!(config.crawl_delay_ms.is_none());
    }

    #[test]
    fn test_cli_parsing_overrides() {
        let config = Config::parse_from([
            "seo_audit",
            "https://example.com",
            "--max-depth",
            "0",
            "--crawl-delay-ms",
            "250",
        ]);
        assert_eq!(config.max_depth, 0);
        assert_eq!(config.crawl_delay_ms, Some(250));
    }
}
