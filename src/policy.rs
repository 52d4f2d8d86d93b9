//! Crawl policy resolution: robots.txt plus sitemap discovery.
//!
//! Policy failures never abort the run. An unreachable or malformed
//! robots.txt degrades to a permissive policy with a logged warning, and each
//! sitemap is fetched and parsed independently so one broken document does
//! not cost the others.

use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use url::Url;

use crate::config::{Config, POLICY_FETCH_TIMEOUT};
use crate::models::DiscoverySource;
use crate::robots::RobotsTxt;
use crate::sitemap::parse_sitemap;
use crate::urlnorm::{normalize_absolute, same_host};

/// Fallback sitemap locations probed when robots.txt declares none.
const FALLBACK_SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Read-only crawl policy, derived once before the crawl starts.
#[derive(Debug, Default)]
pub struct CrawlPolicy {
    robots: RobotsTxt,
    user_agent: String,
    crawl_delay: Duration,
    /// Normalized sitemap-declared page URLs (for orphan detection).
    sitemap_urls: HashSet<String>,
    /// Non-fatal problems hit during resolution, surfaced in run metadata.
    pub warnings: Vec<String>,
}

impl CrawlPolicy {
    /// Whether the policy allows fetching `url`.
    ///
    /// Robots patterns match the path plus the query string when one is
    /// present (`Disallow: /*?sort=` style rules).
    pub fn is_allowed(&self, url: &Url) -> bool {
        match url.query() {
            Some(query) => {
                let target = format!("{}?{}", url.path(), query);
                self.robots.is_path_allowed(&target, &self.user_agent)
            }
            None => self.robots.is_path_allowed(url.path(), &self.user_agent),
        }
    }

    /// Minimum delay between two dispatches to the same host.
    pub fn crawl_delay(&self) -> Duration {
        self.crawl_delay
    }

    /// Whether `url` (normalized form) was declared in a sitemap.
    pub fn declared_in_sitemap(&self, url: &str) -> bool {
        self.sitemap_urls.contains(url)
    }

    pub fn sitemap_url_count(&self) -> usize {
        self.sitemap_urls.len()
    }

    /// Builds a policy around pre-parsed robots rules. Test-only: production
    /// policies come from [`resolve`].
    #[cfg(test)]
    pub fn with_robots_for_tests(robots: RobotsTxt, user_agent: &str) -> Self {
        Self {
            robots,
            user_agent: user_agent.to_string(),
            ..Default::default()
        }
    }

    /// Registers a sitemap-declared URL. Test-only.
    #[cfg(test)]
    pub fn add_sitemap_url_for_tests(&mut self, url: &str) {
        self.sitemap_urls.insert(url.to_string());
    }
}

/// A URL the crawl starts from, tagged with how it was discovered.
#[derive(Debug, Clone)]
pub struct Seed {
    pub url: Url,
    pub source: DiscoverySource,
}

/// Resolves the crawl policy and seed set for `root`.
///
/// Fetches `/robots.txt` with a bounded timeout; on any failure falls back to
/// a permissive policy and records a warning. Then fetches the declared
/// sitemaps (or the conventional fallback locations when none are declared),
/// following index documents, bounded by `max_sitemaps` documents and
/// `max_sitemap_urls` total URLs. Returns the root URL plus all same-host
/// sitemap URLs as seeds, deduped by normalized URL.
pub async fn resolve(client: &Client, root: &Url, config: &Config) -> (CrawlPolicy, Vec<Seed>) {
    let mut policy = CrawlPolicy {
        user_agent: config.user_agent.clone(),
        ..Default::default()
    };

    let declared = match fetch_robots(client, root).await {
        Ok(content) => {
            policy.robots = RobotsTxt::parse(&content);
            policy.robots.sitemaps().to_vec()
        }
        Err(reason) => {
            warn!("robots.txt unavailable for {root}: {reason}; crawling permissively");
            policy
                .warnings
                .push(format!("robots.txt unavailable: {reason}"));
            Vec::new()
        }
    };

    // CLI override wins; otherwise honor the robots Crawl-delay.
    policy.crawl_delay = match config.crawl_delay_ms {
        Some(ms) => Duration::from_millis(ms),
        None => policy
            .robots
            .crawl_delay(&config.user_agent)
            .map(Duration::from_secs_f64)
            .unwrap_or(Duration::ZERO),
    };

    let robots_declared = !declared.is_empty();
    let candidates: Vec<String> = if robots_declared {
        declared
    } else {
        FALLBACK_SITEMAP_PATHS
            .iter()
            .filter_map(|path| root.join(path).ok())
            .map(|u| u.to_string())
            .collect()
    };

    collect_sitemap_urls(client, root, config, candidates, robots_declared, &mut policy).await;

    info!(
        "policy resolved: crawl-delay {:?}, {} sitemap URLs, {} warnings",
        policy.crawl_delay,
        policy.sitemap_urls.len(),
        policy.warnings.len()
    );

    let mut seeds = Vec::new();
    let mut seen = HashSet::new();

    if let Some(root_norm) = normalize_absolute(root.as_str()) {
        seen.insert(root_norm.as_str().to_string());
        seeds.push(Seed {
            url: root_norm,
            source: DiscoverySource::Seed,
        });
    }

    let mut sitemap_urls: Vec<&String> = policy.sitemap_urls.iter().collect();
    sitemap_urls.sort(); // deterministic seed order
    for url_str in sitemap_urls {
        let Some(url) = normalize_absolute(url_str) else {
            continue;
        };
        if !same_host(&url, root) {
            continue;
        }
        if seen.insert(url.as_str().to_string()) {
            seeds.push(Seed {
                url,
                source: DiscoverySource::Sitemap,
            });
        }
    }

    (policy, seeds)
}

async fn fetch_robots(client: &Client, root: &Url) -> Result<String, String> {
    let robots_url = root
        .join("/robots.txt")
        .map_err(|e| format!("cannot build robots URL: {e}"))?;

    let response = client
        .get(robots_url.as_str())
        .timeout(POLICY_FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status().as_u16()));
    }

    response.text().await.map_err(|e| e.to_string())
}

/// Fetches sitemap documents breadth-first, one level of index nesting at a
/// time, until the document or URL bound is hit.
async fn collect_sitemap_urls(
    client: &Client,
    root: &Url,
    config: &Config,
    candidates: Vec<String>,
    robots_declared: bool,
    policy: &mut CrawlPolicy,
) {
    let mut queue: Vec<String> = candidates;
    let mut fetched_docs = 0usize;

    while let Some(sitemap_url) = queue.pop() {
        if fetched_docs >= config.max_sitemaps
            || policy.sitemap_urls.len() >= config.max_sitemap_urls
        {
            break;
        }
        fetched_docs += 1;

        let body = match fetch_sitemap(client, &sitemap_url).await {
            Ok(body) => body,
            Err(reason) => {
                // A missing fallback sitemap is expected; a declared one is
                // worth surfacing.
                if robots_declared {
                    warn!("declared sitemap {sitemap_url} unavailable: {reason}");
                    policy
                        .warnings
                        .push(format!("sitemap {sitemap_url} unavailable: {reason}"));
                } else {
                    debug!("fallback sitemap {sitemap_url} unavailable: {reason}");
                }
                continue;
            }
        };

        let entries = parse_sitemap(&body);
        if entries.urls.is_empty() && entries.nested.is_empty() {
            debug!("sitemap {sitemap_url} contained no readable entries");
            continue;
        }

        for nested in entries.nested {
            queue.push(nested);
        }

        for url_str in entries.urls {
            if policy.sitemap_urls.len() >= config.max_sitemap_urls {
                break;
            }
            let Some(url) = normalize_absolute(&url_str) else {
                continue;
            };
            if same_host(&url, root) {
                policy.sitemap_urls.insert(url.as_str().to_string());
            }
        }
    }
}

async fn fetch_sitemap(client: &Client, url: &str) -> Result<Vec<u8>, String> {
    let response = client
        .get(url)
        .timeout(POLICY_FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status().as_u16()));
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| e.to_string())
}
