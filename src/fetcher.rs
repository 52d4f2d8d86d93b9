//! Page fetching: one GET per URL with manual redirect-chain tracking.
//!
//! The shared client is built with redirects disabled so every hop is
//! observed and recorded. All failures come back as [`FetchFailure`] values;
//! nothing here returns an `Err` that would abort the crawl loop.

use std::time::{Duration, Instant};

use log::debug;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode, Url};

use crate::config::{Config, MAX_REDIRECT_HOPS, MAX_RESPONSE_BODY_SIZE};
use crate::error_handling::{classify_reqwest_error, FetchFailure, FetchFailureKind};

/// Transport-level result of fetching one URL.
///
/// Carries the raw body; signal extraction happens in the coordinator so the
/// fetcher stays pure plumbing.
#[derive(Debug)]
pub struct FetchedPage {
    /// Final status after following redirects (always < 400).
    pub status: u16,
    /// URL of the final response.
    pub final_url: String,
    /// Every URL visited, in order, starting with the requested one.
    pub redirect_chain: Vec<String>,
    /// Response body, capped at [`MAX_RESPONSE_BODY_SIZE`].
    pub body: String,
    /// Body size in bytes after the cap.
    pub content_length: u64,
    /// Total fetch time including redirect hops.
    pub duration: Duration,
}

/// Fetches `url`, following redirects manually and recording the chain.
///
/// Retry policy: one attempt with the configured timeout, and on a retriable
/// failure (timeouts, DNS, 5xx) a single second attempt with the escalated
/// timeout. 4xx responses, TLS errors and redirect loops are terminal on the
/// first attempt.
pub async fn fetch(client: &Client, url: &Url, config: &Config) -> Result<FetchedPage, FetchFailure> {
    match fetch_once(client, url, config.request_timeout()).await {
        Ok(page) => Ok(page),
        Err(failure) if failure.is_retriable() => {
            debug!(
                "retrying {} with escalated timeout after: {}",
                url, failure.detail
            );
            fetch_once(client, url, config.retry_timeout()).await
        }
        Err(failure) => Err(failure),
    }
}

async fn fetch_once(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<FetchedPage, FetchFailure> {
    let started = Instant::now();
    let mut chain: Vec<String> = Vec::new();
    let mut current = url.clone();

    loop {
        if chain.len() >= MAX_REDIRECT_HOPS {
            let mut failure = FetchFailure::new(
                url.as_str(),
                FetchFailureKind::TooManyRedirects,
                format!("gave up after {} redirect hops", MAX_REDIRECT_HOPS),
            );
            failure.redirect_chain = chain;
            return Err(failure);
        }
        chain.push(current.as_str().to_string());

        let response = client
            .get(current.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                let mut failure =
                    FetchFailure::new(url.as_str(), classify_reqwest_error(&e), e.to_string());
                failure.redirect_chain = chain.clone();
                failure
            })?;

        let status = response.status();
        if status.is_redirection() {
            match redirect_target(&current, status, response.headers().get(LOCATION)) {
                Some(next) => {
                    current = next;
                    continue;
                }
                None => {
                    // Redirect status without a usable Location: treat the
                    // response as final below.
                }
            }
        }

        if status.as_u16() >= 400 {
            let mut failure = FetchFailure::new(
                url.as_str(),
                FetchFailureKind::Http {
                    status: status.as_u16(),
                },
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                ),
            );
            failure.redirect_chain = chain;
            return Err(failure);
        }

        let final_url = response.url().as_str().to_string();
        let body_bytes = response.bytes().await.map_err(|e| {
            let mut failure =
                FetchFailure::new(url.as_str(), classify_reqwest_error(&e), e.to_string());
            failure.redirect_chain = chain.clone();
            failure
        })?;

        let capped = &body_bytes[..body_bytes.len().min(MAX_RESPONSE_BODY_SIZE)];
        let body = String::from_utf8_lossy(capped).into_owned();

        return Ok(FetchedPage {
            status: status.as_u16(),
            final_url,
            redirect_chain: chain,
            content_length: capped.len() as u64,
            body,
            duration: started.elapsed(),
        });
    }
}

/// Resolves the Location header of a redirect response against the current
/// URL. Relative Location values are legal and common.
fn redirect_target(
    current: &Url,
    status: StatusCode,
    location: Option<&reqwest::header::HeaderValue>,
) -> Option<Url> {
    let location = match location.and_then(|v| v.to_str().ok()) {
        Some(value) => value,
        None => {
            debug!(
                "redirect status {} for {} without Location header",
                status.as_u16(),
                current
            );
            return None;
        }
    };

    match Url::parse(location).or_else(|_| current.join(location)) {
        Ok(next) => Some(next),
        Err(e) => {
            debug!("unparseable Location {:?} on {}: {}", location, current, e);
            None
        }
    }
}
