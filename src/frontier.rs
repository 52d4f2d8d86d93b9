//! Crawl frontier: discovered-but-unvisited URLs and dispatch scheduling.
//!
//! The frontier is the single owner of all mutable crawl state (visited set,
//! pending queue, in-flight count, per-host politeness timers). Only the
//! coordinator touches it; workers just fetch and report back. Per URL the
//! lifecycle is Pending -> InFlight -> Completed/Failed, and a URL enters the
//! pending queue at most once no matter how many pages discover it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use log::debug;
use url::Url;

use crate::models::DiscoverySource;
use crate::policy::CrawlPolicy;

/// A queued URL with its discovery context.
#[derive(Debug, Clone)]
pub struct PendingUrl {
    pub url: Url,
    pub depth: u32,
    pub source: DiscoverySource,
}

/// Why an enqueue attempt was rejected. Used for debug logging and tests;
/// rejections are normal operation, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    AlreadySeen,
    TooDeep,
    ExternalHost,
    Disallowed,
}

/// What the coordinator should do next.
#[derive(Debug)]
pub enum NextAction {
    /// Dispatch this URL to a worker now.
    Dispatch(PendingUrl),
    /// Work is pending but the host is inside its politeness window.
    WaitUntil(Instant),
    /// Queue empty; fetches may still be in flight.
    Idle,
}

/// Single-owner crawl frontier.
pub struct Frontier {
    root: Url,
    max_depth: u32,
    crawl_delay: Duration,
    /// Every normalized URL ever enqueued (the dedup invariant).
    visited: HashSet<String>,
    pending: VecDeque<PendingUrl>,
    in_flight: usize,
    /// Earliest next dispatch per host.
    host_ready_at: HashMap<String, Instant>,
}

impl Frontier {
    pub fn new(root: Url, max_depth: u32, crawl_delay: Duration) -> Self {
        Self {
            root,
            max_depth,
            crawl_delay,
            visited: HashSet::new(),
            pending: VecDeque::new(),
            in_flight: 0,
            host_ready_at: HashMap::new(),
        }
    }

    /// Offers a normalized URL to the frontier.
    ///
    /// Rejects duplicates, URLs beyond the depth limit, hosts other than the
    /// audit target, and paths the policy disallows. A URL's depth is the
    /// minimum over all discoveries: fetches complete in arbitrary order, so
    /// a deeper page's result can arrive first and a rediscovery from a
    /// shallower page must still lower the depth of a not-yet-dispatched
    /// entry.
    pub fn enqueue(
        &mut self,
        url: Url,
        depth: u32,
        source: DiscoverySource,
        policy: &CrawlPolicy,
    ) -> EnqueueOutcome {
        if depth > self.max_depth {
            return EnqueueOutcome::TooDeep;
        }
        if !crate::urlnorm::same_host(&url, &self.root) {
            return EnqueueOutcome::ExternalHost;
        }
        if self.visited.contains(url.as_str()) {
            if let Some(entry) = self.pending.iter_mut().find(|p| p.url == url) {
                if depth < entry.depth {
                    entry.depth = depth;
                }
            }
            return EnqueueOutcome::AlreadySeen;
        }
        if !policy.is_allowed(&url) {
            debug!("robots disallows {url}, skipping");
            return EnqueueOutcome::Disallowed;
        }

        self.visited.insert(url.as_str().to_string());
        self.pending.push_back(PendingUrl { url, depth, source });
        EnqueueOutcome::Enqueued
    }

    /// Picks the next dispatchable URL, honoring per-host crawl-delay.
    ///
    /// The politeness timer is advanced here, before the worker runs, so two
    /// dispatches to one host can never be closer than the delay regardless
    /// of worker timing.
    pub fn next_ready(&mut self, now: Instant) -> NextAction {
        if self.pending.is_empty() {
            return NextAction::Idle;
        }

        // Single-host audits make the front of the queue the only candidate
        // most of the time, but subdomain seeds can interleave, so scan for
        // the first ready host.
        let mut earliest: Option<Instant> = None;
        for index in 0..self.pending.len() {
            let host = match self.pending[index].url.host_str() {
                Some(host) => host.to_string(),
                None => continue,
            };
            let ready_at = self.host_ready_at.get(&host).copied().unwrap_or(now);
            if ready_at <= now {
                let item = self
                    .pending
                    .remove(index)
                    .expect("index bounded by pending.len()");
                self.host_ready_at.insert(host, now + self.crawl_delay);
                self.in_flight += 1;
                return NextAction::Dispatch(item);
            }
            earliest = Some(earliest.map_or(ready_at, |e| e.min(ready_at)));
        }

        match earliest {
            Some(instant) => NextAction::WaitUntil(instant),
            None => NextAction::Idle,
        }
    }

    /// Marks one in-flight fetch as finished and offers the internal links it
    /// discovered back to the queue at depth + 1.
    pub fn on_result(
        &mut self,
        depth: u32,
        internal_links: &[Url],
        policy: &CrawlPolicy,
    ) -> usize {
        debug_assert!(self.in_flight > 0, "on_result without matching dispatch");
        self.in_flight = self.in_flight.saturating_sub(1);

        let mut added = 0;
        for link in internal_links {
            if self.enqueue(link.clone(), depth + 1, DiscoverySource::Link, policy)
                == EnqueueOutcome::Enqueued
            {
                added += 1;
            }
        }
        added
    }

    /// Records a URL as seen without queueing it. Used for redirect
    /// destinations: the document is already captured under its requested
    /// URL, so fetching the destination again would duplicate it.
    pub fn mark_visited(&mut self, url: &Url) {
        self.visited.insert(url.as_str().to_string());
    }

    /// Crawl is finished when nothing is pending and nothing is in flight.
    pub fn is_done(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of unique URLs ever accepted.
    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }
}
