//! Result data model: page records, findings and the audit aggregate.
//!
//! Everything here is plain data with `Serialize` derives. The rendering
//! collaborator receives an [`AuditResult`] by value and owns it from then on;
//! nothing in the pipeline mutates a record after it was created.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error_handling::FetchFailure;
use crate::graph::LinkGraph;

/// How a URL entered the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscoverySource {
    /// The root URL supplied to the run.
    Seed,
    /// Declared in a sitemap.
    Sitemap,
    /// Found as an internal link on a fetched page.
    Link,
}

/// One fetched page, keyed by its normalized URL.
///
/// Created exactly once per unique normalized URL regardless of how many
/// pages link to it, and immutable afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    /// Normalized absolute URL this record is identified by.
    pub url: String,
    /// HTTP status of the final response.
    pub status: u16,
    /// URL of the final response after redirects.
    pub final_url: String,
    /// Every URL in the redirect chain, in order, starting with `url`.
    /// A page served directly has a single-element chain.
    pub redirect_chain: Vec<String>,
    /// `<title>` text, if present and non-empty.
    pub title: Option<String>,
    /// `<meta name="description">` content, if present and non-empty.
    pub meta_description: Option<String>,
    /// `<link rel="canonical">` href, if present.
    pub canonical: Option<String>,
    /// All `<h1>` texts in document order.
    pub h1: Vec<String>,
    /// Raw outbound hrefs as they appeared in the document.
    pub outbound_links: Vec<String>,
    /// Normalized internal link targets (same host, deduped).
    pub internal_links: Vec<String>,
    /// Normalized external link targets (deduped).
    pub external_links: Vec<String>,
    /// Body size in bytes (after the response cap).
    pub content_length: u64,
    /// Time the fetch took, including redirect hops.
    pub fetch_duration_ms: u64,
    /// BFS depth at which the crawler reached this URL.
    pub depth: u32,
    /// How the URL was discovered.
    pub source: DiscoverySource,
}

/// Finding categories, ordered by report position.
///
/// The derived `Ord` drives the deterministic report ordering, so variant
/// order here is part of the output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum FindingCategory {
    DuplicateTitle,
    DuplicateMeta,
    MissingMeta,
    MultipleH1,
    MissingCanonical,
    BrokenLink,
    RedirectChain,
    OrphanPage,
    ThinContent,
    UrlStructure,
}

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Notice,
    Warning,
    Critical,
}

/// One detected issue. Derived from the completed dataset, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub category: FindingCategory,
    pub severity: Severity,
    /// Affected URL(s); the first one is the sort key within a category.
    pub urls: Vec<String>,
    /// Human-readable description for the report.
    pub detail: String,
}

/// Whether the crawl ran to frontier exhaustion or was cut short by a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Frontier exhausted with no fetch in flight.
    Complete,
    /// Page or wall-clock budget ended the run early.
    Partial,
}

/// Run metadata attached to the audit aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub root_url: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub status: RunStatus,
    pub pages_attempted: usize,
    pub pages_succeeded: usize,
    pub pages_failed: usize,
    /// Non-fatal warnings from policy resolution (robots/sitemap problems).
    pub policy_warnings: Vec<String>,
}

/// Aggregate root for one audit run.
///
/// Handed by value to the rendering collaborator once the pipeline finishes.
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub metadata: RunMetadata,
    /// All fetched pages, sorted by normalized URL.
    pub pages: Vec<PageRecord>,
    /// All fetch failures, sorted by URL.
    pub failures: Vec<FetchFailure>,
    /// Finalized internal link graph.
    pub graph: LinkGraph,
    /// Findings grouped in deterministic (category, first URL) order.
    pub findings: Vec<Finding>,
}

impl AuditResult {
    /// Findings belonging to one category, in report order.
    pub fn findings_in(&self, category: FindingCategory) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_report_order() {
        assert!(FindingCategory::DuplicateTitle < FindingCategory::BrokenLink);
        assert!(FindingCategory::BrokenLink < FindingCategory::OrphanPage);
        assert!(FindingCategory::OrphanPage < FindingCategory::ThinContent);
        assert!(FindingCategory::ThinContent < FindingCategory::UrlStructure);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::Notice < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }
}
