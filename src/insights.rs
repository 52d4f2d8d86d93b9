//! Insight aggregation: pure rules over the completed crawl dataset.
//!
//! `analyze` does no I/O and touches nothing mutable, so re-running it over
//! the same inputs yields an identical, identically ordered findings list.
//! Each rule is applied independently and has its own tests.

use std::collections::BTreeMap;

use url::Url;

use crate::config::{
    Config, REDIRECT_CHAIN_CRITICAL_HOPS, URL_DEPTH_WARNING_SEGMENTS, URL_LENGTH_WARNING_CHARS,
};
use crate::error_handling::FetchFailure;
use crate::graph::LinkGraph;
use crate::models::{Finding, FindingCategory, PageRecord, Severity};
use crate::policy::CrawlPolicy;

/// Scans pages, failures and the finalized graph and produces all findings,
/// sorted by (category, first affected URL).
pub fn analyze(
    pages: &[PageRecord],
    failures: &[FetchFailure],
    graph: &LinkGraph,
    policy: &CrawlPolicy,
    config: &Config,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    duplicate_field_findings(
        pages,
        |page| page.title.as_deref(),
        FindingCategory::DuplicateTitle,
        "title",
        &mut findings,
    );
    duplicate_field_findings(
        pages,
        |page| page.meta_description.as_deref(),
        FindingCategory::DuplicateMeta,
        "meta description",
        &mut findings,
    );
    missing_meta_findings(pages, &mut findings);
    multiple_h1_findings(pages, &mut findings);
    missing_canonical_findings(pages, &mut findings);
    broken_link_findings(pages, failures, &mut findings);
    redirect_chain_findings(pages, &mut findings);
    orphan_findings(graph, policy, &mut findings);
    thin_content_findings(pages, config, &mut findings);
    url_structure_findings(pages, &mut findings);

    findings.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.urls.first().cmp(&b.urls.first()))
    });
    findings
}

/// Groups pages by the exact (case-preserved) value of one text field; every
/// group with two or more members yields a single finding listing them all.
fn duplicate_field_findings<'a>(
    pages: &'a [PageRecord],
    field: impl Fn(&'a PageRecord) -> Option<&'a str>,
    category: FindingCategory,
    field_name: &str,
    findings: &mut Vec<Finding>,
) {
    // BTreeMap keeps group iteration deterministic without a separate sort.
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for page in pages {
        if let Some(value) = field(page) {
            groups.entry(value).or_default().push(&page.url);
        }
    }

    for (value, mut urls) in groups {
        if urls.len() < 2 {
            continue;
        }
        urls.sort_unstable();
        findings.push(Finding {
            category,
            severity: Severity::Warning,
            urls: urls.iter().map(|u| u.to_string()).collect(),
            detail: format!(
                "{} pages share the same {}: {:?}",
                urls.len(),
                field_name,
                value
            ),
        });
    }
}

/// Any HTTP 200 page with an absent title, meta description or H1 gets one
/// finding per missing field.
fn missing_meta_findings(pages: &[PageRecord], findings: &mut Vec<Finding>) {
    for page in pages {
        if page.status != 200 {
            continue;
        }
        let mut missing = Vec::new();
        if page.title.is_none() {
            missing.push("title");
        }
        if page.meta_description.is_none() {
            missing.push("meta description");
        }
        if page.h1.is_empty() {
            missing.push("H1");
        }
        for field in missing {
            findings.push(Finding {
                category: FindingCategory::MissingMeta,
                severity: Severity::Warning,
                urls: vec![page.url.clone()],
                detail: format!("page has no {field}"),
            });
        }
    }
}

fn multiple_h1_findings(pages: &[PageRecord], findings: &mut Vec<Finding>) {
    for page in pages {
        if page.status == 200 && page.h1.len() > 1 {
            findings.push(Finding {
                category: FindingCategory::MultipleH1,
                severity: Severity::Notice,
                urls: vec![page.url.clone()],
                detail: format!("page has {} H1 headings", page.h1.len()),
            });
        }
    }
}

fn missing_canonical_findings(pages: &[PageRecord], findings: &mut Vec<Finding>) {
    for page in pages {
        if page.status == 200 && page.canonical.is_none() {
            findings.push(Finding {
                category: FindingCategory::MissingCanonical,
                severity: Severity::Notice,
                urls: vec![page.url.clone()],
                detail: "page has no canonical link".to_string(),
            });
        }
    }
}

/// Every failed internal fetch target becomes one finding naming the target
/// first, followed by the pages that link to it (sorted).
fn broken_link_findings(
    pages: &[PageRecord],
    failures: &[FetchFailure],
    findings: &mut Vec<Finding>,
) {
    for failure in failures {
        let mut linkers: Vec<String> = pages
            .iter()
            .filter(|page| page.internal_links.iter().any(|l| l == &failure.url))
            .map(|page| page.url.clone())
            .collect();
        linkers.sort_unstable();

        let detail = match failure.http_status() {
            Some(status) => match linkers.len() {
                0 => format!("target returned HTTP {status}"),
                n => format!("target returned HTTP {status}, linked from {n} page(s)"),
            },
            None => format!("target unreachable: {}", failure.detail),
        };

        let mut urls = vec![failure.url.clone()];
        urls.extend(linkers);

        findings.push(Finding {
            category: FindingCategory::BrokenLink,
            severity: Severity::Critical,
            urls,
            detail,
        });
    }
}

/// Pages that arrived through one or more redirect hops. Three or more hops
/// is Critical; anything else is a Warning.
fn redirect_chain_findings(pages: &[PageRecord], findings: &mut Vec<Finding>) {
    for page in pages {
        let hops = page.redirect_chain.len().saturating_sub(1);
        if hops == 0 {
            continue;
        }
        let severity = if hops >= REDIRECT_CHAIN_CRITICAL_HOPS {
            Severity::Critical
        } else {
            Severity::Warning
        };
        findings.push(Finding {
            category: FindingCategory::RedirectChain,
            severity,
            urls: page.redirect_chain.clone(),
            detail: format!(
                "{} redirect hop(s): {}",
                hops,
                page.redirect_chain.join(" -> ")
            ),
        });
    }
}

/// Sitemap-declared URLs that no crawled page links to.
fn orphan_findings(graph: &LinkGraph, policy: &CrawlPolicy, findings: &mut Vec<Finding>) {
    for node in &graph.nodes {
        if node.in_degree == 0 && policy.declared_in_sitemap(&node.url) {
            findings.push(Finding {
                category: FindingCategory::OrphanPage,
                severity: Severity::Warning,
                urls: vec![node.url.clone()],
                detail: "declared in sitemap but not linked from any crawled page".to_string(),
            });
        }
    }
}

fn thin_content_findings(pages: &[PageRecord], config: &Config, findings: &mut Vec<Finding>) {
    for page in pages {
        if page.status == 200 && page.content_length < config.thin_content_bytes {
            findings.push(Finding {
                category: FindingCategory::ThinContent,
                severity: Severity::Notice,
                urls: vec![page.url.clone()],
                detail: format!(
                    "body is {} bytes (threshold {})",
                    page.content_length, config.thin_content_bytes
                ),
            });
        }
    }
}

/// Deeply nested or overlong URLs. One finding per page, listing every
/// threshold it crosses.
fn url_structure_findings(pages: &[PageRecord], findings: &mut Vec<Finding>) {
    for page in pages {
        let Ok(url) = Url::parse(&page.url) else {
            continue;
        };
        let segments = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).count())
            .unwrap_or(0);

        let mut problems = Vec::new();
        if segments > URL_DEPTH_WARNING_SEGMENTS {
            problems.push(format!(
                "path is {segments} segments deep (threshold {URL_DEPTH_WARNING_SEGMENTS})"
            ));
        }
        if page.url.len() > URL_LENGTH_WARNING_CHARS {
            problems.push(format!(
                "URL is {} characters long (threshold {URL_LENGTH_WARNING_CHARS})",
                page.url.len()
            ));
        }
        if problems.is_empty() {
            continue;
        }
        findings.push(Finding {
            category: FindingCategory::UrlStructure,
            severity: Severity::Notice,
            urls: vec![page.url.clone()],
            detail: problems.join("; "),
        });
    }
}
