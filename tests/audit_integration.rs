//! Integration tests for run_audit against a mock HTTP server.
//!
//! These tests verify the crawl orchestration end to end:
//! - Visit-once dedup across discovery paths
//! - Depth and page budgets, Partial vs Complete status
//! - Redirect chain recording
//! - robots.txt enforcement and sitemap seeding
//! - Finding aggregation over a real crawl dataset

use std::time::Duration;

use seo_audit::{run_audit, Config, FindingCategory, LogFormat, LogLevel, RunStatus};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Basic Config for testing: quiet logging, small budgets, thin-content
/// checks disabled so byte counts of tiny fixture pages stay out of the way.
fn test_config(root: &str) -> Config {
    Config {
        root_url: root.to_string(),
        log_level: LogLevel::Error,
        log_format: LogFormat::Plain,
        max_depth: 3,
        max_pages: 50,
        max_concurrency: 4,
        timeout_seconds: 5,
        time_budget_seconds: 30,
        crawl_delay_ms: None,
        user_agent: "seo_audit_test/1.0".to_string(),
        thin_content_bytes: 0,
        max_sitemaps: 5,
        max_sitemap_urls: 100,
    }
}

/// A minimal but complete page: title, meta description, canonical, one H1
/// and the given links.
fn page_html(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!("<a href=\"{l}\">link</a>"))
        .collect();
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title>\
         <meta name=\"description\" content=\"{title} description\">\
         <link rel=\"canonical\" href=\"/\"></head>\
         <body><h1>{title}</h1>{anchors}</body></html>"
    )
}

async fn mount_page(server: &MockServer, at: &str, title: &str, links: &[&str], expect: u64) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(page_html(title, links)))
        .expect(expect)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_each_url_fetched_exactly_once() {
    let server = MockServer::start().await;

    // Root links /a twice; /a links back to root. Mock expectations verify
    // the single fetch per URL on server drop.
    mount_page(&server, "/", "Home", &["/a", "/a"], 1).await;
    mount_page(&server, "/a", "About", &["/"], 1).await;

    let result = run_audit(test_config(&server.uri())).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.metadata.status, RunStatus::Complete);
    assert_eq!(result.metadata.pages_attempted, 2);
    assert_eq!(result.graph.edge_count, 2);
}

#[tokio::test]
async fn test_duplicate_title_reported_once_with_both_urls() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/b"], 1).await;
    mount_page(&server, "/a", "Products", &[], 1).await;
    mount_page(&server, "/b", "Products", &[], 1).await;

    let result = run_audit(test_config(&server.uri())).await.unwrap();

    let dupes: Vec<_> = result
        .findings_in(FindingCategory::DuplicateTitle)
        .collect();
    assert_eq!(dupes.len(), 1);
    assert_eq!(
        dupes[0].urls,
        vec![format!("{}/a", server.uri()), format!("{}/b", server.uri())]
    );
}

#[tokio::test]
async fn test_broken_link_finding_names_the_linker() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/gone"], 1).await;
    // /gone is not mocked: wiremock answers 404.

    let result = run_audit(test_config(&server.uri())).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].http_status(), Some(404));

    let broken: Vec<_> = result.findings_in(FindingCategory::BrokenLink).collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(
        broken[0].urls,
        vec![format!("{}/gone", server.uri()), format!("{}/", server.uri())]
    );
    // A failed fetch does not flip the run to Partial.
    assert_eq!(result.metadata.status, RunStatus::Complete);
}

#[tokio::test]
async fn test_redirect_chain_recorded_in_order() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{uri}/mid").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mid"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{uri}/end").as_str()),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/end", "Landing", &[], 1).await;

    let result = run_audit(test_config(&uri)).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    let page = &result.pages[0];
    assert_eq!(
        page.redirect_chain,
        vec![
            format!("{uri}/"),
            format!("{uri}/mid"),
            format!("{uri}/end")
        ]
    );
    assert_eq!(page.final_url, format!("{uri}/end"));

    let chains: Vec<_> = result
        .findings_in(FindingCategory::RedirectChain)
        .collect();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].urls, page.redirect_chain);
}

#[tokio::test]
async fn test_redirect_destination_is_not_fetched_as_a_second_page() {
    let server = MockServer::start().await;
    let uri = server.uri();

    mount_page(&server, "/", "Home", &["/old"], 1).await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("Location", format!("{uri}/new").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    // The destination links itself, as a canonical nav link would.
    mount_page(&server, "/new", "Landing", &["/new"], 1).await;

    let result = run_audit(test_config(&uri)).await.unwrap();

    // Two documents: the root and the redirected page. /new is reached once,
    // as the redirect hop, never as a crawl target of its own.
    assert_eq!(result.pages.len(), 2);
    let redirected = result
        .pages
        .iter()
        .find(|p| p.url == format!("{uri}/old"))
        .unwrap();
    assert_eq!(redirected.final_url, format!("{uri}/new"));

    // Both URL forms resolve to the one node.
    let via_old = result.graph.node(&format!("{uri}/old")).unwrap();
    let via_new = result.graph.node(&format!("{uri}/new")).unwrap();
    assert_eq!(via_old.url, via_new.url);
    assert_eq!(result.graph.node_count(), 2);
}

#[tokio::test]
async fn test_sitemap_url_without_inbound_link_is_orphan() {
    let server = MockServer::start().await;
    let uri = server.uri();

    let sitemap = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\
         <url><loc>{uri}/lonely</loc></url>\
         </urlset>"
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/xml")
                .set_body_string(sitemap),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", "Home", &[], 1).await;
    mount_page(&server, "/lonely", "Lonely", &[], 1).await;

    let result = run_audit(test_config(&uri)).await.unwrap();

    // The sitemap URL was seeded and crawled.
    assert_eq!(result.pages.len(), 2);
    assert!(result
        .pages
        .iter()
        .any(|p| p.url == format!("{uri}/lonely")));

    let orphans: Vec<_> = result.findings_in(FindingCategory::OrphanPage).collect();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].urls, vec![format!("{uri}/lonely")]);
}

#[tokio::test]
async fn test_max_depth_zero_fetches_only_the_seed() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a"], 1).await;
    mount_page(&server, "/a", "About", &[], 0).await;

    let mut config = test_config(&server.uri());
    config.max_depth = 0;
    let result = run_audit(config).await.unwrap();

    assert_eq!(result.pages.len(), 1);
    assert_eq!(result.metadata.status, RunStatus::Complete);
    // The link was still recorded on the fetched page.
    assert_eq!(result.pages[0].internal_links.len(), 1);
}

#[tokio::test]
async fn test_max_pages_budget_ends_run_as_partial() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/b", "/c", "/d"], 1).await;
    for p in ["/a", "/b", "/c", "/d"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_html(p, &[])))
            .mount(&server)
            .await;
    }

    let mut config = test_config(&server.uri());
    config.max_pages = 2;
    config.max_concurrency = 1;
    let result = run_audit(config).await.unwrap();

    assert_eq!(result.metadata.status, RunStatus::Partial);
    assert_eq!(result.metadata.pages_attempted, 2);
    assert_eq!(result.pages.len(), 2);
}

#[tokio::test]
async fn test_time_budget_ends_run_as_partial() {
    let server = MockServer::start().await;
    let links: Vec<String> = (0..6).map(|i| format!("/slow{i}")).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", "Home", &link_refs, 1).await;
    for link in &links {
        Mock::given(method("GET"))
            .and(path(link.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page_html("Slow", &[]))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
    }

    let mut config = test_config(&server.uri());
    config.max_concurrency = 1;
    config.time_budget_seconds = 1;
    let result = run_audit(config).await.unwrap();

    assert_eq!(result.metadata.status, RunStatus::Partial);
    assert!(
        result.pages.len() < 7,
        "expected the deadline to cut the crawl short, got {} pages",
        result.pages.len()
    );
    // In-flight fetches are awaited, so every attempt has an outcome.
    assert_eq!(
        result.metadata.pages_attempted,
        result.pages.len() + result.failures.len()
    );
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/", "Home", &["/private/secret", "/public"], 1).await;
    mount_page(&server, "/public", "Public", &[], 1).await;
    mount_page(&server, "/private/secret", "Secret", &[], 0).await;

    let result = run_audit(test_config(&server.uri())).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert!(result
        .pages
        .iter()
        .all(|p| !p.url.contains("/private")));
    assert_eq!(result.metadata.status, RunStatus::Complete);
    assert!(result.metadata.policy_warnings.is_empty());
}

#[tokio::test]
async fn test_crawl_delay_spaces_out_requests() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/b"], 1).await;
    mount_page(&server, "/a", "A", &[], 1).await;
    mount_page(&server, "/b", "B", &[], 1).await;

    let mut config = test_config(&server.uri());
    config.crawl_delay_ms = Some(250);
    let result = run_audit(config).await.unwrap();

    assert_eq!(result.pages.len(), 3);
    // Three dispatches to one host: at least two full politeness windows.
    assert!(
        result.metadata.elapsed_seconds >= 0.5,
        "expected politeness spacing, finished in {:.3}s",
        result.metadata.elapsed_seconds
    );
}

#[tokio::test]
async fn test_unreachable_robots_degrades_to_permissive_with_warning() {
    let server = MockServer::start().await;
    // No robots.txt mock: wiremock answers 404.
    mount_page(&server, "/", "Home", &["/a"], 1).await;
    mount_page(&server, "/a", "About", &[], 1).await;

    let result = run_audit(test_config(&server.uri())).await.unwrap();

    assert_eq!(result.pages.len(), 2);
    assert!(result
        .metadata
        .policy_warnings
        .iter()
        .any(|w| w.contains("robots.txt")));
}

#[tokio::test]
async fn test_invalid_root_url_is_an_error() {
    let result = run_audit(test_config("not a url")).await;
    assert!(result.is_err());

    let result = run_audit(test_config("ftp://example.com/files")).await;
    assert!(result.is_err());
}
