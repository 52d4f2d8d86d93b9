//! URL normalization and identity.
//!
//! Every URL that enters the frontier, the record set or the link graph goes
//! through [`normalize`] first, so the normalized string form is the identity
//! used for dedup everywhere. Normalization is idempotent.

use url::Url;

use crate::config::MAX_URL_LENGTH;

/// Normalizes a link found on `base` into its canonical absolute form.
///
/// Relative references are resolved against `base`. Canonicalization:
/// - scheme and host lowercased (the `url` crate does this on parse)
/// - fragment stripped
/// - default port stripped
/// - trailing slash removed from non-root paths (`/a/` and `/a` are one page)
///
/// Returns `None` for non-http(s) schemes (mailto:, javascript:, tel:, ...),
/// unparseable references, and URLs longer than [`MAX_URL_LENGTH`].
pub fn normalize(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
        return None;
    }

    let resolved = base.join(raw).ok()?;
    canonicalize(resolved)
}

/// Normalizes an absolute URL string (seed and sitemap entries).
pub fn normalize_absolute(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH {
        return None;
    }
    let parsed = Url::parse(raw).ok()?;
    canonicalize(parsed)
}

fn canonicalize(mut url: Url) -> Option<Url> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    url.host_str()?;

    url.set_fragment(None);

    // Url keeps an explicit default port only when the input names it.
    if url.port() == url.scheme_default_port() {
        let _ = url.set_port(None);
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    if url.as_str().len() > MAX_URL_LENGTH {
        return None;
    }

    Some(url)
}

/// Whether two URLs point at the same host (scheme-agnostic, exact host
/// match). Subdomains are distinct hosts: the audit scope is the host of the
/// root URL, and politeness timers are keyed the same way.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb) && a.port() == b.port(),
        _ => false,
    }
}

trait SchemeDefaultPort {
    fn scheme_default_port(&self) -> Option<u16>;
}

impl SchemeDefaultPort for Url {
    fn scheme_default_port(&self) -> Option<u16> {
        match self.scheme() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/dir/page").unwrap()
    }

    #[test]
    fn test_normalize_strips_fragment() {
        let url = normalize(&base(), "https://example.com/a#section").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_normalize_strips_default_port() {
        let url = normalize(&base(), "https://example.com:443/a").unwrap();
        assert_eq!(url.as_str(), "https://example.com/a");
        let url = normalize(&base(), "http://example.com:80/a").unwrap();
        assert_eq!(url.as_str(), "http://example.com/a");
    }

    #[test]
    fn test_normalize_keeps_explicit_port() {
        let url = normalize(&base(), "https://example.com:8443/a").unwrap();
        assert_eq!(url.as_str(), "https://example.com:8443/a");
    }

    #[test]
    fn test_normalize_trailing_slash_equivalence() {
        let with_slash = normalize(&base(), "https://example.com/a/b/").unwrap();
        let without = normalize(&base(), "https://example.com/a/b").unwrap();
        assert_eq!(with_slash, without);
        // Root path stays as "/"
        let root = normalize(&base(), "https://example.com/").unwrap();
        assert_eq!(root.path(), "/");
    }

    #[test]
    fn test_normalize_resolves_relative() {
        let url = normalize(&base(), "../other").unwrap();
        assert_eq!(url.as_str(), "https://example.com/other");
        let url = normalize(&base(), "child").unwrap();
        assert_eq!(url.as_str(), "https://example.com/dir/child");
    }

    #[test]
    fn test_normalize_lowercases_host() {
        let url = normalize(&base(), "HTTPS://EXAMPLE.COM/MixedPath").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        // Path case is significant and preserved
        assert_eq!(url.path(), "/MixedPath");
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        assert!(normalize(&base(), "mailto:x@example.com").is_none());
        assert!(normalize(&base(), "javascript:void(0)").is_none());
        assert!(normalize(&base(), "tel:+15551234").is_none());
    }

    #[test]
    fn test_normalize_rejects_overlong() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        assert!(normalize(&base(), &long).is_none());
    }

    #[test]
    fn test_same_host() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("http://example.com/b").unwrap();
        let c = Url::parse("https://blog.example.com/").unwrap();
        assert!(same_host(&a, &b));
        assert!(!same_host(&a, &c));
    }

    #[test]
    fn test_normalize_absolute_rejects_garbage() {
        assert!(normalize_absolute("not a url").is_none());
        assert!(normalize_absolute("").is_none());
    }

    // Property-based tests using proptest
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_normalize_idempotent(path in "[a-zA-Z0-9/._-]{0,40}") {
            let raw = format!("https://example.com/{}", path);
            if let Some(once) = normalize_absolute(&raw) {
                let twice = normalize_absolute(once.as_str());
                prop_assert_eq!(Some(once), twice);
            }
        }

        #[test]
        fn test_normalize_never_keeps_fragment(
            path in "[a-z0-9/-]{0,20}",
            frag in "[a-z0-9]{0,10}"
        ) {
            let raw = format!("https://example.com/{}#{}", path, frag);
            if let Some(url) = normalize_absolute(&raw) {
                prop_assert!(url.fragment().is_none());
            }
        }

        #[test]
        fn test_normalize_no_panic(raw in "\\PC{0,100}") {
            let _ = normalize(&base(), &raw);
        }
    }
}
