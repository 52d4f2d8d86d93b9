//! Sitemap XML parsing.
//!
//! Handles both `<urlset>` documents and `<sitemapindex>` documents in one
//! pass; the policy resolver decides how far to recurse into index entries.

use std::io::Cursor;

use sitemap::reader::{SiteMapEntity, SiteMapReader};

/// URLs extracted from one sitemap document.
#[derive(Debug, Default)]
pub struct SitemapEntries {
    /// `<url><loc>` page entries.
    pub urls: Vec<String>,
    /// `<sitemap><loc>` child sitemaps from an index document.
    pub nested: Vec<String>,
}

/// Parses a sitemap document without loading it into a DOM, so large
/// sitemaps stay manageable. Unreadable entities are skipped; a document
/// with no readable entries parses to an empty result.
pub fn parse_sitemap(xml: &[u8]) -> SitemapEntries {
    let mut entries = SitemapEntries::default();
    let parser = SiteMapReader::new(Cursor::new(xml));

    for entity in parser {
        match entity {
            SiteMapEntity::Url(url_entry) => {
                if let Some(url) = url_entry.loc.get_url() {
                    entries.urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(sitemap_entry) => {
                if let Some(url) = sitemap_entry.loc.get_url() {
                    entries.nested.push(url.to_string());
                }
            }
            SiteMapEntity::Err(error) => {
                log::debug!("skipping unreadable sitemap entity: {error}");
            }
        }
    }

    entries
}
