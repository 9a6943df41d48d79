//! sitemap.xml and robots.txt generation.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::SiteSettings;
use crate::domain::content::GeneralPageKey;

use super::content::{ContentService, SitemapSlugs};
use super::fetch::FetchError;

/// Top-level routes always listed, in sitemap order.
pub const STATIC_ROUTES: [&str; 10] = [
    "/",
    "/about",
    "/activities",
    "/admissions",
    "/alumni",
    "/coop",
    "/faq",
    "/gallery",
    "/news",
    "/programs",
];

#[derive(Clone)]
pub struct SitemapService {
    content: ContentService,
    site: SiteSettings,
}

impl SitemapService {
    pub fn new(content: ContentService, site: SiteSettings) -> Self {
        Self { content, site }
    }

    pub async fn sitemap_xml(&self) -> Result<String, FetchError> {
        let slugs = self.content.sitemap_slugs().await?;
        Ok(render_sitemap(&self.site, &slugs, OffsetDateTime::now_utc()))
    }

    pub fn robots_txt(&self) -> String {
        render_robots(&self.site)
    }
}

/// Every page path the sitemap lists, static routes first.
pub fn sitemap_paths(slugs: &SitemapSlugs) -> Vec<String> {
    debug_assert!(
        GeneralPageKey::ALL
            .iter()
            .all(|key| STATIC_ROUTES.contains(&key.path()))
    );

    let mut paths: Vec<String> = STATIC_ROUTES.iter().map(|path| path.to_string()).collect();
    paths.extend(slugs.posts.iter().map(|slug| format!("/news/{slug}")));
    paths.extend(slugs.programs.iter().map(|slug| format!("/programs/{slug}")));
    paths.extend(slugs.coops.iter().map(|slug| format!("/coop/{slug}")));
    paths
}

/// Every entry carries `lastmod` as the generation time.
pub fn render_sitemap(site: &SiteSettings, slugs: &SitemapSlugs, lastmod: OffsetDateTime) -> String {
    let lastmod = lastmod.format(&Rfc3339).unwrap_or_default();
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for path in sitemap_paths(slugs) {
        let loc = escape_xml(&site.absolute_url(&path));
        if lastmod.is_empty() {
            xml.push_str(&format!("  <url><loc>{loc}</loc></url>\n"));
        } else {
            xml.push_str(&format!(
                "  <url><loc>{loc}</loc><lastmod>{lastmod}</lastmod></url>\n"
            ));
        }
    }
    xml.push_str("</urlset>\n");
    xml
}

pub fn render_robots(site: &SiteSettings) -> String {
    let sitemap_url = site.absolute_url("/sitemap.xml");
    format!("User-agent: *\nAllow: /\nSitemap: {sitemap_url}\n")
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
