use std::future::Future;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CatalogError;
use crate::item::Item;
use crate::scrape::{get_text, join_url, strip_label, text_of};

/// Final transfer target for an item.
///
/// Recomputed on every run: resolved URLs are assumed to expire, so none
/// of this is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransfer {
    pub final_url: String,
    pub suggested_name: Option<String>,
    /// Human-readable size from the download page, informational only.
    /// The transfer engine trusts the HTTP headers instead.
    pub size_text: String,
}

/// Maps an item to its downloadable artifact.
pub trait Resolver: Send + Sync {
    /// Resolve `item`, or [`CatalogError::NotFound`] when either hop is
    /// missing its link — a skip, not a fault.
    fn resolve(
        &self,
        item: &Item,
    ) -> impl Future<Output = Result<ResolvedTransfer, CatalogError>> + Send;
}

static DOWNLOAD_PAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="[^"]*\bdl-win\b[^"]*"[^>]*>.*?<a[^>]*href="([^"]+)""#)
        .unwrap()
});
static FINAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a[^>]*id="dlLink"[^>]*href="([^"]+)""#).unwrap());
static FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<p[^>]*class="[^"]*\bdl-file-name\b[^"]*"[^>]*>(.*?)</p>"#).unwrap()
});
static FILE_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<p[^>]*class="[^"]*\bdl-file-size\b[^"]*"[^>]*>(.*?)</p>"#).unwrap()
});

/// Two-hop HTTP resolver: item page to download page, download page to
/// the final artifact link plus its advertised name and size.
pub struct HttpResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpResolver {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn download_page_url(&self, html: &str) -> Option<String> {
        DOWNLOAD_PAGE_LINK
            .captures(html)
            .map(|c| join_url(&self.base_url, &c[1]))
    }

    fn final_target(&self, html: &str) -> Option<ResolvedTransfer> {
        let final_url = FINAL_LINK
            .captures(html)
            .map(|c| join_url(&self.base_url, &c[1]))?;
        let suggested_name = FILE_NAME
            .captures(html)
            .map(|c| strip_label(&text_of(&c[1])))
            .filter(|name| !name.is_empty());
        let size_text = FILE_SIZE
            .captures(html)
            .map(|c| strip_label(&text_of(&c[1])))
            .unwrap_or_else(|| "unknown".to_string());
        Some(ResolvedTransfer {
            final_url,
            suggested_name,
            size_text,
        })
    }
}

impl Resolver for HttpResolver {
    async fn resolve(&self, item: &Item) -> Result<ResolvedTransfer, CatalogError> {
        let item_page = get_text(&self.client, &item.url).await?;
        let download_page_url = self
            .download_page_url(&item_page)
            .ok_or(CatalogError::NotFound)?;

        let download_page = get_text(&self.client, &download_page_url).await?;
        self.final_target(&download_page)
            .ok_or(CatalogError::NotFound)
    }
}
