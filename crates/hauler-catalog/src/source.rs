use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::CatalogError;
use crate::index::CatalogSource;
use crate::item::Item;
use crate::scrape::{get_text, join_url, text_of};

static ITEM_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<li[^>]*class="[^"]*\bcol\b[^"]*"[^>]*>.*?</li>"#).unwrap());
static ITEM_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([^"]*?/game/(\d+)[^"]*)""#).unwrap());
static BLOCK_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h3[^>]*>(.*?)</h3>").unwrap());
static BLOCK_DEVELOPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<h4[^>]*>.*?<a[^>]*>(.*?)</a>").unwrap());
static BLOCK_DESCRIPTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p[^>]*>(.*?)</p>").unwrap());
static PAGE_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<h1[^>]*>(.*?)</h1>").unwrap());
static PAGE_DEVELOPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<h3[^>]*>.*?<a[^>]*>(.*?)</a>").unwrap());
static ID_IN_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/game/(\d+)").unwrap());

/// Scrapes the paginated listing into [`Item`] records.
pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
    listing_path: String,
}

impl HttpCatalogSource {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        listing_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            listing_path: listing_path.into(),
        }
    }

    fn page_url(&self, page: u32) -> String {
        let listing = join_url(&self.base_url, &self.listing_path);
        if page <= 1 {
            listing
        } else {
            format!("{}/page-{page}", listing.trim_end_matches('/'))
        }
    }

    /// Every item block on a listing page.
    ///
    /// A block missing its item link is dropped with a warning; one broken
    /// entry never costs the rest of the page.
    fn extract_items(&self, html: &str) -> Vec<Item> {
        let mut items = Vec::new();
        for block in ITEM_BLOCK.find_iter(html) {
            let block = block.as_str();
            let Some(link) = ITEM_LINK.captures(block) else {
                warn!("catalog entry without an item link, dropping it");
                continue;
            };
            let id = link[2].to_string();
            let title = BLOCK_TITLE
                .captures(block)
                .map(|c| text_of(&c[1]))
                .unwrap_or_else(|| format!("item-{id}"));
            items.push(Item {
                url: join_url(&self.base_url, &link[1]),
                title,
                developer: BLOCK_DEVELOPER
                    .captures(block)
                    .map(|c| text_of(&c[1]))
                    .unwrap_or_default(),
                description: BLOCK_DESCRIPTION
                    .captures(block)
                    .map(|c| text_of(&c[1]))
                    .unwrap_or_default(),
                id,
            });
        }
        items
    }

    /// A single item built from its detail page, for one-off runs that
    /// bypass the listing.
    pub async fn single_item(&self, url: &str) -> Result<Item, CatalogError> {
        let id = ID_IN_URL
            .captures(url)
            .map(|c| c[1].to_string())
            .ok_or(CatalogError::NotFound)?;
        let html = get_text(&self.client, url).await?;
        let title = PAGE_TITLE
            .captures(&html)
            .map(|c| text_of(&c[1]))
            .unwrap_or_else(|| format!("item-{id}"));
        let developer = PAGE_DEVELOPER
            .captures(&html)
            .map(|c| text_of(&c[1]))
            .unwrap_or_default();
        Ok(Item {
            id,
            url: url.to_string(),
            title,
            developer,
            description: String::new(),
        })
    }
}

impl CatalogSource for HttpCatalogSource {
    async fn page_items(&self, page: u32) -> Result<Vec<Item>, CatalogError> {
        let url = self.page_url(page);
        let html = get_text(&self.client, &url).await?;
        Ok(self.extract_items(&html))
    }
}
