//! Shared scraping helpers.
//!
//! Markup is matched with anchored regular expressions, not a DOM. That
//! is enough for the fixed page shapes the catalog serves, and keeps this
//! whole side of the system thin and replaceable.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CatalogError;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, CatalogError> {
    let http_err = |cause: String| CatalogError::Http {
        url: url.to_string(),
        cause,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| http_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(http_err(format!("HTTP {status}")));
    }
    response.text().await.map_err(|e| http_err(e.to_string()))
}

/// Visible text of an HTML fragment: tags stripped, common entities
/// decoded, whitespace collapsed.
pub(crate) fn text_of(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute form of `href` against the site root.
pub(crate) fn join_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}

/// Element text with a leading `label:` prefix removed.
pub(crate) fn strip_label(text: &str) -> String {
    match text.split_once(':') {
        Some((_, rest)) => rest.trim().to_string(),
        None => text.trim().to_string(),
    }
}
