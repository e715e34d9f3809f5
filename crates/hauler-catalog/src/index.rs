use std::future::Future;
use std::ops::RangeInclusive;
use std::path::Path;

use tracing::{info, warn};

use hauler_state::fs::{AtomicWriteOptions, atomic_write};

use crate::error::CatalogError;
use crate::item::Item;

/// Produces the items listed on one catalog page.
pub trait CatalogSource: Send + Sync {
    /// Items on `page` (1-based). An empty list means the page lists
    /// nothing, which ends a scan; it is never an error.
    fn page_items(&self, page: u32)
    -> impl Future<Output = Result<Vec<Item>, CatalogError>> + Send;
}

/// The catalog, from cache when possible.
///
/// With an existing snapshot and no `force_rescan`, the persisted items
/// come back with zero network requests. Otherwise the page range is
/// scanned and the result persisted atomically before returning.
/// Staleness of a cached snapshot is accepted; rescanning is an explicit
/// choice.
pub async fn load_or_scan<S: CatalogSource>(
    cache_path: &Path,
    source: &S,
    pages: RangeInclusive<u32>,
    force_rescan: bool,
) -> Result<Vec<Item>, CatalogError> {
    if !force_rescan {
        if let Some(items) = read_cache(cache_path) {
            info!(count = items.len(), path = %cache_path.display(), "using catalog cache");
            return Ok(items);
        }
    }

    let items = scan(source, pages).await;
    let body = serde_json::to_vec_pretty(&items).map_err(|source| {
        CatalogError::Cache(hauler_state::StateError::Encode {
            path: cache_path.to_path_buf(),
            source,
        })
    })?;
    atomic_write(cache_path, &body, AtomicWriteOptions::new())?;
    info!(count = items.len(), path = %cache_path.display(), "catalog snapshot written");
    Ok(items)
}

/// The cached snapshot, if one exists and parses.
pub fn read_cache(path: &Path) -> Option<Vec<Item>> {
    let bytes = std::fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(items) => Some(items),
        Err(err) => {
            warn!(path = %path.display(), %err, "catalog cache is corrupt, ignoring it");
            None
        }
    }
}

async fn scan<S: CatalogSource>(source: &S, pages: RangeInclusive<u32>) -> Vec<Item> {
    let mut items = Vec::new();
    for page in pages {
        match source.page_items(page).await {
            Ok(page_items) if page_items.is_empty() => {
                info!(page, "empty catalog page, ending scan");
                break;
            }
            Ok(mut page_items) => {
                info!(page, count = page_items.len(), "scanned catalog page");
                items.append(&mut page_items);
            }
            Err(err) => {
                // A bad page costs its items, not the run.
                warn!(page, %err, "catalog page scan failed, skipping");
            }
        }
    }
    items
}
