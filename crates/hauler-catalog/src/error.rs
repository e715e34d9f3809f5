use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The expected link or element is absent from the page. A valid
    /// terminal outcome for an item (it is skipped), not a fault.
    #[error("no download link found")]
    NotFound,

    #[error("request for {url} failed: {cause}")]
    Http { url: String, cause: String },

    #[error(transparent)]
    Cache(#[from] hauler_state::StateError),
}
