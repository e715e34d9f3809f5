use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One discoverable unit of work from the catalog.
///
/// Identity is the stable `id`; the remaining fields are descriptive.
/// Two items with the same id are the same item regardless of metadata
/// drift between scans, so equality and hashing look at `id` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub url: String,
    pub title: String,
    pub developer: String,
    #[serde(default)]
    pub description: String,
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
