//! Paginated list envelopes returned by the list endpoints

use serde::{Deserialize, Serialize};

/// Page metadata. Only `totalItems` is guaranteed by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total_items: u64,
    #[serde(default)]
    pub item_count: Option<u64>,
    #[serde(default)]
    pub items_per_page: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u64>,
}

/// A page of resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Paginated<T> {
    /// Number of pages, derived from the totals when the server omits it
    pub fn page_count(&self) -> u64 {
        if let Some(pages) = self.meta.total_pages {
            return pages;
        }
        match self.meta.items_per_page {
            Some(per_page) if per_page > 0 => self.meta.total_items.div_ceil(per_page),
            _ => u64::from(self.meta.total_items > 0),
        }
    }
}
