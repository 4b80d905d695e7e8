//! Paged "find by key list" wire types.

use serde::{Deserialize, Serialize};

/// One lookup request: a key list fetched as a single page whose size
/// equals the number of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub keys: Vec<String>,
    pub page: u32,
    pub size: usize,
}

impl PageRequest {
    /// First page, sized to the key list.
    pub fn for_keys(keys: Vec<String>) -> Self {
        Self::at_page(keys, 0)
    }

    pub fn at_page(keys: Vec<String>, page: u32) -> Self {
        let size = keys.len();
        Self { keys, page, size }
    }
}

/// A page of results. Keys with no match are simply absent from `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<D> {
    pub content: Vec<D>,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl<D> Page<D> {
    pub fn into_content(self) -> Vec<D> {
        self.content
    }
}
