//! Repository endpoint configuration.
//!
//! One explicit value carried by everything that builds URLs, so tests and
//! the config file can point the whole pipeline at a different host.

/// Datastream name the harvester looks for on every item.
pub const EXTRACTED_TEXT_DATASTREAM: &str = "EXTRACTED_TEXT";

#[derive(Debug, Clone)]
pub struct RepoConfig {
    base_url: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self::new("https://repository.library.brown.edu")
    }
}

impl RepoConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search_url(&self) -> String {
        format!("{}/api/search/", self.base_url)
    }

    pub fn item_url(&self, pid: &str) -> String {
        format!("{}/api/items/{pid}/", self.base_url)
    }

    pub fn collection_url(&self, pid: &str) -> String {
        format!("{}/api/collections/{pid}/", self.base_url)
    }

    /// Raw-bytes endpoint for an item's extracted text, used when the item
    /// metadata does not already carry a direct link.
    pub fn storage_text_url(&self, pid: &str) -> String {
        format!(
            "{}/storage/{pid}/{EXTRACTED_TEXT_DATASTREAM}/",
            self.base_url
        )
    }

    /// Human-browsable item page, used when metadata lacks a `uri`.
    pub fn studio_item_url(&self, pid: &str) -> String {
        format!("{}/studio/item/{pid}/", self.base_url)
    }

    pub fn studio_collection_url(&self, pid: &str) -> String {
        format!("{}/studio/collections/{pid}/", self.base_url)
    }
}
