//! Backend client facade
//!
//! The harness only ever talks to storage through [`StorageBackend`]. Every
//! call is a blocking round-trip that either succeeds or fails with a typed
//! [`StoreError`](crate::StoreError); the harness decides what a failure means.

use serde::{Deserialize, Serialize};
use vaultstress_core::Attributes;

use crate::error::Result;

/// Handle to an open container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(pub i64);

/// Handle to an open search cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchHandle(pub i64);

impl std::fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "container#{}", self.0)
    }
}

impl std::fmt::Display for SearchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "search#{}", self.0)
    }
}

/// Which parts of an item `get_item` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOptions {
    pub retrieve_type: bool,
    pub retrieve_value: bool,
    pub retrieve_tags: bool,
}

impl ItemOptions {
    /// Retrieve everything
    pub fn all() -> Self {
        Self {
            retrieve_type: true,
            retrieve_value: true,
            retrieve_tags: true,
        }
    }
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            retrieve_type: false,
            retrieve_value: true,
            retrieve_tags: false,
        }
    }
}

/// Which parts of a search result page are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    pub retrieve_records: bool,
    pub retrieve_total_count: bool,
    pub retrieve_type: bool,
    pub retrieve_value: bool,
    pub retrieve_tags: bool,
}

impl SearchOptions {
    /// Retrieve records, total count, and every item field
    pub fn all() -> Self {
        Self {
            retrieve_records: true,
            retrieve_total_count: true,
            retrieve_type: true,
            retrieve_value: true,
            retrieve_tags: true,
        }
    }

    /// The item fields these options ask for
    pub fn item_options(&self) -> ItemOptions {
        ItemOptions {
            retrieve_type: self.retrieve_type,
            retrieve_value: self.retrieve_value,
            retrieve_tags: self.retrieve_tags,
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            retrieve_records: true,
            retrieve_total_count: false,
            retrieve_type: false,
            retrieve_value: true,
            retrieve_tags: false,
        }
    }
}

/// One item as it appears in a search page or `get_item` reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Attributes>,
}

/// Decoded `fetch_next_results` reply
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub records: Option<Vec<ItemRecord>>,
}

impl SearchPage {
    /// Decode a raw JSON page
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Number of records on this page
    pub fn record_count(&self) -> usize {
        self.records.as_ref().map_or(0, Vec::len)
    }
}

/// Blocking client for a container/item storage service
///
/// Implementations must be shareable across worker threads. Config and
/// credential arguments are opaque JSON strings passed through unchanged.
pub trait StorageBackend: Send + Sync {
    /// Create a new, empty container
    fn create_container(
        &self,
        name: &str,
        storage_type: &str,
        config: &str,
        credentials: &str,
    ) -> Result<()>;

    /// Open an existing container
    fn open_container(&self, name: &str, credentials: &str) -> Result<ContainerHandle>;

    /// Close an open container
    fn close_container(&self, handle: ContainerHandle) -> Result<()>;

    /// Delete a closed container and everything in it
    fn delete_container(&self, name: &str, credentials: &str) -> Result<()>;

    /// Replace the container's metadata blob
    fn set_metadata(&self, handle: ContainerHandle, metadata: &str) -> Result<()>;

    /// Read the container's metadata blob
    fn get_metadata(&self, handle: ContainerHandle) -> Result<String>;

    /// Add an item
    fn add_item(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        value: &str,
        attributes: &Attributes,
    ) -> Result<()>;

    /// Fetch an item as JSON
    fn get_item(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        options: &ItemOptions,
    ) -> Result<serde_json::Value>;

    /// Delete an item
    fn delete_item(&self, handle: ContainerHandle, item_type: &str, id: &str) -> Result<()>;

    /// Replace an item's value
    fn update_item_value(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        value: &str,
    ) -> Result<()>;

    /// Add attributes, overwriting keys that already exist
    fn add_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        attributes: &Attributes,
    ) -> Result<()>;

    /// Replace all attributes of an item
    fn update_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        attributes: &Attributes,
    ) -> Result<()>;

    /// Remove the named attribute keys
    fn delete_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        names: &[String],
    ) -> Result<()>;

    /// Start an attribute-based search
    fn open_search(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchHandle>;

    /// Fetch up to `count` results as `{"totalCount": .., "records": [..]}`
    fn fetch_next_results(&self, search: SearchHandle, count: usize)
        -> Result<serde_json::Value>;

    /// Release a search cursor
    fn close_search(&self, search: SearchHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_serialize_camel_case() {
        let json = serde_json::to_value(SearchOptions::all()).unwrap();
        assert_eq!(json["retrieveTotalCount"], true);
        assert_eq!(json["retrieveRecords"], true);

        let json = serde_json::to_value(ItemOptions::default()).unwrap();
        assert_eq!(json["retrieveValue"], true);
        assert_eq!(json["retrieveTags"], false);
    }

    #[test]
    fn test_search_page_decode() {
        let page = SearchPage::from_json(&json!({
            "totalCount": 3,
            "records": [{"id": "record_1", "type": "TestType", "value": "v"}]
        }))
        .unwrap();

        assert_eq!(page.total_count, Some(3));
        assert_eq!(page.record_count(), 1);
        let record = &page.records.as_ref().unwrap()[0];
        assert_eq!(record.item_type.as_deref(), Some("TestType"));
        assert!(record.tags.is_none());
    }

    #[test]
    fn test_search_page_without_count() {
        let page = SearchPage::from_json(&json!({"records": []})).unwrap();
        assert_eq!(page.total_count, None);
        assert!(SearchPage::from_json(&json!({"totalCount": "many"})).is_err());
    }
}
