//! Container and item naming
//!
//! Containers are addressed by integer index and mapped to backend names
//! through a prefix. Item ids are derived from counters so that one owner can
//! always predict which ids exist.

use std::collections::BTreeMap;

use crate::error::Result;

/// Item attributes: unique string keys mapped to string values
pub type Attributes = BTreeMap<String, String>;

/// Backend name of a container
pub fn container_name(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index)
}

/// Id of the `n`-th item added to a container by a lifecycle worker
pub fn lifecycle_item_id(prefix: &str, n: i64) -> String {
    format!("{}{}", prefix, n)
}

/// Id of item `item` inside bulk-populated container `container`
pub fn bulk_item_id(container: usize, item: usize) -> String {
    format!("item_{}_{}", container, item)
}

/// Parse a flat JSON object of string values into [`Attributes`]
///
/// An empty or whitespace-only string yields an empty map.
pub fn parse_attributes(json: &str) -> Result<Attributes> {
    if json.trim().is_empty() {
        return Ok(Attributes::new());
    }
    Ok(serde_json::from_str(json)?)
}
