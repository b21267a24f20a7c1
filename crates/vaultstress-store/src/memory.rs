//! In-process reference backend
//!
//! [`MemoryBackend`] implements [`StorageBackend`] on top of plain maps so the
//! harness can be driven end to end without a running storage service. It
//! keeps no state on disk and does no query planning; searches scan the
//! container and snapshot the matches when the cursor is opened.

use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::trace;
use vaultstress_core::Attributes;

use crate::backend::{
    ContainerHandle, ItemOptions, ItemRecord, SearchHandle, SearchOptions, StorageBackend,
};
use crate::error::{Result, StoreError};
use crate::query::Query;

type ItemKey = (String, String);

#[derive(Debug, Clone)]
struct StoredItem {
    value: String,
    tags: Attributes,
}

#[derive(Debug, Default)]
struct Container {
    metadata: String,
    items: HashMap<ItemKey, StoredItem>,
    open_handle: Option<i64>,
}

#[derive(Debug)]
struct Cursor {
    total_count: u64,
    pending: VecDeque<ItemRecord>,
    options: SearchOptions,
}

#[derive(Debug, Default)]
struct State {
    containers: HashMap<String, Container>,
    open: HashMap<i64, String>,
    searches: HashMap<i64, Cursor>,
}

impl State {
    fn container_mut(&mut self, handle: ContainerHandle) -> Result<&mut Container> {
        let name = self
            .open
            .get(&handle.0)
            .ok_or(StoreError::InvalidHandle(handle.0))?;
        self.containers
            .get_mut(name)
            .ok_or_else(|| StoreError::ContainerNotFound(name.clone()))
    }

    fn container(&self, handle: ContainerHandle) -> Result<&Container> {
        let name = self
            .open
            .get(&handle.0)
            .ok_or(StoreError::InvalidHandle(handle.0))?;
        self.containers
            .get(name)
            .ok_or_else(|| StoreError::ContainerNotFound(name.clone()))
    }

    fn item_mut(
        &mut self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
    ) -> Result<&mut StoredItem> {
        self.container_mut(handle)?
            .items
            .get_mut(&(item_type.to_string(), id.to_string()))
            .ok_or_else(|| item_not_found(item_type, id))
    }
}

fn item_not_found(item_type: &str, id: &str) -> StoreError {
    StoreError::ItemNotFound {
        item_type: item_type.to_string(),
        id: id.to_string(),
    }
}

fn check_json(label: &str, text: &str) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|e| StoreError::InvalidStructure(format!("{}: {}", label, e)))
}

fn render(id: &str, item_type: &str, item: &StoredItem, options: &ItemOptions) -> ItemRecord {
    ItemRecord {
        id: id.to_string(),
        item_type: options.retrieve_type.then(|| item_type.to_string()),
        value: options.retrieve_value.then(|| item.value.clone()),
        tags: options.retrieve_tags.then(|| item.tags.clone()),
    }
}

/// Thread-safe in-memory storage backend
#[derive(Debug)]
pub struct MemoryBackend {
    state: RwLock<State>,
    next_handle: AtomicI64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
            next_handle: AtomicI64::new(1),
        }
    }

    /// Number of containers that exist
    pub fn container_count(&self) -> usize {
        self.state.read().containers.len()
    }

    /// Whether a container exists
    pub fn contains_container(&self, name: &str) -> bool {
        self.state.read().containers.contains_key(name)
    }

    /// Whether a container is currently open
    pub fn is_open(&self, name: &str) -> bool {
        self.state
            .read()
            .containers
            .get(name)
            .is_some_and(|c| c.open_handle.is_some())
    }

    /// Number of items in a container
    pub fn item_count(&self, name: &str) -> Option<usize> {
        self.state.read().containers.get(name).map(|c| c.items.len())
    }

    /// Attributes of one item, regardless of open state
    pub fn item_attributes(&self, name: &str, item_type: &str, id: &str) -> Option<Attributes> {
        self.state
            .read()
            .containers
            .get(name)?
            .items
            .get(&(item_type.to_string(), id.to_string()))
            .map(|item| item.tags.clone())
    }

    fn allocate_handle(&self) -> i64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

impl StorageBackend for MemoryBackend {
    fn create_container(
        &self,
        name: &str,
        _storage_type: &str,
        config: &str,
        credentials: &str,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(StoreError::InvalidStructure("empty container name".to_string()));
        }
        check_json("config", config)?;
        check_json("credentials", credentials)?;

        let mut state = self.state.write();
        if state.containers.contains_key(name) {
            return Err(StoreError::ContainerAlreadyExists(name.to_string()));
        }
        state.containers.insert(name.to_string(), Container::default());
        trace!(container = name, "Created container");
        Ok(())
    }

    fn open_container(&self, name: &str, credentials: &str) -> Result<ContainerHandle> {
        check_json("credentials", credentials)?;

        let handle = self.allocate_handle();
        let mut state = self.state.write();
        let container = state
            .containers
            .get_mut(name)
            .ok_or_else(|| StoreError::ContainerNotFound(name.to_string()))?;
        if container.open_handle.is_some() {
            return Err(StoreError::ContainerAlreadyOpen(name.to_string()));
        }
        container.open_handle = Some(handle);
        state.open.insert(handle, name.to_string());
        Ok(ContainerHandle(handle))
    }

    fn close_container(&self, handle: ContainerHandle) -> Result<()> {
        let mut state = self.state.write();
        let name = state
            .open
            .remove(&handle.0)
            .ok_or(StoreError::InvalidHandle(handle.0))?;
        if let Some(container) = state.containers.get_mut(&name) {
            container.open_handle = None;
        }
        Ok(())
    }

    fn delete_container(&self, name: &str, credentials: &str) -> Result<()> {
        check_json("credentials", credentials)?;

        let mut state = self.state.write();
        let is_open = state
            .containers
            .get(name)
            .map(|container| container.open_handle.is_some());
        match is_open {
            None => Err(StoreError::ContainerNotFound(name.to_string())),
            Some(true) => Err(StoreError::ContainerAlreadyOpen(name.to_string())),
            Some(false) => {
                state.containers.remove(name);
                trace!(container = name, "Deleted container");
                Ok(())
            }
        }
    }

    fn set_metadata(&self, handle: ContainerHandle, metadata: &str) -> Result<()> {
        self.state.write().container_mut(handle)?.metadata = metadata.to_string();
        Ok(())
    }

    fn get_metadata(&self, handle: ContainerHandle) -> Result<String> {
        Ok(self.state.read().container(handle)?.metadata.clone())
    }

    fn add_item(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        value: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        let mut state = self.state.write();
        let container = state.container_mut(handle)?;
        let key = (item_type.to_string(), id.to_string());
        if container.items.contains_key(&key) {
            return Err(StoreError::ItemAlreadyExists {
                item_type: item_type.to_string(),
                id: id.to_string(),
            });
        }
        container.items.insert(
            key,
            StoredItem {
                value: value.to_string(),
                tags: attributes.clone(),
            },
        );
        Ok(())
    }

    fn get_item(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        options: &ItemOptions,
    ) -> Result<serde_json::Value> {
        let state = self.state.read();
        let item = state
            .container(handle)?
            .items
            .get(&(item_type.to_string(), id.to_string()))
            .ok_or_else(|| item_not_found(item_type, id))?;
        Ok(serde_json::to_value(render(id, item_type, item, options))?)
    }

    fn delete_item(&self, handle: ContainerHandle, item_type: &str, id: &str) -> Result<()> {
        let mut state = self.state.write();
        state
            .container_mut(handle)?
            .items
            .remove(&(item_type.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| item_not_found(item_type, id))
    }

    fn update_item_value(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        value: &str,
    ) -> Result<()> {
        self.state.write().item_mut(handle, item_type, id)?.value = value.to_string();
        Ok(())
    }

    fn add_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        let mut state = self.state.write();
        let item = state.item_mut(handle, item_type, id)?;
        item.tags
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn update_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        self.state.write().item_mut(handle, item_type, id)?.tags = attributes.clone();
        Ok(())
    }

    fn delete_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        names: &[String],
    ) -> Result<()> {
        let mut state = self.state.write();
        let item = state.item_mut(handle, item_type, id)?;
        for name in names {
            item.tags.remove(name);
        }
        Ok(())
    }

    fn open_search(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchHandle> {
        let query = Query::parse(query)?;
        let item_options = options.item_options();
        let search_id = self.allocate_handle();

        let mut state = self.state.write();
        let container = state.container(handle)?;
        let mut matches: Vec<ItemRecord> = container
            .items
            .iter()
            .filter(|((t, _), item)| t == item_type && query.matches(&item.tags))
            .map(|((t, id), item)| render(id, t, item, &item_options))
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));

        state.searches.insert(
            search_id,
            Cursor {
                total_count: matches.len() as u64,
                pending: matches.into(),
                options: *options,
            },
        );
        Ok(SearchHandle(search_id))
    }

    fn fetch_next_results(
        &self,
        search: SearchHandle,
        count: usize,
    ) -> Result<serde_json::Value> {
        let mut state = self.state.write();
        let cursor = state
            .searches
            .get_mut(&search.0)
            .ok_or(StoreError::InvalidHandle(search.0))?;

        let take = count.min(cursor.pending.len());
        let page: Vec<ItemRecord> = cursor.pending.drain(..take).collect();

        let total_count = cursor
            .options
            .retrieve_total_count
            .then_some(cursor.total_count);
        let records = if cursor.options.retrieve_records {
            serde_json::to_value(page)?
        } else {
            serde_json::Value::Null
        };

        Ok(serde_json::json!({
            "totalCount": total_count,
            "records": records,
        }))
    }

    fn close_search(&self, search: SearchHandle) -> Result<()> {
        self.state
            .write()
            .searches
            .remove(&search.0)
            .map(|_| ())
            .ok_or(StoreError::InvalidHandle(search.0))
    }
}
