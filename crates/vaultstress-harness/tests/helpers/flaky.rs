//! FlakyBackend - a MemoryBackend that fails on request
//!
//! Tests arm a [`FailPoint`] with a number of calls to fail; each armed call
//! returns an IO error instead of reaching the inner backend.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use vaultstress_core::Attributes;
use vaultstress_store::{
    ContainerHandle, ItemOptions, MemoryBackend, SearchHandle, SearchOptions, StorageBackend,
    StoreError,
};

type Result<T> = std::result::Result<T, StoreError>;

/// Backend calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Create,
    Open,
    Close,
    AddItem,
    Search,
}

pub struct FlakyBackend {
    pub inner: MemoryBackend,
    armed: Mutex<HashMap<FailPoint, usize>>,
    injected: AtomicU64,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            armed: Mutex::new(HashMap::new()),
            injected: AtomicU64::new(0),
        }
    }

    /// Make the next `count` calls at `point` fail
    pub fn fail_next(&self, point: FailPoint, count: usize) {
        *self.armed.lock().entry(point).or_insert(0) += count;
    }

    /// Number of failures handed out so far
    pub fn injected(&self) -> u64 {
        self.injected.load(Ordering::Relaxed)
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        let mut armed = self.armed.lock();
        match armed.get_mut(&point) {
            Some(left) if *left > 0 => {
                *left -= 1;
                self.injected.fetch_add(1, Ordering::Relaxed);
                Err(StoreError::Io(format!("injected failure at {:?}", point)))
            }
            _ => Ok(()),
        }
    }
}

impl StorageBackend for FlakyBackend {
    fn create_container(
        &self,
        name: &str,
        storage_type: &str,
        config: &str,
        credentials: &str,
    ) -> Result<()> {
        self.check(FailPoint::Create)?;
        self.inner
            .create_container(name, storage_type, config, credentials)
    }

    fn open_container(&self, name: &str, credentials: &str) -> Result<ContainerHandle> {
        self.check(FailPoint::Open)?;
        self.inner.open_container(name, credentials)
    }

    fn close_container(&self, handle: ContainerHandle) -> Result<()> {
        self.check(FailPoint::Close)?;
        self.inner.close_container(handle)
    }

    fn delete_container(&self, name: &str, credentials: &str) -> Result<()> {
        self.inner.delete_container(name, credentials)
    }

    fn set_metadata(&self, handle: ContainerHandle, metadata: &str) -> Result<()> {
        self.inner.set_metadata(handle, metadata)
    }

    fn get_metadata(&self, handle: ContainerHandle) -> Result<String> {
        self.inner.get_metadata(handle)
    }

    fn add_item(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        value: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        self.check(FailPoint::AddItem)?;
        self.inner.add_item(handle, item_type, id, value, attributes)
    }

    fn get_item(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        options: &ItemOptions,
    ) -> Result<serde_json::Value> {
        self.inner.get_item(handle, item_type, id, options)
    }

    fn delete_item(&self, handle: ContainerHandle, item_type: &str, id: &str) -> Result<()> {
        self.inner.delete_item(handle, item_type, id)
    }

    fn update_item_value(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        value: &str,
    ) -> Result<()> {
        self.inner.update_item_value(handle, item_type, id, value)
    }

    fn add_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        self.inner.add_attributes(handle, item_type, id, attributes)
    }

    fn update_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        attributes: &Attributes,
    ) -> Result<()> {
        self.inner.update_attributes(handle, item_type, id, attributes)
    }

    fn delete_attributes(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        id: &str,
        names: &[String],
    ) -> Result<()> {
        self.inner.delete_attributes(handle, item_type, id, names)
    }

    fn open_search(
        &self,
        handle: ContainerHandle,
        item_type: &str,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchHandle> {
        self.check(FailPoint::Search)?;
        self.inner.open_search(handle, item_type, query, options)
    }

    fn fetch_next_results(&self, search: SearchHandle, count: usize) -> Result<serde_json::Value> {
        self.inner.fetch_next_results(search, count)
    }

    fn close_search(&self, search: SearchHandle) -> Result<()> {
        self.inner.close_search(search)
    }
}
