//! Entity state registry
//!
//! One lifecycle counter per container: `-1` until the container is created,
//! then the number of items the owning worker believes are present.
//!
//! Slots are `AtomicI64` so the monitor can read while workers write. Writers
//! never contend: a worker only receives an [`OwnedSlots`] view for its own
//! partition, and partitions never overlap.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::{CoreError, Result};
use crate::partition::Partition;

/// Counter value for a container that has not been created yet
pub const NOT_CREATED: i64 = -1;

/// Fixed-size table of lifecycle counters
#[derive(Debug)]
pub struct EntityRegistry {
    slots: Box<[AtomicI64]>,
}

impl EntityRegistry {
    /// Create a registry of `len` slots, all set to [`NOT_CREATED`]
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicI64::new(NOT_CREATED)).collect(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read a counter
    pub fn get(&self, index: usize) -> Result<i64> {
        self.slot(index).map(|slot| slot.load(Ordering::Acquire))
    }

    /// Overwrite a counter
    pub fn set(&self, index: usize, value: i64) -> Result<()> {
        self.slot(index)?.store(value, Ordering::Release);
        Ok(())
    }

    /// Copy every counter, tolerating concurrent writers
    pub fn snapshot(&self) -> Vec<i64> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .collect()
    }

    /// Hand out the write view for one partition
    pub fn owned(self: &Arc<Self>, partition: Partition) -> Result<OwnedSlots> {
        if partition.max() >= self.len() {
            return Err(CoreError::IndexOutOfRange {
                index: partition.max(),
                len: self.len(),
            });
        }
        Ok(OwnedSlots {
            registry: Arc::clone(self),
            partition,
        })
    }

    fn slot(&self, index: usize) -> Result<&AtomicI64> {
        self.slots.get(index).ok_or(CoreError::IndexOutOfRange {
            index,
            len: self.slots.len(),
        })
    }
}

/// Write access to the slots of a single partition
#[derive(Debug, Clone)]
pub struct OwnedSlots {
    registry: Arc<EntityRegistry>,
    partition: Partition,
}

impl OwnedSlots {
    /// The partition this view covers
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Read an owned counter
    pub fn get(&self, index: usize) -> Result<i64> {
        self.check(index)?;
        self.registry.get(index)
    }

    /// Write an owned counter
    pub fn set(&self, index: usize, value: i64) -> Result<()> {
        self.check(index)?;
        self.registry.set(index, value)
    }

    fn check(&self, index: usize) -> Result<()> {
        if self.partition.contains(index) {
            Ok(())
        } else {
            Err(CoreError::NotOwned {
                index,
                min: self.partition.min(),
                max: self.partition.max(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::split;

    #[test]
    fn test_new_registry_is_uncreated() {
        let registry = EntityRegistry::new(8);
        assert_eq!(registry.len(), 8);
        assert!(registry.snapshot().iter().all(|v| *v == NOT_CREATED));
    }

    #[test]
    fn test_get_set_bounds() {
        let registry = EntityRegistry::new(4);
        registry.set(3, 7).unwrap();
        assert_eq!(registry.get(3).unwrap(), 7);
        assert!(matches!(
            registry.get(4),
            Err(CoreError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_owned_slots_reject_foreign_index() {
        let registry = Arc::new(EntityRegistry::new(10));
        let parts = split(10, 2).unwrap();
        let first = registry.owned(parts[0]).unwrap();

        first.set(4, 2).unwrap();
        assert_eq!(registry.get(4).unwrap(), 2);
        assert!(matches!(
            first.set(5, 1),
            Err(CoreError::NotOwned {
                index: 5,
                min: 0,
                max: 4,
            })
        ));
        assert_eq!(registry.get(5).unwrap(), NOT_CREATED);
    }

    #[test]
    fn test_owned_rejects_partition_past_end() {
        let registry = Arc::new(EntityRegistry::new(5));
        let part = Partition::new(0, 0, 9).unwrap();
        assert!(registry.owned(part).is_err());
    }

    #[test]
    fn test_concurrent_writers_on_disjoint_partitions() {
        let registry = Arc::new(EntityRegistry::new(400));
        let handles: Vec<_> = split(400, 4)
            .unwrap()
            .into_iter()
            .map(|part| {
                let slots = registry.owned(part).unwrap();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        for id in part.ids() {
                            let current = slots.get(id).unwrap();
                            slots.set(id, current + 1).unwrap();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        // Started at -1, incremented 100 times each.
        assert!(registry.snapshot().iter().all(|v| *v == 99));
    }
}
