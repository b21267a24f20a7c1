//! Static partitioning of the container ID space
//!
//! The container space `[0, total)` is split into `workers` contiguous,
//! non-overlapping ranges. Each range is owned by exactly one worker for the
//! lifetime of a run, which is what allows the registry to go without locks.
//!
//! # Example
//!
//! ```rust
//! use vaultstress_core::partition::split;
//!
//! let parts = split(100, 4).unwrap();
//! assert_eq!(parts[0].min(), 0);
//! assert_eq!(parts[0].max(), 24);
//! assert_eq!(parts[3].max(), 99);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::{CoreError, Result};

/// A contiguous, inclusive range of container indices owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    index: usize,
    min: usize,
    max: usize,
}

impl Partition {
    /// Create a partition covering `[min, max]`
    ///
    /// Returns `None` when `min > max`.
    pub fn new(index: usize, min: usize, max: usize) -> Option<Self> {
        (min <= max).then_some(Self { index, min, max })
    }

    /// Position of this partition among its siblings
    pub fn index(&self) -> usize {
        self.index
    }

    /// Lowest owned container index
    pub fn min(&self) -> usize {
        self.min
    }

    /// Highest owned container index (inclusive)
    pub fn max(&self) -> usize {
        self.max
    }

    /// Number of containers in the partition
    pub fn len(&self) -> usize {
        self.max - self.min + 1
    }

    /// Partitions are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether `index` falls inside this partition
    pub fn contains(&self, index: usize) -> bool {
        index >= self.min && index <= self.max
    }

    /// Iterate over the owned indices
    pub fn ids(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Split `total` containers across `workers` workers
///
/// Fails fast when `workers` is zero, `total` is zero, or `total` is not a
/// multiple of `workers`.
pub fn split(total: usize, workers: usize) -> Result<Vec<Partition>> {
    if workers == 0 {
        return Err(CoreError::ZeroWorkers);
    }
    if total == 0 || total % workers != 0 {
        return Err(CoreError::InvalidPartition { total, workers });
    }

    let per_worker = total / workers;
    Ok((0..workers)
        .map(|i| Partition {
            index: i,
            min: i * per_worker,
            max: (i + 1) * per_worker - 1,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_even() {
        let parts = split(12, 3).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!((parts[0].min(), parts[0].max()), (0, 3));
        assert_eq!((parts[1].min(), parts[1].max()), (4, 7));
        assert_eq!((parts[2].min(), parts[2].max()), (8, 11));
        assert!(parts.iter().all(|p| p.len() == 4));
    }

    #[test]
    fn test_split_rejects_uneven() {
        assert!(matches!(
            split(10, 3),
            Err(CoreError::InvalidPartition {
                total: 10,
                workers: 3,
            })
        ));
        assert!(matches!(split(10, 0), Err(CoreError::ZeroWorkers)));
        assert!(split(0, 1).is_err());
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover_space() {
        for (total, workers) in [(1, 1), (10, 1), (10, 10), (100, 4), (360, 12), (1000, 25)] {
            let parts = split(total, workers).unwrap();
            assert_eq!(parts.len(), workers);

            let mut seen = HashSet::new();
            for part in &parts {
                for id in part.ids() {
                    assert!(seen.insert(id), "index {} owned twice", id);
                }
            }
            assert_eq!(seen.len(), total);
            assert!((0..total).all(|id| seen.contains(&id)));
        }
    }

    #[test]
    fn test_partition_contains_and_display() {
        let part = Partition::new(2, 20, 29).unwrap();
        assert!(part.contains(20));
        assert!(part.contains(29));
        assert!(!part.contains(30));
        assert_eq!(part.to_string(), "20-29");
        assert!(Partition::new(0, 5, 4).is_none());
    }
}
