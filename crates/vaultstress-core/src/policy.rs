//! Item-count oscillation policy
//!
//! Keeps each container's item count inside a bounded band: low counts always
//! grow, a middle band mostly grows and sometimes shrinks, and anything above
//! the band always shrinks.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The item-level mutation applied in one worker iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutation {
    /// Add item `counter + 1`
    Add,
    /// Delete item `counter`
    Delete,
}

/// Three-band add/delete policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationPolicy {
    /// Counters in `[0, always_add_max]` always add
    pub always_add_max: i64,
    /// Counters in `(always_add_max, mixed_max]` add with `add_probability`
    pub mixed_max: i64,
    /// Probability of adding inside the mixed band
    pub add_probability: f64,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        Self {
            always_add_max: 6,
            mixed_max: 9,
            add_probability: 0.75,
        }
    }
}

impl MutationPolicy {
    /// Check band ordering and probability range
    pub fn validate(&self) -> Result<()> {
        if self.always_add_max < 0 {
            return Err(CoreError::InvalidPolicy(format!(
                "always_add_max must be >= 0, got {}",
                self.always_add_max
            )));
        }
        if self.mixed_max < self.always_add_max {
            return Err(CoreError::InvalidPolicy(format!(
                "mixed_max ({}) must be >= always_add_max ({})",
                self.mixed_max, self.always_add_max
            )));
        }
        if !(0.0..=1.0).contains(&self.add_probability) {
            return Err(CoreError::InvalidPolicy(format!(
                "add_probability must be within [0, 1], got {}",
                self.add_probability
            )));
        }
        Ok(())
    }

    /// Pick the mutation for a container currently holding `counter` items
    pub fn choose<R: Rng + ?Sized>(&self, counter: i64, rng: &mut R) -> Mutation {
        if counter <= self.always_add_max {
            Mutation::Add
        } else if counter <= self.mixed_max {
            if rng.gen::<f64>() < self.add_probability {
                Mutation::Add
            } else {
                Mutation::Delete
            }
        } else {
            Mutation::Delete
        }
    }

    /// Highest counter a container can reach under this policy
    pub fn ceiling(&self) -> i64 {
        self.mixed_max + 1
    }
}
