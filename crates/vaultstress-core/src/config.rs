//! Configuration types for harness runs
//!
//! A single [`HarnessConfig`] is built at startup (defaults, then an optional
//! JSON file, then command-line overrides) and handed to every component.
//! Nothing reads configuration from globals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::action::ActionKind;
use crate::error::{CoreError, Result};
use crate::model::Attributes;
use crate::policy::MutationPolicy;

/// Main harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// How containers are named and opened on the backend
    pub backend: BackendConfig,
    /// Long-running lifecycle test
    pub longevity: LongevityConfig,
    /// Single-action load test
    pub load: LoadConfig,
    /// Bulk pre-population
    pub populate: PopulateConfig,
    /// Chained per-operation benchmark
    pub chained: ChainedConfig,
    /// Master RNG seed (None = random)
    pub seed: Option<u64>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl HarnessConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.longevity.validate()?;
        self.load.validate()?;
        self.populate.validate()?;
        self.chained.validate()
    }
}

/// Backend naming and connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Prefix prepended to container indices
    pub container_prefix: String,
    /// Storage type passed on container creation
    pub storage_type: String,
    /// Opaque storage configuration JSON
    pub storage_config: String,
    /// Opaque credentials JSON
    pub credentials: String,
    /// Container-scoped type tag for every item
    pub item_type: String,
    /// Prefix for lifecycle item ids
    pub item_id_prefix: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            container_prefix: "wallet_".to_string(),
            storage_type: "default".to_string(),
            storage_config: "{}".to_string(),
            credentials: r#"{"key": "key"}"#.to_string(),
            item_type: "TestType".to_string(),
            item_id_prefix: "record_".to_string(),
        }
    }
}

/// Longevity run parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LongevityConfig {
    /// Total containers (registry size)
    pub total_containers: usize,
    /// Number of lifecycle workers
    pub workers: usize,
    /// Highest counter the monitor counts as regular
    pub max_items_per_container: i64,
    /// Run length, used when `deadline` is unset
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Absolute end of the run
    pub deadline: Option<DateTime<Utc>>,
    /// Iterations between "alive" debug lines (0 = never)
    pub status_every: u64,
    /// Monitor configuration
    pub monitor: MonitorConfig,
    /// Add/delete oscillation bands
    pub policy: MutationPolicy,
}

impl Default for LongevityConfig {
    fn default() -> Self {
        Self {
            total_containers: 100,
            workers: 10,
            max_items_per_container: 10,
            duration: Duration::from_secs(60),
            deadline: None,
            status_every: 100,
            monitor: MonitorConfig::default(),
            policy: MutationPolicy::default(),
        }
    }
}

impl LongevityConfig {
    /// Wall-clock time left until the run should end, measured from `now`
    pub fn run_length(&self, now: DateTime<Utc>) -> Duration {
        match self.deadline {
            Some(deadline) => (deadline - now).to_std().unwrap_or(Duration::ZERO),
            None => self.duration,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_divisible(self.total_containers, self.workers)?;
        if self.max_items_per_container < 0 {
            return Err(CoreError::Config(
                "max_items_per_container must be >= 0".to_string(),
            ));
        }
        self.monitor.validate()?;
        self.policy.validate()?;
        // Counters reach the policy ceiling in healthy runs
        if self.policy.ceiling() > self.max_items_per_container {
            return Err(CoreError::Config(format!(
                "max_items_per_container ({}) is below the mutation policy ceiling ({})",
                self.max_items_per_container,
                self.policy.ceiling()
            )));
        }
        Ok(())
    }
}

/// Monitor loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Time between scans
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Inactivity after which a worker is reported as stale
    #[serde(with = "humantime_serde")]
    pub stale_after: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            stale_after: Duration::from_secs(60),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(CoreError::Config("monitor interval must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Load-test driver parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Worker threads
    pub threads: usize,
    /// Containers across all threads
    pub total_containers: usize,
    /// Items touched per container
    pub items_per_container: usize,
    /// Operation to run
    pub action: ActionKind,
    /// Attribute JSON or search query JSON, depending on the action
    pub payload: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            total_containers: 100,
            items_per_container: 10,
            action: ActionKind::AddItem,
            payload: String::new(),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<()> {
        check_divisible(self.total_containers, self.threads)
    }
}

/// Bulk populator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateConfig {
    /// Populator threads
    pub threads: usize,
    /// Containers to create
    pub total_containers: usize,
    /// Items per container
    pub items_per_container: usize,
    /// Attribute keys and the exact values given to "findable" items
    pub attribute_template: Attributes,
    /// Share of items (by creation order) that get the template values
    pub custom_attribute_percent: u32,
    /// Length of randomized attribute values
    pub random_attribute_len: usize,
    /// Length of the random item value
    pub value_len: usize,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        let attribute_template = [("name", "John"), ("surname", "Doe"), ("country", "Serbia")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self {
            threads: 4,
            total_containers: 100,
            items_per_container: 10,
            attribute_template,
            custom_attribute_percent: 20,
            random_attribute_len: 10,
            value_len: 20,
        }
    }
}

impl PopulateConfig {
    pub fn validate(&self) -> Result<()> {
        check_divisible(self.total_containers, self.threads)?;
        if self.custom_attribute_percent > 100 {
            return Err(CoreError::InvalidPercentage(self.custom_attribute_percent));
        }
        Ok(())
    }
}

/// Chained benchmark parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainedConfig {
    /// Threads per stage
    pub threads: usize,
    /// Operations per thread per stage
    pub operations_per_thread: usize,
}

impl Default for ChainedConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            operations_per_thread: 100,
        }
    }
}

impl ChainedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(CoreError::ZeroWorkers);
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by an env filter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format
    Json,
}

fn check_divisible(total: usize, workers: usize) -> Result<()> {
    if workers == 0 {
        return Err(CoreError::ZeroWorkers);
    }
    if total == 0 || total % workers != 0 {
        return Err(CoreError::InvalidPartition { total, workers });
    }
    Ok(())
}

// Helper module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        s.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
