//! Run summaries for the load driver and the chained benchmark

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Aggregated timings of one benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub label: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Timed spans recorded across all threads
    pub spans: usize,
    /// Backend calls made inside the timed spans
    pub operations: u64,
    /// Longest single span
    pub max: Duration,
    /// Sum of all spans
    pub sum: Duration,
    /// First thread start to last thread join
    pub wall_clock: Duration,
    pub approx_tps: f64,
    /// Backend calls that returned an error
    pub failures: u64,
}

impl RunSummary {
    /// Combine per-thread duration lists into one summary
    ///
    /// `entities` and `items_per_entity` feed the throughput estimate only.
    /// `operations` counts backend calls, which may exceed the span count
    /// when one span covers every item of a container.
    pub fn aggregate(
        label: impl Into<String>,
        started_at: DateTime<Utc>,
        per_thread: &[Vec<Duration>],
        wall_clock: Duration,
        entities: usize,
        items_per_entity: usize,
        operations: u64,
        failures: u64,
    ) -> Self {
        let all = per_thread.iter().flatten();
        let max = all.clone().copied().max().unwrap_or_default();
        let sum = all.clone().sum();
        let spans = all.count();

        Self {
            label: label.into(),
            run_id: Uuid::new_v4(),
            started_at,
            spans,
            operations,
            max,
            sum,
            wall_clock,
            approx_tps: approx_tps(entities, items_per_entity, wall_clock),
            failures,
        }
    }

    /// Mean span, zero when nothing ran
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.spans) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.sum / n,
        }
    }
}

/// `(entities x items) / seconds`, substituting 1 for zero counts and one
/// second for a zero wall clock
pub fn approx_tps(entities: usize, items_per_entity: usize, wall_clock: Duration) -> f64 {
    let entities = entities.max(1) as f64;
    let items = items_per_entity.max(1) as f64;
    let seconds = if wall_clock.is_zero() {
        1.0
    } else {
        wall_clock.as_secs_f64()
    };
    entities * items / seconds
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "================ {} ================", self.label)?;
        writeln!(f, "Run Id:                  {}", self.run_id)?;
        writeln!(f, "Started At:              {}", self.started_at.to_rfc3339())?;
        writeln!(f, "Max Execution Time:      {:?}", self.max)?;
        writeln!(f, "Operations Executed:     {}", self.operations)?;
        writeln!(f, "Timed Spans:             {}", self.spans)?;
        writeln!(f, "Sum of Execution Times:  {:?}", self.sum)?;
        writeln!(f, "Total Duration:          {:?}", self.wall_clock)?;
        writeln!(f, "Approx TPS:              {:.2}", self.approx_tps)?;
        write!(f, "Failures:                {}", self.failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_tps() {
        assert_eq!(approx_tps(10, 10, Duration::from_secs(1)), 100.0);
        assert_eq!(approx_tps(10, 10, Duration::from_millis(500)), 200.0);
    }

    #[test]
    fn test_approx_tps_zero_inputs() {
        assert_eq!(approx_tps(0, 10, Duration::from_secs(1)), 10.0);
        assert_eq!(approx_tps(10, 0, Duration::from_secs(2)), 5.0);
        assert_eq!(approx_tps(0, 0, Duration::ZERO), 1.0);
    }

    #[test]
    fn test_aggregate() {
        let per_thread = vec![
            vec![Duration::from_millis(10), Duration::from_millis(30)],
            vec![],
            vec![Duration::from_millis(20)],
        ];
        let summary = RunSummary::aggregate(
            "add_item",
            Utc::now(),
            &per_thread,
            Duration::from_secs(1),
            10,
            10,
            12,
            2,
        );

        assert_eq!(summary.spans, 3);
        assert_eq!(summary.operations, 12);
        assert_eq!(summary.max, Duration::from_millis(30));
        assert_eq!(summary.sum, Duration::from_millis(60));
        assert_eq!(summary.mean(), Duration::from_millis(20));
        assert_eq!(summary.approx_tps, 100.0);
        assert_eq!(summary.failures, 2);

        let rendered = summary.to_string();
        assert!(rendered.contains("add_item"));
        assert!(rendered.contains("Operations Executed:     12"));
        assert!(rendered.contains("Timed Spans:             3"));
        assert!(rendered.contains("Approx TPS:              100.00"));
    }

    #[test]
    fn test_aggregate_empty() {
        let summary = RunSummary::aggregate("empty", Utc::now(), &[], Duration::ZERO, 0, 0, 0, 0);
        assert_eq!(summary.spans, 0);
        assert_eq!(summary.operations, 0);
        assert_eq!(summary.max, Duration::ZERO);
        assert_eq!(summary.mean(), Duration::ZERO);
    }
}
