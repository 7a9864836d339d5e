//! Rolling query performance metrics.
//!
//! The orchestrator records one `QueryMetric` per executed query, the API
//! reads aggregates. Holds the last `capacity` metrics plus a latency
//! histogram covering every query since the last reset.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use crate::error::{AppError, Result};

/// Number of most recent metrics returned by `performance_stats`.
const RECENT_QUERIES: usize = 10;

/// Location label used for queries without a location dimension.
pub const ANY_LOCATION: &str = "any";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    pub location: String,
    pub execution_time_ms: f64,
    pub cache_hit: bool,
    pub filter_count: usize,
    pub result_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPerformance {
    pub queries: u64,
    pub avg_execution_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Queries recorded since the last reset, including ones rotated out of
    /// the rolling window.
    pub total_queries: u64,
    pub avg_execution_time_ms: f64,
    pub cache_hit_rate: f64,
    pub slow_queries: Vec<QueryMetric>,
    /// Newest first.
    pub recent_queries: Vec<QueryMetric>,
    pub performance_by_location: BTreeMap<String, LocationPerformance>,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

struct Inner {
    metrics: VecDeque<QueryMetric>,
    total: u64,
    /// Microseconds.
    latency: Histogram<u64>,
}

pub struct PerformanceMonitor {
    capacity: usize,
    slow_query_ms: f64,
    inner: Mutex<Inner>,
}

impl PerformanceMonitor {
    /// Tracks 1us to 100s at 3 significant figures.
    pub fn new(capacity: usize, slow_query_ms: f64) -> Result<Self> {
        let latency = Histogram::new_with_bounds(1, 100_000_000, 3)
            .map_err(|e| AppError::Config(format!("latency histogram: {e}")))?;
        Ok(Self {
            capacity: capacity.max(1),
            slow_query_ms,
            inner: Mutex::new(Inner {
                metrics: VecDeque::with_capacity(capacity.max(1)),
                total: 0,
                latency,
            }),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, metric: QueryMetric) {
        if metric.execution_time_ms > self.slow_query_ms {
            warn!(
                location = %metric.location,
                execution_time_ms = metric.execution_time_ms,
                filters = metric.filter_count,
                results = metric.result_count,
                "slow query",
            );
        }

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let us = if metric.execution_time_ms.is_finite() {
            metric.execution_time_ms * 1_000.0
        } else {
            0.0
        };
        inner.latency.saturating_record(us.max(1.0) as u64);
        inner.total += 1;
        if inner.metrics.len() == self.capacity {
            inner.metrics.pop_front();
        }
        inner.metrics.push_back(metric);
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        let Ok(inner) = self.inner.lock() else {
            return PerformanceStats::default();
        };
        let metrics = &inner.metrics;
        if metrics.is_empty() {
            return PerformanceStats {
                total_queries: inner.total,
                ..PerformanceStats::default()
            };
        }

        let n = metrics.len() as f64;
        let avg_execution_time_ms = metrics.iter().map(|m| m.execution_time_ms).sum::<f64>() / n;
        let cache_hit_rate = metrics.iter().filter(|m| m.cache_hit).count() as f64 / n;

        let mut by_location: BTreeMap<String, (u64, f64)> = BTreeMap::new();
        for m in metrics {
            let entry = by_location.entry(m.location.clone()).or_default();
            entry.0 += 1;
            entry.1 += m.execution_time_ms;
        }
        let performance_by_location = by_location
            .into_iter()
            .map(|(location, (queries, total_ms))| {
                let avg = total_ms / queries as f64;
                (location, LocationPerformance {
                    queries,
                    avg_execution_time_ms: avg,
                })
            })
            .collect();

        let quantile = |q: f64| -> Option<f64> {
            (inner.latency.len() > 0).then(|| inner.latency.value_at_quantile(q) as f64 / 1_000.0)
        };

        PerformanceStats {
            total_queries: inner.total,
            avg_execution_time_ms,
            cache_hit_rate,
            slow_queries: metrics
                .iter()
                .filter(|m| m.execution_time_ms > self.slow_query_ms)
                .cloned()
                .collect(),
            recent_queries: metrics.iter().rev().take(RECENT_QUERIES).cloned().collect(),
            performance_by_location,
            p50_ms: quantile(0.5),
            p95_ms: quantile(0.95),
            p99_ms: quantile(0.99),
        }
    }

    pub fn reset(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.metrics.clear();
            inner.total = 0;
            inner.latency.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(location: &str, ms: f64, cache_hit: bool) -> QueryMetric {
        QueryMetric {
            location: location.to_string(),
            execution_time_ms: ms,
            cache_hit,
            filter_count: 1,
            result_count: 3,
            recorded_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn empty_monitor_reports_zeroes() {
        let monitor = PerformanceMonitor::new(10, 1_000.0).unwrap();
        let stats = monitor.performance_stats();
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.avg_execution_time_ms, 0.0);
        assert!(stats.p50_ms.is_none());
    }

    #[test]
    fn aggregates_over_the_window() {
        let monitor = PerformanceMonitor::new(10, 1_000.0).unwrap();
        monitor.record(metric("Indio", 100.0, false));
        monitor.record(metric("Indio", 300.0, true));
        monitor.record(metric("La Quinta", 1_500.0, false));

        let stats = monitor.performance_stats();
        assert_eq!(stats.total_queries, 3);
        assert!((stats.avg_execution_time_ms - 633.333).abs() < 0.01);
        assert!((stats.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.slow_queries.len(), 1);
        assert_eq!(stats.slow_queries[0].location, "La Quinta");
        assert_eq!(stats.recent_queries[0].location, "La Quinta");
        assert_eq!(stats.performance_by_location["Indio"].queries, 2);
        assert_eq!(stats.performance_by_location["Indio"].avg_execution_time_ms, 200.0);
        let p99 = stats.p99_ms.unwrap();
        assert!((p99 - 1_500.0).abs() < 2.0, "p99 = {p99}");
    }

    #[test]
    fn window_is_capped_but_total_keeps_counting() {
        let monitor = PerformanceMonitor::new(2, 1_000.0).unwrap();
        for ms in [10.0, 20.0, 30.0] {
            monitor.record(metric("Indio", ms, false));
        }
        let stats = monitor.performance_stats();
        assert_eq!(stats.total_queries, 3);
        assert_eq!(stats.recent_queries.len(), 2);
        assert_eq!(stats.avg_execution_time_ms, 25.0);
    }

    #[test]
    fn reset_clears_everything() {
        let monitor = PerformanceMonitor::new(5, 1_000.0).unwrap();
        monitor.record(metric("Indio", 10.0, false));
        monitor.reset();
        assert_eq!(monitor.performance_stats(), PerformanceStats::default());
    }
}
