use serde::{Deserialize, Serialize};

use super::stats::{mean, median_sorted, percentile_sorted, sorted_finite};
use crate::config::dom_thresholds::*;
use crate::types::Listing;

/// Overall market pace, classified from the median days on market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketVelocity {
    /// median < 30 days
    Fast,
    /// median 30–59 days
    Moderate,
    /// median >= 60 days
    Slow,
}

impl MarketVelocity {
    pub fn from_median(median: f64) -> Self {
        if median < FAST_MEDIAN {
            MarketVelocity::Fast
        } else if median < MODERATE_MEDIAN {
            MarketVelocity::Moderate
        } else {
            MarketVelocity::Slow
        }
    }
}

impl std::fmt::Display for MarketVelocity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MarketVelocity::Fast => "fast",
            MarketVelocity::Moderate => "moderate",
            MarketVelocity::Slow => "slow",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomStats {
    /// Listings that carried a DOM value.
    pub count: usize,
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    /// Listed under 7 days.
    pub fresh_count: usize,
    /// Listed over 90 days.
    pub stale_count: usize,
    /// None when no listing carried a DOM value.
    pub velocity: Option<MarketVelocity>,
}

pub fn calculate_dom_stats(listings: &[Listing]) -> DomStats {
    let values: Vec<f64> = listings
        .iter()
        .filter_map(|l| l.days_on_market)
        .map(f64::from)
        .collect();
    dom_stats_from_values(&values)
}

pub fn dom_stats_from_values(values: &[f64]) -> DomStats {
    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        return DomStats::default();
    }
    let median = median_sorted(&sorted);
    DomStats {
        count: sorted.len(),
        average: mean(&sorted),
        median,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        p25: percentile_sorted(&sorted, 0.25),
        p75: percentile_sorted(&sorted, 0.75),
        fresh_count: sorted.iter().filter(|d| **d < FRESH_DAYS).count(),
        stale_count: sorted.iter().filter(|d| **d > STALE_DAYS).count(),
        velocity: Some(MarketVelocity::from_median(median)),
    }
}

/// One to four sentences describing the DOM distribution.
pub fn dom_insights(stats: &DomStats) -> Vec<String> {
    let Some(velocity) = stats.velocity else {
        return vec!["No days-on-market data is available for these listings.".to_string()];
    };

    let mut insights = vec![match velocity {
        MarketVelocity::Fast => format!(
            "Homes are selling fast, with a median of {:.0} days on market.",
            stats.median
        ),
        MarketVelocity::Moderate => format!(
            "The market is moving at a moderate pace, with a median of {:.0} days on market.",
            stats.median
        ),
        MarketVelocity::Slow => format!(
            "Homes are selling slowly, with a median of {:.0} days on market.",
            stats.median
        ),
    }];

    if stats.fresh_count > FRESH_INSIGHT_MIN {
        insights.push(format!(
            "{} listings hit the market within the last week.",
            stats.fresh_count
        ));
    }
    if stats.stale_count > STALE_INSIGHT_MIN {
        insights.push(format!(
            "{} listings have been on the market for more than 90 days \
             and may have room to negotiate.",
            stats.stale_count
        ));
    }
    if stats.max - stats.min > HIGH_VARIANCE_SPAN {
        insights.push(format!(
            "Days on market vary widely, from {:.0} to {:.0} days.",
            stats.min, stats.max
        ));
    }

    insights
}
