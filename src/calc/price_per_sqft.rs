use serde::{Deserialize, Serialize};

use super::stats::{mean, median_sorted, sorted_finite};
use crate::types::Listing;

/// `price / area`, or None when the area is unknown or not positive.
pub fn price_per_sqft(price: f64, living_area: Option<f64>) -> Option<f64> {
    let area = living_area.filter(|a| *a > 0.0)?;
    let value = price / area;
    value.is_finite().then_some(value)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricePerSqftSummary {
    pub count: usize,
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

pub fn summarize_price_per_sqft(listings: &[Listing]) -> PricePerSqftSummary {
    let values: Vec<f64> = listings
        .iter()
        .filter_map(|l| price_per_sqft(l.list_price, l.living_area))
        .collect();
    let sorted = sorted_finite(&values);
    if sorted.is_empty() {
        return PricePerSqftSummary::default();
    }
    PricePerSqftSummary {
        count: sorted.len(),
        average: mean(&sorted),
        median: median_sorted(&sorted),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    }
}
