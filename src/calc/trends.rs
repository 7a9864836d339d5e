use serde::{Deserialize, Serialize};

use super::periods::{summarize_periods, Granularity, PeriodSummary};
use crate::types::ClosedSale;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
    pub average_price: f64,
    pub median_price: f64,
    /// Trailing simple moving average of `average_price`; None until the
    /// window has filled.
    pub moving_average: Option<f64>,
}

/// Monthly average/median close prices with a trailing moving average over
/// `window_months` entries. A window of 0 is treated as 1.
pub fn calculate_price_trends(sales: &[ClosedSale], window_months: usize) -> Vec<MonthlyTrend> {
    trends_from_months(summarize_periods(sales, Granularity::Month), window_months)
}

/// Moving averages over per-month summaries in ascending month order.
pub fn trends_from_months(months: Vec<PeriodSummary>, window_months: usize) -> Vec<MonthlyTrend> {
    let window = window_months.max(1);

    let mut trends: Vec<MonthlyTrend> = months
        .into_iter()
        .filter(|m| m.count > 0)
        .map(|m| MonthlyTrend {
            month: m.period,
            count: m.count,
            average_price: m.average_price,
            median_price: m.median_price,
            moving_average: None,
        })
        .collect();

    for i in (window - 1)..trends.len() {
        let span = &trends[i + 1 - window..=i];
        let avg = span.iter().map(|t| t.average_price).sum::<f64>() / window as f64;
        trends[i].moving_average = Some(avg);
    }

    trends
}
