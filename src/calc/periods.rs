//! Close prices summarised per calendar period. The stats aggregator builds
//! these with `GROUP BY` in the store; `summarize_periods` does the same for
//! sales already in memory.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::stats::{mean, median};
use crate::types::ClosedSale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Year,
    Month,
}

impl Granularity {
    /// `YYYY` or `YYYY-MM`.
    pub fn label(self, date: Date) -> String {
        match self {
            Granularity::Year => format!("{:04}", date.year()),
            Granularity::Month => format!("{:04}-{:02}", date.year(), u8::from(date.month())),
        }
    }

    /// SQLite `strftime` format producing the same label as [`Granularity::label`].
    pub fn strftime(self) -> &'static str {
        match self {
            Granularity::Year => "%Y",
            Granularity::Month => "%Y-%m",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub period: String,
    pub count: usize,
    pub average_price: f64,
    pub median_price: f64,
}

/// Group sales with a positive, finite close price by period, ascending.
pub fn summarize_periods(sales: &[ClosedSale], granularity: Granularity) -> Vec<PeriodSummary> {
    let mut by_period: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for sale in sales.iter().filter(|s| s.close_price > 0.0 && s.close_price.is_finite()) {
        by_period
            .entry(granularity.label(sale.close_date))
            .or_default()
            .push(sale.close_price);
    }
    by_period
        .into_iter()
        .map(|(period, prices)| PeriodSummary {
            period,
            count: prices.len(),
            average_price: mean(&prices),
            median_price: median(&prices),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::closed_sale;
    use time::macros::date;

    #[test]
    fn labels_sort_chronologically() {
        let sales = vec![
            closed_sale("a", 300.0, date!(2024 - 11 - 02)),
            closed_sale("b", 100.0, date!(2024 - 02 - 10)),
            closed_sale("c", 200.0, date!(2024 - 02 - 20)),
            closed_sale("d", 0.0, date!(2024 - 03 - 01)),
        ];
        let months = summarize_periods(&sales, Granularity::Month);
        let labels: Vec<&str> = months.iter().map(|m| m.period.as_str()).collect();
        assert_eq!(labels, ["2024-02", "2024-11"]);
        assert_eq!((months[0].count, months[0].median_price), (2, 150.0));

        let years = summarize_periods(&sales, Granularity::Year);
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].period, "2024");
        assert_eq!(years[0].count, 3);
    }
}
