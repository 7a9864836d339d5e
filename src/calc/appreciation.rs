use serde::{Deserialize, Serialize};

use super::periods::{summarize_periods, Granularity, PeriodSummary};
use super::stats::percent_change;
use crate::config::confidence_thresholds::*;
use crate::types::ClosedSale;

/// Requested look-back for an appreciation report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppreciationPeriod {
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "3y")]
    ThreeYears,
    #[default]
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl AppreciationPeriod {
    pub fn years(self) -> u32 {
        match self {
            AppreciationPeriod::OneYear => 1,
            AppreciationPeriod::ThreeYears => 3,
            AppreciationPeriod::FiveYears => 5,
            AppreciationPeriod::TenYears => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    pub fn from_sales_per_year(rate: f64) -> Self {
        if rate > HIGH_SALES_PER_YEAR {
            Confidence::High
        } else if rate > MEDIUM_SALES_PER_YEAR {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyBreakdown {
    pub year: i32,
    pub sales: usize,
    pub average_price: f64,
    pub median_price: f64,
    /// Change in average price versus the previous year with sales.
    pub yoy_change_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppreciationResult {
    pub period: AppreciationPeriod,
    /// Compound annual growth rate, percent.
    pub annual_rate: f64,
    /// Total change first year to last year, percent.
    pub cumulative_rate: f64,
    pub trend: Trend,
    pub confidence: Confidence,
    pub sample_size: usize,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub yearly: Vec<YearlyBreakdown>,
}

/// Group sales by close year and derive CAGR, cumulative change, trend and
/// confidence. Fewer than two distinct years yields zero rates, "stable",
/// "low".
pub fn calculate_appreciation(
    sales: &[ClosedSale],
    period: AppreciationPeriod,
) -> AppreciationResult {
    appreciation_from_years(&summarize_periods(sales, Granularity::Year), period)
}

/// Appreciation over per-year summaries, in ascending year order. Summaries
/// whose period is not a year are skipped.
pub fn appreciation_from_years(
    years: &[PeriodSummary],
    period: AppreciationPeriod,
) -> AppreciationResult {
    let mut yearly: Vec<YearlyBreakdown> = Vec::with_capacity(years.len());
    for summary in years.iter().filter(|y| y.count > 0 && y.average_price > 0.0) {
        let Ok(year) = summary.period.parse::<i32>() else {
            continue;
        };
        let yoy_change_pct = yearly
            .last()
            .and_then(|prev| percent_change(prev.average_price, summary.average_price));
        yearly.push(YearlyBreakdown {
            year,
            sales: summary.count,
            average_price: summary.average_price,
            median_price: summary.median_price,
            yoy_change_pct,
        });
    }

    let sample_size = yearly.iter().map(|y| y.sales).sum();
    let mut result = AppreciationResult {
        period,
        sample_size,
        start_year: yearly.first().map(|y| y.year),
        end_year: yearly.last().map(|y| y.year),
        ..AppreciationResult::default()
    };

    let (Some(first), Some(last)) = (yearly.first(), yearly.last()) else {
        return result;
    };
    let years_elapsed = last.year - first.year;
    if yearly.len() < 2 || years_elapsed <= 0 || first.average_price <= 0.0 {
        result.yearly = yearly;
        return result;
    }

    let years_elapsed = f64::from(years_elapsed);
    let cumulative = percent_change(first.average_price, last.average_price).unwrap_or(0.0);
    let growth = last.average_price / first.average_price;
    let cagr = (growth.powf(1.0 / years_elapsed) - 1.0) * 100.0;

    result.cumulative_rate = cumulative;
    result.annual_rate = if cagr.is_finite() { cagr } else { 0.0 };
    result.trend = classify_trend(&yearly, cumulative);
    result.confidence = Confidence::from_sales_per_year(sample_size as f64 / years_elapsed);
    result.yearly = yearly;
    result
}

/// Sign of the last three year-over-year changes: two or more up is
/// increasing, none up is decreasing. With fewer than three changes on record
/// the cumulative direction decides.
fn classify_trend(yearly: &[YearlyBreakdown], cumulative: f64) -> Trend {
    let changes: Vec<f64> = yearly.iter().filter_map(|y| y.yoy_change_pct).collect();
    if changes.len() < 3 {
        return if cumulative > 0.0 {
            Trend::Increasing
        } else if cumulative < 0.0 {
            Trend::Decreasing
        } else {
            Trend::Stable
        };
    }
    let positive = changes[changes.len() - 3..].iter().filter(|c| **c > 0.0).count();
    match positive {
        0 => Trend::Decreasing,
        1 => Trend::Stable,
        _ => Trend::Increasing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::closed_sale;
    use time::macros::date;

    fn year_of_sales(year: i32, count: usize, avg: f64) -> Vec<ClosedSale> {
        // Symmetric spread around `avg` keeps the mean exact.
        (0..count)
            .map(|i| {
                let offset = if i % 2 == 0 { 10_000.0 } else { -10_000.0 };
                let date = time::Date::from_calendar_date(year, time::Month::June, 1).unwrap();
                closed_sale(&format!("{year}-{i}"), avg + offset, date)
            })
            .collect()
    }

    #[test]
    fn empty_sales_are_low_confidence_zero() {
        let result = calculate_appreciation(&[], AppreciationPeriod::FiveYears);
        assert_eq!(result.annual_rate, 0.0);
        assert_eq!(result.cumulative_rate, 0.0);
        assert_eq!(result.trend, Trend::Stable);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.sample_size, 0);
    }

    #[test]
    fn two_year_span_reference_scenario() {
        let mut sales = year_of_sales(2022, 10, 400_000.0);
        sales.extend(year_of_sales(2024, 10, 500_000.0));

        let result = calculate_appreciation(&sales, AppreciationPeriod::ThreeYears);
        let cumulative = result.cumulative_rate;
        assert!((cumulative - 25.0).abs() < 1e-9, "cumulative={cumulative}");
        assert!((result.annual_rate - 11.803).abs() < 1e-3, "cagr={}", result.annual_rate);
        assert_eq!(result.trend, Trend::Increasing);
        // 20 sales over 2 years is 10 per year.
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.sample_size, 20);
        assert_eq!(result.yearly.len(), 2);
        assert_eq!(result.yearly[1].yoy_change_pct.map(|p| p.round()), Some(25.0));
    }

    #[test]
    fn single_year_is_not_an_error() {
        let sales = year_of_sales(2024, 30, 450_000.0);
        let result = calculate_appreciation(&sales, AppreciationPeriod::OneYear);
        assert_eq!(result.annual_rate, 0.0);
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.sample_size, 30);
        assert_eq!(result.yearly.len(), 1);
    }

    #[test]
    fn three_year_window_rule() {
        // 2020 -> 2021 up, 2021 -> 2022 down, 2022 -> 2023 down, 2023 -> 2024 up
        let mut sales = Vec::new();
        let averages = [
            (2020, 400_000.0),
            (2021, 450_000.0),
            (2022, 430_000.0),
            (2023, 420_000.0),
            (2024, 440_000.0),
        ];
        for (year, avg) in averages {
            sales.extend(year_of_sales(year, 2, avg));
        }
        let result = calculate_appreciation(&sales, AppreciationPeriod::FiveYears);
        // last three changes: down, down, up -> one positive
        assert_eq!(result.trend, Trend::Stable);

        let mut falling = Vec::new();
        let averages = [(2021, 500_000.0), (2022, 480_000.0), (2023, 470_000.0), (2024, 450_000.0)];
        for (year, avg) in averages {
            falling.extend(year_of_sales(year, 2, avg));
        }
        let result = calculate_appreciation(&falling, AppreciationPeriod::FiveYears);
        assert_eq!(result.trend, Trend::Decreasing);
    }

    #[test]
    fn confidence_tiers() {
        let mut sales = year_of_sales(2023, 60, 400_000.0);
        sales.extend(year_of_sales(2024, 60, 420_000.0));
        let result = calculate_appreciation(&sales, AppreciationPeriod::OneYear);
        assert_eq!(result.confidence, Confidence::High);

        let mut sales = year_of_sales(2023, 15, 400_000.0);
        sales.extend(year_of_sales(2024, 15, 420_000.0));
        let result = calculate_appreciation(&sales, AppreciationPeriod::OneYear);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn non_positive_prices_are_skipped() {
        let sales = vec![closed_sale("zero", 0.0, date!(2024 - 01 - 01))];
        let result = calculate_appreciation(&sales, AppreciationPeriod::OneYear);
        assert_eq!(result.sample_size, 0);
    }

    #[test]
    fn year_summaries_carry_their_own_counts() {
        let summary = |period: &str, count, average_price| PeriodSummary {
            period: period.to_string(),
            count,
            average_price,
            median_price: average_price,
        };
        let years = [
            summary("2022", 5_000, 400_000.0),
            summary("not-a-year", 3, 1.0),
            summary("2024", 100, 500_000.0),
        ];
        let result = appreciation_from_years(&years, AppreciationPeriod::ThreeYears);
        assert_eq!(result.sample_size, 5_100);
        assert_eq!((result.start_year, result.end_year), (Some(2022), Some(2024)));
        assert!((result.cumulative_rate - 25.0).abs() < 1e-9);
        assert_eq!(result.trend, Trend::Increasing);
        assert_eq!(result.confidence, Confidence::High);
    }
}
