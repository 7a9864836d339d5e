//! Pure, in-memory derivations over aggregator output. No I/O, no errors:
//! every function degrades to a zero-valued result on empty input.

pub mod appreciation;
pub mod comparison;
pub mod dom;
pub mod periods;
pub mod price_per_sqft;
pub mod stats;
pub mod trends;

pub use appreciation::{
    appreciation_from_years, calculate_appreciation, AppreciationPeriod, AppreciationResult,
    Confidence, Trend,
};
pub use comparison::{
    compare_locations, determine_winner, ComparisonResult, WinnerDecision, WinnerPreferences,
};
pub use dom::{calculate_dom_stats, dom_insights, DomStats, MarketVelocity};
pub use periods::{summarize_periods, Granularity, PeriodSummary};
pub use trends::{calculate_price_trends, trends_from_months, MonthlyTrend};
