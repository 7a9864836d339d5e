use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::calc::price_per_sqft::PricePerSqftSummary;
use crate::calc::{
    AppreciationPeriod, AppreciationResult, ComparisonResult, DomStats, MonthlyTrend,
    WinnerDecision, WinnerPreferences,
};
use crate::config::DEFAULT_YEARS_BACK;
use crate::error::Result;
use crate::filters::{FilterSet, LocationFilter, TimeWindow};
use crate::types::{ClosedSale, Listing, ListingQueryOptions, MarketStats, SortOrder};

/// Second location for a side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub compare_with: String,
    /// Treat `compare_with` as a city; otherwise as a subdivision.
    #[serde(default = "default_true")]
    pub is_city: bool,
}

fn default_true() -> bool {
    true
}

/// Everything a consumer can ask of one `execute_query` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub city: Option<String>,
    pub subdivision: Option<String>,
    pub zip: Option<String>,
    pub county: Option<String>,
    pub filters: FilterSet,

    pub include_stats: bool,
    pub include_dom_stats: bool,
    pub include_comparison: Option<ComparisonRequest>,
    pub include_closed_listings: bool,
    pub include_closed_stats: bool,
    pub include_appreciation: bool,
    pub include_price_trends: bool,
    pub appreciation_period: Option<AppreciationPeriod>,
    pub winner_preferences: WinnerPreferences,

    /// Closed-sale window: an explicit start/end wins over `years_back`.
    pub years_back: Option<u32>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,

    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub sort: Option<SortOrder>,

    pub use_cache: bool,
    pub bypass_cache: bool,
}

/// Which location-keyed entry point a query dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationSelector {
    City(String),
    Subdivision(String),
    Zip(String),
    County(String),
    /// Whatever the filter set carries, possibly nothing.
    Generic,
}

impl LocationSelector {
    pub fn filter(&self) -> Option<LocationFilter> {
        match self {
            LocationSelector::City(name) => Some(LocationFilter::city(name.as_str())),
            LocationSelector::Subdivision(name) => Some(LocationFilter::subdivision(name.as_str())),
            LocationSelector::Zip(code) => Some(LocationFilter::zip(code.as_str())),
            LocationSelector::County(name) => Some(LocationFilter::county(name.as_str())),
            LocationSelector::Generic => None,
        }
    }
}

impl QueryOptions {
    pub fn for_city(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Self::default()
        }
    }

    /// First present of city, subdivision, zip, county.
    pub fn location(&self) -> LocationSelector {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(city) = present(&self.city) {
            LocationSelector::City(city)
        } else if let Some(subdivision) = present(&self.subdivision) {
            LocationSelector::Subdivision(subdivision)
        } else if let Some(zip) = present(&self.zip) {
            LocationSelector::Zip(zip)
        } else if let Some(county) = present(&self.county) {
            LocationSelector::County(county)
        } else {
            LocationSelector::Generic
        }
    }

    /// The filter set narrowed to the selected location.
    pub fn resolved_filters(&self) -> FilterSet {
        match self.location().filter() {
            Some(place) => self.filters.with_place(place),
            None => self.filters.clone(),
        }
    }

    /// Label used in logs, metrics and comparison output.
    pub fn location_label(&self) -> String {
        match self.location() {
            LocationSelector::City(name)
            | LocationSelector::Subdivision(name)
            | LocationSelector::Zip(name)
            | LocationSelector::County(name) => name,
            LocationSelector::Generic => self.filters.location_label(),
        }
    }

    pub fn listing_options(&self) -> ListingQueryOptions {
        ListingQueryOptions {
            limit: self.limit,
            skip: self.skip,
            sort: self.sort,
        }
    }

    /// Window for closed listings, closed stats and price trends.
    pub fn closed_window(&self) -> TimeWindow {
        self.explicit_window()
            .unwrap_or(TimeWindow::YearsBack(self.years_back.unwrap_or(DEFAULT_YEARS_BACK)))
    }

    /// Window for appreciation: explicit bounds, else `years_back`, else the
    /// period's own length.
    pub fn appreciation_window(&self) -> TimeWindow {
        self.explicit_window().unwrap_or(TimeWindow::YearsBack(
            self.years_back.unwrap_or_else(|| self.appreciation_period.unwrap_or_default().years()),
        ))
    }

    fn explicit_window(&self) -> Option<TimeWindow> {
        (self.start_date.is_some() || self.end_date.is_some())
            .then_some(TimeWindow::Range {
                start: self.start_date,
                end: self.end_date,
            })
    }

    /// Cache key: the serialised request without its cache controls.
    pub fn cache_key(&self) -> Result<String> {
        let mut keyed = self.clone();
        keyed.use_cache = false;
        keyed.bypass_cache = false;
        Ok(serde_json::to_string(&keyed)?)
    }
}

/// Comparison output plus the scored winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    #[serde(flatten)]
    pub comparison: ComparisonResult,
    pub winner: WinnerDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMeta {
    pub execution_time_ms: f64,
    /// Matches before paging. A radius is applied exactly here, while
    /// `stats` only narrows to its bounding box and can count a few more.
    pub total_listings: u64,
    pub returned_listings: usize,
    /// The result is held in the cache.
    pub cached: bool,
    /// The result was served from the cache.
    pub cache_hit: bool,
    pub filters_applied: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub executed_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub listings: Vec<Listing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<MarketStats>,
    /// Over the returned page, alongside `stats`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_sqft: Option<PricePerSqftSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_stats: Option<DomStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dom_insights: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_listings: Option<Vec<ClosedSale>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_stats: Option<MarketStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appreciation: Option<AppreciationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_trends: Option<Vec<MonthlyTrend>>,
    pub meta: QueryMeta,
}
