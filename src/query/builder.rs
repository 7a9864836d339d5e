//! Single entry point for consumers. Turns `QueryOptions` into the right
//! aggregator and calculation calls and assembles one `QueryResult`.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::cache::QueryCache;
use super::options::{
    ComparisonReport, ComparisonRequest, LocationSelector, QueryMeta, QueryOptions, QueryResult,
};
use crate::aggregator::{ActiveListings, ClosedListings, MarketStatsAggregator};
use crate::calc::price_per_sqft::summarize_price_per_sqft;
use crate::calc::{
    appreciation_from_years, calculate_dom_stats, compare_locations, determine_winner, dom_insights,
    trends_from_months, Granularity,
};
use crate::clock::SharedClock;
use crate::config::{Config, DEFAULT_TREND_WINDOW_MONTHS};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::filters::{FilterSet, LocationFilter};
use crate::monitor::{PerformanceMonitor, QueryMetric};
use crate::types::{Listing, ListingQueryOptions, MarketStats};

pub struct QueryEngine {
    active: ActiveListings,
    closed: ClosedListings,
    stats: MarketStatsAggregator,
    config: Arc<Config>,
    clock: SharedClock,
    cache: QueryCache,
    monitor: PerformanceMonitor,
}

impl QueryEngine {
    pub fn new(store: Store, config: Arc<Config>, clock: SharedClock) -> Result<Self> {
        let monitor = PerformanceMonitor::new(config.monitor_capacity, config.slow_query_ms)?;
        Ok(Self {
            active: ActiveListings::new(store.clone(), Arc::clone(&config)),
            closed: ClosedListings::new(store.clone(), Arc::clone(&config), Arc::clone(&clock)),
            stats: MarketStatsAggregator::new(store, Arc::clone(&clock)),
            cache: QueryCache::new(config.cache_ttl),
            config,
            clock,
            monitor,
        })
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn active(&self) -> &ActiveListings {
        &self.active
    }

    pub fn closed(&self) -> &ClosedListings {
        &self.closed
    }

    pub fn stats(&self) -> &MarketStatsAggregator {
        &self.stats
    }

    pub async fn execute_query(&self, options: &QueryOptions) -> Result<QueryResult> {
        let started = Instant::now();
        let cache_key = if options.use_cache || options.bypass_cache {
            Some(options.cache_key()?)
        } else {
            None
        };

        if options.use_cache && !options.bypass_cache {
            if let Some(mut hit) = cache_key.as_deref().and_then(|key| self.cache.get(key)) {
                hit.meta.cache_hit = true;
                hit.meta.cached = true;
                hit.meta.execution_time_ms = elapsed_ms(started);
                debug!(location = %options.location_label(), "query served from cache");
                self.record(options, &hit);
                return Ok(hit);
            }
        }

        let mut result = self.run(options).await?;
        result.meta.execution_time_ms = elapsed_ms(started);
        if let Some(key) = cache_key {
            result.meta.cached = true;
            self.cache.insert(key, result.clone());
        }

        info!(
            location = %options.location_label(),
            returned = result.meta.returned_listings,
            total = result.meta.total_listings,
            execution_time_ms = result.meta.execution_time_ms,
            "query executed",
        );
        self.record(options, &result);
        Ok(result)
    }

    /// Listings for a bare location name: city first, then subdivision when
    /// no city matches.
    pub async fn execute_simple_query(
        &self,
        location: &str,
        filters: &FilterSet,
    ) -> Result<Vec<Listing>> {
        let options = ListingQueryOptions::default();
        let by_city = self.active.by_city(location, filters, &options).await?;
        if !by_city.is_empty() {
            return Ok(by_city);
        }
        debug!(location, "no city match, trying subdivision");
        self.active.by_subdivision(location, filters, &options).await
    }

    /// Active-market stats for a bare location name, with the same city then
    /// subdivision fallback.
    pub async fn location_stats(&self, location: &str) -> Result<MarketStats> {
        stats_for_location(&self.stats, location).await
    }

    /// Stats for many locations, at most `batch_concurrency` in flight.
    /// Output order follows input order.
    pub async fn location_stats_batch(
        &self,
        locations: &[String],
    ) -> Result<Vec<(String, MarketStats)>> {
        let semaphore = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let tasks = locations.iter().map(|location| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| AppError::Concurrency(format!("Semaphore error: {e}")))?;
                let stats = stats_for_location(&self.stats, location).await?;
                Ok::<_, AppError>((location.clone(), stats))
            }
        });
        let results = try_join_all(tasks).await?;
        info!(locations = results.len(), "batch stats computed");
        Ok(results)
    }

    async fn run(&self, options: &QueryOptions) -> Result<QueryResult> {
        let filters = options.resolved_filters();
        let listing_options = options.listing_options();

        let want_stats = options.include_stats || options.include_comparison.is_some();
        let (listings, total, stats, compared) = tokio::join!(
            self.listings_for(options, &listing_options),
            self.active.count(&filters),
            async {
                if want_stats {
                    self.stats.active(&filters).await.map(Some)
                } else {
                    Ok(None)
                }
            },
            async {
                match &options.include_comparison {
                    Some(request) => {
                        self.comparison_stats(&options.filters, request).await.map(Some)
                    }
                    None => Ok(None),
                }
            },
        );
        let listings = listings?;
        let total = total?;
        let stats = stats?;
        let compared = compared?;

        let (dom_stats, dom_text) = if options.include_dom_stats {
            let dom = calculate_dom_stats(&listings);
            let text = dom_insights(&dom);
            (Some(dom), Some(text))
        } else {
            (None, None)
        };

        let comparison = match (&options.include_comparison, &stats, compared) {
            (Some(request), Some(primary), Some(other)) => {
                let label = options.location_label();
                let comparison = compare_locations(&label, primary, &request.compare_with, &other);
                let winner = determine_winner(&comparison, &options.winner_preferences);
                Some(ComparisonReport { comparison, winner })
            }
            _ => None,
        };

        let closed_window = options.closed_window();
        let (closed_listings, closed_stats, appreciation, price_trends) = tokio::join!(
            async {
                if options.include_closed_listings {
                    self.closed
                        .by_filters(&filters, Some(closed_window), &listing_options)
                        .await
                        .map(Some)
                } else {
                    Ok(None)
                }
            },
            async {
                if options.include_closed_stats {
                    self.stats.closed(&filters, Some(closed_window)).await.map(Some)
                } else {
                    Ok(None)
                }
            },
            async {
                if options.include_appreciation {
                    let window = Some(options.appreciation_window());
                    let period = options.appreciation_period.unwrap_or_default();
                    self.stats
                        .closed_periods(&filters, window, Granularity::Year)
                        .await
                        .map(|years| Some(appreciation_from_years(&years, period)))
                } else {
                    Ok(None)
                }
            },
            async {
                if options.include_price_trends {
                    self.stats
                        .closed_periods(&filters, Some(closed_window), Granularity::Month)
                        .await
                        .map(|months| Some(trends_from_months(months, DEFAULT_TREND_WINDOW_MONTHS)))
                } else {
                    Ok(None)
                }
            },
        );
        let closed_listings = closed_listings?;
        let closed_stats = closed_stats?;
        let appreciation = appreciation?;
        let price_trends = price_trends?;

        let returned_listings = listings.len();
        let price_per_sqft = options.include_stats.then(|| summarize_price_per_sqft(&listings));
        Ok(QueryResult {
            listings,
            stats: stats.filter(|_| options.include_stats),
            price_per_sqft,
            dom_stats,
            dom_insights: dom_text,
            comparison,
            closed_listings,
            closed_stats,
            appreciation,
            price_trends,
            meta: QueryMeta {
                execution_time_ms: 0.0,
                total_listings: total,
                returned_listings,
                cached: false,
                cache_hit: false,
                filters_applied: filters.active_filter_count(),
                executed_at: self.clock.now(),
            },
        })
    }

    async fn listings_for(
        &self,
        options: &QueryOptions,
        listing_options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        let filters = &options.filters;
        let active = &self.active;
        match options.location() {
            LocationSelector::City(city) => active.by_city(&city, filters, listing_options).await,
            LocationSelector::Subdivision(name) => {
                active.by_subdivision(&name, filters, listing_options).await
            }
            LocationSelector::Zip(zip) => active.by_zip(&zip, filters, listing_options).await,
            LocationSelector::County(county) => {
                active.by_county(&county, filters, listing_options).await
            }
            LocationSelector::Generic => active.by_filters(filters, listing_options).await,
        }
    }

    async fn comparison_stats(
        &self,
        filters: &FilterSet,
        request: &ComparisonRequest,
    ) -> Result<MarketStats> {
        let location = if request.is_city {
            LocationFilter::city(request.compare_with.as_str())
        } else {
            LocationFilter::subdivision(request.compare_with.as_str())
        };
        self.stats.active(&filters.with_place(location)).await
    }

    fn record(&self, options: &QueryOptions, result: &QueryResult) {
        self.monitor.record(QueryMetric {
            location: options.location_label(),
            execution_time_ms: result.meta.execution_time_ms,
            cache_hit: result.meta.cache_hit,
            filter_count: result.meta.filters_applied,
            result_count: result.meta.returned_listings,
            recorded_at: self.clock.now(),
        });
    }
}

async fn stats_for_location(stats: &MarketStatsAggregator, location: &str) -> Result<MarketStats> {
    let by_city = stats
        .active(&FilterSet::default().with_location(LocationFilter::city(location)))
        .await?;
    if !by_city.is_empty() {
        return Ok(by_city);
    }
    stats
        .active(&FilterSet::default().with_location(LocationFilter::subdivision(location)))
        .await
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::{AppreciationPeriod, Trend};
    use crate::clock::FixedClock;
    use crate::config::MAX_YEARS_BACK;
    use crate::filters::PriceFilter;
    use crate::testutil::{
        closed_sale, insert_closed, insert_closed_series, insert_listing, listing, memory_store,
    };
    use time::macros::date;

    async fn engine_with(config: Config) -> QueryEngine {
        let store = memory_store().await;
        let homes = [
            ("PS1", "Palm Springs", None, 400_000.0, 5, None),
            ("PS2", "Palm Springs", None, 600_000.0, 12, None),
            ("PS3", "Palm Springs", None, 800_000.0, 40, None),
            ("IN1", "Indio", None, 350_000.0, 20, Some("CRMLS")),
            ("IN2", "Indio", None, 450_000.0, 70, Some("GPS")),
            ("LQ1", "La Quinta", Some("PGA West"), 900_000.0, 30, None),
        ];
        for (key, city, subdivision, price, dom, source) in homes {
            let mut l = listing(key, price);
            l.city = Some(city.into());
            l.subdivision = subdivision.map(Into::into);
            l.mls_source = source.map(Into::into);
            l.living_area = Some(2_000.0);
            l.days_on_market = Some(dom);
            insert_listing(&store, &l).await;
        }
        for i in 0..4u8 {
            for (year, price) in [(2022, 400_000.0), (2024, 500_000.0)] {
                let date = time::Date::from_calendar_date(year, time::Month::March, 1 + i).unwrap();
                let mut sale = closed_sale(&format!("C{year}-{i}"), price, date);
                sale.city = Some("Palm Springs".into());
                insert_closed(&store, &sale).await;
            }
        }
        let clock: SharedClock = Arc::new(FixedClock::at_date(date!(2025 - 01 - 01)));
        QueryEngine::new(store, Arc::new(config), clock).unwrap()
    }

    async fn engine() -> QueryEngine {
        engine_with(Config::default()).await
    }

    #[tokio::test]
    async fn city_query_with_stats_and_dom() {
        let engine = engine().await;
        let options = QueryOptions {
            include_stats: true,
            include_dom_stats: true,
            limit: Some(2),
            ..QueryOptions::for_city("palm springs")
        };
        let result = engine.execute_query(&options).await.unwrap();

        assert_eq!(result.listings.len(), 2);
        assert_eq!(result.meta.returned_listings, 2);
        assert_eq!(result.meta.total_listings, 3);
        assert_eq!(result.meta.filters_applied, 1);
        let stats = result.stats.unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.median_price, 600_000.0);
        assert_eq!(result.price_per_sqft.unwrap().count, 2);
        assert!(result.dom_stats.is_some());
        assert!(!result.dom_insights.unwrap().is_empty());
        assert!(result.comparison.is_none());
        assert!(result.appreciation.is_none());
        assert_eq!(result.meta.executed_at.date(), date!(2025 - 01 - 01));
    }

    #[tokio::test]
    async fn comparison_scores_both_locations() {
        let engine = engine().await;
        let options = QueryOptions {
            include_comparison: Some(ComparisonRequest {
                compare_with: "Indio".into(),
                is_city: true,
            }),
            ..QueryOptions::for_city("Palm Springs")
        };
        let result = engine.execute_query(&options).await.unwrap();

        // Stats were computed for the comparison but not requested on their own.
        assert!(result.stats.is_none());
        let report = result.comparison.unwrap();
        assert_eq!(report.comparison.location_a, "Palm Springs");
        assert_eq!(report.comparison.location_b, "Indio");
        assert_eq!(report.comparison.inventory.difference, 1.0);
        assert_eq!(report.winner.winner, "Indio");
    }

    #[tokio::test]
    async fn closed_sub_flows_follow_their_flags() {
        let engine = engine().await;
        let options = QueryOptions {
            include_closed_listings: true,
            include_closed_stats: true,
            include_appreciation: true,
            include_price_trends: true,
            appreciation_period: Some(AppreciationPeriod::FiveYears),
            ..QueryOptions::for_city("Palm Springs")
        };
        let result = engine.execute_query(&options).await.unwrap();

        assert_eq!(result.closed_listings.unwrap().len(), 8);
        assert_eq!(result.closed_stats.unwrap().median_price, 450_000.0);
        let appreciation = result.appreciation.unwrap();
        assert_eq!(appreciation.sample_size, 8);
        assert!((appreciation.cumulative_rate - 25.0).abs() < 1e-9);
        assert_eq!(appreciation.trend, Trend::Increasing);
        assert_eq!(result.price_trends.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn appreciation_and_trends_count_every_sale_in_a_busy_market() {
        let store = memory_store().await;
        let city = "Cathedral City";
        insert_closed_series(&store, "old", 5_000, 400_000.0, date!(2022 - 06 - 01), city).await;
        insert_closed_series(&store, "new", 100, 500_000.0, date!(2024 - 06 - 01), city).await;
        let clock: SharedClock = Arc::new(FixedClock::at_date(date!(2025 - 01 - 01)));
        let engine = QueryEngine::new(store, Arc::new(Config::default()), clock).unwrap();

        let options = QueryOptions {
            include_closed_stats: true,
            include_appreciation: true,
            include_price_trends: true,
            appreciation_period: Some(AppreciationPeriod::FiveYears),
            ..QueryOptions::for_city(city)
        };
        let result = engine.execute_query(&options).await.unwrap();

        assert_eq!(result.closed_stats.unwrap().total_count, 5_100);
        let appreciation = result.appreciation.unwrap();
        assert_eq!(appreciation.sample_size, 5_100);
        assert_eq!(appreciation.start_year, Some(2022));
        assert_eq!(appreciation.end_year, Some(2024));
        assert!((appreciation.cumulative_rate - 25.0).abs() < 1e-9);
        assert_eq!(appreciation.trend, Trend::Increasing);

        let trends = result.price_trends.unwrap();
        let months: Vec<(&str, usize)> =
            trends.iter().map(|t| (t.month.as_str(), t.count)).collect();
        assert_eq!(months, [("2022-06", 5_000), ("2024-06", 100)]);
    }

    #[tokio::test]
    async fn location_selector_keeps_feed_restrictions() {
        let engine = engine().await;
        let mut options = QueryOptions {
            include_stats: true,
            ..QueryOptions::for_city("Indio")
        };
        options.filters.location = Some(LocationFilter {
            mls_sources: vec!["CRMLS".into()],
            ..LocationFilter::default()
        });
        let result = engine.execute_query(&options).await.unwrap();

        let keys: Vec<&str> = result.listings.iter().map(|l| l.listing_key.as_str()).collect();
        assert_eq!(keys, ["IN1"]);
        assert_eq!(result.meta.total_listings, 1);
        assert_eq!(result.stats.unwrap().total_count, 1);
        assert_eq!(result.meta.filters_applied, 2);
    }

    #[tokio::test]
    async fn absurd_years_back_is_rejected() {
        let engine = engine().await;
        let options = QueryOptions {
            include_closed_stats: true,
            years_back: Some(u32::MAX),
            ..QueryOptions::for_city("Palm Springs")
        };
        let err = engine.execute_query(&options).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let widest = QueryOptions {
            years_back: Some(MAX_YEARS_BACK),
            ..options
        };
        let result = engine.execute_query(&widest).await.unwrap();
        assert_eq!(result.closed_stats.unwrap().total_count, 8);
    }

    #[tokio::test]
    async fn cache_serves_repeat_queries_until_bypassed() {
        let engine = engine().await;
        let options = QueryOptions {
            use_cache: true,
            include_stats: true,
            ..QueryOptions::for_city("Indio")
        };

        let first = engine.execute_query(&options).await.unwrap();
        assert!(first.meta.cached);
        assert!(!first.meta.cache_hit);

        let second = engine.execute_query(&options).await.unwrap();
        assert!(second.meta.cache_hit);
        assert_eq!(second.listings, first.listings);

        let bypass = QueryOptions {
            bypass_cache: true,
            ..options.clone()
        };
        let third = engine.execute_query(&bypass).await.unwrap();
        assert!(!third.meta.cache_hit);
        assert_eq!(engine.cache().len(), 1);

        let stats = engine.monitor().performance_stats();
        assert_eq!(stats.total_queries, 3);
        assert!((stats.cache_hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.performance_by_location["Indio"].queries, 3);
    }

    #[tokio::test]
    async fn identical_queries_are_idempotent() {
        let engine = engine().await;
        let options = QueryOptions {
            include_stats: true,
            ..QueryOptions::for_city("Palm Springs")
        };
        let a = engine.execute_query(&options).await.unwrap();
        let b = engine.execute_query(&options).await.unwrap();
        assert_eq!(a.listings, b.listings);
        assert_eq!(a.stats, b.stats);
    }

    #[tokio::test]
    async fn validation_errors_propagate() {
        let engine = engine().await;
        let mut options = QueryOptions::for_city("Indio");
        options.filters.price = Some(PriceFilter {
            min_price: Some(500_000.0),
            max_price: Some(100_000.0),
            ..Default::default()
        });
        let err = engine.execute_query(&options).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!err.is_retryable());
        assert_eq!(engine.monitor().performance_stats().total_queries, 0);
    }

    #[tokio::test]
    async fn simple_query_falls_back_to_subdivision() {
        let engine = engine().await;
        let found = engine.execute_simple_query("pga west", &FilterSet::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].listing_key, "LQ1");
        let none = engine
            .execute_simple_query("Atlantis", &FilterSet::default())
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn batch_stats_keep_input_order() {
        let engine = engine_with(Config {
            batch_concurrency: 2,
            ..Config::default()
        }).await;
        let locations: Vec<String> = ["Indio", "PGA West", "Palm Springs", "Atlantis"]
            .map(String::from)
            .to_vec();
        let batch = engine.location_stats_batch(&locations).await.unwrap();
        let counts: Vec<(&str, u64)> =
            batch.iter().map(|(l, s)| (l.as_str(), s.total_count)).collect();
        assert_eq!(
            counts,
            vec![("Indio", 2), ("PGA West", 1), ("Palm Springs", 3), ("Atlantis", 0)]
        );
        assert_eq!(engine.location_stats("Indio").await.unwrap().total_count, 2);
    }
}
