//! Market statistics computed in one store-side pipeline:
//!
//! 1. `matched`: rows passing the combined predicate, with price, derived
//!    price per sqft (null for non-positive area) and DOM.
//! 2. `*_ranked`: each metric with nulls removed, ranked by `ROW_NUMBER()`.
//! 3. final select: count/avg/min/max plus rank statistics read by index.
//!
//! Median averages the two middle ranks for even counts; percentiles use the
//! nearest rank `floor(n * q)`. Rows never leave the store.
//!
//! Per-year and per-month close-price summaries use the same shape with the
//! ranking partitioned by period.
//!
//! A radius narrows these pipelines to its bounding box only, so rows in the
//! box corners are counted even though listing selects and counts drop them.

use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::info;

use super::closed::closed_query;
use super::ensure_valid;
use crate::calc::{Granularity, PeriodSummary};
use crate::clock::SharedClock;
use crate::db::sql::push_predicate;
use crate::db::Store;
use crate::error::Result;
use crate::filters::{combine, Field, FilterSet, Query, TimeWindow};
use crate::types::{Collection, MarketStats, PriceBucket};

const RANKED: &str = "\
price_ranked AS (
    SELECT price AS v, ROW_NUMBER() OVER (ORDER BY price) AS rn, COUNT(*) OVER () AS n
    FROM matched WHERE price IS NOT NULL
),
ppsf_ranked AS (
    SELECT ppsf AS v, ROW_NUMBER() OVER (ORDER BY ppsf) AS rn, COUNT(*) OVER () AS n
    FROM matched WHERE ppsf IS NOT NULL
),
dom_ranked AS (
    SELECT dom AS v, ROW_NUMBER() OVER (ORDER BY dom) AS rn, COUNT(*) OVER () AS n
    FROM matched WHERE dom IS NOT NULL
)
";

const PERIOD_SUMMARY: &str = "\
period_ranked AS (
    SELECT period, price,
        ROW_NUMBER() OVER (PARTITION BY period ORDER BY price) AS rn,
        COUNT(*) OVER (PARTITION BY period) AS n
    FROM matched WHERE period IS NOT NULL AND price IS NOT NULL
)
SELECT
    period,
    COUNT(*) AS sales,
    CAST(AVG(price) AS REAL) AS average_price,
    CAST(AVG(CASE WHEN rn IN ((n + 1) / 2, n / 2 + 1) THEN price END) AS REAL) AS median_price
FROM period_ranked
GROUP BY period
ORDER BY period
";

const SUMMARY: &str = "\
SELECT
    (SELECT COUNT(*) FROM matched) AS total_count,
    CAST((SELECT AVG(price) FROM matched) AS REAL) AS avg_price,
    CAST((SELECT MIN(price) FROM matched) AS REAL) AS min_price,
    CAST((SELECT MAX(price) FROM matched) AS REAL) AS max_price,
    CAST((SELECT AVG(v) FROM price_ranked
          WHERE rn IN ((n + 1) / 2, n / 2 + 1)) AS REAL) AS median_price,
    CAST((SELECT v FROM price_ranked
          WHERE rn = CAST(n * 0.25 AS INTEGER) + 1) AS REAL) AS p25_price,
    CAST((SELECT v FROM price_ranked
          WHERE rn = CAST(n * 0.75 AS INTEGER) + 1) AS REAL) AS p75_price,
    CAST((SELECT v FROM price_ranked
          WHERE rn = CAST(n * 0.9 AS INTEGER) + 1) AS REAL) AS p90_price,
    CAST((SELECT AVG(ppsf) FROM matched) AS REAL) AS avg_ppsf,
    CAST((SELECT AVG(v) FROM ppsf_ranked
          WHERE rn IN ((n + 1) / 2, n / 2 + 1)) AS REAL) AS median_ppsf,
    CAST((SELECT AVG(dom) FROM matched) AS REAL) AS avg_dom,
    CAST((SELECT AVG(v) FROM dom_ranked
          WHERE rn IN ((n + 1) / 2, n / 2 + 1)) AS REAL) AS median_dom,
    CAST((SELECT AVG(beds) FROM matched) AS REAL) AS avg_beds,
    CAST((SELECT AVG(baths) FROM matched) AS REAL) AS avg_baths,
    CAST((SELECT AVG(sqft) FROM matched) AS REAL) AS avg_sqft
";

#[derive(Clone)]
pub struct MarketStatsAggregator {
    store: Store,
    clock: SharedClock,
}

impl MarketStatsAggregator {
    pub fn new(store: Store, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Stats for either collection; closed sales use no date window.
    pub async fn compute(
        &self,
        collection: Collection,
        filters: &FilterSet,
    ) -> Result<MarketStats> {
        match collection {
            Collection::Active => self.active(filters).await,
            Collection::Closed => self.closed(filters, None).await,
        }
    }

    /// Stats over live inventory.
    pub async fn active(&self, filters: &FilterSet) -> Result<MarketStats> {
        ensure_valid(filters)?;
        self.pipeline(Collection::Active, &combine(filters), filters).await
    }

    /// Stats over completed sales, optionally within a close-date window.
    pub async fn closed(
        &self,
        filters: &FilterSet,
        window: Option<TimeWindow>,
    ) -> Result<MarketStats> {
        let query = closed_query(filters, window, self.clock.today())?;
        self.pipeline(Collection::Closed, &query, filters).await
    }

    /// Listing counts per price band. `bounds` are the ascending band edges;
    /// `n` edges give `n + 1` bands, the last one open-ended.
    pub async fn price_distribution(
        &self,
        collection: Collection,
        filters: &FilterSet,
        bounds: &[f64],
    ) -> Result<Vec<PriceBucket>> {
        let query = match collection {
            Collection::Active => {
                ensure_valid(filters)?;
                combine(filters)
            }
            Collection::Closed => closed_query(filters, None, self.clock.today())?,
        };
        let mut edges: Vec<f64> = bounds.iter().copied().filter(|b| b.is_finite()).collect();
        edges.sort_by(f64::total_cmp);
        edges.dedup();

        let mut builder = QueryBuilder::<Sqlite>::new("WITH matched AS (SELECT ");
        builder.push(Field::Price.column(collection));
        builder.push(" AS price FROM ");
        builder.push(collection.table());
        builder.push(" WHERE ");
        push_predicate(&mut builder, &query.clauses, collection);
        builder.push(") SELECT CASE");
        for (i, edge) in edges.iter().enumerate() {
            builder.push(" WHEN price < ");
            builder.push_bind(*edge);
            builder.push(" THEN ");
            builder.push_bind(i as i64);
        }
        builder.push(" ELSE ");
        builder.push_bind(edges.len() as i64);
        builder.push(" END AS bucket, COUNT(*) AS n FROM matched GROUP BY bucket");

        let rows: Vec<(i64, i64)> = self
            .store
            .bounded(
                "stats.distribution",
                builder.build_query_as::<(i64, i64)>().fetch_all(self.store.pool()),
            )
            .await?;

        let mut buckets: Vec<PriceBucket> = (0..=edges.len())
            .map(|i| PriceBucket {
                min: if i == 0 { 0.0 } else { edges[i - 1] },
                max: edges.get(i).copied(),
                count: 0,
            })
            .collect();
        for (bucket, n) in rows {
            if let Some(slot) = usize::try_from(bucket).ok().and_then(|i| buckets.get_mut(i)) {
                slot.count = n.max(0) as u64;
            }
        }
        Ok(buckets)
    }

    /// Completed sales grouped by calendar year or month, ascending. Every
    /// matching sale counts; the per-group median uses the same rank rule as
    /// the summary pipeline.
    pub async fn closed_periods(
        &self,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        granularity: Granularity,
    ) -> Result<Vec<PeriodSummary>> {
        let query = closed_query(filters, window, self.clock.today())?;
        let collection = Collection::Closed;

        let mut builder = QueryBuilder::<Sqlite>::new("WITH matched AS (SELECT strftime(");
        builder.push_bind(granularity.strftime());
        builder.push(", close_date) AS period, ");
        builder.push(Field::Price.column(collection));
        builder.push(" AS price FROM ");
        builder.push(collection.table());
        builder.push(" WHERE ");
        push_predicate(&mut builder, &query.clauses, collection);
        builder.push("),
");
        builder.push(PERIOD_SUMMARY);

        let rows: Vec<(String, i64, Option<f64>, Option<f64>)> = self
            .store
            .bounded(
                "stats.periods",
                builder
                    .build_query_as::<(String, i64, Option<f64>, Option<f64>)>()
                    .fetch_all(self.store.pool()),
            )
            .await?;

        let periods: Vec<PeriodSummary> = rows
            .into_iter()
            .map(|(period, count, average, median)| PeriodSummary {
                period,
                count: count.max(0) as usize,
                average_price: average.filter(|v| v.is_finite()).unwrap_or(0.0),
                median_price: median.filter(|v| v.is_finite()).unwrap_or(0.0),
            })
            .collect();

        info!(
            location = %filters.location_label(),
            granularity = ?granularity,
            periods = periods.len(),
            sales = periods.iter().map(|p| p.count).sum::<usize>(),
            "closed sales grouped",
        );
        Ok(periods)
    }

    async fn pipeline(
        &self,
        collection: Collection,
        query: &Query,
        filters: &FilterSet,
    ) -> Result<MarketStats> {
        let price = Field::Price.column(collection);

        let mut builder = QueryBuilder::<Sqlite>::new("WITH matched AS (SELECT ");
        builder.push(format!(
            "{price} AS price, \
             CASE WHEN living_area > 0 THEN {price} / living_area END AS ppsf, \
             days_on_market AS dom, \
             COALESCE(bedrooms_total, beds_total) AS beds, \
             bathrooms_total AS baths, \
             living_area AS sqft \
             FROM {table} WHERE ",
            table = collection.table(),
        ));
        push_predicate(&mut builder, &query.clauses, collection);
        builder.push("),\n");
        builder.push(RANKED);
        builder.push(SUMMARY);

        let op = match collection {
            Collection::Active => "stats.active",
            Collection::Closed => "stats.closed",
        };
        let row = self
            .store
            .bounded(op, builder.build().fetch_one(self.store.pool()))
            .await?;

        let real = |name: &str| -> Result<f64> {
            let value: Option<f64> = row.try_get(name)?;
            Ok(value.filter(|v| v.is_finite()).unwrap_or(0.0))
        };
        let total: i64 = row.try_get("total_count")?;

        let stats = MarketStats {
            total_count: total.max(0) as u64,
            avg_price: real("avg_price")?,
            median_price: real("median_price")?,
            min_price: real("min_price")?,
            max_price: real("max_price")?,
            p25_price: real("p25_price")?,
            p75_price: real("p75_price")?,
            p90_price: real("p90_price")?,
            avg_price_per_sqft: real("avg_ppsf")?,
            median_price_per_sqft: real("median_ppsf")?,
            avg_days_on_market: real("avg_dom")?,
            median_days_on_market: real("median_dom")?,
            avg_beds: real("avg_beds")?,
            avg_baths: real("avg_baths")?,
            avg_sqft: real("avg_sqft")?,
        };

        info!(
            collection = %collection,
            location = %filters.location_label(),
            count = stats.total_count,
            median_price = stats.median_price,
            "market stats computed",
        );
        Ok(stats)
    }
}
