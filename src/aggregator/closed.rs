use std::sync::Arc;

use time::Date;
use tracing::info;

use super::{count_rows, ensure_valid, select_rows, Page};
use crate::clock::SharedClock;
use crate::config::{Config, CLOSED_STATUS};
use crate::db::models::{ClosedSaleRow, CLOSED_PROJECTION};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::filters::{combine, Clause, Field, FilterSet, LocationFilter, Op, Query, TimeWindow};
use crate::types::{ClosedSale, Collection, ListingQueryOptions};

/// A record only counts as a sale with a closed status, a positive close price
/// and a close date.
pub fn completed_sale_clauses() -> Vec<Clause> {
    vec![
        Clause::eq(Field::StandardStatus, CLOSED_STATUS),
        Clause::cmp(Field::Price, Op::Gt, 0.0),
        Clause::NotNull(Field::CloseDate),
    ]
}

/// Shared combinator output plus the completed-sale predicate and the
/// close-date window resolved against `today`.
pub(crate) fn closed_query(
    filters: &FilterSet,
    window: Option<TimeWindow>,
    today: Date,
) -> Result<Query> {
    ensure_valid(filters)?;
    if let Some(window) = window {
        let mut errors = Vec::new();
        window.validate(&mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
    }
    Ok(combine(filters)
        .and(completed_sale_clauses())
        .and(window.map(|w| w.clauses(today)).unwrap_or_default()))
}

/// Queries over historical sales.
#[derive(Clone)]
pub struct ClosedListings {
    store: Store,
    config: Arc<Config>,
    clock: SharedClock,
}

impl ClosedListings {
    pub fn new(store: Store, config: Arc<Config>, clock: SharedClock) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    pub async fn by_city(
        &self,
        city: &str,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        options: &ListingQueryOptions,
    ) -> Result<Vec<ClosedSale>> {
        let filters = filters.with_place(LocationFilter::city(city));
        self.by_filters(&filters, window, options).await
    }

    pub async fn by_subdivision(
        &self,
        subdivision: &str,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        options: &ListingQueryOptions,
    ) -> Result<Vec<ClosedSale>> {
        let filters = filters.with_place(LocationFilter::subdivision(subdivision));
        self.by_filters(&filters, window, options).await
    }

    pub async fn by_zip(
        &self,
        zip: &str,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        options: &ListingQueryOptions,
    ) -> Result<Vec<ClosedSale>> {
        let filters = filters.with_place(LocationFilter::zip(zip));
        self.by_filters(&filters, window, options).await
    }

    pub async fn by_county(
        &self,
        county: &str,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        options: &ListingQueryOptions,
    ) -> Result<Vec<ClosedSale>> {
        let filters = filters.with_place(LocationFilter::county(county));
        self.by_filters(&filters, window, options).await
    }

    pub async fn by_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_miles: f64,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        options: &ListingQueryOptions,
    ) -> Result<Vec<ClosedSale>> {
        let location = LocationFilter::radius(latitude, longitude, radius_miles);
        self.by_filters(&filters.with_place(location), window, options).await
    }

    pub async fn by_filters(
        &self,
        filters: &FilterSet,
        window: Option<TimeWindow>,
        options: &ListingQueryOptions,
    ) -> Result<Vec<ClosedSale>> {
        let query = closed_query(filters, window, self.clock.today())?;
        let page = Page::new(options, self.config.effective_limit(options.limit));

        let sales: Vec<ClosedSale> = select_rows::<ClosedSaleRow, ClosedSale>(
            &self.store,
            "closed.select",
            Collection::Closed,
            CLOSED_PROJECTION,
            &query.clauses,
            query.near,
            options,
            page,
        )
        .await?;

        info!(
            location = %filters.location_label(),
            returned = sales.len(),
            window = ?window,
            "closed listings query",
        );
        Ok(sales)
    }

    pub async fn count(&self, filters: &FilterSet, window: Option<TimeWindow>) -> Result<u64> {
        let query = closed_query(filters, window, self.clock.today())?;
        let clauses = &query.clauses;
        count_rows(&self.store, "closed.count", Collection::Closed, clauses, query.near).await
    }
}
