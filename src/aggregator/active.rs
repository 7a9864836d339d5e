use std::sync::Arc;

use tracing::info;

use super::{count_rows, ensure_valid, select_rows, Page};
use crate::config::Config;
use crate::db::models::{ListingRow, LISTING_PROJECTION};
use crate::db::Store;
use crate::error::Result;
use crate::filters::{combine, FilterSet, LocationFilter};
use crate::types::{Collection, Listing, ListingQueryOptions};

/// Queries over live inventory.
#[derive(Clone)]
pub struct ActiveListings {
    store: Store,
    config: Arc<Config>,
}

impl ActiveListings {
    pub fn new(store: Store, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub async fn by_city(
        &self,
        city: &str,
        filters: &FilterSet,
        options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        self.by_filters(&filters.with_place(LocationFilter::city(city)), options).await
    }

    pub async fn by_subdivision(
        &self,
        subdivision: &str,
        filters: &FilterSet,
        options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        let filters = filters.with_place(LocationFilter::subdivision(subdivision));
        self.by_filters(&filters, options).await
    }

    pub async fn by_zip(
        &self,
        zip: &str,
        filters: &FilterSet,
        options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        self.by_filters(&filters.with_place(LocationFilter::zip(zip)), options).await
    }

    pub async fn by_county(
        &self,
        county: &str,
        filters: &FilterSet,
        options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        self.by_filters(&filters.with_place(LocationFilter::county(county)), options).await
    }

    pub async fn by_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_miles: f64,
        filters: &FilterSet,
        options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        let location = LocationFilter::radius(latitude, longitude, radius_miles);
        self.by_filters(&filters.with_place(location), options).await
    }

    /// Generic entry point: whatever location the filter set carries, if any.
    pub async fn by_filters(
        &self,
        filters: &FilterSet,
        options: &ListingQueryOptions,
    ) -> Result<Vec<Listing>> {
        ensure_valid(filters)?;
        let query = combine(filters);
        let page = Page::new(options, self.config.effective_limit(options.limit));

        let listings: Vec<Listing> = select_rows::<ListingRow, Listing>(
            &self.store,
            "active.select",
            Collection::Active,
            LISTING_PROJECTION,
            &query.clauses,
            query.near,
            options,
            page,
        )
        .await?;

        info!(
            location = %filters.location_label(),
            returned = listings.len(),
            limit = page.limit,
            "active listings query",
        );
        Ok(listings)
    }

    /// Same predicate as [`Self::by_filters`] without projection or paging.
    pub async fn count(&self, filters: &FilterSet) -> Result<u64> {
        ensure_valid(filters)?;
        let query = combine(filters);
        let clauses = &query.clauses;
        count_rows(&self.store, "active.count", Collection::Active, clauses, query.near).await
    }
}
