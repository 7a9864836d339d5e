//! Fixtures shared by the store-backed tests.

use std::time::Duration;

use time::Date;

use crate::db::Store;
use crate::types::{ClosedSale, Listing};

/// A migrated, single-connection in-memory store.
pub async fn memory_store() -> Store {
    let store = Store::in_memory(Duration::from_secs(5)).await.unwrap();
    store.migrate().await.unwrap();
    store
}

/// A residential listing with nothing but a key and a price.
pub fn listing(key: &str, price: f64) -> Listing {
    Listing {
        listing_key: key.to_string(),
        list_price: price,
        property_type: Some("Residential".into()),
        property_sub_type: None,
        address: None,
        city: None,
        subdivision: None,
        postal_code: None,
        county: None,
        latitude: None,
        longitude: None,
        bedrooms: None,
        bathrooms: None,
        living_area: None,
        lot_size_sqft: None,
        year_built: None,
        on_market_date: None,
        days_on_market: None,
        pool: false,
        spa: false,
        view: false,
        gated_community: false,
        senior_community: false,
        garage_spaces: None,
        hoa_fee: None,
        open_house_date: None,
        primary_photo_url: None,
        mls_source: None,
        price_per_sqft: None,
    }
}

pub fn closed_sale(key: &str, price: f64, close_date: Date) -> ClosedSale {
    ClosedSale {
        listing_key: key.to_string(),
        close_price: price,
        close_date,
        list_price: None,
        original_list_price: None,
        property_type: Some("Residential".into()),
        address: None,
        city: None,
        subdivision: None,
        postal_code: None,
        county: None,
        latitude: None,
        longitude: None,
        bedrooms: None,
        bathrooms: None,
        living_area: None,
        lot_size_sqft: None,
        year_built: None,
        days_on_market: None,
        price_per_sqft: None,
    }
}

pub async fn insert_listing(store: &Store, l: &Listing) {
    sqlx::query(
        "INSERT INTO listings (listing_key, list_price, property_type, property_sub_type, \
         unparsed_address, city, subdivision_name, postal_code, county_or_parish, latitude, \
         longitude, bedrooms_total, bathrooms_total, living_area, lot_size_sqft, year_built, \
         on_market_date, days_on_market, pool_yn, spa_yn, view_yn, gated_community_yn, \
         senior_community_yn, garage_spaces, hoa_fee, open_house_date, primary_photo_url, \
         mls_source) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
         ?, ?, ?, ?, ?, ?, ?, ?)",

    )
    .bind(&l.listing_key)
    .bind(l.list_price)
    .bind(&l.property_type)
    .bind(&l.property_sub_type)
    .bind(&l.address)
    .bind(&l.city)
    .bind(&l.subdivision)
    .bind(&l.postal_code)
    .bind(&l.county)
    .bind(l.latitude)
    .bind(l.longitude)
    .bind(l.bedrooms.map(i64::from))
    .bind(l.bathrooms)
    .bind(l.living_area)
    .bind(l.lot_size_sqft)
    .bind(l.year_built.map(i64::from))
    .bind(l.on_market_date.map(|d| d.to_string()))
    .bind(l.days_on_market.map(i64::from))
    .bind(l.pool)
    .bind(l.spa)
    .bind(l.view)
    .bind(l.gated_community)
    .bind(l.senior_community)
    .bind(l.garage_spaces.map(i64::from))
    .bind(l.hoa_fee)
    .bind(l.open_house_date.map(|d| d.to_string()))
    .bind(&l.primary_photo_url)
    .bind(&l.mls_source)
    .execute(store.pool())
    .await
    .unwrap();
}

pub async fn insert_closed(store: &Store, s: &ClosedSale) {
    sqlx::query(
        "INSERT INTO closed_listings (listing_key, close_price, close_date, list_price, \
         original_list_price, property_type, unparsed_address, city, subdivision_name, \
         postal_code, county_or_parish, latitude, longitude, bedrooms_total, bathrooms_total, \
         living_area, lot_size_sqft, year_built, days_on_market) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",

    )
    .bind(&s.listing_key)
    .bind(s.close_price)
    .bind(s.close_date.to_string())
    .bind(s.list_price)
    .bind(s.original_list_price)
    .bind(&s.property_type)
    .bind(&s.address)
    .bind(&s.city)
    .bind(&s.subdivision)
    .bind(&s.postal_code)
    .bind(&s.county)
    .bind(s.latitude)
    .bind(s.longitude)
    .bind(s.bedrooms.map(i64::from))
    .bind(s.bathrooms)
    .bind(s.living_area)
    .bind(s.lot_size_sqft)
    .bind(s.year_built.map(i64::from))
    .bind(s.days_on_market.map(i64::from))
    .execute(store.pool())
    .await
    .unwrap();
}

/// `count` identical sales `{prefix}-1..={prefix}-{count}` in one statement.
pub async fn insert_closed_series(
    store: &Store,
    prefix: &str,
    count: u32,
    price: f64,
    close_date: Date,
    city: &str,
) {
    sqlx::query(
        "WITH RECURSIVE seq(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM seq WHERE i < ?) \
         INSERT INTO closed_listings (listing_key, close_price, close_date, property_type, city) \
         SELECT ? || '-' || i, ?, ?, 'Residential', ? FROM seq",
    )
    .bind(i64::from(count))
    .bind(prefix)
    .bind(price)
    .bind(close_date.to_string())
    .bind(city)
    .execute(store.pool())
    .await
    .unwrap();
}
