//! Row types for the two collections, plus the fixed projections that select
//! them. Queries never use `SELECT *`.

use time::Date;

use crate::calc::price_per_sqft::price_per_sqft;
use crate::types::{ClosedSale, Listing};

pub const LISTING_PROJECTION: &str = "listing_key, list_price, property_type, property_sub_type, \
     unparsed_address, city, subdivision_name, postal_code, county_or_parish, latitude, longitude, \
     COALESCE(bedrooms_total, beds_total) AS bedrooms, bathrooms_total, living_area, \
     lot_size_sqft, year_built, on_market_date, days_on_market, pool_yn, spa_yn, view_yn, \
     gated_community_yn, senior_community_yn, garage_spaces, hoa_fee, open_house_date, \
     primary_photo_url, mls_source";

pub const CLOSED_PROJECTION: &str = "listing_key, close_price, close_date, list_price, \
     original_list_price, property_type, unparsed_address, city, subdivision_name, postal_code, \
     county_or_parish, latitude, longitude, COALESCE(bedrooms_total, beds_total) AS bedrooms, \
     bathrooms_total, living_area, lot_size_sqft, year_built, days_on_market";

#[derive(Debug, sqlx::FromRow)]
pub struct ListingRow {
    pub listing_key: String,
    pub list_price: Option<f64>,
    pub property_type: Option<String>,
    pub property_sub_type: Option<String>,
    pub unparsed_address: Option<String>,
    pub city: Option<String>,
    pub subdivision_name: Option<String>,
    pub postal_code: Option<String>,
    pub county_or_parish: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms_total: Option<f64>,
    pub living_area: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub year_built: Option<i64>,
    pub on_market_date: Option<Date>,
    pub days_on_market: Option<i64>,
    pub pool_yn: bool,
    pub spa_yn: bool,
    pub view_yn: bool,
    pub gated_community_yn: bool,
    pub senior_community_yn: bool,
    pub garage_spaces: Option<i64>,
    pub hoa_fee: Option<f64>,
    pub open_house_date: Option<Date>,
    pub primary_photo_url: Option<String>,
    pub mls_source: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ClosedSaleRow {
    pub listing_key: String,
    pub close_price: f64,
    pub close_date: Date,
    pub list_price: Option<f64>,
    pub original_list_price: Option<f64>,
    pub property_type: Option<String>,
    pub unparsed_address: Option<String>,
    pub city: Option<String>,
    pub subdivision_name: Option<String>,
    pub postal_code: Option<String>,
    pub county_or_parish: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i64>,
    pub bathrooms_total: Option<f64>,
    pub living_area: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub year_built: Option<i64>,
    pub days_on_market: Option<i64>,
}

fn to_u32(v: Option<i64>) -> Option<u32> {
    v.and_then(|n| u32::try_from(n).ok())
}

impl From<ListingRow> for Listing {
    fn from(r: ListingRow) -> Self {
        let list_price = r.list_price.unwrap_or(0.0);
        Listing {
            price_per_sqft: price_per_sqft(list_price, r.living_area),
            listing_key: r.listing_key,
            list_price,
            property_type: r.property_type,
            property_sub_type: r.property_sub_type,
            address: r.unparsed_address,
            city: r.city,
            subdivision: r.subdivision_name,
            postal_code: r.postal_code,
            county: r.county_or_parish,
            latitude: r.latitude,
            longitude: r.longitude,
            bedrooms: to_u32(r.bedrooms),
            bathrooms: r.bathrooms_total,
            living_area: r.living_area,
            lot_size_sqft: r.lot_size_sqft,
            year_built: to_u32(r.year_built),
            on_market_date: r.on_market_date,
            days_on_market: to_u32(r.days_on_market),
            pool: r.pool_yn,
            spa: r.spa_yn,
            view: r.view_yn,
            gated_community: r.gated_community_yn,
            senior_community: r.senior_community_yn,
            garage_spaces: to_u32(r.garage_spaces),
            hoa_fee: r.hoa_fee,
            open_house_date: r.open_house_date,
            primary_photo_url: r.primary_photo_url,
            mls_source: r.mls_source,
        }
    }
}

impl From<ClosedSaleRow> for ClosedSale {
    fn from(r: ClosedSaleRow) -> Self {
        ClosedSale {
            price_per_sqft: price_per_sqft(r.close_price, r.living_area),
            listing_key: r.listing_key,
            close_price: r.close_price,
            close_date: r.close_date,
            list_price: r.list_price,
            original_list_price: r.original_list_price,
            property_type: r.property_type,
            address: r.unparsed_address,
            city: r.city,
            subdivision: r.subdivision_name,
            postal_code: r.postal_code,
            county: r.county_or_parish,
            latitude: r.latitude,
            longitude: r.longitude,
            bedrooms: to_u32(r.bedrooms),
            bathrooms: r.bathrooms_total,
            living_area: r.living_area,
            lot_size_sqft: r.lot_size_sqft,
            year_built: to_u32(r.year_built),
            days_on_market: to_u32(r.days_on_market),
        }
    }
}
