use serde::{Deserialize, Serialize};
use time::Date;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Which store collection a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Live inventory.
    Active,
    /// Historical, completed sales.
    Closed,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Active => "listings",
            Collection::Closed => "closed_listings",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Active => write!(f, "active"),
            Collection::Closed => write!(f, "closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// One property currently for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub listing_key: String,
    pub list_price: f64,
    pub property_type: Option<String>,
    pub property_sub_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub subdivision: Option<String>,
    pub postal_code: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub living_area: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub year_built: Option<u32>,
    pub on_market_date: Option<Date>,
    pub days_on_market: Option<u32>,
    pub pool: bool,
    pub spa: bool,
    pub view: bool,
    pub gated_community: bool,
    pub senior_community: bool,
    pub garage_spaces: Option<u32>,
    pub hoa_fee: Option<f64>,
    pub open_house_date: Option<Date>,
    pub primary_photo_url: Option<String>,
    pub mls_source: Option<String>,
    /// Derived `list_price / living_area`; None when the area is unknown or zero.
    pub price_per_sqft: Option<f64>,
}

/// One completed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedSale {
    pub listing_key: String,
    pub close_price: f64,
    pub close_date: Date,
    pub list_price: Option<f64>,
    pub original_list_price: Option<f64>,
    pub property_type: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub subdivision: Option<String>,
    pub postal_code: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub living_area: Option<f64>,
    pub lot_size_sqft: Option<f64>,
    pub year_built: Option<u32>,
    pub days_on_market: Option<u32>,
    pub price_per_sqft: Option<f64>,
}

/// Anything with an optional position, for the exact radius post-filter.
pub trait Located {
    fn position(&self) -> Option<(f64, f64)>;
}

impl Located for Listing {
    fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

impl Located for ClosedSale {
    fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

// ---------------------------------------------------------------------------
// Sorting and paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    SizeAsc,
    SizeDesc,
    #[default]
    Newest,
    Oldest,
    DomAsc,
    DomDesc,
}

impl SortOrder {
    /// ORDER BY body for the given collection. Always ends in a key tie-breaker
    /// so identical queries page identically.
    pub fn order_by(self, collection: Collection) -> &'static str {
        match (self, collection) {
            (SortOrder::PriceAsc, Collection::Active) => "list_price ASC, listing_key ASC",
            (SortOrder::PriceDesc, Collection::Active) => "list_price DESC, listing_key ASC",
            (SortOrder::PriceAsc, Collection::Closed) => "close_price ASC, listing_key ASC",
            (SortOrder::PriceDesc, Collection::Closed) => "close_price DESC, listing_key ASC",
            (SortOrder::SizeAsc, _) => "living_area ASC, listing_key ASC",
            (SortOrder::SizeDesc, _) => "living_area DESC, listing_key ASC",
            (SortOrder::Newest, Collection::Active) => "on_market_date DESC, listing_key ASC",
            (SortOrder::Oldest, Collection::Active) => "on_market_date ASC, listing_key ASC",
            (SortOrder::Newest, Collection::Closed) => "close_date DESC, listing_key ASC",
            (SortOrder::Oldest, Collection::Closed) => "close_date ASC, listing_key ASC",
            (SortOrder::DomAsc, _) => "days_on_market ASC, listing_key ASC",
            (SortOrder::DomDesc, _) => "days_on_market DESC, listing_key ASC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingQueryOptions {
    pub limit: Option<u32>,
    pub skip: Option<u32>,
    pub sort: Option<SortOrder>,
}

// ---------------------------------------------------------------------------
// Market statistics
// ---------------------------------------------------------------------------

/// Derived per request, never persisted. All fields are zero for an empty match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    pub total_count: u64,
    pub avg_price: f64,
    pub median_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub p25_price: f64,
    pub p75_price: f64,
    pub p90_price: f64,
    pub avg_price_per_sqft: f64,
    pub median_price_per_sqft: f64,
    pub avg_days_on_market: f64,
    pub median_days_on_market: f64,
    pub avg_beds: f64,
    pub avg_baths: f64,
    pub avg_sqft: f64,
}

impl MarketStats {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// One band of a price histogram; `max` is exclusive and None for the top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub min: f64,
    pub max: Option<f64>,
    pub count: u64,
}
