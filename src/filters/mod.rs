//! Typed filter dimensions and the constraint tree they compile to.
//!
//! Every builder returns a list of [`Clause`]s that must all hold. The
//! combinator concatenates those lists into one top-level conjunction, so two
//! dimensions that each need an OR end up as two independent `Any` clauses
//! instead of one silently replacing the other.

pub mod amenities;
pub mod combine;
pub mod location;
pub mod price;
pub mod property;
pub mod time;

use serde::{Deserialize, Serialize};

use crate::monitor::ANY_LOCATION;
use crate::types::Collection;

pub use amenities::AmenityFilter;
pub use combine::{combine, validate_filters, FilterValidation};
pub use location::{BoundingBox, GeoRadius, LocationFilter};
pub use price::PriceFilter;
pub use property::PropertyFilter;
pub use self::time::{TimeFilter, TimeWindow};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Closed set of queryable fields. Column names only ever come from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Price,
    PropertyType,
    PropertySubType,
    City,
    Subdivision,
    PostalCode,
    County,
    MlsSource,
    Latitude,
    Longitude,
    /// Bedroom count as written by most feeds.
    BedroomsTotal,
    /// Bedroom count as written by feeds using the short name.
    BedsTotal,
    Bathrooms,
    LivingArea,
    LotSize,
    YearBuilt,
    OnMarketDate,
    DaysOnMarket,
    Pool,
    Spa,
    View,
    GatedCommunity,
    SeniorCommunity,
    GarageSpaces,
    HoaFee,
    /// 0 when the source document never carried an HOA fee key.
    HoaFeePresent,
    OpenHouseDate,
    CloseDate,
    StandardStatus,
}

impl Field {
    pub fn column(self, collection: Collection) -> &'static str {
        match self {
            Field::Price => match collection {
                Collection::Active => "list_price",
                Collection::Closed => "close_price",
            },
            Field::PropertyType => "property_type",
            Field::PropertySubType => "property_sub_type",
            Field::City => "city",
            Field::Subdivision => "subdivision_name",
            Field::PostalCode => "postal_code",
            Field::County => "county_or_parish",
            Field::MlsSource => "mls_source",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::BedroomsTotal => "bedrooms_total",
            Field::BedsTotal => "beds_total",
            Field::Bathrooms => "bathrooms_total",
            Field::LivingArea => "living_area",
            Field::LotSize => "lot_size_sqft",
            Field::YearBuilt => "year_built",
            Field::OnMarketDate => "on_market_date",
            Field::DaysOnMarket => "days_on_market",
            Field::Pool => "pool_yn",
            Field::Spa => "spa_yn",
            Field::View => "view_yn",
            Field::GatedCommunity => "gated_community_yn",
            Field::SeniorCommunity => "senior_community_yn",
            Field::GarageSpaces => "garage_spaces",
            Field::HoaFee => "hoa_fee",
            Field::HoaFeePresent => "hoa_fee_present",
            Field::OpenHouseDate => "open_house_date",
            Field::CloseDate => "close_date",
            Field::StandardStatus => "standard_status",
        }
    }
}

// ---------------------------------------------------------------------------
// Clauses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    /// Case-insensitive text equality.
    EqNoCase,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Eq | Op::EqNoCase => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Date(::time::Date),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<::time::Date> for Value {
    fn from(v: ::time::Date) -> Self {
        Value::Date(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Compare { field: Field, op: Op, value: Value },
    In {
        field: Field,
        values: Vec<Value>,
        negated: bool,
    },
    IsNull(Field),
    NotNull(Field),
    /// Store-side computed `numerator / denominator <op> value`, false when the
    /// denominator is not positive.
    Ratio {
        numerator: Field,
        denominator: Field,
        op: Op,
        value: f64,
    },
    /// Disjunction.
    Any(Vec<Clause>),
    /// Conjunction.
    All(Vec<Clause>),
}

impl Clause {
    pub fn cmp(field: Field, op: Op, value: impl Into<Value>) -> Self {
        Clause::Compare {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::cmp(field, Op::Eq, value)
    }

    pub fn gte(field: Field, value: impl Into<Value>) -> Self {
        Self::cmp(field, Op::Gte, value)
    }

    pub fn lte(field: Field, value: impl Into<Value>) -> Self {
        Self::cmp(field, Op::Lte, value)
    }

    pub fn is_or(&self) -> bool {
        matches!(self, Clause::Any(_))
    }
}

/// A combined, store-agnostic query: a conjunction of clauses plus an optional
/// exact-distance post-filter for radius searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub clauses: Vec<Clause>,
    pub near: Option<GeoRadius>,
}

impl Query {
    pub fn and(mut self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        self.clauses.extend(clauses);
        self
    }

    /// Number of top-level OR clauses; each one is independent of the others.
    pub fn or_clause_count(&self) -> usize {
        self.clauses.iter().filter(|c| c.is_or()).count()
    }
}

// ---------------------------------------------------------------------------
// Filter set
// ---------------------------------------------------------------------------

/// Every dimension is optional; an empty set still yields a bounded query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub location: Option<LocationFilter>,
    pub property: Option<PropertyFilter>,
    pub price: Option<PriceFilter>,
    pub amenities: Option<AmenityFilter>,
    pub time: Option<TimeFilter>,
}

impl FilterSet {
    /// Replace the location dimension, keeping every other dimension.
    pub fn with_location(&self, location: LocationFilter) -> Self {
        Self {
            location: Some(location),
            ..self.clone()
        }
    }

    /// Narrow to a named place. The place's city, subdivision, zip and
    /// county replace the current ones; MLS sources and a radius already on
    /// the location carry over unless the place sets its own.
    pub fn with_place(&self, place: LocationFilter) -> Self {
        let location = match &self.location {
            Some(current) => current.overlaid_with(place),
            None => place,
        };
        self.with_location(location)
    }

    /// Location label for logs and monitoring; "any" without one.
    pub fn location_label(&self) -> String {
        self.location
            .as_ref()
            .and_then(LocationFilter::label)
            .unwrap_or_else(|| ANY_LOCATION.to_string())
    }

    /// Count of individual criteria set across all dimensions.
    pub fn active_filter_count(&self) -> usize {
        self.location.as_ref().map_or(0, LocationFilter::active_count)
            + self.property.as_ref().map_or(0, PropertyFilter::active_count)
            + self.price.as_ref().map_or(0, PriceFilter::active_count)
            + self.amenities.as_ref().map_or(0, AmenityFilter::active_count)
            + self.time.as_ref().map_or(0, TimeFilter::active_count)
    }
}

/// Push an optional `[min, max]` range on one field.
pub(crate) fn push_range<T: Into<Value>>(
    clauses: &mut Vec<Clause>,
    field: Field,
    min: Option<T>,
    max: Option<T>,
) {
    if let Some(min) = min {
        clauses.push(Clause::gte(field, min));
    }
    if let Some(max) = max {
        clauses.push(Clause::lte(field, max));
    }
}

/// Validation message when both ends of a range are set and inverted.
pub(crate) fn check_range<T: PartialOrd + std::fmt::Display>(
    errors: &mut Vec<String>,
    label: &str,
    min: Option<T>,
    max: Option<T>,
) {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(format!("{label}: minimum ({min}) is greater than maximum ({max})"));
        }
    }
}
